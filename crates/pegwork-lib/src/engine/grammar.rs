//! The grammar environment: an ordered name → binding registry.
//!
//! Rules reference each other by name through this environment rather than
//! by owning pointers, which is what makes forward declarations and mutual
//! recursion work without ownership cycles. The environment is built once
//! and is read-only during a parse.

use std::rc::Rc;

use indexmap::IndexMap;

use super::error::GrammarError;
use super::rule::{Factory, Forward, Rule, RuleKind};

/// What a name is bound to.
#[derive(Clone, Debug)]
enum Binding {
    /// A resolved rule.
    Rule(Rc<Rule>),
    /// A declared-but-not-yet-defined rule.
    Forward(Forward),
    /// A parametrised-rule constructor.
    Factory(Factory),
}

/// An ordered registry of named rules and factories.
#[derive(Clone, Debug, Default)]
pub struct Grammar {
    bindings: IndexMap<String, Binding>,
}

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `rule`.
    ///
    /// Defining a name that was previously [`declare`](Self::declare)d binds
    /// the pending forward; defining a name that already has a resolved
    /// binding is a configuration error.
    pub fn define(&mut self, name: impl Into<String>, rule: Rule) -> Result<(), GrammarError> {
        let name = name.into();
        if has_empty_body(&rule) {
            return Err(GrammarError::EmptyRule(name));
        }
        let rule = rule.with_name(name.as_str());
        match self.bindings.get(&name).cloned() {
            None => {
                self.bindings.insert(name, Binding::Rule(Rc::new(rule)));
                Ok(())
            }
            Some(Binding::Forward(fwd)) => {
                fwd.bind(rule);
                let resolved = fwd.get().expect("forward bound above");
                self.bindings.insert(name, Binding::Rule(resolved));
                Ok(())
            }
            Some(_) => Err(GrammarError::Redefined(name)),
        }
    }

    /// Declare `name` without defining it yet. Idempotent; a later
    /// [`define`](Self::define) completes the binding.
    pub fn declare(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.bindings.contains_key(&name) {
            let fwd = Forward::new(name.as_str());
            self.bindings.insert(name, Binding::Forward(fwd));
        }
    }

    /// Bind `name` to a parametrised-rule constructor.
    pub fn define_factory(
        &mut self,
        name: impl Into<String>,
        build: impl Fn(&[Rule]) -> Rule + 'static,
    ) -> Result<(), GrammarError> {
        let name = name.into();
        if self.bindings.contains_key(&name) {
            return Err(GrammarError::Redefined(name));
        }
        let factory = Factory::new(name.as_str(), build);
        self.bindings.insert(name, Binding::Factory(factory));
        Ok(())
    }

    /// Resolve a plain rule by name.
    pub fn resolve(&self, name: &str) -> Result<Rc<Rule>, GrammarError> {
        match self.bindings.get(name) {
            Some(Binding::Rule(rule)) => Ok(rule.clone()),
            Some(Binding::Forward(fwd)) => fwd
                .get()
                .ok_or_else(|| GrammarError::UnresolvedForward(name.to_string())),
            Some(Binding::Factory(_)) => Err(GrammarError::WrongBinding {
                name: name.to_string(),
                wanted: "rule",
                actual: "factory",
            }),
            None => Err(GrammarError::UnboundReference(name.to_string())),
        }
    }

    /// Resolve a factory by name.
    pub fn resolve_factory(&self, name: &str) -> Result<Factory, GrammarError> {
        match self.bindings.get(name) {
            Some(Binding::Factory(factory)) => Ok(factory.clone()),
            Some(_) => Err(GrammarError::WrongBinding {
                name: name.to_string(),
                wanted: "factory",
                actual: "rule",
            }),
            None => Err(GrammarError::UnboundReference(name.to_string())),
        }
    }

    /// Names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Names that were declared or referenced but never defined. A parse
    /// that reaches one of these fails with a configuration error; checking
    /// up front gives a better message.
    pub fn unresolved(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for (name, binding) in &self.bindings {
            if let Binding::Forward(fwd) = binding {
                if fwd.get().is_none() {
                    names.push(name);
                }
            }
        }
        // References inside rule bodies to names with no binding at all.
        for binding in self.bindings.values() {
            if let Binding::Rule(rule) = binding {
                collect_unbound(rule, self, &mut names);
            }
        }
        names.sort_unstable();
        names.dedup();
        names
    }
}

fn has_empty_body(rule: &Rule) -> bool {
    match rule.kind() {
        RuleKind::Sequence { items, .. } => items.is_empty(),
        RuleKind::Choice { alts, .. } => alts.is_empty(),
        _ => false,
    }
}

fn collect_unbound<'g>(rule: &'g Rule, grammar: &'g Grammar, out: &mut Vec<&'g str>) {
    match rule.kind() {
        RuleKind::Reference(name) => {
            if !grammar.bindings.contains_key(name) {
                out.push(name);
            }
        }
        RuleKind::Sequence { items, .. } | RuleKind::Choice { alts: items, .. } => {
            for item in items {
                collect_unbound(item, grammar, out);
            }
        }
        RuleKind::Repeat { body, .. }
        | RuleKind::Optional(body)
        | RuleKind::Lookahead { body, .. }
        | RuleKind::Memo { body, .. } => collect_unbound(body, grammar, out),
        _ => {}
    }
}
