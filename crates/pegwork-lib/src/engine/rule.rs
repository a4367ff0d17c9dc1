//! Grammar rules.
//!
//! A [`Rule`] is a tagged node whose kind selects its matching behaviour.
//! Rules are immutable once assembled; the only later writes are the
//! one-time binding of [`Forward`] rules, the lazy materialisation cached
//! inside a parametrised call, and memo locking (which lives in the parse
//! context, not the node).
//!
//! The free functions at the bottom are the construction DSL; emitted
//! grammars are written against them.

use std::cell::OnceCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::error::ActionError;
use super::pattern::Pattern;
use super::value::Value;

/// How a composite rule treats inter-item skipping.
///
/// `Inherit` keeps whatever skip the enclosing rule runs under, `Disabled`
/// turns skipping off for the subtree (strings, regexps and balanced
/// constructs need exact text), and `Explicit` overrides the inherited
/// skip with the rule's own.
#[derive(Clone, Debug, Default)]
pub enum SkipMode {
    #[default]
    Inherit,
    Disabled,
    Explicit(Rc<Rule>),
}

/// A user action: receives the collected results of its rule positionally
/// and produces the rule's value.
///
/// Action failure is a grammar bug, not a property of the input, so it is
/// not recoverable by ordered choice.
#[derive(Clone)]
pub struct Action {
    name: Rc<str>,
    run: Rc<dyn Fn(&[Value]) -> Result<Value, ActionError>>,
}

impl Action {
    pub fn new(
        name: impl AsRef<str>,
        run: impl Fn(&[Value]) -> Result<Value, ActionError> + 'static,
    ) -> Self {
        Self {
            name: Rc::from(name.as_ref()),
            run: Rc::new(run),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, values: &[Value]) -> Result<Value, ActionError> {
        (self.run)(values)
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Action({})", self.name)
    }
}

/// A semantic predicate: a host test over the enclosing sequence's results
/// so far. Succeeds iff the test returns true; consumes nothing.
#[derive(Clone)]
pub struct Predicate {
    name: Rc<str>,
    test: Rc<dyn Fn(&[Value]) -> bool>,
}

impl Predicate {
    pub fn new(name: impl AsRef<str>, test: impl Fn(&[Value]) -> bool + 'static) -> Self {
        Self {
            name: Rc::from(name.as_ref()),
            test: Rc::new(test),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self, values: &[Value]) -> bool {
        (self.test)(values)
    }
}

impl std::fmt::Debug for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Predicate({})", self.name)
    }
}

/// A rule declared before it is defined, for mutual recursion outside a
/// grammar environment. Bound exactly once.
#[derive(Clone)]
pub struct Forward {
    inner: Rc<ForwardInner>,
}

struct ForwardInner {
    name: Rc<str>,
    slot: OnceCell<Rc<Rule>>,
}

impl Forward {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            inner: Rc::new(ForwardInner {
                name: Rc::from(name.as_ref()),
                slot: OnceCell::new(),
            }),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// A rule that evaluates whatever this forward is eventually bound to.
    pub fn rule(&self) -> Rule {
        Rule::from_kind(RuleKind::Forward(self.clone()))
    }

    /// Bind the forward to its definition.
    ///
    /// # Panics
    ///
    /// Panics on a second bind; forward rules are bound exactly once.
    pub fn bind(&self, rule: Rule) {
        let bound = self.inner.slot.set(Rc::new(rule)).is_ok();
        assert!(bound, "forward rule `{}` bound twice", self.inner.name);
    }

    pub(crate) fn get(&self) -> Option<Rc<Rule>> {
        self.inner.slot.get().cloned()
    }
}

impl std::fmt::Debug for Forward {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Forward({})", self.inner.name)
    }
}

/// A rule constructor: for each argument tuple it produces a concrete rule.
///
/// A factory is not itself a rule and cannot be matched; the only way to
/// use one as a grammar element is [`Factory::instantiate`], which yields a
/// call node that materialises the rule on first parse.
#[derive(Clone)]
pub struct Factory {
    name: Rc<str>,
    build: Rc<dyn Fn(&[Rule]) -> Rule>,
}

impl Factory {
    pub fn new(name: impl AsRef<str>, build: impl Fn(&[Rule]) -> Rule + 'static) -> Self {
        Self {
            name: Rc::from(name.as_ref()),
            build: Rc::new(build),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn build(&self, args: &[Rule]) -> Rule {
        (self.build)(args)
    }

    /// Use the factory as a grammar element with the given arguments.
    pub fn instantiate(&self, args: impl IntoIterator<Item = Rule>) -> Rule {
        Rule::from_kind(RuleKind::ParamCall(ParamCall {
            target: FactoryRef::Direct(self.clone()),
            args: Rc::new(args.into_iter().collect()),
            instance: OnceCell::new(),
        }))
    }
}

impl std::fmt::Debug for Factory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Factory({})", self.name)
    }
}

/// How a parametrised call finds its factory: directly, or by name through
/// the grammar environment at first evaluation.
#[derive(Clone, Debug)]
pub(crate) enum FactoryRef {
    Direct(Factory),
    Named(String),
}

/// A call site of a parametrised rule.
///
/// The argument tuple is fixed at construction, so the per-site cell is the
/// per-tuple cache: the factory runs once, on the first parse that reaches
/// this site, and every later parse reuses the materialised rule.
#[derive(Clone, Debug)]
pub struct ParamCall {
    pub(crate) target: FactoryRef,
    pub(crate) args: Rc<Vec<Rule>>,
    pub(crate) instance: OnceCell<Rc<Rule>>,
}

impl ParamCall {
    pub(crate) fn materialise(&self, factory: &Factory) -> Rc<Rule> {
        self.instance
            .get_or_init(|| Rc::new(factory.build(&self.args)))
            .clone()
    }
}

static MEMO_KEYS: AtomicU64 = AtomicU64::new(0);

/// A grammar rule: an optional diagnostic name plus the matching behaviour.
#[derive(Clone, Debug)]
pub struct Rule {
    name: Option<Rc<str>>,
    kind: RuleKind,
}

/// The matching behaviour of a rule.
#[derive(Clone, Debug)]
pub enum RuleKind {
    /// Matches the exact string.
    Literal(String),
    /// Matches a compiled pattern anchored at the current offset.
    Pattern(Rc<Pattern>),
    /// Matches any single code point.
    AnyChar,
    /// Matches each item in order, attempting `skip` between items.
    Sequence {
        items: Vec<Rc<Rule>>,
        skip: SkipMode,
        action: Option<Action>,
    },
    /// Ordered choice: the value of the first alternative that matches.
    Choice {
        alts: Vec<Rc<Rule>>,
        skip: SkipMode,
        action: Option<Action>,
    },
    /// Greedy repetition of `body` between `min` and `max` times
    /// (`max: None` is unbounded).
    Repeat {
        min: u32,
        max: Option<u32>,
        body: Rc<Rule>,
        skip: SkipMode,
        action: Option<Action>,
    },
    /// Matches `body` or nothing; yields the inner value or `Absent`.
    Optional(Rc<Rule>),
    /// Syntactic predicate: attempts `body` without consuming input.
    Lookahead { body: Rc<Rule>, positive: bool },
    /// Semantic predicate over the enclosing sequence's results so far.
    Predicate(Predicate),
    /// Late-bound pointer to a named rule, resolved through the grammar
    /// environment on every invocation.
    Reference(String),
    /// A forward-declared rule bound after construction.
    Forward(Forward),
    /// A parametrised-rule call site.
    ParamCall(ParamCall),
    /// Locks the text matched by `body` on first success within the current
    /// memo scope; later invocations in the scope match that text exactly.
    Memo { key: u64, body: Rc<Rule> },
}

impl Rule {
    pub(crate) fn from_kind(kind: RuleKind) -> Self {
        Self { name: None, kind }
    }

    #[inline]
    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    /// Name the rule for diagnostics.
    pub fn with_name(mut self, name: impl AsRef<str>) -> Self {
        self.name = Some(Rc::from(name.as_ref()));
        self
    }

    /// The diagnostic label: the explicit name, or one derived from the
    /// rule's shape.
    pub fn label(&self) -> String {
        if let Some(name) = &self.name {
            return name.to_string();
        }
        match &self.kind {
            RuleKind::Literal(s) => format!("'{s}'"),
            RuleKind::Pattern(p) => format!("/{}/", p.as_str()),
            RuleKind::AnyChar => "any character".to_string(),
            RuleKind::Sequence { .. } => "sequence".to_string(),
            RuleKind::Choice { .. } => "choice".to_string(),
            RuleKind::Repeat { .. } => "repetition".to_string(),
            RuleKind::Optional(_) => "optional".to_string(),
            RuleKind::Lookahead { positive: true, .. } => "&lookahead".to_string(),
            RuleKind::Lookahead { positive: false, .. } => "!lookahead".to_string(),
            RuleKind::Predicate(p) => format!("predicate {}", p.name()),
            RuleKind::Reference(name) => name.clone(),
            RuleKind::Forward(fwd) => fwd.name().to_string(),
            RuleKind::ParamCall(call) => match &call.target {
                FactoryRef::Direct(f) => f.name().to_string(),
                FactoryRef::Named(name) => name.clone(),
            },
            RuleKind::Memo { body, .. } => body.label(),
        }
    }

    /// Attach an override skip. Rules without a skip slot are wrapped in a
    /// one-item sequence first.
    pub fn with_skip(self, skip: Rule) -> Self {
        self.set_skip(SkipMode::Explicit(Rc::new(skip)))
    }

    /// Disable skipping inside this rule regardless of what it inherits.
    pub fn no_skip(self) -> Self {
        self.set_skip(SkipMode::Disabled)
    }

    fn set_skip(mut self, mode: SkipMode) -> Self {
        match &mut self.kind {
            RuleKind::Sequence { skip, .. }
            | RuleKind::Choice { skip, .. }
            | RuleKind::Repeat { skip, .. } => {
                *skip = mode;
                self
            }
            _ => wrap_in_sequence(self).set_skip(mode),
        }
    }

    /// Attach an action. Rules without an action slot are wrapped in a
    /// one-item sequence first, so the action receives the single value.
    pub fn with_action(mut self, action: Action) -> Self {
        match &mut self.kind {
            RuleKind::Sequence { action: slot, .. }
            | RuleKind::Choice { action: slot, .. }
            | RuleKind::Repeat { action: slot, .. } => {
                *slot = Some(action);
                self
            }
            _ => wrap_in_sequence(self).with_action(action),
        }
    }
}

fn wrap_in_sequence(rule: Rule) -> Rule {
    Rule::from_kind(RuleKind::Sequence {
        items: vec![Rc::new(rule)],
        skip: SkipMode::Inherit,
        action: None,
    })
}

// ---------------------------------------------------------------------------
// Construction DSL
// ---------------------------------------------------------------------------

/// A literal: matches `text` exactly.
pub fn lit(text: impl Into<String>) -> Rule {
    Rule::from_kind(RuleKind::Literal(text.into()))
}

/// A pattern with no flags.
///
/// # Panics
///
/// Panics if `pattern` does not compile; grammar compilation validates
/// user-written patterns before they reach this constructor, so a failure
/// here is a bug in the calling code.
pub fn regex(pattern: &str) -> Rule {
    regex_flags(pattern, "")
}

/// A pattern with single-letter flags (see [`Pattern::with_flags`]).
///
/// # Panics
///
/// Panics if the pattern or a flag is invalid.
pub fn regex_flags(pattern: &str, flags: &str) -> Rule {
    let compiled = Pattern::with_flags(pattern, flags).unwrap_or_else(|e| panic!("{e}"));
    Rule::from_kind(RuleKind::Pattern(Rc::new(compiled)))
}

/// Any single code point.
pub fn any_char() -> Rule {
    Rule::from_kind(RuleKind::AnyChar)
}

/// A sequence of rules matched in order.
pub fn seq(items: impl IntoIterator<Item = Rule>) -> Rule {
    Rule::from_kind(RuleKind::Sequence {
        items: items.into_iter().map(Rc::new).collect(),
        skip: SkipMode::Inherit,
        action: None,
    })
}

/// Ordered choice between alternatives.
pub fn choice(alts: impl IntoIterator<Item = Rule>) -> Rule {
    Rule::from_kind(RuleKind::Choice {
        alts: alts.into_iter().map(Rc::new).collect(),
        skip: SkipMode::Inherit,
        action: None,
    })
}

/// Greedy repetition with explicit bounds; `max: None` is unbounded.
pub fn repetition(min: u32, max: impl Into<Option<u32>>, body: Rule) -> Rule {
    Rule::from_kind(RuleKind::Repeat {
        min,
        max: max.into(),
        body: Rc::new(body),
        skip: SkipMode::Inherit,
        action: None,
    })
}

/// `body*`
pub fn zero_or_more(body: Rule) -> Rule {
    repetition(0, None, body)
}

/// `body+`
pub fn one_or_more(body: Rule) -> Rule {
    repetition(1, None, body)
}

/// `body<n>`: exactly `n` repetitions.
pub fn exactly(n: u32, body: Rule) -> Rule {
    repetition(n, n, body)
}

/// `body?`: the inner value, or `Absent` without consuming anything.
pub fn optional(body: Rule) -> Rule {
    Rule::from_kind(RuleKind::Optional(Rc::new(body)))
}

/// Positive lookahead: succeeds iff `body` matches here; consumes nothing.
pub fn ahead(body: Rule) -> Rule {
    Rule::from_kind(RuleKind::Lookahead {
        body: Rc::new(body),
        positive: true,
    })
}

/// Negative lookahead: succeeds iff `body` does not match here; consumes
/// nothing.
pub fn not_ahead(body: Rule) -> Rule {
    Rule::from_kind(RuleKind::Lookahead {
        body: Rc::new(body),
        positive: false,
    })
}

/// A semantic predicate over the enclosing sequence's results so far.
pub fn pred(name: &str, test: impl Fn(&[Value]) -> bool + 'static) -> Rule {
    Rule::from_kind(RuleKind::Predicate(Predicate::new(name, test)))
}

/// A by-name reference resolved through the grammar environment on every
/// invocation, permitting forward and mutually recursive declarations.
pub fn r(name: impl Into<String>) -> Rule {
    Rule::from_kind(RuleKind::Reference(name.into()))
}

/// A by-name parametrised-rule call, resolved through the grammar
/// environment and materialised on first parse.
pub fn call(name: impl Into<String>, args: impl IntoIterator<Item = Rule>) -> Rule {
    Rule::from_kind(RuleKind::ParamCall(ParamCall {
        target: FactoryRef::Named(name.into()),
        args: Rc::new(args.into_iter().collect()),
        instance: OnceCell::new(),
    }))
}

/// Lock the text matched by `body` on first success; later invocations in
/// the same memo scope must match that exact text.
pub fn memo(body: Rule) -> Rule {
    Rule::from_kind(RuleKind::Memo {
        key: MEMO_KEYS.fetch_add(1, Ordering::Relaxed),
        body: Rc::new(body),
    })
}
