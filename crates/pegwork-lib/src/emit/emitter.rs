//! Walks a grammar AST and produces Rust source that rebuilds the grammar
//! with the engine's DSL.
//!
//! The emitted file contains, in order: the verbatim header code, the named
//! action functions (one per multi-line action), and `grammar()`, which
//! defines every declaration against a builtin-seeded environment. Rule
//! references are by name (`r(...)` / `call(...)`), so mutual recursion and
//! forward references need no textual pre-declaration; parametrised
//! declarations become environment factories, which keeps self-recursive
//! parametrised rules lazy.

use indexmap::IndexMap;

use crate::ast::{
    ActionCode, Atom, File, Item, Predicate, Production, ProductionChoices, ProductionGroup,
    Repeat, RuleDecl,
};
use crate::engine::helpers::BUILTIN_NAMES;
use crate::engine::pattern::Pattern;
use crate::escape::decode_escapes;

use super::EmitError;

/// Emit a whole grammar file as Rust source.
pub fn emit_file(file: &File) -> Result<String, EmitError> {
    Emitter::new(file)?.emit()
}

struct Emitter<'a> {
    file: &'a File,
    decls: IndexMap<&'a str, &'a RuleDecl>,
    /// Named functions for multi-line actions, emitted above `grammar()`.
    actions: Vec<String>,
    action_count: usize,
}

/// What names mean inside the declaration currently being emitted.
struct Scope<'a> {
    decl: &'a str,
    params: &'a [String],
}

impl<'a> Emitter<'a> {
    fn new(file: &'a File) -> Result<Self, EmitError> {
        let mut decls: IndexMap<&str, &RuleDecl> = IndexMap::new();
        for decl in &file.rules {
            if decls.insert(decl.name.as_str(), decl).is_some() {
                return Err(EmitError::Redefined(decl.name.clone()));
            }
        }
        Ok(Self {
            file,
            decls,
            actions: Vec::new(),
            action_count: 0,
        })
    }

    fn emit(mut self) -> Result<String, EmitError> {
        let file = self.file;
        let mut defines: Vec<String> = Vec::new();

        for decl in &file.rules {
            if decl.choices.groups.is_empty()
                || decl.choices.groups.iter().any(|g| g.items.is_empty())
            {
                return Err(EmitError::EmptyBody(decl.name.clone()));
            }

            let empty: Vec<String> = Vec::new();
            let params = decl.params.as_deref().unwrap_or(&empty);
            let scope = Scope {
                decl: &decl.name,
                params,
            };

            let mut expr = self.emit_choices(&decl.choices, &scope, 8)?;
            if let Some(skip) = &decl.skip {
                let skip_expr = self.emit_production(skip, &scope, 8)?;
                expr = format!("{expr}.with_skip({skip_expr})");
            }

            if decl.params.is_some() {
                let argpat = if params.is_empty() { "_args" } else { "args" };
                let mut bindings = String::new();
                for (i, param) in params.iter().enumerate() {
                    bindings.push_str(&format!("        let {param} = args[{i}].clone();\n"));
                }
                defines.push(format!(
                    "    g.define_factory({name:?}, move |{argpat}| {{\n{bindings}        {expr}\n    }})?;",
                    name = decl.name,
                ));
            } else {
                defines.push(format!("    g.define({name:?}, {expr})?;", name = decl.name));
            }
        }

        let mut out = String::new();
        out.push_str("// @generated by pegwork.\n\n");
        out.push_str("use pegwork_lib::prelude::*;\n");

        if let Some(header) = &self.file.header {
            out.push('\n');
            out.push_str(header.trim());
            out.push('\n');
        }

        for action in &self.actions {
            out.push('\n');
            out.push_str(action);
        }

        out.push_str("\npub fn grammar() -> Result<Grammar, GrammarError> {\n");
        out.push_str("    let mut g = Grammar::with_builtins();\n");
        for define in &defines {
            out.push_str(define);
            out.push('\n');
        }
        out.push_str("    Ok(g)\n}\n");

        if let Some(footer) = &self.file.footer {
            out.push('\n');
            out.push_str(footer.trim());
            out.push('\n');
        }

        Ok(out)
    }

    fn emit_choices(
        &mut self,
        choices: &ProductionChoices,
        scope: &Scope<'_>,
        indent: usize,
    ) -> Result<String, EmitError> {
        if choices.groups.len() == 1 {
            return self.emit_group(&choices.groups[0], scope, indent);
        }
        let inner_pad = " ".repeat(indent + 4);
        let close_pad = " ".repeat(indent);
        let mut out = String::from("choice([\n");
        for group in &choices.groups {
            let expr = self.emit_group(group, scope, indent + 4)?;
            out.push_str(&inner_pad);
            out.push_str(&expr);
            out.push_str(",\n");
        }
        out.push_str(&close_pad);
        out.push_str("])");
        Ok(out)
    }

    fn emit_group(
        &mut self,
        group: &ProductionGroup,
        scope: &Scope<'_>,
        indent: usize,
    ) -> Result<String, EmitError> {
        let mut labels: Vec<String> = Vec::new();
        let mut parts: Vec<String> = Vec::new();

        for item in &group.items {
            match item {
                Item::Production(p) => {
                    let expr = self.emit_production(p, scope, indent)?;
                    labels.push(
                        p.label
                            .clone()
                            .unwrap_or_else(|| format!("_{}", labels.len())),
                    );
                    parts.push(expr);
                }
                Item::LookAhead(la) => {
                    let inner = self.emit_production(&la.production, scope, indent)?;
                    let wrapper = if la.negative { "not_ahead" } else { "ahead" };
                    parts.push(format!("{wrapper}({inner})"));
                }
                Item::Predicate(pred) => {
                    parts.push(self.emit_predicate(pred, &labels, scope));
                }
            }
        }

        let mut expr = if parts.len() == 1 {
            parts.pop().expect("length checked")
        } else {
            format!("seq([{}])", parts.join(", "))
        };

        if let Some(action) = &group.action {
            let action_expr = self.emit_action(action, &labels, scope);
            expr = format!("{expr}.with_action({action_expr})");
        }
        Ok(expr)
    }

    /// Semantic predicates bind the labels collected so far and evaluate
    /// the user's test over them.
    fn emit_predicate(&mut self, pred: &Predicate, labels: &[String], scope: &Scope<'_>) -> String {
        let valpat = if labels.is_empty() { "_vals" } else { "vals" };
        let mut bindings = String::new();
        for (i, label) in labels.iter().enumerate() {
            bindings.push_str(&format!(
                "let {label} = vals.get({i}).cloned().unwrap_or_default(); "
            ));
        }
        format!(
            "pred(\"{decl} predicate\", |{valpat}: &[Value]| {{ {bindings}{code} }})",
            decl = scope.decl,
            code = pred.code,
        )
    }

    /// A single-line, `return`-free action inlines as an `action!` closure;
    /// anything longer becomes a named top-level function taking the
    /// group's labels.
    fn emit_action(&mut self, action: &ActionCode, labels: &[String], scope: &Scope<'_>) -> String {
        let n = self.action_count;
        self.action_count += 1;

        if !action.code.contains('\n') && !action.code.contains("return") {
            return format!(
                "action!(\"{decl}_{n}\", |{args}| {code})",
                decl = scope.decl,
                args = labels.join(", "),
                code = action.code,
            );
        }

        let name = format!("action_{n}");
        let mut body = String::new();
        body.push_str(&format!(
            "fn {name}(vals: &[Value]) -> Result<Value, ActionError> {{\n"
        ));
        body.push_str("    let mut iter = vals.iter();\n");
        for label in labels {
            body.push_str(&format!(
                "    let {label} = iter.next().cloned().unwrap_or_default();\n"
            ));
        }
        for line in action.code.lines() {
            body.push_str("    ");
            body.push_str(line);
            body.push('\n');
        }
        body.push_str("}\n");
        self.actions.push(body);

        format!("Action::new(\"{name}\", {name})")
    }

    fn emit_production(
        &mut self,
        production: &Production,
        scope: &Scope<'_>,
        indent: usize,
    ) -> Result<String, EmitError> {
        let mut expr = self.emit_atom(&production.atom, scope, indent)?;
        if let Some(rep) = production.repeat {
            expr = wrap_repeat(expr, rep);
        }
        Ok(expr)
    }

    fn emit_atom(
        &mut self,
        atom: &Atom,
        scope: &Scope<'_>,
        indent: usize,
    ) -> Result<String, EmitError> {
        match atom {
            Atom::Str(text) => Ok(format!("lit({text:?})")),
            Atom::Regexp { pattern, flags } => {
                self.check_pattern(pattern, flags, scope)?;
                if flags.is_empty() {
                    Ok(format!("regex({pattern:?})"))
                } else {
                    Ok(format!("regex_flags({pattern:?}, {flags:?})"))
                }
            }
            Atom::RuleCall { name, args } => self.emit_call(name, args.as_deref(), scope),
            Atom::External(code) => {
                if code.starts_with('(') {
                    Ok(code.clone())
                } else {
                    Ok(format!("{code}()"))
                }
            }
            Atom::Choices(choices) => self.emit_choices(choices, scope, indent),
        }
    }

    fn emit_call(
        &mut self,
        name: &str,
        args: Option<&str>,
        scope: &Scope<'_>,
    ) -> Result<String, EmitError> {
        if scope.params.iter().any(|p| p == name) {
            return Ok(format!("{name}.clone()"));
        }

        let mut arg_exprs: Vec<String> = Vec::new();
        if let Some(raw) = args {
            for piece in split_args(raw) {
                let piece = piece.trim();
                if !piece.is_empty() {
                    arg_exprs.push(self.emit_arg(piece, scope)?);
                }
            }
        }

        if let Some(decl) = self.decls.get(name) {
            if decl.params.is_none() && arg_exprs.is_empty() {
                return Ok(format!("r({name:?})"));
            }
            return Ok(format!("call({name:?}, [{}])", arg_exprs.join(", ")));
        }
        if BUILTIN_NAMES.contains(&name) {
            return Ok(format!("call({name:?}, [{}])", arg_exprs.join(", ")));
        }
        Err(EmitError::Unknown {
            name: name.to_string(),
            context: scope.decl.to_string(),
        })
    }

    /// One argument of a rule call: a string, a regexp, a number, a nested
    /// call, an external, or verbatim host code.
    fn emit_arg(&mut self, arg: &str, scope: &Scope<'_>) -> Result<String, EmitError> {
        let mut chars = arg.chars();
        match chars.next() {
            Some(q @ ('\'' | '"')) if arg.len() >= 2 && arg.ends_with(q) => {
                let content = decode_escapes(&arg[1..arg.len() - 1]);
                Ok(format!("lit({content:?})"))
            }
            Some('/') => {
                let (pattern, flags) = split_regex(arg);
                self.check_pattern(&pattern, &flags, scope)?;
                if flags.is_empty() {
                    Ok(format!("regex({pattern:?})"))
                } else {
                    Ok(format!("regex_flags({pattern:?}, {flags:?})"))
                }
            }
            Some('$') => {
                let rest = &arg[1..];
                if rest.starts_with('(') {
                    Ok(rest.to_string())
                } else {
                    Ok(format!("{rest}()"))
                }
            }
            Some(c) if c.is_ascii_digit() || c == '-' => Ok(format!("lit({arg:?})")),
            Some(c) if c.is_alphabetic() || c == '_' => {
                let split = arg
                    .find(|ch: char| !ch.is_alphanumeric() && ch != '_')
                    .unwrap_or(arg.len());
                let (name, rest) = arg.split_at(split);
                let rest = rest.trim();
                if rest.is_empty() {
                    self.emit_call(name, None, scope)
                } else if rest.starts_with('(') && rest.ends_with(')') {
                    self.emit_call(name, Some(&rest[1..rest.len() - 1]), scope)
                } else {
                    // Host code; passed through untouched.
                    Ok(arg.to_string())
                }
            }
            _ => Ok(arg.to_string()),
        }
    }

    fn check_pattern(
        &self,
        pattern: &str,
        flags: &str,
        scope: &Scope<'_>,
    ) -> Result<(), EmitError> {
        Pattern::with_flags(pattern, flags).map_err(|e| EmitError::InvalidRegex {
            pattern: pattern.to_string(),
            context: scope.decl.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}

/// Map repetition bounds onto the DSL constructors.
fn wrap_repeat(expr: String, rep: Repeat) -> String {
    match (rep.min, rep.max) {
        (0 | -1, -1) => format!("zero_or_more({expr})"),
        (1, -1) => format!("one_or_more({expr})"),
        (0, 1) => format!("optional({expr})"),
        (a, b) if a == b && a >= 0 => format!("exactly({a}, {expr})"),
        (a, b) => {
            let min = a.max(0);
            let max = if b < 0 {
                "None".to_string()
            } else {
                b.to_string()
            };
            format!("repetition({min}, {max}, {expr})")
        }
    }
}

/// Split call-argument text on top-level commas, respecting brackets,
/// strings and regexps.
fn split_args(raw: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut delim: Option<char> = None;
    let mut escaped = false;

    for c in raw.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match delim {
            Some(d) => {
                if c == '\\' {
                    escaped = true;
                } else if c == d {
                    delim = None;
                }
                current.push(c);
            }
            None => match c {
                '\\' => {
                    escaped = true;
                    current.push(c);
                }
                '\'' | '"' | '/' => {
                    delim = Some(c);
                    current.push(c);
                }
                '(' | '[' | '{' => {
                    depth += 1;
                    current.push(c);
                }
                ')' | ']' | '}' => {
                    depth = depth.saturating_sub(1);
                    current.push(c);
                }
                ',' if depth == 0 => {
                    pieces.push(std::mem::take(&mut current));
                }
                _ => current.push(c),
            },
        }
    }
    if !current.trim().is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Split `/pattern/flags` into its parts, unescaping the delimiter.
fn split_regex(raw: &str) -> (String, String) {
    let body = &raw[1..];
    let mut end = body.len();
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '/' => {
                end = i;
                break;
            }
            _ => {}
        }
    }
    let pattern = body[..end].replace("\\/", "/");
    let flags = body.get(end + 1..).unwrap_or("").to_string();
    (pattern, flags)
}
