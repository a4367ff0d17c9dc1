//! The grammar-file AST.
//!
//! Nodes describe a parsed `.peg` file and live only until emission
//! completes. They serialize so the CLI can dump them as JSON.

use serde::Serialize;

/// A whole grammar file: optional verbatim host-code header and footer
/// around the rule declarations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct File {
    pub header: Option<String>,
    pub rules: Vec<RuleDecl>,
    pub footer: Option<String>,
}

/// One rule declaration: `name = choices`, optionally with formal
/// parameters and a `skip` clause.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleDecl {
    pub name: String,
    /// Formal parameter names for a parametrised rule.
    pub params: Option<Vec<String>>,
    /// The production attempted between items of this rule's sequences.
    pub skip: Option<Production>,
    pub choices: ProductionChoices,
}

/// Ordered alternatives separated by `|`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductionChoices {
    pub groups: Vec<ProductionGroup>,
}

/// One alternative: a run of items with an optional trailing action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductionGroup {
    pub items: Vec<Item>,
    pub action: Option<ActionCode>,
}

/// An element of a production group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Item {
    Production(Production),
    LookAhead(LookAhead),
    Predicate(Predicate),
}

/// A matched element: an atom with an optional label and repetition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Production {
    pub atom: Atom,
    pub label: Option<String>,
    pub repeat: Option<Repeat>,
}

/// Repetition bounds; `-1` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Repeat {
    pub min: i32,
    pub max: i32,
}

/// `!production` or `&production`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookAhead {
    pub production: Production,
    pub negative: bool,
}

/// `&{ test }` — a semantic predicate over the group's results so far.
/// A `!{ test }` form stores the negated test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Predicate {
    pub code: String,
}

/// The matchable core of a production.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Atom {
    /// `/pattern/flags`
    Regexp { pattern: String, flags: String },
    /// `'text'`, `"text"` or `\text` — stored decoded.
    Str(String),
    /// `name` or `name(args)`; `args` is the raw text between the parens.
    RuleCall { name: String, args: Option<String> },
    /// `$name` or `$(expr)` — host code used as a rule.
    External(String),
    /// `[ a | b | … ]`
    Choices(ProductionChoices),
}

/// Host code attached to a production group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionCode {
    pub code: String,
    pub kind: ActionKind,
}

/// Which concrete syntax the action used; emission keys off the content,
/// but round-trip tooling wants the original form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActionKind {
    /// `{ code }`
    Brace,
    /// `-> code to end of line`
    ArrowLine,
    /// `->` followed by an indented block.
    ArrowBlock,
}

impl Production {
    pub fn from_atom(atom: Atom) -> Self {
        Self {
            atom,
            label: None,
            repeat: None,
        }
    }
}

impl ProductionChoices {
    /// A single-group, single-item choice around one atom.
    pub fn single(production: Production) -> Self {
        Self {
            groups: vec![ProductionGroup {
                items: vec![Item::Production(production)],
                action: None,
            }],
        }
    }
}
