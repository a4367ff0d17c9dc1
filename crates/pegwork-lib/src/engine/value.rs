//! Untyped values produced by rule evaluation.
//!
//! Rules in a PEG grammar can yield anything their actions decide to build,
//! so results are represented as a small dynamic sum. Grammar actions that
//! construct domain objects store them behind [`Value::Node`] and downcast
//! on the way out.

use std::any::Any;
use std::rc::Rc;

/// A value produced by evaluating a rule.
#[derive(Clone, Default)]
pub enum Value {
    /// An optional element that did not match. Singular and inert.
    #[default]
    Absent,
    /// Sentinel yielded by lookahead and predicates; sequences filter it
    /// out of their collected results.
    Ignored,
    /// Matched text or a string built by an action.
    Str(String),
    /// An integer built by an action.
    Int(i64),
    /// Ordered results of a sequence or repetition.
    Seq(Vec<Value>),
    /// A user object built by an action (e.g. an AST node).
    Node(Rc<dyn Any>),
}

impl Value {
    /// Wrap a user object so an action can return it.
    pub fn node<T: 'static>(node: T) -> Self {
        Value::Node(Rc::new(node))
    }

    /// Recover a user object stored with [`Value::node`].
    pub fn downcast<T: 'static>(&self) -> Option<Rc<T>> {
        match self {
            Value::Node(rc) => rc.clone().downcast::<T>().ok(),
            _ => None,
        }
    }

    #[inline]
    pub fn is_ignored(&self) -> bool {
        matches!(self, Value::Ignored)
    }

    #[inline]
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(items) => Some(items),
            _ => None,
        }
    }

    /// Flatten this value into text: strings pass through, sequences
    /// concatenate their elements, everything else contributes nothing.
    pub fn flatten_text(&self) -> String {
        fn walk(value: &Value, out: &mut String) {
            match value {
                Value::Str(s) => out.push_str(s),
                Value::Seq(items) => {
                    for item in items {
                        walk(item, out);
                    }
                }
                _ => {}
            }
        }
        let mut out = String::new();
        walk(self, &mut out);
        out
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Absent => write!(f, "Absent"),
            Value::Ignored => write!(f, "Ignored"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Seq(items) => f.debug_tuple("Seq").field(items).finish(),
            Value::Node(_) => write!(f, "Node(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Absent, Value::Absent) => true,
            (Value::Ignored, Value::Ignored) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Seq(a), Value::Seq(b)) => a == b,
            (Value::Node(a), Value::Node(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Seq(items)
    }
}

impl From<Option<Value>> for Value {
    fn from(v: Option<Value>) -> Self {
        v.unwrap_or(Value::Absent)
    }
}
