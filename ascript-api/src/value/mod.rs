//! # Script Values
//!
//! Runtime values handled by actors, together with the mutability model that
//! makes cross-actor sharing safe.
//!
//! ## Key Concepts
//! - Primitives (null, booleans, numbers, strings) are immutable and copied freely
//! - Records and arrays are reference types backed by an [`Object`] node
//! - Every object node carries a [`Mutability`] tag
//! - Function values and actor references are opaque, immutable handles
//!
//! ## Sharing Model
//! Mutable aliases of a record share one node, so a write through one alias is
//! visible through the others. Freezing creates a new node that shares the
//! current storage; the next write through a mutable alias forks that storage
//! (copy-on-write), so frozen aliases keep observing the snapshot they were
//! taken from.

mod freeze;
mod json;
mod object;

pub use object::{NodeId, Object, ObjectKind};

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::address::ActorRef;
use crate::errors::ActorError;
use crate::types::ActorResult;

/// Mutability tag of a composite value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutability {
    /// Writable; shared by all aliases of the node
    Mutable,
    /// Top-level immutable; children keep their own tags
    Frozen,
    /// Immutable together with everything reachable from it
    DeepFrozen,
}

impl fmt::Display for Mutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutability::Mutable => write!(f, "mutable"),
            Mutability::Frozen => write!(f, "frozen"),
            Mutability::DeepFrozen => write!(f, "deep-frozen"),
        }
    }
}

/// Opaque function value.
///
/// The body is whatever the evaluator stores for a closure; the runtime only
/// moves it around and compares it by identity.
#[derive(Clone)]
pub struct FunctionRef {
    name: Arc<str>,
    body: Arc<dyn Any + Send + Sync>,
}

impl FunctionRef {
    pub fn new<T: Any + Send + Sync>(name: &str, body: T) -> Self {
        Self {
            name: Arc::from(name),
            body: Arc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.body.downcast_ref::<T>()
    }

    pub fn ptr_eq(&self, other: &FunctionRef) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }
}

impl fmt::Debug for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRef").field("name", &self.name).finish()
    }
}

/// A script value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(Arc<str>),
    Object(Object),
    Function(FunctionRef),
    Actor(ActorRef),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Value {
    /// Creates a mutable record from `(key, value)` pairs.
    pub fn record<K, I>(entries: I) -> Value
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Object(Object::record(entries))
    }

    /// Creates a mutable array.
    pub fn array<I: IntoIterator<Item = Value>>(items: I) -> Value {
        Value::Object(Object::array(items))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(obj) => match obj.kind() {
                ObjectKind::Record => "record",
                ObjectKind::Array => "array",
            },
            Value::Function(_) => "function",
            Value::Actor(_) => "actor",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_actor(&self) -> Option<&ActorRef> {
        match self {
            Value::Actor(actor) => Some(actor),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionRef> {
        match self {
            Value::Function(func) => Some(func),
            _ => None,
        }
    }

    /// Script truthiness.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Reads a member. Non-objects and missing members read as `Null`.
    pub fn get(&self, key: &str) -> Value {
        match self {
            Value::Object(obj) => obj.get(key),
            Value::String(s) if key == "length" => Value::from(s.chars().count()),
            _ => Value::Null,
        }
    }

    /// Writes a member, failing on frozen objects and non-objects.
    pub fn set(&self, key: &str, value: Value) -> ActorResult<()> {
        match self {
            Value::Object(obj) => obj.set(key, value),
            other => Err(ActorError::TypeError(format!(
                "Cannot set property '{}' of {}",
                key,
                other.type_name()
            ))),
        }
    }

    /// Identity comparison: objects compare by node, everything else by value.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            _ => self.deep_eq(other),
        }
    }

    /// Structural equality. Cycles are compared pairwise and terminate.
    pub fn deep_eq(&self, other: &Value) -> bool {
        let mut seen = HashSet::new();
        deep_eq_inner(self, other, &mut seen)
    }
}

fn deep_eq_inner(a: &Value, b: &Value, seen: &mut HashSet<(NodeId, NodeId)>) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Function(x), Value::Function(y)) => x.ptr_eq(y),
        (Value::Actor(x), Value::Actor(y)) => x == y,
        (Value::Object(x), Value::Object(y)) => {
            if x.ptr_eq(y) {
                return true;
            }
            if x.kind() != y.kind() {
                return false;
            }
            // A pair already under comparison is assumed equal
            if !seen.insert((x.id(), y.id())) {
                return true;
            }
            let left = x.entries();
            let right = y.entries();
            left.len() == right.len()
                && left
                    .iter()
                    .zip(right.iter())
                    .all(|((ka, va), (kb, vb))| ka == kb && deep_eq_inner(va, vb, seen))
        }
        _ => false,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.deep_eq(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ancestors = Vec::new();
        write_value(f, self, &mut ancestors, false)
    }
}

fn write_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        write!(f, "{}", n as i64)
    } else if n.is_nan() {
        write!(f, "NaN")
    } else if n.is_infinite() {
        write!(f, "{}", if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        write!(f, "{}", n)
    }
}

fn write_value(
    f: &mut fmt::Formatter<'_>,
    value: &Value,
    ancestors: &mut Vec<NodeId>,
    nested: bool,
) -> fmt::Result {
    match value {
        Value::Null => write!(f, "null"),
        Value::Bool(b) => write!(f, "{}", b),
        Value::Number(n) => write_number(f, *n),
        Value::String(s) if nested => write!(f, "{:?}", s),
        Value::String(s) => write!(f, "{}", s),
        Value::Function(func) => write!(f, "[Function {}]", func.name()),
        Value::Actor(actor) => write!(f, "<actor {}>", actor.path()),
        Value::Object(obj) => {
            if ancestors.contains(&obj.id()) {
                return write!(f, "[Circular]");
            }
            ancestors.push(obj.id());
            let result = match obj.kind() {
                ObjectKind::Array => {
                    write!(f, "[")?;
                    for (i, item) in obj.values().iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write_value(f, item, ancestors, true)?;
                    }
                    write!(f, "]")
                }
                ObjectKind::Record => {
                    write!(f, "{{")?;
                    for (i, (key, item)) in obj.entries().iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}: ", key)?;
                        write_value(f, item, ancestors, true)?;
                    }
                    write!(f, "}}")
                }
            };
            ancestors.pop();
            result
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self {
        Value::Object(obj)
    }
}

impl From<ActorRef> for Value {
    fn from(actor: ActorRef) -> Self {
        Value::Actor(actor)
    }
}

impl From<FunctionRef> for Value {
    fn from(func: FunctionRef) -> Self {
        Value::Function(func)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_script_rendering() {
        let value = Value::record([
            ("x", Value::from(5)),
            ("name", Value::from("a")),
            ("items", Value::array([Value::from(1.5), Value::Null])),
        ]);
        assert_eq!(value.to_string(), "{items: [1.5, null], name: \"a\", x: 5}");
        assert_eq!(Value::from("Echo: hi").to_string(), "Echo: hi");
    }

    #[test]
    fn test_display_marks_cycles() {
        let obj = Object::record([("a", Value::from(1))]);
        obj.set("self", Value::Object(obj.clone())).unwrap();
        assert_eq!(Value::Object(obj).to_string(), "{a: 1, self: [Circular]}");
    }

    #[test]
    fn test_deep_eq_on_cycles_terminates() {
        let a = Object::record(Vec::<(String, Value)>::new());
        a.set("me", Value::Object(a.clone())).unwrap();
        let b = Object::record(Vec::<(String, Value)>::new());
        b.set("me", Value::Object(b.clone())).unwrap();
        assert!(Value::Object(a.clone()).deep_eq(&Value::Object(b.clone())));
        assert!(!Value::Object(a).same(&Value::Object(b)));
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(Value::array([]).is_truthy());
    }
}
