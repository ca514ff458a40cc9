//! Native values
//!
//! What the host sees on its side of the bridge: plain data, proxies for
//! remote objects and functions, and local callables it hands out.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::error::BridgeError;
use crate::proxy::{InstanceProxy, RemoteFunction};
use crate::wire::GlobalFunctionId;

/// A value on the host side of the bridge.
#[derive(Debug, Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    /// Proxy for an object living on the remote side.
    Instance(Rc<InstanceProxy>),
    Function(Callable),
    /// Structured data with no proxy representation, passed through as-is.
    Opaque(serde_json::Value),
}

impl Value {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
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

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Rc<InstanceProxy>> {
        match self {
            Value::Instance(proxy) => Some(proxy),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Value::Function(callable) => Some(callable),
            _ => None,
        }
    }
}

/// Proxies and callables compare by identity, everything else by value.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => a.same_as(b),
            (Value::Opaque(a), Value::Opaque(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<Rc<InstanceProxy>> for Value {
    fn from(v: Rc<InstanceProxy>) -> Self {
        Value::Instance(v)
    }
}

impl From<LocalFunction> for Value {
    fn from(v: LocalFunction) -> Self {
        Value::Function(Callable::Local(v))
    }
}

impl From<Rc<RemoteFunction>> for Value {
    fn from(v: Rc<RemoteFunction>) -> Self {
        Value::Function(Callable::Remote(v))
    }
}

/// Either side's function, callable from the host.
#[derive(Debug, Clone)]
pub enum Callable {
    Local(LocalFunction),
    Remote(Rc<RemoteFunction>),
}

impl Callable {
    pub fn call(&self, args: Vec<Value>) -> Result<Value, BridgeError> {
        match self {
            Callable::Local(f) => f.call(args),
            Callable::Remote(f) => f.call(args),
        }
    }

    pub fn same_as(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::Local(a), Callable::Local(b)) => a.ptr_eq(b),
            (Callable::Remote(a), Callable::Remote(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

type LocalFn = dyn Fn(Vec<Value>) -> Result<Value, BridgeError>;

struct LocalFunctionInner {
    func: Box<LocalFn>,
    // Tagged on first registration so repeat registrations reuse the id.
    id: Cell<Option<GlobalFunctionId>>,
}

/// A host callable that can be handed to the remote side.
///
/// Clones share identity: registering any clone yields the same
/// [`GlobalFunctionId`].
#[derive(Clone)]
pub struct LocalFunction {
    inner: Rc<LocalFunctionInner>,
}

impl LocalFunction {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, BridgeError> + 'static,
    {
        Self {
            inner: Rc::new(LocalFunctionInner {
                func: Box::new(func),
                id: Cell::new(None),
            }),
        }
    }

    pub fn call(&self, args: Vec<Value>) -> Result<Value, BridgeError> {
        (self.inner.func)(args)
    }

    /// The id assigned when this function was first passed to a bridge.
    pub fn id(&self) -> Option<GlobalFunctionId> {
        self.inner.id.get()
    }

    pub(crate) fn tag(&self, id: GlobalFunctionId) {
        self.inner.id.set(Some(id));
    }

    pub fn ptr_eq(&self, other: &LocalFunction) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for LocalFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalFunction").field("id", &self.id()).finish()
    }
}
