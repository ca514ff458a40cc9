//! Proxy Factory
//!
//! Turns a [`TypeDescriptor`] into a [`ProxyClass`]: a dispatch table from
//! generated member names to bridge operations, built once per type and
//! shared by every [`InstanceProxy`] of that type.
//!
//! For an accessor `x` the class gets `getX` / `setX`; each method name maps
//! to itself. Method names that collide with the proxy's own low-level API
//! (see [`BLOCKED_METHODS`]) are left out and stay reachable through
//! [`InstanceProxy::call`].

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::bridge::{Bridge, WeakBridge};
use crate::error::BridgeError;
use crate::value::{LocalFunction, Value};
use crate::wire::{FunctionId, ObjectId, TypeDescriptor};

/// Method names never added to a dispatch table.
pub const BLOCKED_METHODS: [&str; 4] = ["toString", "get", "set", "call"];

pub fn is_blocked(method: &str) -> bool {
    BLOCKED_METHODS.contains(&method)
}

/// `"x"` -> `"X"`, `"_y"` -> `"_y"`: only a leading `a..=z` is upper-cased.
fn accessor_suffix(accessor: &str) -> Cow<'_, str> {
    match accessor.chars().next() {
        Some(c) if c.is_ascii_lowercase() => {
            let mut suffix = String::with_capacity(accessor.len());
            suffix.push(c.to_ascii_uppercase());
            suffix.push_str(&accessor[1..]);
            Cow::Owned(suffix)
        }
        _ => Cow::Borrowed(accessor),
    }
}

pub fn getter_name(accessor: &str) -> String {
    format!("get{}", accessor_suffix(accessor))
}

pub fn setter_name(accessor: &str) -> String {
    format!("set{}", accessor_suffix(accessor))
}

/// What a generated member does when invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    /// Reads the named remote property.
    Getter(String),
    /// Writes the named remote property with the first argument.
    Setter(String),
    /// Invokes the named remote method with all arguments.
    Method(String),
}

/// Dispatch table for one remote type.
#[derive(Debug)]
pub struct ProxyClass {
    descriptor: TypeDescriptor,
    members: BTreeMap<String, Member>,
}

impl ProxyClass {
    pub fn build(descriptor: &TypeDescriptor) -> Self {
        let mut members = BTreeMap::new();
        for accessor in &descriptor.accessors {
            members.insert(getter_name(accessor), Member::Getter(accessor.clone()));
            members.insert(setter_name(accessor), Member::Setter(accessor.clone()));
        }
        // Methods go in last and win over a colliding accessor name.
        for method in descriptor.methods.iter().filter(|m| !is_blocked(m)) {
            members.insert(method.clone(), Member::Method(method.clone()));
        }
        Self {
            descriptor: descriptor.clone(),
            members,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.descriptor.type_name
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }

    pub fn members(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.members.iter().map(|(name, member)| (name.as_str(), member))
    }
}

/// Local stand-in for a remote object.
///
/// Identity is `(bridge, object_id)`; a bridge hands out one shared proxy per
/// object id, so proxies can be compared with [`Rc::ptr_eq`].
pub struct InstanceProxy {
    bridge: WeakBridge,
    object_id: ObjectId,
    class: Rc<ProxyClass>,
}

impl InstanceProxy {
    pub(crate) fn new(bridge: WeakBridge, object_id: ObjectId, class: Rc<ProxyClass>) -> Self {
        Self {
            bridge,
            object_id,
            class,
        }
    }

    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    pub fn type_name(&self) -> &str {
        self.class.type_name()
    }

    pub fn class(&self) -> &Rc<ProxyClass> {
        &self.class
    }

    pub fn bridge(&self) -> Result<Bridge, BridgeError> {
        self.bridge.upgrade().ok_or_else(|| BridgeError::Detached {
            what: format!("instance {} ({})", self.object_id, self.type_name()),
        })
    }

    pub(crate) fn belongs_to(&self, bridge: &Bridge) -> bool {
        self.bridge.points_to(bridge)
    }

    /// Read a remote property by its raw name.
    pub fn get(&self, property: &str) -> Result<Value, BridgeError> {
        self.bridge()?.get_property(self.object_id, property)
    }

    /// Write a remote property by its raw name.
    pub fn set(&self, property: &str, value: Value) -> Result<(), BridgeError> {
        self.bridge()?.set_property(self.object_id, property, value)
    }

    /// Invoke a remote method by its raw name, blocked names included.
    pub fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, BridgeError> {
        self.bridge()?.invoke_method(self.object_id, method, args)
    }

    /// Run a generated member (`getX`, `setX`, or a method) by name.
    pub fn invoke(&self, member: &str, args: Vec<Value>) -> Result<Value, BridgeError> {
        match self.class.member(member) {
            Some(Member::Getter(accessor)) => self.get(accessor),
            Some(Member::Setter(accessor)) => {
                let value = args.into_iter().next().unwrap_or(Value::Undefined);
                self.set(accessor, value)?;
                Ok(Value::Undefined)
            }
            Some(Member::Method(method)) => self.call(method, args),
            None => Err(BridgeError::UnknownMember {
                type_name: self.type_name().to_string(),
                member: member.to_string(),
            }),
        }
    }

    pub fn has_member(&self, member: &str) -> bool {
        self.class.member(member).is_some()
    }

    pub fn add_ref(&self) -> Result<(), BridgeError> {
        self.bridge()?.add_ref(self)
    }

    pub fn release(&self) -> Result<(), BridgeError> {
        self.bridge()?.release(self)
    }
}

impl fmt::Debug for InstanceProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceProxy")
            .field("object_id", &self.object_id)
            .field("type_name", &self.type_name())
            .finish()
    }
}

/// Local stand-in for a function living on the remote side.
pub struct RemoteFunction {
    bridge: WeakBridge,
    function_id: FunctionId,
    // Lazily built when this proxy is passed to a bridge other than its own.
    forwarder: RefCell<Option<LocalFunction>>,
}

impl RemoteFunction {
    pub(crate) fn new(bridge: WeakBridge, function_id: FunctionId) -> Self {
        Self {
            bridge,
            function_id,
            forwarder: RefCell::new(None),
        }
    }

    pub fn function_id(&self) -> FunctionId {
        self.function_id
    }

    pub fn bridge(&self) -> Result<Bridge, BridgeError> {
        self.bridge.upgrade().ok_or_else(|| BridgeError::Detached {
            what: format!("remote function {}", self.function_id),
        })
    }

    pub fn call(&self, args: Vec<Value>) -> Result<Value, BridgeError> {
        self.bridge()?.invoke_function(self.function_id, args)
    }

    pub(crate) fn belongs_to(&self, bridge: &Bridge) -> bool {
        self.bridge.points_to(bridge)
    }

    /// A local callable that forwards to this remote function.
    pub(crate) fn forwarder(self: &Rc<Self>) -> LocalFunction {
        self.forwarder
            .borrow_mut()
            .get_or_insert_with(|| {
                let target: Weak<RemoteFunction> = Rc::downgrade(self);
                LocalFunction::new(move |args| match target.upgrade() {
                    Some(function) => function.call(args),
                    None => Err(BridgeError::Detached {
                        what: "forwarded remote function".to_string(),
                    }),
                })
            })
            .clone()
    }
}

impl fmt::Debug for RemoteFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteFunction")
            .field("function_id", &self.function_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercase_accessor_is_capitalized() {
        assert_eq!(getter_name("x"), "getX");
        assert_eq!(setter_name("x"), "setX");
        assert_eq!(getter_name("width"), "getWidth");
    }

    #[test]
    fn non_lowercase_accessor_is_used_verbatim() {
        assert_eq!(getter_name("_y"), "get_y");
        assert_eq!(setter_name("_y"), "set_y");
        assert_eq!(getter_name("Alpha"), "getAlpha");
        assert_eq!(getter_name("éclat"), "getéclat");
        assert_eq!(getter_name(""), "get");
    }

    #[test]
    fn class_skips_blocked_methods() {
        let desc = TypeDescriptor::new("Widget")
            .accessor("x")
            .method("toString")
            .method("get")
            .method("set")
            .method("call")
            .method("resize");
        let class = ProxyClass::build(&desc);
        let names: Vec<&str> = class.members().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["getX", "resize", "setX"]);
        assert_eq!(class.member("getX"), Some(&Member::Getter("x".into())));
        assert_eq!(class.member("setX"), Some(&Member::Setter("x".into())));
        assert_eq!(class.member("resize"), Some(&Member::Method("resize".into())));
        assert!(class.member("toString").is_none());
    }

    #[test]
    fn method_wins_over_generated_accessor() {
        let desc = TypeDescriptor::new("Odd").accessor("name").method("getName");
        let class = ProxyClass::build(&desc);
        assert_eq!(class.member("getName"), Some(&Member::Method("getName".into())));
        assert_eq!(class.member("setName"), Some(&Member::Setter("name".into())));
    }
}
