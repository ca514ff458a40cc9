//! Bridge
//!
//! One [`Bridge`] per attached remote endpoint. It owns the caches that give
//! remote objects a stable local identity (types, instances, remote
//! functions) and the registry of local callables handed to the remote side,
//! and it issues every outbound call.
//!
//! Every value-returning outbound call follows the same steps:
//!
//! 1. enter the shared [`CallDepth`] (fails fast when already inside a call)
//! 2. serialize arguments and submit to the endpoint
//! 3. turn an error sentinel reply into [`BridgeError::RemoteFault`]
//! 4. deserialize the reply, then leave the guard

mod codec;
mod guard;

pub use guard::{CallDepth, CallGuard};

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::config::BridgeConfig;
use crate::endpoint::{EndpointResult, RemoteEndpoint};
use crate::error::BridgeError;
use crate::proxy::{InstanceProxy, ProxyClass, RemoteFunction};
use crate::value::{LocalFunction, Value};
use crate::wire::{BridgeId, FunctionId, GlobalFunctionId, ObjectId, RemoteFault, WireValue};

#[derive(Default)]
struct Caches {
    types: HashMap<String, Rc<ProxyClass>>,
    instances: HashMap<ObjectId, Rc<InstanceProxy>>,
    remote_functions: HashMap<FunctionId, Rc<RemoteFunction>>,
    local_functions: HashMap<GlobalFunctionId, LocalFunction>,
    next_local_seq: u32,
}

struct BridgeShared {
    id: BridgeId,
    name: String,
    endpoint: Box<dyn RemoteEndpoint>,
    depth: CallDepth,
    config: Rc<BridgeConfig>,
    // Never borrowed across an endpoint call or a user callback.
    caches: RefCell<Caches>,
}

/// Handle to an attached bridge. Clones share the same bridge.
#[derive(Clone)]
pub struct Bridge {
    shared: Rc<BridgeShared>,
}

/// Non-owning handle held by proxies.
#[derive(Clone)]
pub struct WeakBridge(Weak<BridgeShared>);

impl WeakBridge {
    pub fn upgrade(&self) -> Option<Bridge> {
        self.0.upgrade().map(|shared| Bridge { shared })
    }

    pub(crate) fn points_to(&self, bridge: &Bridge) -> bool {
        std::ptr::eq(self.0.as_ptr(), Rc::as_ptr(&bridge.shared))
    }
}

impl Bridge {
    pub(crate) fn new(
        id: BridgeId,
        name: impl Into<String>,
        endpoint: Box<dyn RemoteEndpoint>,
        depth: CallDepth,
        config: Rc<BridgeConfig>,
    ) -> Self {
        Self {
            shared: Rc::new(BridgeShared {
                id,
                name: name.into(),
                endpoint,
                depth,
                config,
                caches: RefCell::new(Caches::default()),
            }),
        }
    }

    pub fn id(&self) -> BridgeId {
        self.shared.id
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.shared.config
    }

    /// Current depth of the context-wide outbound call counter.
    pub fn call_depth(&self) -> u32 {
        self.shared.depth.get()
    }

    pub fn downgrade(&self) -> WeakBridge {
        WeakBridge(Rc::downgrade(&self.shared))
    }

    pub fn ptr_eq(&self, other: &Bridge) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }

    // ------------------------------------------------------------------
    // Host API
    // ------------------------------------------------------------------

    /// The remote root object.
    pub fn root(&self) -> Result<Value, BridgeError> {
        self.request("getRoot", |endpoint| endpoint.get_root())
    }

    /// Construct a remote object of `class_name` and return its proxy.
    pub fn create(&self, class_name: &str) -> Result<Value, BridgeError> {
        self.request("create", |endpoint| endpoint.create(class_name))
    }

    /// Ask the remote side to drop every reference it holds for this bridge.
    pub fn release_remote_objects(&self) -> Result<(), BridgeError> {
        self.outbound("releaseAll", |endpoint| endpoint.release_all())?;
        Ok(())
    }

    /// Ask the remote side to drop one object. Non-proxy values are ignored
    /// and report `false`.
    pub fn release_named_object(&self, value: &Value) -> Result<bool, BridgeError> {
        let Value::Instance(proxy) = value else {
            return Ok(false);
        };
        let object = proxy.object_id();
        let raw = self.outbound("releaseNamed", |endpoint| endpoint.release_named(object))?;
        Ok(raw.is_truthy())
    }

    /// Increase the remote retention count of `proxy`.
    pub fn add_ref(&self, proxy: &InstanceProxy) -> Result<(), BridgeError> {
        let object = proxy.object_id();
        self.outbound("incRef", |endpoint| endpoint.inc_ref(object))?;
        Ok(())
    }

    /// Decrease the remote retention count of `proxy`.
    pub fn release(&self, proxy: &InstanceProxy) -> Result<(), BridgeError> {
        let object = proxy.object_id();
        self.outbound("decRef", |endpoint| endpoint.dec_ref(object))?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Remote call surface
    // ------------------------------------------------------------------

    pub fn get_property(&self, object: ObjectId, name: &str) -> Result<Value, BridgeError> {
        self.request("getProperty", |endpoint| endpoint.get_property(object, name))
    }

    pub fn set_property(
        &self,
        object: ObjectId,
        name: &str,
        value: Value,
    ) -> Result<(), BridgeError> {
        self.outbound("setProperty", |endpoint| {
            let value = self.serialize(&value)?;
            endpoint.set_property(object, name, value)
        })?;
        Ok(())
    }

    pub fn invoke_function(
        &self,
        function: FunctionId,
        args: Vec<Value>,
    ) -> Result<Value, BridgeError> {
        self.request("invokeFunction", |endpoint| {
            let args = self.serialize(&Value::Array(args))?;
            endpoint.invoke_function(function, args)
        })
    }

    pub fn invoke_method(
        &self,
        object: ObjectId,
        name: &str,
        args: Vec<Value>,
    ) -> Result<Value, BridgeError> {
        self.request("invokeMethod", |endpoint| {
            let args = self.serialize(&Value::Array(args))?;
            endpoint.invoke_method(object, name, args)
        })
    }

    /// Outbound call whose reply is decoded before the guard is released.
    fn request<F>(&self, operation: &'static str, call: F) -> Result<Value, BridgeError>
    where
        F: FnOnce(&dyn RemoteEndpoint) -> EndpointResult,
    {
        let _guard = self.shared.depth.enter(operation)?;
        let raw = self.submit(operation, call)?;
        self.deserialize(&raw)
    }

    /// Outbound call whose reply is used raw.
    fn outbound<F>(&self, operation: &'static str, call: F) -> Result<WireValue, BridgeError>
    where
        F: FnOnce(&dyn RemoteEndpoint) -> EndpointResult,
    {
        let _guard = self.shared.depth.enter(operation)?;
        self.submit(operation, call)
    }

    fn submit<F>(&self, operation: &'static str, call: F) -> Result<WireValue, BridgeError>
    where
        F: FnOnce(&dyn RemoteEndpoint) -> EndpointResult,
    {
        let raw = call(self.shared.endpoint.as_ref())?;
        if let Some(fault) = raw.as_str().and_then(|text| self.fault_in(text)) {
            tracing::warn!(
                bridge = %self.name(),
                operation,
                message = %fault.message,
                "remote endpoint reported a fault"
            );
            return Err(fault.into());
        }
        Ok(raw)
    }

    pub(crate) fn fault_in(&self, text: &str) -> Option<RemoteFault> {
        self.shared.config.fault.parse(text)
    }

    // ------------------------------------------------------------------
    // Local function registry
    // ------------------------------------------------------------------

    /// Assign `function` a global id, or return the one it already carries.
    ///
    /// A function tagged by another bridge keeps that id and is also cached
    /// here, so it resolves when this bridge's remote side sends it back.
    pub fn register_function(
        &self,
        function: &LocalFunction,
    ) -> Result<GlobalFunctionId, BridgeError> {
        if let Some(id) = function.id() {
            if id.bridge_id() != self.id() {
                self.shared
                    .caches
                    .borrow_mut()
                    .local_functions
                    .entry(id)
                    .or_insert_with(|| function.clone());
            }
            return Ok(id);
        }
        let limit = self.shared.config.local_function_limit();
        let mut caches = self.shared.caches.borrow_mut();
        if caches.next_local_seq >= limit {
            return Err(BridgeError::LocalFunctionLimit {
                bridge: self.id(),
                limit,
            });
        }
        let id = GlobalFunctionId::compose(self.id(), caches.next_local_seq as u16);
        caches.next_local_seq += 1;
        caches.local_functions.insert(id, function.clone());
        function.tag(id);
        tracing::debug!(bridge = %self.name(), function = %id, "registered local function");
        Ok(id)
    }

    pub fn local_function(&self, id: GlobalFunctionId) -> Option<LocalFunction> {
        self.shared.caches.borrow().local_functions.get(&id).cloned()
    }

    pub fn local_function_count(&self) -> usize {
        self.shared.caches.borrow().local_functions.len()
    }

    /// Run a registered callable on behalf of the remote side.
    ///
    /// An unregistered id yields `Undefined`, not an error.
    pub(crate) fn invoke_local(
        &self,
        id: GlobalFunctionId,
        args: &[WireValue],
    ) -> Result<WireValue, BridgeError> {
        let Some(function) = self.local_function(id) else {
            tracing::debug!(bridge = %self.name(), function = %id, "no local function registered");
            return Ok(WireValue::Undefined);
        };
        let args = args
            .iter()
            .map(|arg| self.deserialize(arg))
            .collect::<Result<Vec<_>, _>>()?;
        let result = function.call(args)?;
        self.serialize(&result)
    }

    // ------------------------------------------------------------------
    // Cache inspection
    // ------------------------------------------------------------------

    pub fn cached_type(&self, type_name: &str) -> Option<Rc<ProxyClass>> {
        self.shared.caches.borrow().types.get(type_name).cloned()
    }

    pub fn cached_instance(&self, object: ObjectId) -> Option<Rc<InstanceProxy>> {
        self.shared.caches.borrow().instances.get(&object).cloned()
    }

    pub fn cached_instance_count(&self) -> usize {
        self.shared.caches.borrow().instances.len()
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish()
    }
}
