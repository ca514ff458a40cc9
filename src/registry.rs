//! Bridge Registry
//!
//! [`BridgeContext`] is the process-scoped home of every bridge. It is
//! created once at host startup and handed to whatever needs to attach
//! bridges or route calls from the remote side; tests create fresh ones.
//!
//! It owns:
//! - bridges by name and by [`BridgeId`]
//! - initialization callbacks waiting for a bridge name to be attached
//! - the [`CallDepth`] counter shared by all bridges
//!
//! All remote-to-host traffic enters through [`BridgeContext::invoke_js_function`],
//! which decodes the owning bridge from the function id's high bits.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::bridge::{Bridge, CallDepth};
use crate::config::BridgeConfig;
use crate::endpoint::{HandleResolver, RemoteEndpoint};
use crate::error::{BridgeError, ProtocolError};
use crate::wire::{BridgeId, GlobalFunctionId, RemoteFault, WireValue};

/// Global name under which the remote side calls back into the host.
pub const INVOKE_JS_FUNCTION: &str = "FABridge__invokeJSFunction";

/// Global name the remote side calls once it is ready to be attached.
pub const BRIDGE_INITIALIZED: &str = "FABridge__bridgeInitialized";

/// Number of attachable bridges; ids fill 16 bits of a global function id.
const BRIDGE_ID_SPACE: u32 = 1 << 16;

pub type InitCallback = Box<dyn FnOnce(&Bridge)>;

struct ContextInner {
    config: Rc<BridgeConfig>,
    depth: CallDepth,
    next_bridge_id: Cell<u32>,
    by_name: RefCell<HashMap<String, Bridge>>,
    by_id: RefCell<HashMap<BridgeId, Bridge>>,
    pending: RefCell<HashMap<String, Vec<InitCallback>>>,
}

/// Process-wide registry of bridges. Clones share the same registry.
#[derive(Clone)]
pub struct BridgeContext {
    inner: Rc<ContextInner>,
}

impl Default for BridgeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeContext {
    pub fn new() -> Self {
        Self::with_config(BridgeConfig::default())
    }

    pub fn with_config(config: BridgeConfig) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                config: Rc::new(config),
                depth: CallDepth::new(),
                next_bridge_id: Cell::new(0),
                by_name: RefCell::new(HashMap::new()),
                by_id: RefCell::new(HashMap::new()),
                pending: RefCell::new(HashMap::new()),
            }),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    /// Depth of the outbound call in flight, 0 when idle.
    pub fn call_depth(&self) -> u32 {
        self.inner.depth.get()
    }

    /// Attach `endpoint` under `name` and fire the callbacks queued for it.
    ///
    /// Re-attaching a name replaces the by-name entry; the previous bridge
    /// stays reachable by id so its outstanding callbacks still route.
    pub fn attach<E>(&self, endpoint: E, name: &str) -> Result<Bridge, BridgeError>
    where
        E: RemoteEndpoint + 'static,
    {
        let raw_id = self.inner.next_bridge_id.get();
        if raw_id >= BRIDGE_ID_SPACE {
            return Err(BridgeError::BridgeLimit(raw_id));
        }
        self.inner.next_bridge_id.set(raw_id + 1);
        let id = BridgeId::new(raw_id as u16);

        let bridge = Bridge::new(
            id,
            name,
            Box::new(endpoint),
            self.inner.depth.clone(),
            self.inner.config.clone(),
        );

        if let Some(previous) = self
            .inner
            .by_name
            .borrow_mut()
            .insert(name.to_string(), bridge.clone())
        {
            tracing::warn!(name, previous = %previous.id(), "bridge name re-attached");
        }
        self.inner.by_id.borrow_mut().insert(id, bridge.clone());
        tracing::debug!(name, id = %id, "attached bridge");

        let callbacks = self.inner.pending.borrow_mut().remove(name).unwrap_or_default();
        for callback in callbacks {
            callback(&bridge);
        }
        Ok(bridge)
    }

    /// Run `callback` with the bridge called `name`: right now if it is
    /// attached, otherwise once it is.
    pub fn on_ready<F>(&self, name: &str, callback: F)
    where
        F: FnOnce(&Bridge) + 'static,
    {
        // Release the borrow before running user code.
        let attached = self.bridge(name);
        match attached {
            Some(bridge) => callback(&bridge),
            None => self
                .inner
                .pending
                .borrow_mut()
                .entry(name.to_string())
                .or_default()
                .push(Box::new(callback)),
        }
    }

    pub fn pending_callbacks(&self, name: &str) -> usize {
        self.inner.pending.borrow().get(name).map_or(0, Vec::len)
    }

    pub fn bridge(&self, name: &str) -> Option<Bridge> {
        self.inner.by_name.borrow().get(name).cloned()
    }

    pub fn bridge_by_id(&self, id: BridgeId) -> Option<Bridge> {
        self.inner.by_id.borrow().get(&id).cloned()
    }

    pub fn bridges(&self) -> Vec<Bridge> {
        let mut bridges: Vec<Bridge> = self.inner.by_id.borrow().values().cloned().collect();
        bridges.sort_by_key(Bridge::id);
        bridges
    }

    /// Attachment entry point: resolve the handle for `name` from the host
    /// and attach it. Returns `None` when the host has no such handle.
    pub fn bridge_initialized(
        &self,
        name: &str,
        resolver: &dyn HandleResolver,
    ) -> Result<Option<Bridge>, BridgeError> {
        match resolver.resolve(name) {
            Some(endpoint) => self.attach(endpoint, name).map(Some),
            None => {
                tracing::warn!(name, "no endpoint handle found for bridge");
                Ok(None)
            }
        }
    }

    /// Inbound entry point. `args[0]` is the global function id, the rest are
    /// the wire arguments for the callable.
    pub fn invoke_js_function(&self, args: &[WireValue]) -> Result<WireValue, BridgeError> {
        let (first, rest) = args.split_first().ok_or(ProtocolError::MissingFunctionId)?;
        let id = function_id_from_wire(first)?;
        let bridge = self
            .bridge_by_id(id.bridge_id())
            .ok_or(ProtocolError::UnknownBridge(id.bridge_id()))?;
        tracing::trace!(bridge = %bridge.name(), function = %id, args = rest.len(), "inbound call");
        bridge.invoke_local(id, rest)
    }

    /// [`Self::invoke_js_function`] for string transports: takes the
    /// argument list as JSON text and answers with JSON text. Failures are
    /// reported back as an error sentinel string.
    pub fn invoke_js_function_json(&self, args: &str) -> String {
        let result = WireValue::from_json_str(args)
            .map_err(BridgeError::from)
            .and_then(|wire| match wire {
                WireValue::Sequence(items) => self.invoke_js_function(&items),
                other => self.invoke_js_function(std::slice::from_ref(&other)),
            });
        match result {
            Ok(value) => value.to_json().to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "inbound call failed");
                let fault = match e {
                    BridgeError::RemoteFault(fault) => fault,
                    other => RemoteFault::new(other.to_string()),
                };
                serde_json::Value::String(self.inner.config.fault.encode(&fault)).to_string()
            }
        }
    }
}

fn function_id_from_wire(value: &WireValue) -> Result<GlobalFunctionId, ProtocolError> {
    match value {
        WireValue::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n <= u32::MAX as f64 => {
            Ok(GlobalFunctionId::from_raw(*n as u32))
        }
        other => Err(ProtocolError::InvalidId {
            field: "function id",
            value: format!("{:?}", other),
        }),
    }
}
