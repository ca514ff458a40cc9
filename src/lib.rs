//! Bridgekit: remote-object bridging over a synchronous call channel
//!
//! Lets a host runtime and a sandboxed remote runtime, reachable only
//! through a synchronous string/primitive call interface, exchange object
//! references, primitive values and callbacks as if they were local.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             BridgeContext               │
//! │   bridges by name / id, init callbacks, │
//! │   shared call-depth counter             │
//! │                                         │
//! │  Bridge ── codec ── proxy (ProxyClass)  │
//! │     │                                   │
//! ├─────┼───────────────────────────────────┤
//! │     ▼       RemoteEndpoint              │
//! │  getProperty / invokeMethod / ...  ◄────┼── invoke_js_function
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//!
//! Remote objects are addressed by numeric object ids, remote functions by
//! function ids, and host callables by a [`wire::GlobalFunctionId`] whose
//! high 16 bits name the bridge that registered it. Each bridge keeps one
//! proxy per object id, so the same remote object always maps to the same
//! [`proxy::InstanceProxy`].
//!
//! ## Example
//!
//! ```ignore
//! let context = BridgeContext::new();
//! context.on_ready("player", |bridge| {
//!     let root = bridge.root().unwrap();
//!     let stage = root.as_instance().unwrap();
//!     stage.invoke("setVolume", vec![Value::from(0.5)]).unwrap();
//! });
//! context.attach(endpoint, "player")?;
//! ```

pub mod bridge;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod proxy;
pub mod registry;
pub mod value;
pub mod wire;

pub use bridge::{Bridge, CallDepth, WeakBridge};
pub use config::BridgeConfig;
pub use endpoint::{HandleResolver, JsonEndpoint, JsonTransport, RemoteEndpoint};
pub use error::{BridgeError, ProtocolError};
pub use proxy::{InstanceProxy, Member, ProxyClass, RemoteFunction};
pub use registry::{BridgeContext, BRIDGE_INITIALIZED, INVOKE_JS_FUNCTION};
pub use value::{Callable, LocalFunction, Value};
pub use wire::{
    BridgeId, Envelope, EnvelopeBody, FaultFormat, GlobalFunctionId, RemoteFault, TypeDescriptor,
    WireValue,
};
