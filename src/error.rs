//! Error types shared by the bridge, the wire codec and the registry.

use thiserror::Error;

use crate::wire::{BridgeId, GlobalFunctionId, ObjectId, RemoteFault};

/// Errors surfaced to callers of the bridge.
///
/// None of these are retried automatically. A `Reentrancy` error usually
/// means the caller should defer the call to a later turn of its scheduler.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The remote endpoint answered with an error sentinel string.
    #[error("remote fault: {0}")]
    RemoteFault(RemoteFault),

    /// An outbound call was attempted while another one was still in flight.
    #[error(
        "cannot call `{operation}` recursively into the remote endpoint; \
         defer the call to a later turn instead of calling inline"
    )]
    Reentrancy { operation: &'static str },

    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),

    /// The bridge a proxy was bound to no longer exists.
    #[error("bridge for {what} has been dropped")]
    Detached { what: String },

    #[error("bridge {bridge} cannot register more than {limit} local functions")]
    LocalFunctionLimit { bridge: BridgeId, limit: u32 },

    #[error("bridge id space exhausted ({0} bridges attached)")]
    BridgeLimit(u32),

    #[error("type '{type_name}' has no member '{member}'")]
    UnknownMember { type_name: String, member: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(String),

    /// A local callable invoked by the remote side reported a failure.
    #[error("callback failed: {0}")]
    Callback(String),
}

impl BridgeError {
    /// The human-readable message carried by a remote fault, if this is one.
    pub fn fault_message(&self) -> Option<&str> {
        match self {
            BridgeError::RemoteFault(fault) => Some(&fault.message),
            _ => None,
        }
    }

    pub fn is_reentrancy(&self) -> bool {
        matches!(self, BridgeError::Reentrancy { .. })
    }
}

impl From<RemoteFault> for BridgeError {
    fn from(fault: RemoteFault) -> Self {
        BridgeError::RemoteFault(fault)
    }
}

/// Malformed or inconsistent data received from the remote side.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("unknown envelope kind: {0}")]
    UnknownEnvelopeKind(String),

    #[error("invalid {field}: {value}")]
    InvalidId { field: &'static str, value: String },

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("reference to uncached remote instance {0}")]
    UnknownInstance(ObjectId),

    #[error("instance {object} refers to uncached type '{type_name}'")]
    UnknownType { object: ObjectId, type_name: String },

    #[error("no local function registered as {0}")]
    UnknownLocalFunction(GlobalFunctionId),

    #[error("no bridge attached with id {0}")]
    UnknownBridge(BridgeId),

    #[error("inbound call is missing its function id")]
    MissingFunctionId,

    #[error("invalid JSON: {0}")]
    Json(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        ProtocolError::Json(e.to_string())
    }
}
