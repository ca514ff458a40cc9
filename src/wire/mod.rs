//! Wire Format
//!
//! The tagged values exchanged with the remote endpoint, the identifiers they
//! carry, and the error sentinel the endpoint uses to report failures.
//!
//! - Primitives and sequences travel as themselves
//! - Everything else is wrapped in an [`Envelope`] that may also carry
//!   [`TypeDescriptor`]s and new instance refs for the receiver to cache

mod fault;
mod value;

pub use fault::{FaultFormat, RemoteFault};
pub use value::{Envelope, EnvelopeBody, EnvelopeKind, WireValue};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of an object living on the remote side.
pub type ObjectId = u32;

/// Identifier of a function living on the remote side.
pub type FunctionId = u32;

/// Sequential id of an attached bridge.
///
/// Bridge ids fill the high 16 bits of a [`GlobalFunctionId`], so at most
/// 65536 bridges can be attached in one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BridgeId(u16);

impl BridgeId {
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Display for BridgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process-wide id of a local callable handed to the remote side.
///
/// Layout: `(bridge_id << 16) | sequence`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalFunctionId(u32);

impl GlobalFunctionId {
    /// Number of low bits holding the per-bridge sequence number.
    pub const SEQUENCE_BITS: u32 = 16;

    /// Number of distinct sequence numbers per bridge.
    pub const SEQUENCE_SPACE: u32 = 1 << Self::SEQUENCE_BITS;

    pub const fn compose(bridge: BridgeId, sequence: u16) -> Self {
        Self(((bridge.0 as u32) << Self::SEQUENCE_BITS) | sequence as u32)
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The bridge that registered this function.
    pub const fn bridge_id(self) -> BridgeId {
        BridgeId((self.0 >> Self::SEQUENCE_BITS) as u16)
    }

    pub const fn sequence(self) -> u16 {
        (self.0 & (Self::SEQUENCE_SPACE - 1)) as u16
    }
}

impl fmt::Display for GlobalFunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (bridge {}, seq {})", self.0, self.bridge_id(), self.sequence())
    }
}

/// Shape of a remote type, sent once per type per bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    #[serde(rename = "name")]
    pub type_name: String,
    #[serde(default)]
    pub accessors: Vec<String>,
    #[serde(default)]
    pub methods: Vec<String>,
}

impl TypeDescriptor {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            accessors: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn accessor(mut self, name: impl Into<String>) -> Self {
        self.accessors.push(name.into());
        self
    }

    pub fn method(mut self, name: impl Into<String>) -> Self {
        self.methods.push(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_function_id_packs_bridge_and_sequence() {
        let id = GlobalFunctionId::compose(BridgeId::new(3), 42);
        assert_eq!(id.raw(), (3 << 16) | 42);
        assert_eq!(id.bridge_id(), BridgeId::new(3));
        assert_eq!(id.sequence(), 42);
    }

    #[test]
    fn global_function_id_from_raw_decodes_high_bits() {
        let id = GlobalFunctionId::from_raw(0x0001_FFFF);
        assert_eq!(id.bridge_id().get(), 1);
        assert_eq!(id.sequence(), 0xFFFF);
    }

    #[test]
    fn type_descriptor_uses_name_on_the_wire() {
        let desc: TypeDescriptor = serde_json::from_str(
            r#"{"name": "flash.display::Sprite", "accessors": ["x"], "methods": ["play"]}"#,
        )
        .unwrap();
        assert_eq!(desc.type_name, "flash.display::Sprite");
        assert_eq!(desc.accessors, vec!["x"]);
        assert_eq!(desc.methods, vec!["play"]);

        let bare: TypeDescriptor = serde_json::from_str(r#"{"name": "Empty"}"#).unwrap();
        assert!(bare.accessors.is_empty());
        assert!(bare.methods.is_empty());
    }
}
