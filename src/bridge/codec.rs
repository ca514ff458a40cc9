//! Wire codec: native values to wire values and back.

use std::rc::Rc;

use serde_json::Value as Json;

use super::Bridge;
use crate::error::{BridgeError, ProtocolError};
use crate::proxy::{InstanceProxy, ProxyClass, RemoteFunction};
use crate::value::{Callable, Value};
use crate::wire::{
    Envelope, EnvelopeBody, FunctionId, ObjectId, RemoteFault, TypeDescriptor, WireValue,
};

impl Bridge {
    /// Encode a host value for the remote side.
    ///
    /// Local callables are registered on first use. The only possible error
    /// is running out of local function ids.
    pub fn serialize(&self, value: &Value) -> Result<WireValue, BridgeError> {
        Ok(match value {
            Value::Undefined => WireValue::Undefined,
            Value::Null => WireValue::Null,
            Value::Bool(b) => WireValue::Bool(*b),
            Value::Number(n) => WireValue::Number(*n),
            Value::String(s) => WireValue::String(s.clone()),
            Value::Array(items) => WireValue::Sequence(
                items
                    .iter()
                    .map(|item| self.serialize(item))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Function(Callable::Local(function)) => {
                WireValue::envelope(EnvelopeBody::LocalFunction(self.register_function(function)?))
            }
            Value::Function(Callable::Remote(function)) if function.belongs_to(self) => {
                WireValue::envelope(EnvelopeBody::RemoteFunction(function.function_id()))
            }
            Value::Function(Callable::Remote(function)) => {
                let forwarder = function.forwarder();
                let id = self.register_function(&forwarder)?;
                WireValue::envelope(EnvelopeBody::LocalFunction(id))
            }
            Value::Instance(proxy) => {
                if !proxy.belongs_to(self) {
                    tracing::warn!(
                        bridge = %self.name(),
                        object = proxy.object_id(),
                        "passing an instance proxy owned by another bridge"
                    );
                }
                WireValue::envelope(EnvelopeBody::RemoteInstance(proxy.object_id()))
            }
            Value::Opaque(json) => WireValue::envelope(EnvelopeBody::Opaque(json.clone())),
        })
    }

    /// Decode a reply from the remote side, priming the caches on the way.
    ///
    /// An error sentinel string anywhere in `wire` fails the whole decode.
    pub fn deserialize(&self, wire: &WireValue) -> Result<Value, BridgeError> {
        match wire {
            WireValue::Undefined => Ok(Value::Undefined),
            WireValue::Null => Ok(Value::Null),
            WireValue::Bool(b) => Ok(Value::Bool(*b)),
            WireValue::Number(n) => Ok(Value::Number(*n)),
            WireValue::String(s) => self.string_or_fault(s),
            WireValue::Sequence(items) => Ok(Value::Array(
                items
                    .iter()
                    .map(|item| self.deserialize(item))
                    .collect::<Result<_, _>>()?,
            )),
            WireValue::Envelope(envelope) => self.deserialize_envelope(envelope),
        }
    }

    fn string_or_fault(&self, text: &str) -> Result<Value, BridgeError> {
        match self.fault_in(text) {
            Some(fault) => Err(fault.into()),
            None => Ok(Value::String(text.to_string())),
        }
    }

    fn deserialize_envelope(&self, envelope: &Envelope) -> Result<Value, BridgeError> {
        for descriptor in &envelope.new_types {
            self.apply_type(descriptor);
        }
        for (object, type_name) in &envelope.new_refs {
            self.apply_ref(*object, type_name)?;
        }

        match &envelope.body {
            EnvelopeBody::Primitive(inner) => self.deserialize(inner),
            EnvelopeBody::RemoteInstance(object) => self
                .cached_instance(*object)
                .map(Value::Instance)
                .ok_or_else(|| ProtocolError::UnknownInstance(*object).into()),
            EnvelopeBody::RemoteFunction(function) => {
                Ok(Value::from(self.remote_function(*function)))
            }
            EnvelopeBody::LocalFunction(id) => self
                .local_function(*id)
                .map(Value::from)
                .ok_or_else(|| ProtocolError::UnknownLocalFunction(*id).into()),
            EnvelopeBody::Opaque(json) => match self.fault_in_json(json) {
                Some(fault) => Err(fault.into()),
                None => Ok(Value::Opaque(json.clone())),
            },
        }
    }

    /// First error sentinel string anywhere inside an opaque payload.
    fn fault_in_json(&self, json: &Json) -> Option<RemoteFault> {
        match json {
            Json::String(text) => self.fault_in(text),
            Json::Array(items) => items.iter().find_map(|item| self.fault_in_json(item)),
            Json::Object(map) => map.values().find_map(|item| self.fault_in_json(item)),
            _ => None,
        }
    }

    /// Build and cache the proxy class for a type. Descriptors are immutable
    /// once received, so a repeat is ignored.
    fn apply_type(&self, descriptor: &TypeDescriptor) {
        let mut caches = self.shared.caches.borrow_mut();
        if caches.types.contains_key(&descriptor.type_name) {
            return;
        }
        let class = Rc::new(ProxyClass::build(descriptor));
        tracing::debug!(
            bridge = %self.name(),
            type_name = %descriptor.type_name,
            members = class.members().count(),
            "cached remote type"
        );
        caches.types.insert(descriptor.type_name.clone(), class);
    }

    /// Create the proxy for a newly announced object.
    ///
    /// An object already cached under the same type keeps its proxy; a type
    /// change means the remote side reused the id, so the proxy is replaced.
    fn apply_ref(&self, object: ObjectId, type_name: &str) -> Result<(), BridgeError> {
        let mut caches = self.shared.caches.borrow_mut();
        if let Some(existing) = caches.instances.get(&object) {
            if existing.type_name() == type_name {
                return Ok(());
            }
            tracing::warn!(
                bridge = %self.name(),
                object,
                old_type = %existing.type_name(),
                new_type = %type_name,
                "remote object id reused with a different type"
            );
        }
        let class = caches
            .types
            .get(type_name)
            .cloned()
            .ok_or_else(|| ProtocolError::UnknownType {
                object,
                type_name: type_name.to_string(),
            })?;
        let proxy = Rc::new(InstanceProxy::new(self.downgrade(), object, class));
        caches.instances.insert(object, proxy);
        Ok(())
    }

    fn remote_function(&self, function: FunctionId) -> Rc<RemoteFunction> {
        let mut caches = self.shared.caches.borrow_mut();
        caches
            .remote_functions
            .entry(function)
            .or_insert_with(|| Rc::new(RemoteFunction::new(self.downgrade(), function)))
            .clone()
    }
}
