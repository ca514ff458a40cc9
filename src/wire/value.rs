//! Wire values and their JSON mapping

use std::collections::BTreeMap;

use serde_json::{Map, Number, Value as Json};

use super::{FunctionId, GlobalFunctionId, ObjectId, TypeDescriptor};
use crate::error::ProtocolError;

/// A value as it crosses the boundary to the remote endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Sequence(Vec<WireValue>),
    Envelope(Box<Envelope>),
}

/// Discriminant of an envelope, with its numeric wire tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    /// No tag on the wire; the payload is a plain value.
    Primitive,
    RemoteInstance,
    RemoteFunction,
    LocalFunction,
    Opaque,
}

impl EnvelopeKind {
    pub fn tag(self) -> Option<u8> {
        match self {
            EnvelopeKind::Primitive => None,
            EnvelopeKind::RemoteInstance => Some(1),
            EnvelopeKind::RemoteFunction => Some(2),
            EnvelopeKind::LocalFunction => Some(3),
            EnvelopeKind::Opaque => Some(4),
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(EnvelopeKind::RemoteInstance),
            2 => Some(EnvelopeKind::RemoteFunction),
            3 => Some(EnvelopeKind::LocalFunction),
            4 => Some(EnvelopeKind::Opaque),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeBody {
    Primitive(WireValue),
    RemoteInstance(ObjectId),
    RemoteFunction(FunctionId),
    LocalFunction(GlobalFunctionId),
    /// Host-specific structured data, passed through untouched.
    Opaque(Json),
}

/// Tagged wrapper plus the cache hints riding along with it.
///
/// Receivers apply `new_types` first, then `new_refs`, then interpret `body`.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub body: EnvelopeBody,
    pub new_types: Vec<TypeDescriptor>,
    pub new_refs: BTreeMap<ObjectId, String>,
}

impl Envelope {
    pub fn new(body: EnvelopeBody) -> Self {
        Self {
            body,
            new_types: Vec::new(),
            new_refs: BTreeMap::new(),
        }
    }

    pub fn with_type(mut self, descriptor: TypeDescriptor) -> Self {
        self.new_types.push(descriptor);
        self
    }

    pub fn with_ref(mut self, object: ObjectId, type_name: impl Into<String>) -> Self {
        self.new_refs.insert(object, type_name.into());
        self
    }

    pub fn kind(&self) -> EnvelopeKind {
        match self.body {
            EnvelopeBody::Primitive(_) => EnvelopeKind::Primitive,
            EnvelopeBody::RemoteInstance(_) => EnvelopeKind::RemoteInstance,
            EnvelopeBody::RemoteFunction(_) => EnvelopeKind::RemoteFunction,
            EnvelopeBody::LocalFunction(_) => EnvelopeKind::LocalFunction,
            EnvelopeBody::Opaque(_) => EnvelopeKind::Opaque,
        }
    }

    pub fn into_wire(self) -> WireValue {
        WireValue::Envelope(Box::new(self))
    }
}

impl WireValue {
    pub fn envelope(body: EnvelopeBody) -> Self {
        Envelope::new(body).into_wire()
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(self, WireValue::Sequence(_) | WireValue::Envelope(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            WireValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_envelope(&self) -> Option<&Envelope> {
        match self {
            WireValue::Envelope(env) => Some(env),
            _ => None,
        }
    }

    /// Truthiness as the remote side reports booleans from release calls.
    pub fn is_truthy(&self) -> bool {
        match self {
            WireValue::Undefined | WireValue::Null => false,
            WireValue::Bool(b) => *b,
            WireValue::Number(n) => *n != 0.0 && !n.is_nan(),
            WireValue::String(s) => !s.is_empty(),
            WireValue::Sequence(_) | WireValue::Envelope(_) => true,
        }
    }

    /// Render as JSON. `Undefined` and non-finite numbers become `null`.
    pub fn to_json(&self) -> Json {
        match self {
            WireValue::Undefined | WireValue::Null => Json::Null,
            WireValue::Bool(b) => Json::Bool(*b),
            WireValue::Number(n) => number_to_json(*n),
            WireValue::String(s) => Json::String(s.clone()),
            WireValue::Sequence(items) => {
                Json::Array(items.iter().map(WireValue::to_json).collect())
            }
            WireValue::Envelope(env) => envelope_to_json(env),
        }
    }

    /// Parse a JSON value. Every JSON object is read as an envelope.
    pub fn from_json(json: &Json) -> Result<Self, ProtocolError> {
        Ok(match json {
            Json::Null => WireValue::Null,
            Json::Bool(b) => WireValue::Bool(*b),
            Json::Number(n) => WireValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => WireValue::String(s.clone()),
            Json::Array(items) => WireValue::Sequence(
                items
                    .iter()
                    .map(WireValue::from_json)
                    .collect::<Result<_, _>>()?,
            ),
            Json::Object(map) => envelope_from_json(map)?.into_wire(),
        })
    }

    pub fn from_json_str(text: &str) -> Result<Self, ProtocolError> {
        if text.trim().is_empty() {
            return Ok(WireValue::Undefined);
        }
        let json: Json = serde_json::from_str(text)?;
        Self::from_json(&json)
    }
}

impl From<bool> for WireValue {
    fn from(v: bool) -> Self {
        WireValue::Bool(v)
    }
}

impl From<f64> for WireValue {
    fn from(v: f64) -> Self {
        WireValue::Number(v)
    }
}

impl From<i32> for WireValue {
    fn from(v: i32) -> Self {
        WireValue::Number(v as f64)
    }
}

impl From<u32> for WireValue {
    fn from(v: u32) -> Self {
        WireValue::Number(v as f64)
    }
}

impl From<&str> for WireValue {
    fn from(v: &str) -> Self {
        WireValue::String(v.to_string())
    }
}

impl From<String> for WireValue {
    fn from(v: String) -> Self {
        WireValue::String(v)
    }
}

impl From<Vec<WireValue>> for WireValue {
    fn from(v: Vec<WireValue>) -> Self {
        WireValue::Sequence(v)
    }
}

fn number_to_json(n: f64) -> Json {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        return Json::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map(Json::Number).unwrap_or(Json::Null)
}

fn envelope_to_json(env: &Envelope) -> Json {
    let mut map = Map::new();
    if let Some(tag) = env.kind().tag() {
        map.insert("type".into(), Json::from(tag));
    }
    let value = match &env.body {
        EnvelopeBody::Primitive(v) => v.to_json(),
        EnvelopeBody::RemoteInstance(id) | EnvelopeBody::RemoteFunction(id) => Json::from(*id),
        EnvelopeBody::LocalFunction(id) => Json::from(id.raw()),
        EnvelopeBody::Opaque(json) => json.clone(),
    };
    map.insert("value".into(), value);
    if !env.new_types.is_empty() {
        let types = env
            .new_types
            .iter()
            .map(|t| serde_json::to_value(t).unwrap_or(Json::Null))
            .collect();
        map.insert("newTypes".into(), Json::Array(types));
    }
    if !env.new_refs.is_empty() {
        let refs = env
            .new_refs
            .iter()
            .map(|(id, name)| (id.to_string(), Json::String(name.clone())))
            .collect();
        map.insert("newRefs".into(), Json::Object(refs));
    }
    Json::Object(map)
}

fn envelope_from_json(map: &Map<String, Json>) -> Result<Envelope, ProtocolError> {
    let value = map.get("value").unwrap_or(&Json::Null);

    let body = match map.get("type") {
        // Nested objects are envelopes too; plain object data must use the opaque tag.
        None | Some(Json::Null) => match map.get("value") {
            Some(v) => EnvelopeBody::Primitive(WireValue::from_json(v)?),
            None => {
                return Err(ProtocolError::MalformedEnvelope(
                    "untagged object has no value".to_string(),
                ))
            }
        },
        Some(tag) => {
            let kind = tag
                .as_u64()
                .and_then(|t| u8::try_from(t).ok())
                .and_then(EnvelopeKind::from_tag);
            match kind {
                Some(EnvelopeKind::RemoteInstance) => {
                    EnvelopeBody::RemoteInstance(id_from_json(value, "object id")?)
                }
                Some(EnvelopeKind::RemoteFunction) => {
                    EnvelopeBody::RemoteFunction(id_from_json(value, "function id")?)
                }
                Some(EnvelopeKind::LocalFunction) => EnvelopeBody::LocalFunction(
                    GlobalFunctionId::from_raw(id_from_json(value, "local function id")?),
                ),
                Some(EnvelopeKind::Opaque) => EnvelopeBody::Opaque(value.clone()),
                Some(EnvelopeKind::Primitive) | None => {
                    return Err(ProtocolError::UnknownEnvelopeKind(tag.to_string()))
                }
            }
        }
    };

    let new_types = match map.get("newTypes") {
        None | Some(Json::Null) => Vec::new(),
        Some(types) => serde_json::from_value(types.clone())
            .map_err(|e| ProtocolError::MalformedEnvelope(format!("newTypes: {}", e)))?,
    };

    let mut new_refs = BTreeMap::new();
    match map.get("newRefs") {
        None | Some(Json::Null) => {}
        Some(Json::Object(refs)) => {
            for (key, type_name) in refs {
                let id = key.parse::<ObjectId>().map_err(|_| ProtocolError::InvalidId {
                    field: "newRefs key",
                    value: key.clone(),
                })?;
                let type_name = type_name.as_str().ok_or_else(|| {
                    ProtocolError::MalformedEnvelope(format!("newRefs[{}] is not a type name", key))
                })?;
                new_refs.insert(id, type_name.to_string());
            }
        }
        Some(other) => {
            return Err(ProtocolError::MalformedEnvelope(format!(
                "newRefs must be an object, got {}",
                other
            )))
        }
    }

    Ok(Envelope {
        body,
        new_types,
        new_refs,
    })
}

/// Ids travel as JSON numbers; accept any integral value that fits a `u32`.
fn id_from_json(value: &Json, field: &'static str) -> Result<u32, ProtocolError> {
    let invalid = || ProtocolError::InvalidId {
        field,
        value: value.to_string(),
    };
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).map_err(|_| invalid());
    }
    match value.as_f64() {
        Some(n) if n.fract() == 0.0 && n >= 0.0 && n <= u32::MAX as f64 => Ok(n as u32),
        _ => Err(invalid()),
    }
}
