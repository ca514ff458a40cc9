//! String transport adapter
//!
//! Many remote handles only accept and return strings. [`JsonEndpoint`] turns
//! such a handle into a [`RemoteEndpoint`] by sending arguments as JSON and
//! parsing each reply as a JSON wire value.

use std::rc::Rc;

use serde_json::{json, Value as Json};

use super::{EndpointResult, RemoteEndpoint};
use crate::error::{BridgeError, ProtocolError};
use crate::wire::{FunctionId, ObjectId, WireValue};

/// The calls a remote handle has to understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointMethod {
    GetRoot,
    GetProperty,
    SetProperty,
    InvokeMethod,
    InvokeFunction,
    ReleaseAll,
    Create,
    ReleaseNamed,
    IncRef,
    DecRef,
}

impl EndpointMethod {
    pub const ALL: [EndpointMethod; 10] = [
        EndpointMethod::GetRoot,
        EndpointMethod::GetProperty,
        EndpointMethod::SetProperty,
        EndpointMethod::InvokeMethod,
        EndpointMethod::InvokeFunction,
        EndpointMethod::ReleaseAll,
        EndpointMethod::Create,
        EndpointMethod::ReleaseNamed,
        EndpointMethod::IncRef,
        EndpointMethod::DecRef,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EndpointMethod::GetRoot => "getRoot",
            EndpointMethod::GetProperty => "getProperty",
            EndpointMethod::SetProperty => "setProperty",
            EndpointMethod::InvokeMethod => "invokeMethod",
            EndpointMethod::InvokeFunction => "invokeFunction",
            EndpointMethod::ReleaseAll => "releaseAll",
            EndpointMethod::Create => "create",
            EndpointMethod::ReleaseNamed => "releaseNamed",
            EndpointMethod::IncRef => "incRef",
            EndpointMethod::DecRef => "decRef",
        }
    }
}

/// A handle that takes JSON arguments and answers with JSON text.
pub trait JsonTransport {
    fn call(&self, method: EndpointMethod, args: &[Json]) -> Result<String, BridgeError>;
}

impl<T: JsonTransport + ?Sized> JsonTransport for Box<T> {
    fn call(&self, method: EndpointMethod, args: &[Json]) -> Result<String, BridgeError> {
        (**self).call(method, args)
    }
}

impl<T: JsonTransport + ?Sized> JsonTransport for Rc<T> {
    fn call(&self, method: EndpointMethod, args: &[Json]) -> Result<String, BridgeError> {
        (**self).call(method, args)
    }
}

pub struct JsonEndpoint<T> {
    transport: T,
}

impl<T: JsonTransport> JsonEndpoint<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn send(&self, method: EndpointMethod, args: &[Json]) -> EndpointResult {
        let reply = self.transport.call(method, args)?;
        WireValue::from_json_str(&reply).map_err(|e| match e {
            ProtocolError::Json(msg) => BridgeError::Protocol(ProtocolError::Json(format!(
                "reply to {}: {}",
                method.name(),
                msg
            ))),
            other => BridgeError::Protocol(other),
        })
    }
}

impl<T: JsonTransport> RemoteEndpoint for JsonEndpoint<T> {
    fn get_root(&self) -> EndpointResult {
        self.send(EndpointMethod::GetRoot, &[])
    }

    fn get_property(&self, object: ObjectId, name: &str) -> EndpointResult {
        self.send(EndpointMethod::GetProperty, &[json!(object), json!(name)])
    }

    fn set_property(&self, object: ObjectId, name: &str, value: WireValue) -> EndpointResult {
        self.send(
            EndpointMethod::SetProperty,
            &[json!(object), json!(name), value.to_json()],
        )
    }

    fn invoke_method(&self, object: ObjectId, name: &str, args: WireValue) -> EndpointResult {
        self.send(
            EndpointMethod::InvokeMethod,
            &[json!(object), json!(name), args.to_json()],
        )
    }

    fn invoke_function(&self, function: FunctionId, args: WireValue) -> EndpointResult {
        self.send(EndpointMethod::InvokeFunction, &[json!(function), args.to_json()])
    }

    fn release_all(&self) -> EndpointResult {
        self.send(EndpointMethod::ReleaseAll, &[])
    }

    fn create(&self, class_name: &str) -> EndpointResult {
        self.send(EndpointMethod::Create, &[json!(class_name)])
    }

    fn release_named(&self, object: ObjectId) -> EndpointResult {
        self.send(EndpointMethod::ReleaseNamed, &[json!(object)])
    }

    fn inc_ref(&self, object: ObjectId) -> EndpointResult {
        self.send(EndpointMethod::IncRef, &[json!(object)])
    }

    fn dec_ref(&self, object: ObjectId) -> EndpointResult {
        self.send(EndpointMethod::DecRef, &[json!(object)])
    }
}
