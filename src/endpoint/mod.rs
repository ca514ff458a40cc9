//! Remote Endpoint
//!
//! The call surface a [`crate::Bridge`] drives. Implementations wrap whatever
//! handle reaches the sandboxed runtime; every call is synchronous and may
//! re-enter the host through [`crate::BridgeContext::invoke_js_function`]
//! before it returns.
//!
//! Each call returns a [`WireValue`]. Remote failures come back as an error
//! sentinel string (see [`crate::wire::FaultFormat`]), not as `Err`; `Err` is
//! reserved for the transport itself failing.

mod json;

pub use json::{EndpointMethod, JsonEndpoint, JsonTransport};

use std::rc::Rc;

use crate::error::BridgeError;
use crate::wire::{FunctionId, ObjectId, WireValue};

pub type EndpointResult = Result<WireValue, BridgeError>;

pub trait RemoteEndpoint {
    /// Reference to the remote root object.
    fn get_root(&self) -> EndpointResult;

    fn get_property(&self, object: ObjectId, name: &str) -> EndpointResult;

    fn set_property(&self, object: ObjectId, name: &str, value: WireValue) -> EndpointResult;

    /// `args` is always a [`WireValue::Sequence`].
    fn invoke_method(&self, object: ObjectId, name: &str, args: WireValue) -> EndpointResult;

    /// `args` is always a [`WireValue::Sequence`].
    fn invoke_function(&self, function: FunctionId, args: WireValue) -> EndpointResult;

    /// Drop every reference the remote side holds on behalf of this bridge.
    fn release_all(&self) -> EndpointResult;

    /// Construct a new remote object of `class_name`.
    fn create(&self, class_name: &str) -> EndpointResult;

    fn release_named(&self, object: ObjectId) -> EndpointResult;

    fn inc_ref(&self, object: ObjectId) -> EndpointResult;

    fn dec_ref(&self, object: ObjectId) -> EndpointResult;
}

macro_rules! forward_endpoint {
    ($ptr:ident) => {
        impl<E: RemoteEndpoint + ?Sized> RemoteEndpoint for $ptr<E> {
            fn get_root(&self) -> EndpointResult {
                (**self).get_root()
            }

            fn get_property(&self, object: ObjectId, name: &str) -> EndpointResult {
                (**self).get_property(object, name)
            }

            fn set_property(
                &self,
                object: ObjectId,
                name: &str,
                value: WireValue,
            ) -> EndpointResult {
                (**self).set_property(object, name, value)
            }

            fn invoke_method(
                &self,
                object: ObjectId,
                name: &str,
                args: WireValue,
            ) -> EndpointResult {
                (**self).invoke_method(object, name, args)
            }

            fn invoke_function(&self, function: FunctionId, args: WireValue) -> EndpointResult {
                (**self).invoke_function(function, args)
            }

            fn release_all(&self) -> EndpointResult {
                (**self).release_all()
            }

            fn create(&self, class_name: &str) -> EndpointResult {
                (**self).create(class_name)
            }

            fn release_named(&self, object: ObjectId) -> EndpointResult {
                (**self).release_named(object)
            }

            fn inc_ref(&self, object: ObjectId) -> EndpointResult {
                (**self).inc_ref(object)
            }

            fn dec_ref(&self, object: ObjectId) -> EndpointResult {
                (**self).dec_ref(object)
            }
        }
    };
}

forward_endpoint!(Box);
forward_endpoint!(Rc);

/// Finds the endpoint handle for a bridge name in the hosting environment.
///
/// This is the host-document discovery step; the bridge only needs the
/// resulting handle.
pub trait HandleResolver {
    fn resolve(&self, bridge_name: &str) -> Option<Box<dyn RemoteEndpoint>>;
}

impl<F> HandleResolver for F
where
    F: Fn(&str) -> Option<Box<dyn RemoteEndpoint>>,
{
    fn resolve(&self, bridge_name: &str) -> Option<Box<dyn RemoteEndpoint>> {
        self(bridge_name)
    }
}
