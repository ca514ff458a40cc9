//! Remote-to-host callbacks and the reentrancy guard

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use bridgekit::{BridgeContext, BridgeError, LocalFunction, Value};
use common::{call_host, FakeRemote};

/// A stage whose `withCallback` method immediately calls its first argument.
fn stage_with_callbacks(context: &BridgeContext) -> Rc<FakeRemote> {
    let remote = FakeRemote::with_stage();
    let host = context.clone();
    remote.on_method("withCallback", move |_, _, args| {
        let rest = args[1..].to_vec();
        call_host(&host, &args[0], rest)
    });
    remote
}

#[test]
fn outbound_call_from_a_callback_is_rejected() {
    let context = BridgeContext::new();
    let remote = stage_with_callbacks(&context);
    let bridge = context.attach(remote.clone(), "player").unwrap();
    let root = bridge.root().unwrap();
    let stage = root.as_instance().unwrap().clone();

    let observed: Rc<RefCell<Option<BridgeError>>> = Rc::new(RefCell::new(None));
    let sink = observed.clone();
    let inner = stage.clone();
    let callback = LocalFunction::new(move |_| match inner.get("width") {
        Ok(value) => Ok(value),
        Err(e) => {
            *sink.borrow_mut() = Some(e);
            Ok(Value::from("deferred"))
        }
    });

    let result = stage.call("withCallback", vec![callback.into()]).unwrap();

    assert_eq!(result, Value::from("deferred"));
    let err = observed.borrow_mut().take().unwrap();
    assert!(err.is_reentrancy());
    assert!(err.to_string().contains("getProperty"));
    assert_eq!(context.call_depth(), 0);
    assert!(!remote.calls().contains(&"getProperty 1 width".to_string()));
}

#[test]
fn callback_receives_arguments_and_returns_a_value() {
    let context = BridgeContext::new();
    let remote = stage_with_callbacks(&context);
    let bridge = context.attach(remote.clone(), "player").unwrap();
    let root = bridge.root().unwrap();
    let stage = root.as_instance().unwrap().clone();

    let expected = stage.clone();
    let callback = LocalFunction::new(move |args| {
        assert_eq!(args.len(), 2);
        assert!(Rc::ptr_eq(args[1].as_instance().unwrap(), &expected));
        Ok(Value::from(args[0].as_number().unwrap_or(0.0) * 2.0))
    });

    let result = stage
        .call(
            "withCallback",
            vec![callback.into(), Value::from(21), Value::from(stage.clone())],
        )
        .unwrap();

    assert_eq!(result, Value::Number(42.0));
    assert_eq!(context.call_depth(), 0);
}

#[test]
fn failing_callback_surfaces_as_a_remote_fault() {
    let context = BridgeContext::new();
    let remote = stage_with_callbacks(&context);
    let bridge = context.attach(remote.clone(), "player").unwrap();
    let root = bridge.root().unwrap();
    let stage = root.as_instance().unwrap().clone();

    let callback = LocalFunction::new(|_| Err(BridgeError::Callback("nope".into())));
    let err = stage.call("withCallback", vec![callback.into()]).unwrap_err();

    assert_eq!(err.fault_message(), Some("callback failed: nope"));
    assert_eq!(context.call_depth(), 0);

    // The bridge is usable again once the failed call has unwound.
    assert_eq!(stage.invoke("getWidth", vec![]).unwrap(), Value::Number(550.0));
}

#[test]
fn guard_is_shared_across_bridges() {
    let context = BridgeContext::new();
    let remote = stage_with_callbacks(&context);
    let bridge = context.attach(remote.clone(), "player").unwrap();
    let other = context.attach(FakeRemote::with_stage(), "other").unwrap();
    let root = bridge.root().unwrap();
    let stage = root.as_instance().unwrap().clone();

    let observed = Rc::new(RefCell::new(false));
    let sink = observed.clone();
    let callback = LocalFunction::new(move |_| {
        *sink.borrow_mut() = other.root().map_err(|e| e.is_reentrancy()).err().unwrap_or(false);
        Ok(Value::Undefined)
    });

    stage.call("withCallback", vec![callback.into()]).unwrap();

    assert!(*observed.borrow());
    assert_eq!(context.call_depth(), 0);
}
