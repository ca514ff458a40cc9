//! Scripted in-memory remote endpoint shared by the integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

use bridgekit::endpoint::EndpointResult;
use bridgekit::wire::{FunctionId, ObjectId};
use bridgekit::{
    BridgeContext, Envelope, EnvelopeBody, FaultFormat, RemoteEndpoint, RemoteFault,
    TypeDescriptor, WireValue,
};

pub type Handler = Rc<dyn Fn(&FakeRemote, ObjectId, Vec<WireValue>) -> WireValue>;

pub struct FakeObject {
    pub type_name: String,
    pub props: HashMap<String, WireValue>,
}

/// A tiny remote object graph. Types and refs are announced through envelope
/// hints the first time they are sent, the way a real endpoint does.
pub struct FakeRemote {
    types: RefCell<HashMap<String, TypeDescriptor>>,
    objects: RefCell<BTreeMap<ObjectId, FakeObject>>,
    announced_types: RefCell<HashSet<String>>,
    announced_objects: RefCell<HashSet<ObjectId>>,
    methods: RefCell<HashMap<String, Handler>>,
    functions: RefCell<HashMap<FunctionId, Handler>>,
    log: RefCell<Vec<String>>,
    ref_counts: RefCell<HashMap<ObjectId, i32>>,
    root: Cell<ObjectId>,
    next_id: Cell<ObjectId>,
}

impl FakeRemote {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            types: RefCell::new(HashMap::new()),
            objects: RefCell::new(BTreeMap::new()),
            announced_types: RefCell::new(HashSet::new()),
            announced_objects: RefCell::new(HashSet::new()),
            methods: RefCell::new(HashMap::new()),
            functions: RefCell::new(HashMap::new()),
            log: RefCell::new(Vec::new()),
            ref_counts: RefCell::new(HashMap::new()),
            root: Cell::new(0),
            next_id: Cell::new(1),
        })
    }

    /// A remote with one `Stage` root object (`width`, `_y`, `echo`, `play`).
    pub fn with_stage() -> Rc<Self> {
        let remote = Self::new();
        remote.define_type(
            TypeDescriptor::new("Stage")
                .accessor("width")
                .accessor("_y")
                .method("echo")
                .method("play")
                .method("toString")
                .method("call"),
        );
        let root = remote.add_object("Stage", vec![("width", WireValue::Number(550.0))]);
        remote.set_root(root);
        remote.on_method("echo", |_, _, args| WireValue::Sequence(args));
        remote
    }

    pub fn define_type(&self, descriptor: TypeDescriptor) {
        self.types
            .borrow_mut()
            .insert(descriptor.type_name.clone(), descriptor);
    }

    pub fn add_object(&self, type_name: &str, props: Vec<(&str, WireValue)>) -> ObjectId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.objects.borrow_mut().insert(
            id,
            FakeObject {
                type_name: type_name.to_string(),
                props: props
                    .into_iter()
                    .map(|(name, value)| (name.to_string(), value))
                    .collect(),
            },
        );
        id
    }

    pub fn set_root(&self, id: ObjectId) {
        self.root.set(id);
    }

    pub fn on_method<F>(&self, name: &str, handler: F)
    where
        F: Fn(&FakeRemote, ObjectId, Vec<WireValue>) -> WireValue + 'static,
    {
        self.methods
            .borrow_mut()
            .insert(name.to_string(), Rc::new(handler));
    }

    pub fn on_function<F>(&self, id: FunctionId, handler: F)
    where
        F: Fn(&FakeRemote, ObjectId, Vec<WireValue>) -> WireValue + 'static,
    {
        self.functions.borrow_mut().insert(id, Rc::new(handler));
    }

    pub fn prop(&self, object: ObjectId, name: &str) -> Option<WireValue> {
        self.objects
            .borrow()
            .get(&object)
            .and_then(|o| o.props.get(name).cloned())
    }

    pub fn set_prop(&self, object: ObjectId, name: &str, value: WireValue) {
        if let Some(o) = self.objects.borrow_mut().get_mut(&object) {
            o.props.insert(name.to_string(), value);
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub fn ref_count(&self, object: ObjectId) -> i32 {
        self.ref_counts.borrow().get(&object).copied().unwrap_or(0)
    }

    /// Reference to `object`, with type and ref hints the first time only.
    pub fn reference(&self, object: ObjectId) -> WireValue {
        let mut envelope = Envelope::new(EnvelopeBody::RemoteInstance(object));
        if self.announced_objects.borrow_mut().insert(object) {
            envelope = self.with_hints(envelope, object);
        }
        envelope.into_wire()
    }

    /// Reference to `object` that always carries the hints.
    pub fn announced_reference(&self, object: ObjectId) -> WireValue {
        self.announced_objects.borrow_mut().insert(object);
        let envelope = Envelope::new(EnvelopeBody::RemoteInstance(object));
        self.with_hints(envelope, object).into_wire()
    }

    fn with_hints(&self, mut envelope: Envelope, object: ObjectId) -> Envelope {
        let type_name = match self.objects.borrow().get(&object) {
            Some(o) => o.type_name.clone(),
            None => return envelope,
        };
        if self.announced_types.borrow_mut().insert(type_name.clone()) {
            if let Some(descriptor) = self.types.borrow().get(&type_name) {
                envelope = envelope.with_type(descriptor.clone());
            }
        }
        envelope.with_ref(object, type_name)
    }

    pub fn fault(message: &str) -> WireValue {
        WireValue::String(FaultFormat::default().encode(&RemoteFault::new(message)))
    }

    fn record(&self, entry: String) {
        self.log.borrow_mut().push(entry);
    }

    fn sequence(args: WireValue) -> Vec<WireValue> {
        match args {
            WireValue::Sequence(items) => items,
            other => vec![other],
        }
    }
}

impl RemoteEndpoint for FakeRemote {
    fn get_root(&self) -> EndpointResult {
        self.record("getRoot".into());
        Ok(self.reference(self.root.get()))
    }

    fn get_property(&self, object: ObjectId, name: &str) -> EndpointResult {
        self.record(format!("getProperty {} {}", object, name));
        Ok(self.prop(object, name).unwrap_or(WireValue::Undefined))
    }

    fn set_property(&self, object: ObjectId, name: &str, value: WireValue) -> EndpointResult {
        self.record(format!("setProperty {} {}", object, name));
        self.set_prop(object, name, value);
        Ok(WireValue::Undefined)
    }

    fn invoke_method(&self, object: ObjectId, name: &str, args: WireValue) -> EndpointResult {
        self.record(format!("invokeMethod {} {}", object, name));
        let handler = self.methods.borrow().get(name).cloned();
        Ok(match handler {
            Some(handler) => handler(self, object, Self::sequence(args)),
            None => Self::fault(&format!("no method {}", name)),
        })
    }

    fn invoke_function(&self, function: FunctionId, args: WireValue) -> EndpointResult {
        self.record(format!("invokeFunction {}", function));
        let handler = self.functions.borrow().get(&function).cloned();
        Ok(match handler {
            Some(handler) => handler(self, 0, Self::sequence(args)),
            None => Self::fault(&format!("no function {}", function)),
        })
    }

    fn release_all(&self) -> EndpointResult {
        self.record("releaseAll".into());
        self.announced_objects.borrow_mut().clear();
        Ok(WireValue::Bool(true))
    }

    fn create(&self, class_name: &str) -> EndpointResult {
        self.record(format!("create {}", class_name));
        if !self.types.borrow().contains_key(class_name) {
            return Ok(Self::fault(&format!("unknown class {}", class_name)));
        }
        let id = self.add_object(class_name, Vec::new());
        Ok(self.reference(id))
    }

    fn release_named(&self, object: ObjectId) -> EndpointResult {
        self.record(format!("releaseNamed {}", object));
        Ok(WireValue::Bool(
            self.announced_objects.borrow_mut().remove(&object),
        ))
    }

    fn inc_ref(&self, object: ObjectId) -> EndpointResult {
        self.record(format!("incRef {}", object));
        *self.ref_counts.borrow_mut().entry(object).or_insert(0) += 1;
        Ok(WireValue::Undefined)
    }

    fn dec_ref(&self, object: ObjectId) -> EndpointResult {
        self.record(format!("decRef {}", object));
        *self.ref_counts.borrow_mut().entry(object).or_insert(0) -= 1;
        Ok(WireValue::Undefined)
    }
}

/// Call back into the host the way a remote endpoint does: through the
/// context's single inbound entry point.
pub fn call_host(
    context: &BridgeContext,
    function_id: &WireValue,
    args: Vec<WireValue>,
) -> WireValue {
    let id = match function_id.as_envelope().map(|env| &env.body) {
        Some(EnvelopeBody::LocalFunction(id)) => WireValue::Number(id.raw() as f64),
        _ => panic!("expected a local function ref, got {:?}", function_id),
    };
    let mut inbound = vec![id];
    inbound.extend(args);
    match context.invoke_js_function(&inbound) {
        Ok(value) => value,
        Err(e) => {
            let fault = RemoteFault::new(e.to_string());
            WireValue::String(FaultFormat::default().encode(&fault))
        }
    }
}
