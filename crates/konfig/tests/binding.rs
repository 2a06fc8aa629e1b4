//! End-to-end binding behavior over in-memory sources.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use proptest::prelude::*;

use konfig::{
    BindError, Binder, Contract, ElementType, Materialized, Operation, PropertyStore, ReturnShape,
    Scalar, ScalarType, SourceProvider, StaticSources,
};

const DEFAULTS: &str = r#"
aa: true
bb: 1
truthy: "true"
cc {
  byte: 127
  short: 300
  int: 3
  long: 4000000000
  float: 5
  double: 6.5
  char: x
  wide: ab
  string: hello
  nil: null
}
list: [1, 2, 3]
nested: [[], [], null]
objlist: [{a: 1, b: 2}]
listc: [{b: 10}, {b: 20}]
listc2: [{}]
list2: [{l: [{}]}]
map: {a: 1, b: null}
mapc {
  x: {b: 1}
  y: {b: 2}
}
mapc2 {
  x: {}
}
"#;

fn scalar(name: &str, ty: ScalarType) -> Operation {
    Operation::builder(name).returns(ReturnShape::Scalar(ty)).build()
}

fn primitive(name: &str, ty: ScalarType) -> Operation {
    Operation::builder(name).returns(ReturnShape::Primitive(ty)).build()
}

fn inner_contract() -> Arc<Contract> {
    Contract::builder("CC")
        .operation(scalar("byte", ScalarType::I8))
        .operation(scalar("short", ScalarType::I16))
        .operation(primitive("int", ScalarType::I32))
        .operation(scalar("long", ScalarType::I64))
        .operation(scalar("float", ScalarType::F32))
        .operation(scalar("double", ScalarType::F64))
        .operation(scalar("char", ScalarType::Char))
        .operation(scalar("wide", ScalarType::Char))
        .operation(scalar("string", ScalarType::Str))
        .operation(primitive("nil", ScalarType::I32))
        .operation(primitive("absent", ScalarType::I32))
        .operation(scalar("missing", ScalarType::Str))
        .operation(
            Operation::builder("properties")
                .returns(ReturnShape::Properties)
                .build(),
        )
        .build()
}

fn element_contract() -> Arc<Contract> {
    Contract::builder("B").operation(primitive("b", ScalarType::I32)).build()
}

fn outer_element_contract() -> Arc<Contract> {
    Contract::builder("L2")
        .operation(Operation::builder("l").returns(ReturnShape::List).type_param().build())
        .build()
}

fn root_contract() -> Arc<Contract> {
    Contract::builder("App")
        .operation(scalar("aa", ScalarType::Bool))
        .operation(primitive("bb", ScalarType::I32))
        .operation(scalar("truthy", ScalarType::Bool))
        .operation(scalar("maybe", ScalarType::Bool))
        .operation(
            Operation::builder("cc")
                .returns(ReturnShape::Contract(inner_contract()))
                .build(),
        )
        .operation(
            Operation::builder("dd")
                .returns(ReturnShape::Contract(inner_contract()))
                .build(),
        )
        .operation(
            Operation::builder("bb2")
                .returns(ReturnShape::Contract(element_contract()))
                .build(),
        )
        .operation(Operation::builder("list").returns(ReturnShape::List).build())
        .operation(Operation::builder("nested").returns(ReturnShape::List).build())
        .operation(Operation::builder("objlist").returns(ReturnShape::List).type_param().build())
        .operation(Operation::builder("listc").returns(ReturnShape::List).type_param().build())
        .operation(Operation::builder("listc2").returns(ReturnShape::List).type_param().build())
        .operation(Operation::builder("list2").returns(ReturnShape::List).type_param().build())
        .operation(Operation::builder("map").returns(ReturnShape::Map).build())
        .operation(Operation::builder("mapc").returns(ReturnShape::Map).type_param().build())
        .operation(Operation::builder("mapc2").returns(ReturnShape::Map).type_param().build())
        .operation(
            Operation::builder("properties")
                .returns(ReturnShape::Properties)
                .build(),
        )
        .build()
}

fn load_with(store: PropertyStore) -> konfig::ConfigProxy {
    let binder = Binder::new(StaticSources::new(store).with_default(DEFAULTS));
    binder.load(&root_contract(), None).unwrap()
}

fn load() -> konfig::ConfigProxy {
    load_with(PropertyStore::new())
}

#[test]
fn test_scalar_binding() {
    let app = load();
    assert_eq!(app.get_bool("aa").unwrap(), Some(true));
    assert_eq!(app.get_i32("bb").unwrap(), Some(1));
}

#[test]
fn test_absent_nullable_scalar_is_none() {
    let app = load();
    assert_eq!(app.get_bool("maybe").unwrap(), None);
}

#[test]
fn test_no_implicit_string_to_bool_coercion() {
    let app = load();
    let err = app.get_bool("truthy").unwrap_err();
    assert_eq!(err.to_string(), "truthy: cannot convert string to bool");
}

#[test]
fn test_nested_contract_scalars() {
    let app = load();
    let cc = app.get_contract("cc").unwrap().unwrap();
    assert_eq!(cc.get_i8("byte").unwrap(), Some(127));
    assert_eq!(cc.get_i16("short").unwrap(), Some(300));
    assert_eq!(cc.get_i32("int").unwrap(), Some(3));
    assert_eq!(cc.get_i64("long").unwrap(), Some(4_000_000_000));
    assert_eq!(cc.get_f32("float").unwrap(), Some(5.0));
    assert_eq!(cc.get_f64("double").unwrap(), Some(6.5));
    assert_eq!(cc.get_char("char").unwrap(), Some('x'));
    assert_eq!(cc.get_string("string").unwrap(), Some("hello".to_string()));
}

#[test]
fn test_absent_nested_contract_is_none() {
    let app = load();
    assert!(app.get_contract("dd").unwrap().is_none());
}

#[test]
fn test_scalar_node_at_contract_position() {
    let app = load();
    let err = app.get_contract("bb2").unwrap_err();
    assert_eq!(err.to_string(), "bb2: cannot convert int to B");
}

#[test]
fn test_primitive_missing_names_undefined() {
    let app = load();
    let cc = app.get_contract("cc").unwrap().unwrap();
    let err = cc.get_i32("absent").unwrap_err();
    assert_eq!(
        err.to_string(),
        "cc.absent: value is undefined, but must be of type i32"
    );
}

#[test]
fn test_primitive_missing_names_null() {
    let app = load();
    let cc = app.get_contract("cc").unwrap().unwrap();
    let err = cc.get_i32("nil").unwrap_err();
    assert_eq!(
        err.to_string(),
        "cc.nil: value is null, but must be of type i32"
    );
}

#[test]
fn test_narrow_integer_boundary() {
    let app = load();
    let cc = app.get_contract("cc").unwrap().unwrap();
    assert_eq!(cc.get_i8("byte").unwrap(), Some(127));
    let err = cc.get_i8("short").unwrap_err();
    assert_eq!(err.to_string(), "cc.short: cannot convert int to i8");
}

#[test]
fn test_long_does_not_narrow_to_i32() {
    let app = load();
    let cc = app.get_contract("cc").unwrap().unwrap();
    let err = cc.get_i32("long").unwrap_err();
    assert_eq!(err.to_string(), "cc.long: cannot convert long to i32");
}

#[test]
fn test_char_requires_one_character() {
    let app = load();
    let cc = app.get_contract("cc").unwrap().unwrap();
    let err = cc.get_char("wide").unwrap_err();
    assert_eq!(err.to_string(), "cc.wide: cannot convert string to char");
}

#[test]
fn test_untyped_list_elements() {
    let app = load();
    let items = app.get_list("list", None).unwrap().unwrap();
    assert_eq!(
        items,
        vec![
            Materialized::Scalar(Scalar::I32(1)),
            Materialized::Scalar(Scalar::I32(2)),
            Materialized::Scalar(Scalar::I32(3)),
        ]
    );
}

#[test]
fn test_nested_lists_preserve_shape() {
    let app = load();
    let items = app.get_list("nested", None).unwrap().unwrap();
    assert_eq!(
        items,
        vec![
            Materialized::List(Vec::new()),
            Materialized::List(Vec::new()),
            Materialized::Absent,
        ]
    );
}

#[test]
fn test_object_list_element_falls_back_to_map() {
    let app = load();
    let element = ElementType::Any;
    let items = app.get_list("objlist", Some(&element)).unwrap().unwrap();
    assert_eq!(items.len(), 1);
    let entries = items[0].as_map().unwrap();
    assert_eq!(entries["a"], Materialized::Scalar(Scalar::I32(1)));
    assert_eq!(entries["b"], Materialized::Scalar(Scalar::I32(2)));
}

#[test]
fn test_contract_list_elements_become_proxies() {
    let app = load();
    let element = ElementType::Contract(element_contract());
    let items = app.get_list("listc", Some(&element)).unwrap().unwrap();
    assert_eq!(items.len(), 2);
    let first = items[0].as_contract().unwrap();
    let second = items[1].as_contract().unwrap();
    assert_eq!(first.get_i32("b").unwrap(), Some(10));
    assert_eq!(second.get_i32("b").unwrap(), Some(20));
}

#[test]
fn test_list_descent_error_path() {
    let app = load();
    let element = ElementType::Contract(element_contract());
    let items = app.get_list("listc2", Some(&element)).unwrap().unwrap();
    let err = items[0].as_contract().unwrap().get_i32("b").unwrap_err();
    assert_eq!(
        err.to_string(),
        "listc2[b]: value is undefined, but must be of type i32"
    );
}

#[test]
fn test_double_list_descent_error_path() {
    let app = load();
    let outer = ElementType::Contract(outer_element_contract());
    let items = app.get_list("list2", Some(&outer)).unwrap().unwrap();
    let l2 = items[0].as_contract().unwrap();

    let inner = ElementType::Contract(element_contract());
    let inner_items = l2.get_list("l", Some(&inner)).unwrap().unwrap();
    let err = inner_items[0].as_contract().unwrap().get_i32("b").unwrap_err();
    assert_eq!(
        err.to_string(),
        "list2[l[b]]: value is undefined, but must be of type i32"
    );
}

#[test]
fn test_map_omits_null_entries() {
    let app = load();
    let entries = app.get_map("map", None).unwrap().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries["a"], Materialized::Scalar(Scalar::I32(1)));
}

#[test]
fn test_contract_map_entries_become_proxies() {
    let app = load();
    let element = ElementType::Contract(element_contract());
    let entries = app.get_map("mapc", Some(&element)).unwrap().unwrap();
    assert_eq!(entries["x"].as_contract().unwrap().get_i32("b").unwrap(), Some(1));
    assert_eq!(entries["y"].as_contract().unwrap().get_i32("b").unwrap(), Some(2));
}

#[test]
fn test_map_entry_error_path_is_dotted() {
    let app = load();
    let element = ElementType::Contract(element_contract());
    let entries = app.get_map("mapc2", Some(&element)).unwrap().unwrap();
    let err = entries["x"].as_contract().unwrap().get_i32("b").unwrap_err();
    assert_eq!(
        err.to_string(),
        "mapc2.x.b: value is undefined, but must be of type i32"
    );
}

#[test]
fn test_type_parameter_rejection() {
    let app = load();
    for (element, message) in [
        (ElementType::Array, "list2: type parameter cannot be an array"),
        (ElementType::Sequence, "list2: type parameter cannot be a sequence"),
        (ElementType::Mapping, "list2: type parameter cannot be a mapping"),
    ] {
        let err = app.get_list("list2", Some(&element)).unwrap_err();
        assert_eq!(err.to_string(), message);
    }
}

#[test]
fn test_overlay_beats_override_beats_default() {
    let store = PropertyStore::new();
    let sources = StaticSources::new(store.clone())
        .with_default("bb: 1")
        .with_resource("App2.props", "bb: 2");
    let binder = Binder::new(sources);
    let contract = Contract::builder("App")
        .operation(primitive("bb", ScalarType::I32))
        .build();

    let app = binder.load(&contract, None).unwrap();
    assert_eq!(app.get_i32("bb").unwrap(), Some(1));

    store.set("app.config", "classpath:App2.props");
    let app = binder.load(&contract, Some("app.config")).unwrap();
    assert_eq!(app.get_i32("bb").unwrap(), Some(2));

    store.set("bb", "3");
    let app = binder.load(&contract, Some("app.config")).unwrap();
    assert_eq!(app.get_i32("bb").unwrap(), Some(3));
}

#[test]
fn test_memoized_value_ignores_later_overlay_change() {
    let store = PropertyStore::new();
    let app = load_with(store.clone());

    assert_eq!(app.get_i32("bb").unwrap(), Some(1));
    store.set("bb", "3");
    assert_eq!(app.get_i32("bb").unwrap(), Some(1));
}

#[test]
fn test_malformed_overlay_is_syntax_error() {
    let store = PropertyStore::new();
    store.set("bb", "[unclosed");
    let app = load_with(store);

    let err = app.get_i32("bb").unwrap_err();
    assert_eq!(err.to_string(), "bb: Syntax error");
}

#[test]
fn test_error_is_not_memoized() {
    let store = PropertyStore::new();
    store.set("bb", "[unclosed");
    let app = load_with(store.clone());

    assert!(app.get_i32("bb").is_err());
    store.set("bb", "7");
    assert_eq!(app.get_i32("bb").unwrap(), Some(7));
}

#[test]
fn test_overlay_ignored_in_list_element_context() {
    let store = PropertyStore::new();
    store.set("b", "99");
    let app = load_with(store);

    let element = ElementType::Contract(element_contract());
    let items = app.get_list("listc", Some(&element)).unwrap().unwrap();
    assert_eq!(items[0].as_contract().unwrap().get_i32("b").unwrap(), Some(10));
}

#[test]
fn test_overlay_applies_in_nested_object_context() {
    let store = PropertyStore::new();
    store.set("cc.int", "42");
    let app = load_with(store);

    let cc = app.get_contract("cc").unwrap().unwrap();
    assert_eq!(cc.get_i32("int").unwrap(), Some(42));
}

#[test]
fn test_properties_flattens_scalar_leaves() {
    let app = load();
    let bag = app.properties();

    assert_eq!(bag.get("aa"), Some(&"true".to_string()));
    assert_eq!(bag.get("cc.byte"), Some(&"127".to_string()));
    assert_eq!(bag.get("cc.string"), Some(&"hello".to_string()));
    // List-valued entries are skipped, not stringified.
    assert_eq!(bag.get("list"), None);
}

#[test]
fn test_properties_scoped_to_prefix() {
    let app = load();
    let cc = app.get_contract("cc").unwrap().unwrap();
    let bag = cc.properties();

    assert_eq!(bag.get("byte"), Some(&"127".to_string()));
    assert_eq!(bag.get("cc.byte"), None);
    assert_eq!(bag.get("aa"), None);
}

#[test]
fn test_properties_reflect_injected_overlay() {
    let store = PropertyStore::new();
    store.set("bb", "3");
    let app = load_with(store);

    assert_eq!(app.properties().get("bb"), Some(&"1".to_string()));
    assert_eq!(app.get_i32("bb").unwrap(), Some(3));
    assert_eq!(app.properties().get("bb"), Some(&"3".to_string()));
}

#[test]
fn test_reserved_properties_operation_via_invoke() {
    let app = load();
    let bag = app.invoke("properties", None).unwrap();
    let entries = bag.as_map().unwrap();
    assert_eq!(entries["aa"], Materialized::Scalar(Scalar::Str("true".to_string())));
}

#[test]
fn test_each_load_yields_distinct_identity() {
    let binder = Binder::new(StaticSources::new(PropertyStore::new()).with_default(DEFAULTS));
    let a = binder.load(&root_contract(), None).unwrap();
    let b = binder.load(&root_contract(), None).unwrap();

    assert_ne!(a, b);
    assert_eq!(a, a.clone());
    assert_eq!(a.to_string(), a.to_string());
    assert_ne!(a.to_string(), b.to_string());
}

#[test]
fn test_invalid_contract_rejected_at_load() {
    let contract = Contract::builder("B6")
        .operation(Operation::builder("b").returns(ReturnShape::Array).build())
        .build();
    let binder = Binder::new(StaticSources::new(PropertyStore::new()).with_default(DEFAULTS));

    let err = binder.load(&contract, None).unwrap_err();
    assert_eq!(err.to_string(), "b: a list should be used instead of an array");
}

#[test]
fn test_nested_contract_validated_at_materialization() {
    let bad_nested = Contract::builder("CC")
        .operation(Operation::builder("bad").returns(ReturnShape::Array).build())
        .build();
    let contract = Contract::builder("App")
        .operation(Operation::builder("cc").returns(ReturnShape::Contract(bad_nested)).build())
        .build();
    let binder = Binder::new(StaticSources::new(PropertyStore::new()).with_default(DEFAULTS));

    // The root loads: nested contracts validate when first materialized.
    let app = binder.load(&contract, None).unwrap();
    let err = app.get_contract("cc").unwrap_err();
    assert_eq!(
        err.to_string(),
        "cc.bad: a list should be used instead of an array"
    );
}

/// Delegates to in-memory sources while counting overlay consultations.
struct CountingSources {
    inner: StaticSources,
    overlay_calls: Arc<AtomicUsize>,
}

impl SourceProvider for CountingSources {
    fn default_fragments(&self) -> Result<Vec<String>, BindError> {
        self.inner.default_fragments()
    }

    fn resolve_override(&self, selector: &str) -> Result<Option<String>, BindError> {
        self.inner.resolve_override(selector)
    }

    fn overlay(&self, key: &str) -> Option<String> {
        self.overlay_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.overlay(key)
    }
}

#[test]
fn test_concurrent_first_calls_consult_overlay_once() {
    let store = PropertyStore::new();
    store.set("bb", "3");
    let overlay_calls = Arc::new(AtomicUsize::new(0));
    let sources = CountingSources {
        inner: StaticSources::new(store).with_default("bb: 1"),
        overlay_calls: Arc::clone(&overlay_calls),
    };
    let contract = Contract::builder("App")
        .operation(primitive("bb", ScalarType::I32))
        .build();
    let app = Binder::new(sources).load(&contract, None).unwrap();

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                assert_eq!(app.get_i32("bb").unwrap(), Some(3));
            });
        }
    });

    assert_eq!(overlay_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_overlay_injection_is_once_per_operation() {
    let store = PropertyStore::new();
    store.set("bb", "oops");
    let app = load_with(store.clone());

    let err = app.get_i32("bb").unwrap_err();
    assert_eq!(err.to_string(), "bb: cannot convert string to i32");

    // The overlay was already injected; a recomputation after the
    // coercion error reuses the injected tree instead of consulting the
    // store again.
    store.set("bb", "7");
    let err = app.get_i32("bb").unwrap_err();
    assert_eq!(err.to_string(), "bb: cannot convert string to i32");
}

proptest! {
    #[test]
    fn prop_narrow_integers_fit_exactly(n in any::<i64>()) {
        let contract = Contract::builder("N")
            .operation(scalar("v", ScalarType::I8))
            .operation(scalar("w", ScalarType::I16))
            .build();
        let binder = Binder::new(
            StaticSources::new(PropertyStore::new()).with_default(format!("v: {n}\nw: {n}")),
        );
        let app = binder.load(&contract, None).unwrap();

        match i8::try_from(n) {
            Ok(small) => prop_assert_eq!(app.get_i8("v").unwrap(), Some(small)),
            Err(_) => prop_assert!(app.get_i8("v").is_err()),
        }
        match i16::try_from(n) {
            Ok(small) => prop_assert_eq!(app.get_i16("w").unwrap(), Some(small)),
            Err(_) => prop_assert!(app.get_i16("w").is_err()),
        }
    }
}

#[test]
fn test_malformed_default_is_fatal() {
    let binder = Binder::new(StaticSources::new(PropertyStore::new()).with_default("a: {"));
    let contract = Contract::builder("App")
        .operation(scalar("a", ScalarType::Str))
        .build();

    assert!(binder.load(&contract, None).is_err());
}
