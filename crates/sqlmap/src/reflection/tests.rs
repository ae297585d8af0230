use super::*;
use crate::error::MapperResult;
use crate::value::{FromValue, Value};
use std::sync::{Arc, OnceLock};

#[derive(Debug, Default)]
struct Account {
    id: i64,
    user_name: String,
    active: bool,
    nickname: Option<String>,
}

fn set_text(slot: &mut String, value: Value) -> MapperResult<()> {
    *slot = String::from_value(value)?;
    Ok(())
}

impl Bean for Account {
    fn class() -> Arc<ClassDef> {
        static CLASS: OnceLock<Arc<ClassDef>> = OnceLock::new();
        CLASS
            .get_or_init(|| {
                ClassDef::builder::<Account>("Account")
                    .getter("getId", TypeDesc::integer(), |a| a.id.into())
                    .setter("setId", TypeDesc::integer(), |a, v| {
                        a.id = i64::from_value(v)?;
                        Ok(())
                    })
                    .getter("getUserName", TypeDesc::text(), |a| a.user_name.as_str().into())
                    .setter("setUserName", TypeDesc::text(), |a, v| set_text(&mut a.user_name, v))
                    .getter("isActive", TypeDesc::boolean(), |a| a.active.into())
                    .getter("getClass", TypeDesc::text(), |_| "Account".into())
                    .field(
                        "nickname",
                        TypeDesc::text(),
                        |a| a.nickname.clone().into(),
                        |a, v| {
                            a.nickname = Option::<String>::from_value(v)?;
                            Ok(())
                        },
                    )
                    .constant("serialVersionUID", TypeDesc::integer(), 1)
                    .constant("VERSION", TypeDesc::integer(), 3)
                    .default_constructor(Account::default)
                    .build()
            })
            .clone()
    }

    fn class_def(&self) -> Arc<ClassDef> {
        Self::class()
    }
}

fn number() -> TypeDesc {
    TypeDesc::named("Number", [TypeDesc::object()])
}

fn long() -> TypeDesc {
    TypeDesc::named("Long", [number()])
}

struct Base {
    value: i64,
    label: String,
}

struct Derived {
    base: Base,
}

fn base_class() -> Arc<ClassDef> {
    ClassDef::builder::<Base>("Base")
        .getter("getValue", number(), |b| Value::Float(b.value as f64))
        .setter("setLabel", TypeDesc::text(), |b, v| set_text(&mut b.label, v))
        .read_only_field("label", TypeDesc::text(), |b| b.label.as_str().into())
        .build()
}

fn derived_class() -> Arc<ClassDef> {
    ClassDef::builder::<Derived>("Derived")
        .extends_via::<Base>(base_class(), |d| &d.base, |d| &mut d.base)
        .getter("getValue", long(), |d| d.base.value.into())
        .build()
}

fn derived() -> Derived {
    Derived {
        base: Base {
            value: 7,
            label: "seven".into(),
        },
    }
}

#[test]
fn resolves_properties_in_both_directions() {
    let reflector = Reflector::new(&Account::class());
    assert_eq!(
        reflector.readable_property_names(),
        ["VERSION", "active", "id", "nickname", "userName"]
    );
    assert_eq!(reflector.writable_property_names(), ["id", "nickname", "userName"]);
    assert!(reflector.has_getter("active"));
    assert!(!reflector.has_setter("active"));
    assert_eq!(reflector.getter_type("userName").unwrap(), &TypeDesc::text());
    assert_eq!(reflector.setter_type("id").unwrap(), &TypeDesc::integer());
}

#[test]
fn missing_accessor_is_not_found() {
    let reflector = Reflector::new(&Account::class());
    let err = reflector.get_getter("email").unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("email"));
    assert!(reflector.get_setter("VERSION").unwrap_err().is_not_found());
}

#[test]
fn reserved_names_are_filtered() {
    let reflector = Reflector::new(&Account::class());
    assert!(!reflector.has_getter("class"));
    assert!(!reflector.has_getter("serialVersionUID"));
}

#[test]
fn case_insensitive_lookup_returns_declared_name() {
    let reflector = Reflector::new(&Account::class());
    assert_eq!(reflector.find_property_name("USERNAME"), Some("userName"));
    assert_eq!(reflector.find_property_name("username"), Some("userName"));
    assert_eq!(reflector.find_property_name("missing"), None);
}

#[test]
fn field_fallback_and_constants() {
    let reflector = Reflector::new(&Account::class());
    let get = reflector.get_getter("nickname").unwrap();
    assert_eq!(get.source(), InvokerSource::Field);
    assert_eq!(reflector.get_getter("id").unwrap().source(), InvokerSource::Method);

    let mut account = Account::default();
    reflector
        .get_setter("nickname")
        .unwrap()
        .set(&mut account, Value::from("bob"))
        .unwrap();
    assert_eq!(account.nickname.as_deref(), Some("bob"));

    let version = reflector.get_getter("VERSION").unwrap().get(&account).unwrap();
    assert_eq!(version, Value::Int(3));
    assert!(!reflector.has_setter("VERSION"));
}

#[test]
fn covariant_override_prefers_subtype_return() {
    let reflector = Reflector::new(&derived_class());
    assert_eq!(reflector.getter_type("value").unwrap(), &long());
    let value = reflector.get_getter("value").unwrap().get(&derived()).unwrap();
    assert_eq!(value, Value::Int(7));
}

#[test]
fn inherited_accessors_reach_the_embedded_parent() {
    let reflector = Reflector::new(&derived_class());
    let mut target = derived();
    reflector
        .get_setter("label")
        .unwrap()
        .set(&mut target, Value::from("eight"))
        .unwrap();
    assert_eq!(target.base.label, "eight");
    let label = reflector.get_getter("label").unwrap().get(&target).unwrap();
    assert_eq!(label, Value::from("eight"));
    assert_eq!(
        reflector.get_getter("label").unwrap().source(),
        InvokerSource::Field
    );
}

#[test]
fn accessor_rejects_foreign_instances() {
    let reflector = Reflector::new(&Account::class());
    let err = reflector.get_getter("id").unwrap().get(&derived()).unwrap_err();
    assert!(err.is_binding());
}

struct Widget {
    name: String,
}

fn widget_class() -> Arc<ClassDef> {
    let coded = ClassDef::interface::<Widget>("Coded")
        .abstract_getter("getCode", TypeDesc::text())
        .build();
    let numbered = ClassDef::interface::<Widget>("Numbered")
        .abstract_getter("getCode", TypeDesc::integer())
        .build();
    ClassDef::builder::<Widget>("Widget")
        .implements(numbered)
        .implements(coded)
        .getter("getName", TypeDesc::text(), |w| w.name.as_str().into())
        .build()
}

#[test]
fn sibling_interfaces_defer_ambiguity_to_invocation() {
    let reflector = Reflector::new(&widget_class());
    assert!(reflector.has_getter("code"));

    let widget = Widget { name: "w".into() };
    let err = reflector.get_getter("code").unwrap().get(&widget).unwrap_err();
    assert!(err.is_ambiguous());
    let message = err.to_string();
    assert!(message.contains("Coded.Text#getCode"), "{message}");
    assert!(message.contains("Numbered.Integer#getCode"), "{message}");

    let name = reflector.get_getter("name").unwrap().get(&widget).unwrap();
    assert_eq!(name, Value::from("w"));
}

#[test]
fn boolean_is_getter_wins_over_get() {
    struct Flag(bool);
    let class = ClassDef::builder::<Flag>("Flag")
        .getter("getEnabled", TypeDesc::boolean(), |f| f.0.into())
        .getter("isEnabled", TypeDesc::boolean(), |f| f.0.into())
        .getter("isLabel", TypeDesc::text(), |_| "no".into())
        .build();
    let reflector = Reflector::new(&class);
    assert_eq!(reflector.get_getter("enabled").unwrap().member(), "isEnabled");
    assert!(!reflector.has_getter("label"));
}

#[test]
fn class_and_interface_getters_with_unrelated_types_are_ambiguous() {
    struct Pair;
    let first = ClassDef::interface::<Pair>("First")
        .abstract_getter("getKey", TypeDesc::text())
        .build();
    let class = ClassDef::builder::<Pair>("Pair")
        .implements(first)
        .getter("getKey", TypeDesc::integer(), |_| 1.into())
        .build();
    let reflector = Reflector::new(&class);
    assert!(reflector.get_getter("key").unwrap().is_ambiguous());
}

#[test]
fn setter_matching_getter_type_wins() {
    #[derive(Default)]
    struct Amount(i64);
    let class = ClassDef::builder::<Amount>("Amount")
        .getter("getAmount", TypeDesc::integer(), |a| a.0.into())
        .setter("setAmount", TypeDesc::text(), |_, _| Ok(()))
        .setter("setAmount", TypeDesc::integer(), |a, v| {
            a.0 = i64::from_value(v)?;
            Ok(())
        })
        .build();
    let reflector = Reflector::new(&class);
    assert_eq!(reflector.setter_type("amount").unwrap(), &TypeDesc::integer());

    let mut amount = Amount::default();
    reflector
        .get_setter("amount")
        .unwrap()
        .set(&mut amount, Value::Int(12))
        .unwrap();
    assert_eq!(amount.0, 12);
}

#[test]
fn unrelated_setters_without_getter_are_ambiguous() {
    struct Code;
    let class = ClassDef::builder::<Code>("Code")
        .setter("setCode", TypeDesc::text(), |_, _| Ok(()))
        .setter("setCode", TypeDesc::integer(), |_, _| Ok(()))
        .build();
    let reflector = Reflector::new(&class);
    let mut code = Code;
    let err = reflector
        .get_setter("code")
        .unwrap()
        .set(&mut code, Value::Int(1))
        .unwrap_err();
    assert!(err.is_ambiguous());
    assert!(err.to_string().contains("'Text' and 'Integer'"));
}

#[test]
fn more_general_setter_loses_to_specific_one() {
    struct Holder;
    let class = ClassDef::builder::<Holder>("Holder")
        .setter("setValue", number(), |_, _| Ok(()))
        .setter("setValue", long(), |_, _| Ok(()))
        .build();
    let reflector = Reflector::new(&class);
    assert_eq!(reflector.setter_type("value").unwrap(), &long());
}

#[test]
fn bridge_methods_are_skipped() {
    struct Bridged;
    let class = ClassDef::builder::<Bridged>("Bridged")
        .bridge_getter("getItem", TypeDesc::object(), |_| Value::Null)
        .getter("getItem", TypeDesc::text(), |_| "real".into())
        .build();
    let reflector = Reflector::new(&class);
    assert_eq!(reflector.getter_type("item").unwrap(), &TypeDesc::text());
}

#[test]
fn default_constructor_is_optional() {
    let reflector = Reflector::new(&Account::class());
    assert!(reflector.has_default_constructor());
    let instance = reflector.new_instance().unwrap();
    assert!(instance.downcast_ref::<Account>().is_some());

    let reflector = Reflector::new(&widget_class());
    assert!(!reflector.has_default_constructor());
    assert!(reflector.new_instance().unwrap_err().is_configuration());
}

#[test]
fn factory_builds_each_type_once_under_contention() {
    let factory = ReflectorFactory::new();
    let class = Account::class();
    let reflectors: Vec<Arc<Reflector>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| factory.find_for_class(&class)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(reflectors.iter().all(|r| Arc::ptr_eq(r, &reflectors[0])));
    assert_eq!(factory.cached_types(), 1);
}

#[test]
fn disabled_class_cache_builds_fresh_tables() {
    let factory = ReflectorFactory::new();
    factory.set_class_cache_enabled(false);
    let class = Account::class();
    let a = factory.find_for_class(&class);
    let b = factory.find_for_class(&class);
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(factory.cached_types(), 0);
}

#[test]
fn tokenizer_splits_index_and_children() {
    let prop = PropertyTokenizer::new("orders[2].lines.sku");
    assert_eq!(prop.name(), "orders");
    assert_eq!(prop.indexed_name(), "orders[2]");
    assert_eq!(prop.index(), Some("2"));
    assert_eq!(prop.children(), Some("lines.sku"));
    let child = prop.child().unwrap();
    assert_eq!(child.name(), "lines");
    assert_eq!(child.child().unwrap().name(), "sku");
}

fn account_value() -> Value {
    Value::bean(Account {
        id: 9,
        user_name: "ann".into(),
        active: true,
        nickname: None,
    })
}

#[test]
fn meta_object_walks_maps_lists_and_beans() {
    let factory = ReflectorFactory::new();
    let root = Value::map([
        ("owner", account_value()),
        ("tags", Value::from(vec!["a", "b"])),
        ("missing", Value::Null),
    ]);
    let meta = MetaObject::new(&root, &factory);
    assert_eq!(meta.get_value("owner.userName").unwrap(), Value::from("ann"));
    assert_eq!(meta.get_value("tags[1]").unwrap(), Value::from("b"));
    assert_eq!(meta.get_value("missing.anything").unwrap(), Value::Null);
    assert_eq!(meta.get_value("absent").unwrap(), Value::Null);
    assert!(meta.get_value("owner.email").unwrap_err().is_not_found());
    assert!(meta.get_value("tags[5]").unwrap_err().is_binding());

    assert!(meta.has_getter("owner.active"));
    assert!(!meta.has_getter("owner.email"));
    assert!(meta.has_getter("missing.anything"));
    assert_eq!(meta.getter_type("owner.id").unwrap(), TypeDesc::integer());
    assert_eq!(meta.getter_type("tags").unwrap(), TypeDesc::list());
}

#[test]
fn meta_object_reads_into_json() {
    let factory = ReflectorFactory::new();
    let root = Value::map([(
        "meta",
        Value::Json(serde_json::json!({"id": 5, "tags": ["x", "y"], "owner": null})),
    )]);
    let meta = MetaObject::new(&root, &factory);
    assert_eq!(meta.get_value("meta.id").unwrap(), Value::Int(5));
    assert_eq!(meta.get_value("meta.tags[1]").unwrap(), Value::from("y"));
    assert_eq!(meta.get_value("meta.owner.name").unwrap(), Value::Null);
    assert!(meta.has_getter("meta.id"));
    assert_eq!(meta.getter_type("meta.id").unwrap(), TypeDesc::integer());

    let json = Value::Json(serde_json::json!({"b": 1, "a": 2}));
    let meta = MetaObject::new(&json, &factory);
    assert_eq!(meta.getter_names(), vec!["a", "b"]);
    assert!(!json.is_scalar());
    assert!(Value::Json(serde_json::json!(3)).is_scalar());
}

#[test]
fn meta_object_writes_maps_and_owned_beans() {
    let factory = ReflectorFactory::new();
    let mut root = Value::Null;
    MetaObject::set_value(&mut root, "a.b", Value::Int(1), &factory).unwrap();
    assert_eq!(
        MetaObject::new(&root, &factory).get_value("a.b").unwrap(),
        Value::Int(1)
    );

    let mut bean = account_value();
    MetaObject::set_value(&mut bean, "userName", Value::from("zed"), &factory).unwrap();
    assert_eq!(
        MetaObject::new(&bean, &factory).get_value("userName").unwrap(),
        Value::from("zed")
    );

    let shared = bean.clone();
    let err = MetaObject::set_value(&mut bean, "id", Value::Int(2), &factory).unwrap_err();
    assert!(err.is_binding());
    drop(shared);
}
