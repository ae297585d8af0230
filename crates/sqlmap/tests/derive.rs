#![cfg(feature = "derive")]

mod common;

use common::MemoryBackend;
use sqlmap::reflection::{MetaObject, ReflectorFactory};
use sqlmap::{
    Bean, Configuration, ConnectionTransaction, ExecutorType, ParameterType, Settings,
    SqlCommandType, TypeDesc, Value,
};
use std::sync::Arc;

#[derive(Bean, Debug, Clone, Default)]
#[bean(default)]
struct Account {
    id: i64,
    user_name: String,
    active: bool,
    email: Option<String>,
    #[bean(rename = "tags")]
    labels: Vec<String>,
    #[bean(read_only)]
    version: i32,
    #[bean(skip)]
    #[allow(dead_code)]
    scratch: Vec<u64>,
}

#[derive(Bean, Clone)]
#[bean(name = "LegacyRow", rename_all = "snake_case")]
struct LegacyRow {
    row_id: i64,
    #[bean(rename = "aValue")]
    a_value: Option<f64>,
}

fn account() -> Account {
    Account {
        id: 7,
        user_name: "ann".into(),
        active: true,
        email: None,
        labels: vec!["a".into(), "b".into()],
        version: 3,
        scratch: Vec::new(),
    }
}

#[test]
fn derived_properties_are_readable() {
    let factory = ReflectorFactory::new();
    let value = Value::bean(account());
    let meta = MetaObject::new(&value, &factory);

    assert_eq!(meta.get_value("id").unwrap(), Value::Int(7));
    assert_eq!(meta.get_value("userName").unwrap(), Value::from("ann"));
    assert_eq!(meta.get_value("active").unwrap(), Value::Bool(true));
    assert!(meta.get_value("email").unwrap().is_null());
    assert_eq!(meta.get_value("tags[1]").unwrap(), Value::from("b"));
    assert!(!meta.has_getter("scratch"));
    assert!(!meta.has_getter("labels"));
}

#[test]
fn derived_reflector_shape() {
    let factory = ReflectorFactory::new();
    let reflector = factory.find_for_class(&Account::class());

    assert_eq!(reflector.class_name(), "Account");
    assert!(reflector.has_default_constructor());
    assert_eq!(reflector.getter_type("id").unwrap(), &TypeDesc::integer());
    assert_eq!(reflector.getter_type("email").unwrap(), &TypeDesc::text());
    assert_eq!(reflector.getter_type("tags").unwrap(), &TypeDesc::list());
    assert!(reflector.has_setter("userName"));
    assert!(reflector.has_getter("version"));
    assert!(!reflector.has_setter("version"));
}

#[test]
fn derived_setters_convert_values() {
    let factory = ReflectorFactory::new();
    let mut value = Value::bean(account());
    MetaObject::set_value(&mut value, "userName", Value::from("bob"), &factory).unwrap();
    MetaObject::set_value(&mut value, "email", Value::from("b@x"), &factory).unwrap();

    let meta = MetaObject::new(&value, &factory);
    assert_eq!(meta.get_value("userName").unwrap(), Value::from("bob"));
    assert_eq!(meta.get_value("email").unwrap(), Value::from("b@x"));

    let err = MetaObject::set_value(&mut value, "id", Value::from("seven"), &factory).unwrap_err();
    assert!(err.is_binding());
}

#[test]
fn naming_attributes() {
    let factory = ReflectorFactory::new();
    let reflector = factory.find_for_class(&LegacyRow::class());
    assert_eq!(reflector.class_name(), "LegacyRow");
    assert!(reflector.has_getter("row_id"));
    assert!(reflector.has_getter("aValue"));
    assert!(reflector.has_setter("aValue"));
    assert!(!reflector.has_default_constructor());
}

#[test]
fn bean_parameters_bind_through_properties() {
    let mut configuration = Configuration::new(Settings::default());
    let statement = configuration
        .build_statement(
            "insertAccount",
            SqlCommandType::Insert,
            "insert into accounts (id, user_name, active) values (#{id}, #{userName}, #{active})",
            &ParameterType::bean::<Account>(),
        )
        .unwrap()
        .build();
    configuration.add_mapped_statement(statement).unwrap();
    configuration
        .add_statement(
            "findAccounts",
            SqlCommandType::Select,
            r#"<script>select * from accounts
                <where><if test="email != null">email = #{email}</if><if test="active">and active</if></where>
            </script>"#,
        )
        .unwrap();
    let configuration = Arc::new(configuration);

    let backend = MemoryBackend::default();
    let mut session = configuration.open_session(
        Box::new(ConnectionTransaction::new(backend.connection())),
        Some(ExecutorType::Simple),
        false,
    );
    session.insert("insertAccount", Value::bean(account())).unwrap();
    session.select_list("findAccounts", Value::bean(account())).unwrap();

    let executed = backend.executed();
    assert_eq!(
        executed[0].params,
        vec![Value::Int(7), Value::from("ann"), Value::Bool(true)]
    );
    assert!(executed[1].sql.contains("WHERE"));
    assert!(executed[1].sql.ends_with("active"));
    assert!(executed[1].params.is_empty());
}

#[test]
fn unknown_bean_property_fails_at_registration() {
    let configuration = Configuration::new(Settings::default());
    let err = configuration
        .build_statement(
            "bad",
            SqlCommandType::Select,
            "select * from accounts where id = #{accountId}",
            &ParameterType::bean::<Account>(),
        )
        .err()
        .expect("unknown property must be rejected");
    assert!(err.is_binding());
}
