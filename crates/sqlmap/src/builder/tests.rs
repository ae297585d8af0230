use super::*;
use crate::config::{Configuration, PlaceholderStyle, Settings};
use crate::mapping::JdbcType;
use crate::reflection::{Bean, ClassDef, TypeDesc};
use crate::value::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

struct Order {
    id: i64,
    total: f64,
}

impl Bean for Order {
    fn class() -> Arc<ClassDef> {
        static CLASS: OnceLock<Arc<ClassDef>> = OnceLock::new();
        CLASS
            .get_or_init(|| {
                ClassDef::builder::<Order>("Order")
                    .getter("getId", TypeDesc::integer(), |o| o.id.into())
                    .getter("getTotal", TypeDesc::float(), |o| o.total.into())
                    .getter("getCustomer", TypeDesc::map(), |_| Value::map([("name", "ann")]))
                    .build()
            })
            .clone()
    }

    fn class_def(&self) -> Arc<ClassDef> {
        Self::class()
    }
}

fn parse(configuration: &Configuration, sql: &str, parameter_type: &ParameterType) -> StaticSqlSource {
    SqlSourceBuilder::new(configuration)
        .parse(sql, parameter_type, &BTreeMap::new())
        .unwrap()
}

fn properties(source: &StaticSqlSource) -> Vec<&str> {
    source
        .parameter_mappings()
        .iter()
        .map(|m| m.property())
        .collect()
}

#[test]
fn one_mapping_per_placeholder_in_order() {
    let configuration = Configuration::default();
    let source = parse(
        &configuration,
        "select * from t where a = #{a} and b = #{b} or a = #{a}",
        &ParameterType::Map,
    );
    assert_eq!(source.sql(), "select * from t where a = ? and b = ? or a = ?");
    assert_eq!(properties(&source), vec!["a", "b", "a"]);
}

#[test]
fn adjacent_placeholders() {
    let configuration = Configuration::default();
    let source = parse(&configuration, "#{a}#{b}#{a}", &ParameterType::Object);
    assert_eq!(source.sql(), "???");
    assert_eq!(properties(&source), vec!["a", "b", "a"]);
}

#[test]
fn dollar_markers_are_numbered() {
    let configuration =
        Configuration::new(Settings::default().placeholder_style(PlaceholderStyle::Dollar));
    let source = parse(
        &configuration,
        "update t set a = #{a} where id = #{id}",
        &ParameterType::Map,
    );
    assert_eq!(source.sql(), "update t set a = $1 where id = $2");
}

#[test]
fn attributes_become_type_hints() {
    let configuration = Configuration::default();
    let source = parse(
        &configuration,
        "insert into t values (#{price, jdbcType=NUMERIC, numericScale=2}, #{name:VARCHAR}, #{at, javaType=timestamp})",
        &ParameterType::Map,
    );
    let mappings = source.parameter_mappings();
    assert_eq!(mappings[0].jdbc_type(), Some(JdbcType::Numeric));
    assert_eq!(mappings[0].numeric_scale(), Some(2));
    assert_eq!(mappings[1].jdbc_type(), Some(JdbcType::Varchar));
    assert_eq!(mappings[2].java_type(), &TypeDesc::timestamp());
    assert_eq!(mappings[2].jdbc_type(), None);
}

#[test]
fn unknown_attribute_is_rejected() {
    let configuration = Configuration::default();
    let err = SqlSourceBuilder::new(&configuration)
        .parse("#{id, colour=red}", &ParameterType::Map, &BTreeMap::new())
        .unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("colour"));
}

#[test]
fn output_modes_are_rejected() {
    let configuration = Configuration::default();
    for mode in ["OUT", "INOUT"] {
        let err = SqlSourceBuilder::new(&configuration)
            .parse(&format!("#{{id, mode={mode}}}"), &ParameterType::Map, &BTreeMap::new())
            .unwrap_err();
        assert!(err.is_configuration(), "{mode}");
    }
    let source = parse(&configuration, "#{id, mode=IN}", &ParameterType::Map);
    assert_eq!(properties(&source), vec!["id"]);
}

#[test]
fn missing_property_and_expressions_are_rejected() {
    let configuration = Configuration::default();
    let builder = SqlSourceBuilder::new(&configuration);
    assert!(
        builder
            .parse("#{ }", &ParameterType::Map, &BTreeMap::new())
            .unwrap_err()
            .is_configuration()
    );
    assert!(
        builder
            .parse("#{(a + 1)}", &ParameterType::Map, &BTreeMap::new())
            .unwrap_err()
            .is_configuration()
    );
}

#[test]
fn scalar_parameter_type_applies_to_every_placeholder() {
    let configuration = Configuration::default();
    let source = parse(
        &configuration,
        "#{anything} #{else}",
        &ParameterType::Scalar(TypeDesc::integer()),
    );
    assert!(
        source
            .parameter_mappings()
            .iter()
            .all(|m| m.java_type() == &TypeDesc::integer())
    );
}

#[test]
fn bean_properties_resolve_getter_types() {
    let configuration = Configuration::default();
    let source = parse(
        &configuration,
        "#{id} #{total} #{customer.name}",
        &ParameterType::bean::<Order>(),
    );
    let types: Vec<_> = source
        .parameter_mappings()
        .iter()
        .map(|m| m.java_type().clone())
        .collect();
    assert_eq!(
        types,
        vec![TypeDesc::integer(), TypeDesc::float(), TypeDesc::object()]
    );
}

#[test]
fn bean_without_getter_is_binding_error() {
    let configuration = Configuration::default();
    let err = SqlSourceBuilder::new(&configuration)
        .parse("#{missing}", &ParameterType::bean::<Order>(), &BTreeMap::new())
        .unwrap_err();
    assert!(err.is_binding());
    assert!(err.to_string().contains("missing"));
}

#[test]
fn additional_parameters_take_precedence() {
    let configuration = Configuration::default();
    let bindings = BTreeMap::from([("__frch_id_0".to_string(), Value::Int(3))]);
    let source = SqlSourceBuilder::new(&configuration)
        .parse("#{__frch_id_0}", &ParameterType::bean::<Order>(), &bindings)
        .unwrap();
    assert_eq!(
        source.parameter_mappings()[0].java_type(),
        &TypeDesc::integer()
    );
}

#[test]
fn whitespace_shrinking_is_optional() {
    let sql = "select *\n   from t\n\twhere id = #{id}";

    let configuration = Configuration::default();
    assert_eq!(
        parse(&configuration, sql, &ParameterType::Map).sql(),
        "select *\n   from t\n\twhere id = ?"
    );

    let configuration =
        Configuration::new(Settings::default().shrink_whitespaces_in_sql(true));
    assert_eq!(
        parse(&configuration, sql, &ParameterType::Map).sql(),
        "select * from t where id = ?"
    );
}

#[test]
fn escaped_placeholder_is_literal() {
    let configuration = Configuration::default();
    let source = parse(&configuration, r"select '\#{x}', #{y}", &ParameterType::Map);
    assert_eq!(source.sql(), "select '#{x}', ?");
    assert_eq!(properties(&source), vec!["y"]);
}

#[test]
fn parameter_type_of_runtime_value() {
    assert!(matches!(ParameterType::of(&Value::Null), ParameterType::Object));
    assert!(matches!(ParameterType::of(&Value::map([("a", 1)])), ParameterType::Map));
    assert!(matches!(
        ParameterType::of(&Value::Int(1)),
        ParameterType::Scalar(ref ty) if *ty == TypeDesc::integer()
    ));
    assert_eq!(
        ParameterType::of(&Value::bean(Order { id: 1, total: 2.0 })).type_name(),
        "Order"
    );
}
