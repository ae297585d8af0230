use super::*;
use crate::reflection::{ReflectorFactory, TypeDesc};
use crate::value::Value;

fn mapping(property: &str) -> ParameterMapping {
    ParameterMapping::builder(property, TypeDesc::object()).build()
}

#[test]
fn additional_parameters_match_by_first_segment() {
    let mut bound = BoundSql::new("x".into(), vec![], Value::Null);
    bound.set_additional_parameter("item", Value::map([("id", 4)]));
    assert!(bound.has_additional_parameter("item"));
    assert!(bound.has_additional_parameter("item.id"));
    assert!(!bound.has_additional_parameter("other"));

    let factory = ReflectorFactory::new();
    assert_eq!(
        bound.additional_parameter("item.id", &factory).unwrap(),
        Value::Int(4)
    );
}

#[test]
fn values_follow_resolution_order() {
    let factory = ReflectorFactory::new();
    let mut bound = BoundSql::new(
        "select ? , ?, ?".into(),
        vec![mapping("name"), mapping("__frch_id_0"), mapping("user.age")],
        Value::map([
            ("name", Value::from("ann")),
            ("user", Value::map([("age", 30)])),
        ]),
    );
    bound.set_additional_parameter("__frch_id_0", Value::Int(9));
    assert_eq!(
        bound.parameter_values(&factory).unwrap(),
        vec![Value::from("ann"), Value::Int(9), Value::Int(30)]
    );
}

#[test]
fn scalar_parameter_binds_itself() {
    let factory = ReflectorFactory::new();
    let bound = BoundSql::new(
        "select ?".into(),
        vec![mapping("anything")],
        Value::Int(5),
    );
    assert_eq!(bound.parameter_values(&factory).unwrap(), vec![Value::Int(5)]);
}

#[test]
fn null_parameter_gives_null_values() {
    let factory = ReflectorFactory::new();
    let bound = BoundSql::new("select ?".into(), vec![mapping("id")], Value::Null);
    assert_eq!(bound.parameter_values(&factory).unwrap(), vec![Value::Null]);
}

#[test]
fn parses_jdbc_types_and_modes() {
    assert_eq!("VARCHAR".parse::<JdbcType>().unwrap(), JdbcType::Varchar);
    assert_eq!(
        "TIMESTAMP_WITH_TIMEZONE".parse::<JdbcType>().unwrap(),
        JdbcType::TimestampWithTimezone
    );
    assert!("varchar".parse::<JdbcType>().unwrap_err().is_configuration());
    assert_eq!(JdbcType::Numeric.to_string(), "NUMERIC");

    assert_eq!("INOUT".parse::<ParameterMode>().unwrap(), ParameterMode::InOut);
    assert!("SIDEWAYS".parse::<ParameterMode>().is_err());
}

#[test]
fn row_bounds_window_rows() {
    let rows: Vec<i32> = (0..10).collect();
    assert_eq!(RowBounds::default().apply(rows.clone()), rows);
    assert_eq!(RowBounds::new(2, 3).apply(rows.clone()), vec![2, 3, 4]);
    assert_eq!(RowBounds::new(8, 5).apply(rows), vec![8, 9]);
}

#[test]
fn every_mapping_yields_one_value_in_position() {
    let factory = ReflectorFactory::new();
    let out = ParameterMapping::builder("b", TypeDesc::object())
        .mode(ParameterMode::Out)
        .build();
    let bound = BoundSql::new(
        "select ?, ?, ?".into(),
        vec![mapping("a"), out, mapping("c")],
        Value::map([("a", 1), ("b", 2), ("c", 3)]),
    );
    assert_eq!(
        bound.parameter_values(&factory).unwrap(),
        vec![Value::Int(1), Value::Int(2), Value::Int(3)]
    );
}
