use super::*;
use crate::builder::ParameterType;
use crate::executor::ExecutorType;
use crate::mapping::{JdbcType, SqlCommandType};
use crate::reflection::TypeDesc;
use crate::value::Value;
use std::time::Duration;

#[test]
fn settings_from_toml() {
    let settings = Settings::from_toml_str(
        r#"
        default_executor_type = "batch"
        default_statement_timeout = 30
        jdbc_type_for_null = "NULL"
        placeholder_style = "dollar"
        shrink_whitespaces_in_sql = true
        slow_query_threshold = 250
        database_id = "postgres"
        "#,
    )
    .unwrap();

    assert_eq!(settings.default_executor_type, ExecutorType::Batch);
    assert_eq!(settings.statement_timeout(), Some(Duration::from_secs(30)));
    assert_eq!(settings.jdbc_type_for_null, JdbcType::Null);
    assert_eq!(settings.placeholder_style, PlaceholderStyle::Dollar);
    assert!(settings.shrink_whitespaces_in_sql);
    assert_eq!(settings.slow_query_duration(), Some(Duration::from_millis(250)));
    assert_eq!(settings.database_id.as_deref(), Some("postgres"));
    // untouched keys keep their defaults
    assert!(settings.class_cache_enabled);
    assert_eq!(settings.expression_cache_capacity, 256);
}

#[test]
fn empty_toml_is_default() {
    let settings = Settings::from_toml_str("").unwrap();
    assert_eq!(settings.default_executor_type, ExecutorType::Simple);
    assert_eq!(settings.placeholder_style, PlaceholderStyle::Question);
    assert_eq!(settings.jdbc_type_for_null, JdbcType::Other);
    assert!(settings.statement_timeout().is_none());
}

#[test]
fn invalid_settings_are_configuration_errors() {
    assert!(
        Settings::from_toml_str("default_fetch_size = 0")
            .unwrap_err()
            .is_configuration()
    );
    assert!(
        Settings::from_toml_str("database_id = \"\"")
            .unwrap_err()
            .is_configuration()
    );
    assert!(
        Settings::from_toml_str("default_executor_type = \"parallel\"")
            .unwrap_err()
            .is_configuration()
    );
}

#[test]
fn settings_builder_setters() {
    let settings = Settings::new()
        .default_executor_type(ExecutorType::Reuse)
        .default_statement_timeout(Duration::from_secs(5))
        .placeholder_style(PlaceholderStyle::Dollar)
        .slow_query_threshold(Duration::from_millis(40));
    assert_eq!(settings.default_executor_type, ExecutorType::Reuse);
    assert_eq!(settings.default_statement_timeout, Some(5));
    assert_eq!(settings.slow_query_threshold, Some(40));
    assert_eq!(PlaceholderStyle::Dollar.marker(3), "$3");
    assert_eq!(PlaceholderStyle::Question.marker(3), "?");
}

#[test]
fn type_aliases_are_case_insensitive() {
    let mut configuration = Configuration::default();
    assert_eq!(configuration.resolve_type_alias("Integer").unwrap(), TypeDesc::integer());
    assert_eq!(configuration.resolve_type_alias("STRING").unwrap(), TypeDesc::text());
    assert!(
        configuration
            .resolve_type_alias("Widget")
            .unwrap_err()
            .is_configuration()
    );

    configuration.register_type_alias("Widget", TypeDesc::named("Widget", []));
    assert_eq!(configuration.resolve_type_alias("widget").unwrap().name(), "Widget");
}

#[test]
fn statements_register_once() {
    let mut configuration = Configuration::default();
    configuration
        .add_statement("findUser", SqlCommandType::Select, "select * from users where id = #{id}")
        .unwrap();
    assert!(configuration.has_statement("findUser"));

    let err = configuration
        .add_statement("findUser", SqlCommandType::Select, "select 1")
        .unwrap_err();
    assert!(err.is_configuration());

    assert!(configuration.mapped_statement("missing").unwrap_err().is_not_found());
}

#[test]
fn plain_scripts_become_raw_sources() {
    let mut configuration = Configuration::default();
    configuration
        .add_statement("raw", SqlCommandType::Select, "select * from t where id = #{id}")
        .unwrap();
    configuration
        .add_statement("subst", SqlCommandType::Select, "select * from ${table}")
        .unwrap();
    configuration
        .add_statement(
            "tagged",
            SqlCommandType::Select,
            "<script>select * from t <where><if test=\"id != null\">id = #{id}</if></where></script>",
        )
        .unwrap();

    assert!(!configuration.mapped_statement("raw").unwrap().sql_source().is_dynamic());
    assert!(configuration.mapped_statement("subst").unwrap().sql_source().is_dynamic());
    assert!(configuration.mapped_statement("tagged").unwrap().sql_source().is_dynamic());

    let bound = configuration
        .mapped_statement("raw")
        .unwrap()
        .bound_sql(&Value::map([("id", 3)]), &configuration)
        .unwrap();
    assert_eq!(bound.sql(), "select * from t where id = ?");
    assert_eq!(bound.parameter_mappings().len(), 1);
}

#[test]
fn build_statement_carries_hints() {
    let mut configuration = Configuration::default();
    let statement = configuration
        .build_statement(
            "slow",
            SqlCommandType::Update,
            "update t set n = #{n}",
            &ParameterType::from(TypeDesc::integer()),
        )
        .unwrap()
        .timeout(Duration::from_secs(2))
        .fetch_size(100)
        .build();
    configuration.add_mapped_statement(statement).unwrap();

    let statement = configuration.mapped_statement("slow").unwrap();
    assert_eq!(statement.timeout(), Some(Duration::from_secs(2)));
    assert_eq!(statement.fetch_size(), Some(100));
    assert_eq!(
        statement.sql_source().bound_sql(&Value::Int(1), &configuration).unwrap().parameter_mappings()[0]
            .java_type(),
        &TypeDesc::integer()
    );
}

#[test]
fn malformed_script_names_the_statement() {
    let mut configuration = Configuration::default();
    let err = configuration
        .add_statement("broken", SqlCommandType::Select, "<script><if>x</if></script>")
        .unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("broken"));
}
