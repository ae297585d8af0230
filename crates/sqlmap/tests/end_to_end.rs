mod common;

use common::{Executed, MemoryBackend};
use sqlmap::{
    Configuration, ConnectionTransaction, ExecutorType, RowBounds, Settings, SqlCommandType,
    SqlSession, StatsMonitor, Value,
};
use std::sync::Arc;

const MAPPER: &[(&str, SqlCommandType, &str)] = &[
    (
        "findUsers",
        SqlCommandType::Select,
        r#"<script>
            select id, name from users
            <where>
                <if test="name != null">and name like #{name}</if>
                <if test="ids != null and ids.size() > 0">
                    and id in
                    <foreach collection="ids" item="id" open="(" separator="," close=")">#{id}</foreach>
                </if>
            </where>
            order by ${orderBy}
        </script>"#,
    ),
    (
        "insertUser",
        SqlCommandType::Insert,
        "insert into users (id, name) values (#{id}, #{name})",
    ),
    (
        "renameUser",
        SqlCommandType::Update,
        r#"<script>update users <set><if test="name != null">name = #{name},</if></set> where id = #{id}</script>"#,
    ),
    (
        "deleteUser",
        SqlCommandType::Delete,
        "delete from users where id = #{id}",
    ),
];

fn configuration(settings: Settings) -> Configuration {
    let mut configuration = Configuration::new(settings);
    for (id, command_type, script) in MAPPER {
        configuration.add_statement(id, *command_type, script).unwrap();
    }
    configuration
}

fn open(
    configuration: &Arc<Configuration>,
    backend: &MemoryBackend,
    executor_type: ExecutorType,
) -> SqlSession {
    configuration.open_session(
        Box::new(ConnectionTransaction::new(backend.connection())),
        Some(executor_type),
        false,
    )
}

fn user(id: i64, name: &str) -> Value {
    Value::map([("id", Value::Int(id)), ("name", Value::from(name))])
}

#[test]
fn dynamic_select_renders_and_binds() {
    let settings = Settings::from_toml_str("shrink_whitespaces_in_sql = true").unwrap();
    let configuration = Arc::new(configuration(settings));
    let backend = MemoryBackend::default();
    backend.respond_with(
        &["id", "name"],
        vec![
            vec![Value::Int(1), Value::from("ann")],
            vec![Value::Int(2), Value::from("anna")],
        ],
    );

    let mut session = open(&configuration, &backend, ExecutorType::Simple);
    let rows = session
        .select_list(
            "findUsers",
            Value::map([
                ("name", Value::from("an%")),
                ("ids", Value::from(vec![1, 2])),
                ("orderBy", Value::from("name")),
            ]),
        )
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].get::<String>("NAME").unwrap(), "anna");
    assert_eq!(
        backend.executed(),
        vec![Executed {
            sql: "select id, name from users WHERE name like ? and id in (?,?) order by name".into(),
            params: vec![Value::from("an%"), Value::Int(1), Value::Int(2)],
        }]
    );
}

#[test]
fn optional_filters_drop_out() {
    let settings = Settings::default().shrink_whitespaces_in_sql(true);
    let configuration = Arc::new(configuration(settings));
    let backend = MemoryBackend::default();
    let mut session = open(&configuration, &backend, ExecutorType::Simple);

    session
        .select_list(
            "findUsers",
            Value::map([("ids", Value::List(vec![])), ("orderBy", Value::from("id"))]),
        )
        .unwrap();
    assert_eq!(
        backend.executed()[0].sql,
        "select id, name from users order by id"
    );
}

#[test]
fn row_bounds_trim_results() {
    let configuration = Arc::new(configuration(Settings::default()));
    let backend = MemoryBackend::default();
    backend.respond_with(
        &["id"],
        (1..=5).map(|i| vec![Value::Int(i)]).collect(),
    );
    let mut session = open(&configuration, &backend, ExecutorType::Simple);
    let rows = session
        .select_list_bounded(
            "findUsers",
            Value::map([("orderBy", "id")]),
            RowBounds::new(1, 2),
        )
        .unwrap();
    let ids: Vec<i64> = rows.iter().map(|r| r.get("id").unwrap()).collect();
    assert_eq!(ids, vec![2, 3]);
}

#[test]
fn reuse_executor_prepares_each_sql_once() {
    let monitor = Arc::new(StatsMonitor::new());
    let configuration =
        Arc::new(configuration(Settings::default()).with_monitor_arc(monitor.clone()));
    let backend = MemoryBackend::default();
    let mut session = open(&configuration, &backend, ExecutorType::Reuse);

    for id in 1..=3 {
        session.insert("insertUser", user(id, "u")).unwrap();
    }
    session.delete("deleteUser", Value::map([("id", 1)])).unwrap();
    session.commit().unwrap();

    assert_eq!(
        backend.prepared(),
        vec![
            "insert into users (id, name) values (?, ?)".to_string(),
            "delete from users where id = ?".to_string(),
        ]
    );
    assert_eq!(backend.executed().len(), 4);
    assert_eq!(backend.commits(), 1);
    // commit flushes the cache
    assert_eq!(backend.closed_statements(), 2);

    let stats = monitor.stats();
    assert_eq!(stats.stmt_cache_hits, 2);
    assert_eq!(stats.stmt_cache_misses, 2);
    assert_eq!(stats.insert_count, 3);
    assert_eq!(stats.delete_count, 1);
}

#[test]
fn batch_executor_groups_consecutive_updates() {
    let monitor = Arc::new(StatsMonitor::new());
    let configuration =
        Arc::new(configuration(Settings::default()).with_monitor_arc(monitor.clone()));
    let backend = MemoryBackend::default();
    let mut session = open(&configuration, &backend, ExecutorType::Batch);

    assert_eq!(session.insert("insertUser", user(1, "a")).unwrap(), 0);
    session.insert("insertUser", user(2, "b")).unwrap();
    session.update("renameUser", user(1, "z")).unwrap();
    session.insert("insertUser", user(3, "c")).unwrap();
    assert!(backend.executed().is_empty());

    let results = session.flush_statements().unwrap();
    assert_eq!(
        results
            .iter()
            .map(|r| (r.statement_id.as_str(), r.update_counts.len()))
            .collect::<Vec<_>>(),
        vec![("insertUser", 2), ("renameUser", 1), ("insertUser", 1)]
    );
    assert_eq!(results[0].parameter_objects[1], user(2, "b"));
    assert_eq!(backend.batches().len(), 3);
    assert_eq!(monitor.stats().batch_flushes, 3);
    assert_eq!(monitor.stats().batched_statements, 4);

    session.commit().unwrap();
    assert_eq!(backend.commits(), 1);
}

#[test]
fn batch_flush_failure_names_statement() {
    let configuration = Arc::new(configuration(Settings::default()));
    let backend = MemoryBackend::default();
    backend.reject("update users");
    let mut session = open(&configuration, &backend, ExecutorType::Batch);

    session.insert("insertUser", user(1, "a")).unwrap();
    session.update("renameUser", user(1, "b")).unwrap();
    session.delete("deleteUser", Value::map([("id", 1)])).unwrap();

    let err = session.flush_statements().unwrap_err();
    assert!(err.is_execution());
    let message = err.to_string();
    assert!(message.contains("renameUser"), "{message}");
    assert!(message.contains("1 completed"), "{message}");
    // every handle was released, including the one never executed
    assert_eq!(backend.closed_statements(), 3);
    assert_eq!(backend.executed().len(), 1);
}

#[test]
fn closing_a_dirty_session_rolls_back() {
    let configuration = Arc::new(configuration(Settings::default()));
    let backend = MemoryBackend::default();
    let mut session = open(&configuration, &backend, ExecutorType::Simple);
    session.insert("insertUser", user(1, "a")).unwrap();
    session.close().unwrap();

    assert!(session.is_closed());
    assert!(backend.rollbacks() >= 1);
    assert!(backend.is_closed());
    assert!(
        session
            .select_list("findUsers", Value::map([("orderBy", "id")]))
            .unwrap_err()
            .is_execution()
    );
}

#[test]
fn unknown_statement_id() {
    let configuration = Arc::new(configuration(Settings::default()));
    let backend = MemoryBackend::default();
    let mut session = open(&configuration, &backend, ExecutorType::Simple);
    let err = session.update("nope", Value::Null).unwrap_err();
    assert!(err.is_not_found());
    assert!(backend.prepared().is_empty());
}

#[test]
fn settings_choose_default_executor() {
    let settings = Settings::from_toml_str(r#"default_executor_type = "batch""#).unwrap();
    let configuration = Arc::new(configuration(settings));
    let backend = MemoryBackend::default();
    let session = configuration.open_session(
        Box::new(ConnectionTransaction::new(backend.connection())),
        None,
        true,
    );
    assert_eq!(session.executor_type(), ExecutorType::Batch);
}
