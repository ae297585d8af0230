use super::testing::{Event, Recorder};
use super::*;

fn users() -> ResultSet {
    ResultSet::new(
        vec!["id".into(), "user_name".into()],
        vec![
            vec![Value::Int(1), Value::from("ann")],
            vec![Value::Int(2), Value::Null],
        ],
    )
}

#[test]
fn rows_share_column_names() {
    let rs = users();
    assert_eq!(rs.len(), 2);
    assert_eq!(rs.columns(), ["id", "user_name"]);
    assert_eq!(rs.rows()[1].columns(), rs.columns());
}

#[test]
fn typed_access_by_name_and_index() {
    let rows = users().into_rows();
    assert_eq!(rows[0].get::<i64>("id").unwrap(), 1);
    assert_eq!(rows[0].get::<String>("USER_NAME").unwrap(), "ann");
    assert_eq!(rows[1].get::<Option<String>>("user_name").unwrap(), None);
    assert_eq!(rows[0].get_index::<i32>(0).unwrap(), 1);

    assert!(rows[0].get::<i64>("missing").unwrap_err().is_not_found());
    assert!(rows[0].get_index::<i64>(9).unwrap_err().is_not_found());
    assert!(rows[0].get::<bool>("id").unwrap_err().is_binding());
}

#[test]
fn row_into_map() {
    let row = users().into_rows().remove(0);
    assert_eq!(
        row.into_map(),
        Value::map([("id", Value::Int(1)), ("user_name", Value::from("ann"))])
    );
}

#[test]
fn transaction_forwards_commit_and_rollback() {
    let recorder = Recorder::default();
    let mut tx = ConnectionTransaction::new(recorder.connection()).with_timeout(Duration::from_secs(3));
    assert_eq!(tx.timeout(), Some(Duration::from_secs(3)));

    // nothing to commit before the connection was handed out
    tx.commit().unwrap();
    assert!(recorder.events().is_empty());

    tx.connection().unwrap();
    tx.commit().unwrap();
    tx.rollback().unwrap();
    assert_eq!(recorder.events(), vec![Event::Commit, Event::Rollback]);
}

#[test]
fn auto_commit_transaction_skips_commit() {
    let recorder = Recorder::default();
    let mut tx = ConnectionTransaction::new(recorder.connection()).auto_commit(true);
    tx.connection().unwrap();
    tx.commit().unwrap();
    tx.close().unwrap();
    assert_eq!(recorder.events(), vec![Event::CloseConnection]);
}

#[test]
fn close_rolls_back_and_refuses_reuse() {
    let recorder = Recorder::default();
    let mut tx = ConnectionTransaction::new(recorder.connection());
    tx.connection().unwrap();
    tx.close().unwrap();
    tx.close().unwrap();
    assert_eq!(recorder.events(), vec![Event::Rollback, Event::CloseConnection]);
    assert!(tx.connection().is_err());
    assert!(tx.commit().unwrap_err().is_execution());
}
