//! Prepare/execute behaviour against an in-memory session that records what
//! it is asked to do.

use async_trait::async_trait;
use pgsetop::{
    BuiltQuery, Db, Executable, ParamValues, SelectQuery, Session, SessionStatement, SetOperationExt,
    SqlError, SqlResult, StatementMeta, Table, placeholder, select_from,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

#[derive(Debug, Clone)]
struct PrepareCall {
    name: Option<String>,
    sql: String,
    fields: Vec<String>,
    nullable_tables: Vec<String>,
}

#[derive(Debug, Default)]
struct Log {
    prepared: Vec<PrepareCall>,
    executed: Vec<usize>,
}

#[derive(Clone, Default)]
struct RecordingSession {
    log: Arc<Mutex<Log>>,
}

impl RecordingSession {
    fn prepared(&self) -> Vec<PrepareCall> {
        self.log.lock().unwrap().prepared.clone()
    }

    fn executed(&self) -> Vec<usize> {
        self.log.lock().unwrap().executed.clone()
    }
}

#[async_trait]
impl Session for RecordingSession {
    async fn prepare_query(
        &self,
        query: &BuiltQuery,
        meta: &StatementMeta,
        name: Option<&str>,
    ) -> SqlResult<Box<dyn SessionStatement>> {
        self.log.lock().unwrap().prepared.push(PrepareCall {
            name: name.map(str::to_string),
            sql: query.sql.clone(),
            fields: meta.fields().names().map(str::to_string).collect(),
            nullable_tables: meta
                .join_nullability()
                .iter()
                .filter(|(_, nullable)| *nullable)
                .map(|(table, _)| table.to_string())
                .collect(),
        });
        Ok(Box::new(RecordingStatement {
            log: self.log.clone(),
        }))
    }
}

struct RecordingStatement {
    log: Arc<Mutex<Log>>,
}

#[async_trait]
impl SessionStatement for RecordingStatement {
    async fn query(&self, params: &[&(dyn ToSql + Sync)]) -> SqlResult<Vec<Row>> {
        self.log.lock().unwrap().executed.push(params.len());
        Ok(Vec::new())
    }
}

/// A session whose driver fails, either while preparing or on every query.
#[derive(Clone, Copy)]
enum FailingSession {
    OnPrepare,
    OnQuery,
}

#[async_trait]
impl Session for FailingSession {
    async fn prepare_query(
        &self,
        _query: &BuiltQuery,
        _meta: &StatementMeta,
        _name: Option<&str>,
    ) -> SqlResult<Box<dyn SessionStatement>> {
        match self {
            FailingSession::OnPrepare => Err(SqlError::Other("connection reset by peer".into())),
            FailingSession::OnQuery => Ok(Box::new(TimingOutStatement)),
        }
    }
}

struct TimingOutStatement;

#[async_trait]
impl SessionStatement for TimingOutStatement {
    async fn query(&self, _params: &[&(dyn ToSql + Sync)]) -> SqlResult<Vec<Row>> {
        Err(SqlError::Timeout(Duration::from_millis(250)))
    }
}

fn names(db: &Db, table: &str) -> SelectQuery<(i64, String)> {
    let t = Table::new(table).unwrap();
    db.select(&t)
        .column(&t.column("id").unwrap())
        .column(&t.column("name").unwrap())
        .as_row()
}

#[tokio::test]
async fn execute_without_session_fails() {
    let users = Table::new("users").unwrap();
    let admins = Table::new("admins").unwrap();
    let q = select_from(&users)
        .column(&users.column("id").unwrap())
        .union(select_from(&admins).column(&admins.column("id").unwrap()))
        .unwrap();

    let err = q.execute_rows(&ParamValues::new()).await.unwrap_err();
    assert!(err.is_session_missing());
    assert_eq!(
        err.to_string(),
        "Cannot execute a query on a query builder. Please use a database instance instead."
    );

    let err = q.prepare("ids").await.unwrap_err();
    assert!(matches!(err, SqlError::SessionMissing));
}

#[tokio::test]
async fn session_comes_from_the_left_operand() {
    let session = RecordingSession::default();
    let db = Db::new(session.clone());
    let admins = Table::new("admins").unwrap();
    let unbound = select_from(&admins)
        .column(&admins.column("id").unwrap())
        .column(&admins.column("name").unwrap())
        .as_row::<(i64, String)>();

    let rows = names(&db, "users")
        .union(unbound)
        .unwrap()
        .execute(&ParamValues::new())
        .await
        .unwrap();
    assert!(rows.is_empty());
    assert_eq!(session.executed(), vec![0]);

    let unbound = select_from(&admins)
        .column(&admins.column("id").unwrap())
        .column(&admins.column("name").unwrap())
        .as_row::<(i64, String)>();
    let err = unbound
        .union(names(&db, "users"))
        .unwrap()
        .execute(&ParamValues::new())
        .await
        .unwrap_err();
    assert!(err.is_session_missing());
}

#[tokio::test]
async fn prepare_passes_name_sql_and_metadata() {
    let session = RecordingSession::default();
    let db = Db::new(session.clone());
    let users = Table::new("users").unwrap();

    let prepared = pgsetop::union!(names(&db, "users"), names(&db, "admins"), names(&db, "guests"))
        .unwrap()
        .order_by([users.column("name").unwrap().asc()])
        .limit(10)
        .prepare("people")
        .await
        .unwrap();

    assert_eq!(prepared.name(), Some("people"));
    assert_eq!(prepared.fields().len(), 2);
    assert_eq!(prepared.placeholders().count(), 0);

    let calls = session.prepared();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name.as_deref(), Some("people"));
    assert_eq!(calls[0].fields, vec!["id", "name"]);
    assert_eq!(
        calls[0].sql,
        "((select users.id, users.name from users) union (select admins.id, admins.name from admins)) \
         union (select guests.id, guests.name from guests) order by name asc limit 10"
    );
    assert_eq!(prepared.sql(), calls[0].sql);
}

#[tokio::test]
async fn unnamed_prepare_has_no_name() {
    let session = RecordingSession::default();
    let db = Db::new(session.clone());

    let prepared = names(&db, "users")
        .intersect(names(&db, "admins"))
        .unwrap()
        .prepare_unnamed()
        .await
        .unwrap();
    assert_eq!(prepared.name(), None);
    assert_eq!(session.prepared()[0].name, None);
}

#[tokio::test]
async fn placeholders_are_bound_by_name_on_each_execute() {
    let session = RecordingSession::default();
    let db = Db::new(session.clone());
    let users = Table::new("users").unwrap();

    let active = names(&db, "users").filter(users.column("active").unwrap().eq(true));
    let prepared = active
        .except(names(&db, "banned"))
        .unwrap()
        .limit(placeholder("page_size"))
        .offset(placeholder("skip"))
        .prepare("page")
        .await
        .unwrap();

    assert_eq!(
        prepared.placeholders().collect::<Vec<_>>(),
        vec!["page_size", "skip"]
    );

    prepared
        .execute(&ParamValues::new().set("page_size", 20_i64).set("skip", 0_i64))
        .await
        .unwrap();
    prepared
        .execute(
            &ParamValues::new()
                .set("page_size", 20_i64)
                .set("skip", 20_i64)
                .set("unused", "ignored"),
        )
        .await
        .unwrap();
    assert_eq!(session.executed(), vec![3, 3]);
    assert_eq!(session.prepared().len(), 1);
}

#[tokio::test]
async fn missing_placeholder_fails_before_io() {
    let session = RecordingSession::default();
    let db = Db::new(session.clone());

    let prepared = names(&db, "users")
        .union_all(names(&db, "admins"))
        .unwrap()
        .limit(placeholder("page_size"))
        .prepare("page")
        .await
        .unwrap();

    let err = prepared.execute(&ParamValues::new()).await.unwrap_err();
    assert!(matches!(err, SqlError::Validation(_)));
    assert!(err.to_string().contains("page_size"));
    assert!(session.executed().is_empty());
}

#[tokio::test]
async fn join_nullability_reaches_the_session() {
    let session = RecordingSession::default();
    let db = Db::new(session.clone());
    let users = Table::new("users").unwrap();
    let profiles = Table::new("profiles").unwrap();

    let joined = db
        .select(&users)
        .column(&users.column("id").unwrap())
        .left_join(
            &profiles,
            profiles
                .column("user_id")
                .unwrap()
                .eq_column(&users.column("id").unwrap()),
        );
    let admins = Table::new("admins").unwrap();
    let other = db.select(&admins).column(&admins.column("id").unwrap());

    joined
        .union(other)
        .unwrap()
        .execute_rows(&ParamValues::new())
        .await
        .unwrap();

    let calls = session.prepared();
    assert_eq!(calls[0].nullable_tables, vec!["profiles"]);
}

#[tokio::test]
async fn invalid_select_is_not_prepared() {
    let session = RecordingSession::default();
    let db = Db::new(session.clone());
    let users = Table::new("users").unwrap();

    let err = db
        .select(&users)
        .column(&users.column("id").unwrap())
        .field("not valid", pgsetop::sql("1"))
        .execute_rows(&ParamValues::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SqlError::Validation(_)));
    assert!(session.prepared().is_empty());
}

#[tokio::test]
async fn concurrent_executes_share_a_node() {
    let session = RecordingSession::default();
    let db = Db::new(session.clone());
    let q = Arc::new(names(&db, "users").union(names(&db, "admins")).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let q = q.clone();
            tokio::spawn(async move { q.execute(&ParamValues::new()).await.map(|rows| rows.len()) })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), 0);
    }
    assert_eq!(session.executed().len(), 4);
}

#[tokio::test]
async fn prepare_errors_pass_through_unchanged() {
    let db = Db::new(FailingSession::OnPrepare);
    let q = names(&db, "users").union(names(&db, "admins")).unwrap();

    match q.prepare("people").await.unwrap_err() {
        SqlError::Other(msg) => assert_eq!(msg, "connection reset by peer"),
        other => panic!("unexpected error: {other}"),
    }
    match q.execute(&ParamValues::new()).await.unwrap_err() {
        SqlError::Other(msg) => assert_eq!(msg, "connection reset by peer"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn query_errors_pass_through_unchanged() {
    let db = Db::new(FailingSession::OnQuery);
    let q = names(&db, "users")
        .except(names(&db, "banned"))
        .unwrap()
        .limit(placeholder("page_size"));

    let prepared = q.prepare("page").await.unwrap();
    let values = ParamValues::new().set("page_size", 10_i64);
    let err = prepared.execute(&values).await.unwrap_err();
    assert!(err.is_timeout());
    assert!(matches!(err, SqlError::Timeout(d) if d == Duration::from_millis(250)));

    let err = q.execute_rows(&values).await.unwrap_err();
    assert!(matches!(err, SqlError::Timeout(d) if d == Duration::from_millis(250)));
}

#[tokio::test]
async fn negative_limit_is_not_prepared() {
    let session = RecordingSession::default();
    let db = Db::new(session.clone());

    let err = names(&db, "users")
        .union(names(&db, "admins"))
        .unwrap()
        .limit(-1)
        .prepare("page")
        .await
        .unwrap_err();
    assert!(matches!(err, SqlError::Validation(_)));
    assert!(session.prepared().is_empty());
}
