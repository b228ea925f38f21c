//! Drives `Db` over a recording `GenericClient`: checks the SQL and parameters
//! each chain produces and how results land in the envelope.

use pgfluent::prelude::*;
use pgfluent::{ClientConfig, DangerousDmlPolicy, GenericClient, Param};
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Query(String, Vec<Value>),
    Execute(String, Vec<Value>),
}

/// Records statements and replays queued results (default: no rows).
#[derive(Default)]
struct FakeClient {
    calls: Mutex<Vec<Call>>,
    replies: Mutex<VecDeque<OrmResult<Vec<Record>>>>,
}

impl FakeClient {
    fn reply(self, rows: Value) -> Self {
        let rows = rows
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|r| r.as_object().cloned())
            .collect();
        self.replies.lock().unwrap().push_back(Ok(rows));
        self
    }

    fn fail(self, error: OrmError) -> Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn next_reply(&self) -> OrmResult<Vec<Record>> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

fn values(params: &[Param]) -> Vec<Value> {
    params.iter().map(|p| p.value().clone()).collect()
}

impl GenericClient for FakeClient {
    async fn query(&self, sql: &str, params: &[Param]) -> OrmResult<Vec<Record>> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Query(sql.to_string(), values(params)));
        self.next_reply()
    }

    async fn execute(&self, sql: &str, params: &[Param]) -> OrmResult<u64> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Execute(sql.to_string(), values(params)));
        self.next_reply().map(|rows| rows.len() as u64)
    }
}

#[tokio::test]
async fn select_chain_compiles_to_one_statement() {
    let db = Db::postgres(FakeClient::default().reply(json!([{"id": 1, "total": "99.50"}])));

    let res = db
        .from("invoices")
        .select("id, total")
        .eq("status", "paid")
        .gte("total", 10)
        .order("issued_on", Direction::Desc)
        .limit(20)
        .await;

    assert!(res.is_ok());
    assert_eq!(res.data.unwrap()[0]["total"], json!("99.50"));
    assert_eq!(
        db.backend().client().calls(),
        vec![Call::Query(
            r#"SELECT "id", "total" FROM "invoices" WHERE "status" = $1 AND "total" >= $2 ORDER BY "issued_on" DESC LIMIT 20"#.to_string(),
            vec![json!("paid"), json!(10)],
        )]
    );
}

#[tokio::test]
async fn eq_then_eq_numbers_params_in_order() {
    let db = Db::postgres(FakeClient::default());
    let _ = db.from("t").select("*").eq("a", 1).eq("b", 2).await;
    assert_eq!(
        db.backend().client().calls(),
        vec![Call::Query(
            r#"SELECT * FROM "t" WHERE "a" = $1 AND "b" = $2"#.to_string(),
            vec![json!(1), json!(2)],
        )]
    );
}

#[tokio::test]
async fn in_list_binds_each_element() {
    let db = Db::postgres(FakeClient::default());
    let _ = db.from("t").select("*").in_list("id", [1, 2, 3]).await;
    assert_eq!(
        db.backend().client().calls(),
        vec![Call::Query(
            r#"SELECT * FROM "t" WHERE "id" IN ($1,$2,$3)"#.to_string(),
            vec![json!(1), json!(2), json!(3)],
        )]
    );
}

#[tokio::test]
async fn single_on_zero_rows_is_null_without_error() {
    let db = Db::postgres(FakeClient::default());
    let res = db.from("contacts").select("*").eq("id", 404).single().await;
    assert!(res.data.is_none());
    assert!(res.error.is_none());

    let calls = db.backend().client().calls();
    let Call::Query(sql, _) = &calls[0] else {
        panic!("expected a query");
    };
    assert!(sql.ends_with("LIMIT 1"));
}

#[tokio::test]
async fn empty_insert_executes_nothing() {
    let db = Db::postgres(FakeClient::default());
    let res = db.from("contacts").insert(json!([])).await;
    assert_eq!(res.data, Some(Vec::new()));
    assert!(res.error.is_none());
    assert!(db.backend().client().calls().is_empty());
}

#[tokio::test]
async fn insert_returns_rows_from_returning() {
    let db = Db::postgres(FakeClient::default().reply(json!([{"id": 10, "name": "Ada"}])));
    let res = db
        .from("contacts")
        .insert(json!({"name": "Ada"}))
        .select("id, name")
        .single()
        .await;

    assert_eq!(res.data.unwrap()["id"], json!(10));
    assert_eq!(
        db.backend().client().calls(),
        vec![Call::Query(
            r#"INSERT INTO "contacts" ("name") VALUES ($1) RETURNING "id", "name""#.to_string(),
            vec![json!("Ada")],
        )]
    );
}

#[tokio::test]
async fn upsert_on_conflict_updates_other_columns() {
    let db = Db::postgres(FakeClient::default());
    let _ = db
        .from("contacts")
        .upsert(
            json!([{"email": "a@x.io", "name": "A"}, {"email": "b@x.io", "name": "B"}]),
            UpsertOptions::on_conflict("email"),
        )
        .await;

    let calls = db.backend().client().calls();
    let Call::Query(sql, params) = &calls[0] else {
        panic!("expected a query");
    };
    assert_eq!(
        sql,
        r#"INSERT INTO "contacts" ("email", "name") VALUES ($1, $2), ($3, $4) ON CONFLICT ("email") DO UPDATE SET "name" = EXCLUDED."name" RETURNING *"#
    );
    assert_eq!(params.len(), 4);
}

#[tokio::test]
async fn upsert_ignore_duplicates_reports_returned_rows() {
    let db = Db::postgres(FakeClient::default().reply(json!([{"email": "b@x.io"}])));
    let res = db
        .from("contacts")
        .upsert(
            json!([{"email": "a@x.io"}, {"email": "b@x.io"}]),
            UpsertOptions::on_conflict("email").ignore_duplicates(true),
        )
        .await;

    assert_eq!(res.data.unwrap().len(), 1);
    let calls = db.backend().client().calls();
    let Call::Query(sql, _) = &calls[0] else {
        panic!("expected a query");
    };
    assert!(sql.contains(r#"ON CONFLICT ("email") DO NOTHING"#));
}

#[tokio::test]
async fn update_binds_set_before_where() {
    let db = Db::postgres(FakeClient::default().reply(json!([{"id": 7, "status": "void"}])));
    let res = db
        .from("invoices")
        .update(json!({"status": "void"}))
        .eq("id", 7)
        .await;

    assert_eq!(res.data.unwrap()[0]["status"], json!("void"));
    assert_eq!(
        db.backend().client().calls(),
        vec![Call::Query(
            r#"UPDATE "invoices" SET "status" = $1 WHERE "id" = $2 RETURNING *"#.to_string(),
            vec![json!("void"), json!(7)],
        )]
    );
}

#[tokio::test]
async fn delete_executes_and_returns_no_data() {
    let db = Db::postgres(FakeClient::default());
    let res = db.from("invoices").delete().eq("id", 7).await;
    assert!(res.is_ok());
    assert!(res.data.is_none());
    assert_eq!(
        db.backend().client().calls(),
        vec![Call::Execute(
            r#"DELETE FROM "invoices" WHERE "id" = $1"#.to_string(),
            vec![json!(7)],
        )]
    );
}

#[tokio::test]
async fn exact_count_runs_a_second_statement() {
    let client = FakeClient::default()
        .reply(json!([{"id": 1}, {"id": 2}]))
        .reply(json!([{"count": 42}]));
    let db = Db::postgres(client);

    let res = db
        .from("invoices")
        .select_with("id", SelectOptions::count(Count::Exact))
        .eq("status", "paid")
        .limit(2)
        .await;

    assert_eq!(res.count, Some(42));
    assert_eq!(res.data.unwrap().len(), 2);
    let calls = db.backend().client().calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[1],
        Call::Query(
            r#"SELECT COUNT(*) AS "count" FROM "invoices" WHERE "status" = $1"#.to_string(),
            vec![json!("paid")],
        )
    );
}

#[tokio::test]
async fn head_only_skips_rows() {
    let db = Db::postgres(FakeClient::default().reply(json!([{"count": 3}])));
    let res = db
        .from("invoices")
        .select_with("*", SelectOptions::count(Count::Exact).head(true))
        .await;

    assert!(res.data.is_none());
    assert_eq!(res.count, Some(3));
    assert_eq!(db.backend().client().calls().len(), 1);
}

#[tokio::test]
async fn driver_errors_land_in_envelope() {
    let db = Db::postgres(
        FakeClient::default().fail(OrmError::UniqueViolation("contacts_email_key".into())),
    );
    let res = db.from("contacts").insert(json!({"email": "a@x.io"})).await;
    assert!(res.data.is_none());
    assert!(res.error.unwrap().is_unique_violation());
}

#[tokio::test]
async fn compile_errors_land_in_envelope() {
    let db = Db::postgres(FakeClient::default());

    let res = db.from("t").select("count(*)").await;
    assert!(res.error.unwrap().is_validation());

    let res = db
        .from("t")
        .insert(json!([{"a": 1}, {"b": 2}]))
        .await;
    assert!(res.error.unwrap().is_validation());

    assert!(db.backend().client().calls().is_empty());
}

#[tokio::test]
async fn unfiltered_delete_can_be_refused() {
    let config = ClientConfig::new().unfiltered_mutation(DangerousDmlPolicy::Error);
    let db = Db::postgres_with_config(FakeClient::default(), config);
    let res = db.from("invoices").delete().await;
    assert!(res.error.unwrap().is_validation());
    assert!(db.backend().client().calls().is_empty());
}

#[tokio::test]
async fn sql_backend_has_no_session() {
    let db = Db::postgres(FakeClient::default());
    assert!(db.auth().get_session().is_none());
    assert!(db.auth().get_user().is_none());
}

#[tokio::test]
async fn decode_into_application_structs() {
    #[derive(Debug, serde::Deserialize, PartialEq)]
    struct Contact {
        id: i64,
        name: String,
    }

    let db = Db::postgres(FakeClient::default().reply(json!([{"id": 1, "name": "Ada"}])));
    let contacts: Vec<Contact> = db.from("contacts").select("id, name").await.decode().unwrap();
    assert_eq!(contacts, vec![Contact { id: 1, name: "Ada".into() }]);
}
