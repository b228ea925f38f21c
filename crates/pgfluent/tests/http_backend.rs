//! Drives `Db::http` over a recording `Transport`: tenant scoping, request
//! shapes, response parsing and the storage pass-through.

use pgfluent::prelude::*;
use pgfluent::{Body, HttpReply, HttpRequest, Method, Transport};
use std::collections::VecDeque;
use std::sync::Mutex;
use url::Url;

struct FakeTransport {
    base: Url,
    sent: Mutex<Vec<(HttpRequest, Session)>>,
    replies: Mutex<VecDeque<HttpReply>>,
}

impl FakeTransport {
    fn new() -> Self {
        Self {
            base: Url::parse("https://books.example.com").unwrap(),
            sent: Mutex::new(Vec::new()),
            replies: Mutex::new(VecDeque::new()),
        }
    }

    fn reply(self, status: u16, body: Value) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(HttpReply::json(status, &body));
        self
    }

    fn reply_raw(self, status: u16, body: &'static [u8]) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(HttpReply::new(status, body));
        self
    }

    fn sent(&self) -> Vec<HttpRequest> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(req, _)| req.clone())
            .collect()
    }
}

impl Transport for FakeTransport {
    async fn send(&self, request: HttpRequest, session: &Session) -> OrmResult<HttpReply> {
        self.sent.lock().unwrap().push((request, session.clone()));
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| HttpReply::json(200, &json!({"data": []}))))
    }

    fn base_url(&self) -> Option<&Url> {
        Some(&self.base)
    }
}

fn signed_in(transport: FakeTransport) -> Db<pgfluent::HttpBackend<FakeTransport>> {
    Db::http(
        transport,
        Some(Session::new("u-42").with_email("ada@books.example.com")),
    )
}

fn user_ids(req: &HttpRequest) -> Vec<&str> {
    req.query
        .iter()
        .filter(|(k, _)| k == "user_id")
        .map(|(_, v)| v.as_str())
        .collect()
}

#[tokio::test]
async fn every_request_carries_the_session_user() {
    let db = signed_in(FakeTransport::new());

    let _ = db.from("invoices").select("*").eq("status", "paid").await;
    let _ = db.from("invoices").insert(json!({"total": "10.00"})).await;
    let _ = db
        .from("invoices")
        .update(json!({"status": "void"}))
        .eq("id", 7)
        .await;
    let _ = db
        .from("contacts")
        .upsert(json!({"email": "a@x.io"}), UpsertOptions::on_conflict("email"))
        .await;
    let _ = db.from("invoices").delete().eq("id", 7).await;

    let sent = db.backend().transport().sent();
    assert_eq!(sent.len(), 5);
    for req in &sent {
        let in_query = user_ids(req) == vec!["u-42"];
        let in_body = match req.json_body() {
            Some(Value::Object(row)) => row.get("user_id") == Some(&json!("u-42")),
            Some(Value::Array(rows)) => rows.iter().all(|r| r["user_id"] == json!("u-42")),
            _ => false,
        };
        assert!(in_query || in_body, "request without user_id: {req:?}");
    }
}

#[tokio::test]
async fn select_maps_filters_to_query_params() {
    let db = signed_in(FakeTransport::new().reply(200, json!({"data": [{"id": 1}], "count": 9})));

    let res = db
        .from("invoices")
        .select_with("id,total", SelectOptions::count(Count::Exact))
        .eq("status", "paid")
        .lt("due_on", "2024-01-31")
        .in_list("currency", ["EUR", "USD"])
        .order("due_on", Direction::Asc)
        .limit(10)
        .await;

    assert_eq!(res.count, Some(9));
    assert_eq!(res.data.unwrap().len(), 1);

    let sent = db.backend().transport().sent();
    let req = &sent[0];
    assert_eq!(req.method, Method::Get);
    assert_eq!(req.path, "/api/invoices");
    assert_eq!(req.query_value("status"), Some("paid"));
    assert_eq!(req.query_value("due_on__lt"), Some("2024-01-31"));
    assert_eq!(req.query_value("currency__in"), Some("EUR,USD"));
    assert_eq!(req.query_value("order"), Some("due_on.asc"));
    assert_eq!(req.query_value("limit"), Some("10"));
    assert_eq!(req.query_value("select"), Some("id,total"));
    assert_eq!(req.query_value("count"), Some("exact"));
}

#[tokio::test]
async fn caller_user_id_cannot_widen_scope() {
    let db = signed_in(FakeTransport::new());
    let _ = db.from("invoices").select("*").eq("user_id", "u-1").await;
    let sent = db.backend().transport().sent();
    assert_eq!(user_ids(&sent[0]), vec!["u-42"]);
}

#[tokio::test]
async fn single_unwraps_object_data() {
    let db = signed_in(FakeTransport::new().reply(200, json!({"data": [{"id": 5}]})));
    let res = db.from("contacts").select("*").eq("id", 5).single().await;
    assert_eq!(res.data.unwrap()["id"], json!(5));
    assert_eq!(
        db.backend().transport().sent()[0].query_value("limit"),
        Some("1")
    );

    let db = signed_in(FakeTransport::new().reply(200, json!({"data": []})));
    let res = db.from("contacts").select("*").single().await;
    assert!(res.is_ok());
    assert!(res.data.is_none());
}

#[tokio::test]
async fn upsert_rows_carry_markers() {
    let db = signed_in(FakeTransport::new());
    let _ = db
        .from("contacts")
        .upsert(
            json!([{"email": "a@x.io"}, {"email": "b@x.io"}]),
            UpsertOptions::on_conflict("email").ignore_duplicates(true),
        )
        .await;

    let sent = db.backend().transport().sent();
    let req = &sent[0];
    assert_eq!(req.method, Method::Post);
    for row in req.json_body().unwrap().as_array().unwrap() {
        assert_eq!(row["_upsert"], json!(true));
        assert_eq!(row["_onConflict"], json!("email"));
        assert_eq!(row["_ignoreDuplicates"], json!(true));
    }
}

#[tokio::test]
async fn update_without_id_is_rejected_before_sending() {
    let db = signed_in(FakeTransport::new());
    let res = db
        .from("invoices")
        .update(json!({"status": "void"}))
        .eq("status", "draft")
        .await;
    assert!(res.error.unwrap().is_validation());
    assert!(db.backend().transport().sent().is_empty());
}

#[tokio::test]
async fn delete_sends_id_and_user() {
    let db = signed_in(FakeTransport::new().reply(200, json!({"data": null})));
    let res = db.from("invoices").delete().eq("id", "inv-1").await;
    assert!(res.is_ok());

    let sent = db.backend().transport().sent();
    let req = &sent[0];
    assert_eq!(req.method, Method::Delete);
    assert_eq!(req.query_value("id"), Some("inv-1"));
    assert_eq!(req.query_value("user_id"), Some("u-42"));
}

#[tokio::test]
async fn missing_session_is_unauthenticated() {
    let db = Db::http(FakeTransport::new(), None);
    let res = db.from("invoices").select("*").await;
    assert!(matches!(res.error, Some(OrmError::Unauthenticated)));
    assert!(db.backend().transport().sent().is_empty());
}

#[tokio::test]
async fn api_errors_land_in_envelope() {
    let db = signed_in(
        FakeTransport::new()
            .reply(200, json!({"error": "permission denied"}))
            .reply(500, json!({})),
    );

    let res = db.from("invoices").select("*").await;
    match res.error {
        Some(OrmError::Api { message, .. }) => assert_eq!(message, "permission denied"),
        other => panic!("unexpected: {other:?}"),
    }

    let res = db.from("invoices").select("*").await;
    assert!(matches!(res.error, Some(OrmError::Api { status: 500, .. })));
}

#[tokio::test]
async fn auth_exposes_the_session() {
    let db = signed_in(FakeTransport::new());
    assert_eq!(db.auth().get_session().unwrap().user_id, "u-42");
    let user = db.auth().get_user().unwrap();
    assert_eq!(user.id, "u-42");
    assert_eq!(user.email.as_deref(), Some("ada@books.example.com"));
}

#[tokio::test]
async fn storage_pass_through() {
    let db = signed_in(
        FakeTransport::new()
            .reply(200, json!({"data": {"path": "2024/receipt.pdf"}}))
            .reply_raw(200, b"%PDF-1.7"),
    );
    let bucket = db.storage().from("receipts");

    let res = bucket
        .upload("2024/receipt.pdf", &b"%PDF-1.7"[..], "application/pdf")
        .await;
    assert_eq!(res.data.unwrap()["path"], json!("2024/receipt.pdf"));

    let res = bucket.download("2024/receipt.pdf").await;
    assert_eq!(&res.data.unwrap()[..], b"%PDF-1.7");

    let sent = db.backend().transport().sent();
    assert_eq!(sent[0].method, Method::Post);
    assert_eq!(sent[0].path, "/api/storage/receipts/2024/receipt.pdf");
    assert!(matches!(sent[0].body, Some(Body::Bytes { .. })));
    assert_eq!(sent[1].method, Method::Get);

    assert_eq!(
        bucket.public_url("2024/receipt.pdf").unwrap(),
        "https://books.example.com/api/storage/receipts/2024/receipt.pdf"
    );
    assert!(bucket.public_url("../secrets").is_err());
}
