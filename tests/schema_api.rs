mod common;

use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{spawn_app, RecordingDispatcher, TestServer};

async fn server() -> TestServer {
    spawn_app(Arc::new(RecordingDispatcher::default())).await
}

async fn body(response: reqwest::Response) -> Value {
    response.json::<Value>().await.expect("json body")
}

#[tokio::test]
async fn contacts_schema_lifecycle() {
    let srv = server().await;
    let url = srv.url("/api/schema/contacts/T1");

    // GET semeia o template
    let res = srv.client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let seeded = body(res).await;
    let properties = seeded["schema"]["properties"].as_object().unwrap();
    let mut keys: Vec<&str> = properties.keys().map(String::as_str).collect();
    keys.sort();
    assert_eq!(keys, vec!["email", "id", "name", "phone", "status"]);
    assert_eq!(seeded["schema"]["type"], "object");
    assert_eq!(seeded["schema"]["required"], json!(["id", "name", "email"]));
    assert_eq!(
        seeded["schema"]["properties"]["status"],
        json!({
            "type": "string",
            "title": "Status",
            "enum": ["Active", "Inactive", "Pending"],
            "default": "Active"
        })
    );
    assert_eq!(seeded["schema"]["properties"]["id"], json!({"type": "string", "title": "ID"}));

    // POST adiciona o campo
    let res = srv
        .client
        .post(&url)
        .json(&json!({"field": {"name": "birthday", "title": "Birthday", "type": "date", "required": false}}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let added = body(res).await;
    assert_eq!(
        added["schema"]["properties"]["birthday"],
        json!({"type": "string", "title": "Birthday", "format": "date"})
    );
    assert_eq!(added["schema"]["required"], json!(["id", "name", "email"]));

    // DELETE remove
    let res = srv
        .client
        .delete(&url)
        .json(&json!({"fieldName": "birthday"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let removed = body(res).await;
    assert!(removed["schema"]["properties"].get("birthday").is_none());

    // Um novo GET enxerga o estado persistido
    let again = body(srv.client.get(&url).send().await.unwrap()).await;
    assert_eq!(again, removed);
}

#[tokio::test]
async fn mutations_before_seeding_are_not_found() {
    let srv = server().await;
    let url = srv.url("/api/schema/deals/fresh-tenant");

    let res = srv
        .client
        .post(&url)
        .json(&json!({"field": {"name": "x", "title": "X", "type": "text"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(res).await["error"], "schema_not_found");

    let res = srv
        .client
        .delete(&url)
        .json(&json!({"fieldName": "name"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_record_type_is_404() {
    let srv = server().await;
    let res = srv.client.get(srv.url("/api/schema/invoices/T1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let err = body(res).await;
    assert_eq!(err["error"], "unknown_record_type");
    assert!(err["message"].as_str().unwrap().contains("invoices"));
}

#[tokio::test]
async fn duplicate_and_invalid_fields_are_rejected() {
    let srv = server().await;
    let url = srv.url("/api/schema/leads/T1");
    srv.client.get(&url).send().await.unwrap();

    let res = srv
        .client
        .post(&url)
        .json(&json!({"field": {"name": "email", "title": "Other Email", "type": "email"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(body(res).await["error"], "duplicate_field");

    let res = srv
        .client
        .post(&url)
        .json(&json!({"field": {"name": "", "title": "Nameless", "type": "text"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let err = body(res).await;
    assert_eq!(err["error"], "validation_error");
    assert!(err["details"]["field"].is_object());

    let res = srv
        .client
        .post(&url)
        .json(&json!({"field": {"name": "mood", "title": "Mood", "type": "hologram"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body(res).await["error"], "invalid_field");
}

#[tokio::test]
async fn malformed_body_is_a_transport_error() {
    let srv = server().await;
    let url = srv.url("/api/schema/contacts/T1");
    srv.client.get(&url).send().await.unwrap();

    let res = srv
        .client
        .post(&url)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(res).await["error"], "transport_error");
}

#[tokio::test]
async fn errors_follow_accept_language() {
    let srv = server().await;
    let res = srv
        .client
        .post(srv.url("/api/schema/companies/T1"))
        .header("accept-language", "pt-BR,pt;q=0.9")
        .json(&json!({"field": {"name": "x", "title": "X", "type": "text"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let err = body(res).await;
    assert_eq!(err["error"], "schema_not_found");
    assert!(err["message"].as_str().unwrap().starts_with("Schema de 'companies'"));
}

#[tokio::test]
async fn required_field_added_once_and_removed_cleanly() {
    let srv = server().await;
    let url = srv.url("/api/schema/deals/T1");
    srv.client.get(&url).send().await.unwrap();

    let field = json!({"field": {"name": "owner", "title": "Owner", "type": "text", "required": true}});
    let first = srv.client.post(&url).json(&field).send().await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let second = srv.client.post(&url).json(&field).send().await.unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);

    let current = body(srv.client.get(&url).send().await.unwrap()).await;
    assert_eq!(current["schema"]["required"], json!(["id", "name", "amount", "owner"]));

    let removed = body(
        srv.client
            .delete(&url)
            .json(&json!({"fieldName": "owner"}))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(removed["schema"]["required"], json!(["id", "name", "amount"]));

    // Remover de novo é no-op
    let res = srv
        .client
        .delete(&url)
        .json(&json!({"fieldName": "owner"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn select_options_and_defaults() {
    let srv = server().await;
    let url = srv.url("/api/schema/contacts/T1");
    srv.client.get(&url).send().await.unwrap();

    let added = body(
        srv.client
            .post(&url)
            .json(&json!({"field": {"name": "tier", "title": "Tier", "type": "select"}}))
            .send()
            .await
            .unwrap(),
    )
    .await;
    // Select recém-criado não tem opções, então não vai `enum` no fio
    assert_eq!(added["schema"]["properties"]["tier"], json!({"type": "string", "title": "Tier"}));

    let res = srv
        .client
        .put(srv.url("/api/schema/contacts/T1/fields/tier/options"))
        .json(&json!({"options": ["Gold", "Silver"], "default": "Gold"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated = body(res).await;
    assert_eq!(updated["schema"]["properties"]["tier"]["enum"], json!(["Gold", "Silver"]));

    let defaults = body(
        srv.client
            .get(srv.url("/api/schema/contacts/T1/defaults"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(defaults, json!({"defaults": {"status": "Active", "tier": "Gold"}}));

    // Select novo não aceita default antes de ter opções
    let res = srv
        .client
        .post(&url)
        .json(&json!({"field": {"name": "plan", "title": "Plan", "type": "select", "default": "Pro"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body(res).await["error"], "invalid_field");
}

#[tokio::test]
async fn tenants_are_isolated() {
    let srv = server().await;
    let t1 = srv.url("/api/schema/contacts/T1");
    let t2 = srv.url("/api/schema/contacts/T2");
    srv.client.get(&t1).send().await.unwrap();
    srv.client.get(&t2).send().await.unwrap();

    srv.client
        .delete(&t1)
        .json(&json!({"fieldName": "phone"}))
        .send()
        .await
        .unwrap();

    let other = body(srv.client.get(&t2).send().await.unwrap()).await;
    assert!(other["schema"]["properties"].get("phone").is_some());
}

#[tokio::test]
async fn openapi_document_is_served() {
    let srv = server().await;
    let res = srv.client.get(srv.url("/api-docs/openapi.json")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let doc = body(res).await;
    assert!(doc["paths"]["/api/schema/{recordType}/{tenantId}"].is_object());

    let health = srv.client.get(srv.url("/api/health")).send().await.unwrap();
    assert_eq!(health.text().await.unwrap(), "OK");
}
