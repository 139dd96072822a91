//! HTTP contract tests over the in-memory store.

use std::sync::Arc;

use axum::body::Body;
use http_body_util::BodyExt;
use hyper::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use contacts_core::memory::MemoryStore;
use contacts_core::service::{ContactService, ContactServiceImpl};
use contacts_server::router::build_router;

fn app() -> axum::Router {
    let service: Arc<dyn ContactService> =
        Arc::new(ContactServiceImpl::new(Arc::new(MemoryStore::seeded())));
    build_router(service)
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or_else(
        |_| json!({ "raw": String::from_utf8_lossy(&bytes).to_string() }),
    )
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    (status, body_json(resp).await)
}

fn juan() -> Value {
    json!({
        "firstName": "Juan",
        "lastName": "Pérez",
        "dateOfBirth": "15/03/1990",
        "email": "juan@example.com",
        "phones": [{ "number": "600111222", "typeName": "mobile" }],
        "addresses": [{ "locality": "Madrid", "street": "Gran Vía", "number": "1" }]
    })
}

async fn create_juan(app: &axum::Router) -> i64 {
    let (status, body) = send(app, "POST", "/persons", Some(juan())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let (status, body) = send(&app(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn create_then_duplicate_email_conflicts() {
    let app = app();
    let (status, body) = send(&app, "POST", "/persons", Some(juan())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["firstName"], "Juan");
    assert_eq!(body["dateOfBirth"], "15/03/1990");
    assert_eq!(body["phones"][0]["phoneType"]["typeName"], "mobile");
    assert_eq!(body["addresses"][0]["locality"], "Madrid");

    let (status, body) = send(&app, "POST", "/persons", Some(juan())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn create_reports_every_invalid_field() {
    let (status, body) = send(
        &app(),
        "POST",
        "/persons",
        Some(json!({
            "firstName": "",
            "lastName": "Pérez",
            "dateOfBirth": "1990-03-15",
            "email": "not-an-email"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"firstName"));
    assert!(fields.contains(&"dateOfBirth"));
    assert!(fields.contains(&"email"));
    assert!(!fields.contains(&"lastName"));
}

#[tokio::test]
async fn unknown_phone_type_is_foreign_key() {
    let mut body = juan();
    body["phones"] = json!([{ "number": "600111222", "typeName": "pager" }]);
    let (status, resp) = send(&app(), "POST", "/persons", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["error"], "foreign_key");
}

#[tokio::test]
async fn malformed_json_is_validation_error() {
    let app = app();
    let req = Request::builder()
        .method("POST")
        .uri("/persons")
        .header("content-type", "application/json")
        .body(Body::from("{\"firstName\": "))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "validation_error");
}

#[tokio::test]
async fn search_without_criteria_is_rejected() {
    let app = app();
    for uri in ["/persons/search", "/persons/search?q=", "/persons/search?unknown=1"] {
        let (status, body) = send(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"], "validation_error");
    }
}

#[tokio::test]
async fn search_by_free_text_and_fields() {
    let app = app();
    let id = create_juan(&app).await;

    let (status, body) = send(&app, "GET", "/persons/search?q=ua", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], id);

    // case-sensitive contains
    let (_, body) = send(&app, "GET", "/persons/search?q=JUAN", None).await;
    assert!(body.as_array().unwrap().is_empty());

    let (_, body) = send(&app, "GET", "/persons/search?q=111", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = send(
        &app,
        "GET",
        "/persons/search?lastName=P%C3%A9r&dateOfBirth=15/03/1990",
        None,
    )
    .await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = send(&app, "GET", "/persons/search?phone=600&phoneType=fax", None).await;
    assert!(body.as_array().unwrap().is_empty());

    let (status, body) = send(&app, "GET", "/persons/search?dateOfBirth=1990-03-15", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "dateOfBirth");
}

#[tokio::test]
async fn free_text_search_still_checks_birth_date() {
    let app = app();
    create_juan(&app).await;

    let (status, body) = send(
        &app,
        "GET",
        "/persons/search?q=Juan&dateOfBirth=garbage",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0]["field"], "dateOfBirth");

    let (status, body) = send(
        &app,
        "GET",
        "/persons/search?q=Juan&dateOfBirth=01/01/2000",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn update_person_fields() {
    let app = app();
    let id = create_juan(&app).await;

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/persons/{id}"),
        Some(json!({ "firstName": "Juana" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["firstName"], "Juana");
    assert_eq!(body["lastName"], "Pérez");

    let (status, _) = send(&app, "PUT", "/persons/999999", Some(json!({ "firstName": "X" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/persons/{id}"),
        Some(json!({ "email": "broken" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "email");
}

#[tokio::test]
async fn delete_then_get_is_not_found() {
    let app = app();
    let id = create_juan(&app).await;
    let uri = format!("/persons/{id}");

    let (status, _) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(Request::builder().method("DELETE").uri(&uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_numeric_id_is_validation_error() {
    let (status, body) = send(&app(), "GET", "/persons/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "id");
}

#[tokio::test]
async fn activities_log_and_search_newest_first() {
    let app = app();
    let id = create_juan(&app).await;

    for (kind, date) in [
        ("call", "01/02/2024 10:00:00"),
        ("meeting", "20/12/2024 09:30:00"),
        ("email", "15/01/2024 18:45:00"),
    ] {
        let (status, body) = send(
            &app,
            "POST",
            "/activities",
            Some(json!({
                "personId": id,
                "activityType": kind,
                "activityDate": date,
                "description": "follow-up"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["activityType"], kind);
    }

    let (status, body) = send(&app, "GET", &format!("/activities/search?personId={id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let dates: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["activityDate"].as_str().unwrap())
        .collect();
    assert_eq!(
        dates,
        ["20/12/2024 09:30:00", "01/02/2024 10:00:00", "15/01/2024 18:45:00"]
    );
    assert_eq!(body[0]["person"]["email"], "juan@example.com");

    let (_, body) = send(
        &app,
        "GET",
        &format!("/activities/search?personId={id}&activityType=call"),
        None,
    )
    .await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn activities_for_unknown_person() {
    let app = app();
    let (status, body) = send(&app, "GET", "/activities/search?personId=999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = send(
        &app,
        "POST",
        "/activities",
        Some(json!({
            "personId": 999,
            "activityType": "call",
            "activityDate": "01/02/2024 10:00:00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn activity_payload_is_validated() {
    let app = app();
    let id = create_juan(&app).await;
    let (status, body) = send(
        &app,
        "POST",
        "/activities",
        Some(json!({
            "personId": id,
            "activityType": "visit",
            "activityDate": "2024-02-01"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"].as_array().unwrap().len(), 2);

    let (status, _) = send(&app, "GET", "/activities/search?personId=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn phone_types_catalogue() {
    let app = app();
    let (status, body) = send(&app, "GET", "/phone-types", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["typeName"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["fax", "home", "mobile", "other", "work"]);

    let (status, body) = send(&app, "POST", "/phone-types", Some(json!({ "typeName": "pager" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let pager_id = body["id"].as_i64().unwrap();

    let (status, _) = send(&app, "POST", "/phone-types", Some(json!({ "typeName": "mobile" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "POST", "/phone-types", Some(json!({ "typeName": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "DELETE", &format!("/phone-types/{pager_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", &format!("/phone-types/{pager_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn referenced_phone_type_cannot_be_deleted() {
    let app = app();
    create_juan(&app).await;
    let (_, types) = send(&app, "GET", "/phone-types", None).await;
    let mobile = types
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["typeName"] == "mobile")
        .unwrap()["id"]
        .as_i64()
        .unwrap();
    let (status, body) = send(&app, "DELETE", &format!("/phone-types/{mobile}"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let (status, body) = send(&app(), "GET", "/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}
