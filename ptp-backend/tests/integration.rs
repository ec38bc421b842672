use axum::{
    body::{self, Body},
    http::{header, Request, StatusCode},
    Router,
};
use std::{path::Path, time::Duration};

use ptp_backend::{app_router, AppState, PumpStore, StoreError};
use ptp_test_fixtures::{CREATOR, PARTICIPANT, SECOND_PARTICIPANT};
use serde_json::{json, Value};
use tower::util::ServiceExt;

const BODY_LIMIT: usize = usize::MAX;

fn test_app() -> Router {
    app_router(AppState::in_memory())
}

/// Open a sled store that another handle just released; the file lock can
/// outlive the drop briefly.
async fn reopen_store(path: &Path) -> PumpStore {
    let mut attempts = 0;
    loop {
        match PumpStore::persistent(path) {
            Ok(store) => return store,
            Err(StoreError::Db(_)) if attempts < 100 => {
                attempts += 1;
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            Err(err) => panic!("failed to reopen pump db: {err}"),
        }
    }
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), BODY_LIMIT)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

async fn create_launch(app: &Router, name: &str) -> Value {
    let (status, pump) = send(
        app,
        json_request(
            "POST",
            "/api/pumps",
            json!({ "name": name, "creator": CREATOR, "requiredEth": 0.01 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    pump
}

#[tokio::test]
async fn liveness_and_health() {
    let app = test_app();

    let (status, body) = send(&app, get_request("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("Hello World".into()));

    let (status, body) = send(&app, get_request("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn create_then_list_shows_empty_participants() {
    let app = test_app();
    let created = create_launch(&app, "Launch").await;

    assert_eq!(created["name"], "Launch");
    assert_eq!(created["creator"], CREATOR);
    assert_eq!(created["requiredEth"], "0.01");
    assert_eq!(created["participants"], json!([]));
    assert!(created["id"].as_str().is_some());
    assert!(created["createdAt"].as_str().is_some());

    let (status, listed) = send(&app, get_request("/api/pumps")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0], created);
}

#[tokio::test]
async fn list_is_newest_first() {
    let app = test_app();
    create_launch(&app, "first").await;
    create_launch(&app, "second").await;
    create_launch(&app, "third").await;

    let (_, listed) = send(&app, get_request("/api/pumps")).await;
    let names: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|pump| pump["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["third", "second", "first"]);
}

#[tokio::test]
async fn create_accepts_description_and_string_amount() {
    let app = test_app();
    let (status, pump) = send(
        &app,
        json_request(
            "POST",
            "/api/pumps",
            json!({
                "name": "  Described ",
                "description": "for whales",
                "creator": CREATOR.to_uppercase().replacen("0X", "0x", 1),
                "requiredEth": "1.5"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(pump["name"], "Described");
    assert_eq!(pump["description"], "for whales");
    assert_eq!(pump["creator"], CREATOR);
    assert_eq!(pump["requiredEth"], "1.5");
}

#[tokio::test]
async fn create_rejects_invalid_input() {
    let app = test_app();
    let cases = [
        json!({ "name": "", "creator": CREATOR, "requiredEth": 0.01 }),
        json!({ "name": "   ", "creator": CREATOR, "requiredEth": 0.01 }),
        json!({ "creator": CREATOR, "requiredEth": 0.01 }),
        json!({ "name": "Launch", "creator": CREATOR, "requiredEth": 0 }),
        json!({ "name": "Launch", "creator": CREATOR, "requiredEth": -1 }),
        json!({ "name": "Launch", "creator": CREATOR, "requiredEth": "lots" }),
        json!({ "name": "Launch", "creator": CREATOR }),
        json!({ "name": "Launch", "creator": "0x1234", "requiredEth": 0.01 }),
        json!({ "name": "Launch", "requiredEth": 0.01 }),
    ];

    for body in cases {
        let (status, error) = send(&app, json_request("POST", "/api/pumps", body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
        assert_eq!(error["code"], "VALIDATION_ERROR", "body {body}");
        assert!(error["message"].as_str().is_some());
    }

    let (_, listed) = send(&app, get_request("/api/pumps")).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/pumps")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, error) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "INVALID_JSON");
}

#[tokio::test]
async fn add_participant_is_idempotent() {
    let app = test_app();
    let pump = create_launch(&app, "Launch").await;
    let uri = format!("/api/pumps/{}/participants", pump["id"].as_str().unwrap());

    let (status, updated) = send(
        &app,
        json_request("POST", &uri, json!({ "participant": PARTICIPANT })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["participants"], json!([PARTICIPANT]));

    let (status, again) = send(
        &app,
        json_request("POST", &uri, json!({ "participant": PARTICIPANT.to_uppercase().replacen("0X", "0x", 1) })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["participants"], json!([PARTICIPANT]));

    let (_, second) = send(
        &app,
        json_request("POST", &uri, json!({ "participant": SECOND_PARTICIPANT })),
    )
    .await;
    assert_eq!(second["participants"], json!([PARTICIPANT, SECOND_PARTICIPANT]));
}

#[tokio::test]
async fn add_participant_accepts_address_alias() {
    let app = test_app();
    let pump = create_launch(&app, "Launch").await;
    let uri = format!("/api/pumps/{}/participants", pump["id"].as_str().unwrap());

    let (status, updated) = send(&app, json_request("POST", &uri, json!({ "address": PARTICIPANT }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["participants"], json!([PARTICIPANT]));
}

#[tokio::test]
async fn add_participant_errors() {
    let app = test_app();
    let pump = create_launch(&app, "Launch").await;
    let uri = format!("/api/pumps/{}/participants", pump["id"].as_str().unwrap());

    let missing = format!("/api/pumps/{}/participants", uuid::Uuid::new_v4());
    let (status, error) = send(&app, json_request("POST", &missing, json!({ "participant": PARTICIPANT }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error, json!({ "message": "Pump not found", "code": "PUMP_NOT_FOUND" }));

    let (status, error) = send(
        &app,
        json_request("POST", "/api/pumps/not-a-uuid/participants", json!({ "participant": PARTICIPANT })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "VALIDATION_ERROR");

    let (status, error) = send(&app, json_request("POST", &uri, json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "VALIDATION_ERROR");

    let (status, _) = send(&app, json_request("POST", &uri, json!({ "participant": "nobody" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, fetched) = send(&app, get_request(&format!("/api/pumps/{}", pump["id"].as_str().unwrap()))).await;
    assert_eq!(fetched["participants"], json!([]));
}

#[tokio::test]
async fn get_pump_by_id() {
    let app = test_app();
    let pump = create_launch(&app, "Launch").await;

    let (status, fetched) = send(&app, get_request(&format!("/api/pumps/{}", pump["id"].as_str().unwrap()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, pump);

    let (status, _) = send(&app, get_request(&format!("/api/pumps/{}", uuid::Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let app = test_app();
    let request = Request::builder()
        .uri("/api/pumps")
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap()
            .to_str()
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn sled_backed_router_persists_between_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pumps.db");

    let pump = {
        let app = app_router(AppState::new(PumpStore::persistent(&path).unwrap()));
        let pump = create_launch(&app, "Durable").await;
        let uri = format!("/api/pumps/{}/participants", pump["id"].as_str().unwrap());
        send(&app, json_request("POST", &uri, json!({ "participant": PARTICIPANT }))).await;
        pump
    };

    let app = app_router(AppState::new(reopen_store(&path).await));
    let (_, listed) = send(&app, get_request("/api/pumps")).await;
    assert_eq!(listed[0]["id"], pump["id"]);
    assert_eq!(listed[0]["participants"], json!([PARTICIPANT]));
}
