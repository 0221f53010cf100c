pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::capture::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/", get(health::root_handler))
        .route("/session", post(handlers::handle_create_session))
        .route("/responses", post(handlers::handle_store_response))
        // Singular alias kept for older clients
        .route("/response", post(handlers::handle_store_response_alias))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use chrono::DateTime;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::store::canonical::{canonical_json, sha256_hex};
    use crate::store::{JsonStore, StoreConfig};

    async fn test_app() -> (TempDir, Router) {
        let tmp = TempDir::new().unwrap();
        let store = JsonStore::new(StoreConfig::under(tmp.path()));
        store.init().await.unwrap();
        (tmp, build_router(AppState { store }))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn stored_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    fn response_body() -> Value {
        json!({
            "session_id": "s-42",
            "respondent_id": "resp-7",
            "answers": {"would_pay": true, "price": 19.5, "pain": "manual exports"},
            "meta": {"source": "landing"}
        })
    }

    #[tokio::test]
    async fn test_health_reports_ok_with_utc_time() {
        let (_tmp, app) = test_app().await;
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "verity-backend");
        assert!(DateTime::parse_from_rfc3339(body["time"].as_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_root_returns_message() {
        let (_tmp, app) = test_app().await;
        let (status, body) = send(&app, "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_create_session_writes_file() {
        let (tmp, app) = test_app().await;
        let (status, body) = send(
            &app,
            "POST",
            "/session",
            Some(json!({"founder_inputs": {"idea_summary": "A", "target_user": "B", "problems": ["p1"]}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let session_id: Uuid = body["session_id"].as_str().unwrap().parse().unwrap();

        let dir = tmp.path().join("sessions");
        let files = stored_files(&dir);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with(&format!("_{session_id}.json")));
        assert_eq!(files[0].len(), "20240101T000000Z_".len() + 36 + ".json".len());

        let record = read_json(&dir.join(&files[0]));
        assert_eq!(record["session_id"], session_id.to_string());
        assert_eq!(record["founder_inputs"]["problems"], json!(["p1"]));
        assert_eq!(record["founder_inputs"]["value_prop"], Value::Null);
        assert_eq!(record["version"], "v0");
    }

    #[tokio::test]
    async fn test_empty_problems_rejected_without_write() {
        let (tmp, app) = test_app().await;
        let (status, body) = send(
            &app,
            "POST",
            "/session",
            Some(json!({"founder_inputs": {"idea_summary": "x", "target_user": "y", "problems": []}})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["detail"][0]["loc"], "body.founder_inputs.problems");
        assert!(stored_files(&tmp.path().join("sessions")).is_empty());
    }

    #[tokio::test]
    async fn test_missing_field_rejected_without_write() {
        let (tmp, app) = test_app().await;
        let (status, body) = send(
            &app,
            "POST",
            "/responses",
            Some(json!({"session_id": "s", "answers": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["detail"][0]["loc"], "body");
        assert!(stored_files(&tmp.path().join("responses")).is_empty());
    }

    #[tokio::test]
    async fn test_answers_must_be_object() {
        let (_tmp, app) = test_app().await;
        let (status, _) = send(
            &app,
            "POST",
            "/responses",
            Some(json!({"session_id": "s", "respondent_id": "r", "answers": [1, 2]})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_store_response_hash_is_canonical_digest() {
        let (tmp, app) = test_app().await;
        let (status, body) = send(&app, "POST", "/responses", Some(response_body())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);

        let expected = sha256_hex(&canonical_json(&response_body()).unwrap());
        assert_eq!(body["hash"], expected);

        let file = body["file"].as_str().unwrap();
        assert!(file.ends_with(&format!("_s-42_resp-7_{}.json", &expected[..12])));

        let record = read_json(&tmp.path().join("responses").join(file));
        assert_eq!(record["hash_sha256"], expected);
        assert_eq!(record["payload"], response_body());
        assert_eq!(record["version"], "v0");
        assert!(record["received_at_utc"].is_string());
    }

    #[tokio::test]
    async fn test_absent_meta_hashes_as_null() {
        let (_tmp, app) = test_app().await;
        let body = json!({"session_id": "s", "respondent_id": "r", "answers": {"q": 1}});
        let (_, ack) = send(&app, "POST", "/responses", Some(body)).await;

        let with_null = json!({"session_id": "s", "respondent_id": "r", "answers": {"q": 1}, "meta": null});
        assert_eq!(ack["hash"], sha256_hex(&canonical_json(&with_null).unwrap()));
    }

    #[tokio::test]
    async fn test_alias_matches_plural_route() {
        let (tmp, app) = test_app().await;
        let dir = tmp.path().join("responses");

        let (plural_status, plural) = send(&app, "POST", "/responses", Some(response_body())).await;
        assert_eq!(plural_status, StatusCode::OK);
        let plural_path = dir.join(plural["file"].as_str().unwrap());
        let plural_record = read_json(&plural_path);

        // Both requests can land in the same second and share a file name;
        // clear the first record so the alias must write its own.
        std::fs::remove_file(&plural_path).unwrap();
        assert!(stored_files(&dir).is_empty());

        let (alias_status, alias) = send(&app, "POST", "/response", Some(response_body())).await;
        assert_eq!(alias_status, StatusCode::OK);
        assert_eq!(stored_files(&dir), vec![alias["file"].as_str().unwrap().to_string()]);
        let alias_record = read_json(&dir.join(alias["file"].as_str().unwrap()));

        assert_eq!(plural["hash"], alias["hash"]);
        assert_eq!(plural_record["payload"], alias_record["payload"]);
        assert_eq!(plural_record["hash_sha256"], alias_record["hash_sha256"]);
        assert_eq!(alias_record["payload"], response_body());
    }

    #[tokio::test]
    async fn test_decimal_answers_stored_and_hashed_as_sent() {
        let (tmp, app) = test_app().await;
        let body: Value = serde_json::from_str(
            r#"{"session_id": "s", "respondent_id": "r", "answers": {"x": 1.3109643126234887, "y": -1.5e-300}}"#,
        )
        .unwrap();
        let (status, ack) = send(&app, "POST", "/responses", Some(body)).await;
        assert_eq!(status, StatusCode::OK);

        // json.dumps(payload, sort_keys=True) of the same request
        let canonical = r#"{"answers": {"x": 1.3109643126234887, "y": -1.5e-300}, "meta": null, "respondent_id": "r", "session_id": "s"}"#;
        assert_eq!(ack["hash"], sha256_hex(canonical.as_bytes()));
        assert_eq!(
            ack["hash"],
            "8f19499fa73a871ae5cffe7e1d6befded69858c3ae43a857e934d16e731ae92f"
        );

        let text =
            std::fs::read_to_string(tmp.path().join("responses").join(ack["file"].as_str().unwrap()))
                .unwrap();
        assert!(text.contains(r#""x": 1.3109643126234887"#));
        assert!(text.contains(r#""y": -1.5e-300"#));
    }

    #[tokio::test]
    async fn test_nested_shape_error_reports_field_path() {
        let (_tmp, app) = test_app().await;
        let (status, body) = send(
            &app,
            "POST",
            "/session",
            Some(json!({"founder_inputs": {"idea_summary": "A", "problems": ["p1"]}})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["detail"][0]["loc"], "body.founder_inputs");
        assert!(body["error"]["detail"][0]["msg"]
            .as_str()
            .unwrap()
            .contains("target_user"));
    }

    #[tokio::test]
    async fn test_storage_failure_is_server_error() {
        let tmp = TempDir::new().unwrap();
        // Directories never created, so the write fails.
        let store = JsonStore::new(StoreConfig::under(&tmp.path().join("missing")));
        let app = build_router(AppState { store });
        let (status, body) = send(&app, "POST", "/responses", Some(response_body())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "STORAGE_ERROR");
    }
}
