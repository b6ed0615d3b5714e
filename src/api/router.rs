//! API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`. CORS is wide open (the frontend is
//! served separately) and the body limit is raised so realistic CSV
//! uploads fit.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Maximum upload body size (32 MB).
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Build the API router with all routes under `/api/`.
pub fn api_router(core: Arc<CoreState>) -> Router {
    let ctx = ApiContext::new(core);

    let api = Router::new()
        .route("/login", post(endpoints::auth::login))
        .route("/data/upload", post(endpoints::ingest::upload))
        .route("/data/load-url", post(endpoints::ingest::load_from_url))
        .route("/ask", post(endpoints::query::ask))
        .route("/health", get(endpoints::status::health))
        .route("/data/info", get(endpoints::status::dataset_info))
        .with_state(ctx)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive());

    Router::new().nest("/api", api)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::config::Settings;
    use crate::engine::MockEngine;

    fn test_core(engine: MockEngine) -> (Arc<CoreState>, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let settings = Settings {
            data_dir: tmp.path().to_path_buf(),
            ..Settings::default()
        };
        (
            Arc::new(CoreState::with_engine(settings, Arc::new(engine))),
            tmp,
        )
    }

    fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart_upload(uri: &str, filename: &str, content: &str) -> Request<Body> {
        let boundary = "qa-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             {content}\r\n\
             --{boundary}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn response_json(response: axum::http::Response<Body>) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let (core, _tmp) = test_core(MockEngine::new("ok"));
        let app = api_router(core);
        let response = app
            .oneshot(json_request("GET", "/api/nonexistent", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_reports_empty_store() {
        let (core, _tmp) = test_core(MockEngine::new("ok"));
        let app = api_router(core);

        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["has_data"], false);
        assert_eq!(json["version"], 0);
        assert_eq!(json["engine_bound"], false);
    }

    #[tokio::test]
    async fn login_returns_role_for_valid_credentials() {
        let (core, _tmp) = test_core(MockEngine::new("ok"));
        let app = api_router(core);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/login",
                r#"{"username":"admin","password":"admin123"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["role"], "admin");
    }

    #[tokio::test]
    async fn login_distinguishes_unknown_user_from_wrong_password() {
        let (core, _tmp) = test_core(MockEngine::new("ok"));

        let app = api_router(core.clone());
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/login",
                r#"{"username":"ghost","password":"x"}"#,
            ))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "User not found");

        let app = api_router(core);
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/login",
                r#"{"username":"admin","password":"wrong"}"#,
            ))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Invalid password");
    }

    #[tokio::test]
    async fn upload_publishes_and_promotes_header() {
        let (core, _tmp) = test_core(MockEngine::new("ok"));
        let app = api_router(core.clone());

        let response = app
            .oneshot(multipart_upload(
                "/api/data/upload",
                "sales.csv",
                "a,b\n1,2\n3,4\n",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["version"], 1);
        assert_eq!(json["rows"], 1);
        assert_eq!(json["columns"], 2);
        assert!(json["slot_path"]
            .as_str()
            .unwrap()
            .ends_with("dataset.csv"));

        // Promoted header is visible through the metadata surface
        let app = api_router(core);
        let response = app
            .oneshot(Request::get("/api/data/info").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["column_names"], serde_json::json!(["1", "2"]));
        assert_eq!(json["rows"], 1);
    }

    #[tokio::test]
    async fn upload_rejects_non_csv_extension() {
        let (core, _tmp) = test_core(MockEngine::new("ok"));
        let app = api_router(core);

        let response = app
            .oneshot(multipart_upload(
                "/api/data/upload",
                "report.xlsx",
                "a,b\n1,2\n",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "FORMAT_REJECTED");
    }

    #[tokio::test]
    async fn upload_with_undecodable_body_returns_decode_failed() {
        let (core, _tmp) = test_core(MockEngine::new("ok"));
        let app = api_router(core);

        let response = app
            .oneshot(multipart_upload("/api/data/upload", "blank.csv", "   "))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "DECODE_FAILED");
    }

    #[tokio::test]
    async fn upload_without_file_field_is_bad_request() {
        let (core, _tmp) = test_core(MockEngine::new("ok"));
        let app = api_router(core);

        let boundary = "qa-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"note\"\r\n\r\n\
             hello\r\n\
             --{boundary}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/data/upload")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn load_url_rejects_bad_scheme() {
        let (core, _tmp) = test_core(MockEngine::new("ok"));
        let app = api_router(core);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/data/load-url",
                r#"{"file_url":"ftp://host/data.csv"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "FETCH_FAILED");
    }

    #[tokio::test]
    async fn ask_empty_question_returns_400_regardless_of_data() {
        let (core, _tmp) = test_core(MockEngine::new("ok"));
        let app = api_router(core);

        let response = app
            .oneshot(json_request("POST", "/api/ask", r#"{"question":"   "}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "EMPTY_QUESTION");
    }

    #[tokio::test]
    async fn ask_before_any_publish_returns_no_data() {
        let (core, _tmp) = test_core(MockEngine::new("ok"));
        let app = api_router(core);

        let response = app
            .oneshot(json_request("POST", "/api/ask", r#"{"question":"total?"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "NO_DATA");
    }

    #[tokio::test]
    async fn ask_after_bind_failure_returns_engine_unbound() {
        let (core, _tmp) = test_core(MockEngine::new("ok").failing_bind());

        // Upload succeeds even though the engine cannot bind
        let app = api_router(core.clone());
        let response = app
            .oneshot(multipart_upload(
                "/api/data/upload",
                "data.csv",
                "a,b\n1,2\n3,4\n",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Data exists but the engine is degraded
        let app = api_router(core);
        let response = app
            .oneshot(json_request("POST", "/api/ask", r#"{"question":"total?"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "ENGINE_UNBOUND");
    }

    #[tokio::test]
    async fn ask_engine_failure_returns_502() {
        let (core, _tmp) = test_core(MockEngine::new("ok").failing_answer());

        let app = api_router(core.clone());
        app.oneshot(multipart_upload(
            "/api/data/upload",
            "data.csv",
            "a,b\n1,2\n3,4\n",
        ))
        .await
        .unwrap();

        let app = api_router(core);
        let response = app
            .oneshot(json_request("POST", "/api/ask", r#"{"question":"total?"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "ENGINE_FAILURE");
    }

    #[tokio::test]
    async fn ask_returns_answer_tagged_with_version() {
        let (core, _tmp) = test_core(MockEngine::new("there is 1 row"));

        let app = api_router(core.clone());
        app.oneshot(multipart_upload(
            "/api/data/upload",
            "data.csv",
            "a,b\n1,2\n3,4\n",
        ))
        .await
        .unwrap();

        let app = api_router(core);
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/ask",
                r#"{"question":"how many rows?"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["question"], "how many rows?");
        assert_eq!(json["version"], 1);
        assert!(json["answer"]
            .as_str()
            .unwrap()
            .starts_with("there is 1 row"));
    }

    #[tokio::test]
    async fn sequential_uploads_advance_reported_version() {
        let (core, _tmp) = test_core(MockEngine::new("ok"));

        for (i, body) in ["a,b\n1,2\n3,4\n", "x,y\n5,6\n7,8\n"].iter().enumerate() {
            let app = api_router(core.clone());
            let response = app
                .oneshot(multipart_upload("/api/data/upload", "data.csv", body))
                .await
                .unwrap();
            let json = response_json(response).await;
            assert_eq!(json["version"], i as u64 + 1);
        }

        let app = api_router(core);
        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["version"], 2);
        assert_eq!(json["has_data"], true);
        assert_eq!(json["engine_bound"], true);
    }

    #[tokio::test]
    async fn data_info_returns_no_data_before_publish() {
        let (core, _tmp) = test_core(MockEngine::new("ok"));
        let app = api_router(core);

        let response = app
            .oneshot(Request::get("/api/data/info").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "NO_DATA");
    }
}
