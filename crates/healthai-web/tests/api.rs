use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use healthai_core::{Disease, HealthError, PasswordHasher, Result};
use healthai_database::{MemoryUserStore, UserStore};
use healthai_inference::{ChatService, DiagnosisService, ImageUpload, InferenceService, Prediction};
use healthai_web::{create_app, AppState, Metrics, AUTOSAVE_HEADER, USER_ID_HEADER};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

const BOUNDARY: &str = "healthai-test-boundary";

struct StubInference {
    fail: bool,
}

#[async_trait]
impl InferenceService for StubInference {
    async fn predict(&self, disease: Disease, image: ImageUpload) -> Result<Prediction> {
        if self.fail {
            return Err(HealthError::Upstream {
                message: "prediction service returned 500".to_string(),
                details: Some(json!({ "error": "model not loaded" })),
            });
        }
        assert!(!image.bytes.is_empty());
        let label = match disease {
            Disease::Alzheimer => "Mild Demented",
            Disease::Tumor => "Tumor Detected",
            Disease::Parkinsons => "No Parkinson's",
        };
        Ok(Prediction::from_response(json!({
            "class": label,
            "confidence": 0.93
        })))
    }
}

struct StubChat;

#[async_trait]
impl ChatService for StubChat {
    async fn symptom_reply(&self, symptom: &str) -> Result<String> {
        if symptom == "fail" {
            return Err(HealthError::Upstream {
                message: "chat down".to_string(),
                details: None,
            });
        }
        Ok(format!("Rest and hydrate ({})", symptom))
    }
}

struct StubDiagnosis;

#[async_trait]
impl DiagnosisService for StubDiagnosis {
    async fn diagnose(&self, symptoms: Value) -> Result<Value> {
        Ok(json!(format!("Possible flu for {}", symptoms)))
    }
}

struct TestApp {
    router: Router,
    store: MemoryUserStore,
    metrics: Arc<Metrics>,
}

fn app_with(fail_inference: bool) -> TestApp {
    let store = MemoryUserStore::new();
    let metrics = Arc::new(Metrics::new().unwrap());
    let state = AppState::new(
        Arc::new(store.clone()),
        PasswordHasher::new(1_000),
        Arc::new(StubInference {
            fail: fail_inference,
        }),
        Arc::new(StubChat),
        Arc::new(StubDiagnosis),
        metrics.clone(),
    );

    TestApp {
        router: create_app(state, 1024 * 1024),
        store,
        metrics,
    }
}

fn app() -> TestApp {
    app_with(false)
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn multipart_body(field: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"scan.png\"\r\n",
            field
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn predict_request(uri: &str, user_id: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(id) = user_id {
        builder = builder.header(USER_ID_HEADER, id);
    }
    builder.body(Body::from(body)).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn signup(router: &Router, email: &str) -> String {
    let (status, body) = send(
        router,
        json_request(
            Method::POST,
            "/api/auth/signup",
            json!({
                "name": "Asha",
                "email": email,
                "password": "secret",
                "age": "20",
                "gender": "Male"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["userId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_signup_then_dashboard_has_defaults() {
    let app = app();
    let id = signup(&app.router, "asha@uni.edu").await;

    let (status, body) = send(
        &app.router,
        Request::get(format!("/api/dashboard/user/{}", id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Asha");
    assert_eq!(body["age"], 20);
    assert_eq!(body["gender"], "Male");
    assert_eq!(body["vitals"], json!({ "hr": 75, "spo2": 98, "temp": 98.6 }));
    assert_eq!(body["testResults"], json!([]));
    assert!(body.get("passwordHash").is_none());
}

#[tokio::test]
async fn test_login_returns_signup_id() {
    let app = app();
    let id = signup(&app.router, "asha@uni.edu").await;

    let (status, body) = send(
        &app.router,
        json_request(
            Method::POST,
            "/api/auth/login",
            json!({ "email": "asha@uni.edu", "password": "secret" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["userId"], id);
    assert_eq!(body["redirect"], "/");
}

#[tokio::test]
async fn test_duplicate_signup_rejected() {
    let app = app();
    signup(&app.router, "asha@uni.edu").await;

    let (status, body) = send(
        &app.router,
        json_request(
            Method::POST,
            "/api/auth/signup",
            json!({
                "name": "Other",
                "email": "asha@uni.edu",
                "password": "x",
                "age": 22,
                "gender": "Female"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User already exists");
    assert_eq!(app.store.len().await, 1);
}

#[tokio::test]
async fn test_signup_accepts_whole_number_float_age() {
    let app = app();
    let (status, body) = send(
        &app.router,
        json_request(
            Method::POST,
            "/api/auth/signup",
            json!({
                "name": "Ravi",
                "email": "ravi@uni.edu",
                "password": "secret",
                "age": 21.0,
                "gender": "Male"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let id = Uuid::parse_str(body["userId"].as_str().unwrap()).unwrap();
    let user = app.store.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(user.age, Some(21));
}

#[tokio::test]
async fn test_signup_missing_fields() {
    let app = app();
    let (status, body) = send(
        &app.router,
        json_request(
            Method::POST,
            "/api/auth/signup",
            json!({ "name": "A", "email": "a@x.com", "password": "p" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "All fields are required");
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_login_failures_share_message() {
    let app = app();
    signup(&app.router, "asha@uni.edu").await;

    let (wrong_status, wrong) = send(
        &app.router,
        json_request(
            Method::POST,
            "/api/auth/login",
            json!({ "email": "asha@uni.edu", "password": "nope" }),
        ),
    )
    .await;
    let (unknown_status, unknown) = send(
        &app.router,
        json_request(
            Method::POST,
            "/api/auth/login",
            json!({ "email": "ghost@uni.edu", "password": "secret" }),
        ),
    )
    .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong["error"], unknown["error"]);
}

#[tokio::test]
async fn test_login_requires_credentials() {
    let app = app();
    let (status, body) = send(
        &app.router,
        json_request(Method::POST, "/api/auth/login", json!({ "email": "a@x.com" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email and password required");
}

#[tokio::test]
async fn test_predict_without_file() {
    let app = app();

    let (status, body) = send(
        &app.router,
        predict_request("/api/predict/tumor", None, multipart_body("other", b"data")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No image file provided");

    let (status, body) = send(
        &app.router,
        json_request(Method::POST, "/api/predict/tumor", json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No image file provided");
}

#[tokio::test]
async fn test_predict_unknown_disease() {
    let app = app();
    let (status, _) = send(
        &app.router,
        predict_request("/api/predict/flu", None, multipart_body("image", b"png")),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_predict_anonymous_skips_autosave() {
    let app = app();
    let response = app
        .router
        .clone()
        .oneshot(predict_request(
            "/api/predict/alzheimer",
            None,
            multipart_body("image", b"png"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[AUTOSAVE_HEADER], "skipped");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["class"], "Mild Demented");
    assert_eq!(body["confidence"], 0.93);
    assert_eq!(body["severity"], "Moderate");
}

#[tokio::test]
async fn test_predict_autosaves_for_caller() {
    let app = app();
    let id = signup(&app.router, "asha@uni.edu").await;

    let response = app
        .router
        .clone()
        .oneshot(predict_request(
            "/api/predict/tumor",
            Some(&id),
            multipart_body("image", b"png"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[AUTOSAVE_HEADER], "saved");

    let user = app
        .store
        .find_by_id(&Uuid::parse_str(&id).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.test_results.len(), 1);
    let saved = &user.test_results[0];
    assert_eq!(saved.test_type, "tumor");
    assert_eq!(saved.result, "Tumor Detected");
    assert_eq!(saved.confidence, Some(0.93));
    let last_scan = user.last_scan.unwrap();
    assert_eq!(last_scan.name, "tumor");
    assert_eq!(last_scan.status, "Tumor Detected");
    assert_eq!(app.metrics.autosave_count("saved"), 1);
}

#[tokio::test]
async fn test_predict_autosaves_via_query_user_id() {
    let app = app();
    let id = signup(&app.router, "asha@uni.edu").await;
    let uri = format!("/api/predict/alzheimer?userId={}", id);

    // 仅查询参数，以及空请求头加查询参数
    for header in [None, Some("")] {
        let response = app
            .router
            .clone()
            .oneshot(predict_request(&uri, header, multipart_body("image", b"png")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[AUTOSAVE_HEADER], "saved");
    }

    let user = app
        .store
        .find_by_id(&Uuid::parse_str(&id).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.test_results.len(), 2);
    assert_eq!(user.last_scan.unwrap().status, "Mild Demented");
    assert_eq!(app.metrics.autosave_count("saved"), 2);
}

#[tokio::test]
async fn test_predict_autosave_unknown_user_still_returns_prediction() {
    let app = app();
    let unknown = Uuid::new_v4().to_string();

    let response = app
        .router
        .clone()
        .oneshot(predict_request(
            &format!("/api/predict/parkinsons?userId={}", unknown),
            None,
            multipart_body("image", b"png"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[AUTOSAVE_HEADER], "user_not_found");
    assert_eq!(app.metrics.autosave_count("user_not_found"), 1);
}

#[tokio::test]
async fn test_predict_upstream_failure() {
    let app = app_with(true);
    let (status, body) = send(
        &app.router,
        predict_request("/api/predict/tumor", None, multipart_body("image", b"png")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Failed to process Tumor prediction");
    assert_eq!(body["details"], json!({ "error": "model not loaded" }));
}

#[tokio::test]
async fn test_add_and_list_test_results() {
    let app = app();
    let id = signup(&app.router, "asha@uni.edu").await;

    let (status, body) = send(
        &app.router,
        json_request(
            Method::POST,
            &format!("/api/dashboard/user/{}/test-result", id),
            json!({ "testType": "alzheimer", "result": "Non Demented", "confidence": 0.8 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Test result added successfully");
    assert_eq!(body["testResults"].as_array().unwrap().len(), 1);
    assert_eq!(body["testResults"][0]["severity"], "Low");

    let (status, body) = send(
        &app.router,
        Request::get(format!("/api/dashboard/user/{}/test-results", id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["testResults"][0]["result"], "Non Demented");

    let (_, dashboard) = send(
        &app.router,
        Request::get(format!("/api/dashboard/user/{}", id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(dashboard["lastScan"]["status"], "Non Demented");
}

#[tokio::test]
async fn test_add_test_result_requires_fields() {
    let app = app();
    let id = signup(&app.router, "asha@uni.edu").await;

    let (status, _) = send(
        &app.router,
        json_request(
            Method::POST,
            &format!("/api/dashboard/user/{}/test-result", id),
            json!({ "testType": "tumor" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_profile() {
    let app = app();
    let id = signup(&app.router, "asha@uni.edu").await;

    let (status, body) = send(
        &app.router,
        json_request(
            Method::PUT,
            &format!("/api/dashboard/user/{}/profile", id),
            json!({ "bloodGroup": "B+", "vitals": { "hr": 82 }, "email": "changed@x.com" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Profile updated successfully");
    assert_eq!(body["user"]["bloodGroup"], "B+");
    assert_eq!(body["user"]["vitals"]["hr"], 82);
    assert_eq!(body["user"]["email"], "asha@uni.edu");
}

#[tokio::test]
async fn test_dashboard_unknown_or_malformed_id() {
    let app = app();

    for id in [Uuid::new_v4().to_string(), "not-an-id".to_string()] {
        let (status, body) = send(
            &app.router,
            Request::get(format!("/api/dashboard/user/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], 404);
    }

    let (status, _) = send(
        &app.router,
        json_request(
            Method::PUT,
            &format!("/api/dashboard/user/{}/profile", Uuid::new_v4()),
            json!({ "name": "x" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_symptom_check() {
    let app = app();

    let (status, body) = send(
        &app.router,
        json_request(Method::POST, "/api/ai/symptom-check", json!({ "symptom": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], "Please describe your symptoms.");

    let (status, body) = send(
        &app.router,
        json_request(
            Method::POST,
            "/api/ai/symptom-check",
            json!({ "symptom": "headache" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], "Rest and hydrate (headache)");

    let (status, body) = send(
        &app.router,
        json_request(Method::POST, "/api/ai/symptom-check", json!({ "symptom": "fail" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "AI service error. Please try again later.");
}

#[tokio::test]
async fn test_process_symptoms() {
    let app = app();

    let (status, body) = send(
        &app.router,
        json_request(
            Method::POST,
            "/api/process-symptoms",
            json!({ "symptoms": ["fever", "cough"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["reply"].as_str().unwrap().contains("fever"));

    for empty in [json!({}), json!({ "symptoms": "  " }), json!({ "symptoms": [] })] {
        let (status, body) = send(
            &app.router,
            json_request(Method::POST, "/api/process-symptoms", empty),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No symptoms provided");
    }
}

#[tokio::test]
async fn test_root_health_and_metrics() {
    let app = app();

    let (status, body) = send(&app.router, Request::get("/").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "HealthAI API");

    let (status, body) = send(
        &app.router,
        Request::get("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    send(
        &app.router,
        predict_request("/api/predict/tumor", None, multipart_body("image", b"png")),
    )
    .await;
    let response = app
        .router
        .clone()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("healthai_inference_requests_total{disease=\"tumor\",status=\"ok\"} 1"));
    assert!(text.contains("healthai_autosave_total{outcome=\"skipped\"} 1"));
}
