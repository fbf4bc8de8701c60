//! HTTP request handlers

use super::types::{
    ActiveResponse, ChatRequest, ErrorResponse, ImageAttachment, ReplyResponse, SubjectInfo,
    SubjectsResponse, UploadRequest,
};
use super::AppState;
use crate::runtime::SessionStatus;
use crate::state_machine::ImageData;
use crate::subject::Subject;
use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use tower_http::set_header::SetResponseHeaderLayer;

/// Header a front end may use to pin a stable client identity
const CLIENT_ID_HEADER: &str = "x-client-id";

/// Identity used when neither the header nor the peer address is known
const FALLBACK_CLIENT_ID: &str = "default";

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(send_chat))
        .route("/api/upload-image", post(upload_image))
        .route("/api/session", get(get_session))
        .route("/api/session/active", get(get_session_active))
        .route("/api/subjects", get(list_subjects))
        .route("/version", get(get_version))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}

// ============================================================
// Request context
// ============================================================

/// Client identity: the `x-client-id` header, else the peer IP
fn client_id(headers: &HeaderMap, peer: Option<&ConnectInfo<SocketAddr>>) -> String {
    headers
        .get(CLIENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|ConnectInfo(addr)| addr.ip().to_string()))
        .unwrap_or_else(|| FALLBACK_CLIENT_ID.to_string())
}

/// Subject of the page that sent the request, from its `Referer`
fn subject_from_headers(headers: &HeaderMap) -> Subject {
    headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|referer| referer.parse::<Uri>().ok())
        .map_or(Subject::Math, |uri| Subject::from_page_path(uri.path()))
}

fn decode_image(image: Option<ImageAttachment>) -> Result<Option<ImageData>, AppError> {
    image
        .map(ImageAttachment::into_image_data)
        .transpose()
        .map_err(AppError::BadRequest)
}

// ============================================================
// Tutoring
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ReplyResponse>, AppError> {
    let client_id = client_id(&headers, peer.as_ref());
    let subject = req.subject.unwrap_or_else(|| subject_from_headers(&headers));
    let image = decode_image(req.image)?;

    let reply = state
        .runtime
        .handle_message(&client_id, subject, &req.message, image)
        .await;
    Ok(Json(ReplyResponse { reply }))
}

async fn upload_image(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(req): Json<UploadRequest>,
) -> Result<Json<ReplyResponse>, AppError> {
    let client_id = client_id(&headers, peer.as_ref());
    let subject = req.subject.unwrap_or_else(|| subject_from_headers(&headers));
    let image = decode_image(req.image)?;

    let reply = state
        .runtime
        .handle_upload(&client_id, subject, req.prompt.trim(), image)
        .await;
    Ok(Json(ReplyResponse { reply }))
}

async fn get_session(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Json<SessionStatus> {
    let client_id = client_id(&headers, peer.as_ref());
    Json(state.runtime.session_status(&client_id).await)
}

async fn get_session_active(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Json<ActiveResponse> {
    let client_id = client_id(&headers, peer.as_ref());
    Json(ActiveResponse {
        active: state.runtime.has_active_session(&client_id).await,
    })
}

async fn list_subjects() -> Json<SubjectsResponse> {
    Json(SubjectsResponse {
        subjects: Subject::ALL
            .iter()
            .map(|&subject| SubjectInfo {
                id: subject,
                name: subject.display_name(),
            })
            .collect(),
    })
}

async fn get_version(State(state): State<AppState>) -> String {
    format!(
        "harold-tutor {} ({})",
        env!("CARGO_PKG_VERSION"),
        state.runtime.model_id()
    )
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::MockLlmClient;
    use crate::runtime::{EvictionPolicy, LlmClient, MemoryStorage, Storage, TutorRuntime};
    use crate::verifier::StepVerifier;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> (Router, Arc<MockLlmClient>) {
        let llm = Arc::new(MockLlmClient::new("mock"));
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new(EvictionPolicy::default(), 12));
        let client: Arc<dyn LlmClient> = Arc::clone(&llm) as Arc<dyn LlmClient>;
        let runtime = TutorRuntime::new(storage, client, StepVerifier::default());
        (create_router(AppState::new(runtime)), llm)
    }

    fn post_json(uri: &str, body: &Value, referer: Option<&str>) -> Request<Body> {
        let mut builder = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header(CLIENT_ID_HEADER, "tester");
        if let Some(referer) = referer {
            builder = builder.header(header::REFERER, referer);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_client_id_prefers_header() {
        let mut headers = HeaderMap::new();
        let peer = ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 4000)));
        assert_eq!(client_id(&headers, Some(&peer)), "10.0.0.7");
        assert_eq!(client_id(&headers, None), "default");

        headers.insert(CLIENT_ID_HEADER, HeaderValue::from_static("abc"));
        assert_eq!(client_id(&headers, Some(&peer)), "abc");
    }

    #[test]
    fn test_subject_from_referer() {
        let mut headers = HeaderMap::new();
        assert_eq!(subject_from_headers(&headers), Subject::Math);

        headers.insert(header::REFERER, HeaderValue::from_static("https://tutor.example/history"));
        assert_eq!(subject_from_headers(&headers), Subject::History);

        headers.insert(header::REFERER, HeaderValue::from_static("/english/"));
        assert_eq!(subject_from_headers(&headers), Subject::English);
    }

    #[tokio::test]
    async fn test_empty_chat() {
        let (app, llm) = app();
        let response = app
            .oneshot(post_json("/api/chat", &json!({"message": ""}), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-store"
        );
        assert_eq!(body_json(response).await["reply"], "Please type a message.");
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_chat_uses_referer_subject() {
        let (app, llm) = app();
        let response = app
            .oneshot(post_json(
                "/api/chat",
                &json!({"message": "solve the equation 2x + 3 = 7"}),
                Some("http://localhost:5000/science"),
            ))
            .await
            .unwrap();
        assert_eq!(
            body_json(response).await["reply"],
            "I only answer science-related questions on this page. Please ask a science question."
        );
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_bad_image_is_rejected() {
        let (app, _llm) = app();
        let response = app
            .oneshot(post_json(
                "/api/upload-image",
                &json!({"image": {"data": "%%%", "media_type": "image/png"}}),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"]
            .as_str()
            .unwrap()
            .contains("base64"));
    }

    #[tokio::test]
    async fn test_upload_plan_then_session_status() {
        let (app, llm) = app();
        llm.queue_json(json!({
            "is_math": true,
            "steps": ["Subtract 4 from both sides", "Divide by 2"],
            "final_answer": "x=3"
        }));

        let response = app
            .clone()
            .oneshot(post_json("/api/upload-image", &json!({"prompt": "2x+4=10"}), None))
            .await
            .unwrap();
        assert!(body_json(response).await["reply"]
            .as_str()
            .unwrap()
            .starts_with("Step 1: Subtract 4 from both sides"));

        let request = Request::get("/api/session")
            .header(CLIENT_ID_HEADER, "tester")
            .body(Body::empty())
            .unwrap();
        let status = body_json(app.clone().oneshot(request).await.unwrap()).await;
        assert_eq!(status, json!({"active": true, "step": 1, "total_steps": 2}));

        let request = Request::get("/api/session/active")
            .header(CLIENT_ID_HEADER, "tester")
            .body(Body::empty())
            .unwrap();
        let active = body_json(app.clone().oneshot(request).await.unwrap()).await;
        assert_eq!(active, json!({"active": true}));

        let request = Request::get("/api/session/active")
            .header(CLIENT_ID_HEADER, "someone-else")
            .body(Body::empty())
            .unwrap();
        let active = body_json(app.oneshot(request).await.unwrap()).await;
        assert_eq!(active, json!({"active": false}));
    }

    #[tokio::test]
    async fn test_list_subjects() {
        let (app, _llm) = app();
        let request = Request::get("/api/subjects").body(Body::empty()).unwrap();
        let body = body_json(app.oneshot(request).await.unwrap()).await;
        assert_eq!(body["subjects"].as_array().unwrap().len(), 4);
        assert_eq!(body["subjects"][3], json!({"id": "english", "name": "English"}));
    }
}
