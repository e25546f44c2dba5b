//! HTTP surface consumed by the chat front-end.
//!
//! `POST /api/ask` answers one question and returns the caller's session log.
//! Sessions are picked by the `x-session-id` header; callers that send none
//! share the default session.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use elective_genie_core::{
    ChatHistoryStore, ChatTurn, QuestionAnswerer, ServiceError, DEFAULT_SESSION,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub const FALLBACK_RESPONSE: &str = "Sorry, I didn't understand that.";
pub const FAILURE_RESPONSE: &str = "Sorry, something went wrong.";
pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Clone)]
pub struct AppState {
    pub answerer: Arc<dyn QuestionAnswerer>,
    pub history: Arc<ChatHistoryStore>,
}

impl AppState {
    pub fn new(answerer: Arc<dyn QuestionAnswerer>) -> Self {
        Self {
            answerer,
            history: Arc::new(ChatHistoryStore::new()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub response: String,
    pub chat_history: Vec<ChatTurn>,
}

#[derive(Debug)]
pub enum AppError {
    /// Missing, empty or unreadable question.
    NotUnderstood,
    Answer(ServiceError),
}

impl From<ServiceError> for AppError {
    fn from(error: ServiceError) -> Self {
        AppError::Answer(error)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotUnderstood => (StatusCode::BAD_REQUEST, FALLBACK_RESPONSE),
            AppError::Answer(error) => {
                error!(%error, "answering failed");
                (StatusCode::INTERNAL_SERVER_ERROR, FAILURE_RESPONSE)
            }
        };

        (status, Json(json!({ "response": message }))).into_response()
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/ask", post(ask))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(bind: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(address = %listener.local_addr()?, "listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        error!(%error, "failed to listen for ctrl-c");
    }
}

/// The raw body is parsed here so that malformed JSON gets the same reply as
/// a missing question.
async fn ask(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AskResponse>, AppError> {
    let question = extract_question(&body).ok_or(AppError::NotUnderstood)?;
    let session = session_id(&headers);

    let previous = state.history.history(&session);
    let answer = state.answerer.answer_question(&question, &previous).await?;

    let chat_history = state.history.append(
        &session,
        ChatTurn {
            user: question,
            bot: answer.clone(),
        },
    );

    Ok(Json(AskResponse {
        response: answer,
        chat_history,
    }))
}

fn extract_question(body: &[u8]) -> Option<String> {
    let parsed: Value = serde_json::from_slice(body).ok()?;
    parsed
        .get("question")
        .and_then(Value::as_str)
        .filter(|question| !question.trim().is_empty())
        .map(str::to_string)
}

fn session_id(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_SESSION)
        .to_string()
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    struct EchoAnswerer;

    #[async_trait]
    impl QuestionAnswerer for EchoAnswerer {
        async fn answer_question(
            &self,
            question: &str,
            history: &[ChatTurn],
        ) -> Result<String, ServiceError> {
            Ok(format!("answer #{} to {question}", history.len() + 1))
        }
    }

    struct FailingAnswerer;

    #[async_trait]
    impl QuestionAnswerer for FailingAnswerer {
        async fn answer_question(
            &self,
            _question: &str,
            _history: &[ChatTurn],
        ) -> Result<String, ServiceError> {
            Err(ServiceError::Request("upstream down".to_string()))
        }
    }

    fn router() -> Router {
        build_router(AppState::new(Arc::new(EchoAnswerer)))
    }

    async fn post_ask(router: &Router, body: &str, session: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method("POST")
            .uri("/api/ask")
            .header("content-type", "application/json");
        if let Some(session) = session {
            request = request.header(SESSION_HEADER, session);
        }

        let response = router
            .clone()
            .oneshot(request.body(Body::from(body.to_string())).expect("request"))
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn question_is_answered_and_logged() {
        let (status, body) = post_ask(&router(), r#"{"question": "x"}"#, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "answer #1 to x");
        let history = body["chat_history"].as_array().expect("history array");
        assert_eq!(history.last().expect("one entry")["user"], "x");
        assert_eq!(history.last().expect("one entry")["bot"], "answer #1 to x");
    }

    #[tokio::test]
    async fn missing_question_gets_the_fallback() {
        let router = router();
        for body in [r#"{}"#, r#"{"question": ""}"#, r#"{"question": "   "}"#, r#"{"question": 3}"#, "not json"] {
            let (status, reply) = post_ask(&router, body, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
            assert_eq!(reply, json!({"response": FALLBACK_RESPONSE}));
        }
    }

    #[tokio::test]
    async fn sequential_requests_accumulate_in_order() {
        let router = router();
        post_ask(&router, r#"{"question": "first"}"#, None).await;
        let (_, body) = post_ask(&router, r#"{"question": "second"}"#, None).await;

        let users = body["chat_history"]
            .as_array()
            .expect("history array")
            .iter()
            .map(|turn| turn["user"].as_str().unwrap_or_default().to_string())
            .collect::<Vec<_>>();
        assert_eq!(users, vec!["first", "second"]);
        assert_eq!(body["response"], "answer #2 to second");
    }

    #[tokio::test]
    async fn sessions_are_isolated_by_header() {
        let router = router();
        post_ask(&router, r#"{"question": "mine"}"#, Some("alice")).await;
        let (_, body) = post_ask(&router, r#"{"question": "theirs"}"#, Some("bob")).await;

        let history = body["chat_history"].as_array().expect("history array");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["user"], "theirs");
    }

    #[tokio::test]
    async fn answer_failures_are_server_errors() {
        let router = build_router(AppState::new(Arc::new(FailingAnswerer)));
        let (status, body) = post_ask(&router, r#"{"question": "x"}"#, None).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"response": FAILURE_RESPONSE}));
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("router is infallible");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
