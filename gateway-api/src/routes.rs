use crate::extract::{request_id, ApiJson, REQUEST_ID_HEADER};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName};
use axum::routing::{get, post};
use axum::{Json, Router};
use gateway_app::domain::{ChatCompletionRequest, ChatCompletionResponse};
use gateway_app::AppContext;
use gateway_errors::RequestError;
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub fn router(ctx: AppContext) -> Router {
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);

    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(
            request_id_header.clone(),
            MakeRequestUuid,
        ))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id(request.headers()),
                )
            }),
        )
        .layer(PropagateRequestIdLayer::new(request_id_header))
        .layer(CorsLayer::permissive());

    Router::new()
        .route("/", get(root))
        .route("/healthcheck", get(health_check))
        .route("/v1/chat/completions", post(chat_completions))
        .layer(middleware)
        .with_state(ctx)
}

async fn root(State(ctx): State<AppContext>) -> Json<Value> {
    Json(json!({
        "message": "LLM Gateway running",
        "env": ctx.settings.app_env,
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn chat_completions(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<ChatCompletionRequest>,
) -> Result<Json<ChatCompletionResponse>, RequestError> {
    let request_id = request_id(&headers);

    match ctx.complete_chat.execute(&req).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            if e.is_client_fault() {
                tracing::info!(request_id = %request_id, "Rejected chat completion: {}", e);
            } else {
                tracing::error!(request_id = %request_id, "Chat completion failed: {}", e);
            }
            Err(e.with_request_id(request_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request as HttpRequest, StatusCode};
    use gateway_app::Settings;
    use tower::ServiceExt;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app_for(base_url: String) -> Router {
        let settings = Settings {
            llm_base_url: base_url,
            app_env: "test".to_string(),
            ..Settings::default()
        };
        router(AppContext::new(settings).unwrap())
    }

    fn post_chat(body: Value) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method("POST")
            .uri("/v1/chat/completions")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn hello_body() -> Value {
        json!({
            "model": "mistralai/Mistral-7B-Instruct-v0.3",
            "messages": [{"role": "user", "content": "hello"}]
        })
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn upstream_returning(template: ResponseTemplate, expected_calls: u64) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(template)
            .expect(expected_calls)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_health_and_root() {
        let app = app_for("http://localhost:8000".into());

        let response = app
            .clone()
            .oneshot(HttpRequest::get("/healthcheck").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await, json!({"status": "ok"}));

        let response = app
            .oneshot(HttpRequest::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(
            read_json(response).await,
            json!({"message": "LLM Gateway running", "env": "test"})
        );
    }

    #[tokio::test]
    async fn test_missing_messages_422() {
        let server = upstream_returning(ResponseTemplate::new(200), 0).await;
        let app = app_for(server.uri());

        let response = app.oneshot(post_chat(json!({"model": "x"}))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = read_json(response).await;
        assert_eq!(body["type"], "validation_error");
    }

    #[tokio::test]
    async fn test_invalid_role_422() {
        let server = upstream_returning(ResponseTemplate::new(200), 0).await;
        let app = app_for(server.uri());

        let response = app
            .oneshot(post_chat(json!({
                "model": "x",
                "messages": [{"role": "robot", "content": "beep"}]
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_stream_not_supported_400() {
        for base in ["http://127.0.0.1:9", "ollama://127.0.0.1:9"] {
            let app = app_for(base.to_string());
            let mut body = hello_body();
            body["stream"] = json!(true);

            let response = app.oneshot(post_chat(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);

            let request_id = response
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .unwrap();
            let body = read_json(response).await;
            assert_eq!(body["type"], "bad_request");
            assert_eq!(body["message"], "stream=true not supported yet");
            assert_eq!(body["request_id"], request_id.as_str());
        }
    }

    #[tokio::test]
    async fn test_success_returns_canonical_response() {
        let server = upstream_returning(
            ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-123",
                "created": 1_700_000_000,
                "model": "mistral",
                "choices": [],
                "usage": {"prompt_tokens": 1, "completion_tokens": 0}
            })),
            1,
        )
        .await;
        let app = app_for(server.uri());

        let response = app.oneshot(post_chat(hello_body())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: ChatCompletionResponse =
            serde_json::from_value(read_json(response).await).unwrap();
        assert_eq!(body.id, "chatcmpl-123");
        assert_eq!(body.object, "chat.completion");
        assert_eq!(body.choices.len(), 1);
        assert_eq!(body.choices[0].finish_reason, "stop");
        assert_eq!(body.usage.total_tokens, 1);
    }

    #[tokio::test]
    async fn test_upstream_404_maps_to_400() {
        let server = upstream_returning(
            ResponseTemplate::new(404).set_body_json(json!({"error": "no such model"})),
            1,
        )
        .await;
        let app = app_for(server.uri());

        let mut request = post_chat(hello_body());
        request
            .headers_mut()
            .insert(REQUEST_ID_HEADER, "req-42".parse().unwrap());

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            read_json(response).await,
            json!({
                "type": "upstream_4xx",
                "message": {"error": "no such model"},
                "request_id": "req-42"
            })
        );
    }

    #[tokio::test]
    async fn test_upstream_503_maps_to_502() {
        let server = upstream_returning(ResponseTemplate::new(503).set_body_string("busy"), 1).await;
        let base = server.uri().replacen("http://", "ollama://", 1);
        let app = app_for(base);

        let response = app.oneshot(post_chat(hello_body())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = read_json(response).await;
        assert_eq!(body["type"], "upstream_5xx");
        assert_eq!(body["message"], json!({"text": "busy"}));
    }
}
