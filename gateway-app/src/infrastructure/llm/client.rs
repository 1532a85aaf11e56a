use super::backend::BackendKind;
use super::{ollama, openai};
use crate::config::Settings;
use crate::domain::{ChatCompletionRequest, ChatCompletionResponse};
use chrono::Utc;
use gateway_errors::AppError;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

const ERROR_TEXT_LIMIT: usize = 1000;

/// Non-streaming chat client for a single configured upstream.
///
/// The backend kind is fixed at construction. The underlying connection pool
/// lives as long as the client and is closed when it is dropped.
pub struct LlmClient {
    http_client: reqwest::Client,
    backend: BackendKind,
    base_url: String,
    retry_connect_errors: u32,
    retry_backoff: Duration,
}

impl LlmClient {
    pub fn new(settings: &Settings) -> Result<Self, AppError> {
        let (backend, base_url) = BackendKind::classify(&settings.llm_base_url);

        let parsed = Url::parse(&base_url)
            .map_err(|e| AppError::Config(format!("Invalid LLM base URL {}: {}", base_url, e)))?;
        if parsed.host_str().is_none() {
            return Err(AppError::Config(format!(
                "LLM base URL has no host: {}",
                base_url
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        // reqwest has no per-write timeout; writes are bounded by the total timeout.
        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(settings.connect_timeout)
            .read_timeout(settings.read_timeout)
            .timeout(settings.total_timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            backend = %backend,
            base_url = %base_url,
            retries = settings.retry_connect_errors,
            "LLM client configured"
        );
        if settings.write_timeout != settings.total_timeout {
            tracing::info!(
                write_timeout_ms = settings.write_timeout.as_millis() as u64,
                total_timeout_ms = settings.total_timeout.as_millis() as u64,
                "Write timeout is not enforced separately; request writes are bounded by the total timeout"
            );
        }

        Ok(Self {
            http_client,
            backend,
            base_url,
            retry_connect_errors: settings.retry_connect_errors,
            retry_backoff: settings.retry_backoff,
        })
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn chat_completion(
        &self,
        req: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, AppError> {
        match self.backend {
            BackendKind::OpenAiCompatible => {
                let body = openai::build_request(req);
                let data = self.post_json(openai::CHAT_COMPLETIONS_PATH, &body).await?;
                Ok(openai::normalize_response(
                    &data,
                    &req.model,
                    Utc::now().timestamp(),
                ))
            }
            BackendKind::Ollama => {
                let body = ollama::build_request(req);
                let data = self.post_json(ollama::CHAT_PATH, &body).await?;
                Ok(ollama::normalize_response(&data, &req.model))
            }
        }
    }

    /// POSTs `body` and returns the parsed 2xx JSON body.
    ///
    /// Connection-level failures, including a timeout while the body is still
    /// arriving, are retried with a linear backoff; HTTP error statuses are
    /// never retried.
    async fn post_json<B: Serialize>(&self, path: &str, body: &B) -> Result<Value, AppError> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt: u32 = 0;

        loop {
            match self.exchange(&url, body).await {
                Ok((status, bytes)) => return self.read_response(status, &bytes),
                Err(e) if is_connection_level(&e) => {
                    attempt += 1;
                    if attempt > self.retry_connect_errors {
                        tracing::error!(
                            backend = %self.backend,
                            attempts = attempt,
                            "Upstream unreachable: {}",
                            e
                        );
                        return Err(AppError::Timeout {
                            attempts: attempt,
                            message: format!(
                                "{} timeout/connect error after {} attempts: {}",
                                self.backend, attempt, e
                            ),
                        });
                    }
                    let delay = self.retry_backoff * attempt;
                    tracing::warn!(
                        backend = %self.backend,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying upstream after connection error: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(AppError::Transport(e.to_string())),
            }
        }
    }

    /// One POST, with the whole body read.
    async fn exchange<B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<(StatusCode, Vec<u8>), reqwest::Error> {
        let response = self.http_client.post(url).json(body).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        Ok((status, bytes.to_vec()))
    }

    fn read_response(&self, status: StatusCode, bytes: &[u8]) -> Result<Value, AppError> {
        if !status.is_success() {
            let body = error_body(bytes);
            tracing::warn!(
                backend = %self.backend,
                status = status.as_u16(),
                "Upstream error: {}",
                body
            );
            return Err(AppError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(backend = %self.backend, status = status.as_u16(), "Upstream ok");
        serde_json::from_slice(bytes).map_err(|e| AppError::InvalidUpstreamResponse(e.to_string()))
    }
}

/// Connect failures and timeouts, whether waiting for the status or the body.
fn is_connection_level(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}

/// Structured body when the upstream sent JSON, otherwise its leading text.
fn error_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap_or_else(|_| {
        let text: String = String::from_utf8_lossy(bytes)
            .chars()
            .take(ERROR_TEXT_LIMIT)
            .collect();
        json!({ "text": text })
    })
}
