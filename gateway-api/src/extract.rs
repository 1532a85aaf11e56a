use axum::extract::{FromRequest, Request};
use axum::http::HeaderMap;
use axum::Json;
use gateway_errors::{AppError, RequestError, UNKNOWN_REQUEST_ID};
use serde::de::DeserializeOwned;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or(UNKNOWN_REQUEST_ID)
        .to_string()
}

/// JSON body extractor whose rejections become 422 validation errors.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = RequestError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let request_id = request_id(req.headers());
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(request_id = %request_id, "Rejected request body: {}", rejection.body_text());
                Err(AppError::Validation(rejection.body_text()).with_request_id(request_id))
            }
        }
    }
}
