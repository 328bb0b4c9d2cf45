use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

/// Success envelope: the payload's fields are flattened next to `success: true`.
///
/// A payload that does not serialize to a JSON object is placed under `data`.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub body: T,
    pub status_code: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(body: T) -> Self {
        Self::with_status(body, StatusCode::OK)
    }

    pub fn with_status(body: T, status_code: StatusCode) -> Self {
        Self { body, status_code }
    }

    pub fn created(body: T) -> Self {
        Self::with_status(body, StatusCode::CREATED)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let value = match serde_json::to_value(&self.body) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response body: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "success": false, "message": "Server error", "code": "INTERNAL_SERVER_ERROR" })),
                )
                    .into_response();
            }
        };

        let envelope = match value {
            Value::Object(mut fields) => {
                fields.insert("success".to_string(), Value::Bool(true));
                Value::Object(fields)
            }
            other => json!({ "success": true, "data": other }),
        };

        (self.status_code, Json(envelope)).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_of(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn object_payload_is_flattened() {
        let response = ApiResponse::created(json!({ "id": 4, "message": "Property created" })).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_of(response).await;
        assert_eq!(body, json!({ "success": true, "id": 4, "message": "Property created" }));
    }

    #[tokio::test]
    async fn non_object_payload_goes_under_data() {
        let body = body_of(ApiResponse::success(vec![1, 2, 3]).into_response()).await;
        assert_eq!(body, json!({ "success": true, "data": [1, 2, 3] }));
    }
}
