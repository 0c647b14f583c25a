//! Response helpers. Success bodies are the bare row or array; acknowledgements carry a message.

use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MessageBody {
    pub message: String,
}

pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(data))
}

pub fn ok<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::OK, Json(data))
}

pub fn message(text: impl Into<String>) -> (StatusCode, Json<MessageBody>) {
    (
        StatusCode::OK,
        Json(MessageBody {
            message: text.into(),
        }),
    )
}
