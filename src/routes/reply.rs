use std::convert::Infallible;

use serde::Serialize;
use serde_json::{json, Value};
use warp::{
    filters::body::BodyDeserializeError,
    http::StatusCode,
    reject::{InvalidQuery, MethodNotAllowed, PayloadTooLarge, UnsupportedMediaType},
    reply::Reply,
    Rejection,
};

pub type Response = warp::reply::Response;

pub fn json_reply<T: Serialize>(value: &T, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(value), status).into_response()
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

fn detail(status: StatusCode, message: &str) -> Response {
    json_reply(&json!({ "detail": message }), status)
}

/// Validation errors carry their field map as `info`; everything else becomes `{"detail": ...}`.
/// Internal errors are logged and never echoed to the client.
pub fn error_reply(error: &potion::Error) -> Response {
    let status =
        StatusCode::from_u16(error.code as u16).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        log::error!("Request failed: {:?}", error.info);
        return detail(status, "Internal server error");
    }

    match &error.info {
        Some(info) => match serde_json::from_str::<Value>(info) {
            Ok(fields @ Value::Object(_)) => json_reply(&fields, status),
            _ => detail(status, info),
        },
        None => detail(status, status.canonical_reason().unwrap_or("Error")),
    }
}

pub fn render(result: Result<Response, potion::Error>) -> Response {
    result.unwrap_or_else(|e| error_reply(&e))
}

pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let reply = if err.is_not_found() {
        detail(StatusCode::NOT_FOUND, "Not found.")
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        detail(StatusCode::BAD_REQUEST, &format!("Malformed request body: {e}"))
    } else if let Some(e) = err.find::<InvalidQuery>() {
        detail(StatusCode::BAD_REQUEST, &e.to_string())
    } else if err.find::<PayloadTooLarge>().is_some() {
        detail(StatusCode::PAYLOAD_TOO_LARGE, "Request body is too large")
    } else if err.find::<UnsupportedMediaType>().is_some() {
        detail(StatusCode::UNSUPPORTED_MEDIA_TYPE, "Expected a JSON body")
    } else if err.find::<MethodNotAllowed>().is_some() {
        detail(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed.")
    } else {
        log::error!("Unhandled rejection: {err:?}");
        detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };

    Ok(reply)
}
