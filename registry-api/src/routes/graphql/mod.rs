//! The search endpoint: a small GraphQL subset served over `POST /graphql`.

mod error;
mod executor;
mod parser;
mod schema;
mod validation;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header::CONTENT_TYPE, HeaderMap},
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{auth::ApiToken, AppState};

use self::executor::{execute, GraphqlRequest, GraphqlResponse};
use super::ApiError;

const MAX_BODY_BYTES: usize = 256 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/graphql", post(graphql))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

#[instrument(name = "POST /api/graphql", skip(_token, app_state, headers, body))]
async fn graphql(
    _token: ApiToken,
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<GraphqlResponse>, ApiError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let request = decode_request(content_type, &body)?;

    Ok(Json(execute(&app_state.search, request).await))
}

/// Reads a request from a JSON body, a raw `application/graphql` document,
/// or form fields (`query`, `variables`, `operationName`).
fn decode_request(content_type: &str, body: &[u8]) -> Result<GraphqlRequest, ApiError> {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match media_type.as_str() {
        "application/json" => {
            if body.iter().all(u8::is_ascii_whitespace) {
                return Ok(GraphqlRequest::default());
            }
            serde_json::from_slice(body)
                .map_err(|err| ApiError::bad_request(format!("Invalid JSON body: {err}")))
        }
        "application/graphql" => Ok(GraphqlRequest {
            query: Some(String::from_utf8_lossy(body).into_owned()),
            ..Default::default()
        }),
        _ => {
            let mut request = GraphqlRequest::default();
            for (key, value) in url::form_urlencoded::parse(body) {
                match key.as_ref() {
                    "query" => request.query = Some(value.into_owned()),
                    "variables" => {
                        request.variables = Some(serde_json::Value::String(value.into_owned()))
                    }
                    "operationName" => request.operation_name = Some(value.into_owned()),
                    _ => {}
                }
            }
            Ok(request)
        }
    }
}
