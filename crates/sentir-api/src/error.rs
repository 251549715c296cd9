//! Error responses.
//!
//! Every failure leaves the server as an `error` record rendered by the
//! serializer, carrying the status of the underlying [`sentir_core::Error`].

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use sentir_core::Error;
use sentir_engine::{render_error, RenderOptions, Rendered};

/// An engine error plus the output options of the request that raised it.
#[derive(Debug)]
pub struct ApiError {
    pub error: Error,
    pub options: RenderOptions,
}

impl ApiError {
    pub fn new(error: Error, options: RenderOptions) -> Self {
        Self { error, options }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self::new(error, RenderOptions::default())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.error.status() >= 500 {
            error!(kind = self.error.kind(), error = %self.error, "Request failed");
        } else {
            warn!(kind = self.error.kind(), error = %self.error, "Request rejected");
        }

        match render_error(&self.error, &self.options) {
            Ok(rendered) => rendered_response(rendered),
            Err(e) => {
                error!(error = %e, "Failed to render error document");
                let body = Json(serde_json::json!({
                    "error": "Internal error",
                }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

/// Turns a rendered document into a response with its status, content
/// type and optional `Link` header.
pub fn rendered_response(rendered: Rendered) -> Response {
    let status =
        StatusCode::from_u16(rendered.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = (status, rendered.body).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(rendered.content_type),
    );
    if let Some(link) = rendered.link {
        if let Ok(value) = HeaderValue::from_str(&link) {
            headers.insert(header::LINK, value);
        }
    }
    response
}
