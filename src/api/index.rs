// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Static page for trying the service from a browser

use axum::{http::header, response::Html, response::IntoResponse};

const INDEX_HTML: &str = include_str!("../../static/index.html");
const SCRIPTS_JS: &str = include_str!("../../static/scripts.js");

/// GET /
pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /static/scripts.js
pub async fn scripts_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        SCRIPTS_JS,
    )
}
