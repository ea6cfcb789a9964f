// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//! HTTP surface for the instrument registry
//!
//! An Axum router with the scrape endpoint, a health probe and the landing
//! page that loads the companion front end.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::error::{MetricsError, MetricsResult};
use crate::registry::ScrapeHandler;

/// Path of the Prometheus scrape endpoint
pub const METRICS_PATH: &str = "/api/metrics";

const INDEX_TEMPLATE: &str = include_str!("index.html");

/// Rendered landing page
#[derive(Debug, Clone)]
pub struct IndexPage {
    html: Arc<str>,
}

impl IndexPage {
    /// Render the page, loading the front end from `ui` when given
    pub fn render(ui: Option<&str>) -> Self {
        let script = match ui {
            Some(url) if !url.is_empty() => {
                format!(r#"<script type="module" src="{}"></script>"#, escape_attr(url))
            }
            _ => String::new(),
        };

        Self {
            html: INDEX_TEMPLATE.replace("{{script}}", &script).into(),
        }
    }

    /// Page markup
    pub fn html(&self) -> &str {
        &self.html
    }
}

impl Default for IndexPage {
    fn default() -> Self {
        Self::render(None)
    }
}

fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[derive(Clone)]
struct ServerState {
    scrape: ScrapeHandler,
    index: IndexPage,
}

/// Build the router serving `/`, `/health` and [`METRICS_PATH`]
///
/// Any other path answers 404.
pub fn router(scrape: ScrapeHandler, index: IndexPage) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route(METRICS_PATH, get(metrics_handler))
        .with_state(ServerState { scrape, index })
}

/// Serve `router` on an already bound listener until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> MetricsResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Serving metrics on http://{}{}", addr, METRICS_PATH);
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| MetricsError::Server(e.to_string()))
}

/// Handler for the scrape endpoint
async fn metrics_handler(State(state): State<ServerState>) -> Response {
    debug!("Serving metrics");

    match state.scrape.exposition() {
        Ok(exposition) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, exposition.content_type)],
            exposition.body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn index_handler(State(state): State<ServerState>) -> Html<String> {
    Html(state.index.html().to_string())
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InstrumentRegistry, RegistryConfig, Sample};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> (InstrumentRegistry, Router) {
        let registry = InstrumentRegistry::new(RegistryConfig::default()).unwrap();
        let router = router(
            registry.scrape_handler(),
            IndexPage::render(Some("https://ui.example.com/app.js")),
        );
        (registry, router)
    }

    async fn get_body(router: Router, uri: &str) -> (StatusCode, Option<String>, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let (registry, router) = app();
        for _ in 0..5 {
            registry.handle_sample(&Sample::counter("http_reqs", 1.0));
        }

        let (status, content_type, body) = get_body(router, METRICS_PATH).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("text/plain; version=0.0.4"));
        assert!(body.contains("http_reqs 5"));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (_, router) = app();
        let (status, _, body) = get_body(router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn test_index_page() {
        let (_, router) = app();
        let (status, _, body) = get_body(router, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"src="https://ui.example.com/app.js""#));
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let (_, router) = app();
        let (status, _, _) = get_body(router, "/index.html").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_index_without_ui_has_no_script() {
        assert!(!IndexPage::default().html().contains("<script"));
        assert!(!IndexPage::default().html().contains("{{script}}"));
    }

    #[test]
    fn test_ui_url_is_escaped() {
        let page = IndexPage::render(Some(r#"https://x/"><script>"#));
        assert!(page.html().contains("&quot;&gt;&lt;script&gt;"));
    }
}
