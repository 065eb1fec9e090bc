use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::Config;
use crate::jobs::{self, JobContext};
use crate::store::{HistoryState, HistoryStore};
use crate::html;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub client: reqwest::Client,
    pub store: HistoryStore,
    pub history: Arc<Mutex<HistoryState>>,
}

impl AppState {
    pub fn new(config: Config, client: reqwest::Client, store: HistoryStore) -> Self {
        AppState {
            config: Arc::new(config),
            client,
            store,
            history: Arc::new(Mutex::new(HistoryState::default())),
        }
    }
}

/// `{type, display}` trigger body. Anything unparseable reads as the
/// defaults, and an unrecognized type falls back to daily.
#[derive(Debug, Default, Deserialize)]
pub struct ReportRequest {
    #[serde(rename = "type", default)]
    pub report_type: Option<String>,
    #[serde(default)]
    pub display: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportType {
    Daily,
    Weekly,
}

impl ReportRequest {
    pub fn from_body(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    pub fn report_type(&self) -> ReportType {
        match self.report_type.as_deref() {
            Some("weekly") => ReportType::Weekly,
            _ => ReportType::Daily,
        }
    }
}

pub fn router(state: AppState) -> Router {
    // Other methods on "/" get axum's automatic 405.
    Router::new()
        .route("/", get(status_page).post(trigger_report))
        .with_state(state)
}

pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn status_page(State(state): State<AppState>) -> Html<String> {
    let total_checks = state.history.lock().await.total_checks;
    Html(html::status_page(&state.config, total_checks))
}

async fn trigger_report(State(state): State<AppState>, body: String) -> Response {
    let request = ReportRequest::from_body(&body);
    let report_type = request.report_type();

    let ctx = JobContext {
        config: &state.config,
        client: &state.client,
        store: &state.store,
    };
    let mut history = state.history.lock().await;

    if request.display {
        let rendered = match report_type {
            ReportType::Weekly => jobs::render_weekly_html(&ctx).await,
            ReportType::Daily => jobs::render_daily_html(&ctx, &mut history).await,
        };
        return match rendered {
            Ok(fragment) => Html(fragment).into_response(),
            Err(err) => error_response(&err),
        };
    }

    let delivered = match report_type {
        ReportType::Weekly => jobs::run_weekly(&ctx, &mut history).await,
        ReportType::Daily => jobs::run_daily(&ctx, &mut history).await,
    };
    match delivered {
        Ok(_) => {
            let ack = match report_type {
                ReportType::Weekly => "✅ Weekly report sent to all chats!",
                ReportType::Daily => "✅ Daily report sent to all chats!",
            };
            ack.into_response()
        }
        Err(err) => error_response(&err),
    }
}

fn error_response(err: &anyhow::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        format!("❌ Error: {err:#}"),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_body_defaults_to_daily_send() {
        let request = ReportRequest::from_body("not json");
        assert_eq!(request.report_type(), ReportType::Daily);
        assert!(!request.display);
    }

    #[test]
    fn empty_body_defaults_to_daily_send() {
        let request = ReportRequest::from_body("");
        assert_eq!(request.report_type(), ReportType::Daily);
        assert!(!request.display);
    }

    #[test]
    fn unrecognized_type_falls_back_to_daily() {
        let request = ReportRequest::from_body(r#"{"type": "monthly"}"#);
        assert_eq!(request.report_type(), ReportType::Daily);
    }

    #[test]
    fn weekly_display_request_parses() {
        let request = ReportRequest::from_body(r#"{"type": "weekly", "display": true}"#);
        assert_eq!(request.report_type(), ReportType::Weekly);
        assert!(request.display);
    }
}
