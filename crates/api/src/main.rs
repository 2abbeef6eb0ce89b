use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use asset_views_core::domain::asset_view::AssetViewDocument;
use asset_views_core::editor::form::AssetForm;
use asset_views_core::editor::session::{
    Action, AssetEdit, EditorSession, Outcome, SessionState, LOAD_FAILED_STATUS,
};
use asset_views_core::present::card::{build_cards, AssetCard};
use asset_views_core::present::markdown::PulldownRenderer;
use asset_views_core::storage::gateway::PersistenceGateway;
use asset_views_core::time::clock::SystemClock;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = asset_views_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let gateway = PersistenceGateway::from_settings(&settings).await?;
    let mut session = EditorSession::new(gateway, Arc::new(SystemClock));

    // A failed initial load is not fatal: the API starts in degraded mode and a reset or an
    // import can still bring it to Ready.
    if let Err(e) = session.initialize().await {
        let err = anyhow::Error::new(e);
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %err, "initial load failed; starting API in degraded mode");
    }

    let state = AppState {
        session: Arc::new(Mutex::new(session)),
    };

    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/views", get(get_views))
        .route("/views/cards", get(get_cards))
        .route("/admin/assets/:id/form", get(get_form))
        .route("/admin/save", post(post_save))
        .route("/admin/export", get(get_export))
        .route("/admin/import", post(post_import))
        .route("/admin/reset", post(post_reset))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

/// One session per process; the mutex keeps save/import/reset strictly one at a time.
#[derive(Clone)]
struct AppState {
    session: Arc<Mutex<EditorSession>>,
}

#[derive(Debug, Serialize)]
struct StatusBody {
    status: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

impl StatusBody {
    fn message(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            errors: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SaveRequest {
    edits: Vec<AssetEdit>,
}

async fn current_or_unavailable(
    state: &AppState,
) -> Result<Arc<AssetViewDocument>, (StatusCode, Json<StatusBody>)> {
    let session = state.session.lock().await;
    session.current().ok_or_else(|| {
        let status = match session.state() {
            SessionState::LoadFailed(status) => status.clone(),
            _ => LOAD_FAILED_STATUS.to_string(),
        };
        (StatusCode::SERVICE_UNAVAILABLE, Json(StatusBody::message(status)))
    })
}

async fn get_views(
    State(state): State<AppState>,
) -> Result<Json<AssetViewDocument>, (StatusCode, Json<StatusBody>)> {
    let doc = current_or_unavailable(&state).await?;
    Ok(Json(AssetViewDocument::clone(&doc)))
}

async fn get_cards(
    State(state): State<AppState>,
) -> Result<Json<Vec<AssetCard>>, (StatusCode, Json<StatusBody>)> {
    let doc = current_or_unavailable(&state).await?;
    // No chart widget server-side; clients draw from `chart_points`.
    Ok(Json(build_cards(&doc, &PulldownRenderer, None)))
}

async fn get_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AssetForm>, StatusCode> {
    let session = state.session.lock().await;
    session.form_for(&id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn post_save(State(state): State<AppState>, Json(req): Json<SaveRequest>) -> Response {
    dispatch(&state, Action::Save(req.edits)).await
}

async fn get_export(State(state): State<AppState>) -> Response {
    let outcome = state.session.lock().await.dispatch(Action::Export).await;
    match outcome {
        Outcome::Exported {
            file_name,
            contents,
        } => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/json".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{file_name}\""),
                ),
            ],
            contents,
        )
            .into_response(),
        other => outcome_response(other, false),
    }
}

async fn post_import(State(state): State<AppState>, body: String) -> Response {
    dispatch(&state, Action::Import(body)).await
}

async fn post_reset(State(state): State<AppState>) -> Response {
    dispatch(&state, Action::Reset).await
}

async fn dispatch(state: &AppState, action: Action) -> Response {
    let mut session = state.session.lock().await;
    let outcome = session.dispatch(action).await;
    let load_failed = matches!(session.state(), SessionState::LoadFailed(_));
    outcome_response(outcome, load_failed)
}

fn outcome_response(outcome: Outcome, load_failed: bool) -> Response {
    let status = outcome.status();
    match outcome {
        Outcome::Rejected { errors } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(StatusBody { status, errors }),
        )
            .into_response(),
        Outcome::Failed { .. } => {
            sentry::capture_message(&status, sentry::Level::Error);
            let code = if load_failed {
                StatusCode::SERVICE_UNAVAILABLE
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (code, Json(StatusBody::message(status))).into_response()
        }
        _ => (StatusCode::OK, Json(StatusBody::message(status))).into_response(),
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &asset_views_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
