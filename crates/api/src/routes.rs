use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use listdash_core::charts::{self, ChartSpec};
use listdash_core::config::Settings;
use listdash_core::dispatch::{MailTransport, ReportForm};
use listdash_core::domain::criteria::{DashboardOptions, FilterCriteria};
use listdash_core::domain::listing::NumericColumn;
use listdash_core::ingest::Source;
use listdash_core::report::{ChartLabels, CONTENT_TYPE};
use listdash_core::session::Session;
use listdash_core::DashboardError;

use crate::sessions::SessionStore;

#[derive(Clone)]
pub struct AppState {
    sessions: Arc<Mutex<SessionStore>>,
    transport: Arc<dyn MailTransport>,
    dispatch_timeout: Duration,
    default_sender: Option<String>,
}

impl AppState {
    pub fn new(settings: &Settings, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(SessionStore::new(
                settings.session_ttl,
                settings.max_sessions,
            ))),
            transport,
            dispatch_timeout: settings.dispatch_timeout,
            default_sender: settings.report_sender.clone(),
        }
    }

    async fn snapshot(&self, id: Uuid) -> Result<Session, ApiError> {
        self.sessions
            .lock()
            .await
            .get_mut(&id)
            .map(|s| s.clone())
            .ok_or(ApiError::SessionNotFound(id))
    }

    async fn insert(&self, session: Session) -> Uuid {
        let mut sessions = self.sessions.lock().await;
        let id = sessions.insert(session);
        tracing::debug!(session_id = %id, live_sessions = sessions.len(), "session stored");
        id
    }
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/sessions/fixture", post(open_fixture_session))
        .route("/sessions/upload", post(open_upload_session))
        .route("/sessions/:id", get(get_session).delete(close_session))
        .route("/sessions/:id/dataset", put(replace_dataset))
        .route("/sessions/:id/filters", put(change_filters))
        .route("/sessions/:id/charts", get(get_charts))
        .route("/sessions/:id/aggregate", get(get_aggregate))
        .route("/sessions/:id/report.png", get(get_report_png))
        .route("/sessions/:id/report", post(submit_report))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug)]
pub enum ApiError {
    SessionNotFound(Uuid),
    Dashboard(DashboardError),
}

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        Self::Dashboard(err)
    }
}

#[derive(Debug, Serialize)]
struct Notice {
    kind: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            Self::SessionNotFound(id) => (
                StatusCode::NOT_FOUND,
                "session_not_found",
                format!("no session {id}"),
            ),
            Self::Dashboard(err) => {
                let status = match &err {
                    DashboardError::MalformedInput(_) => StatusCode::BAD_REQUEST,
                    DashboardError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                    DashboardError::EmptyAggregation | DashboardError::Render(_) => {
                        StatusCode::CONFLICT
                    }
                    DashboardError::Dispatch(_) => StatusCode::BAD_GATEWAY,
                };
                if status == StatusCode::BAD_GATEWAY {
                    sentry_anyhow::capture_anyhow(&anyhow::Error::new(err.clone()));
                }
                (status, err.kind(), err.to_string())
            }
        };
        (status, Json(Notice { kind, message })).into_response()
    }
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
struct SessionView {
    session_id: Uuid,
    columns: Vec<String>,
    total_records: usize,
    filtered_records: usize,
    options: DashboardOptions,
    criteria: FilterCriteria,
    default_sender: Option<String>,
}

impl SessionView {
    fn new(id: Uuid, session: &Session, default_sender: Option<String>) -> Self {
        Self {
            session_id: id,
            columns: session.dataset().columns().to_vec(),
            total_records: session.dataset().len(),
            filtered_records: session.filtered().len(),
            options: session.options().clone(),
            criteria: session.criteria().clone(),
            default_sender,
        }
    }
}

async fn open_fixture_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    let session = Session::open(Source::Fixture)?;
    let view_session = session.clone();
    let id = state.insert(session).await;
    tracing::info!(session_id = %id, "opened fixture session");
    Ok((
        StatusCode::CREATED,
        Json(SessionView::new(id, &view_session, state.default_sender.clone())),
    ))
}

async fn open_upload_session(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    let session = Session::open(Source::Upload(&body))?;
    let view_session = session.clone();
    let id = state.insert(session).await;
    tracing::info!(session_id = %id, records = view_session.dataset().len(), "opened upload session");
    Ok((
        StatusCode::CREATED,
        Json(SessionView::new(id, &view_session, state.default_sender.clone())),
    ))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let session = state.snapshot(id).await?;
    Ok(Json(SessionView::new(id, &session, state.default_sender.clone())))
}

async fn close_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> StatusCode {
    if state.sessions.lock().await.remove(&id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn replace_dataset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<SessionView>, ApiError> {
    // Parse outside the lock; a rejected upload never touches the stored session.
    let fresh = Session::open(Source::Upload(&body))?;

    let mut sessions = state.sessions.lock().await;
    let session = sessions.get_mut(&id).ok_or(ApiError::SessionNotFound(id))?;
    *session = fresh;
    tracing::info!(session_id = %id, records = session.dataset().len(), "replaced session dataset");
    Ok(Json(SessionView::new(id, session, state.default_sender.clone())))
}

async fn change_filters(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(criteria): Json<FilterCriteria>,
) -> Result<Json<SessionView>, ApiError> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions.get_mut(&id).ok_or(ApiError::SessionNotFound(id))?;
    session.filters_changed(criteria)?;
    Ok(Json(SessionView::new(id, session, state.default_sender.clone())))
}

async fn get_charts(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ChartSpec>>, ApiError> {
    let session = state.snapshot(id).await?;
    Ok(Json(session.charts()))
}

#[derive(Debug, Deserialize)]
struct AggregateQuery {
    column: Option<NumericColumn>,
}

async fn get_aggregate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<AggregateQuery>,
) -> Result<Json<ChartSpec>, ApiError> {
    let session = state.snapshot(id).await?;
    let column = query.column.unwrap_or(NumericColumn::RoundLotSize);
    let aggregation = session.aggregate(column)?;
    let labels = ChartLabels {
        title: format!("Avg {column} by Exchange"),
        x_label: "Exchange".to_string(),
        y_label: column.to_string(),
    };
    Ok(Json(charts::aggregation_chart(&aggregation, &labels)))
}

async fn get_report_png(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let session = state.snapshot(id).await?;
    let artifact = session.render_report()?;
    Ok(([(header::CONTENT_TYPE, CONTENT_TYPE)], artifact.into_bytes()).into_response())
}

#[derive(Deserialize)]
struct ReportRequest {
    #[serde(default)]
    sender: Option<String>,
    #[serde(default)]
    password: String,
    #[serde(default)]
    recipient: String,
    #[serde(default)]
    subject: Option<String>,
}

#[derive(Debug, Serialize)]
struct ReportSent {
    status: &'static str,
    recipient: String,
}

async fn submit_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReportRequest>,
) -> Result<Json<ReportSent>, ApiError> {
    let session = state.snapshot(id).await?;

    let sender = req
        .sender
        .filter(|s| !s.trim().is_empty())
        .or_else(|| state.default_sender.clone())
        .ok_or_else(|| DashboardError::validation("sender", "sender address is required"))?;

    let recipient = req.recipient.trim().to_string();
    let form = ReportForm::new(
        sender,
        SecretString::from(req.password),
        recipient.clone(),
        req.subject,
    );

    session
        .report_submitted(state.transport.as_ref(), form, state.dispatch_timeout)
        .await?;

    tracing::info!(session_id = %id, %recipient, "report submitted");
    Ok(Json(ReportSent {
        status: "sent",
        recipient,
    }))
}
