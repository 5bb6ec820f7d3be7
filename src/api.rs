use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::campaign::{CampaignRunner, CampaignStatus};
use crate::config::Config;
use crate::engine::{self, Criteria, LevelDistribution, ScorePoint, Summary};
use crate::export;
use crate::lead::Lead;
use crate::loader::{self, LeadStore, LoadStatus};

const DEFAULT_PAGE_LIMIT: usize = 100;
const MAX_PAGE_LIMIT: usize = 500;

#[derive(Clone)]
pub struct AppState {
    config: Config,
    store: LeadStore,
    campaign: CampaignRunner,
}

impl AppState {
    pub fn new(config: Config, store: LeadStore, campaign: CampaignRunner) -> Self {
        Self {
            config,
            store,
            campaign,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/leads", get(all_leads))
        .route("/api/leads", get(filtered_leads))
        .route("/api/stats", get(stats))
        .route("/api/export.csv", get(export_csv))
        .route("/api/refresh", post(refresh))
        .route("/api/campaign/run", post(campaign_run))
        .route("/api/campaign/stop", post(campaign_stop))
        .route("/api/campaign/status", get(campaign_status))
        .fallback_service(ServeDir::new("static"))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Serialize)]
struct LeadsResp {
    success: bool,
    data: Vec<Lead>,
    total: usize,
    source: String,
    timestamp: DateTime<Utc>,
}

/// Full collection, legacy flat envelope.
async fn all_leads(State(state): State<AppState>) -> Json<LeadsResp> {
    let view = state.store.view();
    let data: Vec<Lead> = view.leads.as_ref().clone();
    Json(LeadsResp {
        success: true,
        total: data.len(),
        data,
        source: view.source_label,
        timestamp: Utc::now(),
    })
}

#[derive(serde::Deserialize)]
struct LeadsQuery {
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    min_score: Option<f64>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    offset: Option<usize>,
}

impl LeadsQuery {
    fn criteria(&self) -> Criteria {
        Criteria::from_raw(
            self.level.clone(),
            self.min_score,
            self.source.clone(),
            self.query.clone(),
        )
    }
}

#[derive(serde::Serialize)]
struct Pagination {
    /// Size of the filtered set, not of the page.
    total: usize,
    limit: usize,
    offset: usize,
    has_more: bool,
}

#[derive(serde::Serialize)]
struct PagedResp {
    success: bool,
    data: Vec<Lead>,
    pagination: Pagination,
    source: String,
    timestamp: DateTime<Utc>,
}

/// Filtered + paginated table view.
async fn filtered_leads(
    State(state): State<AppState>,
    Query(q): Query<LeadsQuery>,
) -> Json<PagedResp> {
    let view = state.store.view();
    let filtered = engine::apply(&view.leads, &q.criteria());

    let total = filtered.len();
    let limit = normalize_limit(q.limit);
    let offset = q.offset.unwrap_or(0);
    let data: Vec<Lead> = filtered.into_iter().skip(offset).take(limit).collect();

    Json(PagedResp {
        success: true,
        data,
        pagination: Pagination {
            total,
            limit,
            offset,
            has_more: offset.saturating_add(limit) < total,
        },
        source: view.source_label,
        timestamp: Utc::now(),
    })
}

fn normalize_limit(raw: Option<usize>) -> usize {
    raw.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT)
}

#[derive(serde::Serialize)]
struct StatsData {
    total_leads: usize,
    qualified_leads: usize,
    average_score: f64,
    qualification_rate: f64,
    level_distribution: LevelDistribution,
    source_distribution: std::collections::BTreeMap<String, usize>,
    top_by_score: Vec<ScorePoint>,
}

#[derive(serde::Serialize)]
struct StatsResp {
    success: bool,
    data: StatsData,
    source: String,
    timestamp: DateTime<Utc>,
}

/// Summary cards plus the two chart projections, always over the full
/// collection regardless of active filters.
async fn stats(State(state): State<AppState>) -> Json<StatsResp> {
    let view = state.store.view();
    let summary = Summary::compute(&view.leads);
    let top = engine::top_by_score(&view.leads, state.config.top_n);

    Json(StatsResp {
        success: true,
        data: StatsData {
            total_leads: summary.total,
            qualified_leads: summary.qualified_count,
            average_score: summary.average_score,
            qualification_rate: summary.qualification_rate,
            level_distribution: summary.level_distribution,
            source_distribution: summary.source_distribution,
            top_by_score: top,
        },
        source: view.source_label,
        timestamp: Utc::now(),
    })
}

/// CSV of the current filtered view as a browser download. Pagination
/// params are ignored; the export always covers the whole filtered set.
async fn export_csv(
    State(state): State<AppState>,
    Query(q): Query<LeadsQuery>,
) -> impl IntoResponse {
    let view = state.store.view();
    let filtered = engine::apply(&view.leads, &q.criteria());
    let body = export::to_csv(&filtered);

    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export::csv_filename()),
        ),
    ];
    (headers, body)
}

#[derive(serde::Serialize)]
struct RefreshResp {
    success: bool,
    status: LoadStatus,
    message: String,
    total: usize,
    source: String,
    timestamp: DateTime<Utc>,
}

/// Re-run the loader chain and swap the store. Never fails: the chain
/// bottoms out at the built-in samples.
async fn refresh(State(state): State<AppState>) -> Json<RefreshResp> {
    let outcome = loader::load(&state.config).await;
    state.store.replace(outcome);

    let view = state.store.view();
    Json(RefreshResp {
        success: true,
        status: view.status,
        message: view.message,
        total: view.leads.len(),
        source: view.source_label,
        timestamp: Utc::now(),
    })
}

async fn campaign_run(State(state): State<AppState>) -> Json<CampaignStatus> {
    Json(state.campaign.trigger())
}

async fn campaign_stop(State(state): State<AppState>) -> Json<CampaignStatus> {
    Json(state.campaign.stop())
}

async fn campaign_status(State(state): State<AppState>) -> Json<CampaignStatus> {
    Json(state.campaign.status())
}
