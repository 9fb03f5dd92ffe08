use crate::config::AppConfig;
use crate::export::to_feature_collection;
use crate::filter::RegionFilter;
use crate::processing::{calculate_impact_with, ImpactOptions, ImpactResult};
use crate::types::{GlobalStat, Layer, Locality, Mine, PerMineStat};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{error, info};

pub const NO_IMPACT_MESSAGE: &str = "no affected localities at this radius";

/// Read-only inputs shared by all requests. Every request computes its
/// result from scratch.
pub struct AppState {
    pub mines: Layer<Mine>,
    pub localities: Layer<Locality>,
    pub options: ImpactOptions,
    pub default_radius_km: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImpactParams {
    pub radius_km: Option<f64>,
    pub department: Option<String>,
    pub province: Option<String>,
    pub district: Option<String>,
    pub mine: Option<String>,
    pub locality: Option<String>,
}

fn split_list(value: &Option<String>) -> Vec<String> {
    value
        .as_deref()
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

impl ImpactParams {
    pub fn filter(&self) -> RegionFilter {
        RegionFilter {
            departments: split_list(&self.department),
            provinces: split_list(&self.province),
            districts: split_list(&self.district),
            mines: split_list(&self.mine),
            localities: split_list(&self.locality),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImpactResponse {
    pub radius_km: f64,
    pub mines_considered: usize,
    pub localities_considered: usize,
    pub global_stats: GlobalStat,
    pub per_mine_stats: Vec<PerMineStat>,
    /// Filtered inputs, so the map can mark every mine and locality even
    /// when nothing is affected.
    pub mines: FeatureCollection,
    pub localities: FeatureCollection,
    pub buffers: FeatureCollection,
    pub affected_localities: FeatureCollection,
    pub detailed_match: FeatureCollection,
    pub message: Option<String>,
}

impl ImpactResponse {
    fn new(
        radius_km: f64,
        mines: &Layer<Mine>,
        localities: &Layer<Locality>,
        result: ImpactResult,
    ) -> Self {
        let message = if result.has_impact() {
            None
        } else {
            Some(NO_IMPACT_MESSAGE.to_string())
        };

        Self {
            radius_km,
            mines_considered: mines.len(),
            localities_considered: localities.len(),
            mines: to_feature_collection(mines),
            localities: to_feature_collection(localities),
            buffers: to_feature_collection(&result.buffers),
            affected_localities: to_feature_collection(&result.affected_localities),
            detailed_match: to_feature_collection(&result.detailed_match),
            global_stats: result.global_stats,
            per_mine_stats: result.per_mine_stats,
            message,
        }
    }
}

/// Filters the shared layers and runs one impact computation.
pub fn run_query(state: &AppState, params: &ImpactParams) -> crate::error::Result<ImpactResponse> {
    let radius_km = params.radius_km.unwrap_or(state.default_radius_km);
    let (mines, localities) = params.filter().apply(&state.mines, &state.localities);
    let result = calculate_impact_with(&state.options, &mines, &localities, radius_km)?;
    Ok(ImpactResponse::new(radius_km, &mines, &localities, result))
}

pub fn router(state: Arc<AppState>, static_dir: Option<&std::path::Path>) -> Router {
    let app = Router::new()
        .route("/api/impact", get(impact_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    match static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    }
}

pub async fn start_server(
    config: AppConfig,
    mines: Layer<Mine>,
    localities: Layer<Locality>,
) -> Result<()> {
    let state = Arc::new(AppState {
        mines,
        localities,
        options: config.analysis.impact_options()?,
        default_radius_km: config.analysis.radius_km,
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    info!("Starting server on http://{}", addr);

    let app = router(state, config.server.static_dir.as_deref());
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn impact_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ImpactParams>,
) -> Result<Json<ImpactResponse>, (StatusCode, String)> {
    // CPU-bound, keep it off the async workers.
    let joined = tokio::task::spawn_blocking(move || run_query(&state, &params)).await;

    match joined {
        Ok(Ok(response)) => Ok(Json(response)),
        Ok(Err(e)) => {
            error!("Impact computation failed: {}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
        Err(e) => {
            error!("Impact task panicked: {}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "impact task failed".to_string()))
        }
    }
}
