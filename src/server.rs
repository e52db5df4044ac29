use crate::color::Color;
use crate::config::AppConfig;
use crate::error::EmptySelectionError;
use crate::html;
use crate::render::{render_map, RenderRequest};
use crate::types::{Attribute, ZoneRecord};
use crate::viewport::{self, LatLng};
use crate::wkt;
use crate::zones::{GroupSummary, ZoneTable};
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

/// Cache key: the request plus the dataset it was rendered from.
type CacheKey = (RenderRequest, u64);

/// Rendered pages kept in memory. Color overrides come from the query
/// string, so the cache must stay bounded.
const CACHE_CAPACITY: usize = 64;

pub struct AppState {
    pub table: ZoneTable,
    pub config: AppConfig,
    cache: Mutex<LruCache<CacheKey, Arc<str>>>,
}

impl AppState {
    pub fn new(config: AppConfig, table: ZoneTable) -> Self {
        AppState {
            table,
            config,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }
}

/// One zone with its decoded boundary summarised.
#[derive(Serialize)]
pub struct ZoneDetail<'a> {
    #[serde(flatten)]
    record: &'a ZoneRecord,
    wkt: Option<String>,
    centroid: Option<LatLng>,
    geometry_error: Option<String>,
}

impl<'a> ZoneDetail<'a> {
    fn new(record: &'a ZoneRecord) -> Self {
        match record.parse_geometry() {
            Ok(geometry) => ZoneDetail {
                record,
                wkt: Some(wkt::encode(&geometry)),
                centroid: viewport::centroid(&geometry).map(|p| LatLng { lat: p.y(), lng: p.x() }),
                geometry_error: None,
            },
            Err(err) => ZoneDetail {
                record,
                wkt: None,
                centroid: None,
                geometry_error: Some(err.to_string()),
            },
        }
    }
}

#[derive(Deserialize)]
pub struct MapParams {
    country: String,
    attribute: Option<Attribute>,
    low: Option<String>,
    high: Option<String>,
}

/// Tabular view of a zone, including zones left off the map.
#[derive(Serialize)]
pub struct ZoneRow<'a> {
    #[serde(flatten)]
    record: &'a ZoneRecord,
    geometry_error: Option<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/map", get(map_handler))
        .route("/api/countries", get(countries_handler))
        .route("/api/summary", get(summary_handler))
        .route("/api/zones/:country", get(zones_handler))
        .route("/api/zones/:country/:id", get(zone_detail_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, table: ZoneTable) -> Result<()> {
    let port = config.server.port;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let state = Arc::new(AppState::new(config, table));

    info!("serving zone maps on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(html::index_page(
        &state.table.available_groups(),
        &state.config.render.default_country,
    ))
}

async fn map_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MapParams>,
) -> Response {
    let parse = |color: Option<String>| color.map(|c| c.parse::<Color>()).transpose();
    let (low, high) = match (parse(params.low), parse(params.high)) {
        (Ok(low), Ok(high)) => (low, high),
        (Err(err), _) | (_, Err(err)) => {
            return (StatusCode::BAD_REQUEST, err.to_string()).into_response();
        }
    };
    let request = RenderRequest::new(params.country, params.attribute.unwrap_or(Attribute::Population))
        .with_colors(low, high);

    let rendered = tokio::task::spawn_blocking(move || render_cached(&state, request)).await;
    match rendered {
        Ok(Ok(page)) => Html(page.to_string()).into_response(),
        Ok(Err(err)) => (StatusCode::NOT_FOUND, Html(html::empty_page(&err.group))).into_response(),
        Err(err) => {
            error!(error = %err, "map rendering task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Composes a map once per request and dataset version.
fn render_cached(state: &AppState, request: RenderRequest) -> Result<Arc<str>, EmptySelectionError> {
    let key = (request, state.table.version());
    if let Some(page) = state
        .cache
        .lock()
        .ok()
        .and_then(|mut cache| cache.get(&key).cloned())
    {
        debug!(group = %key.0.group, attribute = %key.0.attribute, "map served from cache");
        return Ok(page);
    }

    let doc = render_map(&state.table, &key.0, &state.config.render)?;
    let page: Arc<str> = Arc::from(doc.to_html());
    if let Ok(mut cache) = state.cache.lock() {
        cache.put(key, page.clone());
    }
    Ok(page)
}

async fn countries_handler(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(
        state
            .table
            .available_groups()
            .into_iter()
            .map(str::to_string)
            .collect(),
    )
}

async fn summary_handler(State(state): State<Arc<AppState>>) -> Json<Vec<GroupSummary>> {
    Json(state.table.summaries())
}

async fn zones_handler(
    State(state): State<Arc<AppState>>,
    Path(country): Path<String>,
) -> Response {
    let rows: Vec<ZoneRow> = state
        .table
        .filter_by_group(&country)
        .into_iter()
        .map(|record| ZoneRow {
            record,
            geometry_error: record.parse_geometry().err().map(|e| e.to_string()),
        })
        .collect();
    Json(rows).into_response()
}

async fn zone_detail_handler(
    State(state): State<Arc<AppState>>,
    Path((country, id)): Path<(String, String)>,
) -> Response {
    match state.table.find(&country, &id) {
        Some(record) => Json(ZoneDetail::new(record)).into_response(),
        None => (StatusCode::NOT_FOUND, format!("no zone {} in {}", id, country)).into_response(),
    }
}
