use std::collections::{BTreeMap, HashMap};
use std::env;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use alignment_engine::{
    aggregate_daily, compute_derived_series, compute_window_metrics, dominant_label,
    period_return_pct, rolling_metrics, round_four, sentiment_trend, DerivedSeries,
    Interpretation, ScoredHeadline, SentimentTrend, WindowMetrics, WindowedMetrics,
};
use chart_geom::{build_misalignment_map, MisalignmentMap};
use sentiment_core::{DailyRecord, DailySentiment, DailyWindow, PricePoint, SentimentLabel};

const BIND_ADDR_ENV: &str = "DASHBOARD_BIND_ADDR";
const DEMO_TICKER_ENV: &str = "DEMO_TICKER";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_PERIOD_DAYS: usize = 7;
const MAX_PERIOD_DAYS: usize = 365;
const DEMO_WINDOW_DAYS: usize = 60;

#[derive(Debug, Error)]
enum ApiError {
    #[error("unknown ticker: {0}")]
    UnknownTicker(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::UnknownTicker(_) => StatusCode::NOT_FOUND,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Sentiment and price history for one tracked ticker.
#[derive(Debug, Default, Clone)]
struct TickerWindow {
    sentiment: DailyWindow<DailySentiment>,
    prices: DailyWindow<PricePoint>,
}

impl TickerWindow {
    /// Join the trailing `days` of both windows into per-day records,
    /// aligned on the date key.
    fn records(&self, days: usize) -> Vec<DailyRecord> {
        let mut by_date: BTreeMap<String, DailyRecord> = BTreeMap::new();
        for s in self.sentiment.tail(days) {
            by_date
                .entry(s.date.clone())
                .or_insert_with(|| DailyRecord::new(s.date.clone()))
                .sentiment = Some(s.avg_score);
        }
        for p in self.prices.tail(days) {
            let record = by_date
                .entry(p.date.clone())
                .or_insert_with(|| DailyRecord::new(p.date.clone()));
            record.close = p.close;
            record.volume = p.volume;
        }
        let mut records: Vec<DailyRecord> = by_date.into_values().collect();
        if records.len() > days {
            records.drain(..records.len() - days);
        }
        records
    }
}

#[derive(Clone)]
struct ServerState {
    tickers: Arc<Mutex<HashMap<String, TickerWindow>>>,
}

// ---------- wire types -------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PeriodParams {
    period: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetricsParams {
    period: Option<String>,
    window: Option<String>,
}

/// Batch upload of already-computed daily data. Acquisition and scoring
/// happen upstream; this is the only write path. Scored headlines are
/// aggregated into daily sentiment on arrival.
#[derive(Debug, Deserialize)]
struct IngestBatch {
    #[serde(default)]
    headlines: Vec<ScoredHeadline>,
    #[serde(default)]
    sentiment: Vec<DailySentiment>,
    #[serde(default)]
    prices: Vec<PricePoint>,
}

#[derive(Debug, Serialize)]
struct IngestReceipt {
    ticker: String,
    sentiment_days: usize,
    price_days: usize,
}

#[derive(Debug, Serialize)]
struct SentimentSummary {
    current_score: f64,
    trend: SentimentTrend,
    dominant_label: SentimentLabel,
}

#[derive(Debug, Serialize)]
struct PriceSummary {
    current_price: Option<f64>,
    period_return: f64,
}

#[derive(Debug, Serialize)]
struct AlignmentSummary {
    score: f64,
    misalignment_days: u32,
    interpretation: Interpretation,
}

/// Per-day sentiment-vs-price verdict for the dashboard table.
#[derive(Debug, Serialize)]
struct AlignmentMetric {
    date: String,
    sentiment_score: f64,
    /// Day-over-day return in percent.
    price_return: f64,
    /// True when the day's sentiment agreed with the price direction.
    aligned: bool,
    alignment_score: f64,
}

#[derive(Debug, Serialize)]
struct DailyEntry {
    date: String,
    sentiment: Option<DailySentiment>,
    price: Option<PricePoint>,
    alignment: AlignmentMetric,
}

#[derive(Debug, Serialize)]
struct DashboardData {
    ticker: String,
    period: String,
    sentiment_summary: SentimentSummary,
    price_summary: PriceSummary,
    alignment: AlignmentSummary,
    daily_data: Vec<DailyEntry>,
}

#[derive(Debug, Serialize)]
struct MetricsResponse {
    ticker: String,
    period: String,
    window_days: usize,
    windows: Vec<WindowedMetrics>,
}

#[derive(Debug, Serialize)]
struct MapResponse {
    ticker: String,
    period: String,
    map: MisalignmentMap,
    series: DerivedSeries,
}

// ---------- assembly ---------------------------------------------------------

/// Parse "7d" / "30d" style period strings; bare numbers also work.
/// Anything else falls back to the default window.
fn parse_period_days(period: Option<&str>) -> usize {
    let Some(raw) = period else {
        return DEFAULT_PERIOD_DAYS;
    };
    let trimmed = raw.trim().trim_end_matches(['d', 'D']);
    match trimmed.parse::<usize>() {
        Ok(days) if days >= 1 => days.min(MAX_PERIOD_DAYS),
        _ => DEFAULT_PERIOD_DAYS,
    }
}

fn whole_window_metrics(series: &DerivedSeries) -> WindowMetrics {
    let pairs = series.paired_days();
    let sentiments: Vec<f64> = pairs.iter().map(|p| p.sentiment).collect();
    let returns: Vec<f64> = pairs.iter().map(|p| p.price_return).collect();
    compute_window_metrics(&sentiments, &returns)
}

fn build_dashboard(ticker: &str, window: &TickerWindow, days: usize) -> DashboardData {
    let records = window.records(days);
    let series = compute_derived_series(&records);
    let metrics = whole_window_metrics(&series);

    let sentiment_days: Vec<DailySentiment> = window.sentiment.tail(days).to_vec();
    let scores: Vec<f64> = sentiment_days.iter().map(|d| d.avg_score).collect();
    let closes: Vec<Option<f64>> = records.iter().map(|r| r.close).collect();

    let sentiment_by_date: HashMap<&str, &DailySentiment> = sentiment_days
        .iter()
        .map(|d| (d.date.as_str(), d))
        .collect();
    let price_by_date: HashMap<&str, &PricePoint> = window
        .prices
        .tail(days)
        .iter()
        .map(|p| (p.date.as_str(), p))
        .collect();

    let daily_data = series
        .dates
        .iter()
        .enumerate()
        .map(|(i, date)| DailyEntry {
            date: date.clone(),
            sentiment: sentiment_by_date.get(date.as_str()).map(|d| (*d).clone()),
            price: price_by_date.get(date.as_str()).map(|p| (*p).clone()),
            alignment: AlignmentMetric {
                date: date.clone(),
                sentiment_score: series.sentiment[i],
                price_return: round_four(series.price_returns[i] * 100.0),
                aligned: series.alignment[i] > 0.0,
                alignment_score: series.alignment[i],
            },
        })
        .collect();

    DashboardData {
        ticker: ticker.to_string(),
        period: format!("{days}d"),
        sentiment_summary: SentimentSummary {
            current_score: scores.last().copied().unwrap_or(0.0),
            trend: sentiment_trend(&scores),
            dominant_label: dominant_label(&sentiment_days),
        },
        price_summary: PriceSummary {
            current_price: closes.iter().flatten().last().copied(),
            period_return: period_return_pct(&closes),
        },
        alignment: AlignmentSummary {
            score: metrics.alignment_score,
            misalignment_days: metrics.misalignment_days,
            interpretation: metrics.interpretation,
        },
        daily_data,
    }
}

// ---------- demo data --------------------------------------------------------

/// Seed a random-walk demo window so the endpoints answer before any real
/// ingestion happens. Fixed seed: restarts serve the same demo series.
fn demo_window(days: usize) -> TickerWindow {
    let mut rng = StdRng::seed_from_u64(0x5EED);
    let today = Utc::now().date_naive();
    let mut close = 420.0_f64;
    let mut score = 0.1_f64;

    let mut sentiment = Vec::with_capacity(days);
    let mut prices = Vec::with_capacity(days);
    for offset in (0..days).rev() {
        let date = (today - Duration::days(offset as i64))
            .format("%Y-%m-%d")
            .to_string();

        close = (close * (1.0 + rng.gen_range(-0.025..0.025))).max(1.0);
        score = (score + rng.gen_range(-0.25..0.25)).clamp(-1.0, 1.0);

        let article_count = rng.gen_range(3..25u32);
        let positive = (((score + 1.0) / 2.0) * article_count as f64).round() as u32;
        let positive = positive.min(article_count);
        let negative = rng.gen_range(0..=(article_count - positive));
        sentiment.push(DailySentiment {
            date: date.clone(),
            avg_score: round_four(score),
            article_count,
            positive_count: positive,
            neutral_count: article_count - positive - negative,
            negative_count: negative,
        });

        prices.push(PricePoint {
            date,
            open: Some((close * 0.995 * 100.0).round() / 100.0),
            high: Some((close * 1.01 * 100.0).round() / 100.0),
            low: Some((close * 0.99 * 100.0).round() / 100.0),
            close: Some((close * 100.0).round() / 100.0),
            volume: Some(rng.gen_range(200_000.0_f64..2_000_000.0).round()),
        });
    }

    TickerWindow {
        sentiment: DailyWindow::from_unsorted(sentiment),
        prices: DailyWindow::from_unsorted(prices),
    }
}

// ---------- handlers ---------------------------------------------------------

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn dashboard_handler(
    State(state): State<ServerState>,
    Path(ticker): Path<String>,
    Query(params): Query<PeriodParams>,
) -> Result<Json<DashboardData>, ApiError> {
    let ticker = ticker.to_ascii_uppercase();
    let days = parse_period_days(params.period.as_deref());
    let tickers = state.tickers.lock().unwrap();
    let window = tickers
        .get(&ticker)
        .ok_or_else(|| ApiError::UnknownTicker(ticker.clone()))?;
    Ok(Json(build_dashboard(&ticker, window, days)))
}

async fn map_handler(
    State(state): State<ServerState>,
    Path(ticker): Path<String>,
    Query(params): Query<PeriodParams>,
) -> Result<Json<MapResponse>, ApiError> {
    let ticker = ticker.to_ascii_uppercase();
    let days = parse_period_days(params.period.as_deref());
    let tickers = state.tickers.lock().unwrap();
    let window = tickers
        .get(&ticker)
        .ok_or_else(|| ApiError::UnknownTicker(ticker.clone()))?;

    let series = compute_derived_series(&window.records(days));
    let map = build_misalignment_map(&series);
    Ok(Json(MapResponse {
        ticker,
        period: format!("{days}d"),
        map,
        series,
    }))
}

async fn metrics_handler(
    State(state): State<ServerState>,
    Path(ticker): Path<String>,
    Query(params): Query<MetricsParams>,
) -> Result<Json<MetricsResponse>, ApiError> {
    let ticker = ticker.to_ascii_uppercase();
    let days = parse_period_days(params.period.as_deref());
    let window_days = parse_period_days(params.window.as_deref());
    let tickers = state.tickers.lock().unwrap();
    let window = tickers
        .get(&ticker)
        .ok_or_else(|| ApiError::UnknownTicker(ticker.clone()))?;

    let series = compute_derived_series(&window.records(days));
    let windows = rolling_metrics(&series.paired_days(), window_days);
    Ok(Json(MetricsResponse {
        ticker,
        period: format!("{days}d"),
        window_days,
        windows,
    }))
}

async fn ingest_handler(
    State(state): State<ServerState>,
    Path(ticker): Path<String>,
    Json(batch): Json<IngestBatch>,
) -> (StatusCode, Json<IngestReceipt>) {
    let ticker = ticker.to_ascii_uppercase();
    let sentiment_days = batch.sentiment.len();
    let price_days = batch.prices.len();

    let aggregated = aggregate_daily(&batch.headlines);
    let sentiment_days = sentiment_days + aggregated.len();

    let mut tickers = state.tickers.lock().unwrap();
    let window = tickers.entry(ticker.clone()).or_default();
    for day in aggregated.into_iter().chain(batch.sentiment) {
        window.sentiment.upsert(day);
    }
    for day in batch.prices {
        window.prices.upsert(day);
    }
    tracing::info!(%ticker, sentiment_days, price_days, "ingested daily batch");

    (
        StatusCode::ACCEPTED,
        Json(IngestReceipt {
            ticker,
            sentiment_days,
            price_days,
        }),
    )
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let demo_ticker = env::var(DEMO_TICKER_ENV)
        .unwrap_or_else(|_| "DEMO".to_string())
        .to_ascii_uppercase();
    let mut tickers = HashMap::new();
    tickers.insert(demo_ticker.clone(), demo_window(DEMO_WINDOW_DAYS));

    let state = ServerState {
        tickers: Arc::new(Mutex::new(tickers)),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/dashboard/:ticker", get(dashboard_handler))
        .route("/api/map/:ticker", get(map_handler))
        .route("/api/metrics/:ticker", get(metrics_handler))
        .route("/api/tickers/:ticker", axum::routing::post(ingest_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr = env::var(BIND_ADDR_ENV).unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("bind {addr}: {e}"));
    tracing::info!(%addr, ticker = %demo_ticker, "dashboard backend listening");
    axum::serve(listener, app).await.expect("server failed");
}
