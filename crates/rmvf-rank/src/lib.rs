//! Correlation and ranking pipeline: joins benchmark records against refurb
//! listings, computes points-per-dollar, writes the JSON reports, and runs
//! the detail-enrichment pass.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rmvf_core::{BenchmarkRecord, ListingRecord, RankedEntry};
use rmvf_extract::{extract_meta_description, parse_benchmark_page, parse_listing_page};
use rmvf_storage::{HttpClientConfig, HttpFetcher, JsonStore, PageFetcher};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

pub const CRATE_NAME: &str = "rmvf-rank";

pub const BENCHMARK_REPORT: &str = "source/geekbench.json";
pub const LISTING_REPORT: &str = "source/apple.json";
pub const RANKED_REPORT: &str = "merged/sorted.json";
pub const DETAILED_REPORT: &str = "merged/details.json";

/// Which benchmark number feeds the value metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreAggregate {
    /// Single-core score, with an absent score counting zero.
    #[default]
    SingleCore,
    /// Sum of all four category scores.
    Combined,
}

impl ScoreAggregate {
    pub fn from_env_value(value: &str) -> Self {
        if value.eq_ignore_ascii_case("combined") {
            ScoreAggregate::Combined
        } else {
            ScoreAggregate::SingleCore
        }
    }

    fn score_of(self, benchmark: &BenchmarkRecord) -> u32 {
        match self {
            ScoreAggregate::SingleCore => benchmark.single_core.unwrap_or(0),
            ScoreAggregate::Combined => benchmark.combined_score(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RankOptions {
    /// Only rank listings whose product family equals this value.
    pub family_filter: Option<String>,
    pub metric: ScoreAggregate,
    /// When a listing matches no benchmark on the full attribute set, retry
    /// on processor and core counts alone.
    pub relaxed_fallback: bool,
}

fn matches_strict(listing: &ListingRecord, benchmark: &BenchmarkRecord) -> bool {
    benchmark.product_family == listing.product_family
        && benchmark.size_inches == listing.size_inches
        && benchmark.processor == listing.processor
        && benchmark.cpu_cores == listing.cpu_cores
        && benchmark.gpu_cores == listing.gpu_cores
}

fn matches_relaxed(listing: &ListingRecord, benchmark: &BenchmarkRecord) -> bool {
    listing.processor != "Unknown"
        && benchmark.processor == listing.processor
        && benchmark.cpu_cores == listing.cpu_cores
        && benchmark.gpu_cores == listing.gpu_cores
}

/// Score-per-price rounded to two decimals. Zero for unpriced listings.
pub fn points_per_dollar(score: u32, price: f64) -> f64 {
    if price <= 0.0 {
        return 0.0;
    }
    (score as f64 / price * 100.0).round() / 100.0
}

fn entry_for(
    listing: &ListingRecord,
    benchmark: Option<&BenchmarkRecord>,
    metric: ScoreAggregate,
) -> RankedEntry {
    let score = benchmark.map(|b| metric.score_of(b)).unwrap_or(0);
    RankedEntry {
        name: listing.name.clone(),
        price: listing.price_text.clone(),
        description: None,
        listing_url: listing.url.clone(),
        benchmark_url: benchmark.and_then(|b| b.url.clone()),
        points_per_dollar: points_per_dollar(score, listing.price),
    }
}

/// Joins every listing against the benchmark records and sorts the result
/// by points-per-dollar, descending. Each matching benchmark yields one
/// entry; listings that match nothing still appear with a zero metric, so
/// the ranking always accounts for every listing that passed the family
/// filter. The sort is stable, which keeps tied entries in listing order.
pub fn rank(
    benchmarks: &[BenchmarkRecord],
    listings: &[ListingRecord],
    options: &RankOptions,
) -> Vec<RankedEntry> {
    let mut entries = Vec::new();

    for listing in listings {
        if let Some(filter) = &options.family_filter {
            if listing.product_family != *filter {
                continue;
            }
        }

        let before = entries.len();
        for benchmark in benchmarks.iter().filter(|b| matches_strict(listing, b)) {
            entries.push(entry_for(listing, Some(benchmark), options.metric));
        }

        if entries.len() == before && options.relaxed_fallback {
            for benchmark in benchmarks.iter().filter(|b| matches_relaxed(listing, b)) {
                entries.push(entry_for(listing, Some(benchmark), options.metric));
            }
        }

        if entries.len() == before {
            entries.push(entry_for(listing, None, options.metric));
        }
    }

    entries.sort_by(|a, b| b.points_per_dollar.total_cmp(&a.points_per_dollar));
    entries
}

#[derive(Debug, Clone)]
pub struct Config {
    pub benchmark_url: String,
    pub listing_url: String,
    pub data_dir: PathBuf,
    pub user_agent: String,
    pub http_timeout_secs: u64,
    pub rank: RankOptions,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            benchmark_url: std::env::var("RMVF_BENCHMARK_URL")
                .unwrap_or_else(|_| "https://browser.geekbench.com/mac-benchmarks".to_string()),
            listing_url: std::env::var("RMVF_LISTING_URL")
                .unwrap_or_else(|_| "https://www.apple.com/shop/refurbished/mac".to_string()),
            data_dir: std::env::var("RMVF_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            user_agent: std::env::var("RMVF_USER_AGENT")
                .unwrap_or_else(|_| "rmvf-bot/0.1".to_string()),
            http_timeout_secs: std::env::var("RMVF_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            rank: RankOptions {
                family_filter: std::env::var("RMVF_FAMILY_FILTER")
                    .ok()
                    .filter(|v| !v.is_empty()),
                metric: std::env::var("RMVF_METRIC")
                    .map(|v| ScoreAggregate::from_env_value(&v))
                    .unwrap_or_default(),
                relaxed_fallback: std::env::var("RMVF_RELAXED_MATCH")
                    .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "True"))
                    .unwrap_or(false),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub benchmark_records: usize,
    pub listing_records: usize,
    pub ranked_entries: usize,
    pub data_dir: String,
}

pub struct Pipeline {
    config: Config,
    store: JsonStore,
    fetcher: Box<dyn PageFetcher>,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self> {
        let store = JsonStore::new(config.data_dir.clone());
        let fetcher = HttpFetcher::new(HttpClientConfig {
            timeout: Duration::from_secs(config.http_timeout_secs),
            user_agent: Some(config.user_agent.clone()),
        })?;
        Ok(Self {
            config,
            store,
            fetcher: Box::new(fetcher),
        })
    }

    pub fn with_fetcher(mut self, fetcher: Box<dyn PageFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Runs one full scrape-rank-enrich cycle. A failed source degrades to
    /// an empty record set; the run itself only fails on report I/O.
    pub async fn run_once(&self) -> Result<RunSummary> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        info!(
            %run_id,
            benchmark_url = %self.config.benchmark_url,
            listing_url = %self.config.listing_url,
            "starting value-ranking run"
        );

        let benchmarks = self.scrape_benchmarks().await;
        let listings = self.scrape_listings().await;
        info!(
            benchmarks = benchmarks.len(),
            listings = listings.len(),
            "extracted source records"
        );

        self.store.write_pretty(BENCHMARK_REPORT, &benchmarks).await?;
        self.store.write_pretty(LISTING_REPORT, &listings).await?;

        let ranked = rank(&benchmarks, &listings, &self.config.rank);
        self.store.write_pretty(RANKED_REPORT, &ranked).await?;

        let detailed = self.enrich(ranked).await;
        self.store.write_pretty(DETAILED_REPORT, &detailed).await?;

        let finished_at = Utc::now();
        Ok(RunSummary {
            run_id,
            started_at,
            finished_at,
            benchmark_records: benchmarks.len(),
            listing_records: listings.len(),
            ranked_entries: detailed.len(),
            data_dir: self.store.root().display().to_string(),
        })
    }

    /// Re-runs the detail pass over a previously written ranked report.
    pub async fn enrich_existing(&self) -> Result<usize> {
        let ranked: Vec<RankedEntry> = self.store.read_json(RANKED_REPORT).await?;
        let detailed = self.enrich(ranked).await;
        self.store.write_pretty(DETAILED_REPORT, &detailed).await?;
        Ok(detailed.len())
    }

    /// Fills every entry's description from its listing page, sequentially.
    /// Entries whose page cannot be fetched or parsed get an empty string.
    pub async fn enrich(&self, mut entries: Vec<RankedEntry>) -> Vec<RankedEntry> {
        for entry in &mut entries {
            entry.description = Some(self.fetch_description(entry.listing_url.as_deref()).await);
        }
        entries
    }

    async fn scrape_benchmarks(&self) -> Vec<BenchmarkRecord> {
        let url = &self.config.benchmark_url;
        let html = match self.fetcher.fetch_text(url).await {
            Ok(html) => html,
            Err(err) => {
                warn!(%url, error = %err, "benchmark fetch failed; ranking proceeds without benchmark data");
                return Vec::new();
            }
        };
        match parse_benchmark_page(&html, url) {
            Ok(records) => records,
            Err(err) => {
                warn!(%url, error = %err, "benchmark parse failed; ranking proceeds without benchmark data");
                Vec::new()
            }
        }
    }

    async fn scrape_listings(&self) -> Vec<ListingRecord> {
        let url = &self.config.listing_url;
        let html = match self.fetcher.fetch_text(url).await {
            Ok(html) => html,
            Err(err) => {
                warn!(%url, error = %err, "listing fetch failed; ranking proceeds without listings");
                return Vec::new();
            }
        };
        match parse_listing_page(&html, url) {
            Ok(records) => records,
            Err(err) => {
                warn!(%url, error = %err, "listing parse failed; ranking proceeds without listings");
                Vec::new()
            }
        }
    }

    async fn fetch_description(&self, listing_url: Option<&str>) -> String {
        let Some(url) = listing_url else {
            return String::new();
        };
        let html = match self.fetcher.fetch_text(url).await {
            Ok(html) => html,
            Err(err) => {
                warn!(%url, error = %err, "detail fetch failed; keeping empty description");
                return String::new();
            }
        };
        match extract_meta_description(&html) {
            Ok(Some(description)) => description,
            Ok(None) => String::new(),
            Err(err) => {
                warn!(%url, error = %err, "detail parse failed; keeping empty description");
                String::new()
            }
        }
    }
}

pub async fn run_once_from_env() -> Result<RunSummary> {
    let pipeline = Pipeline::new(Config::from_env())?;
    pipeline.run_once().await
}

pub async fn enrich_from_env() -> Result<usize> {
    let pipeline = Pipeline::new(Config::from_env())?;
    pipeline.enrich_existing().await
}
