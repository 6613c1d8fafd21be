//! Page extractors for the benchmark leaderboard and the refurbished-Mac
//! listing grid, plus the attribute parsers they share.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use rmvf_core::{BenchmarkRecord, ListingRecord, ScoreCategory};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

pub const CRATE_NAME: &str = "rmvf-extract";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{0}")]
    Selector(String),
}

static SIZE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+\.\d+|\d+)-inch").expect("SIZE_TOKEN regex"));
static CLOCK_GHZ: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)@ ([0-9.]+)\s*GHz").expect("CLOCK_GHZ regex"));
static CPU_CORES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*CPU cores").expect("CPU_CORES regex"));
static GPU_CORES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*GPU cores").expect("GPU_CORES regex"));
static ANY_CORES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*cores").expect("ANY_CORES regex"));
static PAREN_GROUPS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^)]*\)").expect("PAREN_GROUPS regex"));
static FIRST_PAREN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^)]+)\)").expect("FIRST_PAREN regex"));
static COMMA_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*").expect("COMMA_RUN regex"));
// Retail names write core counts with a non-breaking hyphen (U+2011); plain
// ASCII hyphens appear in some locales.
static CPU_CORE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)[‑-]Core CPU").expect("CPU_CORE_TOKEN regex"));
static GPU_CORE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)[‑-]Core GPU").expect("GPU_CORE_TOKEN regex"));

fn parse_selector(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector)
        .map_err(|e| ExtractError::Selector(format!("selector `{selector}`: {e}")))
}

fn text_or_none(value: String) -> Option<String> {
    let trimmed = value.trim().to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn normalize_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .and_then(|node| text_or_none(normalize_ws(&node.text().collect::<String>())))
}

fn first_attr(scope: ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    scope
        .select(selector)
        .next()
        .and_then(|node| node.value().attr(attr))
        .and_then(|value| text_or_none(value.to_string()))
}

fn capture_u32(regex: &Regex, text: &str) -> Option<u32> {
    regex
        .captures(text)?
        .get(1)
        .and_then(|m| m.as_str().parse().ok())
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}

fn strip_prefix_ignore_ascii_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}

/// Resolves `href` against the page it was scraped from.
pub fn resolve_url(page_url: &str, href: &str) -> Option<String> {
    let base = Url::parse(page_url).ok()?;
    base.join(href.trim())
        .ok()
        .map(|resolved| resolved.to_string())
}

/// Processor family from a leaderboard description line: everything before
/// the first `@`.
pub fn processor_before_at(description: &str) -> Option<String> {
    let at = description.find('@')?;
    Some(description[..at].trim().to_string())
}

/// Clock speed from a `@ <n> GHz` token in a leaderboard description.
pub fn clock_speed_ghz(description: &str) -> Option<f64> {
    CLOCK_GHZ
        .captures(description)?
        .get(1)
        .and_then(|m| m.as_str().parse().ok())
}

/// CPU/GPU core counts accumulated across leaderboard rows. Rows whose
/// description carries no core information reuse the previous row's counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoreCounts {
    pub cpu: u32,
    pub gpu: u32,
}

/// Advances the core-count accumulator with one description line. A bare
/// `<n> cores` token (no CPU/GPU qualifier) sets the CPU count and resets
/// the GPU count to zero.
pub fn core_counts(description: &str, previous: CoreCounts) -> CoreCounts {
    let cpu = capture_u32(&CPU_CORES, description);
    let gpu = capture_u32(&GPU_CORES, description);

    let mut counts = previous;
    if let Some(value) = cpu {
        counts.cpu = value;
    }
    if let Some(value) = gpu {
        counts.gpu = value;
    }
    if cpu.is_none() && gpu.is_none() {
        if let Some(value) = capture_u32(&ANY_CORES, description) {
            counts = CoreCounts { cpu: value, gpu: 0 };
        }
    }
    counts
}

/// Product family from a leaderboard name: the name with every
/// parenthesized group removed.
pub fn strip_parenthesized(name: &str) -> String {
    PAREN_GROUPS.replace_all(name, "").trim().to_string()
}

/// Display size and model trim split out of the first parenthesized group
/// of a leaderboard name, e.g. `MacBook Pro (13-inch, M1, 2020)`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SizeAndModel {
    pub size_inches: Option<f64>,
    pub model: String,
}

pub fn size_and_model(name: &str) -> SizeAndModel {
    let Some(captures) = FIRST_PAREN.captures(name) else {
        return SizeAndModel::default();
    };
    let suffix = captures.get(1).map_or("", |m| m.as_str());

    match SIZE_TOKEN.captures(suffix) {
        Some(size) => {
            let size_inches = size.get(1).and_then(|m| m.as_str().parse().ok());
            let without_size = SIZE_TOKEN.replace(suffix, "");
            let model = COMMA_RUN.replace(&without_size, "").trim().to_string();
            SizeAndModel { size_inches, model }
        }
        None => SizeAndModel {
            size_inches: None,
            model: suffix.trim().to_string(),
        },
    }
}

/// First `<n>-inch` token anywhere in the text.
pub fn size_token(text: &str) -> Option<f64> {
    SIZE_TOKEN
        .captures(text)?
        .get(1)
        .and_then(|m| m.as_str().parse().ok())
}

/// Removes every `<n>-inch` token from a retail name.
pub fn strip_size_tokens(name: &str) -> String {
    SIZE_TOKEN.replace_all(name, "").trim().to_string()
}

/// Product family from a retail name: the text between an optional
/// `Refurbished` qualifier and the `Apple` chip phrase, after size tokens
/// are removed. `None` when the name has no `Apple` token at all.
pub fn listing_product_family(name: &str) -> Option<String> {
    let cleaned = strip_size_tokens(name);
    let mut scope = cleaned.as_str();
    if let Some(rest) = strip_prefix_ignore_ascii_case(scope, "Refurbished") {
        if rest.starts_with(char::is_whitespace) {
            scope = rest.trim_start();
        }
    }
    let apple = find_ignore_ascii_case(scope, "Apple")?;
    Some(scope[..apple].trim().to_string())
}

pub fn listing_cpu_cores(name: &str) -> Option<u32> {
    capture_u32(&CPU_CORE_TOKEN, name)
}

pub fn listing_gpu_cores(name: &str) -> Option<u32> {
    capture_u32(&GPU_CORE_TOKEN, name)
}

/// Chip phrase from a retail name: the `Apple …` text sitting between the
/// product family and the ` Chip with` marker.
pub fn listing_processor(name: &str, family: &str) -> Option<String> {
    let marker = format!("{family} Apple");
    for (start, _) in name.match_indices(&marker) {
        let chip = &name[start + family.len() + 1..];
        let Some(end) = chip.find(" Chip with") else {
            continue;
        };
        let candidate = chip[..end].trim();
        if candidate.starts_with("Apple ") {
            return Some(candidate.to_string());
        }
    }
    None
}

/// Numeric price from a displayed price string: non-numeric characters are
/// dropped, then the leading decimal run is read. `0.0` when nothing
/// parseable remains.
pub fn parse_price(text: &str) -> f64 {
    let filtered: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let mut leading = String::new();
    let mut seen_dot = false;
    for ch in filtered.chars() {
        if ch == '.' {
            if seen_dot {
                break;
            }
            seen_dot = true;
        }
        leading.push(ch);
    }
    leading.parse().unwrap_or(0.0)
}

/// Leaderboard score cell: leading digit run with thousands separators
/// stripped. `None` for an empty or non-numeric cell.
pub fn parse_score(text: &str) -> Option<u32> {
    let digits: String = text
        .trim()
        .chars()
        .filter(|c| *c != ',')
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

/// Parses the benchmark leaderboard page. Each category table is walked in
/// order; rows sharing a machine URL merge into one record carrying one
/// score per category. Rows without a URL merge with each other.
pub fn parse_benchmark_page(
    html: &str,
    page_url: &str,
) -> Result<Vec<BenchmarkRecord>, ExtractError> {
    let document = Html::parse_document(html);
    let name_sel = parse_selector("td.name > a")?;
    let description_sel = parse_selector("td.name > div.description")?;
    let score_sel = parse_selector("td.score")?;

    let mut records: Vec<BenchmarkRecord> = Vec::new();
    let mut index_by_url: HashMap<Option<String>, usize> = HashMap::new();
    let mut cores = CoreCounts::default();

    for category in ScoreCategory::ALL {
        let row_sel = parse_selector(&format!(
            "#{} .table-wrapper #mac > tbody > tr",
            category.section_id()
        ))?;

        for row in document.select(&row_sel) {
            let name = first_text(row, &name_sel).unwrap_or_default();
            let description = first_text(row, &description_sel).unwrap_or_default();
            let url = first_attr(row, &name_sel, "href")
                .and_then(|href| resolve_url(page_url, &href));
            let score = first_text(row, &score_sel).and_then(|text| parse_score(&text));

            cores = core_counts(&description, cores);

            if let Some(&existing) = index_by_url.get(&url) {
                records[existing].set_score(category, score);
                continue;
            }

            let SizeAndModel { size_inches, model } = size_and_model(&name);
            let mut record = BenchmarkRecord {
                id: Uuid::new_v4(),
                product_family: strip_parenthesized(&name),
                processor: processor_before_at(&description)
                    .unwrap_or_else(|| "Unknown".to_string()),
                clock_ghz: clock_speed_ghz(&description).unwrap_or(-1.0),
                cpu_cores: cores.cpu,
                gpu_cores: cores.gpu,
                size_inches,
                model,
                name,
                description,
                url: url.clone(),
                single_core: None,
                multi_core: None,
                opencl: None,
                metal: None,
            };
            record.set_score(category, score);
            index_by_url.insert(url, records.len());
            records.push(record);
        }
    }

    Ok(records)
}

/// Parses the refurbished-Mac listing grid. Every grid item becomes a
/// record; items that fail attribute parsing keep `Unknown`/zero defaults
/// rather than being dropped.
pub fn parse_listing_page(
    html: &str,
    page_url: &str,
) -> Result<Vec<ListingRecord>, ExtractError> {
    let document = Html::parse_document(html);
    let item_sel = parse_selector(".rf-refurb-category-grid-no-js ul li")?;
    let name_sel = parse_selector("h3 a")?;
    let price_sel = parse_selector(".as-price-currentprice")?;

    let mut records = Vec::new();
    for item in document.select(&item_sel) {
        let name = first_text(item, &name_sel).unwrap_or_default();
        let price_text = first_text(item, &price_sel).unwrap_or_default();
        let url = first_attr(item, &name_sel, "href")
            .and_then(|href| resolve_url(page_url, &href));
        let product_family =
            listing_product_family(&name).unwrap_or_else(|| "Unknown".to_string());
        let processor =
            listing_processor(&name, &product_family).unwrap_or_else(|| "Unknown".to_string());

        records.push(ListingRecord {
            id: Uuid::new_v4(),
            price: parse_price(&price_text),
            size_inches: size_token(&name),
            cpu_cores: listing_cpu_cores(&name).unwrap_or(0),
            gpu_cores: listing_gpu_cores(&name).unwrap_or(0),
            product_family,
            processor,
            url,
            name,
            price_text,
        });
    }

    Ok(records)
}

fn first_meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .and_then(|node| node.value().attr("content"))
        .and_then(|content| text_or_none(content.to_string()))
}

/// Pulls the page description from a product detail page, preferring the
/// standard meta description over the Open Graph one.
pub fn extract_meta_description(html: &str) -> Result<Option<String>, ExtractError> {
    let document = Html::parse_document(html);
    let named = parse_selector(r#"head meta[name="description"]"#)?;
    let open_graph = parse_selector(r#"meta[property="og:description"]"#)?;

    Ok(first_meta_content(&document, &named)
        .or_else(|| first_meta_content(&document, &open_graph)))
}
