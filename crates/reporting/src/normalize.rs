//! Record normalization — turns positional string rows from GA4 and Search
//! Console reports into typed records.
//!
//! A missing dimension or metric *position* is a [`PulseError::MalformedRow`].
//! A present-but-empty or unparseable numeric value is read as zero.

use chrono::NaiveDate;
use pulse_core::config::FunnelConfig;
use pulse_core::{PulseError, PulseResult, RawRow};
use tracing::{debug, warn};

use crate::records::{JourneyRecord, KeywordMetric, SessionRecord, GENERAL_CATEGORY};

/// Alternative journey separator accepted regardless of configuration.
const ASCII_ARROW: &str = "->";

/// A record type that can be built from one [`RawRow`].
pub trait NormalizeRow: Sized {
    /// Human-readable name used in log lines.
    const KIND: &'static str;

    /// Parse a single row. The error string becomes the
    /// [`PulseError::MalformedRow`] reason.
    fn from_raw(row: &RawRow, normalizer: &RecordNormalizer) -> Result<Self, String>;

    /// Batch-level post-processing once every row has been parsed.
    fn finish(_records: &mut [Self]) {}
}

/// Converts raw report rows into the typed record a call site asks for.
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    path_delimiter: String,
}

impl RecordNormalizer {
    pub fn new(funnel: &FunnelConfig) -> Self {
        Self {
            path_delimiter: funnel.path_delimiter.clone(),
        }
    }

    /// Normalize every row, failing on the first malformed one.
    pub fn normalize<T: NormalizeRow>(&self, rows: &[RawRow]) -> PulseResult<Vec<T>> {
        let mut records = rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                T::from_raw(row, self).map_err(|reason| PulseError::malformed(index, reason))
            })
            .collect::<PulseResult<Vec<T>>>()
            .inspect_err(|_| metrics::counter!("reporting.rows_rejected").increment(1))?;
        T::finish(&mut records);

        metrics::counter!("reporting.rows_normalized").increment(records.len() as u64);
        debug!(kind = T::KIND, rows = records.len(), "Rows normalized");
        Ok(records)
    }

    /// Normalize what can be normalized, skipping malformed rows.
    /// Returns the records and the number of rows that were dropped.
    pub fn normalize_lenient<T: NormalizeRow>(&self, rows: &[RawRow]) -> (Vec<T>, usize) {
        let mut rejected = 0usize;
        let mut records = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            match T::from_raw(row, self) {
                Ok(record) => records.push(record),
                Err(reason) => {
                    rejected += 1;
                    warn!(kind = T::KIND, row = index, %reason, "Skipping malformed row");
                }
            }
        }
        T::finish(&mut records);

        metrics::counter!("reporting.rows_normalized").increment(records.len() as u64);
        metrics::counter!("reporting.rows_rejected").increment(rejected as u64);
        debug!(kind = T::KIND, rows = records.len(), rejected, "Rows normalized");
        (records, rejected)
    }

    /// Split a journey string into trimmed, non-empty page identifiers.
    pub fn split_path(&self, path: &str) -> Vec<String> {
        path.split(self.path_delimiter.as_str())
            .flat_map(|segment| segment.split(ASCII_ARROW))
            .map(str::trim)
            .filter(|page| !page.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Default for RecordNormalizer {
    fn default() -> Self {
        Self::new(&FunnelConfig::default())
    }
}

// ─── Field access ───────────────────────────────────────────────────────────

fn dimension<'a>(row: &'a RawRow, index: usize, name: &str) -> Result<&'a str, String> {
    row.dimension(index)
        .ok_or_else(|| format!("missing dimension {index} ({name})"))
}

fn metric<'a>(row: &'a RawRow, index: usize, name: &str) -> Result<&'a str, String> {
    row.metric(index)
        .ok_or_else(|| format!("missing metric {index} ({name})"))
}

/// Non-negative decimal; empty, unparseable, negative and non-finite read as 0.
pub fn parse_amount(value: &str) -> f64 {
    match value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

/// Non-negative count; decimal strings are truncated.
pub fn parse_count(value: &str) -> u64 {
    parse_amount(value).trunc() as u64
}

/// Accepts GA4 `YYYYMMDD` as well as ISO `YYYY-MM-DD`.
pub fn parse_report_date(value: &str) -> Result<NaiveDate, String> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .map_err(|_| format!("invalid date '{value}'"))
}

// ─── Record impls ───────────────────────────────────────────────────────────

/// Dimensions `[date, campaignName, source, medium]`,
/// metrics `[sessions, totalUsers, conversions, totalRevenue]`.
impl NormalizeRow for SessionRecord {
    const KIND: &'static str = "session";

    fn from_raw(row: &RawRow, _normalizer: &RecordNormalizer) -> Result<Self, String> {
        Ok(Self {
            date: parse_report_date(dimension(row, 0, "date")?)?,
            campaign: dimension(row, 1, "campaignName")?.to_string(),
            source: dimension(row, 2, "source")?.to_string(),
            medium: dimension(row, 3, "medium")?.to_string(),
            sessions: parse_count(metric(row, 0, "sessions")?),
            users: parse_count(metric(row, 1, "totalUsers")?),
            conversions: parse_count(metric(row, 2, "conversions")?),
            revenue: parse_amount(metric(row, 3, "totalRevenue")?),
        })
    }
}

/// Dimensions `[journeyPath]`, metrics `[conversions, averageSessionDuration]`.
impl NormalizeRow for JourneyRecord {
    const KIND: &'static str = "journey";

    fn from_raw(row: &RawRow, normalizer: &RecordNormalizer) -> Result<Self, String> {
        Ok(Self {
            journey_path: normalizer.split_path(dimension(row, 0, "journeyPath")?),
            conversions: parse_count(metric(row, 0, "conversions")?),
            avg_duration: parse_amount(metric(row, 1, "averageSessionDuration")?),
        })
    }
}

/// Dimensions `[query]`, metrics `[clicks, impressions, ctr, position]`.
/// Ranks are assigned across the batch in [`NormalizeRow::finish`].
impl NormalizeRow for KeywordMetric {
    const KIND: &'static str = "keyword";

    fn from_raw(row: &RawRow, _normalizer: &RecordNormalizer) -> Result<Self, String> {
        let keyword = dimension(row, 0, "query")?.trim();
        if keyword.is_empty() {
            return Err("empty query".to_string());
        }
        Ok(Self {
            keyword: keyword.to_string(),
            rank: 0,
            clicks: parse_count(metric(row, 0, "clicks")?),
            impressions: parse_count(metric(row, 1, "impressions")?),
            ctr: parse_amount(metric(row, 2, "ctr")?).min(1.0),
            position: parse_amount(metric(row, 3, "position")?).max(1.0),
            category: GENERAL_CATEGORY.to_string(),
        })
    }

    fn finish(records: &mut [Self]) {
        assign_ranks(records);
    }
}

/// Rank by position ascending, then clicks descending, then input order.
pub fn assign_ranks(records: &mut [KeywordMetric]) {
    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by(|&a, &b| {
        records[a]
            .position
            .total_cmp(&records[b].position)
            .then_with(|| records[b].clicks.cmp(&records[a].clicks))
    });
    for (rank, index) in order.into_iter().enumerate() {
        records[index].rank = rank as u32 + 1;
    }
}
