//! Typed records produced by the [`RecordNormalizer`](crate::normalize::RecordNormalizer).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Category assigned to keywords that match no configured rule.
pub const GENERAL_CATEGORY: &str = "General";

/// One day of traffic for a campaign/source/medium combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub date: NaiveDate,
    #[serde(rename = "campaignName")]
    pub campaign: String,
    pub source: String,
    pub medium: String,
    pub sessions: u64,
    pub users: u64,
    pub conversions: u64,
    pub revenue: f64,
}

/// A converting page sequence, e.g. `Home → Product → Checkout`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyRecord {
    pub journey_path: Vec<String>,
    pub conversions: u64,
    /// Average session duration in seconds.
    pub avg_duration: f64,
}

impl JourneyRecord {
    /// Renders the path the way dashboards display it.
    pub fn display_path(&self) -> String {
        self.journey_path.join(" → ")
    }
}

/// Search performance of a single query over one reporting period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordMetric {
    pub keyword: String,
    /// 1-based rank within the period's keyword list.
    pub rank: u32,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub position: f64,
    /// [`GENERAL_CATEGORY`] as normalized; set by `KeywordCategorizer::assign`.
    pub category: String,
}
