//! Report assembly — runs the analyzers over normalized records and shapes
//! the dashboard payloads for cohorts, funnels and keyword rankings.

use std::collections::HashMap;

use pulse_core::config::{CohortConfig, FunnelConfig, KeywordConfig};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cohort::{CohortAggregator, CohortBucket, MICROS_PER_UNIT};
use crate::funnel::{FunnelPathAnalyzer, FunnelStep};
use crate::keywords::{KeywordRankingAnalyzer, RankingChange, Trend};
use crate::records::{JourneyRecord, KeywordMetric, SessionRecord};
use crate::retention::{CohortResult, RetentionEstimator};

// ─── Cohorts ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortSummary {
    /// Number of cohorts before the display cap was applied.
    pub total_cohorts: usize,
    pub total_users: u64,
    pub total_revenue: f64,
    pub average_ltv: f64,
    pub average_week1_retention: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortReport {
    pub cohorts: Vec<CohortResult>,
    pub summary: CohortSummary,
}

impl CohortReport {
    pub fn to_csv(&self) -> String {
        let mut csv = String::from(
            "cohortDate,campaignName,source,medium,initialUsers,sessions,conversions,revenue,ltv,\
             retentionWeek1,retentionWeek2,retentionWeek4,retentionWeek8\n",
        );
        for c in &self.cohorts {
            let cells = [
                c.cohort_date.to_string(),
                quote(&c.campaign_name),
                quote(&c.source),
                quote(&c.medium),
                c.initial_users.to_string(),
                c.sessions.to_string(),
                c.conversions.to_string(),
                format!("{:.2}", c.revenue),
                format!("{:.2}", c.ltv),
                c.retention_week1.to_string(),
                c.retention_week2.to_string(),
                c.retention_week4.to_string(),
                c.retention_week8.to_string(),
            ];
            csv.push_str(&cells.join(","));
            csv.push('\n');
        }
        csv
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Newest cohorts first, larger cohorts first within a date.
pub fn build_cohort_report(records: &[SessionRecord], config: &CohortConfig) -> CohortReport {
    let estimator = RetentionEstimator::new();
    let buckets = CohortAggregator::new().aggregate(records);
    let revenue_micros = buckets
        .values()
        .map(CohortBucket::revenue_micros)
        .fold(0, u64::saturating_add);
    let mut cohorts: Vec<CohortResult> = buckets
        .values()
        .map(|bucket| estimator.estimate(bucket))
        .collect();
    cohorts.sort_by(|a, b| {
        b.cohort_date
            .cmp(&a.cohort_date)
            .then_with(|| b.initial_users.cmp(&a.initial_users))
    });

    let total_users = cohorts
        .iter()
        .map(|c| c.initial_users)
        .fold(0, u64::saturating_add);
    let total_revenue = revenue_micros as f64 / MICROS_PER_UNIT;
    let week1 = cohorts
        .iter()
        .map(|c| c.retention_week1)
        .fold(0, u64::saturating_add);
    let summary = CohortSummary {
        total_cohorts: cohorts.len(),
        total_users,
        total_revenue,
        average_ltv: total_revenue / total_users.max(1) as f64,
        average_week1_retention: week1 as f64 / total_users.max(1) as f64,
    };
    cohorts.truncate(config.max_cohorts);

    info!(
        cohorts = summary.total_cohorts,
        shown = cohorts.len(),
        users = summary.total_users,
        "Cohort report built"
    );
    CohortReport { cohorts, summary }
}

// ─── Funnels ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStepReport {
    #[serde(flatten)]
    pub step: FunnelStep,
    /// Share of all conversions whose journey touched this page.
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneySummary {
    pub journey: String,
    pub steps: usize,
    pub conversions: u64,
    pub avg_duration: f64,
}

impl From<&JourneyRecord> for JourneySummary {
    fn from(record: &JourneyRecord) -> Self {
        Self {
            journey: record.display_path(),
            steps: record.journey_path.len(),
            conversions: record.conversions,
            avg_duration: record.avg_duration,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelReport {
    pub steps: Vec<FunnelStepReport>,
    pub total_conversions: u64,
    pub top_journeys: Vec<JourneySummary>,
    pub unique_pages: usize,
    pub average_journey_length: f64,
}

pub fn build_funnel_report(journeys: &[JourneyRecord], config: &FunnelConfig) -> FunnelReport {
    let analyzer = FunnelPathAnalyzer::new();
    let analysis = analyzer.analyze_funnel(journeys);
    let total = analysis.total_conversions;

    let unique_pages = analysis.steps.len();
    let steps = analysis
        .steps
        .into_iter()
        .map(|step| FunnelStepReport {
            conversion_rate: step.participating_conversions as f64 / total.max(1) as f64,
            step,
        })
        .collect();
    let top_journeys = analyzer
        .top_journeys(journeys, config.top_journeys)
        .into_iter()
        .map(JourneySummary::from)
        .collect();
    let average_journey_length = if journeys.is_empty() {
        0.0
    } else {
        journeys.iter().map(|j| j.journey_path.len()).sum::<usize>() as f64 / journeys.len() as f64
    };

    info!(journeys = journeys.len(), unique_pages, total, "Funnel report built");
    FunnelReport {
        steps,
        total_conversions: total,
        top_journeys,
        unique_pages,
        average_journey_length,
    }
}

// ─── Keywords ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    pub category: String,
    pub keywords: usize,
    pub clicks: u64,
    pub impressions: u64,
    pub average_position: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSummary {
    pub total: usize,
    pub strong_up: usize,
    pub up: usize,
    pub stable: usize,
    pub down: usize,
    pub strong_down: usize,
}

impl TrendSummary {
    fn record(&mut self, trend: Trend) {
        self.total += 1;
        match trend {
            Trend::StrongUp => self.strong_up += 1,
            Trend::Up => self.up += 1,
            Trend::Stable => self.stable += 1,
            Trend::Down => self.down += 1,
            Trend::StrongDown => self.strong_down += 1,
        }
    }

    pub fn improved(&self) -> usize {
        self.strong_up + self.up
    }

    pub fn declined(&self) -> usize {
        self.strong_down + self.down
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordReport {
    pub changes: Vec<RankingChange>,
    pub opportunities: Vec<RankingChange>,
    pub rising: Vec<RankingChange>,
    pub falling: Vec<RankingChange>,
    pub categories: Vec<CategoryBreakdown>,
    pub summary: TrendSummary,
}

pub fn build_keyword_report(
    current: &[KeywordMetric],
    previous: &[KeywordMetric],
    config: &KeywordConfig,
) -> KeywordReport {
    let analyzer = KeywordRankingAnalyzer::new(config);
    let changes = analyzer.analyze(current, previous);

    let mut summary = TrendSummary::default();
    for change in &changes {
        summary.record(change.trend);
    }

    let report = KeywordReport {
        opportunities: analyzer.opportunities(&changes),
        rising: analyzer.rising(&changes),
        falling: analyzer.falling(&changes),
        categories: category_breakdown(&analyzer, &changes),
        summary,
        changes,
    };
    info!(
        keywords = report.summary.total,
        improved = report.summary.improved(),
        declined = report.summary.declined(),
        "Keyword report built"
    );
    report
}

/// One entry per non-empty category, in rule precedence order.
fn category_breakdown(analyzer: &KeywordRankingAnalyzer, changes: &[RankingChange]) -> Vec<CategoryBreakdown> {
    let mut grouped: HashMap<&str, Vec<&RankingChange>> = HashMap::new();
    for change in changes {
        grouped.entry(change.category.as_str()).or_default().push(change);
    }

    analyzer
        .categorizer()
        .labels()
        .filter_map(|label| {
            let members = grouped.get(label)?;
            let position_sum: f64 = members.iter().map(|c| c.position).sum();
            Some(CategoryBreakdown {
                category: label.to_string(),
                keywords: members.len(),
                clicks: members.iter().map(|c| c.clicks).fold(0, u64::saturating_add),
                impressions: members
                    .iter()
                    .map(|c| c.impressions)
                    .fold(0, u64::saturating_add),
                average_position: position_sum / members.len() as f64,
            })
        })
        .collect()
}
