//! Keyword ranking — period-over-period comparison of search queries, trend
//! classification and category bucketing.

use std::collections::HashMap;
use std::fmt;

use pulse_core::config::{CategoryRuleConfig, KeywordConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::records::{KeywordMetric, GENERAL_CATEGORY};

// ─── Categories ─────────────────────────────────────────────────────────────

type KeywordPredicate = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// A labelled predicate over lowercase keywords.
pub struct CategoryRule {
    label: String,
    predicate: KeywordPredicate,
}

impl CategoryRule {
    pub fn new(label: impl Into<String>, predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self {
            label: label.into(),
            predicate: Box::new(predicate),
        }
    }

    /// Matches when the keyword contains any of `terms` (case-insensitive).
    pub fn from_terms<I, S>(label: impl Into<String>, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms: Vec<String> = terms
            .into_iter()
            .map(|t| t.as_ref().to_lowercase())
            .collect();
        Self::new(label, move |keyword| terms.iter().any(|t| keyword.contains(t.as_str())))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn matches(&self, keyword: &str) -> bool {
        (self.predicate)(&keyword.to_lowercase())
    }
}

impl fmt::Debug for CategoryRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CategoryRule").field("label", &self.label).finish()
    }
}

impl From<&CategoryRuleConfig> for CategoryRule {
    fn from(config: &CategoryRuleConfig) -> Self {
        Self::from_terms(config.label.clone(), &config.terms)
    }
}

/// Ordered category rules; the first matching rule wins.
#[derive(Debug, Default)]
pub struct KeywordCategorizer {
    rules: Vec<CategoryRule>,
}

impl KeywordCategorizer {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        Self { rules }
    }

    pub fn from_config(rules: &[CategoryRuleConfig]) -> Self {
        Self::new(rules.iter().map(CategoryRule::from).collect())
    }

    pub fn categorize(&self, keyword: &str) -> &str {
        self.rules
            .iter()
            .find(|rule| rule.matches(keyword))
            .map_or(GENERAL_CATEGORY, CategoryRule::label)
    }

    /// Overwrite each record's `category` with its matching label.
    pub fn assign(&self, records: &mut [KeywordMetric]) {
        for record in records {
            record.category = self.categorize(&record.keyword).to_string();
        }
    }

    /// Category labels in precedence order, followed by the fallback.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.rules
            .iter()
            .map(CategoryRule::label)
            .chain(std::iter::once(GENERAL_CATEGORY))
    }
}

// ─── Ranking changes ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    StrongUp,
    Up,
    Stable,
    Down,
    StrongDown,
}

impl Trend {
    /// Rules are checked in order and the first match wins, so a mixed
    /// signal with any improvement reads as `Up`.
    pub fn classify(rank_change: i64, clicks_change_pct: f64, position_change: f64) -> Self {
        if rank_change > 2 && clicks_change_pct > 10.0 && position_change > 0.5 {
            Self::StrongUp
        } else if rank_change > 0 || clicks_change_pct > 5.0 || position_change > 0.0 {
            Self::Up
        } else if rank_change < -2 && clicks_change_pct < -10.0 && position_change < -0.5 {
            Self::StrongDown
        } else if rank_change < 0 || clicks_change_pct < -5.0 || position_change < 0.0 {
            Self::Down
        } else {
            Self::Stable
        }
    }
}

/// A current-period keyword paired with its prior-period counterpart.
/// Positive `rank_change` and `position_change` mean improvement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingChange {
    pub keyword: String,
    pub category: String,
    pub current_rank: u32,
    pub previous_rank: u32,
    pub rank_change: i64,
    pub clicks: u64,
    pub previous_clicks: u64,
    pub clicks_change_pct: f64,
    pub impressions: u64,
    pub ctr: f64,
    pub position: f64,
    pub previous_position: f64,
    pub position_change: f64,
    pub trend: Trend,
}

impl RankingChange {
    /// With no prior-period match the keyword is compared against itself.
    pub fn compare(current: &KeywordMetric, previous: Option<&KeywordMetric>, category: &str) -> Self {
        let previous = previous.unwrap_or(current);
        let rank_change = i64::from(previous.rank) - i64::from(current.rank);
        let clicks_change_pct = percent_change(previous.clicks, current.clicks);
        let position_change = previous.position - current.position;

        Self {
            keyword: current.keyword.clone(),
            category: category.to_string(),
            current_rank: current.rank,
            previous_rank: previous.rank,
            rank_change,
            clicks: current.clicks,
            previous_clicks: previous.clicks,
            clicks_change_pct,
            impressions: current.impressions,
            ctr: current.ctr,
            position: current.position,
            previous_position: previous.position,
            position_change,
            trend: Trend::classify(rank_change, clicks_change_pct, position_change),
        }
    }
}

/// `(current - previous) / max(previous, 1) * 100`.
fn percent_change(previous: u64, current: u64) -> f64 {
    (current as f64 - previous as f64) / previous.max(1) as f64 * 100.0
}

// ─── Analyzer ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct KeywordRankingAnalyzer {
    categorizer: KeywordCategorizer,
    opportunity_min_position: f64,
    opportunity_max_position: f64,
    list_limit: usize,
}

impl KeywordRankingAnalyzer {
    pub fn new(config: &KeywordConfig) -> Self {
        Self {
            categorizer: KeywordCategorizer::from_config(&config.categories),
            opportunity_min_position: config.opportunity_min_position,
            opportunity_max_position: config.opportunity_max_position,
            list_limit: config.list_limit,
        }
    }

    pub fn with_categorizer(mut self, categorizer: KeywordCategorizer) -> Self {
        self.categorizer = categorizer;
        self
    }

    pub fn categorizer(&self) -> &KeywordCategorizer {
        &self.categorizer
    }

    /// One change per current keyword, in input order. Duplicate keywords in
    /// `previous` resolve to their first occurrence.
    pub fn analyze(&self, current: &[KeywordMetric], previous: &[KeywordMetric]) -> Vec<RankingChange> {
        let mut prior: HashMap<&str, &KeywordMetric> = HashMap::with_capacity(previous.len());
        for metric in previous {
            prior.entry(metric.keyword.as_str()).or_insert(metric);
        }

        let changes: Vec<RankingChange> = current
            .iter()
            .map(|metric| {
                let category = self.categorizer.categorize(&metric.keyword);
                RankingChange::compare(metric, prior.get(metric.keyword.as_str()).copied(), category)
            })
            .collect();

        debug!(
            current = current.len(),
            previous = previous.len(),
            matched = current.iter().filter(|m| prior.contains_key(m.keyword.as_str())).count(),
            "Keyword rankings compared"
        );
        changes
    }

    /// Keywords on the edge of page one, by impressions descending.
    pub fn opportunities(&self, changes: &[RankingChange]) -> Vec<RankingChange> {
        let mut picked: Vec<RankingChange> = changes
            .iter()
            .filter(|c| {
                c.position >= self.opportunity_min_position
                    && c.position <= self.opportunity_max_position
            })
            .cloned()
            .collect();
        picked.sort_by(|a, b| b.impressions.cmp(&a.impressions));
        picked.truncate(self.list_limit);
        picked
    }

    /// Improved keywords, largest gain first.
    pub fn rising(&self, changes: &[RankingChange]) -> Vec<RankingChange> {
        let mut picked: Vec<RankingChange> =
            changes.iter().filter(|c| c.rank_change > 0).cloned().collect();
        picked.sort_by(|a, b| b.rank_change.cmp(&a.rank_change));
        picked.truncate(self.list_limit);
        picked
    }

    /// Declined keywords, largest drop first.
    pub fn falling(&self, changes: &[RankingChange]) -> Vec<RankingChange> {
        let mut picked: Vec<RankingChange> =
            changes.iter().filter(|c| c.rank_change < 0).cloned().collect();
        picked.sort_by(|a, b| a.rank_change.cmp(&b.rank_change));
        picked.truncate(self.list_limit);
        picked
    }
}

impl Default for KeywordRankingAnalyzer {
    fn default() -> Self {
        Self::new(&KeywordConfig::default())
    }
}
