//! Cohort aggregation — buckets daily session records into weekly cohorts per
//! campaign/source/medium and folds duplicate keys into running sums.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::records::SessionRecord;

/// Length of a cohort bucket in milliseconds.
pub const WEEK_MILLIS: i64 = 7 * 24 * 60 * 60 * 1000;

pub const MICROS_PER_UNIT: f64 = 1_000_000.0;

/// Whole micro-units of currency. Negative and non-finite amounts read as 0.
fn to_micros(amount: f64) -> u64 {
    (amount * MICROS_PER_UNIT).round() as u64
}

/// Seven-day bucket index anchored at the Unix epoch (UTC midnight of `date`).
/// Buckets start on Thursdays, not on calendar-week boundaries.
pub fn week_index(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN)
        .and_utc()
        .timestamp_millis()
        .div_euclid(WEEK_MILLIS)
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortKey {
    pub week_index: i64,
    #[serde(rename = "campaignName")]
    pub campaign: String,
    pub source: String,
    pub medium: String,
}

impl CohortKey {
    pub fn for_record(record: &SessionRecord) -> Self {
        Self {
            week_index: week_index(record.date),
            campaign: record.campaign.clone(),
            source: record.source.clone(),
            medium: record.medium.clone(),
        }
    }
}

/// Running totals for one cohort. Only [`CohortBucket::seed`] and
/// [`CohortBucket::absorb`] build values, and both leave `ltv` current.
///
/// Revenue accumulates as integer micros, so the totals do not depend on the
/// order records are folded in. Counts saturate at `u64::MAX`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortBucket {
    #[serde(flatten)]
    key: CohortKey,
    cohort_date: NaiveDate,
    initial_users: u64,
    sessions: u64,
    conversions: u64,
    #[serde(skip)]
    revenue_micros: u64,
    revenue: f64,
    ltv: f64,
}

impl CohortBucket {
    pub fn seed(key: CohortKey, record: &SessionRecord) -> Self {
        let mut bucket = Self {
            key,
            cohort_date: record.date,
            initial_users: record.users,
            sessions: record.sessions,
            conversions: record.conversions,
            revenue_micros: to_micros(record.revenue),
            revenue: 0.0,
            ltv: 0.0,
        };
        bucket.recompute_ltv();
        bucket
    }

    /// Fold another record with the same key into this bucket.
    #[must_use]
    pub fn absorb(mut self, record: &SessionRecord) -> Self {
        self.cohort_date = self.cohort_date.min(record.date);
        self.initial_users = self.initial_users.saturating_add(record.users);
        self.sessions = self.sessions.saturating_add(record.sessions);
        self.conversions = self.conversions.saturating_add(record.conversions);
        self.revenue_micros = self.revenue_micros.saturating_add(to_micros(record.revenue));
        self.recompute_ltv();
        self
    }

    /// `revenue / max(initial_users, 1)`, with `revenue` re-derived from the
    /// exact micro total.
    pub fn recompute_ltv(&mut self) {
        self.revenue = self.revenue_micros as f64 / MICROS_PER_UNIT;
        self.ltv = self.revenue / self.initial_users.max(1) as f64;
    }

    pub fn key(&self) -> &CohortKey {
        &self.key
    }
    /// Earliest date that contributed to the bucket.
    pub fn cohort_date(&self) -> NaiveDate {
        self.cohort_date
    }
    pub fn initial_users(&self) -> u64 {
        self.initial_users
    }
    pub fn sessions(&self) -> u64 {
        self.sessions
    }
    pub fn conversions(&self) -> u64 {
        self.conversions
    }
    pub fn revenue(&self) -> f64 {
        self.revenue
    }
    pub fn revenue_micros(&self) -> u64 {
        self.revenue_micros
    }
    pub fn ltv(&self) -> f64 {
        self.ltv
    }
}

/// Stateless weekly cohort builder.
#[derive(Debug, Clone, Copy, Default)]
pub struct CohortAggregator;

impl CohortAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Group records by [`CohortKey`]; at most one bucket per key.
    pub fn aggregate(&self, records: &[SessionRecord]) -> BTreeMap<CohortKey, CohortBucket> {
        let mut buckets = records.iter().fold(BTreeMap::new(), |mut acc, record| {
            let key = CohortKey::for_record(record);
            let bucket = match acc.remove(&key) {
                Some(existing) => CohortBucket::absorb(existing, record),
                None => CohortBucket::seed(key.clone(), record),
            };
            acc.insert(key, bucket);
            acc
        });
        for bucket in buckets.values_mut() {
            bucket.recompute_ltv();
        }

        metrics::counter!("reporting.cohorts_built").increment(buckets.len() as u64);
        debug!(records = records.len(), cohorts = buckets.len(), "Cohorts aggregated");
        buckets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: NaiveDate, campaign: &str, users: u64, sessions: u64, revenue: f64) -> SessionRecord {
        SessionRecord {
            date,
            campaign: campaign.to_string(),
            source: "google".to_string(),
            medium: "cpc".to_string(),
            sessions,
            users,
            conversions: 1,
            revenue,
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_index_is_epoch_anchored() {
        // 1970-01-01 was a Thursday; buckets roll over every following Thursday.
        assert_eq!(week_index(ymd(1970, 1, 1)), 0);
        assert_eq!(week_index(ymd(1970, 1, 7)), 0);
        assert_eq!(week_index(ymd(1970, 1, 8)), 1);
        assert_eq!(week_index(ymd(1969, 12, 31)), -1);
        // Monday and the following Wednesday share a bucket, Thursday does not.
        assert_eq!(week_index(ymd(2024, 1, 8)), week_index(ymd(2024, 1, 10)));
        assert_ne!(week_index(ymd(2024, 1, 10)), week_index(ymd(2024, 1, 11)));
    }

    #[test]
    fn test_empty_input_yields_no_buckets() {
        assert!(CohortAggregator::new().aggregate(&[]).is_empty());
    }

    #[test]
    fn test_same_key_folds_into_one_bucket() {
        let records = vec![
            record(ymd(2024, 1, 9), "spring", 100, 60, 50_000.0),
            record(ymd(2024, 1, 8), "spring", 50, 30, 25_000.0),
        ];
        let buckets = CohortAggregator::new().aggregate(&records);
        assert_eq!(buckets.len(), 1);

        let bucket = buckets.values().next().unwrap();
        assert_eq!(bucket.initial_users(), 150);
        assert_eq!(bucket.sessions(), 90);
        assert_eq!(bucket.conversions(), 2);
        assert!((bucket.revenue() - 75_000.0).abs() < f64::EPSILON);
        assert!((bucket.ltv() - 500.0).abs() < f64::EPSILON);
        assert_eq!(bucket.cohort_date(), ymd(2024, 1, 8));
    }

    #[test]
    fn test_distinct_campaigns_and_weeks_stay_apart() {
        let records = vec![
            record(ymd(2024, 1, 8), "spring", 10, 5, 0.0),
            record(ymd(2024, 1, 8), "summer", 10, 5, 0.0),
            record(ymd(2024, 1, 15), "spring", 10, 5, 0.0),
        ];
        let buckets = CohortAggregator::new().aggregate(&records);
        assert_eq!(buckets.len(), 3);
    }

    #[test]
    fn test_ltv_guard_for_zero_users() {
        let records = vec![record(ymd(2024, 1, 8), "spring", 0, 3, 120.0)];
        let buckets = CohortAggregator::new().aggregate(&records);
        let mut bucket = buckets.into_values().next().unwrap();
        assert!((bucket.ltv() - 120.0).abs() < f64::EPSILON);

        let before = bucket.ltv();
        bucket.recompute_ltv();
        bucket.recompute_ltv();
        assert_eq!(bucket.ltv(), before);
    }

    #[test]
    fn test_absorb_keeps_ltv_current() {
        let key = CohortKey::for_record(&record(ymd(2024, 1, 8), "spring", 10, 5, 100.0));
        let bucket = CohortBucket::seed(key, &record(ymd(2024, 1, 8), "spring", 10, 5, 100.0));
        assert!((bucket.ltv() - 10.0).abs() < f64::EPSILON);

        let bucket = bucket.absorb(&record(ymd(2024, 1, 9), "spring", 10, 5, 300.0));
        assert!((bucket.ltv() - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cents_fold_identically_in_any_order() {
        let forward: Vec<SessionRecord> = [0.1, 0.2, 0.3, 19.99]
            .into_iter()
            .map(|revenue| record(ymd(2024, 1, 8), "spring", 1, 1, revenue))
            .collect();
        let mut backward = forward.clone();
        backward.reverse();

        let aggregator = CohortAggregator::new();
        let a = aggregator.aggregate(&forward);
        let b = aggregator.aggregate(&backward);
        assert_eq!(a, b);

        let bucket = a.values().next().unwrap();
        assert_eq!(bucket.revenue_micros(), 20_590_000);
        assert_eq!(bucket.revenue(), 20.59);
    }

    #[test]
    fn test_saturated_counts_do_not_overflow() {
        let records = vec![
            record(ymd(2024, 1, 8), "spring", u64::MAX, u64::MAX, f64::MAX),
            record(ymd(2024, 1, 9), "spring", u64::MAX, 1, f64::MAX),
        ];
        let buckets = CohortAggregator::new().aggregate(&records);
        let bucket = buckets.values().next().unwrap();
        assert_eq!(bucket.initial_users(), u64::MAX);
        assert_eq!(bucket.sessions(), u64::MAX);
        assert_eq!(bucket.conversions(), 2);
        assert_eq!(bucket.revenue_micros(), u64::MAX);
        assert!(bucket.ltv().is_finite());
    }

    #[test]
    fn test_bucket_serializes_with_dashboard_names() {
        let records = vec![record(ymd(2024, 1, 8), "spring", 10, 5, 100.0)];
        let bucket = CohortAggregator::new().aggregate(&records).into_values().next().unwrap();
        let json = serde_json::to_value(&bucket).unwrap();
        assert_eq!(json["campaignName"], "spring");
        assert_eq!(json["cohortDate"], "2024-01-08");
        assert_eq!(json["initialUsers"], 10);
        assert!(json.get("weekIndex").is_some());
        assert_eq!(json["revenue"], 100.0);
        assert!(json.get("revenueMicros").is_none());
    }
}
