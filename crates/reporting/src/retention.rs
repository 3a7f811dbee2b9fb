//! Retention estimation for aggregated cohorts.
//!
//! Reports carry no visitor-level identity, so retention is estimated from the
//! sessions-per-user ratio rather than measured from return visits.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cohort::CohortBucket;

const MIN_BASE_RETENTION: f64 = 0.3;
const MAX_BASE_RETENTION: f64 = 0.8;

/// Decay applied to the base rate for weeks 1, 2, 4 and 8.
const WEEK_OFFSETS: [f64; 4] = [0.10, 0.20, 0.30, 0.40];

/// A finalized cohort with estimated retention counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortResult {
    pub cohort_date: NaiveDate,
    pub week_index: i64,
    pub campaign_name: String,
    pub source: String,
    pub medium: String,
    pub initial_users: u64,
    pub sessions: u64,
    pub conversions: u64,
    pub revenue: f64,
    pub ltv: f64,
    pub retention_week1: u64,
    pub retention_week2: u64,
    pub retention_week4: u64,
    pub retention_week8: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RetentionEstimator;

impl RetentionEstimator {
    pub fn new() -> Self {
        Self
    }

    /// Sessions-to-users ratio clamped to `[0.3, 0.8]`.
    pub fn base_retention(bucket: &CohortBucket) -> f64 {
        let ratio = bucket.sessions() as f64 / bucket.initial_users().max(1) as f64;
        ratio.clamp(MIN_BASE_RETENTION, MAX_BASE_RETENTION)
    }

    pub fn estimate(&self, bucket: &CohortBucket) -> CohortResult {
        let base = Self::base_retention(bucket);
        let users = bucket.initial_users();
        let [week1, week2, week4, week8] =
            WEEK_OFFSETS.map(|offset| retained(users, base - offset));
        let key = bucket.key();

        CohortResult {
            cohort_date: bucket.cohort_date(),
            week_index: key.week_index,
            campaign_name: key.campaign.clone(),
            source: key.source.clone(),
            medium: key.medium.clone(),
            initial_users: users,
            sessions: bucket.sessions(),
            conversions: bucket.conversions(),
            revenue: bucket.revenue(),
            ltv: bucket.ltv(),
            retention_week1: week1,
            retention_week2: week2,
            retention_week4: week4,
            retention_week8: week8,
        }
    }
}

/// `floor(users * rate)`, never below zero.
fn retained(users: u64, rate: f64) -> u64 {
    let estimate = (users as f64 * rate).floor();
    if estimate <= 0.0 {
        0
    } else {
        estimate as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::CohortKey;
    use crate::records::SessionRecord;

    fn bucket(users: u64, sessions: u64) -> CohortBucket {
        let record = SessionRecord {
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            campaign: "launch".into(),
            source: "newsletter".into(),
            medium: "email".into(),
            sessions,
            users,
            conversions: 4,
            revenue: 900.0,
        };
        CohortBucket::seed(CohortKey::for_record(&record), &record)
    }

    #[test]
    fn test_base_retention_is_clamped() {
        assert_eq!(RetentionEstimator::base_retention(&bucket(100, 5)), 0.3);
        assert_eq!(RetentionEstimator::base_retention(&bucket(100, 500)), 0.8);
        assert!((RetentionEstimator::base_retention(&bucket(100, 55)) - 0.55).abs() < 1e-12);
    }

    #[test]
    fn test_estimate_at_upper_bound() {
        let result = RetentionEstimator::new().estimate(&bucket(100, 400));
        assert_eq!(result.retention_week1, 70);
        assert_eq!(result.retention_week2, 60);
        assert_eq!(result.retention_week4, 50);
        assert_eq!(result.retention_week8, 40);
        assert_eq!(result.initial_users, 100);
        assert_eq!(result.campaign_name, "launch");
        assert!((result.ltv - 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_week8_floors_at_zero_for_low_engagement() {
        let result = RetentionEstimator::new().estimate(&bucket(1000, 10));
        // base 0.3 - 0.4 is negative
        assert_eq!(result.retention_week8, 0);
        assert!(result.retention_week4 <= 1);
        assert!(result.retention_week1 <= result.initial_users);
    }

    #[test]
    fn test_zero_user_cohort() {
        let result = RetentionEstimator::new().estimate(&bucket(0, 12));
        assert_eq!(result.retention_week1, 0);
        assert_eq!(result.retention_week8, 0);
        assert!((result.ltv - 900.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_counts_never_exceed_initial_users() {
        let estimator = RetentionEstimator::new();
        for users in [1u64, 7, 150, 10_000] {
            for sessions in [0u64, 1, users, users * 3] {
                let r = estimator.estimate(&bucket(users, sessions));
                for count in [r.retention_week1, r.retention_week2, r.retention_week4, r.retention_week8] {
                    assert!(count <= r.initial_users);
                }
                assert!(r.retention_week1 >= r.retention_week2);
                assert!(r.retention_week2 >= r.retention_week4);
                assert!(r.retention_week4 >= r.retention_week8);
            }
        }
    }
}
