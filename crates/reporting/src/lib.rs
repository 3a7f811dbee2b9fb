//! Marketing analytics aggregation — normalizes GA4 and Search Console report
//! rows, builds weekly cohorts with retention and LTV estimates, derives
//! conversion funnels from page journeys, and tracks keyword ranking changes.

pub mod cohort;
pub mod funnel;
pub mod keywords;
pub mod normalize;
pub mod records;
pub mod report_builder;
pub mod retention;

pub use cohort::{CohortAggregator, CohortBucket, CohortKey};
pub use funnel::{FunnelAnalysis, FunnelPathAnalyzer, FunnelStep};
pub use keywords::{CategoryRule, KeywordCategorizer, KeywordRankingAnalyzer, RankingChange, Trend};
pub use normalize::{NormalizeRow, RecordNormalizer};
pub use records::{JourneyRecord, KeywordMetric, SessionRecord};
pub use report_builder::{
    build_cohort_report, build_funnel_report, build_keyword_report, CohortReport, FunnelReport,
    KeywordReport,
};
pub use retention::{CohortResult, RetentionEstimator};
