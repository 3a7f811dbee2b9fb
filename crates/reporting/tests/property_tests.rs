use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use pulse_reporting::{
    CohortAggregator, CohortBucket, CohortKey, FunnelPathAnalyzer, JourneyRecord,
    RetentionEstimator, SessionRecord,
};

fn session_record() -> impl Strategy<Value = SessionRecord> {
    (0u64..60, 0usize..3, 0u64..5_000, 0u64..20_000, 0u64..500, 0u32..1_000_000).prop_map(
        |(day, campaign, users, sessions, conversions, revenue_cents)| SessionRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Days::new(day),
            campaign: ["spring", "summer", "brand"][campaign].to_string(),
            source: "google".to_string(),
            medium: "cpc".to_string(),
            sessions,
            users,
            conversions,
            revenue: f64::from(revenue_cents) / 100.0,
        },
    )
}

fn journey_record() -> impl Strategy<Value = JourneyRecord> {
    (
        prop::collection::vec(prop::sample::select(vec!["Home", "Pricing", "Docs", "Signup"]), 1..8),
        0u64..1_000,
    )
        .prop_map(|(path, conversions)| JourneyRecord {
            journey_path: path.into_iter().map(String::from).collect(),
            conversions,
            avg_duration: 10.0,
        })
}

proptest! {
    #[test]
    fn prop_aggregation_is_order_independent(
        (records, shuffled) in prop::collection::vec(session_record(), 0..40)
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
    ) {
        let aggregator = CohortAggregator::new();
        prop_assert_eq!(aggregator.aggregate(&records), aggregator.aggregate(&shuffled));
    }

    #[test]
    fn prop_retention_is_bounded(users in 0u64..1_000_000, sessions in 0u64..10_000_000) {
        let record = SessionRecord {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            campaign: "c".into(),
            source: "s".into(),
            medium: "m".into(),
            sessions,
            users,
            conversions: 0,
            revenue: 0.0,
        };
        let bucket = CohortBucket::seed(CohortKey::for_record(&record), &record);
        let result = RetentionEstimator::new().estimate(&bucket);

        prop_assert!(result.retention_week1 <= users);
        prop_assert!(result.retention_week1 >= result.retention_week2);
        prop_assert!(result.retention_week2 >= result.retention_week4);
        prop_assert!(result.retention_week4 >= result.retention_week8);
        prop_assert!(result.retention_week8 <= users * 2 / 5);
    }

    #[test]
    fn prop_single_journey_counts_each_page_once(journey in journey_record()) {
        let analysis = FunnelPathAnalyzer::new().analyze_funnel(std::slice::from_ref(&journey));
        for step in &analysis.steps {
            prop_assert_eq!(step.participating_conversions, journey.conversions);
        }
        prop_assert_eq!(analysis.total_conversions, journey.conversions);
    }

    #[test]
    fn prop_funnel_is_deterministic(journeys in prop::collection::vec(journey_record(), 0..20)) {
        let analyzer = FunnelPathAnalyzer::new();
        let first = analyzer.analyze_funnel(&journeys);
        let second = analyzer.analyze_funnel(&journeys);
        prop_assert_eq!(&first, &second);
        prop_assert!(first
            .steps
            .windows(2)
            .all(|w| w[0].participating_conversions >= w[1].participating_conversions));
        for step in &first.steps {
            prop_assert!(step.participating_conversions <= first.total_conversions);
        }
    }
}
