//! Funnel analysis — derives per-page participation from converting journeys.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::records::JourneyRecord;

/// Conversions from every journey that passed through `page`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStep {
    pub page: String,
    pub participating_conversions: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelAnalysis {
    pub steps: Vec<FunnelStep>,
    pub total_conversions: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FunnelPathAnalyzer;

impl FunnelPathAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Steps are ordered by participating conversions descending; ties keep
    /// the order in which pages were first seen.
    pub fn analyze_funnel(&self, journeys: &[JourneyRecord]) -> FunnelAnalysis {
        let total_conversions = journeys
            .iter()
            .map(|j| j.conversions)
            .fold(0, u64::saturating_add);

        let mut steps: Vec<FunnelStep> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        for journey in journeys {
            let mut visited: HashSet<&str> = HashSet::new();
            for page in &journey.journey_path {
                if !visited.insert(page.as_str()) {
                    continue;
                }
                let slot = *index.entry(page.as_str()).or_insert_with(|| {
                    steps.push(FunnelStep {
                        page: page.clone(),
                        participating_conversions: 0,
                    });
                    steps.len() - 1
                });
                let step = &mut steps[slot];
                step.participating_conversions =
                    step.participating_conversions.saturating_add(journey.conversions);
            }
        }
        steps.sort_by(|a, b| b.participating_conversions.cmp(&a.participating_conversions));

        debug!(
            journeys = journeys.len(),
            pages = steps.len(),
            total_conversions,
            "Funnel analyzed"
        );
        FunnelAnalysis {
            steps,
            total_conversions,
        }
    }

    /// The `limit` highest-converting journeys, ties in input order.
    pub fn top_journeys<'a>(&self, journeys: &'a [JourneyRecord], limit: usize) -> Vec<&'a JourneyRecord> {
        let mut ranked: Vec<&JourneyRecord> = journeys.iter().collect();
        ranked.sort_by(|a, b| b.conversions.cmp(&a.conversions));
        ranked.truncate(limit);
        ranked
    }
}
