//! GA4 / Search Console report-row wire types as handed over by the
//! fetching layer, and the flattened [`RawRow`] the normalizer consumes.

use serde::{Deserialize, Serialize};

/// One cell of a report row. GA4 omits `value` for empty cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportValue {
    #[serde(default)]
    pub value: Option<String>,
}

/// A single row of a `runReport` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    #[serde(default)]
    pub dimension_values: Vec<ReportValue>,
    #[serde(default)]
    pub metric_values: Vec<ReportValue>,
}

/// The subset of a `runReport` response the engine reads. `rows` is absent
/// from the upstream payload when the query matched nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReportResponse {
    #[serde(default)]
    pub rows: Vec<ReportRow>,
    #[serde(default)]
    pub row_count: Option<u64>,
}

/// Positional dimension and metric strings for one reporting record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
}

impl RawRow {
    pub fn new<D, M>(dimensions: D, metrics: M) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        Self {
            dimensions: dimensions.into_iter().map(Into::into).collect(),
            metrics: metrics.into_iter().map(Into::into).collect(),
        }
    }

    pub fn dimension(&self, index: usize) -> Option<&str> {
        self.dimensions.get(index).map(String::as_str)
    }

    pub fn metric(&self, index: usize) -> Option<&str> {
        self.metrics.get(index).map(String::as_str)
    }
}

impl From<&ReportRow> for RawRow {
    fn from(row: &ReportRow) -> Self {
        let flatten = |values: &[ReportValue]| {
            values
                .iter()
                .map(|v| v.value.clone().unwrap_or_default())
                .collect()
        };
        Self {
            dimensions: flatten(&row.dimension_values),
            metrics: flatten(&row.metric_values),
        }
    }
}

impl RunReportResponse {
    pub fn raw_rows(&self) -> Vec<RawRow> {
        self.rows.iter().map(RawRow::from).collect()
    }
}
