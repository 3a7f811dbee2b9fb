//! Report file loading. Accepts a GA4 `runReport` response object or a bare
//! array of rows.

use std::path::Path;

use anyhow::Context;
use pulse_core::{PulseResult, RawRow, ReportRow, RunReportResponse};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Deserialize)]
#[serde(untagged)]
enum ReportPayload {
    Rows(Vec<ReportRow>),
    Response(RunReportResponse),
}

pub fn parse_rows(bytes: &[u8]) -> PulseResult<Vec<RawRow>> {
    let rows = match serde_json::from_slice::<ReportPayload>(bytes)? {
        ReportPayload::Rows(rows) => rows.iter().map(RawRow::from).collect(),
        ReportPayload::Response(response) => response.raw_rows(),
    };
    Ok(rows)
}

pub async fn load_rows(path: &Path) -> anyhow::Result<Vec<RawRow>> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading report {}", path.display()))?;
    let rows = parse_rows(&bytes).with_context(|| format!("parsing report {}", path.display()))?;
    debug!(path = %path.display(), rows = rows.len(), "Report loaded");
    Ok(rows)
}

/// Load the current and (optional) prior-period reports concurrently.
/// A prior report that fails to load degrades to no rows.
pub async fn load_period_pair(
    current: &Path,
    previous: Option<&Path>,
) -> anyhow::Result<(Vec<RawRow>, Vec<RawRow>)> {
    let (current_rows, previous_rows) = tokio::join!(load_rows(current), async {
        match previous {
            Some(path) => load_rows(path).await,
            None => Ok(Vec::new()),
        }
    });

    let previous_rows = previous_rows.unwrap_or_else(|e| {
        warn!(error = %format!("{e:#}"), "Previous period unavailable, comparing against current only");
        Vec::new()
    });
    Ok((current_rows?, previous_rows))
}
