use crate::model::link::AnalysisRecord;
use crate::report::{BlatSummary, LinkSummary};

pub fn render_analysis_json(record: &AnalysisRecord) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(record)
}

/// `NaN` fields in the summary serialize as `null`.
pub fn render_summary_json(summary: &LinkSummary) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(summary)
}

pub fn render_blat_summary_json(summary: &BlatSummary) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(summary)
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/json.rs"]
mod tests;
