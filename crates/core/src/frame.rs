use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::geom::Rect;

/// One template-match result reported by the external matcher.
/// Confidence is expected in 0..=1 but not validated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateMatch {
    pub stage_id: String,
    pub confidence: f64,
    pub matched_region: Rect,
}

/// Per-frame match results keyed by stage id. An absent id means the
/// stage did not match this frame. Timestamps come from the caller and
/// must be non-decreasing for timeout logic to behave; the engine does
/// not check this.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub timestamp_ms: u64,
    pub matches_by_stage: HashMap<String, TemplateMatch>,
}

impl FrameSnapshot {
    pub fn empty(timestamp_ms: u64) -> Self {
        Self { timestamp_ms, matches_by_stage: HashMap::new() }
    }

    pub fn with_matches(timestamp_ms: u64, matches: impl IntoIterator<Item = TemplateMatch>) -> Self {
        let matches_by_stage = matches
            .into_iter()
            .map(|m| (m.stage_id.clone(), m))
            .collect();
        Self { timestamp_ms, matches_by_stage }
    }
}
