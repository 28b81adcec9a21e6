use serde::{Deserialize, Serialize};

use crate::geom::{DelayRange, Rect};

/// Scroll direction on screen. Serialized UPPERCASE in catalog files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Wait for a template match to stabilize, then schedule a jittered tap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateTapStage {
    pub id: String,
    pub timeout_ms: u64,
    pub search_region: Rect,
    pub delay_before_tap: DelayRange,
    pub click_jitter_px: i32,
    pub threshold: f64,
    #[serde(default = "default_stable_frames")]
    pub stable_frames_required: u32,
}

fn default_stable_frames() -> u32 {
    1
}

/// Schedule a scroll gesture somewhere inside `region`.
/// min/max pairs are the catalog author's responsibility; the engine
/// samples them as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollStage {
    pub id: String,
    pub timeout_ms: u64,
    pub region: Rect,
    pub direction: ScrollDirection,
    pub distance_px_min: i32,
    pub distance_px_max: i32,
    pub duration_ms_min: u64,
    pub duration_ms_max: u64,
}

/// One step of a scenario. Closed set: every consumer matches
/// exhaustively, so a new stage kind has to be handled everywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stage {
    TemplateTap(TemplateTapStage),
    Scroll(ScrollStage),
}

impl Stage {
    pub fn id(&self) -> &str {
        match self {
            Stage::TemplateTap(s) => &s.id,
            Stage::Scroll(s) => &s.id,
        }
    }

    pub fn timeout_ms(&self) -> u64 {
        match self {
            Stage::TemplateTap(s) => s.timeout_ms,
            Stage::Scroll(s) => s.timeout_ms,
        }
    }
}

/// An ordered automation script. Stages must be non-empty; only a
/// TemplateTap first stage can ever trigger activation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    pub stages: Vec<Stage>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_enabled() -> bool {
    true
}

fn default_priority() -> i32 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_deserializes_by_kind_tag() {
        let json = r#"{
            "kind": "template_tap",
            "id": "ok-button",
            "timeout_ms": 1000,
            "search_region": {"x": 0, "y": 0, "width": 100, "height": 100},
            "delay_before_tap": {"min_ms": 10, "max_ms": 40},
            "click_jitter_px": 5,
            "threshold": 0.8
        }"#;
        let stage: Stage = serde_json::from_str(json).unwrap();
        match &stage {
            Stage::TemplateTap(s) => {
                assert_eq!(s.id, "ok-button");
                assert_eq!(s.stable_frames_required, 1);
            }
            Stage::Scroll(_) => panic!("wrong variant"),
        }
        assert_eq!(stage.id(), "ok-button");
        assert_eq!(stage.timeout_ms(), 1000);
    }

    #[test]
    fn scenario_defaults_enabled_and_priority() {
        let json = r#"{
            "id": "s1",
            "name": "Demo",
            "stages": [{
                "kind": "scroll",
                "id": "s1-scroll",
                "timeout_ms": 500,
                "region": {"x": 0, "y": 0, "width": 100, "height": 100},
                "direction": "DOWN",
                "distance_px_min": 10,
                "distance_px_max": 20,
                "duration_ms_min": 100,
                "duration_ms_max": 200
            }]
        }"#;
        let scenario: Scenario = serde_json::from_str(json).unwrap();
        assert!(scenario.enabled);
        assert_eq!(scenario.priority, 100);
        match &scenario.stages[0] {
            Stage::Scroll(s) => assert_eq!(s.direction, ScrollDirection::Down),
            Stage::TemplateTap(_) => panic!("wrong variant"),
        }
    }

    #[test]
    fn direction_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&ScrollDirection::Left).unwrap(), "\"LEFT\"");
    }
}
