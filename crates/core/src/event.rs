use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::geom::Point;

/// Everything the engine can report. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineEvent {
    ScenarioActivated,
    TapScheduled,
    ScrollScheduled,
    StageCompleted,
    ScenarioCompleted,
    ScenarioTimeout,
}

impl fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineEvent::ScenarioActivated => "SCENARIO_ACTIVATED",
            EngineEvent::TapScheduled => "TAP_SCHEDULED",
            EngineEvent::ScrollScheduled => "SCROLL_SCHEDULED",
            EngineEvent::StageCompleted => "STAGE_COMPLETED",
            EngineEvent::ScenarioCompleted => "SCENARIO_COMPLETED",
            EngineEvent::ScenarioTimeout => "SCENARIO_TIMEOUT",
        };
        f.write_str(name)
    }
}

/// One emitted occurrence. Payload is a JSON key→value mapping; action
/// events carry a `TapAction` or `ScrollAction` serialized into it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub event: EngineEvent,
    pub scenario_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl EventRecord {
    pub fn new(event: EngineEvent, scenario_id: &str) -> Self {
        Self { event, scenario_id: scenario_id.to_string(), stage_id: None, payload: None }
    }

    pub fn with_stage(event: EngineEvent, scenario_id: &str, stage_id: &str) -> Self {
        Self {
            event,
            scenario_id: scenario_id.to_string(),
            stage_id: Some(stage_id.to_string()),
            payload: None,
        }
    }

    pub fn action(event: EngineEvent, scenario_id: &str, stage_id: &str, payload: Value) -> Self {
        Self {
            event,
            scenario_id: scenario_id.to_string(),
            stage_id: Some(stage_id.to_string()),
            payload: Some(payload),
        }
    }
}

/// Payload of `TAP_SCHEDULED`: tap `point` after `delay_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapAction {
    pub point: Point,
    pub delay_ms: u64,
}

/// Payload of `SCROLL_SCHEDULED`: drag `from` → `to` over `duration_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollAction {
    pub from: Point,
    pub to: Point,
    pub duration_ms: u64,
}
