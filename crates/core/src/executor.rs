use crate::event::{EngineEvent, EventRecord, ScrollAction, TapAction};
use crate::logger;

/// Device-action sink. The real implementation lives outside this repo
/// (input injection on the target device); the engine only ever talks to
/// this trait.
pub trait Executor: Send {
    /// Tap `action.point` after `action.delay_ms`.
    fn tap(&mut self, action: &TapAction);
    /// Drag `action.from` to `action.to` over `action.duration_ms`.
    fn scroll(&mut self, action: &ScrollAction);
}

/// Logs what it would inject. Lets the whole app run with no device.
pub struct StubExecutor;

impl Executor for StubExecutor {
    fn tap(&mut self, action: &TapAction) {
        logger::info_p(
            "exec",
            &format!(
                "tap ({}, {}) after {} ms",
                action.point.x, action.point.y, action.delay_ms
            ),
        );
    }

    fn scroll(&mut self, action: &ScrollAction) {
        logger::info_p(
            "exec",
            &format!(
                "scroll ({}, {}) -> ({}, {}) over {} ms",
                action.from.x, action.from.y, action.to.x, action.to.y, action.duration_ms
            ),
        );
    }
}

/// Route one batch of engine events: log every record, hand the two
/// action kinds to the executor.
pub fn dispatch(events: &[EventRecord], executor: &mut dyn Executor) {
    for record in events {
        log_record(record);
        let Some(payload) = &record.payload else { continue };
        match record.event {
            EngineEvent::TapScheduled => match serde_json::from_value::<TapAction>(payload.clone()) {
                Ok(action) => executor.tap(&action),
                Err(e) => logger::warn_p("engine", &format!("bad tap payload: {}", e)),
            },
            EngineEvent::ScrollScheduled => {
                match serde_json::from_value::<ScrollAction>(payload.clone()) {
                    Ok(action) => executor.scroll(&action),
                    Err(e) => logger::warn_p("engine", &format!("bad scroll payload: {}", e)),
                }
            }
            _ => {}
        }
    }
}

fn log_record(record: &EventRecord) {
    let mut line = format!("{} {}", record.event, record.scenario_id);
    if let Some(stage) = &record.stage_id {
        line.push_str(&format!(" stage={}", stage));
    }
    if let Some(payload) = &record.payload {
        line.push_str(&format!(" {}", payload));
    }
    logger::info_p("engine", &line);
}
