use std::sync::{mpsc, Arc, Mutex};

use crate::engine::ScenarioEngine;
use crate::executor::{dispatch, Executor};
use crate::logger;
use crate::matcher::Matcher;
use crate::scenario::Scenario;
use crate::sleep;

/// Nominal gap between frames; actual pacing is jittered.
pub const FRAME_INTERVAL_MS: u64 = 100;

/// Command from TUI to runner.
pub enum Command {
    Toggle(usize),
    StartStop,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Stopped,
    Running,
    Stopping,
}

/// One catalog entry plus its runtime status, shared with the TUI.
pub struct ScenarioStatus {
    pub scenario: Scenario,
    pub active: bool,
    pub last_event: Option<String>,
}

impl ScenarioStatus {
    pub fn new(scenario: Scenario) -> Self {
        Self { scenario, active: false, last_event: None }
    }
}

fn build_engine(rows: &[ScenarioStatus], seed: u64) -> ScenarioEngine {
    let scenarios: Vec<Scenario> = rows
        .iter()
        .filter(|r| r.scenario.enabled)
        .map(|r| r.scenario.clone())
        .collect();
    ScenarioEngine::new(scenarios, seed)
}

/// Drain pending commands. Returns false on Quit.
fn process_commands(
    cmd_rx: &mpsc::Receiver<Command>,
    state: &Mutex<Vec<ScenarioStatus>>,
    runner_state: &Mutex<RunnerState>,
    engine: &mut Option<ScenarioEngine>,
    seed: u64,
) -> bool {
    while let Ok(cmd) = cmd_rx.try_recv() {
        match cmd {
            Command::Quit => {
                logger::info("shutting down");
                *engine = None;
                *runner_state.lock().unwrap() = RunnerState::Stopped;
                return false;
            }
            Command::Toggle(idx) => {
                let mut rows = state.lock().unwrap();
                let Some(row) = rows.get_mut(idx) else { continue };
                row.scenario.enabled = !row.scenario.enabled;
                row.active = false;
                logger::info(&format!(
                    "enable {}: {}",
                    row.scenario.id, row.scenario.enabled
                ));
                // The catalog is fixed per engine instance; a toggle
                // while running means a fresh engine.
                if engine.is_some() {
                    *engine = Some(build_engine(&rows, seed));
                    logger::info("catalog changed, engine rebuilt");
                }
            }
            Command::StartStop => {
                // TUI already flipped runner_state; teardown happens in
                // the main loop.
                match *runner_state.lock().unwrap() {
                    RunnerState::Running => logger::info("runner started"),
                    RunnerState::Stopping => logger::info("runner stopping..."),
                    RunnerState::Stopped => {}
                }
            }
        }
    }
    true
}

/// Main runner loop. Runs on a background thread: one matcher frame per
/// tick through the engine, events dispatched to the executor, status
/// written back under a brief lock.
pub fn run(
    state: Arc<Mutex<Vec<ScenarioStatus>>>,
    runner_state: Arc<Mutex<RunnerState>>,
    mut matcher: Box<dyn Matcher>,
    mut executor: Box<dyn Executor>,
    seed: u64,
    cmd_rx: mpsc::Receiver<Command>,
) {
    let mut engine: Option<ScenarioEngine> = None;

    loop {
        if !process_commands(&cmd_rx, &state, &runner_state, &mut engine, seed) {
            return;
        }

        let current = *runner_state.lock().unwrap();
        if current == RunnerState::Stopping {
            engine = None;
            for row in state.lock().unwrap().iter_mut() {
                row.active = false;
            }
            *runner_state.lock().unwrap() = RunnerState::Stopped;
            logger::info("runner stopped");
            continue;
        }
        if current != RunnerState::Running {
            sleep::sleep_ms(100);
            continue;
        }

        if engine.is_none() {
            let rows = state.lock().unwrap();
            let enabled = rows.iter().filter(|r| r.scenario.enabled).count();
            let built = build_engine(&rows, seed);
            drop(rows);
            logger::info(&format!(
                "engine built: {} enabled scenario(s), seed {}",
                enabled, seed
            ));
            engine = Some(built);
        }
        let Some(eng) = engine.as_mut() else { continue };

        let frame = matcher.next_frame();
        let events = eng.process(&frame);
        dispatch(&events, executor.as_mut());

        // Write back status (brief lock)
        let active_id = eng.active_scenario_id().map(str::to_string);
        {
            let mut rows = state.lock().unwrap();
            for row in rows.iter_mut() {
                row.active = active_id.as_deref() == Some(row.scenario.id.as_str());
            }
            for record in &events {
                if let Some(row) =
                    rows.iter_mut().find(|r| r.scenario.id == record.scenario_id)
                {
                    row.last_event = Some(record.event.to_string());
                }
            }
        }

        sleep::pace(FRAME_INTERVAL_MS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{DelayRange, Rect};
    use crate::scenario::{Stage, TemplateTapStage};

    fn demo_scenario(id: &str) -> Scenario {
        Scenario {
            id: id.to_string(),
            name: id.to_string(),
            stages: vec![Stage::TemplateTap(TemplateTapStage {
                id: format!("{}-1", id),
                timeout_ms: 1000,
                search_region: Rect { x: 0, y: 0, width: 100, height: 100 },
                delay_before_tap: DelayRange::new(10, 40).unwrap(),
                click_jitter_px: 2,
                threshold: 0.8,
                stable_frames_required: 1,
            })],
            enabled: true,
            priority: 100,
        }
    }

    #[test]
    fn toggle_flips_enabled_and_rebuilds_running_engine() {
        let state = Mutex::new(vec![
            ScenarioStatus::new(demo_scenario("s1")),
            ScenarioStatus::new(demo_scenario("s2")),
        ]);
        let runner_state = Mutex::new(RunnerState::Running);
        let (tx, rx) = mpsc::channel();
        let mut engine = Some(build_engine(&state.lock().unwrap(), 1));

        tx.send(Command::Toggle(0)).unwrap();
        assert!(process_commands(&rx, &state, &runner_state, &mut engine, 1));
        assert!(!state.lock().unwrap()[0].scenario.enabled);
        assert!(engine.is_some());

        tx.send(Command::Quit).unwrap();
        assert!(!process_commands(&rx, &state, &runner_state, &mut engine, 1));
        assert!(engine.is_none());
        assert_eq!(*runner_state.lock().unwrap(), RunnerState::Stopped);
    }

    #[test]
    fn build_engine_skips_disabled_rows() {
        let mut rows = vec![
            ScenarioStatus::new(demo_scenario("s1")),
            ScenarioStatus::new(demo_scenario("s2")),
        ];
        rows[0].scenario.enabled = false;
        let engine = build_engine(&rows, 1);
        // Only s2 is left; it should be the one that activates.
        let frame = crate::frame::FrameSnapshot::with_matches(
            0,
            vec![
                crate::frame::TemplateMatch {
                    stage_id: "s1-1".to_string(),
                    confidence: 0.9,
                    matched_region: Rect { x: 0, y: 0, width: 10, height: 10 },
                },
                crate::frame::TemplateMatch {
                    stage_id: "s2-1".to_string(),
                    confidence: 0.9,
                    matched_region: Rect { x: 0, y: 0, width: 10, height: 10 },
                },
            ],
        );
        let mut engine = engine;
        let events = engine.process(&frame);
        assert_eq!(events[0].scenario_id, "s2");
    }
}
