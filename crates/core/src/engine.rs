use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

use crate::event::{EngineEvent, EventRecord};
use crate::frame::{FrameSnapshot, TemplateMatch};
use crate::geom::Point;
use crate::scenario::{Scenario, ScrollDirection, ScrollStage, Stage, TemplateTapStage};

/// Seed used when the caller does not care about reproducing a run.
pub const DEFAULT_SEED: u64 = 42;

/// Progress of the one running scenario: index into the sorted catalog,
/// stage index, and when the current stage started.
struct Active {
    scenario: usize,
    stage: usize,
    started_ms: u64,
}

/// Arbitrates among the scenario catalog: at most one scenario runs at a
/// time, advancing stage by stage as frames confirm. All randomness comes
/// from the injected seed, so a fixed (seed, frame sequence) reproduces
/// the exact event stream. Not safe for concurrent `process` calls;
/// callers serialize.
pub struct ScenarioEngine {
    scenarios: Vec<Scenario>,
    rng: StdRng,
    active: Option<Active>,
    stable_hits: HashMap<String, u32>,
}

impl ScenarioEngine {
    /// Filters to enabled scenarios and sorts ascending by priority
    /// (stable, so catalog order breaks ties).
    pub fn new(scenarios: Vec<Scenario>, seed: u64) -> Self {
        let mut scenarios: Vec<Scenario> =
            scenarios.into_iter().filter(|s| s.enabled).collect();
        scenarios.sort_by_key(|s| s.priority);
        Self {
            scenarios,
            rng: StdRng::seed_from_u64(seed),
            active: None,
            stable_hits: HashMap::new(),
        }
    }

    pub fn with_default_seed(scenarios: Vec<Scenario>) -> Self {
        Self::new(scenarios, DEFAULT_SEED)
    }

    /// Id of the running scenario, if any. Side-effect free.
    pub fn active_scenario_id(&self) -> Option<&str> {
        self.active
            .as_ref()
            .map(|a| self.scenarios[a.scenario].id.as_str())
    }

    /// Consume one frame; returns the events it produced, in order.
    pub fn process(&mut self, frame: &FrameSnapshot) -> Vec<EventRecord> {
        if self.active.is_none() {
            self.try_activate(frame)
        } else {
            self.step_active(frame)
        }
    }

    /// Idle scan over the priority-sorted catalog. Only a TemplateTap
    /// first stage can activate; evaluating the predicate bumps that
    /// stage's stable-hit counter even when a higher-priority scenario
    /// ends up winning later frames (inherited behavior).
    fn try_activate(&mut self, frame: &FrameSnapshot) -> Vec<EventRecord> {
        for idx in 0..self.scenarios.len() {
            let Some(Stage::TemplateTap(first)) = self.scenarios[idx].stages.first() else {
                continue;
            };
            if confirm_match(&mut self.stable_hits, frame, first).is_none() {
                continue;
            }
            self.active = Some(Active {
                scenario: idx,
                stage: 0,
                started_ms: frame.timestamp_ms,
            });
            self.stable_hits.clear();
            return vec![EventRecord::new(
                EngineEvent::ScenarioActivated,
                &self.scenarios[idx].id,
            )];
        }
        Vec::new()
    }

    fn step_active(&mut self, frame: &FrameSnapshot) -> Vec<EventRecord> {
        let Some(active) = &self.active else {
            return Vec::new();
        };
        let scenario_id = self.scenarios[active.scenario].id.clone();
        let stage = self.scenarios[active.scenario].stages[active.stage].clone();

        // Strict inequality: elapsed exactly equal to the timeout is fine.
        if frame.timestamp_ms.saturating_sub(active.started_ms) > stage.timeout_ms() {
            self.reset();
            return vec![EventRecord::with_stage(
                EngineEvent::ScenarioTimeout,
                &scenario_id,
                stage.id(),
            )];
        }

        match stage {
            Stage::TemplateTap(tap) => self.step_tap(frame, &scenario_id, &tap),
            Stage::Scroll(scroll) => self.step_scroll(frame, &scenario_id, &scroll),
        }
    }

    fn step_tap(
        &mut self,
        frame: &FrameSnapshot,
        scenario_id: &str,
        stage: &TemplateTapStage,
    ) -> Vec<EventRecord> {
        let Some(m) = confirm_match(&mut self.stable_hits, frame, stage) else {
            return Vec::new();
        };

        let r = m.matched_region;
        let cx = r.x + r.width / 2;
        let cy = r.y + r.height / 2;
        let dx = self.rng.gen_range(-stage.click_jitter_px..=stage.click_jitter_px);
        let dy = self.rng.gen_range(-stage.click_jitter_px..=stage.click_jitter_px);
        let sr = stage.search_region;
        let point = Point {
            x: (cx + dx).clamp(sr.x, sr.x + sr.width - 1),
            y: (cy + dy).clamp(sr.y, sr.y + sr.height - 1),
        };
        let delay_ms = stage.delay_before_tap.sample(&mut self.rng);

        let action = EventRecord::action(
            EngineEvent::TapScheduled,
            scenario_id,
            &stage.id,
            json!({ "point": point, "delay_ms": delay_ms }),
        );
        self.advance(frame.timestamp_ms, action)
    }

    /// Scroll stages have no confirmation step: they fire on the first
    /// frame that reaches them (inherited behavior).
    fn step_scroll(
        &mut self,
        frame: &FrameSnapshot,
        scenario_id: &str,
        stage: &ScrollStage,
    ) -> Vec<EventRecord> {
        let region = stage.region;
        let from = region.random_point(&mut self.rng);
        let dist = self.rng.gen_range(stage.distance_px_min..=stage.distance_px_max);
        let to = match stage.direction {
            ScrollDirection::Up => Point { x: from.x, y: (from.y - dist).max(region.y) },
            ScrollDirection::Down => Point {
                x: from.x,
                y: (from.y + dist).min(region.y + region.height - 1),
            },
            ScrollDirection::Left => Point { x: (from.x - dist).max(region.x), y: from.y },
            ScrollDirection::Right => Point {
                x: (from.x + dist).min(region.x + region.width - 1),
                y: from.y,
            },
        };
        let duration_ms = self.rng.gen_range(stage.duration_ms_min..=stage.duration_ms_max);

        let action = EventRecord::action(
            EngineEvent::ScrollScheduled,
            scenario_id,
            &stage.id,
            json!({ "from": from, "to": to, "duration_ms": duration_ms }),
        );
        self.advance(frame.timestamp_ms, action)
    }

    /// Shared tail of both stage kinds: STAGE_COMPLETED, the action
    /// event, then either SCENARIO_COMPLETED + reset (last stage) or a
    /// fresh timer and counters for the next stage.
    fn advance(&mut self, timestamp_ms: u64, action: EventRecord) -> Vec<EventRecord> {
        let Some(active) = &mut self.active else {
            return vec![action];
        };
        let scenario = &self.scenarios[active.scenario];
        let stage_id = scenario.stages[active.stage].id();

        let mut events = vec![
            EventRecord::with_stage(EngineEvent::StageCompleted, &scenario.id, stage_id),
            action,
        ];

        if active.stage + 1 >= scenario.stages.len() {
            events.push(EventRecord::new(EngineEvent::ScenarioCompleted, &scenario.id));
            self.reset();
        } else {
            active.stage += 1;
            active.started_ms = timestamp_ms;
            self.stable_hits.clear();
        }
        events
    }

    fn reset(&mut self) {
        self.active = None;
        self.stable_hits.clear();
    }
}

/// Stable-match predicate. A missing or below-threshold match resets the
/// stage's counter and fails; otherwise the counter increments and the
/// match is confirmed once it reaches `stable_frames_required`. Counters
/// are keyed by stage id, so two scenarios sharing an id share a counter
/// during the idle scan (inherited behavior).
fn confirm_match<'f>(
    stable_hits: &mut HashMap<String, u32>,
    frame: &'f FrameSnapshot,
    stage: &TemplateTapStage,
) -> Option<&'f TemplateMatch> {
    let m = match frame.matches_by_stage.get(&stage.id) {
        Some(m) if m.confidence >= stage.threshold => m,
        _ => {
            stable_hits.insert(stage.id.clone(), 0);
            return None;
        }
    };

    let count = stable_hits
        .entry(stage.id.clone())
        .and_modify(|c| *c += 1)
        .or_insert(1);
    (*count >= stage.stable_frames_required).then_some(m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ScrollAction, TapAction};
    use crate::geom::{DelayRange, Rect};

    fn tap_stage(id: &str, timeout_ms: u64, threshold: f64, stable: u32) -> Stage {
        Stage::TemplateTap(TemplateTapStage {
            id: id.to_string(),
            timeout_ms,
            search_region: Rect { x: 0, y: 0, width: 500, height: 500 },
            delay_before_tap: DelayRange::new(10, 40).unwrap(),
            click_jitter_px: 5,
            threshold,
            stable_frames_required: stable,
        })
    }

    fn scroll_stage(id: &str, timeout_ms: u64, direction: ScrollDirection) -> Stage {
        Stage::Scroll(ScrollStage {
            id: id.to_string(),
            timeout_ms,
            region: Rect { x: 0, y: 0, width: 500, height: 500 },
            direction,
            distance_px_min: 10,
            distance_px_max: 40,
            duration_ms_min: 100,
            duration_ms_max: 200,
        })
    }

    fn scenario(id: &str, priority: i32, stages: Vec<Stage>) -> Scenario {
        Scenario {
            id: id.to_string(),
            name: id.to_string(),
            stages,
            enabled: true,
            priority,
        }
    }

    fn hit(stage_id: &str, confidence: f64, region: Rect) -> TemplateMatch {
        TemplateMatch { stage_id: stage_id.to_string(), confidence, matched_region: region }
    }

    fn frame(ts: u64, matches: Vec<TemplateMatch>) -> FrameSnapshot {
        FrameSnapshot::with_matches(ts, matches)
    }

    fn kinds(events: &[EventRecord]) -> Vec<EngineEvent> {
        events.iter().map(|e| e.event).collect()
    }

    #[test]
    fn full_run_with_priority_arbitration() {
        let s1 = scenario(
            "s1",
            1,
            vec![tap_stage("s1-1", 1000, 0.8, 1), scroll_stage("s1-2", 1000, ScrollDirection::Up)],
        );
        let s2 = scenario("s2", 2, vec![tap_stage("s2-1", 1000, 0.8, 1)]);
        let mut engine = ScenarioEngine::new(vec![s1, s2], 1);

        // Both first stages confirm; the lower priority value wins.
        let activation = engine.process(&frame(
            100,
            vec![
                hit("s1-1", 0.92, Rect { x: 100, y: 100, width: 60, height: 30 }),
                hit("s2-1", 0.95, Rect { x: 200, y: 200, width: 60, height: 30 }),
            ],
        ));
        assert_eq!(kinds(&activation), vec![EngineEvent::ScenarioActivated]);
        assert_eq!(activation[0].scenario_id, "s1");
        assert_eq!(engine.active_scenario_id(), Some("s1"));

        let stage1 = engine.process(&frame(
            150,
            vec![hit("s1-1", 0.9, Rect { x: 100, y: 100, width: 60, height: 30 })],
        ));
        assert_eq!(
            kinds(&stage1),
            vec![EngineEvent::StageCompleted, EngineEvent::TapScheduled]
        );
        assert_eq!(stage1[0].stage_id.as_deref(), Some("s1-1"));

        // Scroll stage fires with no match at all.
        let stage2 = engine.process(&frame(200, vec![]));
        assert_eq!(
            kinds(&stage2),
            vec![
                EngineEvent::StageCompleted,
                EngineEvent::ScrollScheduled,
                EngineEvent::ScenarioCompleted,
            ]
        );
        assert_eq!(engine.active_scenario_id(), None);
    }

    #[test]
    fn timeout_resets_to_idle() {
        let s1 = scenario(
            "s1",
            100,
            vec![tap_stage("a", 50, 0.7, 1), tap_stage("b", 50, 0.7, 1)],
        );
        let mut engine = ScenarioEngine::new(vec![s1], 2);

        let region = Rect { x: 10, y: 10, width: 20, height: 20 };
        engine.process(&frame(10, vec![hit("a", 0.9, region)]));
        assert_eq!(engine.active_scenario_id(), Some("s1"));
        // Completes stage `a`, moves to `b`.
        engine.process(&frame(20, vec![hit("a", 0.91, region)]));

        // A match for the previous stage id means nothing to `b`.
        let timeout = engine.process(&frame(80, vec![hit("a", 0.95, region)]));
        assert_eq!(kinds(&timeout), vec![EngineEvent::ScenarioTimeout]);
        assert_eq!(timeout[0].stage_id.as_deref(), Some("b"));
        assert_eq!(engine.active_scenario_id(), None);
    }

    #[test]
    fn timeout_is_strictly_greater_than() {
        let s1 = scenario("s1", 100, vec![tap_stage("a", 50, 0.7, 1), tap_stage("b", 50, 0.7, 1)]);
        let mut engine = ScenarioEngine::new(vec![s1], 3);
        let region = Rect { x: 0, y: 0, width: 10, height: 10 };

        engine.process(&frame(10, vec![hit("a", 0.9, region)]));

        // Elapsed exactly 50: still waiting on stage `a`.
        let at_limit = engine.process(&frame(60, vec![]));
        assert!(at_limit.is_empty());
        assert_eq!(engine.active_scenario_id(), Some("s1"));

        // One ms past the limit times out.
        let over = engine.process(&frame(61, vec![]));
        assert_eq!(kinds(&over), vec![EngineEvent::ScenarioTimeout]);
        assert_eq!(over[0].stage_id.as_deref(), Some("a"));
    }

    #[test]
    fn stable_frames_debounce_progression() {
        let s1 = scenario(
            "s1",
            100,
            vec![tap_stage("a", 10_000, 0.8, 1), tap_stage("b", 10_000, 0.8, 3)],
        );
        let mut engine = ScenarioEngine::new(vec![s1], 4);
        let region = Rect { x: 0, y: 0, width: 40, height: 40 };

        engine.process(&frame(0, vec![hit("a", 0.9, region)]));
        engine.process(&frame(10, vec![hit("a", 0.9, region)]));

        // Two consecutive hits on `b`, then a miss resets the counter.
        assert!(engine.process(&frame(20, vec![hit("b", 0.9, region)])).is_empty());
        assert!(engine.process(&frame(30, vec![hit("b", 0.9, region)])).is_empty());
        assert!(engine.process(&frame(40, vec![])).is_empty());
        assert!(engine.process(&frame(50, vec![hit("b", 0.9, region)])).is_empty());
        assert!(engine.process(&frame(60, vec![hit("b", 0.9, region)])).is_empty());

        let done = engine.process(&frame(70, vec![hit("b", 0.9, region)]));
        assert_eq!(
            kinds(&done),
            vec![
                EngineEvent::StageCompleted,
                EngineEvent::TapScheduled,
                EngineEvent::ScenarioCompleted,
            ]
        );
    }

    #[test]
    fn below_threshold_match_resets_counter() {
        let s1 = scenario("s1", 100, vec![tap_stage("a", 10_000, 0.8, 2)]);
        let mut engine = ScenarioEngine::new(vec![s1], 5);
        let region = Rect { x: 0, y: 0, width: 40, height: 40 };

        assert!(engine.process(&frame(0, vec![hit("a", 0.9, region)])).is_empty());
        // Low-confidence frame resets the streak.
        assert!(engine.process(&frame(10, vec![hit("a", 0.5, region)])).is_empty());
        assert!(engine.process(&frame(20, vec![hit("a", 0.9, region)])).is_empty());

        let activated = engine.process(&frame(30, vec![hit("a", 0.9, region)]));
        assert_eq!(kinds(&activated), vec![EngineEvent::ScenarioActivated]);
    }

    #[test]
    fn tap_point_clamps_into_search_region() {
        let search = Rect { x: 100, y: 100, width: 20, height: 20 };
        let s1 = scenario(
            "s1",
            100,
            vec![Stage::TemplateTap(TemplateTapStage {
                id: "a".to_string(),
                timeout_ms: 10_000,
                search_region: search,
                delay_before_tap: DelayRange::new(10, 40).unwrap(),
                // Jitter far larger than the search region.
                click_jitter_px: 500,
                threshold: 0.5,
                stable_frames_required: 1,
            })],
        );

        for seed in 0..20 {
            let mut engine = ScenarioEngine::new(vec![s1.clone()], seed);
            let region = Rect { x: 0, y: 0, width: 300, height: 300 };
            engine.process(&frame(0, vec![hit("a", 0.9, region)]));
            let events = engine.process(&frame(10, vec![hit("a", 0.9, region)]));
            let tap: TapAction =
                serde_json::from_value(events[1].payload.clone().unwrap()).unwrap();
            assert!((100..=119).contains(&tap.point.x), "x {} escaped", tap.point.x);
            assert!((100..=119).contains(&tap.point.y), "y {} escaped", tap.point.y);
            assert!((10..=40).contains(&tap.delay_ms));
        }
    }

    #[test]
    fn scroll_end_point_clamps_to_region_edge() {
        for (direction, seed) in [
            (ScrollDirection::Up, 11),
            (ScrollDirection::Down, 12),
            (ScrollDirection::Left, 13),
            (ScrollDirection::Right, 14),
        ] {
            let s1 = scenario(
                "s1",
                100,
                vec![
                    tap_stage("a", 10_000, 0.5, 1),
                    Stage::Scroll(ScrollStage {
                        id: "sc".to_string(),
                        timeout_ms: 10_000,
                        region: Rect { x: 50, y: 60, width: 30, height: 20 },
                        direction,
                        distance_px_min: 500,
                        distance_px_max: 900,
                        duration_ms_min: 100,
                        duration_ms_max: 200,
                    }),
                ],
            );
            let mut engine = ScenarioEngine::new(vec![s1], seed);
            let region = Rect { x: 0, y: 0, width: 300, height: 300 };
            engine.process(&frame(0, vec![hit("a", 0.9, region)]));
            engine.process(&frame(10, vec![hit("a", 0.9, region)]));
            let events = engine.process(&frame(20, vec![]));
            let scroll: ScrollAction =
                serde_json::from_value(events[1].payload.clone().unwrap()).unwrap();
            // Distance always exceeds the region, so the end point sits
            // on the edge the scroll runs toward.
            match direction {
                ScrollDirection::Up => assert_eq!(scroll.to.y, 60),
                ScrollDirection::Down => assert_eq!(scroll.to.y, 79),
                ScrollDirection::Left => assert_eq!(scroll.to.x, 50),
                ScrollDirection::Right => assert_eq!(scroll.to.x, 79),
            }
            assert!((100..=200).contains(&scroll.duration_ms));
        }
    }

    #[test]
    fn scroll_led_scenario_never_activates() {
        let s1 = scenario("s1", 1, vec![scroll_stage("sc", 1000, ScrollDirection::Down)]);
        let s2 = scenario("s2", 2, vec![tap_stage("t", 1000, 0.8, 1)]);
        let mut engine = ScenarioEngine::new(vec![s1, s2], 6);

        let events = engine.process(&frame(
            0,
            vec![hit("t", 0.9, Rect { x: 0, y: 0, width: 10, height: 10 })],
        ));
        assert_eq!(events[0].scenario_id, "s2");
    }

    #[test]
    fn disabled_scenarios_are_filtered_and_ties_keep_input_order() {
        let mut off = scenario("off", 1, vec![tap_stage("x", 1000, 0.8, 1)]);
        off.enabled = false;
        let first = scenario("first", 5, vec![tap_stage("x", 1000, 0.8, 1)]);
        let second = scenario("second", 5, vec![tap_stage("x", 1000, 0.8, 1)]);
        let mut engine = ScenarioEngine::new(vec![off, first, second], 7);

        let events = engine.process(&frame(
            0,
            vec![hit("x", 0.9, Rect { x: 0, y: 0, width: 10, height: 10 })],
        ));
        assert_eq!(events[0].scenario_id, "first");
    }

    #[test]
    fn fixed_seed_reproduces_the_event_stream() {
        let build = || {
            vec![
                scenario(
                    "s1",
                    1,
                    vec![
                        tap_stage("s1-1", 1000, 0.8, 1),
                        scroll_stage("s1-2", 1000, ScrollDirection::Right),
                    ],
                ),
                scenario("s2", 2, vec![tap_stage("s2-1", 1000, 0.8, 1)]),
            ]
        };
        let frames = vec![
            frame(100, vec![hit("s1-1", 0.92, Rect { x: 100, y: 100, width: 60, height: 30 })]),
            frame(150, vec![hit("s1-1", 0.9, Rect { x: 100, y: 100, width: 60, height: 30 })]),
            frame(200, vec![]),
            frame(250, vec![hit("s2-1", 0.95, Rect { x: 200, y: 200, width: 60, height: 30 })]),
        ];

        let run = |seed: u64| -> Vec<EventRecord> {
            let mut engine = ScenarioEngine::new(build(), seed);
            frames.iter().flat_map(|f| engine.process(f)).collect()
        };

        assert_eq!(run(9), run(9));
        // Payloads are seed-dependent, so a different seed diverges.
        assert_ne!(run(9), run(10));
    }

    #[test]
    fn empty_catalog_stays_idle() {
        let mut engine = ScenarioEngine::with_default_seed(Vec::new());
        assert_eq!(engine.active_scenario_id(), None);
        assert!(engine.process(&frame(0, vec![])).is_empty());
        assert_eq!(engine.active_scenario_id(), None);
    }

    #[test]
    fn idle_scan_keeps_counters_for_losing_scenarios() {
        // s1 needs two stable frames; s2 needs one. s2 wins the second
        // frame, but s1's counter was still bumped on both scans.
        let s1 = scenario("s1", 1, vec![tap_stage("s1-1", 1000, 0.8, 2)]);
        let s2 = scenario("s2", 2, vec![tap_stage("s2-1", 1000, 0.8, 2)]);
        let mut engine = ScenarioEngine::new(vec![s1, s2], 8);
        let region = Rect { x: 0, y: 0, width: 10, height: 10 };

        // Frame 1: both counters go to 1, nothing confirms.
        assert!(engine
            .process(&frame(0, vec![hit("s1-1", 0.9, region), hit("s2-1", 0.9, region)]))
            .is_empty());
        // Frame 2: s1 confirms first and wins before s2 is evaluated.
        let events =
            engine.process(&frame(10, vec![hit("s1-1", 0.9, region), hit("s2-1", 0.9, region)]));
        assert_eq!(kinds(&events), vec![EngineEvent::ScenarioActivated]);
        assert_eq!(events[0].scenario_id, "s1");
    }
}
