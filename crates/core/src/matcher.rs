use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::frame::{FrameSnapshot, TemplateMatch};
use crate::geom::Rect;
use crate::logger;
use crate::scenario::{Scenario, Stage};

/// Frame source. The real implementation is the external template
/// matcher; one call yields one timestamped set of match results.
pub trait Matcher: Send {
    fn next_frame(&mut self) -> FrameSnapshot;
}

/// Synthesizes frames for the tap stages found in a catalog, so the app
/// runs end to end without a vision pipeline. Deterministic for a fixed
/// seed: its own rng decides which stages "match" each frame.
pub struct StubMatcher {
    targets: Vec<(String, Rect)>,
    clock_ms: u64,
    interval_ms: u64,
    rng: StdRng,
}

impl StubMatcher {
    pub fn from_catalog(scenarios: &[Scenario], seed: u64) -> Self {
        let mut targets = Vec::new();
        for scenario in scenarios {
            for stage in &scenario.stages {
                match stage {
                    Stage::TemplateTap(s) => targets.push((s.id.clone(), s.search_region)),
                    Stage::Scroll(_) => {}
                }
            }
        }
        logger::info_p(
            "match",
            &format!("stub matcher: {} tap target(s), seed {}", targets.len(), seed),
        );
        Self {
            targets,
            clock_ms: 0,
            interval_ms: 100,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Matcher for StubMatcher {
    fn next_frame(&mut self) -> FrameSnapshot {
        self.clock_ms += self.interval_ms;
        let mut matches = Vec::new();
        for (id, region) in &self.targets {
            // Roughly two frames out of three see a match.
            if !self.rng.gen_bool(0.66) {
                continue;
            }
            let w = (region.width / 4).max(1);
            let h = (region.height / 4).max(1);
            let x = region.x + self.rng.gen_range(0..=region.width.max(1) - 1);
            let y = region.y + self.rng.gen_range(0..=region.height.max(1) - 1);
            matches.push(TemplateMatch {
                stage_id: id.clone(),
                confidence: self.rng.gen_range(0.7..1.0),
                matched_region: Rect { x, y, width: w, height: h },
            });
        }
        FrameSnapshot::with_matches(self.clock_ms, matches)
    }
}
