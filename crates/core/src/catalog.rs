use std::path::Path;

use anyhow::{Context, Result};

use crate::logger;
use crate::scenario::{Scenario, Stage};

/// Load a scenario catalog from a JSON file (an array of scenarios).
///
/// Structural oddities are warned about but never rejected: the engine
/// treats catalog validity as the author's responsibility, and a
/// scroll-led or empty scenario is simply unreachable at activation.
pub fn load(path: &Path) -> Result<Vec<Scenario>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    let scenarios: Vec<Scenario> = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse catalog {}", path.display()))?;

    for scenario in &scenarios {
        match scenario.stages.first() {
            None => {
                logger::warn(&format!("scenario {} has no stages", scenario.id));
            }
            Some(Stage::Scroll(_)) => {
                logger::warn(&format!(
                    "scenario {} starts with a scroll stage and can never activate",
                    scenario.id
                ));
            }
            Some(Stage::TemplateTap(_)) => {}
        }
    }

    Ok(scenarios)
}
