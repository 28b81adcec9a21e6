use std::io;
use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use anyhow::Result;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use tapbot_core::executor::StubExecutor;
use tapbot_core::matcher::StubMatcher;
use tapbot_core::runner::{self, Command, RunnerState, ScenarioStatus};
use tapbot_core::settings::Settings;
use tapbot_core::{catalog, engine, logger};

fn main() -> Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let catalog_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| cwd.join("scenarios.json"));
    let logs_dir = cwd.join("logs");
    let settings_path = cwd.join("settings.json");

    logger::init(&logs_dir);
    logger::register_prefix("engine", logger::COLOR_BLUE);
    logger::register_prefix("exec", logger::COLOR_GRAY);
    logger::register_prefix("match", logger::COLOR_GRAY);

    // Load the scenario catalog and restore enabled state
    let mut scenarios = catalog::load(&catalog_path)?;
    let settings = Settings::load(&settings_path);
    if !settings.enabled_scenarios.is_empty() {
        for scenario in &mut scenarios {
            scenario.enabled = settings.enabled_scenarios.contains(&scenario.id);
        }
    }
    logger::info(&format!(
        "loaded {} scenario(s) from {}",
        scenarios.len(),
        catalog_path.display()
    ));

    // Stub collaborators: synthetic frames in, logged actions out
    let matcher = StubMatcher::from_catalog(&scenarios, engine::DEFAULT_SEED);
    let executor = StubExecutor;

    // Shared state
    let rows: Vec<ScenarioStatus> = scenarios.into_iter().map(ScenarioStatus::new).collect();
    let state = Arc::new(Mutex::new(rows));
    let runner_state = Arc::new(Mutex::new(RunnerState::Stopped));

    // Channels
    let (log_tx, log_rx) = mpsc::channel::<String>();
    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();

    logger::set_tui_sender(log_tx);
    logger::info("tapbot started");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = tapbot_tui::App::new(
        Arc::clone(&state),
        Arc::clone(&runner_state),
        log_rx,
        cmd_tx,
    );

    // Spawn the runner on a background thread
    let runner_rows = Arc::clone(&state);
    let runner_rs = Arc::clone(&runner_state);
    thread::spawn(move || {
        runner::run(
            runner_rows,
            runner_rs,
            Box::new(matcher),
            Box::new(executor),
            engine::DEFAULT_SEED,
            cmd_rx,
        );
    });

    // Run TUI event loop on the main thread
    let result = tapbot_tui::event::run(&mut terminal, &mut app);

    // Persist enabled set
    {
        let rows = state.lock().unwrap();
        let settings = Settings {
            enabled_scenarios: rows
                .iter()
                .filter(|r| r.scenario.enabled)
                .map(|r| r.scenario.id.clone())
                .collect(),
        };
        settings.save(&settings_path);
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}
