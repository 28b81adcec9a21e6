use std::sync::{mpsc, Arc, Mutex};

use tapbot_core::runner::{Command, RunnerState, ScenarioStatus};

pub struct App {
    pub state: Arc<Mutex<Vec<ScenarioStatus>>>,
    pub runner_state: Arc<Mutex<RunnerState>>,
    pub selected: usize,
    pub log_visible: bool,
    pub log_messages: Vec<String>,
    pub log_scroll: usize, // scroll offset from bottom (0 = latest)
    pub log_rx: mpsc::Receiver<String>,
    pub cmd_tx: mpsc::Sender<Command>,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        state: Arc<Mutex<Vec<ScenarioStatus>>>,
        runner_state: Arc<Mutex<RunnerState>>,
        log_rx: mpsc::Receiver<String>,
        cmd_tx: mpsc::Sender<Command>,
    ) -> Self {
        Self {
            state,
            runner_state,
            selected: 0,
            log_visible: true,
            log_messages: Vec::new(),
            log_scroll: 0,
            log_rx,
            cmd_tx,
            should_quit: false,
        }
    }

    pub fn drain_logs(&mut self) {
        while let Ok(msg) = self.log_rx.try_recv() {
            self.log_messages.push(msg);
        }
    }

    pub fn scroll_log_up(&mut self, n: usize) {
        self.log_scroll = self.log_scroll.saturating_add(n);
    }

    pub fn scroll_log_down(&mut self, n: usize) {
        self.log_scroll = self.log_scroll.saturating_sub(n);
    }

    pub fn move_up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    pub fn move_down(&mut self) {
        let len = self.state.lock().unwrap().len();
        if self.selected + 1 < len {
            self.selected += 1;
        }
    }

    pub fn toggle_selected(&mut self) {
        self.cmd_tx.send(Command::Toggle(self.selected)).ok();
    }

    /// Flip the runner state and tell the runner to react.
    pub fn start_stop(&mut self) {
        {
            let mut rs = self.runner_state.lock().unwrap();
            *rs = match *rs {
                RunnerState::Stopped => RunnerState::Running,
                RunnerState::Running => RunnerState::Stopping,
                RunnerState::Stopping => RunnerState::Stopping,
            };
        }
        self.cmd_tx.send(Command::StartStop).ok();
    }

    pub fn toggle_log(&mut self) {
        self.log_visible = !self.log_visible;
    }

    pub fn quit(&mut self) {
        self.cmd_tx.send(Command::Quit).ok();
        self.should_quit = true;
    }
}
