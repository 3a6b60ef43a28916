use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

use super::styling::{bright, bright_green, bright_yellow};

/// Progress of the four submission phases
pub struct PhaseProgress {
    pb: ProgressBar,
}

impl PhaseProgress {
    pub fn start_clone() -> Self {
        eprintln!("{}  {}", bright("⚙️"), bright("Phases").underlined());
        let pb = create_spinner(bright_yellow("Phase 1/4: Cloning repository").to_string());
        Self { pb }
    }

    pub fn finish_clone_start_commit(self) -> Self {
        self.pb
            .finish_with_message(bright_green("Phase 1/4: Cloned repository ✓").to_string());
        let pb = create_spinner(bright_yellow("Phase 2/4: Committing pipeline").to_string());
        Self { pb }
    }

    pub fn finish_commit_start_push(self) -> Self {
        self.pb
            .finish_with_message(bright_green("Phase 2/4: Committed pipeline ✓").to_string());
        let pb = create_spinner(bright_yellow("Phase 3/4: Pushing branch").to_string());
        Self { pb }
    }

    pub fn finish_push_start_trigger(self) -> Self {
        self.pb
            .finish_with_message(bright_green("Phase 3/4: Pushed branch ✓").to_string());
        let pb = create_spinner(bright_yellow("Phase 4/4: Triggering pipeline").to_string());
        Self { pb }
    }

    pub fn finish_trigger(self) {
        self.pb
            .finish_with_message(bright_green("Phase 4/4: Pipeline triggered ✓").to_string());
        eprintln!();
    }
}

/// Spinner shown between polls of `results --watch`.
pub fn waiting_spinner(message: impl std::fmt::Display) -> ProgressBar {
    create_spinner(bright_yellow(message).to_string())
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    let style = ProgressStyle::default_spinner()
        .template("  {msg} {spinner}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
