use colored::Colorize;
use drupal_launcher_cloud::{EventObserver, LaunchObserver, StackEvent, StackHandle, StackStatus};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Terminal rendering of launch and teardown progress
///
/// One spinner per stack wait; the latest stack event replaces the spinner
/// message on every poll tick.
pub struct LaunchProgress {
    spinner: Mutex<Option<ProgressBar>>,
}

impl LaunchProgress {
    pub fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
        }
    }

    fn with_spinner(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.spinner.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }
}

impl Default for LaunchProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl EventObserver for LaunchProgress {
    fn on_event(&self, event: &StackEvent) {
        self.with_spinner(|pb| pb.set_message(format!("Last Event: {}", event)));
    }
}

impl LaunchObserver for LaunchProgress {
    fn on_step(&self, message: &str) {
        println!("{}", format!("{}...", message).cyan());
    }

    fn on_file(&self, path: &Path) {
        println!("  Deflating {}", path.display());
    }

    fn on_stack_started(&self, name: &str) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Waiting for stack {}...", name));
        pb.enable_steady_tick(Duration::from_millis(120));

        if let Ok(mut guard) = self.spinner.lock() {
            if let Some(previous) = guard.replace(pb) {
                previous.finish_and_clear();
            }
        }
    }

    fn on_stack_finished(&self, handle: &StackHandle) {
        if let Ok(mut guard) = self.spinner.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }

        let status = handle.status.to_string();
        let status = if handle.status.is_success() || handle.status == StackStatus::DeleteComplete {
            status.green()
        } else {
            status.red()
        };
        println!("Stack {} finished with status: {}", handle.name.bold(), status);
    }
}

impl Drop for LaunchProgress {
    fn drop(&mut self) {
        // 中断やエラーで終わった場合もスピナーを片付ける
        if let Ok(mut guard) = self.spinner.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}
