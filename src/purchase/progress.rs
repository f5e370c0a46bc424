//! Progress-reporting contract.
//!
//! Purchase jobs know nothing about how status lines are displayed; they push
//! human-readable strings into a sink. The terminal sink is the production
//! implementation, tests substitute a channel-backed one.

use console::style;

pub trait ProgressSink: Send + Sync {
    fn report(&self, status: &str);
}

/// Prints each status line to the terminal.
pub struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn report(&self, status: &str) {
        println!("  {}", style(status).cyan());
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::ProgressSink;
    use std::sync::Mutex;

    /// Collects every reported line for later assertions.
    #[derive(Default)]
    pub struct RecordingSink {
        lines: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        pub fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }
    }

    impl ProgressSink for RecordingSink {
        fn report(&self, status: &str) {
            self.lines.lock().unwrap().push(status.to_string());
        }
    }
}
