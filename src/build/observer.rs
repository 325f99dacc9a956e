//! Hooks around every task execution.

use super::task::Task;
use crate::log;
use std::{cell::Cell, time::Instant};

/// Notified before and after each task, in list order.
pub trait TaskObserver {
    fn before(&self, _task: &Task) {}
    fn after(&self, _task: &Task, _result: Result<(), &anyhow::Error>) {}
}

/// Logs how long each task took, or why it failed.
#[derive(Default)]
pub struct LogObserver {
    started: Cell<Option<Instant>>,
}

impl TaskObserver for LogObserver {
    fn before(&self, _task: &Task) {
        self.started.set(Some(Instant::now()));
    }

    fn after(&self, task: &Task, result: Result<(), &anyhow::Error>) {
        let elapsed = self.started.take().map(|t| t.elapsed().as_millis()).unwrap_or_default();
        match result {
            Ok(()) => log!("task"; "{task} ({elapsed}ms)"),
            Err(e) => log!("error"; "{task}: {e:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_observer_resets_timer() {
        let observer = LogObserver::default();
        observer.before(&Task::CopyAssets);
        assert!(observer.started.get().is_some());
        observer.after(&Task::CopyAssets, Ok(()));
        assert!(observer.started.get().is_none());
    }
}
