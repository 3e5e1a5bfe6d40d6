//! Test double for [`LifecycleReporter`] that records stage transitions.

use std::sync::Mutex;

use crate::health::{LifecycleReporter, Stage};
use crate::process::LaunchError;

/// Lifecycle events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A stage was entered.
    Entered(Stage),
    /// The launch failed in a stage with a rendered error.
    Failed(Stage, String),
}

/// Records lifecycle events for assertions.
#[derive(Debug, Default)]
pub struct RecordingLifecycleReporter {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingLifecycleReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .clone()
    }

    /// Stages entered, in order.
    #[must_use]
    pub fn stages(&self) -> Vec<Stage> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                LifecycleEvent::Entered(stage) => Some(stage),
                LifecycleEvent::Failed(..) => None,
            })
            .collect()
    }

    /// Stage the launch failed in, if any.
    #[must_use]
    pub fn failed_stage(&self) -> Option<Stage> {
        self.events().into_iter().find_map(|event| match event {
            LifecycleEvent::Failed(stage, _) => Some(stage),
            LifecycleEvent::Entered(_) => None,
        })
    }

    fn record(&self, event: LifecycleEvent) {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .push(event);
    }
}

impl LifecycleReporter for RecordingLifecycleReporter {
    fn stage_entered(&self, stage: Stage) {
        self.record(LifecycleEvent::Entered(stage));
    }

    fn launch_failed(&self, stage: Stage, error: &LaunchError) {
        self.record(LifecycleEvent::Failed(stage, error.to_string()));
    }
}
