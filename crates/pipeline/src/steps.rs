//! Ordered, update-by-name processing step history for one run.

use std::sync::Arc;

use longcut_core::step::{ProcessingStep, StepStatus};
use longcut_events::{EventBus, OrchestrationEvent, PipelineEvent};

/// Owns the step list of a run and publishes every change.
pub struct StepTracker {
    run_id: String,
    steps: Vec<ProcessingStep>,
    bus: Arc<EventBus>,
}

impl StepTracker {
    pub fn new(run_id: impl Into<String>, bus: Arc<EventBus>) -> Self {
        Self {
            run_id: run_id.into(),
            steps: Vec::new(),
            bus,
        }
    }

    /// Replace the step named `name`, or append it if this is its first
    /// transition, then emit `step-updated`.
    pub fn update(&mut self, name: &str, status: StepStatus, progress: u8, detail: Option<String>) {
        let mut step = ProcessingStep::new(name, status, progress);
        step.detail = detail;

        tracing::debug!(
            run_id = %self.run_id,
            step = name,
            status = ?status,
            progress = step.progress,
            "Step updated",
        );

        match self.steps.iter_mut().find(|s| s.name == name) {
            Some(existing) => *existing = step.clone(),
            None => self.steps.push(step.clone()),
        }
        self.bus.publish(PipelineEvent::new(
            self.run_id.clone(),
            OrchestrationEvent::StepUpdated { step },
        ));
    }

    pub fn start(&mut self, name: &str) {
        self.update(name, StepStatus::InProgress, 0, None);
    }

    pub fn progress(&mut self, name: &str, progress: u8, detail: impl Into<String>) {
        self.update(name, StepStatus::InProgress, progress, Some(detail.into()));
    }

    pub fn complete(&mut self, name: &str, detail: impl Into<String>) {
        self.update(name, StepStatus::Completed, 100, Some(detail.into()));
    }

    /// Mark `name` failed, keeping its last progress value.
    pub fn fail(&mut self, name: &str, error: impl Into<String>) {
        let progress = self.get(name).map_or(0, |s| s.progress);
        self.update(name, StepStatus::Failed, progress, Some(error.into()));
    }

    pub fn get(&self, name: &str) -> Option<&ProcessingStep> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn steps(&self) -> &[ProcessingStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<ProcessingStep> {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use longcut_core::step::{STEP_GENERATION, STEP_PLANNING};

    use super::*;

    #[test]
    fn updates_replace_by_name() {
        let mut tracker = StepTracker::new("run", Arc::new(EventBus::default()));
        tracker.start(STEP_PLANNING);
        tracker.complete(STEP_PLANNING, "3 scenes");
        tracker.start(STEP_GENERATION);
        tracker.progress(STEP_GENERATION, 40, "2/5 clips");

        let steps = tracker.steps();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].status, StepStatus::Completed);
        assert_eq!(steps[0].detail.as_deref(), Some("3 scenes"));
        assert_eq!(steps[1].progress, 40);
    }

    #[test]
    fn fail_keeps_progress() {
        let mut tracker = StepTracker::new("run", Arc::new(EventBus::default()));
        tracker.progress(STEP_GENERATION, 60, "3/5");
        tracker.fail(STEP_GENERATION, "cancelled");

        let step = tracker.get(STEP_GENERATION).unwrap();
        assert_eq!(step.status, StepStatus::Failed);
        assert_eq!(step.progress, 60);
    }

    #[tokio::test]
    async fn every_change_is_published() {
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let mut tracker = StepTracker::new("run-7", bus.clone());

        tracker.start(STEP_PLANNING);
        tracker.complete(STEP_PLANNING, "done");

        for expected in [StepStatus::InProgress, StepStatus::Completed] {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.run_id, "run-7");
            match event.event {
                OrchestrationEvent::StepUpdated { step } => assert_eq!(step.status, expected),
                other => panic!("unexpected event {other:?}"),
            }
        }
    }
}
