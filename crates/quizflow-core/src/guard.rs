//! Focus guard: terminates a session whose window loses focus.
//!
//! The policy is anti-cheating: switching away from the quiz while a card or
//! question is on screen ends the session. Focus changes arrive on
//! a channel from whatever front end hosts the session; losses outside the
//! in-progress phases are ignored.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::flow::QuizFlow;

/// A window focus change reported by the host front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusEvent {
    Gained,
    Lost,
}

/// Watches focus events and enforces the termination policy.
pub struct FocusGuard {
    task: JoinHandle<()>,
}

impl FocusGuard {
    /// Start enforcing against the given flow. Must be called inside a
    /// Tokio runtime.
    pub fn start(flow: QuizFlow, mut events: mpsc::Receiver<FocusEvent>) -> Self {
        let task = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if event != FocusEvent::Lost {
                    continue;
                }
                let phase = flow.store().snapshot().phase;
                if phase.is_in_progress() {
                    tracing::warn!(%phase, "focus lost during an active session");
                    flow.terminate();
                } else {
                    tracing::debug!(%phase, "focus lost outside an active session, ignoring");
                }
            }
        });
        Self { task }
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for FocusGuard {
    fn drop(&mut self) {
        self.stop();
    }
}
