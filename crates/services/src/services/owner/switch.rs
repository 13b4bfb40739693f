use std::sync::atomic::{AtomicBool, Ordering};

/// Soft kill switch for the agent routes (chat, speech, fetch, task). The
/// process keeps serving the page, health and owner routes while it is off.
#[derive(Debug, Default)]
pub struct AgentSwitch {
    shut_down: AtomicBool,
}

impl AgentSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shut_down(&self) {
        if !self.shut_down.swap(true, Ordering::SeqCst) {
            tracing::warn!("Agent shut down by owner; agent routes answer 503");
        }
    }

    pub fn start(&self) {
        if self.shut_down.swap(false, Ordering::SeqCst) {
            tracing::info!("Agent started by owner");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}
