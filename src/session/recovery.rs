use crate::transport::BdAddr;

/// What to do after the link to the console broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    Reconnect(BdAddr),
    FreshConnect,
}

/// Consecutive failed reconnects since the session was last Connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectCounter {
    failures: u32,
    limit: u32,
}

impl ReconnectCounter {
    pub fn new(limit: u32) -> Self {
        Self { failures: 0, limit }
    }

    pub fn value(&self) -> u32 {
        self.failures
    }

    pub fn allows_reconnect(&self) -> bool {
        self.failures < self.limit
    }

    pub fn record_failure(&mut self) {
        self.failures = self.failures.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }

    pub fn next_action(&self, console: BdAddr) -> RecoveryAction {
        if self.allows_reconnect() {
            RecoveryAction::Reconnect(console)
        } else {
            RecoveryAction::FreshConnect
        }
    }
}
