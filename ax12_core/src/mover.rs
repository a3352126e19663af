//! Pending-completion bookkeeping for a single actuator.
//!
//! At most one completion may be pending per actuator; arming a new one
//! revokes whatever it supersedes, so a stale callback can never resurface.

use ax12_traits::CompletionToken;

#[derive(Debug, Default)]
pub struct MoveController {
    pending: Option<CompletionToken>,
}

impl MoveController {
    /// Store the next token, revoking the one it supersedes.
    pub fn arm(&mut self, token: CompletionToken) {
        if let Some(old) = self.pending.replace(token) {
            old.revoke();
        }
    }

    /// Mute the pending notification. The claim stays armed so the
    /// completion's bookkeeping (simulated backend) still lands.
    pub fn cancel_callback(&mut self) {
        if let Some(token) = &self.pending {
            token.cancel_callback();
        }
    }

    /// Drop and revoke the pending completion outright.
    pub fn supersede(&mut self) {
        if let Some(token) = self.pending.take() {
            token.revoke();
        }
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Drop for MoveController {
    // No callback may outlive the actuator that armed it.
    fn drop(&mut self) {
        self.supersede();
    }
}
