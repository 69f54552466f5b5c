/// Keep-alive timer. Fires `echo_ms` after the last forward of the active
/// value, whether that forward was an echo or not.
#[derive(Debug, Clone)]
pub struct EchoScheduler {
    echo_ms: u64,
    next_due_ms: Option<u64>,
}

impl EchoScheduler {
    pub fn new(echo_ms: u64) -> Self {
        Self {
            echo_ms,
            next_due_ms: None,
        }
    }

    pub fn echo_ms(&self) -> u64 {
        self.echo_ms
    }

    pub fn is_enabled(&self) -> bool {
        self.echo_ms > 0
    }

    /// Returns true when an echo should fire at `now_ms`. The first call
    /// anchors the cadence; a late tick does not cause a burst of catch-up
    /// echoes.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        if !self.is_enabled() {
            return false;
        }

        let Some(due) = self.next_due_ms else {
            self.next_due_ms = Some(now_ms.saturating_add(self.echo_ms));
            return false;
        };

        if now_ms < due {
            return false;
        }

        let next = due.saturating_add(self.echo_ms);
        self.next_due_ms = Some(if next <= now_ms {
            now_ms.saturating_add(self.echo_ms)
        } else {
            next
        });
        true
    }

    /// Pushes the next echo out to a full interval after `now_ms`. Called
    /// whenever the active value is forwarded for any other reason.
    pub fn restart(&mut self, now_ms: u64) {
        if self.is_enabled() {
            self.next_due_ms = Some(now_ms.saturating_add(self.echo_ms));
        }
    }
}
