use std::time::Instant;

/// Run-relative clock. Elapsed time excludes paused spans: pausing pins the
/// reading, resuming shifts the epoch forward by the paused duration.
#[derive(Debug, Clone, Copy)]
pub struct RunClock {
    epoch: Instant,
    paused_at: Option<Instant>,
}

impl RunClock {
    pub fn started_at(now: Instant) -> Self {
        Self {
            epoch: now,
            paused_at: None,
        }
    }

    pub fn restart(&mut self, now: Instant) {
        self.epoch = now;
        self.paused_at = None;
    }

    pub fn pause(&mut self, now: Instant) {
        if self.paused_at.is_none() {
            self.paused_at = Some(now);
        }
    }

    pub fn resume(&mut self, now: Instant) {
        if let Some(paused_at) = self.paused_at.take() {
            self.epoch += now.saturating_duration_since(paused_at);
        }
    }

    #[allow(dead_code)]
    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn elapsed_ms(&self, now: Instant) -> u64 {
        let end = self.paused_at.unwrap_or(now);
        end.saturating_duration_since(self.epoch).as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn elapsed_counts_from_epoch() {
        let base = Instant::now();
        let clock = RunClock::started_at(base);
        assert_eq!(clock.elapsed_ms(base), 0);
        assert_eq!(clock.elapsed_ms(base + Duration::from_millis(250)), 250);
    }

    #[test]
    fn paused_spans_do_not_count() {
        let base = Instant::now();
        let mut clock = RunClock::started_at(base);
        clock.pause(base + Duration::from_millis(100));
        assert_eq!(clock.elapsed_ms(base + Duration::from_secs(5)), 100);

        clock.resume(base + Duration::from_millis(600));
        assert_eq!(clock.elapsed_ms(base + Duration::from_millis(600)), 100);
        assert_eq!(clock.elapsed_ms(base + Duration::from_millis(850)), 350);
    }

    #[test]
    fn pause_and_resume_are_idempotent() {
        let base = Instant::now();
        let mut clock = RunClock::started_at(base);

        clock.resume(base + Duration::from_millis(50));
        assert_eq!(clock.elapsed_ms(base + Duration::from_millis(50)), 50);

        clock.pause(base + Duration::from_millis(100));
        clock.pause(base + Duration::from_millis(400));
        assert_eq!(clock.elapsed_ms(base + Duration::from_secs(2)), 100);

        clock.resume(base + Duration::from_millis(500));
        assert_eq!(clock.elapsed_ms(base + Duration::from_millis(700)), 300);
    }

    #[test]
    fn restart_resets_epoch_and_unpauses() {
        let base = Instant::now();
        let mut clock = RunClock::started_at(base);
        clock.pause(base + Duration::from_millis(300));

        clock.restart(base + Duration::from_secs(10));
        assert!(!clock.is_paused());
        assert_eq!(clock.elapsed_ms(base + Duration::from_secs(10)), 0);
        assert_eq!(
            clock.elapsed_ms(base + Duration::from_secs(10) + Duration::from_millis(40)),
            40
        );
    }
}
