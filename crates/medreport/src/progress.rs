//! The displayed transfer-progress value.
//!
//! Two producers feed one clamped, monotonic number: the genuine upload
//! fraction drives the first [`UPLOAD_SHARE`] points, and once the transfer
//! completes a synthetic estimator nudges the value toward
//! [`ESTIMATE_CEILING`]. Only the terminal response may set 100, so the bar
//! cannot claim a success that has not happened.

use rand::Rng;

/// Share of the bar driven by real upload progress, in percent points.
pub const UPLOAD_SHARE: f64 = 25.0;

/// The estimator never advances past this value.
pub const ESTIMATE_CEILING: f64 = 95.0;

#[derive(Debug, Clone, Default)]
pub struct DisplayProgress {
    percent: f64,
    upload_done: bool,
}

impl DisplayProgress {
    pub fn new() -> Self {
        DisplayProgress::default()
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    pub fn upload_done(&self) -> bool {
        self.upload_done
    }

    /// Genuine transfer progress, as the fraction of bytes sent.
    pub fn observe_upload(&mut self, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0);
        self.percent = self.percent.max(fraction * UPLOAD_SHARE);
        if fraction >= 1.0 {
            self.upload_done = true;
        }
    }

    /// One estimator step: a small randomized increment, active only after
    /// the transfer finished and never exceeding the ceiling.
    pub fn estimate_tick<R: Rng>(&mut self, rng: &mut R) {
        if !self.upload_done || self.percent >= ESTIMATE_CEILING {
            return;
        }
        let increment = rng.gen::<f64>() * 2.0 + 0.5;
        self.percent = (self.percent + increment).min(ESTIMATE_CEILING);
    }

    /// Terminal success. The only way to reach 100.
    pub fn complete(&mut self) {
        self.percent = 100.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_upload_drives_the_first_quarter() {
        let mut progress = DisplayProgress::new();
        progress.observe_upload(0.5);
        assert_eq!(progress.percent(), 12.5);
        progress.observe_upload(1.0);
        assert_eq!(progress.percent(), 25.0);
        assert!(progress.upload_done());
    }

    #[test]
    fn test_display_value_is_monotonic() {
        let mut progress = DisplayProgress::new();
        progress.observe_upload(0.8);
        let before = progress.percent();
        progress.observe_upload(0.2);
        assert_eq!(progress.percent(), before);
    }

    #[test]
    fn test_estimator_waits_for_upload_completion() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut progress = DisplayProgress::new();
        progress.observe_upload(0.5);
        progress.estimate_tick(&mut rng);
        assert_eq!(progress.percent(), 12.5);
    }

    #[test]
    fn test_estimator_is_capped_below_completion() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut progress = DisplayProgress::new();
        progress.observe_upload(1.0);
        for _ in 0..1000 {
            progress.estimate_tick(&mut rng);
            assert!(progress.percent() <= ESTIMATE_CEILING);
        }
        assert_eq!(progress.percent(), ESTIMATE_CEILING);
    }

    #[test]
    fn test_estimator_steps_are_bounded() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut progress = DisplayProgress::new();
        progress.observe_upload(1.0);
        let mut last = progress.percent();
        for _ in 0..20 {
            progress.estimate_tick(&mut rng);
            let step = progress.percent() - last;
            assert!(step >= 0.0 && step <= 2.5);
            last = progress.percent();
        }
    }

    #[test]
    fn test_only_completion_reaches_full() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut progress = DisplayProgress::new();
        progress.observe_upload(1.0);
        for _ in 0..1000 {
            progress.estimate_tick(&mut rng);
        }
        assert!(progress.percent() < 100.0);
        progress.complete();
        assert_eq!(progress.percent(), 100.0);
    }
}
