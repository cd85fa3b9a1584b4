//! Hash-rate telemetry. A meter is an explicit handle owned by whoever
//! drives a mining session; the mining loop shares its nonce counter
//! with the meter, and the rate is computed over the counter's delta
//! between `start` and `end`. A process-wide default instance exists
//! for callers that don't carry their own.

use lazy_static::lazy_static;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

lazy_static! {
    static ref DEFAULT_METER: HashRateMeter = HashRateMeter::new();
}

/// The shared default meter.
pub fn default_meter() -> &'static HashRateMeter {
    &DEFAULT_METER
}

#[derive(Debug)]
struct Recording {
    counter: Arc<AtomicU64>,
    counter_at_start: u64,
    started: Instant,
}

#[derive(Debug, Default)]
struct MeterState {
    recording: Option<Recording>,
    current_hps: f64,
}

#[derive(Debug, Default)]
pub struct HashRateMeter {
    state: Mutex<MeterState>,
}

impl HashRateMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins a recording over `counter`, snapshotting its current
    /// value. An unmatched earlier `start` is simply overwritten.
    pub fn start(&self, counter: Arc<AtomicU64>) {
        let mut state = self.state.lock().expect("meter lock");
        state.recording = Some(Recording {
            counter_at_start: counter.load(Ordering::Relaxed),
            counter,
            started: Instant::now(),
        });
    }

    /// Ends the active recording (if any) and stores the measured rate:
    /// hashes counted since `start` divided by elapsed seconds.
    pub fn end(&self) {
        let mut state = self.state.lock().expect("meter lock");

        if let Some(recording) = state.recording.take() {
            let hashes = recording
                .counter
                .load(Ordering::Relaxed)
                .saturating_sub(recording.counter_at_start);
            let elapsed = recording.started.elapsed().as_secs_f64();

            state.current_hps = if elapsed > 0.0 {
                hashes as f64 / elapsed
            } else {
                0.0
            };
        }
    }

    /// The most recently measured rate; 0.0 before any recording ends.
    pub fn current_hps(&self) -> f64 {
        self.state.lock().expect("meter lock").current_hps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn rate_uses_counter_delta_not_absolute_value() {
        let meter = HashRateMeter::new();

        // Counter starts far from zero, as it does when mining resumes
        // from a nonzero nonce; only the delta may count.
        let counter = Arc::new(AtomicU64::new(1_000_000));
        meter.start(Arc::clone(&counter));

        counter.fetch_add(500, Ordering::Relaxed);
        thread::sleep(Duration::from_millis(20));
        meter.end();

        let hps = meter.current_hps();
        assert!(hps > 0.0);
        // 500 hashes over >= 20ms can never exceed 25k h/s; the
        // absolute-value bug would report tens of millions.
        assert!(hps <= 25_000.0, "hps = {hps}");
    }

    #[test]
    fn unmatched_start_is_overwritten() {
        let meter = HashRateMeter::new();

        let stale = Arc::new(AtomicU64::new(0));
        meter.start(Arc::clone(&stale));
        stale.fetch_add(999_999, Ordering::Relaxed);

        // Second start supersedes the first recording entirely.
        let counter = Arc::new(AtomicU64::new(0));
        meter.start(Arc::clone(&counter));
        counter.fetch_add(10, Ordering::Relaxed);
        thread::sleep(Duration::from_millis(10));
        meter.end();

        assert!(meter.current_hps() <= 1_000.0 * 10.0);
    }

    #[test]
    fn end_without_start_is_a_no_op() {
        let meter = HashRateMeter::new();
        meter.end();
        assert_eq!(meter.current_hps(), 0.0);
    }

    #[test]
    fn default_meter_is_shared() {
        let a = default_meter() as *const HashRateMeter;
        let b = default_meter() as *const HashRateMeter;
        assert_eq!(a, b);
    }
}
