use std::collections::HashMap;
use std::time::Instant;

use super::frame_metrics::format_seconds;

/// Observer for long-running passes that feed batches through a model.
pub trait PassLogger: Send {
    /// Report batch-level progress. `total` is an upper bound when the
    /// source may end early.
    fn progress(&mut self, current: usize, total: usize);

    /// Record how long a named stage took for one batch.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a per-batch value such as reconstruction error.
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// Emit an end-of-pass summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything.
pub struct NullPassLogger;

impl PassLogger for NullPassLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Forwards progress to the `log` facade and keeps per-stage timings and
/// metrics for a closing summary.
///
/// Progress lines are throttled to every `throttle_batches` batches.
pub struct LogPassLogger {
    throttle_batches: usize,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    batches: usize,
}

impl LogPassLogger {
    pub fn new(throttle_batches: usize) -> Self {
        Self {
            throttle_batches: throttle_batches.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            batches: 0,
        }
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed = self.start_time.elapsed().as_secs_f64();
        let elapsed_ms = elapsed * 1000.0;
        let mut lines = vec![format!(
            "Pass summary ({} batches, {}s):",
            self.batches,
            format_seconds(elapsed)
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = mean(durations);
            let pct = if elapsed_ms > 0.0 {
                total_ms / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "  {stage:10}: avg {avg_ms:7.1}ms  total {total_ms:8.0}ms  ({pct:4.1}%)"
            ));
        }

        let mut names: Vec<_> = self.metrics.keys().collect();
        names.sort();
        for name in names {
            let values = &self.metrics[name];
            lines.push(format!("  {name}: avg {:.3}", mean(values)));
        }

        if self.batches > 0 && elapsed > 0.0 {
            lines.push(format!(
                "  Throughput: {:.2} batches/s",
                self.batches as f64 / elapsed
            ));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }
}

impl Default for LogPassLogger {
    fn default() -> Self {
        Self::new(10)
    }
}

impl PassLogger for LogPassLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.batches = current;
        if current % self.throttle_batches == 0 || current == total {
            log::info!("Processed {current}/{total} batches");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_accepts_everything() {
        let mut logger = NullPassLogger;
        logger.progress(1, 10);
        logger.timing("model", 5.0);
        logger.metric("rms", 3.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timings_recorded_per_stage() {
        let mut logger = LogPassLogger::new(10);
        logger.timing("model", 20.0);
        logger.timing("model", 30.0);
        logger.timing("load", 5.0);

        assert_eq!(logger.timings_for("model").unwrap(), &[20.0, 30.0]);
        assert_eq!(logger.timings_for("load").unwrap().len(), 1);
        assert!(logger.timings_for("write").is_none());
    }

    #[test]
    fn test_metric_average_in_summary() {
        let mut logger = LogPassLogger::new(10);
        logger.metric("rms", 3.0);
        logger.metric("rms", 4.0);
        assert_relative_eq!(mean(logger.metrics_for("rms").unwrap()), 3.5);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("rms: avg 3.500"));
    }

    #[test]
    fn test_summary_names_stages_and_batches() {
        let mut logger = LogPassLogger::new(10);
        logger.progress(4, 4);
        logger.timing("model", 12.0);
        logger.timing("load", 3.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.starts_with("Pass summary (4 batches"));
        assert!(summary.contains("model"));
        assert!(summary.contains("load"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(LogPassLogger::default().summary_string().is_none());
    }

    #[test]
    fn test_progress_tracks_latest_batch() {
        let mut logger = LogPassLogger::new(3);
        for i in 1..=7 {
            logger.progress(i, 7);
        }
        assert_eq!(logger.batches, 7);
        assert_eq!(logger.throttle_batches, 3);
    }
}
