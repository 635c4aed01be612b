use std::time::Duration;

/// Notice printed when no accelerator was found and the second benchmark
/// stage is skipped.
pub const SKIP_NOTICE: &str = "[2/2] Skipping accelerator benchmark (no GPU found).";

/// Timings collected by one smoke-test run.
#[derive(Debug, Clone)]
pub struct SmokeReport {
    pub cpu_time: Duration,
    pub accel_time: Option<Duration>,
}

impl SmokeReport {
    /// CPU time divided by accelerator time, when an accelerator ran.
    pub fn speedup(&self) -> Option<f64> {
        self.accel_time
            .map(|accel| self.cpu_time.as_secs_f64() / accel.as_secs_f64())
    }
}

/// Render a duration the way the report prints times: seconds with four
/// decimals, e.g. "1.2345s".
pub fn format_seconds(d: Duration) -> String {
    format!("{:.4}s", d.as_secs_f64())
}

/// Render the closing speedup line, e.g. "Speedup: 12.3x faster than CPU!".
pub fn speedup_line(speedup: f64) -> String {
    format!("Speedup: {:.1}x faster than CPU!", speedup)
}
