//! `ds-bench` - Matrix-multiply benchmark runner for device-smoke.
//!
//! Implements the measurement protocol: a single timed multiply per device,
//! input generation and transfers outside every timed window, and — on
//! accelerators — one untimed warm-up multiply with synchronization
//! barriers bracketing the timed region. Report formatting lives here too
//! so the output format is pinned by tests.

pub mod report;
pub mod runner;

pub use report::{format_seconds, speedup_line, SmokeReport, SKIP_NOTICE};
pub use runner::{bench_accelerator, bench_cpu, generate_inputs, DEFAULT_MATRIX_SIZE};
