//! device-smoke: confirm that this machine's accelerated compute path works.
//!
//! Probes for an accelerator (CUDA, then Metal), benchmarks a matrix
//! multiply on the CPU and on the accelerator when one exists, and prints
//! the speedup. Takes no arguments. Any backend or driver failure
//! propagates out of `main` and exits non-zero — surfacing a broken
//! accelerated path loudly is the point of the tool.

use anyhow::{Context, Result};

use ds_bench::{
    bench_accelerator, bench_cpu, format_seconds, generate_inputs, speedup_line, SmokeReport,
    DEFAULT_MATRIX_SIZE, SKIP_NOTICE,
};
use ds_probe::{open_backend, select_device, DeviceInventory};
use ds_tensor::CpuBackend;

const RULE: &str = "------------------------------";

fn main() -> Result<()> {
    init_logging();

    println!("{RULE}");
    println!("DEVICE SMOKE TEST");
    println!("{RULE}");
    println!("device-smoke version: {}", env!("CARGO_PKG_VERSION"));

    let inventory = DeviceInventory::probe();
    let selection = select_device(&inventory);
    println!("Selected Device: {} ({})", selection.kind, selection.label);
    println!();

    let size = DEFAULT_MATRIX_SIZE;
    let mut rng = rand::thread_rng();

    println!("[1/2] Benchmarking CPU...");
    let (a, b) = generate_inputs(size, &mut rng);
    let cpu_time = bench_cpu(&CpuBackend::new(), &a, &b)?;
    println!("CPU Time: {}", format_seconds(cpu_time));

    let accel_time = if selection.kind.is_accelerator() {
        println!("[2/2] Benchmarking {}...", selection.kind.display_name());
        let backend = open_backend(selection.kind)
            .with_context(|| format!("failed to open {} backend", selection.kind))?;
        let elapsed = bench_accelerator(&*backend, &a, &b)?;
        println!(
            "{} Time: {}",
            selection.kind.display_name(),
            format_seconds(elapsed)
        );
        Some(elapsed)
    } else {
        println!();
        println!("{SKIP_NOTICE}");
        None
    };

    let report = SmokeReport {
        cpu_time,
        accel_time,
    };
    if let Some(speedup) = report.speedup() {
        println!("{}", speedup_line(speedup));
    }

    Ok(())
}

/// Install the tracing subscriber. The report itself goes to stdout via
/// `println!`; diagnostics stay quiet unless RUST_LOG raises the filter.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
