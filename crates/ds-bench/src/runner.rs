use std::time::{Duration, Instant};

use rand::Rng;

use ds_tensor::{ComputeBackend, CpuBackend, Result, Shape, Tensor};

/// Matrix side length used by the `device-smoke` binary.
pub const DEFAULT_MATRIX_SIZE: usize = 5000;

/// Generate the two independent random square matrices a benchmark
/// multiplies. Generation happens on the host and is never part of a timed
/// window.
pub fn generate_inputs<R: Rng + ?Sized>(size: usize, rng: &mut R) -> (Tensor, Tensor) {
    let a = Tensor::randn(Shape::square(size), rng);
    let b = Tensor::randn(Shape::square(size), rng);
    (a, b)
}

/// Time one matrix multiply on the CPU.
///
/// The operands are placed in backend buffers before the clock starts, so
/// the wall-clock delta covers the multiply call only. Host compute is
/// synchronous, so no barriers are needed.
pub fn bench_cpu(backend: &CpuBackend, a: &Tensor, b: &Tensor) -> Result<Duration> {
    let a_dev = backend.upload(a)?;
    let b_dev = backend.upload(b)?;

    let start = Instant::now();
    let _ = backend.matmul(&a_dev, &b_dev)?;
    let elapsed = start.elapsed();

    tracing::debug!(?elapsed, size = a.shape().dim(0), "cpu benchmark complete");
    Ok(elapsed)
}

/// Time one matrix multiply on an accelerator.
///
/// Transfers both operands, runs one untimed warm-up multiply to absorb
/// one-time initialization cost (kernel compilation, memory pools), then
/// brackets a single timed multiply with synchronization barriers. The
/// barriers are mandatory: dispatch returns before the device finishes, and
/// without them the clock would measure dispatch latency, not compute.
pub fn bench_accelerator(
    backend: &dyn ComputeBackend,
    a: &Tensor,
    b: &Tensor,
) -> Result<Duration> {
    let a_dev = backend.upload(a)?;
    let b_dev = backend.upload(b)?;

    let _ = backend.matmul(&a_dev, &b_dev)?;
    backend.synchronize()?;

    let start = Instant::now();
    let _ = backend.matmul(&a_dev, &b_dev)?;
    backend.synchronize()?;
    let elapsed = start.elapsed();

    tracing::debug!(
        ?elapsed,
        backend = backend.name(),
        size = a.shape().dim(0),
        "accelerator benchmark complete"
    );
    Ok(elapsed)
}
