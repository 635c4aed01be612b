use ds_tensor::{ComputeBackend, CpuBackend};

use crate::device::DeviceKind;
use crate::error::{ProbeError, Result};

/// Fixed selection label for the Metal backend.
pub const METAL_LABEL: &str = "Apple Silicon GPU (Metal)";

/// Fixed selection label for the CPU fallback.
pub const CPU_LABEL: &str = "CPU";

/// What the host actually offers, as probed at runtime.
///
/// Obtained from [`DeviceInventory::probe`], or constructed directly in
/// tests to exercise every availability combination without hardware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInventory {
    /// Driver-reported device name when a CUDA device is usable.
    pub cuda: Option<String>,
    /// A Metal system default device exists.
    pub metal: bool,
}

impl DeviceInventory {
    /// Probe the compiled-in backends.
    ///
    /// Never fails: a backend whose probe errors is reported unavailable.
    /// Backends not compiled in are unavailable by construction.
    pub fn probe() -> Self {
        let cuda = probe_cuda();
        let metal = probe_metal();
        tracing::debug!(cuda = ?cuda, metal, "probed device inventory");
        DeviceInventory { cuda, metal }
    }
}

#[cfg(feature = "cuda")]
fn probe_cuda() -> Option<String> {
    ds_tensor::cuda::device_name().ok()
}

#[cfg(not(feature = "cuda"))]
fn probe_cuda() -> Option<String> {
    None
}

#[cfg(feature = "metal")]
fn probe_metal() -> bool {
    ds_tensor::metal::is_available()
}

#[cfg(not(feature = "metal"))]
fn probe_metal() -> bool {
    false
}

/// The device chosen for the accelerated benchmark, with its display label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub kind: DeviceKind,
    pub label: String,
}

/// Select exactly one device from an inventory.
///
/// Fixed priority, first match wins: CUDA (labelled with the reported
/// device name), then Metal, then the CPU fallback. Total: some device is
/// always returned.
pub fn select_device(inventory: &DeviceInventory) -> Selection {
    if let Some(name) = &inventory.cuda {
        Selection {
            kind: DeviceKind::Cuda,
            label: name.clone(),
        }
    } else if inventory.metal {
        Selection {
            kind: DeviceKind::Metal,
            label: METAL_LABEL.to_string(),
        }
    } else {
        Selection {
            kind: DeviceKind::Cpu,
            label: CPU_LABEL.to_string(),
        }
    }
}

/// Construct the compute backend for a selected device kind.
///
/// # Errors
/// Returns `BackendNotCompiled` when the kind's backend feature was not
/// built into this binary, or a backend error if device init fails.
pub fn open_backend(kind: DeviceKind) -> Result<Box<dyn ComputeBackend>> {
    match kind {
        DeviceKind::Cpu => Ok(Box::new(CpuBackend::new())),
        DeviceKind::Cuda => open_cuda(),
        DeviceKind::Metal => open_metal(),
    }
}

#[cfg(feature = "cuda")]
fn open_cuda() -> Result<Box<dyn ComputeBackend>> {
    let backend = ds_tensor::CudaBackend::new()?;
    tracing::info!(device = backend.device_name(), "opened CUDA backend");
    Ok(Box::new(backend))
}

#[cfg(not(feature = "cuda"))]
fn open_cuda() -> Result<Box<dyn ComputeBackend>> {
    Err(ProbeError::BackendNotCompiled("cuda"))
}

#[cfg(feature = "metal")]
fn open_metal() -> Result<Box<dyn ComputeBackend>> {
    let backend = ds_tensor::MetalBackend::new()?;
    tracing::info!("opened Metal backend");
    Ok(Box::new(backend))
}

#[cfg(not(feature = "metal"))]
fn open_metal() -> Result<Box<dyn ComputeBackend>> {
    Err(ProbeError::BackendNotCompiled("metal"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inventory(cuda: Option<&str>, metal: bool) -> DeviceInventory {
        DeviceInventory {
            cuda: cuda.map(String::from),
            metal,
        }
    }

    #[test]
    fn test_cuda_wins_over_metal() {
        let sel = select_device(&inventory(Some("NVIDIA GeForce RTX 4090"), true));
        assert_eq!(sel.kind, DeviceKind::Cuda);
        assert_eq!(sel.label, "NVIDIA GeForce RTX 4090");
    }

    #[test]
    fn test_metal_wins_over_cpu() {
        let sel = select_device(&inventory(None, true));
        assert_eq!(sel.kind, DeviceKind::Metal);
        assert_eq!(sel.label, METAL_LABEL);
    }

    #[test]
    fn test_cpu_is_fallback() {
        let sel = select_device(&inventory(None, false));
        assert_eq!(sel.kind, DeviceKind::Cpu);
        assert_eq!(sel.label, CPU_LABEL);
    }

    #[test]
    fn test_selection_is_total() {
        // Every availability combination yields exactly one device.
        for cuda in [None, Some("dev")] {
            for metal in [false, true] {
                let sel = select_device(&inventory(cuda, metal));
                assert!(!sel.label.is_empty());
                match (cuda, metal) {
                    (Some(_), _) => assert_eq!(sel.kind, DeviceKind::Cuda),
                    (None, true) => assert_eq!(sel.kind, DeviceKind::Metal),
                    (None, false) => assert_eq!(sel.kind, DeviceKind::Cpu),
                }
            }
        }
    }

    #[test]
    fn test_probe_does_not_panic() {
        let inv = DeviceInventory::probe();
        // CPU-only builds must report both accelerators unavailable.
        if cfg!(not(any(feature = "cuda", feature = "metal"))) {
            assert_eq!(inv, inventory(None, false));
        }
    }

    #[test]
    fn test_open_cpu_backend() {
        let backend = open_backend(DeviceKind::Cpu).unwrap();
        assert_eq!(backend.name(), "cpu");
    }

    #[test]
    #[cfg(not(feature = "cuda"))]
    fn test_open_cuda_not_compiled() {
        let err = open_backend(DeviceKind::Cuda).unwrap_err();
        assert!(matches!(err, ProbeError::BackendNotCompiled("cuda")));
    }

    #[test]
    #[cfg(not(feature = "metal"))]
    fn test_open_metal_not_compiled() {
        let err = open_backend(DeviceKind::Metal).unwrap_err();
        assert!(matches!(err, ProbeError::BackendNotCompiled("metal")));
    }
}
