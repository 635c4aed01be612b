//! `ds-probe` - Compute-device probing and selection for device-smoke.
//!
//! Answers two questions: what compute devices does this host offer, and
//! which one should the accelerated benchmark run on. Selection follows a
//! fixed priority (CUDA, then Metal, then CPU) and is a pure function over
//! a probed [`DeviceInventory`], so every combination is testable without
//! hardware. The CPU is always available and is the guaranteed fallback.

pub mod device;
pub mod error;
pub mod inventory;

pub use device::DeviceKind;
pub use error::{ProbeError, Result};
pub use inventory::{open_backend, select_device, DeviceInventory, Selection};
