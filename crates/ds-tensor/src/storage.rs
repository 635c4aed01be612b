use std::any::Any;
use std::fmt::Debug;

use crate::error::{Result, TensorError};
use crate::shape::Shape;

/// Opaque device-resident buffer of f32 elements.
///
/// Each backend defines its own storage type and recovers it from a
/// `DeviceTensor` by downcast. Handing a buffer to a backend that did not
/// create it is a typed error, never undefined behavior.
pub trait DeviceStorage: Debug {
    /// Number of f32 elements held by the buffer.
    fn len(&self) -> usize;

    /// Returns true if the buffer holds no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name of the backend that owns this buffer, used in mismatch errors.
    fn backend_name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}

/// A tensor whose data lives on a compute device.
#[derive(Debug)]
pub struct DeviceTensor {
    storage: Box<dyn DeviceStorage>,
    shape: Shape,
}

impl DeviceTensor {
    /// Wrap backend storage with its logical shape.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if the buffer length does not equal
    /// `shape.numel()`.
    pub fn new(storage: Box<dyn DeviceStorage>, shape: Shape) -> Result<Self> {
        if storage.len() != shape.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: shape.dims().to_vec(),
                got: vec![storage.len()],
            });
        }
        Ok(DeviceTensor { storage, shape })
    }

    /// Returns a reference to the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the underlying storage.
    pub fn storage(&self) -> &dyn DeviceStorage {
        &*self.storage
    }

    /// Downcast the storage to a concrete backend buffer type.
    ///
    /// # Errors
    /// Returns `BackendMismatch` when the buffer was created by a different
    /// backend than `expected`.
    pub fn storage_as<T: DeviceStorage + 'static>(&self, expected: &str) -> Result<&T> {
        self.storage
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| TensorError::BackendMismatch {
                expected: expected.to_string(),
                got: self.storage.backend_name().to_string(),
            })
    }
}
