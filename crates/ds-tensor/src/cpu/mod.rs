use std::any::Any;

use crate::backend::{matmul_dims, ComputeBackend};
use crate::error::Result;
use crate::shape::Shape;
use crate::storage::{DeviceStorage, DeviceTensor};
use crate::tensor::Tensor;

/// Pure-Rust CPU compute backend.
///
/// Host compute is synchronous, so `synchronize` is a no-op and timings
/// taken around `matmul` are already accurate. Always available; the
/// guaranteed fallback device.
#[derive(Debug, Clone)]
pub struct CpuBackend;

/// Host-side buffer owned by `CpuBackend`.
#[derive(Debug, Clone)]
pub struct CpuBuffer(Vec<f32>);

impl CpuBuffer {
    /// Returns the buffer contents as a slice.
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

impl DeviceStorage for CpuBuffer {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn backend_name(&self) -> &str {
        "cpu"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl CpuBackend {
    pub fn new() -> Self {
        CpuBackend
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &str {
        "cpu"
    }

    fn upload(&self, tensor: &Tensor) -> Result<DeviceTensor> {
        DeviceTensor::new(
            Box::new(CpuBuffer(tensor.data().to_vec())),
            tensor.shape().clone(),
        )
    }

    fn download(&self, tensor: &DeviceTensor) -> Result<Tensor> {
        let buf = tensor.storage_as::<CpuBuffer>(self.name())?;
        Ok(Tensor::new(buf.0.clone(), tensor.shape().clone()))
    }

    fn matmul(&self, a: &DeviceTensor, b: &DeviceTensor) -> Result<DeviceTensor> {
        let (m, k, n) = matmul_dims(a.shape(), b.shape())?;
        let a_data = a.storage_as::<CpuBuffer>(self.name())?.as_slice();
        let b_data = b.storage_as::<CpuBuffer>(self.name())?.as_slice();

        // k-middle loop order: streams rows of B and C instead of striding
        // down columns of B.
        let mut c = vec![0.0f32; m * n];
        for i in 0..m {
            let c_row = &mut c[i * n..(i + 1) * n];
            for p in 0..k {
                let a_ip = a_data[i * k + p];
                let b_row = &b_data[p * n..(p + 1) * n];
                for j in 0..n {
                    c_row[j] += a_ip * b_row[j];
                }
            }
        }

        DeviceTensor::new(Box::new(CpuBuffer(c)), Shape::new(vec![m, n]))
    }

    fn synchronize(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> CpuBackend {
        CpuBackend::new()
    }

    fn device_tensor(b: &CpuBackend, data: Vec<f32>, dims: Vec<usize>) -> DeviceTensor {
        b.upload(&Tensor::new(data, Shape::new(dims))).unwrap()
    }

    #[test]
    fn test_upload_download_roundtrip() {
        let b = backend();
        let t = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], Shape::new(vec![2, 2]));
        let dev = b.upload(&t).unwrap();
        let back = b.download(&dev).unwrap();
        assert_eq!(back.data(), t.data());
        assert_eq!(back.shape(), t.shape());
    }

    #[test]
    fn test_matmul_identity() {
        let b = backend();
        let a = device_tensor(&b, vec![1.0, 0.0, 0.0, 1.0], vec![2, 2]);
        let x = device_tensor(&b, vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
        let c = b.matmul(&a, &x).unwrap();
        assert_eq!(b.download(&c).unwrap().data(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_matmul_known_product() {
        let b = backend();
        // [1,2;3,4] @ [5,6;7,8] = [19,22;43,50]
        let a = device_tensor(&b, vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
        let x = device_tensor(&b, vec![5.0, 6.0, 7.0, 8.0], vec![2, 2]);
        let c = b.matmul(&a, &x).unwrap();
        assert_eq!(c.shape().dims(), &[2, 2]);
        assert_eq!(b.download(&c).unwrap().data(), &[19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_matmul_rectangular() {
        let b = backend();
        // [1,2,3;4,5,6] @ [7,8;9,10;11,12] = [58,64;139,154]
        let a = device_tensor(&b, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
        let x = device_tensor(
            &b,
            vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0],
            vec![3, 2],
        );
        let c = b.matmul(&a, &x).unwrap();
        assert_eq!(b.download(&c).unwrap().data(), &[58.0, 64.0, 139.0, 154.0]);
    }

    #[test]
    fn test_matmul_1x1() {
        let b = backend();
        let a = device_tensor(&b, vec![3.0], vec![1, 1]);
        let x = device_tensor(&b, vec![5.0], vec![1, 1]);
        let c = b.matmul(&a, &x).unwrap();
        assert_eq!(b.download(&c).unwrap().data(), &[15.0]);
    }

    #[test]
    fn test_matmul_dimension_mismatch() {
        let b = backend();
        let a = device_tensor(&b, vec![1.0, 2.0, 3.0], vec![1, 3]);
        let x = device_tensor(&b, vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
        assert!(b.matmul(&a, &x).is_err());
    }

    #[test]
    fn test_synchronize_is_noop() {
        assert!(backend().synchronize().is_ok());
    }

    #[test]
    fn test_rejects_foreign_storage() {
        use std::any::Any;

        #[derive(Debug)]
        struct ForeignBuffer;
        impl DeviceStorage for ForeignBuffer {
            fn len(&self) -> usize {
                4
            }
            fn backend_name(&self) -> &str {
                "elsewhere"
            }
            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        let b = backend();
        let foreign =
            DeviceTensor::new(Box::new(ForeignBuffer), Shape::new(vec![2, 2])).unwrap();
        let local = device_tensor(&b, vec![1.0, 0.0, 0.0, 1.0], vec![2, 2]);
        assert!(b.matmul(&foreign, &local).is_err());
        assert!(b.download(&foreign).is_err());
    }
}
