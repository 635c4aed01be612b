//! CUDA compute backend (NVIDIA GPUs).
//!
//! Uses the cudarc driver API with a GEMM kernel compiled through NVRTC at
//! initialization. Kernel launches are asynchronous with respect to the
//! host; `synchronize` drains the stream.

use std::any::Any;
use std::sync::Arc;

use cudarc::driver::{
    CudaContext, CudaFunction, CudaModule, CudaSlice, CudaStream, LaunchConfig, PushKernelArg,
};
use cudarc::nvrtc::compile_ptx;

use crate::backend::{matmul_dims, ComputeBackend};
use crate::error::{Result, TensorError};
use crate::shape::Shape;
use crate::storage::{DeviceStorage, DeviceTensor};
use crate::tensor::Tensor;

const KERNEL_SOURCE: &str = include_str!("kernels/matmul.cu");
const BLOCK_SIZE: u32 = 16;

/// CUDA compute backend bound to a single device.
pub struct CudaBackend {
    _ctx: Arc<CudaContext>,
    stream: Arc<CudaStream>,
    _module: Arc<CudaModule>,
    sgemm: CudaFunction,
    name: String,
}

impl std::fmt::Debug for CudaBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CudaBackend")
            .field("device", &self.name)
            .finish()
    }
}

/// Device-memory buffer owned by `CudaBackend`.
pub struct CudaBuffer(CudaSlice<f32>);

impl std::fmt::Debug for CudaBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CudaBuffer").field("len", &self.0.len()).finish()
    }
}

impl DeviceStorage for CudaBuffer {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn backend_name(&self) -> &str {
        "cuda"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn device_err(what: &str, e: impl std::fmt::Debug) -> TensorError {
    TensorError::Device(format!("{what}: {e:?}"))
}

impl CudaBackend {
    /// Create a backend on CUDA device 0.
    pub fn new() -> Result<Self> {
        Self::new_with_device(0)
    }

    /// Create a backend on the given CUDA device ordinal.
    ///
    /// Compiles the GEMM kernel with NVRTC and loads it into the context.
    pub fn new_with_device(ordinal: usize) -> Result<Self> {
        let ctx = CudaContext::new(ordinal)
            .map_err(|e| device_err("failed to create CUDA context", e))?;
        let name = ctx
            .name()
            .map_err(|e| device_err("failed to query CUDA device name", e))?;
        tracing::debug!(device = %name, ordinal, "initializing CUDA backend");

        let stream = ctx.default_stream();

        let ptx = compile_ptx(KERNEL_SOURCE)
            .map_err(|e| device_err("failed to compile GEMM kernel", e))?;
        let module = ctx
            .load_module(ptx)
            .map_err(|e| device_err("failed to load CUDA module", e))?;
        let sgemm = module
            .load_function("sgemm_naive")
            .map_err(|e| device_err("failed to load sgemm function", e))?;

        Ok(Self {
            _ctx: ctx,
            stream,
            _module: module,
            sgemm,
            name,
        })
    }

    /// The driver-reported device name.
    pub fn device_name(&self) -> &str {
        &self.name
    }
}

impl ComputeBackend for CudaBackend {
    fn name(&self) -> &str {
        "cuda"
    }

    fn upload(&self, tensor: &Tensor) -> Result<DeviceTensor> {
        let buf = self
            .stream
            .memcpy_stod(tensor.data())
            .map_err(|e| device_err("failed to copy tensor to device", e))?;
        DeviceTensor::new(Box::new(CudaBuffer(buf)), tensor.shape().clone())
    }

    fn download(&self, tensor: &DeviceTensor) -> Result<Tensor> {
        let buf = tensor.storage_as::<CudaBuffer>(self.name())?;
        let host = self
            .stream
            .memcpy_dtov(&buf.0)
            .map_err(|e| device_err("failed to copy tensor to host", e))?;
        Ok(Tensor::new(host, tensor.shape().clone()))
    }

    fn matmul(&self, a: &DeviceTensor, b: &DeviceTensor) -> Result<DeviceTensor> {
        let (m, k, n) = matmul_dims(a.shape(), b.shape())?;
        let a_buf = a.storage_as::<CudaBuffer>(self.name())?;
        let b_buf = b.storage_as::<CudaBuffer>(self.name())?;

        let mut c_buf: CudaSlice<f32> = self
            .stream
            .alloc_zeros(m * n)
            .map_err(|e| device_err("failed to allocate output on device", e))?;

        let cfg = LaunchConfig {
            grid_dim: (
                (n as u32).div_ceil(BLOCK_SIZE),
                (m as u32).div_ceil(BLOCK_SIZE),
                1,
            ),
            block_dim: (BLOCK_SIZE, BLOCK_SIZE, 1),
            shared_mem_bytes: 0,
        };

        let m_arg = m as i32;
        let k_arg = k as i32;
        let n_arg = n as i32;
        let mut builder = self.stream.launch_builder(&self.sgemm);
        builder.arg(&a_buf.0);
        builder.arg(&b_buf.0);
        builder.arg(&mut c_buf);
        builder.arg(&m_arg);
        builder.arg(&k_arg);
        builder.arg(&n_arg);

        unsafe { builder.launch(cfg) }
            .map_err(|e| device_err("failed to launch GEMM kernel", e))?;

        DeviceTensor::new(Box::new(CudaBuffer(c_buf)), Shape::new(vec![m, n]))
    }

    fn synchronize(&self) -> Result<()> {
        self.stream
            .synchronize()
            .map_err(|e| device_err("failed to synchronize CUDA stream", e))
    }
}

/// Returns true if a CUDA context can be created on device 0.
pub fn is_available() -> bool {
    CudaContext::new(0).is_ok()
}

/// The driver-reported name of CUDA device 0.
pub fn device_name() -> Result<String> {
    let ctx =
        CudaContext::new(0).map_err(|e| device_err("failed to create CUDA context", e))?;
    ctx.name()
        .map_err(|e| device_err("failed to query CUDA device name", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    #[ignore = "requires CUDA hardware — run with --features cuda -- --ignored"]
    fn test_matmul_matches_cpu() {
        use crate::cpu::CpuBackend;

        let cuda = CudaBackend::new().unwrap();
        let cpu = CpuBackend::new();

        let mut rng = StdRng::seed_from_u64(42);
        let a = Tensor::randn(Shape::new(vec![33, 17]), &mut rng);
        let b = Tensor::randn(Shape::new(vec![17, 29]), &mut rng);

        let expected = a.matmul(&b, &cpu).unwrap();
        let got = a.matmul(&b, &cuda).unwrap();
        cuda.synchronize().unwrap();

        assert_eq!(got.shape(), expected.shape());
        for (x, y) in got.data().iter().zip(expected.data()) {
            assert!((x - y).abs() < 1e-3, "cuda={x} cpu={y}");
        }
    }

    #[test]
    #[ignore = "requires CUDA hardware — run with --features cuda -- --ignored"]
    fn test_upload_download_roundtrip() {
        let cuda = CudaBackend::new().unwrap();
        let t = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], Shape::new(vec![2, 2]));
        let dev = cuda.upload(&t).unwrap();
        let back = cuda.download(&dev).unwrap();
        assert_eq!(back.data(), t.data());
    }
}
