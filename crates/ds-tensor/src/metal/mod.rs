//! Metal GPU compute backend (macOS only).
//!
//! Built on the objc2/objc2-metal bindings: a system default device, one
//! command queue, and a compute pipeline compiled from the bundled `.metal`
//! GEMM source at initialization. Each `matmul` commits its own command
//! buffer; committed work runs asynchronously until `synchronize` waits on
//! the most recent submission.

use std::any::Any;
use std::cell::RefCell;
use std::ffi::c_void;
use std::ptr::NonNull;

use objc2::rc::Retained;
use objc2::runtime::ProtocolObject;
use objc2_foundation::NSString;
use objc2_metal::{
    MTLBuffer, MTLCommandBuffer, MTLCommandEncoder, MTLCommandQueue, MTLComputeCommandEncoder,
    MTLComputePipelineState, MTLCreateSystemDefaultDevice, MTLDevice, MTLLibrary,
    MTLResourceOptions, MTLSize,
};

use crate::backend::{matmul_dims, ComputeBackend};
use crate::error::{Result, TensorError};
use crate::shape::Shape;
use crate::storage::{DeviceStorage, DeviceTensor};
use crate::tensor::Tensor;

const SHADER_SOURCE: &str = include_str!("kernels/matmul.metal");
const THREADGROUP_SIZE: usize = 16;

/// Kernel dimension arguments, laid out to match the MSL `GemmDims` struct.
#[repr(C)]
struct GemmDims {
    m: u32,
    k: u32,
    n: u32,
}

/// Metal compute backend bound to the system default device.
pub struct MetalBackend {
    device: Retained<ProtocolObject<dyn MTLDevice>>,
    queue: Retained<ProtocolObject<dyn MTLCommandQueue>>,
    pipeline: Retained<ProtocolObject<dyn MTLComputePipelineState>>,
    last_submitted: RefCell<Option<Retained<ProtocolObject<dyn MTLCommandBuffer>>>>,
}

impl std::fmt::Debug for MetalBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetalBackend")
            .field("device", &self.device.name().to_string())
            .finish()
    }
}

/// Shared-mode `MTLBuffer` owned by `MetalBackend`.
pub struct MetalBuffer {
    buffer: Retained<ProtocolObject<dyn MTLBuffer>>,
    len: usize,
}

impl std::fmt::Debug for MetalBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetalBuffer").field("len", &self.len).finish()
    }
}

impl DeviceStorage for MetalBuffer {
    fn len(&self) -> usize {
        self.len
    }

    fn backend_name(&self) -> &str {
        "metal"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn device_err(what: &str, detail: impl std::fmt::Debug) -> TensorError {
    TensorError::Device(format!("{what}: {detail:?}"))
}

impl MetalBackend {
    /// Create a backend on the system default Metal device.
    ///
    /// Compiles the GEMM shader and builds the compute pipeline.
    pub fn new() -> Result<Self> {
        let device = MTLCreateSystemDefaultDevice()
            .ok_or_else(|| TensorError::Device("no Metal device available".to_string()))?;
        tracing::debug!(device = %device.name(), "initializing Metal backend");

        let queue = device
            .newCommandQueue()
            .ok_or_else(|| TensorError::Device("failed to create command queue".to_string()))?;

        let source = NSString::from_str(SHADER_SOURCE);
        let library = device
            .newLibraryWithSource_options_error(&source, None)
            .map_err(|e| device_err("failed to compile GEMM shader", e))?;
        let function = library
            .newFunctionWithName(&NSString::from_str("matmul_f32"))
            .ok_or_else(|| {
                TensorError::Device("shader function matmul_f32 not found".to_string())
            })?;
        let pipeline = device
            .newComputePipelineStateWithFunction_error(&function)
            .map_err(|e| device_err("failed to build compute pipeline", e))?;

        Ok(Self {
            device,
            queue,
            pipeline,
            last_submitted: RefCell::new(None),
        })
    }

    fn alloc_buffer(&self, len: usize) -> Result<Retained<ProtocolObject<dyn MTLBuffer>>> {
        self.device
            .newBufferWithLength_options(len * std::mem::size_of::<f32>(), MTLResourceOptions::empty())
            .ok_or_else(|| TensorError::Device(format!("failed to allocate buffer of {len} f32s")))
    }
}

impl ComputeBackend for MetalBackend {
    fn name(&self) -> &str {
        "metal"
    }

    fn upload(&self, tensor: &Tensor) -> Result<DeviceTensor> {
        let len = tensor.data().len();
        let buffer = self.alloc_buffer(len)?;
        unsafe {
            std::ptr::copy_nonoverlapping(
                tensor.data().as_ptr(),
                buffer.contents().as_ptr().cast::<f32>(),
                len,
            );
        }
        DeviceTensor::new(Box::new(MetalBuffer { buffer, len }), tensor.shape().clone())
    }

    fn download(&self, tensor: &DeviceTensor) -> Result<Tensor> {
        // Buffer contents are read through the CPU mapping, so any command
        // buffer still writing to them must drain first.
        self.synchronize()?;

        let buf = tensor.storage_as::<MetalBuffer>(self.name())?;
        let mut host = vec![0.0f32; buf.len];
        unsafe {
            std::ptr::copy_nonoverlapping(
                buf.buffer.contents().as_ptr().cast::<f32>(),
                host.as_mut_ptr(),
                buf.len,
            );
        }
        Ok(Tensor::new(host, tensor.shape().clone()))
    }

    fn matmul(&self, a: &DeviceTensor, b: &DeviceTensor) -> Result<DeviceTensor> {
        let (m, k, n) = matmul_dims(a.shape(), b.shape())?;
        let a_buf = a.storage_as::<MetalBuffer>(self.name())?;
        let b_buf = b.storage_as::<MetalBuffer>(self.name())?;
        let c_buf = self.alloc_buffer(m * n)?;

        let command_buffer = self
            .queue
            .commandBuffer()
            .ok_or_else(|| TensorError::Device("failed to create command buffer".to_string()))?;
        let encoder = command_buffer.computeCommandEncoder().ok_or_else(|| {
            TensorError::Device("failed to create compute command encoder".to_string())
        })?;

        let dims = GemmDims {
            m: m as u32,
            k: k as u32,
            n: n as u32,
        };

        encoder.setComputePipelineState(&self.pipeline);
        unsafe {
            encoder.setBuffer_offset_atIndex(Some(&a_buf.buffer), 0, 0);
            encoder.setBuffer_offset_atIndex(Some(&b_buf.buffer), 0, 1);
            encoder.setBuffer_offset_atIndex(Some(&c_buf), 0, 2);
            encoder.setBytes_length_atIndex(
                NonNull::from(&dims).cast::<c_void>(),
                std::mem::size_of::<GemmDims>(),
                3,
            );
        }

        let groups = MTLSize {
            width: n.div_ceil(THREADGROUP_SIZE),
            height: m.div_ceil(THREADGROUP_SIZE),
            depth: 1,
        };
        let threads_per_group = MTLSize {
            width: THREADGROUP_SIZE,
            height: THREADGROUP_SIZE,
            depth: 1,
        };
        encoder.dispatchThreadgroups_threadsPerThreadgroup(groups, threads_per_group);
        encoder.endEncoding();

        command_buffer.commit();
        *self.last_submitted.borrow_mut() = Some(command_buffer);

        DeviceTensor::new(
            Box::new(MetalBuffer {
                buffer: c_buf,
                len: m * n,
            }),
            Shape::new(vec![m, n]),
        )
    }

    fn synchronize(&self) -> Result<()> {
        if let Some(command_buffer) = self.last_submitted.borrow_mut().take() {
            command_buffer.waitUntilCompleted();
        }
        Ok(())
    }
}

/// Returns true if a system default Metal device exists.
pub fn is_available() -> bool {
    MTLCreateSystemDefaultDevice().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    #[ignore = "requires a Metal device — run with --features metal -- --ignored"]
    fn test_matmul_matches_cpu() {
        use crate::cpu::CpuBackend;

        let metal = MetalBackend::new().unwrap();
        let cpu = CpuBackend::new();

        let mut rng = StdRng::seed_from_u64(42);
        let a = Tensor::randn(Shape::new(vec![33, 17]), &mut rng);
        let b = Tensor::randn(Shape::new(vec![17, 29]), &mut rng);

        let expected = a.matmul(&b, &cpu).unwrap();
        let got = a.matmul(&b, &metal).unwrap();

        assert_eq!(got.shape(), expected.shape());
        for (x, y) in got.data().iter().zip(expected.data()) {
            assert!((x - y).abs() < 1e-3, "metal={x} cpu={y}");
        }
    }

    #[test]
    #[ignore = "requires a Metal device — run with --features metal -- --ignored"]
    fn test_upload_download_roundtrip() {
        let metal = MetalBackend::new().unwrap();
        let t = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], Shape::new(vec![2, 2]));
        let dev = metal.upload(&t).unwrap();
        let back = metal.download(&dev).unwrap();
        assert_eq!(back.data(), t.data());
    }
}
