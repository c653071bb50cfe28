// SPDX-License-Identifier: MIT
//! # GPU Bilinear Resampling
//!
//! The scalar kernel from [`crate::bilinear`] as a wgpu compute shader. One
//! invocation produces one packed destination word (four bytes), and the call
//! blocks until the result has been copied back into the caller's buffer.
//!
//! ## Fallback
//!
//! Device setup happens once, in [`GpuBilinearResampler::new`]. If no adapter is
//! found or the device cannot be created, the resampler runs the CPU kernel for
//! its whole lifetime and records why in [`GpuStatus`]. A failure during a call
//! (buffer limits, mapping, synchronization) switches the instance to the CPU
//! kernel the same way. The device path is never worse than the CPU path:
//! callers only ever see CPU-kernel errors.

use tracing::{info, warn};

use crate::bilinear;
use crate::geometry::{ratios, Direction, Ratios, Size};
use crate::{check_buffers, ResampleError, Resampler};

/// What the GPU resampler is currently running on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GpuStatus {
    /// Dispatching to the named adapter.
    Accelerated { adapter: String },
    /// Running the CPU kernel. `reason` says why the device is not used.
    CpuFallback { reason: String },
}

impl std::fmt::Display for GpuStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuStatus::Accelerated { adapter } => write!(f, "GPU ({adapter})"),
            GpuStatus::CpuFallback { reason } => write!(f, "CPU fallback ({reason})"),
        }
    }
}

/// Probe for a usable compute adapter without keeping the device.
///
/// Returns the adapter name on success.
pub fn probe_adapter() -> Result<String, ResampleError> {
    GpuContext::new().map(|ctx| ctx.adapter_name().to_string())
}

/// [`Resampler`] that dispatches to the GPU when one is available.
pub struct GpuBilinearResampler {
    context: Option<GpuContext>,
    status: GpuStatus,
}

impl GpuBilinearResampler {
    /// Set up the device, or fall back to the CPU kernel and report it once.
    pub fn new() -> Self {
        match GpuContext::new() {
            Ok(context) => {
                let adapter = context.adapter_name().to_string();
                info!(%adapter, "GPU resampler initialized");
                Self {
                    context: Some(context),
                    status: GpuStatus::Accelerated { adapter },
                }
            }
            Err(e) => {
                warn!(error = %e, "GPU resampler unavailable, using CPU bilinear kernel");
                Self::cpu_only(e.to_string())
            }
        }
    }

    /// A resampler that never touches the device.
    pub fn cpu_only(reason: impl Into<String>) -> Self {
        Self {
            context: None,
            status: GpuStatus::CpuFallback {
                reason: reason.into(),
            },
        }
    }

    pub fn status(&self) -> &GpuStatus {
        &self.status
    }

    pub fn is_accelerated(&self) -> bool {
        matches!(self.status, GpuStatus::Accelerated { .. })
    }

    fn run(
        &mut self,
        src: &[u8],
        src_size: Size,
        dst: &mut [u8],
        dst_size: Size,
        direction: Direction,
    ) -> Result<(), ResampleError> {
        check_buffers(src, src_size, dst, dst_size)?;
        let ratios = ratios(src_size, dst_size, direction);

        if let Some(context) = &self.context {
            match context.resample(src, src_size, dst, dst_size, ratios) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(error = %e, "GPU dispatch failed, switching to CPU bilinear kernel");
                    self.context = None;
                    self.status = GpuStatus::CpuFallback {
                        reason: e.to_string(),
                    };
                }
            }
        }

        bilinear::resample(src, src_size, dst, dst_size, ratios);
        Ok(())
    }
}

impl Default for GpuBilinearResampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Resampler for GpuBilinearResampler {
    fn name(&self) -> &'static str {
        "gpu_bilinear"
    }

    fn backend(&self) -> String {
        self.status.to_string()
    }

    fn downsample(
        &mut self,
        src: &[u8],
        src_size: Size,
        dst: &mut [u8],
        dst_size: Size,
    ) -> Result<(), ResampleError> {
        self.run(src, src_size, dst, dst_size, Direction::Down)
    }

    fn upsample(
        &mut self,
        src: &[u8],
        src_size: Size,
        dst: &mut [u8],
        dst_size: Size,
    ) -> Result<(), ResampleError> {
        self.run(src, src_size, dst, dst_size, Direction::Up)
    }
}

#[cfg(feature = "gpu")]
use device::GpuContext;

#[cfg(not(feature = "gpu"))]
struct GpuContext;

#[cfg(not(feature = "gpu"))]
impl GpuContext {
    fn new() -> Result<Self, ResampleError> {
        Err(ResampleError::Device(
            "built without the `gpu` feature".to_string(),
        ))
    }

    fn adapter_name(&self) -> &str {
        ""
    }

    fn resample(
        &self,
        _src: &[u8],
        _src_size: Size,
        _dst: &mut [u8],
        _dst_size: Size,
        _ratios: Ratios,
    ) -> Result<(), ResampleError> {
        Err(ResampleError::Device(
            "built without the `gpu` feature".to_string(),
        ))
    }
}

#[cfg(feature = "gpu")]
mod device {
    use std::time::Duration;

    use wgpu::util::DeviceExt;

    use super::{Ratios, ResampleError, Size};

    const WORKGROUP_SIZE: u32 = 64;
    const MAX_GROUPS_PER_DIM: u32 = 65_535;

    #[repr(C)]
    #[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
    struct Params {
        src_w: u32,
        src_h: u32,
        dst_w: u32,
        dst_h: u32,
        ratio_x: f32,
        ratio_y: f32,
        dst_len: u32,
        _pad: u32,
    }

    fn device_err(e: impl std::fmt::Display) -> ResampleError {
        ResampleError::Device(e.to_string())
    }

    /// Bytes padded with zeros to a whole number of u32 words.
    fn padded_words(bytes: &[u8]) -> Vec<u8> {
        let mut out = bytes.to_vec();
        out.resize(bytes.len().div_ceil(4) * 4, 0);
        out
    }

    pub(super) struct GpuContext {
        device: wgpu::Device,
        queue: wgpu::Queue,
        pipeline: wgpu::ComputePipeline,
        bind_group_layout: wgpu::BindGroupLayout,
        max_binding_size: u64,
        adapter_name: String,
    }

    impl GpuContext {
        pub(super) fn new() -> Result<Self, ResampleError> {
            pollster::block_on(Self::new_async())
        }

        async fn new_async() -> Result<Self, ResampleError> {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                backends: wgpu::Backends::all(),
                ..Default::default()
            });

            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::HighPerformance,
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await
                .map_err(device_err)?;
            let adapter_name = adapter.get_info().name;

            let (device, queue) = adapter
                .request_device(&wgpu::DeviceDescriptor {
                    label: Some("vc_resample_device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults(),
                    memory_hints: Default::default(),
                    trace: wgpu::Trace::default(),
                    ..Default::default()
                })
                .await
                .map_err(device_err)?;

            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("bilinear_resample"),
                source: wgpu::ShaderSource::Wgsl(include_str!("shaders/bilinear.wgsl").into()),
            });

            let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("bilinear_resample"),
                layout: None,
                module: &shader,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            });
            let bind_group_layout = pipeline.get_bind_group_layout(0);
            let max_binding_size = u64::from(device.limits().max_storage_buffer_binding_size);

            Ok(Self {
                device,
                queue,
                pipeline,
                bind_group_layout,
                max_binding_size,
                adapter_name,
            })
        }

        pub(super) fn adapter_name(&self) -> &str {
            &self.adapter_name
        }

        pub(super) fn resample(
            &self,
            src: &[u8],
            src_size: Size,
            dst: &mut [u8],
            dst_size: Size,
            ratios: Ratios,
        ) -> Result<(), ResampleError> {
            let src_words = padded_words(src);
            let dst_bytes = (dst.len().div_ceil(4) * 4) as u64;
            let largest = (src_words.len() as u64).max(dst_bytes);
            if largest > self.max_binding_size {
                return Err(ResampleError::Device(format!(
                    "{largest} byte buffer exceeds the device binding limit of {}",
                    self.max_binding_size
                )));
            }

            let params = Params {
                src_w: src_size.w,
                src_h: src_size.h,
                dst_w: dst_size.w,
                dst_h: dst_size.h,
                ratio_x: ratios.x,
                ratio_y: ratios.y,
                dst_len: dst.len() as u32,
                _pad: 0,
            };

            let params_buf = self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("resample_params"),
                    contents: bytemuck::bytes_of(&params),
                    usage: wgpu::BufferUsages::UNIFORM,
                });
            let src_buf = self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("resample_src"),
                    contents: &src_words,
                    usage: wgpu::BufferUsages::STORAGE,
                });
            let dst_buf = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("resample_dst"),
                size: dst_bytes,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            });
            let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("resample_readback"),
                size: dst_bytes,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            });

            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("resample_bind_group"),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: params_buf.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: src_buf.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: dst_buf.as_entire_binding(),
                    },
                ],
            });

            let words = (dst_bytes / 4) as u32;
            let groups = words.div_ceil(WORKGROUP_SIZE);
            let groups_x = groups.clamp(1, MAX_GROUPS_PER_DIM);
            let groups_y = groups.div_ceil(groups_x);
            if groups_y > MAX_GROUPS_PER_DIM {
                return Err(ResampleError::Device(format!(
                    "{words} words exceed the dispatch grid"
                )));
            }

            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("resample_encoder"),
                });
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("resample_pass"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.pipeline);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.dispatch_workgroups(groups_x, groups_y, 1);
            }
            encoder.copy_buffer_to_buffer(&dst_buf, 0, &readback, 0, dst_bytes);
            self.queue.submit(Some(encoder.finish()));

            let slice = readback.slice(..);
            let (sender, receiver) = flume::bounded(1);
            slice.map_async(wgpu::MapMode::Read, move |res| {
                let _ = sender.send(res);
            });

            self.device
                .poll(wgpu::PollType::Wait {
                    submission_index: None,
                    timeout: Some(Duration::from_secs(5)),
                })
                .map_err(device_err)?;

            receiver
                .recv()
                .map_err(device_err)?
                .map_err(device_err)?;

            {
                let data = slice.get_mapped_range();
                dst.copy_from_slice(&data[..dst.len()]);
            }
            readback.unmap();
            Ok(())
        }
    }
}
