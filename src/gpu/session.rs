use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::GpuError;
use crate::config::EngineConfig;
use crate::fractal::{FractalParams, Viewport};

const WORKGROUP_SIZE: u32 = 16;

/// Bloc uniforme du kernel, dans l'ordre des arguments du kernel :
/// width, height, center_x, center_y, scale, max_iter, c_real, c_imag.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
struct KernelParams {
    width: u32,
    height: u32,
    center_x: f32,
    center_y: f32,
    scale: f32,
    max_iter: u32,
    c_real: f32,
    c_imag: f32,
    bailout_sq: f32,
    _pad: [u32; 3],
}

/// Taille du bloc uniforme, identique à la structure `Params` du kernel.
pub(super) const KERNEL_PARAMS_SIZE: usize = std::mem::size_of::<KernelParams>();

impl KernelParams {
    fn new(viewport: &Viewport, params: &FractalParams, bailout_sq: f64) -> Self {
        let c = params.mode.julia_constant();
        Self {
            width: viewport.width,
            height: viewport.height,
            center_x: viewport.center_x as f32,
            center_y: viewport.center_y as f32,
            scale: viewport.scale as f32,
            max_iter: params.max_iter,
            c_real: c.re as f32,
            c_imag: c.im as f32,
            bailout_sq: bailout_sq as f32,
            _pad: [0; 3],
        }
    }
}

/// Rang de préférence d'un type d'adaptateur ; `None` pour les
/// adaptateurs non GPU (rendu logiciel), qui ne sont jamais retenus.
pub fn device_rank(device_type: wgpu::DeviceType) -> Option<u8> {
    match device_type {
        wgpu::DeviceType::DiscreteGpu => Some(0),
        wgpu::DeviceType::IntegratedGpu => Some(1),
        wgpu::DeviceType::VirtualGpu => Some(2),
        wgpu::DeviceType::Cpu | wgpu::DeviceType::Other => None,
    }
}

/// Étape 1 : plateforme puis périphérique de classe GPU.
fn discover(instance: &wgpu::Instance) -> Result<wgpu::Adapter, GpuError> {
    let adapters = instance.enumerate_adapters(wgpu::Backends::all());
    if adapters.is_empty() {
        return Err(GpuError::NoPlatform);
    }
    adapters
        .into_iter()
        .filter_map(|adapter| device_rank(adapter.get_info().device_type).map(|rank| (rank, adapter)))
        .min_by_key(|(rank, _)| *rank)
        .map(|(_, adapter)| adapter)
        .ok_or(GpuError::NoDevice)
}

/// Taille en octets du buffer de sortie (un mot u32 par canal), refusée
/// au-delà de `limit` ou si le calcul déborde.
fn output_size(words: usize, limit: u64) -> Result<u64, GpuError> {
    let size = u64::try_from(words)
        .ok()
        .and_then(|w| w.checked_mul(std::mem::size_of::<u32>() as u64))
        .ok_or(GpuError::ResourceExhausted {
            requested: u64::MAX,
            limit,
        })?;
    if size > limit {
        return Err(GpuError::ResourceExhausted { requested: size, limit });
    }
    Ok(size)
}

/// Étape 2 : contexte (device) et queue. Champs libérés dans l'ordre
/// de déclaration : la queue avant le device.
struct GpuSession {
    queue: wgpu::Queue,
    device: wgpu::Device,
    adapter_name: String,
}

impl GpuSession {
    async fn open(adapter: &wgpu::Adapter) -> Result<Self, GpuError> {
        let adapter_name = adapter.get_info().name;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("fractal-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                },
                None,
            )
            .await
            .map_err(|e| GpuError::DeviceRequest(e.to_string()))?;
        tracing::debug!(adapter = %adapter_name, "contexte GPU créé");
        Ok(Self {
            queue,
            device,
            adapter_name,
        })
    }

    /// Étape 3 : compile le module et le point d'entrée choisi. Les erreurs
    /// de validation sont capturées dans un scope et renvoyées comme journal
    /// de compilation.
    async fn compile(&self, source: String, entry_point: &'static str) -> Result<Kernel, GpuError> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("fractal-kernel"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let bind_group_layout = self.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("fractal-bind-group-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(KERNEL_PARAMS_SIZE as u64),
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("fractal-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = self.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(entry_point),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point,
        });

        if let Some(err) = self.device.pop_error_scope().await {
            return Err(GpuError::Compile {
                entry_point,
                log: err.to_string(),
            });
        }
        tracing::debug!(entry_point, "kernel compilé");

        Ok(Kernel {
            pipeline,
            bind_group_layout,
            _module: module,
        })
    }

    /// Étape 4 : buffers et arguments.
    fn bind(&self, kernel: &Kernel, kernel_params: &KernelParams, words: usize) -> Result<Bindings, GpuError> {
        let limits = self.device.limits();
        let limit = (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size);
        let size = output_size(words, limit)?;

        let output = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("fractal-output"),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("fractal-readback"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniforms = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("fractal-params"),
            contents: bytemuck::bytes_of(kernel_params),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("fractal-bind-group"),
            layout: &kernel.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: output.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: uniforms.as_entire_binding(),
                },
            ],
        });

        Ok(Bindings {
            bind_group,
            output,
            readback,
            uniforms,
            size,
        })
    }

    /// Étape 5 : grille 2D couvrant `width × height` invocations, suivie
    /// de la copie vers le buffer de relecture.
    fn dispatch(&self, kernel: &Kernel, bindings: &Bindings, width: u32, height: u32) {
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("fractal-encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("fractal-pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&kernel.pipeline);
            pass.set_bind_group(0, &bindings.bind_group, &[]);
            let dispatch_x = (width + WORKGROUP_SIZE - 1) / WORKGROUP_SIZE;
            let dispatch_y = (height + WORKGROUP_SIZE - 1) / WORKGROUP_SIZE;
            pass.dispatch_workgroups(dispatch_x, dispatch_y, 1);
        }
        encoder.copy_buffer_to_buffer(&bindings.output, 0, &bindings.readback, 0, bindings.size);
        self.queue.submit(Some(encoder.finish()));
    }

    /// Étape 6 : relecture bloquante, un mot u32 par canal.
    fn readback(&self, bindings: &Bindings, image: &mut [u8]) -> Result<(), GpuError> {
        let slice = bindings.readback.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = sender.send(r);
        });
        self.device.poll(wgpu::Maintain::Wait);

        receiver
            .recv()
            .map_err(|_| GpuError::Readback("callback de mapping jamais appelé".to_string()))?
            .map_err(|e| GpuError::Readback(e.to_string()))?;

        {
            let data = slice.get_mapped_range();
            let words: &[u32] = bytemuck::cast_slice(&data);
            for (dst, word) in image.iter_mut().zip(words) {
                *dst = *word as u8;
            }
        }
        bindings.readback.unmap();
        Ok(())
    }
}

impl Drop for GpuSession {
    fn drop(&mut self) {
        tracing::debug!(adapter = %self.adapter_name, "contexte GPU libéré");
    }
}

/// Programme compilé. Libéré dans l'ordre : pipeline (kernel), layout,
/// module (programme).
struct Kernel {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    _module: wgpu::ShaderModule,
}

/// Buffers d'une invocation, détruits explicitement à la libération.
struct Bindings {
    bind_group: wgpu::BindGroup,
    output: wgpu::Buffer,
    readback: wgpu::Buffer,
    uniforms: wgpu::Buffer,
    size: u64,
}

impl Drop for Bindings {
    fn drop(&mut self) {
        self.output.destroy();
        self.readback.destroy();
        self.uniforms.destroy();
    }
}

/// Enchaîne les étapes d'une session. Les ressources sont des variables
/// locales : quelle que soit l'étape qui échoue, celles déjà acquises sont
/// libérées dans l'ordre inverse (buffers, kernel, queue, device).
pub(super) async fn run(
    config: &EngineConfig,
    viewport: &Viewport,
    params: &FractalParams,
    image: &mut [u8],
) -> Result<(), GpuError> {
    let instance = wgpu::Instance::default();
    let adapter = discover(&instance)?;
    let session = GpuSession::open(&adapter).await?;

    let source = std::fs::read_to_string(&config.kernel_path).map_err(|source| GpuError::KernelSource {
        path: config.kernel_path.clone(),
        source,
    })?;
    let entry_point = params.mode.kernel_entry_point();
    let kernel = session.compile(source, entry_point).await?;

    let kernel_params = KernelParams::new(viewport, params, config.bailout_sq());
    let bindings = session.bind(&kernel, &kernel_params, viewport.buffer_len())?;

    tracing::debug!(
        entry_point,
        grid_x = viewport.width,
        grid_y = viewport.height,
        "dispatch du kernel"
    );
    session.dispatch(&kernel, &bindings, viewport.width, viewport.height);
    session.readback(&bindings, image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fractal::FractalMode;

    #[test]
    fn kernel_params_layout_is_uniform_friendly() {
        // Taille multiple de 16 exigée pour un bloc uniforme.
        assert_eq!(KERNEL_PARAMS_SIZE, 48);
    }

    #[test]
    fn kernel_params_follow_argument_order() {
        let viewport = Viewport::new(640, 480, -0.5, 0.25, 3.5).unwrap();
        let params = FractalParams::new(256, FractalMode::julia(0.285, 0.01)).unwrap();
        let kp = KernelParams::new(&viewport, &params, 4.0);
        let words: &[u32] = bytemuck::cast_slice(bytemuck::bytes_of(&kp));
        assert_eq!(words[0], 640);
        assert_eq!(words[1], 480);
        assert_eq!(f32::from_bits(words[2]), -0.5);
        assert_eq!(f32::from_bits(words[3]), 0.25);
        assert_eq!(f32::from_bits(words[4]), 3.5);
        assert_eq!(words[5], 256);
        assert_eq!(f32::from_bits(words[6]), 0.285f64 as f32);
        assert_eq!(f32::from_bits(words[7]), 0.01f64 as f32);
        assert_eq!(f32::from_bits(words[8]), 4.0);
    }

    #[test]
    fn mandelbrot_kernel_params_zero_constant() {
        let viewport = Viewport::new(8, 8, 0.0, 0.0, 1.0).unwrap();
        let params = FractalParams::mandelbrot(10).unwrap();
        let kp = KernelParams::new(&viewport, &params, 4.0);
        assert_eq!(kp.c_real, 0.0);
        assert_eq!(kp.c_imag, 0.0);
    }

    #[test]
    fn output_size_respects_device_limit() {
        assert_eq!(output_size(300, 1200).unwrap(), 1200);
        assert!(matches!(
            output_size(301, 1200),
            Err(GpuError::ResourceExhausted { requested: 1204, limit: 1200 })
        ));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn output_size_overflow_is_resource_exhaustion() {
        let err = output_size(usize::MAX, u64::MAX).unwrap_err();
        assert_eq!(err.code(), -6);
    }

    #[test]
    fn software_adapters_are_never_selected() {
        assert_eq!(device_rank(wgpu::DeviceType::Cpu), None);
        assert_eq!(device_rank(wgpu::DeviceType::Other), None);
        assert!(device_rank(wgpu::DeviceType::DiscreteGpu) < device_rank(wgpu::DeviceType::IntegratedGpu));
        assert!(device_rank(wgpu::DeviceType::IntegratedGpu) < device_rank(wgpu::DeviceType::VirtualGpu));
    }
}
