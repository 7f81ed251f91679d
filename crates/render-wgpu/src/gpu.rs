use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3, Vec4};
use roomview_assets::{MeshData, MeshVertex};
use roomview_common::{MeshHandle, PolygonMode};
use roomview_render::{
    Clear, Geometry, Program, RenderBackend, RenderError, RenderTarget, ShadowMapSpec,
    TextureSource, UniformValue, Viewport, uniform,
};
use wgpu::util::DeviceExt;

use crate::shaders;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct DepthUniforms {
    light_space: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct LitUniforms {
    model: [[f32; 4]; 4],
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    light_space: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 3],
    light_dir: [f32; 4],
    light_color: [f32; 4],
    spot_light_dir: [f32; 4],
    point_light_pos_eye: [f32; 4],
    spot_light_pos_eye: [f32; 4],
    night: [f32; 4],
    albedo: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct SkyboxUniforms {
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
}

/// WGSL pads `mat3x3` columns to 16 bytes.
fn padded_mat3(m: Mat3) -> [[f32; 4]; 3] {
    [
        m.x_axis.extend(0.0).to_array(),
        m.y_axis.extend(0.0).to_array(),
        m.z_axis.extend(0.0).to_array(),
    ]
}

fn vec4(v: Vec3) -> [f32; 4] {
    v.extend(0.0).to_array()
}

/// Uniforms set since the last `use_program`, looked up by name at draw time.
#[derive(Default)]
struct UniformSet {
    values: HashMap<&'static str, UniformValue>,
}

impl UniformSet {
    fn mat4(&self, name: &'static str) -> Result<Mat4, String> {
        match self.values.get(name) {
            Some(UniformValue::Mat4(m)) => Ok(*m),
            Some(other) => Err(format!("uniform {name} has wrong type {other:?}")),
            None => Err(format!("uniform {name} not set")),
        }
    }

    fn mat3(&self, name: &'static str) -> Result<Mat3, String> {
        match self.values.get(name) {
            Some(UniformValue::Mat3(m)) => Ok(*m),
            Some(other) => Err(format!("uniform {name} has wrong type {other:?}")),
            None => Err(format!("uniform {name} not set")),
        }
    }

    fn vec4(&self, name: &'static str) -> Result<[f32; 4], String> {
        match self.values.get(name) {
            Some(UniformValue::Vec3(v)) => Ok(vec4(*v)),
            Some(UniformValue::Vec4(v)) => Ok(v.to_array()),
            Some(other) => Err(format!("uniform {name} has wrong type {other:?}")),
            None => Err(format!("uniform {name} not set")),
        }
    }

    fn depth(&self) -> Result<DepthUniforms, String> {
        Ok(DepthUniforms {
            light_space: self.mat4(uniform::LIGHT_SPACE)?.to_cols_array_2d(),
            model: self.mat4(uniform::MODEL)?.to_cols_array_2d(),
        })
    }

    fn lit(&self) -> Result<LitUniforms, String> {
        Ok(LitUniforms {
            model: self.mat4(uniform::MODEL)?.to_cols_array_2d(),
            view: self.mat4(uniform::VIEW)?.to_cols_array_2d(),
            projection: self.mat4(uniform::PROJECTION)?.to_cols_array_2d(),
            light_space: self.mat4(uniform::LIGHT_SPACE)?.to_cols_array_2d(),
            normal_matrix: padded_mat3(self.mat3(uniform::NORMAL_MATRIX)?),
            light_dir: self.vec4(uniform::LIGHT_DIR)?,
            light_color: self.vec4(uniform::LIGHT_COLOR)?,
            spot_light_dir: self.vec4(uniform::SPOT_LIGHT_DIR)?,
            point_light_pos_eye: self.vec4(uniform::POINT_LIGHT_POS_EYE)?,
            spot_light_pos_eye: self.vec4(uniform::SPOT_LIGHT_POS_EYE)?,
            night: self.vec4(uniform::NIGHT)?,
            albedo: self.vec4(uniform::ALBEDO)?,
        })
    }

    fn skybox(&self) -> Result<SkyboxUniforms, String> {
        Ok(SkyboxUniforms {
            view: self.mat4(uniform::VIEW)?.to_cols_array_2d(),
            projection: self.mat4(uniform::PROJECTION)?.to_cols_array_2d(),
        })
    }
}

/// One uniform buffer and bind group per draw, reused across frames.
struct UniformPool {
    label: &'static str,
    layout: wgpu::BindGroupLayout,
    size: u64,
    slots: Vec<(wgpu::Buffer, wgpu::BindGroup)>,
    used: usize,
}

impl UniformPool {
    fn new(device: &wgpu::Device, label: &'static str, size: usize) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        Self {
            label,
            layout,
            size: size as u64,
            slots: Vec::new(),
            used: 0,
        }
    }

    /// Write `bytes` into the next free slot and return its index.
    fn push(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, bytes: &[u8]) -> usize {
        if self.used == self.slots.len() {
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(self.label),
                size: self.size,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(self.label),
                layout: &self.layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            });
            self.slots.push((buffer, bind_group));
        }
        let index = self.used;
        queue.write_buffer(&self.slots[index].0, 0, bytes);
        self.used += 1;
        index
    }

    fn bind_group(&self, index: usize) -> &wgpu::BindGroup {
        &self.slots[index].1
    }

    fn reset(&mut self) {
        self.used = 0;
    }
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    fn upload(device: &wgpu::Device, label: &str, mesh: &MeshData) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }
    }
}

struct ShadowTarget {
    view: wgpu::TextureView,
    /// Group 1 of the lit pipeline: shadow map and comparison sampler.
    lit_bind_group: wgpu::BindGroup,
    /// Group 0 of the depth-view pipeline.
    depth_view_bind_group: wgpu::BindGroup,
}

#[derive(Clone, Copy)]
enum PipelineKey {
    Depth,
    Lit(PolygonMode),
    DepthView,
    Skybox,
}

#[derive(Clone, Copy)]
enum DrawMesh {
    Mesh(MeshHandle),
    Skybox,
    FullScreen,
}

struct RecordedDraw {
    viewport: Option<Viewport>,
    pipeline: PipelineKey,
    uniforms: Option<usize>,
    mesh: DrawMesh,
}

struct RecordedPass {
    target: RenderTarget,
    clear_color: Option<Vec4>,
    clear_depth: bool,
    draws: Vec<RecordedDraw>,
}

impl RecordedPass {
    fn new(target: RenderTarget) -> Self {
        Self {
            target,
            clear_color: None,
            clear_depth: false,
            draws: Vec::new(),
        }
    }
}

/// wgpu implementation of [`RenderBackend`].
///
/// Calls made during a frame are validated and recorded as passes; `end_frame`
/// encodes them in order into one command encoder and submits it. The frame's
/// colour target must be provided with [`GpuBackend::set_frame_target`]
/// before the frame ends.
pub struct GpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,

    depth_pipeline: wgpu::RenderPipeline,
    lit_fill: wgpu::RenderPipeline,
    lit_line: Option<wgpu::RenderPipeline>,
    lit_point: Option<wgpu::RenderPipeline>,
    depth_view_pipeline: wgpu::RenderPipeline,
    skybox_pipeline: wgpu::RenderPipeline,

    depth_pool: UniformPool,
    lit_pool: UniformPool,
    skybox_pool: UniformPool,
    shadow_layout: wgpu::BindGroupLayout,
    depth_view_layout: wgpu::BindGroupLayout,
    shadow_sampler: wgpu::Sampler,

    shadow: Option<ShadowTarget>,
    screen_depth: wgpu::TextureView,
    meshes: BTreeMap<MeshHandle, GpuMesh>,
    skybox_mesh: GpuMesh,
    frame_target: Option<wgpu::TextureView>,

    frame: Option<u64>,
    passes: Vec<RecordedPass>,
    viewport: Option<Viewport>,
    program: Option<Program>,
    uniforms: UniformSet,
    textures: BTreeSet<&'static str>,
    polygon_mode: PolygonMode,
    errors: Arc<Mutex<Vec<String>>>,
}

impl GpuBackend {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        device.on_uncaptured_error(Box::new(move |err| {
            if let Ok(mut errors) = sink.lock() {
                errors.push(err.to_string());
            }
        }));

        let features = device.features();
        let depth_pool = UniformPool::new(&device, "depth_uniforms", size_of::<DepthUniforms>());
        let lit_pool = UniformPool::new(&device, "lit_uniforms", size_of::<LitUniforms>());
        let skybox_pool = UniformPool::new(&device, "skybox_uniforms", size_of::<SkyboxUniforms>());

        let shadow_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("shadow_map_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });
        let depth_view_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("depth_view_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Depth,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            }],
        });

        let clamp_to_border = features.contains(wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER);
        let (address_mode, border_color) = if clamp_to_border {
            (
                wgpu::AddressMode::ClampToBorder,
                Some(wgpu::SamplerBorderColor::OpaqueWhite),
            )
        } else {
            tracing::info!("clamp-to-border unsupported, shadow lookups clamp to edge");
            (wgpu::AddressMode::ClampToEdge, None)
        };
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow_sampler"),
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            border_color,
            ..Default::default()
        });

        let mesh_layout = wgpu::VertexBufferLayout {
            array_stride: size_of::<MeshVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
        };
        let color_target = [Some(wgpu::ColorTargetState {
            format: surface_format,
            blend: Some(wgpu::BlendState::REPLACE),
            write_mask: wgpu::ColorWrites::ALL,
        })];

        // Depth pass
        let depth_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("depth_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::DEPTH_SHADER.into()),
        });
        let depth_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("depth_pipeline_layout"),
            bind_group_layouts: &[&depth_pool.layout],
            push_constant_ranges: &[],
        });
        let depth_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("depth_pipeline"),
            layout: Some(&depth_layout),
            vertex: wgpu::VertexState {
                module: &depth_shader,
                entry_point: Some("vs_depth"),
                compilation_options: Default::default(),
                buffers: &[mesh_layout.clone()],
            },
            fragment: None,
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                },
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        // Lit pass, one pipeline per available polygon mode
        let lit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lit_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::LIT_SHADER.into()),
        });
        let lit_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lit_pipeline_layout"),
            bind_group_layouts: &[&lit_pool.layout, &shadow_layout],
            push_constant_ranges: &[],
        });
        let lit_pipeline = |mode: wgpu::PolygonMode, label: &str| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&lit_layout),
                vertex: wgpu::VertexState {
                    module: &lit_shader,
                    entry_point: Some("vs_lit"),
                    compilation_options: Default::default(),
                    buffers: &[mesh_layout.clone()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &lit_shader,
                    entry_point: Some("fs_lit"),
                    compilation_options: Default::default(),
                    targets: &color_target,
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    polygon_mode: mode,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: Default::default(),
                    bias: Default::default(),
                }),
                multisample: Default::default(),
                multiview: None,
                cache: None,
            })
        };
        let lit_fill = lit_pipeline(wgpu::PolygonMode::Fill, "lit_fill_pipeline");
        let lit_line = features
            .contains(wgpu::Features::POLYGON_MODE_LINE)
            .then(|| lit_pipeline(wgpu::PolygonMode::Line, "lit_line_pipeline"));
        let lit_point = features
            .contains(wgpu::Features::POLYGON_MODE_POINT)
            .then(|| lit_pipeline(wgpu::PolygonMode::Point, "lit_point_pipeline"));

        // Depth-map view
        let depth_view_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("depth_view_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::DEPTH_VIEW_SHADER.into()),
        });
        let depth_view_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("depth_view_pipeline_layout"),
                bind_group_layouts: &[&depth_view_layout],
                push_constant_ranges: &[],
            });
        let depth_view_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("depth_view_pipeline"),
            layout: Some(&depth_view_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &depth_view_shader,
                entry_point: Some("vs_quad"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &depth_view_shader,
                entry_point: Some("fs_quad"),
                compilation_options: Default::default(),
                targets: &color_target,
            }),
            primitive: Default::default(),
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        // Skybox
        let skybox_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("skybox_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::SKYBOX_SHADER.into()),
        });
        let skybox_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("skybox_pipeline_layout"),
            bind_group_layouts: &[&skybox_pool.layout],
            push_constant_ranges: &[],
        });
        let skybox_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("skybox_pipeline"),
            layout: Some(&skybox_layout),
            vertex: wgpu::VertexState {
                module: &skybox_shader,
                entry_point: Some("vs_sky"),
                compilation_options: Default::default(),
                buffers: &[mesh_layout.clone()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &skybox_shader,
                entry_point: Some("fs_sky"),
                compilation_options: Default::default(),
                targets: &color_target,
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let skybox_mesh = GpuMesh::upload(&device, "skybox_mesh", &MeshData::cube(1.0));
        let screen_depth = Self::create_depth_texture(&device, width, height);
        tracing::info!(
            ?surface_format,
            line = lit_line.is_some(),
            point = lit_point.is_some(),
            "gpu backend ready"
        );

        Self {
            device,
            queue,
            surface_format,
            depth_pipeline,
            lit_fill,
            lit_line,
            lit_point,
            depth_view_pipeline,
            skybox_pipeline,
            depth_pool,
            lit_pool,
            skybox_pool,
            shadow_layout,
            depth_view_layout,
            shadow_sampler,
            shadow: None,
            screen_depth,
            meshes: BTreeMap::new(),
            skybox_mesh,
            frame_target: None,
            frame: None,
            passes: Vec::new(),
            viewport: None,
            program: None,
            uniforms: UniformSet::default(),
            textures: BTreeSet::new(),
            polygon_mode: PolygonMode::Fill,
            errors,
        }
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    /// Upload `mesh` under `handle`, replacing any previous upload.
    pub fn upload_mesh(&mut self, handle: MeshHandle, mesh: &MeshData) -> Result<(), RenderError> {
        if mesh.is_empty() {
            return Err(RenderError::MeshUpload {
                handle,
                reason: "mesh has no triangles".into(),
            });
        }
        let label = format!("mesh_{}", handle.0);
        self.meshes
            .insert(handle, GpuMesh::upload(&self.device, &label, mesh));
        Ok(())
    }

    /// Colour target for the frame being recorded.
    pub fn set_frame_target(&mut self, view: wgpu::TextureView) {
        self.frame_target = Some(view);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.screen_depth = Self::create_depth_texture(&self.device, width, height);
    }

    fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("screen_depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }

    fn report(&self, message: String) {
        if let Ok(mut errors) = self.errors.lock() {
            errors.push(message);
        }
    }

    fn lit_pipeline(&self, mode: PolygonMode) -> &wgpu::RenderPipeline {
        let pipeline = match mode {
            PolygonMode::Fill => None,
            PolygonMode::Line => self.lit_line.as_ref(),
            PolygonMode::Point => self.lit_point.as_ref(),
        };
        pipeline.unwrap_or(&self.lit_fill)
    }

    /// Checks shared by every draw; returns the program and target to draw with.
    fn validate_draw(&self) -> Result<(Program, RenderTarget), String> {
        if self.frame.is_none() {
            return Err("draw outside a frame".into());
        }
        let program = self.program.ok_or("draw without a program")?;
        let target = self
            .passes
            .last()
            .map(|pass| pass.target)
            .ok_or("draw without a bound target")?;
        match (program, target) {
            (Program::Depth, RenderTarget::Screen) => {
                return Err("depth program drawn to the screen".into());
            }
            (Program::Depth, RenderTarget::Shadow) => {}
            (_, RenderTarget::Shadow) => {
                return Err(format!("{} program drawn into the shadow map", program.name()));
            }
            _ => {}
        }
        if target == RenderTarget::Shadow && self.shadow.is_none() {
            return Err("shadow target used before allocation".into());
        }
        for slot in program.required_textures() {
            if !self.textures.contains(slot) {
                return Err(format!("{} program drew without texture {slot}", program.name()));
            }
        }
        Ok((program, target))
    }

    fn record_draw(&mut self, geometry: Geometry) -> Result<(), String> {
        let (program, _) = self.validate_draw()?;
        let mesh = match geometry {
            Geometry::Mesh(handle) if !self.meshes.contains_key(&handle) => {
                return Err(RenderError::UnknownMesh(handle).to_string());
            }
            Geometry::Mesh(handle) => DrawMesh::Mesh(handle),
            Geometry::Skybox => DrawMesh::Skybox,
            Geometry::ScreenQuad => DrawMesh::FullScreen,
        };
        let (pipeline, uniforms) = match program {
            Program::Depth => {
                let block = self.uniforms.depth()?;
                let slot = self
                    .depth_pool
                    .push(&self.device, &self.queue, bytemuck::bytes_of(&block));
                (PipelineKey::Depth, Some(slot))
            }
            Program::Lit => {
                let block = self.uniforms.lit()?;
                let slot = self
                    .lit_pool
                    .push(&self.device, &self.queue, bytemuck::bytes_of(&block));
                (PipelineKey::Lit(self.polygon_mode), Some(slot))
            }
            Program::Skybox => {
                let block = self.uniforms.skybox()?;
                let slot = self
                    .skybox_pool
                    .push(&self.device, &self.queue, bytemuck::bytes_of(&block));
                (PipelineKey::Skybox, Some(slot))
            }
            Program::DepthView => (PipelineKey::DepthView, None),
        };
        let viewport = self.viewport;
        if let Some(pass) = self.passes.last_mut() {
            pass.draws.push(RecordedDraw {
                viewport,
                pipeline,
                uniforms,
                mesh,
            });
        }
        Ok(())
    }

    fn encode(&self, frame: u64, passes: &[RecordedPass]) -> Option<wgpu::CommandBuffer> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });

        for (index, pass) in passes.iter().enumerate() {
            if pass.draws.is_empty() && pass.clear_color.is_none() && !pass.clear_depth {
                continue;
            }
            let depth_ops = Some(wgpu::Operations {
                load: if pass.clear_depth {
                    wgpu::LoadOp::Clear(1.0)
                } else {
                    wgpu::LoadOp::Load
                },
                store: wgpu::StoreOp::Store,
            });
            let mut render_pass = match pass.target {
                RenderTarget::Shadow => {
                    let shadow = self.shadow.as_ref()?;
                    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("shadow_pass"),
                        color_attachments: &[],
                        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                            view: &shadow.view,
                            depth_ops,
                            stencil_ops: None,
                        }),
                        ..Default::default()
                    })
                }
                RenderTarget::Screen => {
                    let Some(view) = self.frame_target.as_ref() else {
                        self.report(format!("frame {frame}: no colour target for screen pass"));
                        return None;
                    };
                    let load = match pass.clear_color {
                        Some(c) => wgpu::LoadOp::Clear(wgpu::Color {
                            r: c.x as f64,
                            g: c.y as f64,
                            b: c.z as f64,
                            a: c.w as f64,
                        }),
                        None => wgpu::LoadOp::Load,
                    };
                    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("screen_pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load,
                                store: wgpu::StoreOp::Store,
                            },
                        })],
                        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                            view: &self.screen_depth,
                            depth_ops,
                            stencil_ops: None,
                        }),
                        ..Default::default()
                    })
                }
            };
            tracing::trace!(index, target = ?pass.target, draws = pass.draws.len(), "encode pass");

            for draw in &pass.draws {
                if let Some(vp) = draw.viewport {
                    render_pass.set_viewport(
                        vp.x as f32,
                        vp.y as f32,
                        vp.width as f32,
                        vp.height as f32,
                        0.0,
                        1.0,
                    );
                }
                match draw.pipeline {
                    PipelineKey::Depth => {
                        render_pass.set_pipeline(&self.depth_pipeline);
                        if let Some(slot) = draw.uniforms {
                            render_pass.set_bind_group(0, self.depth_pool.bind_group(slot), &[]);
                        }
                    }
                    PipelineKey::Lit(mode) => {
                        let shadow = self.shadow.as_ref()?;
                        render_pass.set_pipeline(self.lit_pipeline(mode));
                        if let Some(slot) = draw.uniforms {
                            render_pass.set_bind_group(0, self.lit_pool.bind_group(slot), &[]);
                        }
                        render_pass.set_bind_group(1, &shadow.lit_bind_group, &[]);
                    }
                    PipelineKey::DepthView => {
                        let shadow = self.shadow.as_ref()?;
                        render_pass.set_pipeline(&self.depth_view_pipeline);
                        render_pass.set_bind_group(0, &shadow.depth_view_bind_group, &[]);
                    }
                    PipelineKey::Skybox => {
                        render_pass.set_pipeline(&self.skybox_pipeline);
                        if let Some(slot) = draw.uniforms {
                            render_pass.set_bind_group(0, self.skybox_pool.bind_group(slot), &[]);
                        }
                    }
                }
                let mesh = match draw.mesh {
                    DrawMesh::FullScreen => {
                        render_pass.draw(0..3, 0..1);
                        continue;
                    }
                    DrawMesh::Skybox => &self.skybox_mesh,
                    DrawMesh::Mesh(handle) => match self.meshes.get(&handle) {
                        Some(mesh) => mesh,
                        None => continue,
                    },
                };
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        Some(encoder.finish())
    }
}

impl RenderBackend for GpuBackend {
    fn allocate_shadow_map(&mut self, spec: &ShadowMapSpec) -> Result<(), RenderError> {
        let max = self.device.limits().max_texture_dimension_2d;
        if spec.size == 0 || spec.size > max {
            return Err(RenderError::ShadowMapAllocation {
                size: spec.size,
                reason: format!("size must be within 1..={max}"),
            });
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("shadow_map"),
            size: wgpu::Extent3d {
                width: spec.size,
                height: spec.size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&Default::default());
        let lit_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadow_map_bind_group"),
            layout: &self.shadow_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.shadow_sampler),
                },
            ],
        });
        let depth_view_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("depth_view_bind_group"),
            layout: &self.depth_view_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            }],
        });
        tracing::info!(size = spec.size, "shadow map allocated");
        self.shadow = Some(ShadowTarget {
            view,
            lit_bind_group,
            depth_view_bind_group,
        });
        Ok(())
    }

    fn begin_frame(&mut self, frame: u64) {
        if let Some(open) = self.frame {
            self.report(format!("begin_frame({frame}) while frame {open} is open"));
        }
        self.frame = Some(frame);
        self.passes.clear();
        self.viewport = None;
        self.program = None;
        self.uniforms = UniformSet::default();
        self.textures.clear();
        self.polygon_mode = PolygonMode::Fill;
        self.depth_pool.reset();
        self.lit_pool.reset();
        self.skybox_pool.reset();
    }

    fn end_frame(&mut self) {
        let Some(frame) = self.frame.take() else {
            self.report("end_frame without begin_frame".into());
            return;
        };
        let _span = tracing::debug_span!("encode_frame", frame).entered();
        let passes = std::mem::take(&mut self.passes);
        if let Some(commands) = self.encode(frame, &passes) {
            self.queue.submit(std::iter::once(commands));
        }
        self.frame_target = None;
    }

    fn bind_target(&mut self, target: RenderTarget) {
        self.passes.push(RecordedPass::new(target));
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }

    fn clear(&mut self, clear: Clear) {
        let Some(target) = self.passes.last().map(|pass| pass.target) else {
            self.report("clear without a bound target".into());
            return;
        };
        if self.passes.last().is_some_and(|pass| !pass.draws.is_empty()) {
            self.passes.push(RecordedPass::new(target));
        }
        if let Some(pass) = self.passes.last_mut() {
            if target == RenderTarget::Screen {
                pass.clear_color = clear.color.or(pass.clear_color);
            }
            pass.clear_depth |= clear.depth;
        }
    }

    fn use_program(&mut self, program: Program) {
        self.program = Some(program);
        self.uniforms = UniformSet::default();
        self.textures.clear();
    }

    fn set_uniform(&mut self, name: &'static str, value: UniformValue) {
        self.uniforms.values.insert(name, value);
    }

    fn bind_texture(&mut self, slot: &'static str, source: TextureSource) {
        match source {
            TextureSource::ShadowMap => {
                self.textures.insert(slot);
            }
        }
    }

    fn set_polygon_mode(&mut self, mode: PolygonMode) {
        let supported = match mode {
            PolygonMode::Fill => true,
            PolygonMode::Line => self.lit_line.is_some(),
            PolygonMode::Point => self.lit_point.is_some(),
        };
        if !supported {
            tracing::debug!(?mode, "polygon mode unsupported, drawing filled");
        }
        self.polygon_mode = mode;
    }

    fn draw(&mut self, geometry: Geometry) {
        if let Err(message) = self.record_draw(geometry) {
            let frame = self.frame.unwrap_or_default();
            self.report(format!("frame {frame}: {message}"));
        }
    }

    fn drain_errors(&mut self) -> Vec<String> {
        match self.errors.lock() {
            Ok(mut errors) => std::mem::take(&mut *errors),
            Err(_) => Vec::new(),
        }
    }
}
