mod keymap;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context as _, Result, anyhow};
use clap::Parser;
use egui::Context as EguiContext;
use glam::Vec2;
use roomview_assets::MeshLibrary;
use roomview_input::{ControlState, LookAccumulator, SceneCommand};
use roomview_render_wgpu::GpuBackend;
use roomview_scene::{FrameReport, LitPath, SceneDriver, ViewerConfig, load_catalog};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, ElementState, KeyEvent, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "roomview-desktop", about = "Shadow-mapped room viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON viewer configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory the model files are read from
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Start without the opening fly-through
    #[arg(long)]
    no_intro: bool,
}

/// Scene-side state: everything that survives a lost GPU context.
struct AppState {
    config: ViewerConfig,
    library: MeshLibrary,
    controls: ControlState,
    look: Option<LookAccumulator>,
    looking: bool,
    show_overlay: bool,
    last_report: Option<FrameReport>,
    diagnostics_seen: usize,
    last_frame: Instant,
    frame_ms: f32,
}

impl AppState {
    fn new(config: ViewerConfig) -> Self {
        let library = load_catalog(&config.asset_root);
        Self {
            config,
            library,
            controls: ControlState::new(),
            look: None,
            looking: false,
            show_overlay: true,
            last_report: None,
            diagnostics_seen: 0,
            last_frame: Instant::now(),
            frame_ms: 0.0,
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, key: KeyCode, pressed: bool, repeat: bool) {
        if let Some(control) = keymap::held_control(key) {
            self.controls.set_held(control, pressed);
        }
        if !pressed || repeat {
            return;
        }
        if let Some(command) = keymap::pressed_command(key) {
            self.controls.trigger(command);
        }
        match key {
            KeyCode::F1 => self.show_overlay = !self.show_overlay,
            KeyCode::Escape => event_loop.exit(),
            _ => {}
        }
    }

    fn draw_ui(&mut self, ctx: &EguiContext, driver: &SceneDriver) {
        if !self.show_overlay {
            return;
        }
        let state = driver.state();
        let camera = driver.camera().position();

        egui::Window::new("Room Viewer")
            .default_width(260.0)
            .show(ctx, |ui| {
                ui.label(format!(
                    "Frame {}  ({:.1} ms)",
                    driver.frame_count(),
                    self.frame_ms
                ));
                ui.label(format!(
                    "Camera: ({:.2}, {:.2}, {:.2})",
                    camera.x, camera.y, camera.z
                ));
                ui.label(format!("Scene angle: {:.1}°", state.scene_angle));
                ui.label(format!("Polygon mode: {:?}", state.polygon_mode));
                ui.label(format!("Intro: {:?}", driver.intro().phase()));
                ui.label(format!("Plane: {:?}", driver.plane().phase()));
                ui.label(format!(
                    "Meshes: {} ({} proxies)",
                    self.library.len(),
                    self.library.proxy_count()
                ));
                if let Some(report) = &self.last_report {
                    let path = match report.lit_path {
                        LitPath::Lit => "lit",
                        LitPath::DepthView => "depth map",
                    };
                    ui.label(format!("Draw calls: {}  Pass: {path}", report.draws));
                }
                ui.label(format!("Backend diagnostics: {}", self.diagnostics_seen));
                ui.separator();

                ui.horizontal(|ui| {
                    let night = if state.night { "Day (X)" } else { "Night (X)" };
                    if ui.button(night).clicked() {
                        self.controls.trigger(SceneCommand::ToggleNight);
                    }
                    if ui.button("Depth map (C)").clicked() {
                        self.controls.trigger(SceneCommand::ToggleDepthMap);
                    }
                });
                if ui
                    .add_enabled(
                        !driver.plane().is_flying(),
                        egui::Button::new("Launch plane (Z)"),
                    )
                    .clicked()
                {
                    self.controls.trigger(SceneCommand::LaunchPlane);
                }

                let probe = driver.probe();
                ui.separator();
                ui.label(format!(
                    "Probe: ({:.2}, {:.2}, {:.2}) × {:.3}",
                    probe.offset.x, probe.offset.y, probe.offset.z, probe.scale
                ));
                ui.separator();
                ui.small(keymap::HELP);
            });
    }
}

/// GPU-side state, created on `resumed`.
struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    backend: GpuBackend,
    driver: SceneDriver,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

struct GpuApp {
    state: AppState,
    gpu: Option<Gpu>,
    egui_ctx: EguiContext,
    failure: Option<anyhow::Error>,
}

impl GpuApp {
    fn new(config: ViewerConfig) -> Self {
        Self {
            state: AppState::new(config),
            gpu: None,
            egui_ctx: EguiContext::default(),
            failure: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<Gpu> {
        let config = &self.state.config;
        let attrs = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(PhysicalSize::new(config.width, config.height));
        let window = Arc::new(event_loop.create_window(attrs).context("create window")?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .context("create surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| anyhow!("no suitable GPU adapter"))?;

        let optional = wgpu::Features::POLYGON_MODE_LINE
            | wgpu::Features::POLYGON_MODE_POINT
            | wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER;
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("roomview_device"),
                required_features: adapter.features() & optional,
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("create device")?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or(surface_caps.formats.first())
            .copied()
            .ok_or_else(|| anyhow!("surface reports no formats"))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let mut backend = GpuBackend::new(
            device.clone(),
            queue.clone(),
            surface_format,
            surface_config.width,
            surface_config.height,
        );
        for (handle, mesh) in self.state.library.iter() {
            if let Err(err) = backend.upload_mesh(handle, mesh) {
                tracing::warn!(%err, "mesh not uploaded");
            }
        }

        let mut driver = SceneDriver::new(&mut backend, config).context("create scene")?;
        driver.resize(surface_config.width, surface_config.height);
        self.state.look = Some(LookAccumulator::from_front(
            driver.camera().front(),
            config.mouse_sensitivity,
        ));

        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        tracing::info!(
            backend = adapter.get_info().backend.to_str(),
            features = ?device.features(),
            "GPU initialized"
        );

        Ok(Gpu {
            window,
            surface,
            device,
            queue,
            config: surface_config,
            backend,
            driver,
            egui_winit,
            egui_renderer,
        })
    }

    fn redraw(&mut self) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        let state = &mut self.state;

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("surface lost, reconfiguring");
                gpu.surface.configure(&gpu.device, &gpu.config);
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let now = Instant::now();
        state.frame_ms = (now - state.last_frame).as_secs_f32() * 1000.0;
        state.last_frame = now;

        let mut input = state.controls.drain(state.config.camera_speed);
        let drag = state.controls.take_drag();
        if let Some(intent) = state.look.as_mut().and_then(|look| look.apply(drag)) {
            input.intents.push(intent);
        }

        gpu.backend.set_frame_target(view.clone());
        let report = gpu.driver.frame(&mut gpu.backend, input);
        state.diagnostics_seen += report.diagnostics.len();
        state.last_report = Some(report);

        let raw_input = gpu.egui_winit.take_egui_input(&gpu.window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            state.draw_ui(ctx, &gpu.driver);
        });
        gpu.egui_winit
            .handle_platform_output(&gpu.window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.config.width, gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            gpu.egui_renderer
                .update_texture(&gpu.device, &gpu.queue, *id, image_delta);
        }
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("egui_encoder"),
            });
        gpu.egui_renderer.update_buffers(
            &gpu.device,
            &gpu.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            gpu.egui_renderer
                .render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));
        for id in &full_output.textures_delta.free {
            gpu.egui_renderer.free_texture(id);
        }

        output.present();
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match self.init(event_loop) {
            Ok(gpu) => self.gpu = Some(gpu),
            Err(err) => {
                tracing::error!("startup failed: {err:#}");
                self.failure = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(gpu) = &mut self.gpu {
            let response = gpu.egui_winit.on_window_event(&gpu.window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.config.width = new_size.width.max(1);
                    gpu.config.height = new_size.height.max(1);
                    gpu.surface.configure(&gpu.device, &gpu.config);
                    gpu.backend.resize(gpu.config.width, gpu.config.height);
                    gpu.driver.resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::Focused(false) => {
                self.state.controls.release_all();
                self.state.looking = false;
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: key_state,
                        repeat,
                        ..
                    },
                ..
            } => {
                self.state
                    .handle_key(event_loop, key, key_state == ElementState::Pressed, repeat);
            }
            WindowEvent::MouseInput {
                button,
                state: btn_state,
                ..
            } => {
                let pressed = btn_state == ElementState::Pressed;
                if let Some(control) = keymap::button_control(button) {
                    self.state.controls.set_held(control, pressed);
                }
                if keymap::is_look_button(button) {
                    self.state.looking = pressed;
                    if let Some(gpu) = &self.gpu {
                        gpu.window.set_cursor_visible(!pressed);
                    }
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let amount = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32,
                };
                self.state.controls.scroll(amount);
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
                if let Some(gpu) = &self.gpu {
                    gpu.window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if self.state.looking {
                self.state
                    .controls
                    .drag(Vec2::new(delta.0 as f32, delta.1 as f32));
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let mut config = match &cli.config {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };
    if let Some(assets) = cli.assets {
        config.asset_root = assets;
    }
    if cli.no_intro {
        config.intro = false;
    }

    tracing::info!(assets = %config.asset_root.display(), "roomview-desktop starting");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(config);
    event_loop.run_app(&mut app)?;

    match app.failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
