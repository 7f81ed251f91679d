use glam::{Vec3, Vec4};
use roomview_camera::Camera;
use roomview_common::PolygonMode;
use roomview_input::{FrameInput, Intent, SceneCommand};
use roomview_render::{
    DirectionalLight, LitFrame, LitShadingStage, ObjectDraw, Projection, RenderBackend,
    RenderError, ShadowMapSpec, ShadowMapStage, SkyboxStage, Viewport,
};
use serde::Serialize;

use crate::animation::{BalloonBob, IntroFlythrough, PlaneFlight};
use crate::config::ViewerConfig;
use crate::layout::{BALLOON_ALBEDO, DRAW_ORDER, DrawSlot, WOODEN_PLANE_ALBEDO};
use crate::lights::RoomLights;
use crate::probe::TuningProbe;

/// Toggles and the shared rotation that every placement and lamp follows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SceneState {
    /// Degrees about world Y.
    pub scene_angle: f32,
    pub night: bool,
    pub show_depth_map: bool,
    pub polygon_mode: PolygonMode,
}

impl Default for SceneState {
    fn default() -> Self {
        Self {
            scene_angle: 0.0,
            night: false,
            show_depth_map: false,
            polygon_mode: PolygonMode::Fill,
        }
    }
}

/// Which second pass ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LitPath {
    Lit,
    DepthView,
}

/// Outcome of one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
    pub frame: u64,
    /// Draw calls issued across all passes.
    pub draws: usize,
    pub lit_path: LitPath,
    /// Backend diagnostics drained at the end of the frame.
    pub diagnostics: Vec<String>,
}

/// Owns the camera, scene state and render stages, and runs one frame at a
/// time in a fixed order: input, lights, depth pass, lit pass (or depth
/// view), skybox, animations, diagnostics.
#[derive(Debug)]
pub struct SceneDriver {
    camera: Camera,
    light: DirectionalLight,
    shadow: ShadowMapStage,
    lit: LitShadingStage,
    skybox: SkyboxStage,
    state: SceneState,
    intro: IntroFlythrough,
    plane: PlaneFlight,
    balloon: BalloonBob,
    probe: TuningProbe,
    viewport: Viewport,
    clear_color: Vec4,
    camera_speed: f32,
    frame: u64,
}

impl SceneDriver {
    /// Fails only if the backend cannot allocate the shadow map.
    pub fn new(backend: &mut dyn RenderBackend, config: &ViewerConfig) -> Result<Self, RenderError> {
        let shadow = ShadowMapStage::new(backend, ShadowMapSpec::with_size(config.shadow_map_size))?;
        let camera = Camera::new(
            config.camera_position,
            config.camera_target,
            config.camera_up,
        );
        let intro = if config.intro {
            IntroFlythrough::new()
        } else {
            IntroFlythrough::skipped()
        };
        tracing::info!(
            width = config.width,
            height = config.height,
            intro = config.intro,
            "scene driver ready"
        );

        Ok(Self {
            camera,
            light: DirectionalLight::default(),
            shadow,
            lit: LitShadingStage::new(),
            skybox: SkyboxStage::new(),
            state: SceneState::default(),
            intro,
            plane: PlaneFlight::new(),
            balloon: BalloonBob::new(),
            probe: TuningProbe::default(),
            viewport: Viewport::sized(config.width, config.height),
            clear_color: config.clear_color,
            camera_speed: config.camera_speed,
            frame: 0,
        })
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn state(&self) -> &SceneState {
        &self.state
    }

    pub fn intro(&self) -> &IntroFlythrough {
        &self.intro
    }

    pub fn plane(&self) -> &PlaneFlight {
        &self.plane
    }

    pub fn balloon(&self) -> &BalloonBob {
        &self.balloon
    }

    pub fn probe(&self) -> &TuningProbe {
        &self.probe
    }

    pub fn light(&self) -> &DirectionalLight {
        &self.light
    }

    pub fn camera_speed(&self) -> f32 {
        self.camera_speed
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Number of frames rendered so far; also the id of the next frame.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn projection(&self) -> Projection {
        Projection::for_window(self.viewport.width, self.viewport.height)
    }

    /// Zero-sized windows (minimised) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        tracing::debug!(width, height, "viewport resized");
        self.viewport = Viewport::sized(width, height);
    }

    /// Every object's mesh, model transform and colour for the current state.
    pub fn object_draws(&self) -> Vec<ObjectDraw> {
        let angle = self.state.scene_angle;
        DRAW_ORDER
            .iter()
            .map(|slot| match slot {
                DrawSlot::Fixed(object) => ObjectDraw {
                    mesh: object.mesh,
                    model: object.placement.model(angle),
                    albedo: object.albedo,
                },
                DrawSlot::WoodenPlane => ObjectDraw {
                    mesh: slot.mesh(),
                    model: self.plane.model(angle),
                    albedo: WOODEN_PLANE_ALBEDO,
                },
                DrawSlot::Balloon => ObjectDraw {
                    mesh: slot.mesh(),
                    model: self.balloon.model(angle),
                    albedo: BALLOON_ALBEDO,
                },
            })
            .collect()
    }

    pub fn apply_intent(&mut self, intent: Intent) {
        match intent {
            Intent::Move { direction, speed } => self.camera.move_by(direction, speed),
            Intent::Rotate { pitch, yaw } => self.camera.rotate(pitch, yaw),
        }
    }

    pub fn apply_command(&mut self, command: SceneCommand) {
        match command {
            SceneCommand::RotateScene(delta) => self.state.scene_angle += delta,
            SceneCommand::ToggleNight => {
                self.state.night = !self.state.night;
                tracing::debug!(night = self.state.night, "night toggled");
            }
            SceneCommand::ToggleDepthMap => {
                self.state.show_depth_map = !self.state.show_depth_map;
                tracing::debug!(show = self.state.show_depth_map, "depth map toggled");
            }
            SceneCommand::LaunchPlane => self.plane.launch(),
            SceneCommand::SetPolygonMode(mode) => self.state.polygon_mode = mode,
            SceneCommand::Nudge(delta) => self.probe.nudge(delta),
            SceneCommand::NudgeScale(steps) => self.probe.nudge_scale(steps),
            SceneCommand::ReportProbe => self.probe.report(self.state.scene_angle),
        }
    }

    /// Run one frame against `backend`. Never fails: backend problems come
    /// back as diagnostics in the report and are logged.
    pub fn frame(&mut self, backend: &mut dyn RenderBackend, input: FrameInput) -> FrameReport {
        let frame = self.frame;
        let _span = tracing::debug_span!("frame", frame).entered();
        backend.begin_frame(frame);

        for intent in input.intents {
            self.apply_intent(intent);
        }
        for command in input.commands {
            self.apply_command(command);
        }

        let view = self.camera.view_transform();
        let projection = self.projection().matrix();
        let lights = RoomLights::compute(self.state.scene_angle, view);
        let draws = self.object_draws();

        let light_space = self.light.light_space();
        let shadow_map = self
            .shadow
            .render(backend, frame, light_space, &draws, self.viewport);
        let mut draw_calls = draws.len();

        let lit_path = if self.state.show_depth_map {
            draw_calls += self
                .lit
                .render_depth_view(backend, shadow_map, self.clear_color);
            LitPath::DepthView
        } else {
            let lit_frame = LitFrame {
                view,
                projection,
                light_space,
                light_dir_eye: self.light.eye_direction(view),
                light_color: self.light.color,
                spot_light_dir: lights.spot_direction,
                point_light_pos_eye: lights.point_eye,
                spot_light_pos_eye: lights.spot_eye,
                night: if self.state.night { Vec3::ONE } else { Vec3::ZERO },
                clear_color: self.clear_color,
                polygon_mode: self.state.polygon_mode,
            };
            draw_calls += self.lit.render(backend, shadow_map, &lit_frame, &draws);
            self.skybox.render(backend, view, projection);
            draw_calls += 1;
            LitPath::Lit
        };

        self.advance_animations();

        backend.end_frame();
        let diagnostics = backend.drain_errors();
        for message in &diagnostics {
            tracing::warn!(frame, %message, "render backend diagnostic");
        }

        self.frame += 1;
        FrameReport {
            frame,
            draws: draw_calls,
            lit_path,
            diagnostics,
        }
    }

    /// Models are taken before this runs, so a frame draws the animation
    /// state it started with.
    fn advance_animations(&mut self) {
        self.intro.advance(
            &mut self.camera,
            &mut self.state.scene_angle,
            self.camera_speed,
        );
        self.plane.advance();
        self.balloon.advance();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomview_common::MoveDirection;
    use roomview_render::{Program, RecordingBackend, RenderTarget, UniformValue, uniform};

    fn quiet_config() -> ViewerConfig {
        ViewerConfig {
            intro: false,
            ..ViewerConfig::default()
        }
    }

    fn setup(config: &ViewerConfig) -> (RecordingBackend, SceneDriver) {
        let mut backend = RecordingBackend::new();
        let driver = SceneDriver::new(&mut backend, config).unwrap();
        (backend, driver)
    }

    fn commands(commands: &[SceneCommand]) -> FrameInput {
        FrameInput {
            intents: Vec::new(),
            commands: commands.to_vec(),
        }
    }

    #[test]
    fn shadow_map_allocation_failure_is_fatal() {
        let mut backend = RecordingBackend::new().fail_allocation();
        let err = SceneDriver::new(&mut backend, &quiet_config()).unwrap_err();
        assert!(matches!(err, RenderError::ShadowMapAllocation { .. }));
    }

    #[test]
    fn frames_run_clean_against_the_contract() {
        let (mut backend, mut driver) = setup(&ViewerConfig::default());
        for i in 0..5 {
            let report = driver.frame(&mut backend, FrameInput::default());
            assert_eq!(report.frame, i);
            assert_eq!(report.lit_path, LitPath::Lit);
            assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
            // 28 depth draws, 28 lit draws, the skybox.
            assert_eq!(report.draws, 28 + 28 + 1);
        }
        assert_eq!(backend.frames_completed(), 5);
        assert_eq!(driver.frame_count(), 5);
    }

    #[test]
    fn every_lit_draw_follows_its_frames_depth_pass() {
        let (mut backend, mut driver) = setup(&quiet_config());
        driver.frame(&mut backend, FrameInput::default());
        driver.frame(&mut backend, commands(&[SceneCommand::ToggleDepthMap]));
        driver.frame(&mut backend, commands(&[SceneCommand::ToggleDepthMap]));

        for frame in 0..3 {
            let draws: Vec<_> = backend.draws_in_frame(frame).collect();
            let last_depth = draws
                .iter()
                .rposition(|d| d.program == Program::Depth)
                .unwrap();
            let first_sample = draws
                .iter()
                .position(|d| matches!(d.program, Program::Lit | Program::DepthView))
                .unwrap();
            assert!(last_depth < first_sample, "frame {frame}");
            assert!(draws[..=last_depth].iter().all(|d| d.target == RenderTarget::Shadow));
        }
    }

    #[test]
    fn depth_map_toggle_swaps_the_second_pass() {
        let (mut backend, mut driver) = setup(&quiet_config());
        let report = driver.frame(&mut backend, commands(&[SceneCommand::ToggleDepthMap]));
        assert_eq!(report.lit_path, LitPath::DepthView);
        assert_eq!(report.draws, 28 + 1);
        assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
        assert!(backend.draws_in_frame(0).all(|d| d.program != Program::Lit));
        assert!(backend.draws_in_frame(0).all(|d| d.program != Program::Skybox));
    }

    #[test]
    fn light_space_ignores_the_camera() {
        let (mut backend, mut driver) = setup(&quiet_config());
        driver.frame(&mut backend, FrameInput::default());
        let input = FrameInput {
            intents: vec![
                Intent::Move {
                    direction: MoveDirection::Left,
                    speed: 0.7,
                },
                Intent::Rotate {
                    pitch: 20.0,
                    yaw: -40.0,
                },
            ],
            commands: Vec::new(),
        };
        driver.frame(&mut backend, input);

        let light_space = |frame| {
            backend
                .draws_in_frame(frame)
                .find(|d| d.program == Program::Depth)
                .and_then(|d| d.uniform(uniform::LIGHT_SPACE))
                .unwrap()
        };
        assert_eq!(light_space(0), light_space(1));

        let view = |frame| {
            backend
                .draws_in_frame(frame)
                .find(|d| d.program == Program::Lit)
                .and_then(|d| d.uniform(uniform::VIEW))
                .unwrap()
        };
        assert_ne!(view(0), view(1));
    }

    #[test]
    fn lit_view_uniform_matches_camera() {
        let (mut backend, mut driver) = setup(&quiet_config());
        driver.frame(&mut backend, FrameInput::default());
        let lit = backend
            .draws()
            .iter()
            .find(|d| d.program == Program::Lit)
            .unwrap();
        assert_eq!(
            lit.uniform(uniform::VIEW),
            Some(UniformValue::Mat4(driver.camera().view_transform()))
        );
    }

    #[test]
    fn scene_rotation_moves_objects_and_lamps() {
        let (mut backend, mut driver) = setup(&quiet_config());
        driver.frame(&mut backend, FrameInput::default());
        driver.frame(&mut backend, commands(&[SceneCommand::RotateScene(90.0)]));
        assert_eq!(driver.state().scene_angle, 90.0);

        let first = |frame| {
            backend
                .draws_in_frame(frame)
                .find(|d| d.program == Program::Lit)
                .and_then(|d| d.uniform(uniform::MODEL))
                .unwrap()
        };
        assert_ne!(first(0), first(1));

        let lamp = |frame| {
            backend
                .draws_in_frame(frame)
                .find(|d| d.program == Program::Lit)
                .and_then(|d| d.uniform(uniform::POINT_LIGHT_POS_EYE))
                .unwrap()
        };
        assert_ne!(lamp(0), lamp(1));
    }

    #[test]
    fn night_toggle_reaches_the_shader() {
        let (mut backend, mut driver) = setup(&quiet_config());
        driver.frame(&mut backend, commands(&[SceneCommand::ToggleNight]));
        let night = backend
            .draws()
            .iter()
            .find(|d| d.program == Program::Lit)
            .and_then(|d| d.uniform(uniform::NIGHT));
        assert_eq!(night, Some(UniformValue::Vec3(Vec3::ONE)));

        driver.frame(&mut backend, commands(&[SceneCommand::ToggleNight]));
        assert!(!driver.state().night);
    }

    #[test]
    fn animations_step_once_per_frame() {
        let (mut backend, mut driver) = setup(&quiet_config());
        driver.frame(&mut backend, commands(&[SceneCommand::LaunchPlane]));
        // One climb step and one balloon step, even though both were drawn twice.
        assert!((driver.plane().position().x - (-1.54)).abs() < 1e-6);
        assert!((driver.balloon().offset() + 0.0001).abs() < 1e-7);
    }

    #[test]
    fn frame_draws_pre_update_animation_state() {
        let (mut backend, mut driver) = setup(&quiet_config());
        let expected = driver.balloon().model(0.0);
        driver.frame(&mut backend, FrameInput::default());
        let balloon_model = backend
            .draws_in_frame(0)
            .filter(|d| d.program == Program::Lit)
            .nth(5)
            .and_then(|d| d.uniform(uniform::MODEL));
        assert_eq!(balloon_model, Some(UniformValue::Mat4(expected)));
    }

    #[test]
    fn intro_moves_the_camera_without_input() {
        let (mut backend, mut driver) = setup(&ViewerConfig::default());
        let start = driver.camera().position();
        for _ in 0..20 {
            driver.frame(&mut backend, FrameInput::default());
        }
        assert!(driver.camera().position().z < start.z);
        assert!(!driver.intro().is_done());
    }

    #[test]
    fn backend_diagnostics_are_reported_not_fatal() {
        let (mut backend, mut driver) = setup(&quiet_config());
        backend.inject_error("validation error: something odd");
        let report = driver.frame(&mut backend, FrameInput::default());
        assert_eq!(report.diagnostics, vec!["validation error: something odd"]);
        let next = driver.frame(&mut backend, FrameInput::default());
        assert!(next.diagnostics.is_empty());
    }

    #[test]
    fn wireframe_applies_to_lit_pass_only() {
        let (mut backend, mut driver) = setup(&quiet_config());
        driver.frame(
            &mut backend,
            commands(&[SceneCommand::SetPolygonMode(PolygonMode::Line)]),
        );
        for draw in backend.draws_in_frame(0) {
            let expected = if draw.program == Program::Lit {
                PolygonMode::Line
            } else {
                PolygonMode::Fill
            };
            assert_eq!(draw.polygon_mode, expected, "{:?}", draw.program);
        }
    }

    #[test]
    fn resize_updates_projection_and_viewport() {
        let (mut backend, mut driver) = setup(&quiet_config());
        driver.resize(800, 600);
        driver.resize(0, 0);
        assert_eq!(driver.viewport(), Viewport::sized(800, 600));
        driver.frame(&mut backend, FrameInput::default());
        let lit = backend
            .draws()
            .iter()
            .find(|d| d.program == Program::Lit)
            .unwrap();
        assert_eq!(lit.viewport, Some(Viewport::sized(800, 600)));
        assert_eq!(
            lit.uniform(uniform::PROJECTION),
            Some(UniformValue::Mat4(Projection::for_window(800, 600).matrix()))
        );
    }

    #[test]
    fn probe_commands_do_not_touch_the_scene() {
        let (mut backend, mut driver) = setup(&quiet_config());
        let before = driver.object_draws();
        driver.frame(
            &mut backend,
            commands(&[
                SceneCommand::Nudge(Vec3::new(0.01, 0.0, 0.0)),
                SceneCommand::NudgeScale(1.0),
                SceneCommand::ReportProbe,
            ]),
        );
        assert!((driver.probe().offset.x - 0.01).abs() < 1e-6);
        // Only the balloon moved, by its own animation.
        let after = driver.object_draws();
        let changed: Vec<_> = before
            .iter()
            .zip(&after)
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(changed, vec![5]);
    }
}
