use std::collections::BTreeSet;

use roomview_common::{MeshHandle, PolygonMode};

use crate::backend::{
    Clear, Geometry, Program, RenderBackend, RenderTarget, TextureSource, UniformValue, Viewport,
};
use crate::error::RenderError;
use crate::shadow::ShadowMapSpec;

/// Every call made on a [`RecordingBackend`], in order.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedEvent {
    AllocateShadowMap(u32),
    BeginFrame(u64),
    EndFrame,
    BindTarget(RenderTarget),
    Viewport(Viewport),
    Clear(Clear),
    UseProgram(Program),
    SetUniform(&'static str, UniformValue),
    BindTexture(&'static str, TextureSource),
    PolygonMode(PolygonMode),
    Draw(Geometry),
}

/// Snapshot of the state a draw was issued with.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub frame: u64,
    pub target: RenderTarget,
    pub viewport: Option<Viewport>,
    pub program: Program,
    pub geometry: Geometry,
    pub polygon_mode: PolygonMode,
    pub uniforms: Vec<(&'static str, UniformValue)>,
    pub textures: Vec<&'static str>,
}

impl RecordedDraw {
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }
}

/// Backend that records calls instead of rendering.
///
/// It enforces the same contracts a GPU backend relies on and reports
/// violations through [`RenderBackend::drain_errors`]: every uniform and
/// texture a program needs is set before a draw, the shadow map is only
/// sampled after the current frame's depth pass wrote it, and draws happen
/// inside a frame. Used by tests and the headless CLI.
#[derive(Debug)]
pub struct RecordingBackend {
    events: Vec<RecordedEvent>,
    draws: Vec<RecordedDraw>,
    errors: Vec<String>,
    fail_allocation: bool,
    known_meshes: Option<BTreeSet<MeshHandle>>,

    shadow_map: Option<ShadowMapSpec>,
    shadow_written: Option<u64>,
    frame: Option<u64>,
    frames_completed: u64,
    target: RenderTarget,
    viewport: Option<Viewport>,
    program: Option<Program>,
    uniforms: Vec<(&'static str, UniformValue)>,
    textures: Vec<&'static str>,
    polygon_mode: PolygonMode,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            draws: Vec::new(),
            errors: Vec::new(),
            fail_allocation: false,
            known_meshes: None,
            shadow_map: None,
            shadow_written: None,
            frame: None,
            frames_completed: 0,
            target: RenderTarget::Screen,
            viewport: None,
            program: None,
            uniforms: Vec::new(),
            textures: Vec::new(),
            polygon_mode: PolygonMode::Fill,
        }
    }

    /// Make `allocate_shadow_map` fail.
    pub fn fail_allocation(mut self) -> Self {
        self.fail_allocation = true;
        self
    }

    /// Restrict mesh draws to these handles; others are reported.
    pub fn with_meshes(mut self, meshes: impl IntoIterator<Item = MeshHandle>) -> Self {
        self.known_meshes = Some(meshes.into_iter().collect());
        self
    }

    /// Queue a diagnostic as if the device had reported it.
    pub fn inject_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    pub fn draws(&self) -> &[RecordedDraw] {
        &self.draws
    }

    /// Draws issued during `frame`.
    pub fn draws_in_frame(&self, frame: u64) -> impl Iterator<Item = &RecordedDraw> {
        self.draws.iter().filter(move |d| d.frame == frame)
    }

    pub fn frames_completed(&self) -> u64 {
        self.frames_completed
    }

    pub fn shadow_map(&self) -> Option<&ShadowMapSpec> {
        self.shadow_map.as_ref()
    }

    /// Drop recorded events and draws, keeping state and pending errors.
    pub fn clear_history(&mut self) {
        self.events.clear();
        self.draws.clear();
    }

    fn report(&mut self, message: String) {
        tracing::debug!(%message, "recording backend violation");
        self.errors.push(message);
    }

    fn validate_draw(&mut self, frame: u64, program: Program, geometry: Geometry) {
        for name in program.required_uniforms() {
            if !self.uniforms.iter().any(|(n, _)| n == name) {
                self.report(format!(
                    "frame {frame}: {} draw without uniform `{name}`",
                    program.name()
                ));
            }
        }
        for slot in program.required_textures() {
            if !self.textures.contains(slot) {
                self.report(format!(
                    "frame {frame}: {} draw without texture `{slot}`",
                    program.name()
                ));
            }
        }

        match (program, self.target) {
            (Program::Depth, RenderTarget::Screen) => {
                self.report(format!("frame {frame}: depth program drawn to the screen"));
            }
            (Program::Depth, RenderTarget::Shadow) => {
                if self.shadow_map.is_none() {
                    self.report(format!("frame {frame}: shadow target used before allocation"));
                }
            }
            (_, RenderTarget::Shadow) => {
                self.report(format!(
                    "frame {frame}: {} program drawn into the shadow target",
                    program.name()
                ));
            }
            (_, RenderTarget::Screen) => {}
        }

        if !self.textures.is_empty() && self.shadow_written != Some(frame) {
            self.report(format!(
                "frame {frame}: shadow map sampled before this frame's depth pass"
            ));
        }

        if let (Geometry::Mesh(handle), Some(known)) = (geometry, &self.known_meshes)
            && !known.contains(&handle)
        {
            self.report(format!("frame {frame}: draw of unknown mesh {handle:?}"));
        }
    }
}

impl RenderBackend for RecordingBackend {
    fn allocate_shadow_map(&mut self, spec: &ShadowMapSpec) -> Result<(), RenderError> {
        self.events.push(RecordedEvent::AllocateShadowMap(spec.size));
        if spec.size == 0 {
            return Err(RenderError::ShadowMapAllocation {
                size: 0,
                reason: "zero-sized target".into(),
            });
        }
        if self.fail_allocation {
            return Err(RenderError::ShadowMapAllocation {
                size: spec.size,
                reason: "recording backend configured to fail".into(),
            });
        }
        self.shadow_map = Some(*spec);
        Ok(())
    }

    fn begin_frame(&mut self, frame: u64) {
        self.events.push(RecordedEvent::BeginFrame(frame));
        if let Some(open) = self.frame {
            self.report(format!("frame {frame} began while frame {open} was open"));
        }
        self.frame = Some(frame);
    }

    fn end_frame(&mut self) {
        self.events.push(RecordedEvent::EndFrame);
        if self.frame.take().is_some() {
            self.frames_completed += 1;
        } else {
            self.report("end_frame without begin_frame".into());
        }
    }

    fn bind_target(&mut self, target: RenderTarget) {
        self.events.push(RecordedEvent::BindTarget(target));
        self.target = target;
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.events.push(RecordedEvent::Viewport(viewport));
        self.viewport = Some(viewport);
    }

    fn clear(&mut self, clear: Clear) {
        self.events.push(RecordedEvent::Clear(clear));
        // A cleared shadow target is a complete depth pass, even with nothing drawn.
        if clear.depth && self.target == RenderTarget::Shadow {
            if let Some(frame) = self.frame {
                self.shadow_written = Some(frame);
            }
        }
    }

    fn use_program(&mut self, program: Program) {
        self.events.push(RecordedEvent::UseProgram(program));
        self.program = Some(program);
        self.uniforms.clear();
        self.textures.clear();
    }

    fn set_uniform(&mut self, name: &'static str, value: UniformValue) {
        self.events.push(RecordedEvent::SetUniform(name, value));
        match self.uniforms.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.uniforms.push((name, value)),
        }
    }

    fn bind_texture(&mut self, slot: &'static str, source: TextureSource) {
        self.events.push(RecordedEvent::BindTexture(slot, source));
        if !self.textures.contains(&slot) {
            self.textures.push(slot);
        }
    }

    fn set_polygon_mode(&mut self, mode: PolygonMode) {
        self.events.push(RecordedEvent::PolygonMode(mode));
        self.polygon_mode = mode;
    }

    fn draw(&mut self, geometry: Geometry) {
        self.events.push(RecordedEvent::Draw(geometry));
        let Some(frame) = self.frame else {
            self.report(format!("draw of {geometry:?} outside a frame"));
            return;
        };
        let Some(program) = self.program else {
            self.report(format!("frame {frame}: draw of {geometry:?} without a program"));
            return;
        };

        self.validate_draw(frame, program, geometry);
        if program == Program::Depth && self.target == RenderTarget::Shadow {
            self.shadow_written = Some(frame);
        }

        self.draws.push(RecordedDraw {
            frame,
            target: self.target,
            viewport: self.viewport,
            program,
            geometry,
            polygon_mode: self.polygon_mode,
            uniforms: self.uniforms.clone(),
            textures: self.textures.clone(),
        });
    }

    fn drain_errors(&mut self) -> Vec<String> {
        std::mem::take(&mut self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{slot, uniform};
    use glam::Mat4;

    fn allocated() -> RecordingBackend {
        let mut backend = RecordingBackend::new();
        backend
            .allocate_shadow_map(&ShadowMapSpec::default())
            .unwrap();
        backend
    }

    #[test]
    fn missing_uniform_is_reported() {
        let mut backend = allocated();
        backend.begin_frame(0);
        backend.bind_target(RenderTarget::Shadow);
        backend.use_program(Program::Depth);
        backend.set_uniform(uniform::MODEL, UniformValue::Mat4(Mat4::IDENTITY));
        backend.draw(Geometry::Mesh(MeshHandle(0)));
        backend.end_frame();

        let errors = backend.drain_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("lightSpaceTrMatrix"), "{errors:?}");
    }

    #[test]
    fn uniforms_reset_on_program_switch() {
        let mut backend = allocated();
        backend.begin_frame(0);
        backend.use_program(Program::Skybox);
        backend.set_uniform(uniform::VIEW, UniformValue::Mat4(Mat4::IDENTITY));
        backend.set_uniform(uniform::PROJECTION, UniformValue::Mat4(Mat4::IDENTITY));
        backend.use_program(Program::Skybox);
        backend.draw(Geometry::Skybox);
        backend.end_frame();
        assert_eq!(backend.drain_errors().len(), 2);
    }

    #[test]
    fn sampling_before_depth_pass_is_reported() {
        let mut backend = allocated();
        backend.begin_frame(3);
        backend.use_program(Program::DepthView);
        backend.bind_texture(slot::DEPTH_MAP, TextureSource::ShadowMap);
        backend.draw(Geometry::ScreenQuad);
        backend.end_frame();

        let errors = backend.drain_errors();
        assert!(errors.iter().any(|e| e.contains("before this frame's depth pass")));
    }

    #[test]
    fn depth_from_previous_frame_does_not_count() {
        let mut backend = allocated();
        backend.begin_frame(0);
        backend.bind_target(RenderTarget::Shadow);
        backend.use_program(Program::Depth);
        backend.set_uniform(uniform::LIGHT_SPACE, UniformValue::Mat4(Mat4::IDENTITY));
        backend.set_uniform(uniform::MODEL, UniformValue::Mat4(Mat4::IDENTITY));
        backend.draw(Geometry::Mesh(MeshHandle(0)));
        backend.end_frame();
        assert!(backend.drain_errors().is_empty());

        backend.begin_frame(1);
        backend.bind_target(RenderTarget::Screen);
        backend.use_program(Program::DepthView);
        backend.bind_texture(slot::DEPTH_MAP, TextureSource::ShadowMap);
        backend.draw(Geometry::ScreenQuad);
        backend.end_frame();
        assert_eq!(backend.drain_errors().len(), 1);
    }

    #[test]
    fn shadow_target_requires_allocation() {
        let mut backend = RecordingBackend::new();
        backend.begin_frame(0);
        backend.bind_target(RenderTarget::Shadow);
        backend.use_program(Program::Depth);
        backend.set_uniform(uniform::LIGHT_SPACE, UniformValue::Mat4(Mat4::IDENTITY));
        backend.set_uniform(uniform::MODEL, UniformValue::Mat4(Mat4::IDENTITY));
        backend.draw(Geometry::Mesh(MeshHandle(0)));
        backend.end_frame();
        let errors = backend.drain_errors();
        assert!(errors.iter().any(|e| e.contains("before allocation")));
    }

    #[test]
    fn unknown_mesh_is_reported() {
        let mut backend = allocated().with_meshes([MeshHandle(0)]);
        backend.begin_frame(0);
        backend.bind_target(RenderTarget::Shadow);
        backend.use_program(Program::Depth);
        backend.set_uniform(uniform::LIGHT_SPACE, UniformValue::Mat4(Mat4::IDENTITY));
        backend.set_uniform(uniform::MODEL, UniformValue::Mat4(Mat4::IDENTITY));
        backend.draw(Geometry::Mesh(MeshHandle(0)));
        backend.draw(Geometry::Mesh(MeshHandle(9)));
        backend.end_frame();
        let errors = backend.drain_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("MeshHandle(9)"));
    }

    #[test]
    fn injected_errors_drain_once() {
        let mut backend = RecordingBackend::new();
        backend.inject_error("device lost");
        assert_eq!(backend.drain_errors(), vec!["device lost".to_string()]);
        assert!(backend.drain_errors().is_empty());
    }

    #[test]
    fn draw_outside_frame_is_reported() {
        let mut backend = allocated();
        backend.use_program(Program::DepthView);
        backend.draw(Geometry::ScreenQuad);
        assert_eq!(backend.drain_errors().len(), 1);
        assert!(backend.draws().is_empty());
    }
}
