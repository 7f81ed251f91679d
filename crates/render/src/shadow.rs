use glam::Mat4;

use crate::backend::{
    Clear, Geometry, ObjectDraw, Program, RenderBackend, RenderTarget, UniformValue, Viewport,
    uniform,
};
use crate::error::RenderError;

pub const DEFAULT_SHADOW_MAP_SIZE: u32 = 2048;

/// Shape of the shadow-map target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowMapSpec {
    /// Width and height in texels.
    pub size: u32,
    /// Depth reported for lookups outside the map (max depth: always lit).
    pub border_depth: f32,
}

impl Default for ShadowMapSpec {
    fn default() -> Self {
        Self {
            size: DEFAULT_SHADOW_MAP_SIZE,
            border_depth: 1.0,
        }
    }
}

impl ShadowMapSpec {
    pub fn with_size(size: u32) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::sized(self.size, self.size)
    }
}

/// Proof that the shadow map holds this frame's depth.
///
/// Only [`ShadowMapStage::render`] creates one. Lit and depth-view passes
/// take it by value, so they cannot run before the depth pass of the same
/// frame or reuse an old one.
#[derive(Debug)]
pub struct PopulatedShadowMap {
    frame: u64,
    size: u32,
}

impl PopulatedShadowMap {
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn size(&self) -> u32 {
        self.size
    }
}

/// First pass: renders scene depth from the light into the shadow map.
#[derive(Debug)]
pub struct ShadowMapStage {
    spec: ShadowMapSpec,
}

impl ShadowMapStage {
    /// Allocates the shadow-map target. Failure here is fatal for the viewer.
    pub fn new(backend: &mut dyn RenderBackend, spec: ShadowMapSpec) -> Result<Self, RenderError> {
        backend.allocate_shadow_map(&spec)?;
        tracing::info!(size = spec.size, "shadow map allocated");
        Ok(Self { spec })
    }

    pub fn spec(&self) -> &ShadowMapSpec {
        &self.spec
    }

    /// Draw every object's depth as seen from the light, then rebind the
    /// screen with `screen` as its viewport.
    pub fn render(
        &self,
        backend: &mut dyn RenderBackend,
        frame: u64,
        light_space: Mat4,
        draws: &[ObjectDraw],
        screen: Viewport,
    ) -> PopulatedShadowMap {
        let _span = tracing::debug_span!("shadow_pass", frame, draws = draws.len()).entered();

        backend.bind_target(RenderTarget::Shadow);
        backend.set_viewport(self.spec.viewport());
        backend.clear(Clear::DEPTH);

        backend.use_program(Program::Depth);
        backend.set_uniform(uniform::LIGHT_SPACE, UniformValue::Mat4(light_space));
        for draw in draws {
            backend.set_uniform(uniform::MODEL, UniformValue::Mat4(draw.model));
            backend.draw(Geometry::Mesh(draw.mesh));
        }

        backend.bind_target(RenderTarget::Screen);
        backend.set_viewport(screen);

        PopulatedShadowMap {
            frame,
            size: self.spec.size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{RecordedEvent, RecordingBackend};
    use glam::Vec3;
    use roomview_common::MeshHandle;

    fn draws() -> Vec<ObjectDraw> {
        (0..3)
            .map(|i| ObjectDraw {
                mesh: MeshHandle(i),
                model: Mat4::from_translation(Vec3::splat(i as f32)),
                albedo: Vec3::ONE,
            })
            .collect()
    }

    #[test]
    fn allocation_failure_is_propagated() {
        let mut backend = RecordingBackend::new().fail_allocation();
        let err = ShadowMapStage::new(&mut backend, ShadowMapSpec::default()).unwrap_err();
        assert!(matches!(err, RenderError::ShadowMapAllocation { size: 2048, .. }));
    }

    #[test]
    fn pass_targets_shadow_then_restores_screen() {
        let mut backend = RecordingBackend::new();
        let stage = ShadowMapStage::new(&mut backend, ShadowMapSpec::default()).unwrap();
        backend.begin_frame(1);
        let screen = Viewport::sized(1366, 768);
        let token = stage.render(&mut backend, 1, Mat4::IDENTITY, &draws(), screen);
        backend.end_frame();

        assert_eq!(token.frame(), 1);
        assert_eq!(token.size(), 2048);

        let events = backend.events();
        let frame_start = events
            .iter()
            .position(|e| *e == RecordedEvent::BeginFrame(1))
            .unwrap();
        let pass = &events[frame_start + 1..];
        assert_eq!(pass[0], RecordedEvent::BindTarget(RenderTarget::Shadow));
        assert_eq!(pass[1], RecordedEvent::Viewport(Viewport::sized(2048, 2048)));
        assert_eq!(pass[2], RecordedEvent::Clear(Clear::DEPTH));
        assert_eq!(pass[3], RecordedEvent::UseProgram(Program::Depth));

        let tail: Vec<_> = pass.iter().rev().skip(1).take(2).collect();
        assert_eq!(*tail[0], RecordedEvent::Viewport(screen));
        assert_eq!(*tail[1], RecordedEvent::BindTarget(RenderTarget::Screen));
    }

    #[test]
    fn one_depth_draw_per_object() {
        let mut backend = RecordingBackend::new();
        let stage = ShadowMapStage::new(&mut backend, ShadowMapSpec::default()).unwrap();
        backend.begin_frame(0);
        stage.render(
            &mut backend,
            0,
            Mat4::IDENTITY,
            &draws(),
            Viewport::sized(800, 600),
        );
        backend.end_frame();

        let draws = backend.draws();
        assert_eq!(draws.len(), 3);
        assert!(draws.iter().all(|d| d.program == Program::Depth));
        assert!(draws.iter().all(|d| d.target == RenderTarget::Shadow));
        assert!(backend.drain_errors().is_empty());
    }

    #[test]
    fn depth_pass_sets_no_lighting_uniforms() {
        let mut backend = RecordingBackend::new();
        let stage = ShadowMapStage::new(&mut backend, ShadowMapSpec::default()).unwrap();
        backend.begin_frame(0);
        stage.render(&mut backend, 0, Mat4::IDENTITY, &draws(), Viewport::sized(8, 8));
        backend.end_frame();

        for draw in backend.draws() {
            assert!(draw.uniform(uniform::LIGHT_DIR).is_none());
            assert!(draw.uniform(uniform::NORMAL_MATRIX).is_none());
            assert!(draw.uniform(uniform::LIGHT_SPACE).is_some());
        }
    }
}
