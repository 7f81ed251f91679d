use glam::Vec3;
use serde::Serialize;

/// Free-floating offset and scale used while hand-tuning placements.
///
/// Nothing is drawn with it; its values are logged on request and copied
/// into the layout table by hand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TuningProbe {
    pub offset: Vec3,
    pub scale: f32,
}

impl TuningProbe {
    /// Scale change per nudge step.
    pub const SCALE_STEP: f32 = 0.001;

    pub fn nudge(&mut self, delta: Vec3) {
        self.offset += delta;
    }

    pub fn nudge_scale(&mut self, steps: f32) {
        self.scale += steps * Self::SCALE_STEP;
    }

    pub fn report(&self, scene_angle: f32) {
        tracing::info!(
            x = self.offset.x,
            y = self.offset.y,
            z = self.offset.z,
            angle = scene_angle,
            scale = self.scale,
            "tuning probe"
        );
    }
}

impl Default for TuningProbe {
    fn default() -> Self {
        Self {
            offset: Vec3::ZERO,
            scale: 1.0,
        }
    }
}
