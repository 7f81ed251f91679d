use glam::Vec3;
use roomview_common::{MoveDirection, PolygonMode};
use serde::{Deserialize, Serialize};

/// A decoded camera intent. The camera consumes these, never raw device events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Intent {
    /// Translate along the camera basis.
    Move { direction: MoveDirection, speed: f32 },
    /// Point the camera at absolute pitch/yaw angles, in degrees.
    Rotate { pitch: f32, yaw: f32 },
}

/// A scene-level command produced from input alongside the camera intents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SceneCommand {
    /// Add `degrees` to the shared scene rotation.
    RotateScene(f32),
    ToggleNight,
    ToggleDepthMap,
    /// Start the wooden plane's scripted flight (ignored once it has landed).
    LaunchPlane,
    SetPolygonMode(PolygonMode),
    /// Shift the placement tuning probe.
    Nudge(Vec3),
    /// Change the tuning probe's scale factor.
    NudgeScale(f32),
    /// Log the tuning probe's current values.
    ReportProbe,
}

/// Everything the scene driver consumes for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameInput {
    pub intents: Vec<Intent>,
    pub commands: Vec<SceneCommand>,
}

impl FrameInput {
    pub fn is_empty(&self) -> bool {
        self.intents.is_empty() && self.commands.is_empty()
    }
}
