use glam::{Vec2, Vec3};
use roomview_common::{MoveDirection, PolygonMode};
use serde::{Deserialize, Serialize};

use crate::intent::{FrameInput, Intent, SceneCommand};

/// Step applied by the probe nudge controls, in world units.
pub const PROBE_STEP: f32 = 0.01;

/// A held control. Device backends map keys and buttons onto these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Control {
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    /// Scene rotation by -1 degree per frame.
    SpinLeft,
    /// Scene rotation by +1 degree per frame.
    SpinRight,
    /// Scene rotation by -0.5 degrees per frame.
    NudgeSpinLeft,
    /// Scene rotation by +0.5 degrees per frame.
    NudgeSpinRight,
    LaunchPlane,
    ProbeNear,
    ProbeFar,
    ProbeRight,
    ProbeLeft,
    ProbeUp,
    ProbeDown,
    ProbeGrow,
    ProbeShrink,
    ReportProbe,
    WireframeMode,
    FillMode,
    PointMode,
}

impl Control {
    pub const COUNT: usize = 23;

    pub const ALL: [Control; Self::COUNT] = [
        Control::MoveForward,
        Control::MoveBackward,
        Control::MoveLeft,
        Control::MoveRight,
        Control::MoveUp,
        Control::MoveDown,
        Control::SpinLeft,
        Control::SpinRight,
        Control::NudgeSpinLeft,
        Control::NudgeSpinRight,
        Control::LaunchPlane,
        Control::ProbeNear,
        Control::ProbeFar,
        Control::ProbeRight,
        Control::ProbeLeft,
        Control::ProbeUp,
        Control::ProbeDown,
        Control::ProbeGrow,
        Control::ProbeShrink,
        Control::ReportProbe,
        Control::WireframeMode,
        Control::FillMode,
        Control::PointMode,
    ];

    fn index(self) -> usize {
        self as usize
    }

    fn movement(self) -> Option<MoveDirection> {
        match self {
            Control::MoveForward => Some(MoveDirection::Forward),
            Control::MoveBackward => Some(MoveDirection::Backward),
            Control::MoveLeft => Some(MoveDirection::Left),
            Control::MoveRight => Some(MoveDirection::Right),
            Control::MoveUp => Some(MoveDirection::Up),
            Control::MoveDown => Some(MoveDirection::Down),
            _ => None,
        }
    }

    /// The command this control repeats every frame while held.
    fn held_command(self) -> Option<SceneCommand> {
        let command = match self {
            Control::SpinLeft => SceneCommand::RotateScene(-1.0),
            Control::SpinRight => SceneCommand::RotateScene(1.0),
            Control::NudgeSpinLeft => SceneCommand::RotateScene(-0.5),
            Control::NudgeSpinRight => SceneCommand::RotateScene(0.5),
            Control::LaunchPlane => SceneCommand::LaunchPlane,
            Control::ProbeNear => SceneCommand::Nudge(Vec3::new(0.0, 0.0, -PROBE_STEP)),
            Control::ProbeFar => SceneCommand::Nudge(Vec3::new(0.0, 0.0, PROBE_STEP)),
            Control::ProbeRight => SceneCommand::Nudge(Vec3::new(PROBE_STEP, 0.0, 0.0)),
            Control::ProbeLeft => SceneCommand::Nudge(Vec3::new(-PROBE_STEP, 0.0, 0.0)),
            Control::ProbeUp => SceneCommand::Nudge(Vec3::new(0.0, PROBE_STEP, 0.0)),
            Control::ProbeDown => SceneCommand::Nudge(Vec3::new(0.0, -PROBE_STEP, 0.0)),
            Control::ProbeGrow => SceneCommand::NudgeScale(1.0),
            Control::ProbeShrink => SceneCommand::NudgeScale(-1.0),
            Control::ReportProbe => SceneCommand::ReportProbe,
            Control::WireframeMode => SceneCommand::SetPolygonMode(PolygonMode::Line),
            Control::FillMode => SceneCommand::SetPolygonMode(PolygonMode::Fill),
            Control::PointMode => SceneCommand::SetPolygonMode(PolygonMode::Point),
            _ => return None,
        };
        Some(command)
    }
}

/// Backend-agnostic input state, accumulated between frames.
///
/// Held controls repeat every frame. Toggles are edge-triggered and fire
/// once per press. Scroll contributes a single forward or backward step on
/// the next drain.
#[derive(Debug, Clone, Default)]
pub struct ControlState {
    held: [bool; Control::COUNT],
    triggered: Vec<SceneCommand>,
    scroll: f32,
    drag: Vec2,
}

impl ControlState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_held(&mut self, control: Control, held: bool) {
        self.held[control.index()] = held;
    }

    pub fn is_held(&self, control: Control) -> bool {
        self.held[control.index()]
    }

    /// Queue a one-shot command (night toggle, depth-map toggle).
    pub fn trigger(&mut self, command: SceneCommand) {
        tracing::debug!(?command, "command queued");
        self.triggered.push(command);
    }

    /// Positive scrolls forward.
    pub fn scroll(&mut self, delta: f32) {
        self.scroll += delta;
    }

    pub fn drag(&mut self, delta: Vec2) {
        self.drag += delta;
    }

    /// Drag accumulated since the last call, reset to zero.
    pub fn take_drag(&mut self) -> Vec2 {
        std::mem::take(&mut self.drag)
    }

    /// Release everything, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        tracing::debug!("all controls released");
        self.held = [false; Control::COUNT];
    }

    /// Produce this frame's intents and commands and reset the per-frame
    /// accumulators. Held flags persist.
    pub fn drain(&mut self, speed: f32) -> FrameInput {
        let mut input = FrameInput::default();

        let scroll = std::mem::take(&mut self.scroll);
        for control in Control::ALL {
            let Some(direction) = control.movement() else {
                continue;
            };
            let scrolled = match direction {
                MoveDirection::Forward => scroll > 0.0,
                MoveDirection::Backward => scroll < 0.0,
                _ => false,
            };
            if self.is_held(control) || scrolled {
                input.intents.push(Intent::Move { direction, speed });
            }
        }

        for control in Control::ALL {
            if !self.is_held(control) {
                continue;
            }
            if let Some(command) = control.held_command() {
                input.commands.push(command);
            }
        }
        input.commands.append(&mut self.triggered);

        input
    }
}
