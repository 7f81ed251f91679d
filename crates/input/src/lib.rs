//! Input decoding: held controls, scroll and drag mapped to camera intents
//! and scene commands.
//!
//! # Invariants
//! - Nothing here touches device events directly; backends call
//!   [`ControlState`] with already-mapped [`Control`] values.
//! - Held controls repeat every frame, toggles fire once per press.

pub mod controls;
pub mod intent;
pub mod look;

pub use controls::{Control, ControlState, PROBE_STEP};
pub use intent::{FrameInput, Intent, SceneCommand};
pub use look::{LookAccumulator, PITCH_LIMIT};
