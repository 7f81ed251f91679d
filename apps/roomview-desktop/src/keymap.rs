use roomview_input::{Control, SceneCommand};
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

/// Keys that act for as long as they are held.
pub fn held_control(key: KeyCode) -> Option<Control> {
    let control = match key {
        KeyCode::KeyW => Control::MoveForward,
        KeyCode::KeyS => Control::MoveBackward,
        KeyCode::KeyA => Control::MoveLeft,
        KeyCode::KeyD => Control::MoveRight,
        KeyCode::KeyT => Control::MoveUp,
        KeyCode::KeyG => Control::MoveDown,
        KeyCode::KeyQ => Control::SpinLeft,
        KeyCode::KeyE => Control::SpinRight,
        KeyCode::KeyV => Control::NudgeSpinLeft,
        KeyCode::KeyB => Control::NudgeSpinRight,
        KeyCode::KeyZ => Control::LaunchPlane,
        KeyCode::KeyI => Control::ProbeNear,
        KeyCode::KeyY => Control::ProbeFar,
        KeyCode::KeyK => Control::ProbeRight,
        KeyCode::KeyH => Control::ProbeLeft,
        KeyCode::KeyU => Control::ProbeUp,
        KeyCode::KeyJ => Control::ProbeDown,
        KeyCode::KeyN => Control::ProbeGrow,
        KeyCode::KeyM => Control::ProbeShrink,
        KeyCode::Enter => Control::ReportProbe,
        KeyCode::KeyL => Control::WireframeMode,
        KeyCode::KeyF => Control::FillMode,
        KeyCode::KeyP => Control::PointMode,
        _ => return None,
    };
    Some(control)
}

/// Keys that fire once per press.
pub fn pressed_command(key: KeyCode) -> Option<SceneCommand> {
    match key {
        KeyCode::KeyX => Some(SceneCommand::ToggleNight),
        KeyCode::KeyC => Some(SceneCommand::ToggleDepthMap),
        _ => None,
    }
}

pub fn button_control(button: MouseButton) -> Option<Control> {
    match button {
        MouseButton::Left => Some(Control::SpinLeft),
        MouseButton::Right => Some(Control::SpinRight),
        _ => None,
    }
}

/// Middle button held turns mouse motion into camera look.
pub fn is_look_button(button: MouseButton) -> bool {
    button == MouseButton::Middle
}

pub const HELP: &str = "WASD/TG move · scroll forward/back · middle-drag look\n\
Q/E or LMB/RMB spin room · V/B fine spin · Z launch plane\n\
X night · C depth map · L/F/P line/fill/point · F1 overlay";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggles_are_not_held_controls() {
        assert!(held_control(KeyCode::KeyX).is_none());
        assert!(held_control(KeyCode::KeyC).is_none());
        assert_eq!(pressed_command(KeyCode::KeyX), Some(SceneCommand::ToggleNight));
    }

    #[test]
    fn no_key_maps_to_two_controls() {
        let keys = [
            KeyCode::KeyW,
            KeyCode::KeyS,
            KeyCode::KeyA,
            KeyCode::KeyD,
            KeyCode::KeyT,
            KeyCode::KeyG,
            KeyCode::KeyQ,
            KeyCode::KeyE,
            KeyCode::KeyV,
            KeyCode::KeyB,
            KeyCode::KeyZ,
            KeyCode::KeyI,
            KeyCode::KeyY,
            KeyCode::KeyK,
            KeyCode::KeyH,
            KeyCode::KeyU,
            KeyCode::KeyJ,
            KeyCode::KeyN,
            KeyCode::KeyM,
            KeyCode::Enter,
            KeyCode::KeyL,
            KeyCode::KeyF,
            KeyCode::KeyP,
        ];
        let mapped: std::collections::HashSet<_> =
            keys.iter().filter_map(|k| held_control(*k)).collect();
        assert_eq!(mapped.len(), Control::COUNT);
    }

    #[test]
    fn mouse_buttons_spin_the_room() {
        assert_eq!(button_control(MouseButton::Left), Some(Control::SpinLeft));
        assert_eq!(button_control(MouseButton::Right), Some(Control::SpinRight));
        assert!(button_control(MouseButton::Middle).is_none());
        assert!(is_look_button(MouseButton::Middle));
    }
}
