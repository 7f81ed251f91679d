//! Scripted animations, each an explicit state machine stepped once per frame.
//!
//! Guards and increments are tuned by hand; change them only together with
//! the layout they were tuned against.

use glam::{Mat4, Vec3};
use roomview_camera::Camera;
use roomview_common::{MoveDirection, scene_rotation};
use serde::Serialize;

use crate::layout::{BALLOON_SCALE, WOODEN_PLANE_SCALE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IntroPhase {
    /// Hold for a few frames, then fly towards the room.
    Approaching,
    /// Turn the room once around.
    Rotating,
    /// Back out to roughly the starting point.
    Retreating,
    Done,
}

/// Opening camera move, run once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct IntroFlythrough {
    phase: IntroPhase,
    counter: u32,
}

impl IntroFlythrough {
    const APPROACH_END: u32 = 50;
    const APPROACH_MOVE_FROM: u32 = 10;
    const RETREAT_END: u32 = 100;
    const FULL_TURN: f32 = 360.0;

    pub fn new() -> Self {
        Self {
            phase: IntroPhase::Approaching,
            counter: 0,
        }
    }

    /// An intro that has already finished.
    pub fn skipped() -> Self {
        Self {
            phase: IntroPhase::Done,
            counter: 0,
        }
    }

    pub fn phase(&self) -> IntroPhase {
        self.phase
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn is_done(&self) -> bool {
        self.phase == IntroPhase::Done
    }

    /// One frame of the intro. A phase whose guard fails hands over to the
    /// next within the same frame, so every frame before `Done` does work.
    pub fn advance(&mut self, camera: &mut Camera, scene_angle: &mut f32, speed: f32) {
        loop {
            match self.phase {
                IntroPhase::Approaching if self.counter <= Self::APPROACH_END => {
                    self.counter += 1;
                    if self.counter >= Self::APPROACH_MOVE_FROM {
                        camera.move_by(MoveDirection::Forward, speed);
                    }
                    return;
                }
                IntroPhase::Approaching => self.enter(IntroPhase::Rotating),
                IntroPhase::Rotating if *scene_angle <= Self::FULL_TURN => {
                    *scene_angle += 1.0;
                    return;
                }
                IntroPhase::Rotating => self.enter(IntroPhase::Retreating),
                IntroPhase::Retreating if self.counter <= Self::RETREAT_END => {
                    self.counter += 1;
                    camera.move_by(MoveDirection::Backward, speed);
                    return;
                }
                IntroPhase::Retreating => self.enter(IntroPhase::Done),
                IntroPhase::Done => return,
            }
        }
    }

    fn enter(&mut self, phase: IntroPhase) {
        tracing::debug!(from = ?self.phase, to = ?phase, "intro phase");
        self.phase = phase;
    }
}

impl Default for IntroFlythrough {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FlightPhase {
    Parked,
    Climbing,
    Banking,
    Circling,
    Descending,
    Landed,
}

/// The wooden plane's take-off, loop around the room and landing.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneFlight {
    phase: FlightPhase,
    position: Vec3,
    /// Degrees about world Y, decreasing as the plane turns.
    heading: f32,
}

impl PlaneFlight {
    pub const START: Vec3 = Vec3::new(-1.55, -0.57, -0.72);
    const BASE_HEADING: f32 = -31.0;

    pub fn new() -> Self {
        Self {
            phase: FlightPhase::Parked,
            position: Self::START,
            heading: 0.0,
        }
    }

    pub fn phase(&self) -> FlightPhase {
        self.phase
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn heading(&self) -> f32 {
        self.heading
    }

    pub fn is_flying(&self) -> bool {
        !matches!(self.phase, FlightPhase::Parked | FlightPhase::Landed)
    }

    /// Start the flight. Ignored unless parked: a landed plane stays down.
    pub fn launch(&mut self) {
        if self.phase == FlightPhase::Parked {
            tracing::info!("wooden plane launched");
            self.phase = FlightPhase::Climbing;
        }
    }

    pub fn advance(&mut self) {
        let p = &mut self.position;
        loop {
            match self.phase {
                FlightPhase::Parked | FlightPhase::Landed => return,
                FlightPhase::Climbing if p.x <= -0.5 && p.y <= 0.11 => {
                    p.x += 0.01;
                    p.y += 0.01;
                    return;
                }
                FlightPhase::Climbing => self.phase = FlightPhase::Banking,
                FlightPhase::Banking if p.x <= -0.130001 && self.heading >= -36.5 => {
                    p.x += 0.01;
                    p.y += 0.005;
                    self.heading -= 0.05;
                    return;
                }
                FlightPhase::Banking => self.phase = FlightPhase::Circling,
                FlightPhase::Circling if self.heading >= -127.1 => {
                    self.heading -= 0.7;
                    p.y += 0.0003;
                    if p.x <= 0.219999 {
                        p.x += 0.001;
                    }
                    return;
                }
                FlightPhase::Circling => self.phase = FlightPhase::Descending,
                FlightPhase::Descending if p.y >= -0.567 => {
                    self.heading -= 0.6;
                    p.y -= 0.0007;
                    return;
                }
                FlightPhase::Descending => {
                    tracing::info!(position = ?*p, heading = self.heading, "wooden plane landed");
                    self.phase = FlightPhase::Landed;
                    return;
                }
            }
        }
    }

    /// `R_y(scene) · R_y(heading) · R_y(-31) · T(position) · S`.
    pub fn model(&self, scene_angle: f32) -> Mat4 {
        scene_rotation(scene_angle)
            * Mat4::from_rotation_y(self.heading.to_radians())
            * Mat4::from_rotation_y(Self::BASE_HEADING.to_radians())
            * Mat4::from_translation(self.position)
            * Mat4::from_scale(Vec3::splat(WOODEN_PLANE_SCALE))
    }
}

impl Default for PlaneFlight {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BobPhase {
    Sinking,
    Rising,
}

/// The balloon's slow up-and-down drift. Never finishes.
#[derive(Debug, Clone, PartialEq)]
pub struct BalloonBob {
    phase: BobPhase,
    offset: f32,
}

impl BalloonBob {
    const STEP: f32 = 0.0001;
    const LOWEST: f32 = -0.02;
    const BASE_HEADING: f32 = -38.5;
    const ANCHOR: Vec3 = Vec3::new(-0.47, 0.0, -1.21);

    pub fn new() -> Self {
        Self {
            phase: BobPhase::Sinking,
            offset: 0.0,
        }
    }

    pub fn phase(&self) -> BobPhase {
        self.phase
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn advance(&mut self) {
        if self.offset >= 0.0 {
            self.phase = BobPhase::Sinking;
        }
        match self.phase {
            BobPhase::Sinking => self.offset -= Self::STEP,
            BobPhase::Rising => self.offset += Self::STEP,
        }
        if self.offset <= Self::LOWEST {
            self.phase = BobPhase::Rising;
        }
    }

    /// `R_y(scene) · R_y(-38.5) · T(anchor + offset) · S`.
    pub fn model(&self, scene_angle: f32) -> Mat4 {
        let anchor = Self::ANCHOR + Vec3::new(0.0, self.offset, 0.0);
        scene_rotation(scene_angle)
            * Mat4::from_rotation_y(Self::BASE_HEADING.to_radians())
            * Mat4::from_translation(anchor)
            * Mat4::from_scale(Vec3::splat(BALLOON_SCALE))
    }
}

impl Default for BalloonBob {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::new(Vec3::new(0.0, 0.0, 3.0), Vec3::new(0.0, 0.0, -10.0), Vec3::Y)
    }

    #[test]
    fn intro_holds_then_approaches() {
        let mut intro = IntroFlythrough::new();
        let mut cam = camera();
        let mut angle = 0.0;
        for _ in 0..9 {
            intro.advance(&mut cam, &mut angle, 0.05);
        }
        assert_eq!(cam.position(), Vec3::new(0.0, 0.0, 3.0));
        intro.advance(&mut cam, &mut angle, 0.05);
        assert!(cam.position().abs_diff_eq(Vec3::new(0.0, 0.0, 2.95), 1e-6));
    }

    #[test]
    fn intro_runs_to_completion_and_returns_near_start() {
        let mut intro = IntroFlythrough::new();
        let mut cam = camera();
        let mut angle = 0.0;
        let mut frames = 0;
        while !intro.is_done() {
            intro.advance(&mut cam, &mut angle, 0.05);
            frames += 1;
            assert!(frames < 1000, "intro never finished");
        }
        // 51 approach frames, 361 rotating frames, 50 retreat frames, and the
        // frame that notices the end.
        assert_eq!(frames, 51 + 361 + 50 + 1);
        assert_eq!(angle, 361.0);
        // 42 steps forward, 50 back.
        let expected_z = 3.0 - 42.0 * 0.05 + 50.0 * 0.05;
        assert!((cam.position().z - expected_z).abs() < 1e-4);

        let before = cam.pose();
        intro.advance(&mut cam, &mut angle, 0.05);
        assert_eq!(cam.pose(), before);
        assert_eq!(angle, 361.0);
    }

    #[test]
    fn skipped_intro_does_nothing() {
        let mut intro = IntroFlythrough::skipped();
        let mut cam = camera();
        let mut angle = 0.0;
        intro.advance(&mut cam, &mut angle, 0.05);
        assert_eq!(cam.position(), Vec3::new(0.0, 0.0, 3.0));
        assert_eq!(angle, 0.0);
    }

    #[test]
    fn parked_plane_does_not_move() {
        let mut plane = PlaneFlight::new();
        for _ in 0..10 {
            plane.advance();
        }
        assert_eq!(plane.phase(), FlightPhase::Parked);
        assert_eq!(plane.position(), PlaneFlight::START);
    }

    #[test]
    fn plane_flies_through_every_phase_and_lands() {
        let mut plane = PlaneFlight::new();
        plane.launch();
        let mut seen = vec![plane.phase()];
        for _ in 0..10_000 {
            plane.advance();
            if seen.last() != Some(&plane.phase()) {
                seen.push(plane.phase());
            }
            if plane.phase() == FlightPhase::Landed {
                break;
            }
        }
        assert_eq!(
            seen,
            vec![
                FlightPhase::Climbing,
                FlightPhase::Banking,
                FlightPhase::Circling,
                FlightPhase::Descending,
                FlightPhase::Landed,
            ]
        );
        assert!(plane.heading() < -127.1);
        assert!(plane.position().y < -0.567);
    }

    #[test]
    fn landed_plane_ignores_launch() {
        let mut plane = PlaneFlight::new();
        plane.launch();
        while plane.phase() != FlightPhase::Landed {
            plane.advance();
        }
        let landed = plane.clone();
        plane.launch();
        plane.advance();
        assert_eq!(plane, landed);
        assert!(!plane.is_flying());
    }

    #[test]
    fn first_climb_step() {
        let mut plane = PlaneFlight::new();
        plane.launch();
        plane.advance();
        assert!(
            plane
                .position()
                .abs_diff_eq(Vec3::new(-1.54, -0.56, -0.72), 1e-6)
        );
        assert_eq!(plane.heading(), 0.0);
    }

    #[test]
    fn parked_plane_model_matches_layout() {
        let plane = PlaneFlight::new();
        let expected = Mat4::from_rotation_y((-31.0f32).to_radians())
            * Mat4::from_translation(PlaneFlight::START)
            * Mat4::from_scale(Vec3::splat(0.22601));
        assert!(plane.model(0.0).abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn balloon_bobs_between_bounds() {
        let mut balloon = BalloonBob::new();
        let mut lowest = 0.0f32;
        let mut rose = false;
        for _ in 0..1000 {
            balloon.advance();
            lowest = lowest.min(balloon.offset());
            rose |= balloon.phase() == BobPhase::Rising;
            assert!(balloon.offset() <= 2e-4 && balloon.offset() >= -0.0202);
        }
        assert!(rose);
        assert!(lowest <= -0.02);
    }

    #[test]
    fn balloon_sinks_first() {
        let mut balloon = BalloonBob::new();
        balloon.advance();
        assert_eq!(balloon.phase(), BobPhase::Sinking);
        assert!((balloon.offset() + 0.0001).abs() < 1e-7);
    }
}
