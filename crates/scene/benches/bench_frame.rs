use std::hint::black_box;
use std::time::Instant;

use roomview_input::{FrameInput, Intent, SceneCommand};
use roomview_render::RecordingBackend;
use roomview_scene::{MESH_CATALOG, SceneDriver, ViewerConfig};

fn backend() -> RecordingBackend {
    RecordingBackend::new().with_meshes(MESH_CATALOG.iter().map(|asset| asset.handle))
}

fn bench_frames(label: &str, config: &ViewerConfig, first: FrameInput, frames: usize) {
    let mut backend = backend();
    let Ok(mut driver) = SceneDriver::new(&mut backend, config) else {
        println!("  {label}: shadow map allocation failed");
        return;
    };

    let start = Instant::now();
    let mut input = Some(first);
    for _ in 0..frames {
        let report = driver.frame(&mut backend, input.take().unwrap_or_default());
        black_box(report);
        backend.clear_history();
    }
    let elapsed = start.elapsed();
    let per_frame = elapsed / frames as u32;
    println!("  {label} ({frames} frames): {per_frame:?}/frame, total {elapsed:?}");
}

fn bench_object_draws(iterations: usize) {
    let mut backend = backend();
    let Ok(driver) = SceneDriver::new(&mut backend, &ViewerConfig::default()) else {
        return;
    };

    let start = Instant::now();
    for _ in 0..iterations {
        black_box(driver.object_draws());
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  object_draws ({iterations} iters): {per_iter:?}/iter, total {elapsed:?}");
}

fn main() {
    println!("=== Scene Frame Benchmarks ===\n");

    let quiet = ViewerConfig {
        intro: false,
        ..ViewerConfig::default()
    };

    println!("Frame loop (recording backend):");
    bench_frames("intro", &ViewerConfig::default(), FrameInput::default(), 500);
    bench_frames(
        "plane flight",
        &quiet,
        FrameInput {
            intents: Vec::new(),
            commands: vec![SceneCommand::LaunchPlane],
        },
        1000,
    );
    bench_frames(
        "depth map",
        &quiet,
        FrameInput {
            intents: Vec::new(),
            commands: vec![SceneCommand::ToggleDepthMap],
        },
        1000,
    );
    bench_frames(
        "look around",
        &quiet,
        FrameInput {
            intents: vec![Intent::Rotate {
                pitch: 10.0,
                yaw: -60.0,
            }],
            commands: Vec::new(),
        },
        1000,
    );

    println!("\nPlacement transforms:");
    bench_object_draws(10_000);

    println!("\n=== Done ===");
}
