use std::path::PathBuf;

use clap::{Parser, Subcommand};
use roomview_input::{FrameInput, SceneCommand};
use roomview_render::{DirectionalLight, RecordingBackend};
use roomview_scene::{DRAW_ORDER, DrawSlot, MESH_CATALOG, SceneDriver, ViewerConfig};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "roomview-cli", about = "Headless tools for the room viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON viewer configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version, catalog size and shadow settings
    Info,
    /// List every drawn object with its model transform
    Placements {
        /// Scene rotation in degrees
        #[arg(short, long, default_value = "0")]
        angle: f32,
    },
    /// Print the directional light's light-space matrix
    LightSpace,
    /// Run frames against the recording backend and report
    Simulate {
        /// Number of frames to run
        #[arg(short, long, default_value = "60")]
        frames: u64,
        /// Launch the wooden plane on the first frame
        #[arg(long)]
        launch_plane: bool,
        /// Show the depth map instead of the lit scene
        #[arg(long)]
        depth_map: bool,
        /// Skip the opening fly-through
        #[arg(long)]
        no_intro: bool,
        /// Print a JSON summary instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Serialize)]
struct SimulationSummary {
    frames: u64,
    draws: usize,
    diagnostics: Vec<String>,
    camera_position: glam::Vec3,
    scene_angle: f32,
    intro_done: bool,
    plane_position: glam::Vec3,
    plane_heading: f32,
}

fn simulate(
    config: &ViewerConfig,
    frames: u64,
    launch_plane: bool,
    depth_map: bool,
) -> anyhow::Result<SimulationSummary> {
    let mut backend =
        RecordingBackend::new().with_meshes(MESH_CATALOG.iter().map(|asset| asset.handle));
    let mut driver = SceneDriver::new(&mut backend, config)?;
    tracing::info!(frames, launch_plane, depth_map, "simulating");

    let mut draws = 0;
    let mut diagnostics = Vec::new();
    for frame in 0..frames {
        let mut input = FrameInput::default();
        if frame == 0 {
            if launch_plane {
                input.commands.push(SceneCommand::LaunchPlane);
            }
            if depth_map {
                input.commands.push(SceneCommand::ToggleDepthMap);
            }
        }
        let report = driver.frame(&mut backend, input);
        draws += report.draws;
        diagnostics.extend(report.diagnostics);
        // Recorded history is only needed for the current frame.
        backend.clear_history();
    }

    Ok(SimulationSummary {
        frames,
        draws,
        diagnostics,
        camera_position: driver.camera().position(),
        scene_angle: driver.state().scene_angle,
        intro_done: driver.intro().is_done(),
        plane_position: driver.plane().position(),
        plane_heading: driver.plane().heading(),
    })
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let mut config = match &cli.config {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            ViewerConfig::load(path)?
        }
        None => ViewerConfig::default(),
    };

    match cli.command {
        Commands::Info => {
            println!("roomview-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("meshes: {}", MESH_CATALOG.len());
            println!("draw slots: {}", DRAW_ORDER.len());
            println!("shadow map: {0}x{0}", config.shadow_map_size);
            let light = DirectionalLight::default();
            println!("light: direction={} color={}", light.direction, light.color);
            println!("assets: {}", config.asset_root.display());
        }
        Commands::Placements { angle } => {
            for (i, slot) in DRAW_ORDER.iter().enumerate() {
                let placement = match slot {
                    DrawSlot::Fixed(object) => {
                        let origin = object.placement.model(angle).w_axis.truncate();
                        format!("origin=({:.3}, {:.3}, {:.3})", origin.x, origin.y, origin.z)
                    }
                    DrawSlot::WoodenPlane | DrawSlot::Balloon => "animated".to_string(),
                };
                println!(
                    "{i:2} {:<14} mesh={:<2} {placement}",
                    slot.name(),
                    slot.mesh().0
                );
            }
        }
        Commands::LightSpace => {
            let m = DirectionalLight::default().light_space();
            for row in 0..4 {
                let r = m.row(row);
                println!("[{:>9.5} {:>9.5} {:>9.5} {:>9.5}]", r.x, r.y, r.z, r.w);
            }
        }
        Commands::Simulate {
            frames,
            launch_plane,
            depth_map,
            no_intro,
            json,
        } => {
            if no_intro {
                config.intro = false;
            }
            let summary = simulate(&config, frames, launch_plane, depth_map)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("frames: {}  draws: {}", summary.frames, summary.draws);
                println!(
                    "camera: {}  scene angle: {:.1}  intro done: {}",
                    summary.camera_position, summary.scene_angle, summary.intro_done
                );
                println!(
                    "plane: {} heading {:.1}",
                    summary.plane_position, summary.plane_heading
                );
                println!("diagnostics: {}", summary.diagnostics.len());
                for message in &summary.diagnostics {
                    println!("  {message}");
                }
            }
            if !summary.diagnostics.is_empty() {
                tracing::error!(
                    count = summary.diagnostics.len(),
                    "simulation reported diagnostics"
                );
                anyhow::bail!("{} backend diagnostics", summary.diagnostics.len());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> ViewerConfig {
        ViewerConfig {
            intro: false,
            ..ViewerConfig::default()
        }
    }

    #[test]
    fn simulation_is_clean() {
        let summary = simulate(&quiet(), 10, false, false).unwrap();
        assert_eq!(summary.frames, 10);
        assert_eq!(summary.draws, 10 * (28 + 28 + 1));
        assert!(summary.diagnostics.is_empty(), "{:?}", summary.diagnostics);
    }

    #[test]
    fn launched_plane_moves() {
        let summary = simulate(&quiet(), 5, true, false).unwrap();
        assert!(summary.plane_position.x > -1.55);
    }

    #[test]
    fn depth_map_run_skips_lit_draws() {
        let summary = simulate(&quiet(), 3, false, true).unwrap();
        assert_eq!(summary.draws, 3 * (28 + 1));
        assert!(summary.diagnostics.is_empty(), "{:?}", summary.diagnostics);
    }
}
