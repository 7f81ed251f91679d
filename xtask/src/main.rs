use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for roomview")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run fmt, clippy, tests and the smoke runs
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates
    Clippy,
    /// Run all tests
    Test,
    /// Simulate frames headlessly through roomview-cli
    Smoke {
        /// Frames per run
        #[arg(short, long, default_value = "900")]
        frames: u32,
    },
    /// Build rustdoc for the workspace
    Doc,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            run_fmt()?;
            run_clippy()?;
            run_tests()?;
            run_smoke(900)?;
        }
        Commands::Fmt => run_fmt()?,
        Commands::Clippy => run_clippy()?,
        Commands::Test => run_tests()?,
        Commands::Smoke { frames } => run_smoke(frames)?,
        Commands::Doc => cargo("cargo doc", &["doc", "--workspace", "--no-deps"])?,
    }

    Ok(())
}

fn cargo(step: &str, args: &[&str]) -> Result<()> {
    println!("==> Running {step}");
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("{step} failed");
    }
    Ok(())
}

fn run_fmt() -> Result<()> {
    cargo("cargo fmt --check", &["fmt", "--all", "--", "--check"])
}

fn run_clippy() -> Result<()> {
    cargo(
        "cargo clippy",
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
    )
}

fn run_tests() -> Result<()> {
    cargo("cargo test", &["test", "--workspace"])
}

/// The intro, a full plane flight and the depth-map view must all run
/// without backend diagnostics; roomview-cli exits non-zero otherwise.
fn run_smoke(frames: u32) -> Result<()> {
    let frames = frames.to_string();
    let base = ["run", "-q", "-p", "roomview-cli", "--", "simulate", "--frames", &frames];
    cargo("smoke: intro", &base)?;
    cargo(
        "smoke: plane flight",
        &[&base[..], &["--no-intro", "--launch-plane"][..]].concat(),
    )?;
    cargo(
        "smoke: depth map",
        &[&base[..], &["--no-intro", "--depth-map"][..]].concat(),
    )
}
