use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use clothsim::io::{self, WriterRegistry};
use clothsim::topology::count_by_kind;
use clothsim::{ClothConfig, ClothState, Simulation};

/// Headless mass-spring cloth simulation.
#[derive(Parser)]
#[command(name = "clothsim")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log per-frame details (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a number of frames and export the final mesh
    Run {
        /// Configuration file (.yaml, .yml or .json); defaults when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Frames to simulate
        #[arg(short, long, default_value = "120")]
        frames: u32,

        /// Frame time step in seconds; the configured one when omitted
        #[arg(long)]
        dt: Option<f32>,

        /// Mesh output file
        #[arg(short, long, default_value = "cloth.obj")]
        output: PathBuf,

        /// Output format; inferred from the output extension when omitted
        #[arg(long)]
        format: Option<String>,
    },
    /// Write the default configuration
    Init {
        /// Configuration file to create (.yaml, .yml or .json)
        #[arg(short, long, default_value = "cloth.yaml")]
        output: PathBuf,
    },
    /// Describe the grid a configuration builds
    Topology {
        /// Configuration file (.yaml, .yml or .json); defaults when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_config(path: Option<&Path>) -> anyhow::Result<ClothConfig> {
    match path {
        Some(path) => io::load_config(path)
            .with_context(|| format!("failed to load configuration {}", path.display())),
        None => Ok(ClothConfig::default()),
    }
}

fn run(
    config: ClothConfig,
    frames: u32,
    dt: Option<f32>,
    output: &Path,
    format: Option<&str>,
) -> anyhow::Result<()> {
    let registry = WriterRegistry::with_defaults();
    let writer = match format {
        Some(id) => registry.writer_for_format(id).with_context(|| {
            format!(
                "unknown output format '{id}' (available: {})",
                registry.formats().join(", ")
            )
        })?,
        None => registry.writer_for_path(output)?,
    };

    let mut sim = Simulation::new(config)?;
    sim.startup()?;
    let dt = dt.unwrap_or(sim.active_config().time_step);
    for _ in 0..frames {
        sim.update(dt)?;
    }
    if let Some(report) = sim.last_report() {
        info!(
            frames,
            kinetic = report.kinetic_energy,
            potential = report.potential_energy,
            "simulation finished"
        );
    }

    writer.write(&sim.mesh()?.to_snapshot(), output)?;
    sim.shutdown()?;
    println!(
        "Simulated {frames} frames, wrote {} mesh to {}",
        writer.format_id(),
        output.display()
    );
    Ok(())
}

fn init(output: &Path) -> anyhow::Result<()> {
    io::save_config(output, &ClothConfig::default())?;
    println!("Wrote default configuration to {}", output.display());
    Ok(())
}

/// Human-readable description of the cloth `config` builds
fn topology_summary(config: &ClothConfig) -> anyhow::Result<String> {
    let state = ClothState::build(config)?;
    let (cols, rows) = state.grid_size();
    let spacing = state.spacing();
    let mut out = String::new();
    writeln!(out, "grid: {cols} x {rows} ({} points)", state.point_count())?;
    writeln!(out, "rest spacing: {} x {}", spacing.x, spacing.y)?;
    writeln!(out, "springs: {}", state.springs().len())?;
    for (kind, count) in count_by_kind(state.springs()) {
        writeln!(out, "  {}: {count}", kind.as_str())?;
    }
    let pinned: Vec<String> = state.pinned().iter().map(ToString::to_string).collect();
    writeln!(out, "pinned: {}", pinned.join(" "))?;
    writeln!(out, "triangles: {}", state.mesh().triangle_count())?;
    writeln!(out, "max stable step: {:.6} s", config.max_stable_step())?;
    Ok(out)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            frames,
            dt,
            output,
            format,
        } => {
            let config = read_config(config.as_deref())?;
            run(config, frames, dt, &output, format.as_deref())?;
        }
        Commands::Init { output } => {
            init(&output)?;
        }
        Commands::Topology { config } => {
            let config = read_config(config.as_deref())?;
            print!("{}", topology_summary(&config)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clothsim::PinMode;

    #[test]
    fn cli_parses_run_with_defaults() {
        let cli = Cli::try_parse_from(["clothsim", "run"]).unwrap();
        assert!(!cli.verbose);
        match cli.command {
            Commands::Run {
                config,
                frames,
                dt,
                output,
                format,
            } => {
                assert!(config.is_none());
                assert_eq!(frames, 120);
                assert!(dt.is_none());
                assert_eq!(output, PathBuf::from("cloth.obj"));
                assert!(format.is_none());
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn cli_parses_run_options() {
        let cli = Cli::try_parse_from([
            "clothsim", "run", "--config", "c.yaml", "--frames", "10", "--dt", "0.005",
            "--output", "out.json", "--format", "json", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Run {
                config,
                frames,
                dt,
                format,
                ..
            } => {
                assert_eq!(config, Some(PathBuf::from("c.yaml")));
                assert_eq!(frames, 10);
                assert_eq!(dt, Some(0.005));
                assert_eq!(format.as_deref(), Some("json"));
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn cli_parses_init_subcommand() {
        let cli = Cli::try_parse_from(["clothsim", "init", "--output", "my.json"]).unwrap();
        match cli.command {
            Commands::Init { output } => assert_eq!(output, PathBuf::from("my.json")),
            _ => panic!("Expected Init command"),
        }
    }

    #[test]
    fn cli_requires_a_subcommand() {
        assert!(Cli::try_parse_from(["clothsim"]).is_err());
    }

    #[test]
    fn topology_summary_for_small_grid() {
        let config = ClothConfig::default()
            .with_grid(3, 3)
            .with_spacing(0.5)
            .with_pinning(PinMode::TopRow);
        insta::assert_snapshot!(topology_summary(&config).unwrap(), @r"
        grid: 3 x 3 (9 points)
        rest spacing: 0.5 x 0.5
        springs: 26
          structural: 12
          shear: 8
          flexion: 6
        pinned: #0 #1 #2
        triangles: 8
        max stable step: 0.015708 s
        ");
    }
}
