//=====================================================
// File: bin/lsvm.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Developer front end for the LumaScript machine
// Objective: Run a linked JSON program against simulated lights, or print
//            its listing
//=====================================================

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lumascript::clock::SystemClock;
use lumascript::device::Light;
use lumascript::fakes::FakeLightSet;
use lumascript::{logging, Loader, Machine, Program, RawProgram, VmConfig};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "LumaScript virtual machine", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Drop redundant register stores while linking
    #[arg(short = 'O', long, global = true)]
    optimize: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a program against a simulated light set
    Run {
        /// Program file produced by the compiler
        program: PathBuf,
        /// Number of simulated lights (overrides the configuration)
        #[arg(long)]
        lights: Option<usize>,
    },
    /// Print the linked instruction listing
    Disasm {
        /// Program file produced by the compiler
        program: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => VmConfig::load(path)?,
        None => VmConfig::load_or_default()?,
    };
    logging::init(&config);

    match cli.command {
        Command::Run { program, lights } => {
            let linked = link(&program, cli.optimize)?;
            let count = lights.unwrap_or(config.fake_lights);
            let light_set = Arc::new(FakeLightSet::with_lights(count));
            let mut machine = Machine::new(SystemClock::new(), light_set.clone()).with_config(config);
            info!(
                target: "lumascript::vm",
                "running {} ({} instructions, {count} simulated lights)",
                program.display(),
                linked.len()
            );
            machine
                .run(&linked)
                .with_context(|| format!("running {}", program.display()))?;
            for light in light_set.lights() {
                println!("{:<12} color {:?} power {}", light.label(), light.color(), light.power());
            }
        }
        Command::Disasm { program } => {
            let linked = link(&program, cli.optimize)?;
            print!("{linked}");
        }
    }

    Ok(())
}

fn link(path: &Path, optimize: bool) -> Result<Program> {
    let data = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let raw: RawProgram =
        serde_json::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))?;
    let program = Loader::new()
        .with_peephole(optimize)
        .load_raw(raw)
        .with_context(|| format!("failed to link {}", path.display()))?;
    Ok(program)
}

//=====================================================
// End of file
//=====================================================
