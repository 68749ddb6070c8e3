use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Once;

static TRACE_INIT: Once = Once::new();
const DEFAULT_TRACE_FILTER: &str = "pvm::vm=debug,pvm::program=debug,pvm::memory=warn,pvm::arena=warn,pvm::cli=info";

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use pvm_core::api::RunConfig;
use pvm_core::program::Program;
use pvm_core::program::build::wrap_as_program;
use pvm_core::program::spi::SpiProgram;
use tracing::info;

mod disasm;
mod fixture;

use fixture::Fixture;

#[derive(Debug, Parser)]
#[command(name = "pvm", author, version, about = "CLI for the PVM interpreter", long_about = None)]
struct CliArgs {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run conformance fixtures and compare the final state with their expectations.
    Run {
        /// Log the registers before every step (enables tracing when PVM_TRACE is unset)
        #[arg(long)]
        debug: bool,
        /// TOML file holding a run configuration
        #[arg(long, value_name = "FILE", value_parser = parse_sanitized_path)]
        config: Option<PathBuf>,
        /// Stop each run after this many steps
        #[arg(long, value_name = "N")]
        max_steps: Option<u64>,
        /// Pages preallocated for each run's memory
        #[arg(long, value_name = "N")]
        arena_pages: Option<u32>,
        #[arg(value_name = "FIXTURE", required = true, value_parser = parse_sanitized_path)]
        fixtures: Vec<PathBuf>,
    },
    /// Disassemble program containers.
    Disasm {
        /// Inputs are SPI files rather than bare containers
        #[arg(long)]
        spi: bool,
        #[arg(value_name = "FILE", required = true, value_parser = parse_sanitized_path)]
        files: Vec<PathBuf>,
    },
    /// Wrap raw code into a program container with a rebuilt mask.
    Wrap {
        #[arg(value_name = "CODE", value_parser = parse_sanitized_path)]
        code: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(short, long, value_name = "FILE", value_parser = parse_sanitized_path)]
        output: Option<PathBuf>,
    },
}

fn read_file_bytes(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| anyhow::anyhow!("Failed to read file '{}': {}", path.display(), e))
}

fn sanitize_path(raw: &str) -> anyhow::Result<PathBuf> {
    let p = Path::new(raw);

    for comp in p.components() {
        if matches!(comp, Component::ParentDir) {
            return Err(anyhow::anyhow!(
                "Parent directory components ('..') are not allowed in file paths."
            ));
        }
    }

    Ok(p.to_path_buf())
}

fn parse_sanitized_path(raw: &str) -> Result<PathBuf, String> {
    sanitize_path(raw).map_err(|e| e.to_string())
}

fn env_toggle_enabled(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return false;
    }
    !(trimmed.eq_ignore_ascii_case("0") || trimmed.eq_ignore_ascii_case("false") || trimmed.eq_ignore_ascii_case("off"))
}

fn filter_expr_from(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("1")
        || trimmed.eq_ignore_ascii_case("true")
        || trimmed.eq_ignore_ascii_case("on")
    {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Install a stderr subscriber when `PVM_TRACE` is on, or when `force` is set.
fn maybe_init_tracing(force: bool) {
    let raw = std::env::var("PVM_TRACE").ok().filter(|value| env_toggle_enabled(value));
    if raw.is_none() && !force {
        return;
    }

    TRACE_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        use tracing_subscriber::fmt;

        let filter_expr = raw
            .as_deref()
            .and_then(filter_expr_from)
            .or_else(|| std::env::var("RUST_LOG").ok());

        let builder = fmt().with_writer(std::io::stderr);

        let builder = match filter_expr.and_then(|expr| EnvFilter::try_new(expr).ok()) {
            Some(filter) => builder.with_env_filter(filter),
            None => builder.with_env_filter(DEFAULT_TRACE_FILTER),
        };

        let _ = builder.try_init();
    });
}

/// File values first, then flags.
fn load_run_config(
    path: Option<&Path>,
    max_steps: Option<u64>,
    arena_pages: Option<u32>,
    debug: bool,
) -> anyhow::Result<RunConfig> {
    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config '{}'", path.display()))?;
            toml::from_str(&raw).with_context(|| format!("Invalid config '{}'", path.display()))?
        }
        None => RunConfig::default(),
    };
    if max_steps.is_some() {
        config.max_steps = max_steps;
    }
    if let Some(pages) = arena_pages {
        config.memory.arena_pages = pages;
    }
    config.trace_steps |= debug;
    Ok(config)
}

fn run_fixtures(paths: &[PathBuf], config: &RunConfig) -> anyhow::Result<()> {
    let mut failed = 0usize;
    for path in paths {
        let result = Fixture::load(path).and_then(|fixture| fixture.check(config));
        match result {
            Ok(mismatches) if mismatches.is_empty() => println!("PASS {}", path.display()),
            Ok(mismatches) => {
                failed += 1;
                println!("FAIL {}", path.display());
                for line in mismatches {
                    println!("    {line}");
                }
            }
            Err(err) => {
                failed += 1;
                println!("ERROR {}: {err:#}", path.display());
            }
        }
    }

    let passed = paths.len() - failed;
    println!("{passed} passed, {failed} failed");
    info!(target: "pvm::cli", passed, failed, "fixtures done");
    if failed > 0 {
        bail!("{failed} of {} fixtures failed", paths.len());
    }
    Ok(())
}

fn disassemble_files(paths: &[PathBuf], spi: bool) -> anyhow::Result<()> {
    for path in paths {
        let raw = read_file_bytes(path)?;
        let text = if spi {
            let container = SpiProgram::decode(&raw).with_context(|| format!("Invalid SPI file '{}'", path.display()))?;
            disasm::disassemble_spi(&container)?
        } else {
            let program = Program::decode(&raw).with_context(|| format!("Invalid program '{}'", path.display()))?;
            disasm::disassemble(&program)
        };
        if paths.len() > 1 {
            println!("{}:", path.display());
        }
        print!("{text}");
    }
    Ok(())
}

fn wrap_file(code: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let raw = read_file_bytes(code)?;
    let container = wrap_as_program(&raw);
    match output {
        Some(out) => std::fs::write(out, &container)
            .with_context(|| format!("Failed to write '{}'", out.display()))?,
        None => std::io::stdout().write_all(&container)?,
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let CliArgs { command } = CliArgs::parse();

    match command {
        Commands::Run {
            debug,
            config,
            max_steps,
            arena_pages,
            fixtures,
        } => {
            maybe_init_tracing(debug);
            let config = load_run_config(config.as_deref(), max_steps, arena_pages, debug)?;
            run_fixtures(&fixtures, &config)
        }
        Commands::Disasm { spi, files } => {
            maybe_init_tracing(false);
            disassemble_files(&files, spi)
        }
        Commands::Wrap { code, output } => {
            maybe_init_tracing(false);
            wrap_file(&code, output.as_deref())
        }
    }
}
