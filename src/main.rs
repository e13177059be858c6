//! FPGA fleet CLI - enable, disable and program USB-attached FPGA boards.
//!
//! Provides both human-friendly and agent-friendly (robot mode) interfaces.
#![forbid(unsafe_code)]

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;
use tracing::{debug, info, warn};

use fleet::cli::{self, Cli, Commands};
use fleet::config::{self, FleetConfig};
use fleet::controller::{Action, Controller, Fleet, Outcome};
use fleet::device::{CommandSource, Registry};
use fleet::error::{FleetError, Result};
use fleet::logging::init_logging;
use fleet::output::{self, Output, OutputMode, RenderMode, ToolchainInfo, VersionInfo};
use fleet::plan::Plan;
use fleet::sequencer::{ProcessScriptRunner, RestorePolicy};
use fleet::toolchain::{discover_installation, Session};

/// Build information embedded at compile time.
mod build_info {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    pub fn git_sha() -> &'static str {
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown")
    }

    pub fn git_dirty() -> &'static str {
        option_env!("VERGEN_GIT_DIRTY").unwrap_or("false")
    }

    pub fn build_timestamp() -> &'static str {
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown")
    }

    pub fn rustc_semver() -> &'static str {
        option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown")
    }

    pub fn target() -> &'static str {
        option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown")
    }
}

/// Exit status of a cancelled run (as after SIGINT).
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.use_json(), cli.verbose, cli.quiet);
    let out = OutputMode::from_cli(&cli).into_output();

    match run(&cli, out.as_ref()).await {
        Ok(code) => code,
        Err(e) => {
            out.error(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, out: &dyn Output) -> Result<ExitCode> {
    let Some(command) = &cli.command else {
        print_quick_start(cli);
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Version => cmd_version(out),
        Commands::Completions(args) => cmd_completions(args),
        Commands::Config(args) => cmd_config(cli, args, out),
        Commands::ShowToolchain => cmd_toolchain(cli, out),
        Commands::List(args) => cmd_list(cli, args, out),
        Commands::Watch(args) => cmd_watch(cli, args, out).await,
        Commands::EnableAll => cmd_run(cli, out, Action::EnableAll, Plan::new()).await,
        Commands::DisableAll => cmd_run(cli, out, Action::DisableAll, Plan::new()).await,
        Commands::Toggle(args) => cmd_run(cli, out, Action::Toggle(args.index()), Plan::new()).await,
        Commands::EnableOnly(args) => {
            cmd_run(cli, out, Action::EnableOnly(args.index()), Plan::new()).await
        }
        Commands::Program(args) => {
            cmd_run(cli, out, Action::Program(args.board.index()), args.plan.to_plan()).await
        }
        Commands::ProgramAll(args) => cmd_run(cli, out, Action::ProgramAll, args.to_plan()).await,
    }
}

// === Quick Start ===

fn print_quick_start(cli: &Cli) {
    if cli.use_json() {
        let help = RobotQuickStart {
            tool: "fleet",
            version: build_info::VERSION,
            description: "Enable, disable and program USB-attached FPGA boards",
            boards: RobotBoards {
                list: "fleet list --robot",
                enable_all: "fleet enable-all --robot",
                disable_all: "fleet disable-all --robot",
                toggle: "fleet toggle <BOARD> --robot",
                enable_only: "fleet enable-only <BOARD> --robot",
            },
            programming: RobotProgramming {
                program: "fleet program <BOARD> --bitstream <FILE> --robot",
                program_all: "fleet program-all --step image=<FILE> --step pause --robot",
                toolchain: "fleet toolchain --robot",
            },
            notes: "Boards are numbered from 1 as listed. Pauses wait for a line on stdin.",
        };
        if let Ok(json) = serde_json::to_string_pretty(&help) {
            println!("{json}");
        }
        return;
    }

    let green = |s: &str| console::style(s.to_string()).green();
    println!(
        "{} {} - FPGA board fleet\n",
        console::style("fleet").bold().cyan(),
        build_info::VERSION
    );
    println!("{}", console::style("QUICK START").bold().underlined());
    println!();
    println!("  {}  List boards", green("fleet list"));
    println!("  {}  Enable every board", green("fleet enable-all"));
    println!("  {}  Flip board 2", green("fleet toggle 2"));
    println!("  {}  Leave only board 1 enabled", green("fleet enable-only 1"));
    println!("  {}  Program board 1", green("fleet program 1 --bitstream top.bit"));
    println!(
        "  {}  Program every board",
        green("fleet program-all --pre-script reset.bat --bitstream top.bit")
    );
    println!();
    println!("{}", console::style("ROBOT MODE").bold().underlined());
    println!();
    println!("  {}  JSON output", console::style("fleet --robot <command>").cyan());
    println!();
    println!("Run {} for full help", console::style("fleet --help").yellow());
}

#[derive(Serialize)]
struct RobotQuickStart {
    tool: &'static str,
    version: &'static str,
    description: &'static str,
    boards: RobotBoards,
    programming: RobotProgramming,
    notes: &'static str,
}

#[derive(Serialize)]
struct RobotBoards {
    list: &'static str,
    enable_all: &'static str,
    disable_all: &'static str,
    toggle: &'static str,
    enable_only: &'static str,
}

#[derive(Serialize)]
struct RobotProgramming {
    program: &'static str,
    program_all: &'static str,
    toolchain: &'static str,
}

// === Setup ===

/// Load the config file and apply command-line overrides.
fn effective_config(cli: &Cli) -> Result<(FleetConfig, Option<PathBuf>)> {
    let (mut config, path) = config::load_config(cli.config.as_deref())?;
    if let Some(description) = &cli.description {
        debug!(%description, "Device description overridden");
        config.device_description.clone_from(description);
    }
    if let Some(pattern) = &cli.toolchain_glob {
        debug!(%pattern, "Toolchain pattern overridden");
        config.toolchain.path_pattern.clone_from(pattern);
    }
    config.validate()?;
    Ok((config, path))
}

fn open_registry(config: &FleetConfig) -> Result<Registry> {
    let mut registry = Registry::new(Box::new(CommandSource::new(config)), config);
    registry.refresh()?;
    info!(boards = registry.len(), "Boards enumerated");
    Ok(registry)
}

// === Command Implementations ===

fn cmd_list(cli: &Cli, args: &cli::ListArgs, out: &dyn Output) -> Result<ExitCode> {
    let (config, _) = effective_config(cli)?;
    let registry = open_registry(&config)?;
    out.board_list(registry.devices(), args.long);
    Ok(ExitCode::SUCCESS)
}

async fn cmd_watch(cli: &Cli, args: &cli::WatchArgs, out: &dyn Output) -> Result<ExitCode> {
    let (config, _) = effective_config(cli)?;
    let interval = args
        .interval
        .map_or_else(|| config.refresh_interval(), Duration::from_millis);
    let mut registry = Registry::new(Box::new(CommandSource::new(&config)), &config);

    if !cli.quiet && !cli.use_json() {
        out.info("Watching boards (Ctrl+C to stop)...");
    }

    let mut listings = 0u64;
    loop {
        match registry.refresh() {
            Ok(()) => out.board_list(registry.devices(), false),
            // Keep watching; the previous set stays valid
            Err(err) => warn!(error = %err, "Refresh failed"),
        }
        listings += 1;
        if args.count != 0 && listings >= args.count {
            break;
        }
        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                debug!("Watch interrupted");
                break;
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn cmd_run(cli: &Cli, out: &dyn Output, action: Action, plan: Plan) -> Result<ExitCode> {
    let (config, _) = effective_config(cli)?;
    let registry = open_registry(&config)?;
    let mut session = Session::new(&config.toolchain);

    if action.uses_plan() {
        if plan.is_empty() {
            out.warning("Empty plan: boards are only isolated and restored");
        }
        if plan.has_image() {
            if !session.is_available() {
                out.warning(&format!(
                    "No Vivado installation matches '{}', bitstream steps will be skipped",
                    config.toolchain.path_pattern
                ));
            } else if config.toolchain.preload {
                session.preload();
            }
        }
    }

    let fleet = Fleet::new(registry, session, Box::new(ProcessScriptRunner)).with_policy(
        RestorePolicy {
            restore_on_failure: config.restore_on_failure,
        },
    );
    let mut controller = Controller::new(fleet);
    let handle = controller.start(action, &plan)?;

    // First Ctrl-C cancels at the next step, the second one exits.
    let cancel = handle.cancel_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Cancelling after the current step, press Ctrl-C again to exit");
            cancel.cancel();
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(i32::from(EXIT_CANCELLED));
            }
        }
    });

    let mode = if cli.use_json() {
        RenderMode::Json
    } else if cli.quiet {
        RenderMode::Silent
    } else {
        RenderMode::Bar
    };
    let handle = tokio::task::spawn_blocking(move || output::render_run(handle, mode))
        .await
        .map_err(|e| FleetError::Other(format!("progress renderer failed: {e}")))?;
    let report = controller.finish(handle)?;
    interrupt.abort();

    if let Some(mut fleet) = controller.into_fleet() {
        fleet.session.close();
    }

    out.run_report(&report);
    Ok(match report.outcome {
        Outcome::Completed => ExitCode::SUCCESS,
        Outcome::Cancelled => ExitCode::from(EXIT_CANCELLED),
        Outcome::Failed(_) => ExitCode::FAILURE,
    })
}

fn cmd_toolchain(cli: &Cli, out: &dyn Output) -> Result<ExitCode> {
    let (config, _) = effective_config(cli)?;
    let installation = discover_installation(&config.toolchain.path_pattern);
    out.toolchain_info(&ToolchainInfo {
        pattern: config.toolchain.path_pattern.clone(),
        available: installation.is_some(),
        installation: installation.map(|p| p.display().to_string()),
        hw_server_url: config.toolchain.hw_server_url,
    });
    Ok(ExitCode::SUCCESS)
}

fn cmd_config(cli: &Cli, args: &cli::ConfigArgs, out: &dyn Output) -> Result<ExitCode> {
    if args.path {
        let path = cli.config.clone().or_else(config::default_config_path);
        out.config_path(path.as_deref());
        return Ok(ExitCode::SUCCESS);
    }
    let (config, path) = effective_config(cli)?;
    out.config_info(&config, path.as_deref());
    Ok(ExitCode::SUCCESS)
}

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn cmd_version(out: &dyn Output) -> Result<ExitCode> {
    out.version_info(&VersionInfo {
        version: build_info::VERSION,
        git_sha: build_info::git_sha(),
        git_dirty: build_info::git_dirty(),
        build_timestamp: build_info::build_timestamp(),
        rustc: build_info::rustc_semver(),
        target: build_info::target(),
    });
    Ok(ExitCode::SUCCESS)
}

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn cmd_completions(args: &cli::CompletionsArgs) -> Result<ExitCode> {
    use clap::CommandFactory;
    clap_complete::generate(args.shell, &mut Cli::command(), "fleet", &mut io::stdout());
    Ok(ExitCode::SUCCESS)
}
