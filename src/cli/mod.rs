//! CLI argument definitions.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::plan::{Plan, PlanLayout, Step};

/// FPGA fleet CLI - enable, disable and program USB-attached FPGA boards.
///
/// Robot Mode: Use --robot or --format=json for machine-parseable output.
#[derive(Parser, Debug)]
#[command(name = "fleet", version, about, long_about = None)]
#[command(propagate_version = true)]
#[allow(clippy::struct_excessive_bools)] // CLI flags naturally use multiple bools
pub struct Cli {
    /// Output format (text for humans, json for agents/scripts)
    #[arg(
        long,
        short = 'f',
        default_value = "text",
        global = true,
        env = "FLEET_FORMAT"
    )]
    pub format: OutputFormat,

    /// Robot mode: equivalent to --format=json
    #[arg(long, global = true)]
    pub robot: bool,

    /// Verbose logging (repeat for more: -v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, short = 'c', global = true, env = "FLEET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Device description identifying managed boards
    #[arg(long, global = true, env = "FLEET_DESCRIPTION")]
    pub description: Option<String>,

    /// Glob locating the Vivado launcher
    #[arg(long, global = true, env = "FLEET_TOOLCHAIN")]
    pub toolchain_glob: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with optional color
    #[default]
    Text,
    /// JSON output for scripts and agents
    Json,
    /// Compact JSON (single line)
    JsonCompact,
}

impl Cli {
    /// Returns true if output should be JSON (robot mode or explicit --format=json).
    pub const fn use_json(&self) -> bool {
        self.robot || matches!(self.format, OutputFormat::Json | OutputFormat::JsonCompact)
    }

    /// Returns true if output should be compact JSON.
    pub const fn use_compact_json(&self) -> bool {
        matches!(self.format, OutputFormat::JsonCompact)
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    // === Boards ===
    /// List managed boards and their states
    List(ListArgs),

    /// Re-list boards periodically
    Watch(WatchArgs),

    /// Enable every board
    EnableAll,

    /// Disable every board
    DisableAll,

    /// Flip one board between enabled and disabled
    Toggle(BoardArgs),

    /// Enable one board and disable all others
    EnableOnly(BoardArgs),

    // === Programming ===
    /// Run a plan against one board, then restore board states
    Program(ProgramArgs),

    /// Run a plan against every board in turn
    ProgramAll(PlanArgs),

    /// Show the discovered Vivado installation
    #[command(name = "toolchain")]
    ShowToolchain,

    // === Configuration ===
    /// Show effective configuration
    Config(ConfigArgs),

    // === Utilities ===
    /// Show version and build information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// === Argument Structs ===

#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Show device ids and raw status
    #[arg(long, short = 'l')]
    pub long: bool,
}

#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Refresh interval in milliseconds (defaults to the configured interval)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,

    /// Stop after this many listings (0 = run until interrupted)
    #[arg(long, short = 'n', default_value = "0")]
    pub count: u64,
}

#[derive(Parser, Debug)]
pub struct BoardArgs {
    /// Board number as shown by `fleet list` (1-based)
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    pub board: u32,
}

impl BoardArgs {
    /// 0-based board index.
    pub const fn index(&self) -> usize {
        self.board as usize - 1
    }
}

#[derive(Parser, Debug)]
pub struct ProgramArgs {
    #[command(flatten)]
    pub board: BoardArgs,

    #[command(flatten)]
    pub plan: PlanArgs,
}

/// Plan definition: explicit `--step` list or the pre/bitstream/post layout.
#[derive(Args, Debug, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct PlanArgs {
    /// Plan step: pause, script=PATH or image=PATH (repeatable, in order)
    #[arg(long = "step", value_name = "STEP", conflicts_with_all = [
        "pre_script", "bitstream", "post_script",
        "pause_before_pre_script", "pause_before_program",
        "pause_after_program", "pause_after_post_script",
    ])]
    pub steps: Vec<Step>,

    /// Script run before programming
    #[arg(long)]
    pub pre_script: Option<PathBuf>,

    /// Bitstream to program
    #[arg(long, short = 'b')]
    pub bitstream: Option<PathBuf>,

    /// Script run after programming
    #[arg(long)]
    pub post_script: Option<PathBuf>,

    /// Pause before the pre-script
    #[arg(long)]
    pub pause_before_pre_script: bool,

    /// Pause before programming
    #[arg(long)]
    pub pause_before_program: bool,

    /// Pause after programming
    #[arg(long)]
    pub pause_after_program: bool,

    /// Pause after the post-script
    #[arg(long)]
    pub pause_after_post_script: bool,
}

impl PlanArgs {
    /// Build the plan described by the flags.
    pub fn to_plan(&self) -> Plan {
        if !self.steps.is_empty() {
            return self.steps.iter().cloned().collect();
        }
        Plan::from_layout(PlanLayout {
            pause_before_pre_script: self.pause_before_pre_script,
            pre_script: self.pre_script.clone(),
            pause_before_program: self.pause_before_program,
            bitstream: self.bitstream.clone(),
            pause_after_program: self.pause_after_program,
            post_script: self.post_script.clone(),
            pause_after_post_script: self.pause_after_post_script,
        })
    }
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Show configuration file path
    #[arg(long)]
    pub path: bool,
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
