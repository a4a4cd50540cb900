//! CLI argument parsing using clap.

use apkscope_core::Abi;
use clap::Parser;
use clap::Subcommand;
use clap_complete::Shell;
use std::path::PathBuf;

/// Default location of installed app folders on a device.
pub const DEFAULT_ROOT: &str = "/data/app";

#[derive(Parser)]
#[command(name = "apkscope")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect an APK file or an installed package
    Inspect(InspectArgs),
    /// Show the architectures an APK ships and the one it would run as
    Abi(AbiArgs),
    /// Show the folded third-party class summary of an APK
    Classes(ClassesArgs),
    /// Check whether an APK defines a class
    HasClass(HasClassArgs),
    /// List installed packages
    List(ListArgs),
    /// Generate shell completions
    Completion(CompletionArgs),
}

/// Engine settings shared by the inspecting commands.
#[derive(clap::Args)]
pub struct EngineArgs {
    /// ABI the device supports, most preferred first (can be repeated;
    /// default: the host machine's)
    #[arg(long = "device-abi", value_name = "ABI", value_parser = parse_abi)]
    pub device_abi: Vec<Abi>,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct InspectArgs {
    /// APK path, or a package id when --root is given
    #[arg(value_name = "APK|PACKAGE")]
    pub target: String,

    /// Directory of installed app folders to look the package up in
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Report this ABI instead of the resolved one
    #[arg(long, value_name = "ABI", value_parser = parse_abi)]
    pub abi: Option<Abi>,

    /// Include architectures the device cannot run in the ABI set
    #[arg(long)]
    pub all_abis: bool,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(clap::Args)]
pub struct AbiArgs {
    /// Path to the APK file
    #[arg(value_name = "APK")]
    pub archive: PathBuf,

    /// Include architectures the device cannot run
    #[arg(long)]
    pub all_abis: bool,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(clap::Args)]
pub struct ClassesArgs {
    /// Path to the APK file
    #[arg(value_name = "APK")]
    pub archive: PathBuf,

    /// Leave out classes under this package
    #[arg(long, value_name = "PACKAGE")]
    pub own_package: Option<String>,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(clap::Args)]
pub struct HasClassArgs {
    /// Path to the APK file
    #[arg(value_name = "APK")]
    pub archive: PathBuf,

    /// Dotted class name or descriptor; a trailing `*` matches a prefix
    #[arg(value_name = "CLASS")]
    pub class: String,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(clap::Args)]
pub struct ListArgs {
    /// Directory of installed app folders
    #[arg(long, value_name = "DIR", default_value = DEFAULT_ROOT)]
    pub root: PathBuf,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(clap::Args)]
pub struct CompletionArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Parses an ABI name (`arm64-v8a`, `arm64`, `armv8`, ...)
fn parse_abi(s: &str) -> Result<Abi, String> {
    s.trim().parse()
}
