use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use haul_verify::Checksum;

#[derive(Clone, Debug, Parser)]
#[command(name = "haul", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct App {
    /// Configuration file. Defaults to `haul.toml` in the working directory.
    #[arg(long, short, global = true)]
    pub config:  Option<PathBuf>,
    /// More log output on stderr; repeat for trace level.
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub cmd:     Commands,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    #[command(alias = "up", name = "upload", about = "Package matching files and upload them")]
    Upload(UploadArg),
    #[command(alias = "ls", name = "list", about = "List stored artifacts")]
    List(ListArg),
    #[command(alias = "i", name = "get", about = "Show one artifact's descriptor")]
    Get(GetArg),
    #[command(alias = "dl", name = "download", about = "Download and verify an artifact")]
    Download(DownloadArg),
    #[command(alias = "rm", name = "delete", about = "Delete an artifact")]
    Delete(DeleteArg),
    #[command(alias = "cfg", name = "config", about = "Print the effective configuration")]
    Config,
}

#[derive(Args, Clone, Debug)]
pub struct UploadArg {
    /// Artifact name.
    pub name:           String,
    /// Glob patterns, files or directories. Prefix with `!` to exclude.
    #[arg(required = true)]
    pub patterns:       Vec<String>,
    #[arg(long, help = "Days to keep the artifact")]
    pub retention_days: Option<u32>,
    #[arg(long, help = "Always produce a gzip-compressed tar")]
    pub compress:       bool,
    #[arg(long, short = 'C', help = "Resolve patterns against this directory")]
    pub working_dir:    Option<PathBuf>,
}

#[derive(Args, Clone, Debug)]
pub struct ListArg {
    /// Glob on artifact names.
    pub pattern: Option<String>,
}

#[derive(Args, Clone, Debug)]
pub struct GetArg {
    /// Artifact id.
    #[arg(required_unless_present = "name")]
    pub id:   Option<String>,
    #[arg(long, conflicts_with = "id", help = "Newest available artifact with this exact name")]
    pub name: Option<String>,
}

#[derive(Args, Clone, Debug)]
pub struct DownloadArg {
    /// Artifact id.
    pub id:          String,
    /// Target file, or a directory to place the artifact in.
    #[arg(default_value = ".")]
    pub destination: PathBuf,
    #[arg(long, help = "Skip digest verification")]
    pub no_verify:   bool,
    #[arg(long, conflicts_with = "no_verify", help = "Digest to verify against, e.g. sha256:<hex>")]
    pub checksum:    Option<Checksum>,
    #[arg(long, short = 'x', help = "Unpack archives into the destination directory")]
    pub extract:     bool,
}

#[derive(Args, Clone, Debug)]
pub struct DeleteArg {
    /// Artifact id.
    pub id: String,
}
