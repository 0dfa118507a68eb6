//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use offsite_backup::Ownership;
use offsite_core::config::FsBackupType;

/// offsite - timestamped backups, synchronized offsite
#[derive(Parser, Debug)]
#[command(name = "offsite")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only report errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration directory [default: ~/.offsite]
    #[arg(long, global = true, env = "OFFSITE_CONFIG_DIR")]
    pub config_dir: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the working directory of a filesystem source
    FsInit(FsInitArgs),

    /// Back up a filesystem source
    Fs(FsArgs),

    /// Back up a PostgreSQL database or the cluster globals
    Db(DbArgs),

    /// List the backups stored at a destination
    List(ListArgs),

    /// Push and sync everything pending to offsite storage
    Sync(SyncArgs),

    /// Inspect or reset the pending sync state
    SyncState(SyncStateArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum BackupTypeArg {
    /// Full backups with chained incrementals
    #[value(alias = "rdiff")]
    Incremental,
    /// One compressed archive per run
    #[value(alias = "tar")]
    Archive,
}

impl From<BackupTypeArg> for FsBackupType {
    fn from(arg: BackupTypeArg) -> Self {
        match arg {
            BackupTypeArg::Incremental => FsBackupType::Incremental,
            BackupTypeArg::Archive => FsBackupType::Archive,
        }
    }
}

#[derive(Args, Debug)]
pub struct FsInitArgs {
    /// Backup type
    #[arg(long = "type", value_enum)]
    pub backup_type: BackupTypeArg,

    /// Absolute path of the source directory
    pub src: Utf8PathBuf,

    /// Short name prefixed to the working directory
    pub name: String,
}

#[derive(Args, Debug)]
pub struct FsArgs {
    /// Owner of the produced files
    #[arg(short = 'u', long = "owner", value_name = "USER[:GROUP]")]
    pub owner: Option<Ownership>,

    /// Source directory, as given to fs-init
    pub src: Utf8PathBuf,

    /// Destination, relative to the root path
    pub dst: Utf8PathBuf,
}

#[derive(Args, Debug)]
pub struct DbArgs {
    /// Back up the cluster-wide globals instead of one database
    #[arg(short = 'g', long)]
    pub global: bool,

    /// Owner of the produced files
    #[arg(short = 'u', long = "owner", value_name = "USER[:GROUP]")]
    pub owner: Option<Ownership>,

    /// Database name (unless -g) followed by the destination
    #[arg(value_name = "[DB] DST", num_args = 1..=2, required = true)]
    pub operands: Vec<String>,
}

impl DbArgs {
    /// Split the operands into the database name and the destination
    pub fn split(&self) -> (Option<&str>, &str) {
        match self.operands.as_slice() {
            [db, dst] => (Some(db.as_str()), dst.as_str()),
            [dst] => (None, dst.as_str()),
            _ => (None, ""),
        }
    }
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Destination to list
    pub dst: Utf8PathBuf,
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Mirror the whole root path before processing pending work
    #[arg(long)]
    pub full: bool,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("action").required(true).args(["list", "reset"])))]
pub struct SyncStateArgs {
    /// Show pending syncs and pushes
    #[arg(long)]
    pub list: bool,

    /// Forget the sync state; refused while anything is pending
    #[arg(long)]
    pub reset: bool,
}
