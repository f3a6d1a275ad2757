use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "regente")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Playbook catalog and orchestration engine for machine setup", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Re-scan the playbook trees and rebuild the catalog
    Refresh,

    /// Show the catalog with selection and gating annotations
    List {
        /// Only show one category
        category: Option<String>,
    },

    /// Apply the selected playbooks to this machine
    Apply(ApplyArgs),

    /// Inspect or reset the installed-state record
    #[command(subcommand)]
    Installed(InstalledCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Select every playbook in these categories
    #[arg(short, long)]
    pub category: Vec<String>,

    /// Toggle individual playbooks, as category/name
    #[arg(short, long, value_name = "CATEGORY/NAME")]
    pub only: Vec<String>,

    /// Leave the essential seed selection out
    #[arg(long)]
    pub skip_essential: bool,

    /// Print the resolved execution order without running anything
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

#[derive(Subcommand)]
pub enum InstalledCommand {
    /// List completed playbooks with their timestamps
    List,

    /// Delete the installed-state record entirely
    Reset {
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}
