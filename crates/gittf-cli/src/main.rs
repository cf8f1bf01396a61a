use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use gittf::BridgeError;
use gittf_cli::{clone, fetch, log, pull, push, repair, status, telemetry, wi};
use gittf_tools::ToolError;

/// Two-way bridge between git and a TFVC server.
///
/// Server changesets are replayed onto the `tfs` branch; commits on
/// `master` are checked in one changeset per commit. Each `tfs` commit
/// carries a note (`refs/notes/tf`) with the changeset it came from.
///
/// WORKFLOW:
///
///   1. git tf clone           (inside a mapped server folder)
///   2. commit on master
///   3. git tf pull            (fetch + rebase master onto tfs)
///   4. git tf push            (check in every commit on master)
#[derive(Parser)]
#[command(name = "git-tf")]
#[command(version, about)]
#[command(propagate_version = true)]
#[command(after_help = "See 'git tf <command> --help' for more information on a specific command.")]
struct Cli {
    /// More output. Repeat for debug logging.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a git repository from a mapped server folder
    #[command(disable_version_flag = true)]
    Clone(clone::CloneArgs),

    /// Replay new server changesets onto the mirror branch
    Fetch(fetch::FetchArgs),

    /// Fetch, then rebase the work branch onto the mirror branch
    Pull(pull::PullArgs),

    /// Check in work branch commits, one changeset each
    Push(push::PushArgs),

    /// List commits waiting to be pushed
    Status,

    /// Show history with changeset numbers
    Log(log::LogArgs),

    /// Undo pending server changes left by an interrupted push
    Repair,

    /// Associate a commit with a work item
    Wi(wi::WiArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::init(cli.verbose);

    let verbose = cli.verbose;
    let result = match &cli.command {
        Commands::Clone(args) => clone::run(args, verbose),
        Commands::Fetch(args) => fetch::run(args, verbose),
        Commands::Pull(args) => pull::run(args, verbose),
        Commands::Push(args) => push::run(args, verbose),
        Commands::Status => status::run(verbose),
        Commands::Log(args) => log::run(args, verbose),
        Commands::Repair => repair::run(verbose),
        Commands::Wi(args) => wi::run(args, verbose),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(bridge) = err.downcast_ref::<BridgeError>() {
                eprintln!("error: {bridge}");
                ExitCode::from(1)
            } else if let Some(tool) = err.downcast_ref::<ToolError>() {
                eprintln!("error: {tool}");
                ExitCode::from(1)
            } else {
                eprintln!("error: {err:#}");
                ExitCode::from(2)
            }
        }
    }
}
