// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use cmd::GateContext;
use cmd::commands::{
    PutArgs, TransferArgs, cat_command, check_command, copy_command, drive_command, list_command,
    mkdir_command, move_command, put_command, remove_command, rename_command,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "gate")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Mount table listing roots, their capabilities and parameters
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show drive identity, quota and declared capabilities
    Drive { root: String },
    /// List a directory
    Ls {
        root: String,
        /// Directory id; defaults to the root directory
        #[arg(long = "in")]
        dir: Option<String>,
    },
    /// Write a file's content to stdout
    Cat {
        root: String,
        name: String,
        #[arg(long = "in")]
        dir: Option<String>,
    },
    /// Upload a host file
    Put(PutArgs),
    /// Create a directory
    Mkdir {
        root: String,
        name: String,
        #[arg(long = "in")]
        dir: Option<String>,
    },
    /// Remove a file or directory
    Rm {
        root: String,
        name: String,
        #[arg(long = "in")]
        dir: Option<String>,
        /// Remove directories together with their contents
        #[arg(short, long)]
        recursive: bool,
    },
    /// Move an item to another directory
    Mv(TransferArgs),
    /// Copy an item to another directory
    Cp {
        #[command(flatten)]
        transfer: TransferArgs,
        /// Copy directory contents as well
        #[arg(short, long)]
        recursive: bool,
    },
    /// Rename an item in place
    Rename {
        root: String,
        name: String,
        new_name: String,
        #[arg(long = "in")]
        dir: Option<String>,
    },
    /// Run the conformance suite against configured roots
    Check {
        /// Roots to check; defaults to every root in the mount table
        roots: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    diagnostics::init_diagnostics();

    let cli = Cli::parse();
    let ctx = GateContext::load(cli.config.as_deref())?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let output: &mut dyn Write = &mut out;

    let result = match &cli.command {
        Commands::Drive { root } => drive_command(&ctx, root, output).await,
        Commands::Ls { root, dir } => list_command(&ctx, root, dir.as_deref(), output).await,
        Commands::Cat { root, name, dir } => {
            cat_command(&ctx, root, name, dir.as_deref(), output).await
        }
        Commands::Put(args) => put_command(&ctx, args, output).await,
        Commands::Mkdir { root, name, dir } => {
            mkdir_command(&ctx, root, name, dir.as_deref(), output).await
        }
        Commands::Rm {
            root,
            name,
            dir,
            recursive,
        } => remove_command(&ctx, root, name, dir.as_deref(), *recursive).await,
        Commands::Mv(args) => move_command(&ctx, args, output).await,
        Commands::Cp {
            transfer,
            recursive,
        } => copy_command(&ctx, transfer, *recursive, output).await,
        Commands::Rename {
            root,
            name,
            new_name,
            dir,
        } => rename_command(&ctx, root, name, new_name, dir.as_deref(), output).await,
        Commands::Check { roots } => check_command(&ctx, roots, output).await,
    };
    output.flush()?;

    if let Err(e) = &result {
        diagnostics::error!(
            "{command} failed: {error}",
            command: command_name(&cli.command),
            error: format!("{:#}", e)
        );
    }
    result
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Drive { .. } => "drive",
        Commands::Ls { .. } => "ls",
        Commands::Cat { .. } => "cat",
        Commands::Put(_) => "put",
        Commands::Mkdir { .. } => "mkdir",
        Commands::Rm { .. } => "rm",
        Commands::Mv(_) => "mv",
        Commands::Cp { .. } => "cp",
        Commands::Rename { .. } => "rename",
        Commands::Check { .. } => "check",
    }
}
