// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! depenv - Layered Environment Composition CLI

use clap::{Parser, Subcommand};
use miette::Result;

mod cmd_generate;
mod cmd_init;
mod cmd_show;
mod flags;

use cmd_generate::CmdGenerate;
use cmd_init::CmdInit;
use cmd_show::CmdShow;

#[derive(Parser)]
#[clap(
    name = "depenv",
    about = "Layered build and run environment composition",
    version,
    long_about = "Compute the build and run environments of a package from its dependency graph and profiles"
)]
struct Opt {
    #[clap(flatten)]
    logging: Logging,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Parser)]
struct Logging {
    /// Increase verbosity (-v, -vv, -vvv)
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[clap(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new depenv.yaml file
    Init(CmdInit),

    /// Display the resolved environment of a package
    Show(CmdShow),

    /// Write activation scripts for the build and run environments
    Generate(CmdGenerate),
}

impl Opt {
    async fn run(self) -> Result<i32> {
        // Setup logging
        let log_level = match (self.logging.quiet, self.logging.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::WARN,
            (false, 1) => tracing::Level::INFO,
            (false, 2) => tracing::Level::DEBUG,
            (false, _) => tracing::Level::TRACE,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .init();

        match self.cmd {
            Command::Init(mut cmd) => cmd.run().await,
            Command::Show(mut cmd) => cmd.run().await,
            Command::Generate(mut cmd) => cmd.run().await,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::parse();
    let code = opt.run().await?;
    std::process::exit(code);
}
