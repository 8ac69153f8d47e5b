// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `depenv generate` command.

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use depenv::Scope;
use depenv::script::DEFAULT_SCRIPT_PREFIX;
use miette::Result;

use crate::flags::{GraphFlags, select_consumer};

/// Write activation scripts for the build and run environments
#[derive(Debug, Args)]
pub struct CmdGenerate {
    /// Node to resolve (defaults to the graph root)
    consumer: Option<String>,

    /// Directory to write the scripts into
    #[clap(short, long, default_value = ".")]
    output: PathBuf,

    /// Prefix of the generated script names
    #[clap(long, default_value = DEFAULT_SCRIPT_PREFIX)]
    prefix: String,

    /// Only generate the script for this environment
    #[clap(short, long)]
    scope: Option<Scope>,

    #[clap(flatten)]
    graph: GraphFlags,
}

impl CmdGenerate {
    pub async fn run(&mut self) -> Result<i32> {
        let graph = self.graph.load_graph()?;
        let profiles = self.graph.load_profiles()?;
        let consumer = select_consumer(&graph, self.consumer.as_deref())?;

        let scopes = match self.scope {
            Some(scope) => vec![scope],
            None => Scope::ALL.to_vec(),
        };
        for scope in scopes {
            let env = depenv::resolve(&graph, &consumer, scope, &profiles)?;
            let path = depenv::save_script(&env, &self.output, &self.prefix)?;
            tracing::info!(%consumer, %scope, variables = env.len(), "generated script");
            println!("{} {}", "Wrote".green(), path.display());
        }

        Ok(0)
    }
}
