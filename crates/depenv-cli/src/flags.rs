// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Flags shared by the commands that resolve an environment.

use std::path::PathBuf;

use clap::Args;
use depenv::{DependencyGraph, Profile};
use miette::Result;

#[cfg(test)]
#[path = "./flags_test.rs"]
mod flags_test;

/// Colon separated profiles applied before any given with `--profile`.
pub const DEPENV_PROFILE_VAR: &str = "DEPENV_PROFILE";

#[derive(Args, Clone, Debug, Default)]
pub struct GraphFlags {
    /// Dependency graph file
    #[clap(
        short = 'g',
        long = "graph",
        env = "DEPENV_GRAPH",
        default_value = depenv::DEPENV_FILENAME
    )]
    pub graph: PathBuf,

    /// Profile to apply, by path or by name (repeatable, later ones win)
    #[clap(short = 'p', long = "profile")]
    pub profiles: Vec<String>,
}

impl GraphFlags {
    pub fn load_graph(&self) -> Result<DependencyGraph> {
        Ok(DependencyGraph::load(&self.graph)?)
    }

    /// Load every requested profile, lowest precedence first.
    pub fn load_profiles(&self) -> Result<Vec<Profile>> {
        let env_profiles = std::env::var(DEPENV_PROFILE_VAR).ok();
        self.profile_names(env_profiles.as_deref())
            .iter()
            .map(|name| {
                let path = depenv::find_profile(name, None)?;
                tracing::debug!(profile = %name, path = %path.display(), "using profile");
                Ok(Profile::load(path)?)
            })
            .collect()
    }

    /// Profiles from the environment variable, then those from the flags.
    pub fn profile_names(&self, env_profiles: Option<&str>) -> Vec<String> {
        env_profiles
            .into_iter()
            .flat_map(|value| value.split(':'))
            .filter(|name| !name.trim().is_empty())
            .map(|name| name.trim().to_string())
            .chain(self.profiles.iter().cloned())
            .collect()
    }
}

/// The consumer to resolve: the one requested, else the graph root.
pub fn select_consumer(graph: &DependencyGraph, requested: Option<&str>) -> Result<String> {
    let consumer = match requested.or(graph.root()) {
        Some(consumer) => consumer,
        None => {
            return Err(miette::miette!(
                help = "Pass a consumer id or set 'root' in the graph file",
                "No consumer given and the graph has no root"
            ));
        }
    };
    graph.node(consumer)?;
    Ok(consumer.to_string())
}
