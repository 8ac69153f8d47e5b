// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `depenv init` command.

use clap::Args;
use miette::Result;
use std::path::PathBuf;

#[cfg(test)]
#[path = "./cmd_init_test.rs"]
mod cmd_init_test;

/// Create a new depenv.yaml file
#[derive(Debug, Args)]
pub struct CmdInit {
    /// Directory to create file in
    #[clap(default_value = ".")]
    path: PathBuf,

    /// Id of the consumer node
    #[clap(long, default_value = "app")]
    root: String,

    /// Initial requirement of the consumer (repeatable)
    #[clap(long = "requires")]
    requires: Vec<String>,

    /// Template to use: minimal, standard
    #[clap(long, default_value = "standard")]
    template: String,
}

impl CmdInit {
    pub async fn run(&mut self) -> Result<i32> {
        let graph_path = self.path.join(depenv::DEPENV_FILENAME);

        if graph_path.exists() {
            return Err(miette::miette!(
                "{} already exists at {:?}",
                depenv::DEPENV_FILENAME,
                graph_path
            ));
        }

        let content = match self.template.as_str() {
            "minimal" => self.generate_minimal_template(),
            _ => self.generate_standard_template(),
        };

        std::fs::write(&graph_path, content).map_err(|e| {
            miette::miette!("Failed to write {}: {}", depenv::DEPENV_FILENAME, e)
        })?;

        println!("Created {} at {:?}", depenv::DEPENV_FILENAME, graph_path);
        println!();
        println!("Next steps:");
        println!("  1. Declare the nodes of your dependency graph");
        println!("  2. Run 'depenv show --scope build' to preview the build environment");
        println!("  3. Run 'depenv generate' to write activation scripts");

        Ok(0)
    }

    fn requirement_nodes(&self) -> String {
        self.requires
            .iter()
            .map(|r| format!("  - name: {r}\n"))
            .collect()
    }

    fn requires_line(&self) -> String {
        if self.requires.is_empty() {
            "    requires: []\n".to_string()
        } else {
            format!("    requires: [{}]\n", self.requires.join(", "))
        }
    }

    fn generate_minimal_template(&self) -> String {
        format!(
            "api: depenv/v0\n\
            root: {root}\n\
            \n\
            nodes:\n\
            \x20 - name: {root}\n\
            {requires}\
            {nodes}",
            root = self.root,
            requires = self.requires_line(),
            nodes = self.requirement_nodes(),
        )
    }

    fn generate_standard_template(&self) -> String {
        format!(
            "# depenv dependency graph\n\
            \n\
            api: depenv/v0\n\
            \n\
            # Node resolved when no consumer is given on the command line\n\
            root: {root}\n\
            \n\
            # Operating system of the host and build contexts\n\
            # settings:\n\
            #   os: Linux\n\
            # settings_build:\n\
            #   os: Linux\n\
            \n\
            nodes:\n\
            \x20 - name: {root}\n\
            {requires}\
            \x20   # build_requires: [cmake]\n\
            \x20   # test_requires: [gtest]\n\
            {nodes}\
            \n\
            # A node gives a buildenv to packages that build with it and\n\
            # needs its runenv at runtime:\n\
            #   - name: cmake/3.20\n\
            #     id: cmake\n\
            #     package_folder: /opt/cmake\n\
            #     buildenv:\n\
            #       - define: CMAKE_GENERATOR\n\
            #         value: Ninja\n\
            #     runenv:\n\
            #       - prepend: PATH\n\
            #         value: /opt/cmake/share/tools\n\
            #         path: true\n",
            root = self.root,
            requires = self.requires_line(),
            nodes = self.requirement_nodes(),
        )
    }
}
