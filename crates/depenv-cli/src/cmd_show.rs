// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `depenv show` command.

use clap::Args;
use colored::Colorize;
use depenv::{EnvOp, Os, ResolvedEnv, Scope};
use miette::Result;
use serde::Serialize;

use crate::flags::{GraphFlags, select_consumer};

/// Display the resolved environment of a package
#[derive(Debug, Args)]
pub struct CmdShow {
    /// Node to resolve (defaults to the graph root)
    consumer: Option<String>,

    /// Environment to resolve: build, run
    #[clap(short, long, default_value = "run")]
    scope: Scope,

    /// Output format: table, yaml, json
    #[clap(long, default_value = "table")]
    format: String,

    #[clap(flatten)]
    graph: GraphFlags,
}

#[derive(Serialize)]
struct ShowOutput<'a> {
    consumer: &'a str,
    scope: Scope,
    #[serde(skip_serializing_if = "Option::is_none")]
    os: Option<&'a Os>,
    variables: Vec<VariableOutput<'a>>,
    operations: Vec<EnvOp>,
}

#[derive(Serialize)]
struct VariableOutput<'a> {
    name: &'a str,
    /// `None` when the variable is unset.
    value: Option<String>,
    path: bool,
}

impl CmdShow {
    pub async fn run(&mut self) -> Result<i32> {
        let graph = self.graph.load_graph()?;
        let profiles = self.graph.load_profiles()?;
        let consumer = select_consumer(&graph, self.consumer.as_deref())?;

        let env = depenv::resolve(&graph, &consumer, self.scope, &profiles)?;

        match self.format.as_str() {
            "yaml" => self.show_yaml(&env)?,
            "json" => self.show_json(&env)?,
            "table" => self.show_table(&env),
            other => {
                return Err(miette::miette!(
                    "Unknown format '{other}' (expected table, yaml or json)"
                ));
            }
        }

        Ok(0)
    }

    fn show_table(&self, env: &ResolvedEnv) {
        let os = env
            .os()
            .map(|os| os.to_string())
            .unwrap_or_else(|| "any os".to_string());
        println!(
            "{}",
            format!(
                "{} environment of {} ({os}):",
                capitalize(env.scope().as_str()),
                env.consumer()
            )
            .bold()
        );
        println!();

        if env.is_empty() {
            println!("  {}", "(no variables)".dimmed());
        }
        for (name, value) in env.iter() {
            let placeholder = format!("${name}");
            match env.get_with_previous(name, &placeholder) {
                Some(flat) => {
                    let marker = if value.is_path() { " [path]" } else { "" };
                    println!("  {} = {}{}", name.cyan(), flat.green(), marker.yellow());
                }
                None => println!("  {} {}", name.cyan(), "(unset)".dimmed()),
            }
        }

        println!();
        println!("Total: {} variable(s)", env.len());
    }

    fn show_yaml(&self, env: &ResolvedEnv) -> Result<()> {
        let yaml = serde_yaml::to_string(&output(env))
            .map_err(|e| miette::miette!("Failed to serialize environment: {e}"))?;
        print!("{yaml}");
        Ok(())
    }

    fn show_json(&self, env: &ResolvedEnv) -> Result<()> {
        let json = serde_json::to_string_pretty(&output(env))
            .map_err(|e| miette::miette!("Failed to serialize environment: {e}"))?;
        println!("{json}");
        Ok(())
    }
}

fn output(env: &ResolvedEnv) -> ShowOutput<'_> {
    ShowOutput {
        consumer: env.consumer(),
        scope: env.scope(),
        os: env.os(),
        variables: env
            .iter()
            .map(|(name, value)| VariableOutput {
                name,
                value: env.get(name),
                path: value.is_path(),
            })
            .collect(),
        operations: env.to_ops(),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
