// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Resolution of the effective environment of a consumer.
//!
//! Contributions are gathered in priority order (profiles first, then the
//! consumer's closest dependencies, then their dependencies) and folded
//! onto an empty environment in the reverse order, so a node's operations
//! always land on top of everything its own dependencies declared.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::environment::{EnvInfo, EnvOp};
use crate::graph::{DependencyGraph, Node, Os, Requirement, RequirementKind};
use crate::profile::{compose_profiles, Profile};
use crate::value::{EnvValue, Separator};
use crate::{Error, Result};

#[cfg(test)]
#[path = "./resolve_test.rs"]
mod resolve_test;

/// Which environment of the consumer is being computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// The environment used while building the consumer.
    Build,
    /// The environment used while running the consumer.
    Run,
}

impl Scope {
    pub const ALL: [Scope; 2] = [Scope::Build, Scope::Run];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Run => "run",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "build" => Ok(Self::Build),
            "run" => Ok(Self::Run),
            other => Err(Error::ValidationFailed(format!(
                "Unknown scope '{other}' (expected 'build' or 'run')"
            ))),
        }
    }
}

/// Where a contribution to the environment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Buildenv,
    Runenv,
    Implicit,
}

struct Contribution<'a> {
    node: &'a str,
    origin: Origin,
    env: Cow<'a, EnvInfo>,
}

/// The effective environment of one consumer in one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEnv {
    consumer: String,
    scope: Scope,
    os: Option<Os>,
    vars: IndexMap<String, EnvValue>,
}

impl ResolvedEnv {
    /// Id of the node this environment was resolved for.
    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Operating system of the context the environment will be used in.
    pub fn os(&self) -> Option<&Os> {
        self.os.as_ref()
    }

    pub fn path_separator(&self) -> &'static str {
        self.os.as_ref().map_or(":", Os::path_separator)
    }

    /// Final value of a variable, without any outer value.
    ///
    /// Returns `None` for variables that were never touched or are unset.
    pub fn get(&self, name: &str) -> Option<String> {
        self.vars.get(name)?.get_str(None, self.path_separator())
    }

    /// Final value of a variable, with the outer value rendered as
    /// `placeholder` wherever it is kept.
    pub fn get_with_previous(&self, name: &str, placeholder: &str) -> Option<String> {
        self.vars
            .get(name)?
            .get_str(Some(placeholder), self.path_separator())
    }

    pub fn value(&self, name: &str) -> Option<&EnvValue> {
        self.vars.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Variables in the order they were first touched.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EnvValue)> {
        self.vars.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// A canonical operation list that rebuilds this environment on top of
    /// an arbitrary outer environment.
    ///
    /// Each variable becomes an unset, a single define, or a prepend of the
    /// values before the outer value followed by an append of those after.
    pub fn to_ops(&self) -> Vec<EnvOp> {
        let sep = self.path_separator();
        let mut ops = Vec::new();
        for (name, value) in &self.vars {
            if value.is_unset() {
                ops.push(EnvOp::unset(name));
                continue;
            }

            let joiner = value.joiner(sep);
            let (before, after) = value.split_at_previous();
            let join = |parts: Vec<&str>| -> Option<String> {
                let parts: Vec<&str> = parts.into_iter().filter(|p| !p.is_empty()).collect();
                (!parts.is_empty()).then(|| parts.join(joiner))
            };
            let decorate = |op: EnvOp| match value.separator() {
                Separator::Path => op.into_path(),
                Separator::Text(text) if text != " " => op.with_separator(text),
                Separator::Text(_) => op,
            };

            if !value.keeps_previous() {
                let joined = join(before).unwrap_or_default();
                ops.push(decorate(EnvOp::define(name, joined)));
                continue;
            }
            if let Some(joined) = join(before) {
                ops.push(decorate(EnvOp::prepend(name, joined)));
            }
            if let Some(joined) = join(after) {
                ops.push(decorate(EnvOp::append(name, joined)));
            }
        }
        ops
    }
}

/// Compute the environment of `consumer` for `scope`.
///
/// `profiles` are composed in order, later ones taking precedence, and
/// applied on top of everything the graph contributes. Only the profile
/// entries whose package pattern matches the consumer's name are used.
pub fn resolve(
    graph: &DependencyGraph,
    consumer: &str,
    scope: Scope,
    profiles: &[Profile],
) -> Result<ResolvedEnv> {
    let consumer_node = graph.node(consumer)?;
    let settings = match scope {
        Scope::Build => graph.settings_build(),
        Scope::Run => graph.settings(),
    };
    let os = settings.os.clone();

    let contributions = match scope {
        Scope::Build => build_contributions(graph, consumer_node, os.as_ref())?,
        Scope::Run => run_contributions(graph, consumer_node, os.as_ref())?,
    };

    let profile_env = compose_profiles(profiles)
        .environment(scope)
        .for_reference(&consumer_node.name);

    let mut vars: IndexMap<String, EnvValue> = IndexMap::new();
    for contribution in contributions.iter().rev() {
        tracing::trace!(
            node = contribution.node,
            origin = ?contribution.origin,
            ops = contribution.env.len(),
            "applying contribution"
        );
        apply(&mut vars, &contribution.env);
    }
    if !profile_env.is_empty() {
        tracing::trace!(ops = profile_env.len(), "applying profile environment");
        apply(&mut vars, &profile_env);
    }

    tracing::debug!(
        consumer,
        %scope,
        variables = vars.len(),
        "resolved environment"
    );
    Ok(ResolvedEnv {
        consumer: consumer.to_string(),
        scope,
        os,
        vars,
    })
}

fn apply(vars: &mut IndexMap<String, EnvValue>, env: &EnvInfo) {
    for op in env {
        vars.entry(op.name().to_string())
            .or_insert_with(|| EnvValue::new(op.name()))
            .apply(op);
    }
}

fn push_contribution<'a>(
    contributions: &mut Vec<Contribution<'a>>,
    node: &'a Node,
    origin: Origin,
    env: Cow<'a, EnvInfo>,
) {
    if !env.is_empty() {
        contributions.push(Contribution {
            node: &node.id,
            origin,
            env,
        });
    }
}

/// Build scope, highest priority first: every tool in the build context
/// (its buildenv when the consumer requires it directly, then its runenv
/// and package layout), followed by the buildenv of host requirements.
fn build_contributions<'a>(
    graph: &'a DependencyGraph,
    consumer: &'a Node,
    os: Option<&Os>,
) -> Result<Vec<Contribution<'a>>> {
    let mut contributions = Vec::new();

    let tool_roots: Vec<&Requirement> = consumer
        .requirements_of(RequirementKind::BuildRequires)
        .collect();
    let direct: HashSet<&str> = tool_roots.iter().map(|r| r.node.as_str()).collect();
    // everything a tool needs, private or not, runs at build time
    let tools = graph.ordered_closure(&tool_roots, |r| {
        matches!(
            r.kind,
            RequirementKind::Requires | RequirementKind::BuildRequires
        )
    })?;
    for tool in tools {
        if direct.contains(tool.id.as_str()) {
            push_contribution(
                &mut contributions,
                tool,
                Origin::Buildenv,
                Cow::Borrowed(&tool.buildenv),
            );
        }
        push_contribution(
            &mut contributions,
            tool,
            Origin::Runenv,
            Cow::Borrowed(&tool.runenv),
        );
        push_contribution(
            &mut contributions,
            tool,
            Origin::Implicit,
            Cow::Owned(tool.implicit_runenv(os)),
        );
    }

    let host_roots: Vec<&Requirement> =
        consumer.requirements_of(RequirementKind::Requires).collect();
    let hosts = graph.ordered_closure(&host_roots, follows_host)?;
    for host in hosts {
        push_contribution(
            &mut contributions,
            host,
            Origin::Buildenv,
            Cow::Borrowed(&host.buildenv),
        );
    }

    Ok(contributions)
}

/// Run scope, highest priority first: the runenv and package layout of
/// every host requirement, then of the test requirements.
fn run_contributions<'a>(
    graph: &'a DependencyGraph,
    consumer: &'a Node,
    os: Option<&Os>,
) -> Result<Vec<Contribution<'a>>> {
    let mut contributions = Vec::new();

    let roots: Vec<&Requirement> = consumer
        .requirements_of(RequirementKind::Requires)
        .chain(consumer.requirements_of(RequirementKind::TestRequires))
        .collect();
    for host in graph.ordered_closure(&roots, follows_host)? {
        push_contribution(
            &mut contributions,
            host,
            Origin::Runenv,
            Cow::Borrowed(&host.runenv),
        );
        push_contribution(
            &mut contributions,
            host,
            Origin::Implicit,
            Cow::Owned(host.implicit_runenv(os)),
        );
    }

    Ok(contributions)
}

fn follows_host(requirement: &Requirement) -> bool {
    requirement.kind == RequirementKind::Requires && requirement.visible
}
