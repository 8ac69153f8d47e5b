// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Dependency graph data types and graph file parsing.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::environment::EnvInfo;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./graph_test.rs"]
mod graph_test;

static VARIABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid variable name regex"));

/// API version for graph files.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum ApiVersion {
    #[default]
    #[serde(rename = "depenv/v0")]
    V0,
}

/// Helper for two-stage deserialization to determine API version first.
#[derive(Deserialize)]
struct ApiVersionMapping {
    #[serde(default)]
    api: ApiVersion,
}

/// Operating system of a build or host context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum Os {
    Linux,
    Macos,
    Windows,
    FreeBSD,
    Other(String),
}

impl Os {
    /// Windows and its variants (`WindowsStore`, `WindowsCE`, ...).
    pub fn is_windows(&self) -> bool {
        match self {
            Self::Windows => true,
            Self::Other(name) => name.starts_with("Windows"),
            _ => false,
        }
    }

    pub fn path_separator(&self) -> &'static str {
        if self.is_windows() { ";" } else { ":" }
    }
}

impl From<String> for Os {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Linux" => Self::Linux,
            "Macos" => Self::Macos,
            "Windows" => Self::Windows,
            "FreeBSD" => Self::FreeBSD,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for Os {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Os> for String {
    fn from(value: Os) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => f.write_str("Linux"),
            Self::Macos => f.write_str("Macos"),
            Self::Windows => f.write_str("Windows"),
            Self::FreeBSD => f.write_str("FreeBSD"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// Settings of one context (host or build).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<Os>,
}

impl Settings {
    pub fn with_os(os: impl Into<Os>) -> Self {
        Self {
            os: Some(os.into()),
        }
    }
}

/// Kind of edge between a consumer and one of its providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequirementKind {
    /// Host context library or runtime dependency.
    Requires,
    /// Build context tool.
    BuildRequires,
    /// Host context dependency used only to test the consumer.
    TestRequires,
}

/// A declared edge from a node to a provider node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub node: String,
    pub kind: RequirementKind,
    /// Whether the provider is re-exported to the consumer's own consumers.
    pub visible: bool,
}

/// Package layout used to derive the implicit environment of a node.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CppInfo {
    #[serde(default = "default_bindirs")]
    pub bindirs: Vec<String>,
    #[serde(default = "default_libdirs")]
    pub libdirs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frameworkdirs: Vec<String>,
}

fn default_bindirs() -> Vec<String> {
    vec!["bin".to_string()]
}

fn default_libdirs() -> Vec<String> {
    vec!["lib".to_string()]
}

impl Default for CppInfo {
    fn default() -> Self {
        Self {
            bindirs: default_bindirs(),
            libdirs: default_libdirs(),
            frameworkdirs: Vec::new(),
        }
    }
}

/// A package in the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Unique key of the node within its graph.
    pub id: String,
    /// Package reference, matched against profile patterns.
    pub name: String,
    /// Environment this node gives to consumers that build with it.
    pub buildenv: EnvInfo,
    /// Environment this node needs at runtime.
    pub runenv: EnvInfo,
    pub package_folder: Option<PathBuf>,
    pub cpp_info: CppInfo,
    /// Requirements of every kind in declaration order.
    pub requirements: Vec<Requirement>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            buildenv: EnvInfo::default(),
            runenv: EnvInfo::default(),
            package_folder: None,
            cpp_info: CppInfo::default(),
            requirements: Vec::new(),
        }
    }

    /// Use an id distinct from the package name, for example to hold the
    /// build and host instances of one package in the same graph.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_package_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.package_folder = Some(folder.into());
        self
    }

    pub fn requires(&mut self, node: impl Into<String>) -> &mut Self {
        self.add_requirement(node, RequirementKind::Requires, true)
    }

    /// A host requirement that is not re-exported to this node's consumers.
    pub fn requires_private(&mut self, node: impl Into<String>) -> &mut Self {
        self.add_requirement(node, RequirementKind::Requires, false)
    }

    pub fn build_requires(&mut self, node: impl Into<String>) -> &mut Self {
        self.add_requirement(node, RequirementKind::BuildRequires, false)
    }

    pub fn test_requires(&mut self, node: impl Into<String>) -> &mut Self {
        self.add_requirement(node, RequirementKind::TestRequires, false)
    }

    fn add_requirement(
        &mut self,
        node: impl Into<String>,
        kind: RequirementKind,
        visible: bool,
    ) -> &mut Self {
        self.requirements.push(Requirement {
            node: node.into(),
            kind,
            visible,
        });
        self
    }

    pub fn requirements_of(&self, kind: RequirementKind) -> impl Iterator<Item = &Requirement> {
        self.requirements.iter().filter(move |r| r.kind == kind)
    }

    /// Environment derived from the package layout rather than declared.
    ///
    /// Binary directories go on `PATH`; outside of Windows the library and
    /// framework directories go on the dynamic loader variables. Nodes
    /// without a package folder contribute nothing.
    pub fn implicit_runenv(&self, os: Option<&Os>) -> EnvInfo {
        let mut env = EnvInfo::new();
        let Some(folder) = &self.package_folder else {
            return env;
        };

        let mut prepend_dirs = |var: &str, dirs: &[String]| {
            // prepend in reverse so the declared order is kept at the head
            for dir in dirs.iter().rev() {
                env.prepend_path(var, folder.join(dir).display().to_string());
            }
        };

        prepend_dirs("PATH", &self.cpp_info.bindirs);
        if os.is_some_and(|os| !os.is_windows()) {
            prepend_dirs("LD_LIBRARY_PATH", &self.cpp_info.libdirs);
            prepend_dirs("DYLD_LIBRARY_PATH", &self.cpp_info.libdirs);
            prepend_dirs("DYLD_FRAMEWORK_PATH", &self.cpp_info.frameworkdirs);
        }
        env
    }
}

/// A requirement as written in a graph file: an id, or an id with options.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
enum RequirementDecl {
    Id(String),
    Detailed {
        node: String,
        #[serde(default = "default_visible")]
        visible: bool,
    },
}

fn default_visible() -> bool {
    true
}

impl RequirementDecl {
    fn into_requirement(self, kind: RequirementKind) -> Requirement {
        let (node, visible) = match self {
            Self::Id(node) => (node, kind == RequirementKind::Requires),
            Self::Detailed { node, visible } => (node, visible),
        };
        Requirement {
            node,
            kind,
            visible,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct NodeDecl {
    name: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    requires: Vec<RequirementDecl>,
    #[serde(default)]
    build_requires: Vec<RequirementDecl>,
    #[serde(default)]
    test_requires: Vec<RequirementDecl>,
    #[serde(default)]
    buildenv: EnvInfo,
    #[serde(default)]
    runenv: EnvInfo,
    #[serde(default)]
    package_folder: Option<PathBuf>,
    #[serde(default)]
    cpp_info: CppInfo,
}

impl From<NodeDecl> for Node {
    fn from(decl: NodeDecl) -> Self {
        let requirements = decl
            .requires
            .into_iter()
            .map(|r| r.into_requirement(RequirementKind::Requires))
            .chain(
                decl.build_requires
                    .into_iter()
                    .map(|r| r.into_requirement(RequirementKind::BuildRequires)),
            )
            .chain(
                decl.test_requires
                    .into_iter()
                    .map(|r| r.into_requirement(RequirementKind::TestRequires)),
            )
            .collect();

        Node {
            id: decl.id.unwrap_or_else(|| decl.name.clone()),
            name: decl.name,
            buildenv: decl.buildenv,
            runenv: decl.runenv,
            package_folder: decl.package_folder,
            cpp_info: decl.cpp_info,
            requirements,
        }
    }
}

/// Graph file contents, as written in `depenv.yaml`.
#[derive(Debug, Clone, Deserialize)]
struct GraphFile {
    #[allow(dead_code)]
    #[serde(default)]
    api: ApiVersion,
    #[serde(default)]
    root: Option<String>,
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    settings_build: Settings,
    #[serde(default)]
    nodes: Vec<NodeDecl>,
}

/// A resolved dependency graph with per-node environment declarations.
///
/// The graph is built once and only read afterwards.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    root: Option<String>,
    settings: Settings,
    settings_build: Settings,
    nodes: IndexMap<String, Node>,
    source_path: Option<PathBuf>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a graph whose host and build contexts use the given settings.
    pub fn with_settings(settings: Settings, settings_build: Settings) -> Self {
        Self {
            settings,
            settings_build,
            ..Default::default()
        }
    }

    pub fn set_root(&mut self, id: impl Into<String>) {
        self.root = Some(id.into());
    }

    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// Host context settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Build context settings.
    pub fn settings_build(&self) -> &Settings {
        &self.settings_build
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(Error::DuplicateNode(node.id));
        }
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    pub fn node(&self, id: &str) -> Result<&Node> {
        self.nodes.get(id).ok_or_else(|| Error::UnknownNode {
            id: id.to_string(),
            similar: self.similar_ids(id),
        })
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn similar_ids(&self, id: &str) -> Vec<String> {
        let needle = id.to_lowercase();
        self.nodes
            .keys()
            .filter(|candidate| {
                let candidate = candidate.to_lowercase();
                candidate.contains(&needle) || needle.contains(&candidate)
            })
            .cloned()
            .collect()
    }

    /// Check that every requirement and the root refer to declared nodes
    /// and that every declared variable name can be used in a script.
    pub fn validate(&self) -> Result<()> {
        if let Some(root) = &self.root {
            self.node(root)?;
        }
        for node in self.nodes.values() {
            for requirement in &node.requirements {
                self.node(&requirement.node)?;
            }
            for op in node.buildenv.iter().chain(node.runenv.iter()) {
                if !VARIABLE_NAME.is_match(op.name()) {
                    return Err(Error::ValidationFailed(format!(
                        "Invalid environment variable name '{}' in node '{}'",
                        op.name(),
                        node.id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Order the closure reachable from `roots` over followed edges.
    ///
    /// Every node comes before all of the nodes it depends on, and ties are
    /// broken by the declaration order of the edges that reached them. A
    /// node reachable through several paths appears once.
    pub fn ordered_closure<'a, F>(
        &'a self,
        roots: &[&'a Requirement],
        follow: F,
    ) -> Result<Vec<&'a Node>>
    where
        F: Fn(&Requirement) -> bool,
    {
        let mut closure: IndexSet<&'a str> = IndexSet::new();
        let mut pending: VecDeque<&'a str> = roots.iter().map(|r| r.node.as_str()).collect();
        while let Some(id) = pending.pop_front() {
            if !closure.insert(id) {
                continue;
            }
            let node = self.node(id)?;
            pending.extend(
                node.requirements
                    .iter()
                    .filter(|&r| follow(r))
                    .map(|r| r.node.as_str()),
            );
        }

        let mut in_degree: HashMap<&'a str, usize> = closure.iter().map(|id| (*id, 0)).collect();
        for id in &closure {
            for requirement in self.node(id)?.requirements.iter().filter(|&r| follow(r)) {
                if let Some(degree) = in_degree.get_mut(requirement.node.as_str()) {
                    *degree += 1;
                }
            }
        }

        let mut queued: HashSet<&'a str> = HashSet::new();
        let mut queue: VecDeque<&'a str> = VecDeque::new();
        for root in roots {
            let id = root.node.as_str();
            if in_degree.get(id) == Some(&0) && queued.insert(id) {
                queue.push_back(id);
            }
        }

        let mut order = Vec::with_capacity(closure.len());
        while let Some(id) = queue.pop_front() {
            let node = self.node(id)?;
            order.push(node);
            for requirement in node.requirements.iter().filter(|&r| follow(r)) {
                let target = requirement.node.as_str();
                if let Some(degree) = in_degree.get_mut(target) {
                    *degree -= 1;
                    if *degree == 0 && queued.insert(target) {
                        queue.push_back(target);
                    }
                }
            }
        }

        if order.len() != closure.len() {
            let emitted: HashSet<&str> = order.iter().map(|n| n.id.as_str()).collect();
            return Err(Error::CyclicDependency {
                nodes: closure
                    .iter()
                    .filter(|id| !emitted.contains(*id))
                    .map(|id| id.to_string())
                    .collect(),
            });
        }

        tracing::debug!(
            order = ?order.iter().map(|n| n.id.as_str()).collect::<Vec<_>>(),
            "ordered dependency closure"
        );
        Ok(order)
    }

    /// Parse a graph from YAML.
    pub fn from_yaml<S: Into<String>>(yaml: S) -> Result<Self> {
        let yaml = yaml.into();

        // Stage 1: Parse to get API version
        let value: serde_yaml::Value =
            serde_yaml::from_str(&yaml).map_err(|e| Error::InvalidYaml {
                error: e,
                yaml_content: yaml.clone(),
            })?;

        let with_version: ApiVersionMapping =
            serde_yaml::from_value(value.clone()).map_err(|e| Error::InvalidYaml {
                error: e,
                yaml_content: yaml.clone(),
            })?;

        // Stage 2: Deserialize based on version
        let file: GraphFile = match with_version.api {
            ApiVersion::V0 => serde_yaml::from_value(value).map_err(|e| Error::InvalidYaml {
                error: e,
                yaml_content: yaml,
            })?,
        };

        let mut graph = DependencyGraph::with_settings(file.settings, file.settings_build);
        graph.root = file.root;
        for node in file.nodes {
            graph.add_node(node.into())?;
        }
        graph.validate()?;
        Ok(graph)
    }

    /// Load a graph from a file.
    ///
    /// Relative package folders are resolved against the file's directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        })?;

        let mut graph = Self::from_yaml(yaml)?;
        if let Some(base_dir) = path.parent() {
            for node in graph.nodes.values_mut() {
                if let Some(folder) = node.package_folder.as_mut() {
                    if folder.is_relative() {
                        *folder = base_dir.join(&*folder);
                    }
                }
            }
        }
        graph.source_path = Some(path.to_path_buf());
        Ok(graph)
    }
}
