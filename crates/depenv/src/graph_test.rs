// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use tempfile::TempDir;

use super::*;
use crate::environment::EnvOp;

fn ids(nodes: &[&Node]) -> Vec<String> {
    nodes.iter().map(|n| n.id.clone()).collect()
}

fn graph_of(nodes: Vec<Node>) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for node in nodes {
        graph.add_node(node).expect("unique node ids");
    }
    graph
}

fn node_requiring(name: &str, requires: &[&str]) -> Node {
    let mut node = Node::new(name);
    for r in requires {
        node.requires(*r);
    }
    node
}

#[rstest]
fn test_parse_graph_yaml() {
    let yaml = r#"
api: depenv/v0
root: app
settings:
  os: Linux
settings_build:
  os: Windows
nodes:
  - name: app/1.0
    id: app
    requires:
      - zlib
      - node: openssl
        visible: false
    build_requires: [cmake]
    test_requires: [gtest]
  - name: zlib
    runenv:
      - append: ZLIB_FLAGS
        value: -fPIC
  - name: openssl
  - name: cmake
    package_folder: /opt/cmake
    cpp_info:
      bindirs: [bin, tools]
  - name: gtest
"#;
    let graph = DependencyGraph::from_yaml(yaml).expect("Should parse graph");
    assert_eq!(graph.root(), Some("app"));
    assert_eq!(graph.settings().os, Some(Os::Linux));
    assert_eq!(graph.settings_build().os, Some(Os::Windows));
    assert_eq!(graph.len(), 5);

    let app = graph.node("app").unwrap();
    assert_eq!(app.name, "app/1.0");
    assert_eq!(
        app.requirements,
        vec![
            Requirement {
                node: "zlib".to_string(),
                kind: RequirementKind::Requires,
                visible: true,
            },
            Requirement {
                node: "openssl".to_string(),
                kind: RequirementKind::Requires,
                visible: false,
            },
            Requirement {
                node: "cmake".to_string(),
                kind: RequirementKind::BuildRequires,
                visible: false,
            },
            Requirement {
                node: "gtest".to_string(),
                kind: RequirementKind::TestRequires,
                visible: false,
            },
        ]
    );

    let zlib = graph.node("zlib").unwrap();
    assert_eq!(zlib.runenv.ops(), &[EnvOp::append("ZLIB_FLAGS", "-fPIC")]);

    let cmake = graph.node("cmake").unwrap();
    assert_eq!(cmake.cpp_info.bindirs, vec!["bin", "tools"]);
    assert_eq!(cmake.cpp_info.libdirs, vec!["lib"]);
}

#[rstest]
fn test_parse_invalid_yaml() {
    let result = DependencyGraph::from_yaml("api: depenv/v0\nnodes: [\n");
    assert!(matches!(result, Err(Error::InvalidYaml { .. })));
}

#[rstest]
fn test_unknown_requirement_is_rejected() {
    let yaml = r#"
api: depenv/v0
nodes:
  - name: app
    requires: [zlibb]
  - name: zlib
"#;
    match DependencyGraph::from_yaml(yaml) {
        Err(Error::UnknownNode { id, similar }) => {
            assert_eq!(id, "zlibb");
            assert_eq!(similar, vec!["zlib"]);
        }
        other => panic!("Expected UnknownNode, got: {other:?}"),
    }
}

#[rstest]
#[case("MY VAR")]
#[case("1ST")]
#[case("A;rm -rf /")]
#[case("")]
fn test_invalid_variable_name_is_rejected(#[case] name: &str) {
    let yaml = format!(
        "api: depenv/v0\nnodes:\n  - name: zlib\n    buildenv:\n      - define: \"{name}\"\n        value: x\n"
    );
    match DependencyGraph::from_yaml(yaml) {
        Err(Error::ValidationFailed(message)) => assert!(message.contains("zlib")),
        other => panic!("Expected ValidationFailed, got: {other:?}"),
    }
}

#[rstest]
fn test_valid_variable_names_are_accepted() {
    let mut graph = DependencyGraph::new();
    let mut node = Node::new("zlib");
    node.runenv.define("_private", "1").append("Poco_ROOT2", "/poco");
    graph.add_node(node).unwrap();
    graph.validate().expect("names are valid");

    graph.nodes.get_mut("zlib").unwrap().runenv.unset("BAD-NAME");
    assert!(matches!(graph.validate(), Err(Error::ValidationFailed(_))));
}

#[rstest]
fn test_duplicate_node_is_rejected() {
    let mut graph = DependencyGraph::new();
    graph.add_node(Node::new("zlib")).unwrap();
    let result = graph.add_node(Node::new("zlib"));
    assert!(matches!(result, Err(Error::DuplicateNode(id)) if id == "zlib"));

    // the same package may appear twice under distinct ids
    graph
        .add_node(Node::new("zlib").with_id("zlib-build"))
        .expect("distinct id is accepted");
}

#[rstest]
fn test_load_resolves_relative_package_folder() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join(crate::DEPENV_FILENAME);
    std::fs::write(
        &path,
        "api: depenv/v0\nnodes:\n  - name: zlib\n    package_folder: pkgs/zlib\n",
    )
    .unwrap();

    let graph = DependencyGraph::load(&path).expect("Should load graph");
    assert_eq!(graph.source_path(), Some(path.as_path()));
    assert_eq!(
        graph.node("zlib").unwrap().package_folder,
        Some(tmp.path().join("pkgs/zlib"))
    );
}

#[rstest]
fn test_ordered_closure_diamond() {
    let mut pkgd = node_requiring("pkgd", &["pkgb", "pkgc"]);
    pkgd.runenv.append("MYVAR", "d");
    let graph = graph_of(vec![
        node_requiring("pkge", &["pkgd"]),
        pkgd,
        node_requiring("pkgb", &["pkga"]),
        node_requiring("pkgc", &["pkga"]),
        Node::new("pkga"),
    ]);

    let consumer = graph.node("pkge").unwrap();
    let roots: Vec<&Requirement> = consumer.requirements.iter().collect();
    let order = graph.ordered_closure(&roots, |_| true).unwrap();
    assert_eq!(ids(&order), vec!["pkgd", "pkgb", "pkgc", "pkga"]);
}

#[rstest]
fn test_ordered_closure_waits_for_every_dependent() {
    // zlib is declared first by app but also required by openssl, so it
    // must come after openssl
    let graph = graph_of(vec![
        node_requiring("app", &["zlib", "openssl"]),
        Node::new("zlib"),
        node_requiring("openssl", &["zlib"]),
    ]);
    let consumer = graph.node("app").unwrap();
    let roots: Vec<&Requirement> = consumer.requirements.iter().collect();
    let order = graph.ordered_closure(&roots, |_| true).unwrap();
    assert_eq!(ids(&order), vec!["openssl", "zlib"]);
}

#[rstest]
fn test_ordered_closure_respects_filter() {
    let mut lib = Node::new("lib");
    lib.requires_private("internal");
    let graph = graph_of(vec![node_requiring("app", &["lib"]), lib, Node::new("internal")]);
    let consumer = graph.node("app").unwrap();
    let roots: Vec<&Requirement> = consumer.requirements.iter().collect();

    let visible_only = graph.ordered_closure(&roots, |r| r.visible).unwrap();
    assert_eq!(ids(&visible_only), vec!["lib"]);

    let everything = graph.ordered_closure(&roots, |_| true).unwrap();
    assert_eq!(ids(&everything), vec!["lib", "internal"]);
}

#[rstest]
fn test_ordered_closure_detects_cycle() {
    let graph = graph_of(vec![
        node_requiring("app", &["a"]),
        node_requiring("a", &["b"]),
        node_requiring("b", &["a"]),
    ]);
    let consumer = graph.node("app").unwrap();
    let roots: Vec<&Requirement> = consumer.requirements.iter().collect();
    match graph.ordered_closure(&roots, |_| true) {
        Err(Error::CyclicDependency { nodes }) => assert_eq!(nodes, vec!["a", "b"]),
        other => panic!("Expected CyclicDependency, got: {other:?}"),
    }
}

#[rstest]
#[case("Linux", false, ":")]
#[case("Macos", false, ":")]
#[case("Windows", true, ";")]
#[case("WindowsStore", true, ";")]
#[case("Android", false, ":")]
fn test_os_platform_traits(#[case] name: &str, #[case] windows: bool, #[case] sep: &str) {
    let os = Os::from(name);
    assert_eq!(os.is_windows(), windows);
    assert_eq!(os.path_separator(), sep);
    assert_eq!(os.to_string(), name);
}

#[rstest]
fn test_implicit_runenv_depends_on_os() {
    let node = Node::new("zlib").with_package_folder("/pkgs/zlib");
    let bin = Path::new("/pkgs/zlib").join("bin").display().to_string();
    let lib = Path::new("/pkgs/zlib").join("lib").display().to_string();

    let linux = node.implicit_runenv(Some(&Os::Linux));
    assert_eq!(
        linux.ops(),
        &[
            EnvOp::prepend("PATH", bin.clone()).into_path(),
            EnvOp::prepend("LD_LIBRARY_PATH", lib.clone()).into_path(),
            EnvOp::prepend("DYLD_LIBRARY_PATH", lib).into_path(),
        ]
    );

    let windows = node.implicit_runenv(Some(&Os::Windows));
    assert_eq!(windows.ops(), &[EnvOp::prepend("PATH", bin).into_path()]);

    assert!(Node::new("headers").implicit_runenv(Some(&Os::Linux)).is_empty());
}
