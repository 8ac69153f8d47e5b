// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;

use crate::environment::{AppendEnv, EnvInfo, EnvOp, PrependEnv, UnsetEnv};
use crate::value::Separator;

#[rstest]
fn test_parse_env_ops_from_yaml() {
    let yaml = r#"
- define: CC
  value: gcc
- prepend: PATH
  value: /opt/tools/bin
  path: true
- append: CFLAGS
  value: -O2
  separator: ","
- unset: CXXFLAGS
"#;
    let env: EnvInfo = serde_yaml::from_str(yaml).expect("Should parse env ops");
    assert_eq!(env.len(), 4);
    assert_eq!(env.ops()[0], EnvOp::define("CC", "gcc"));
    assert_eq!(
        env.ops()[1],
        EnvOp::Prepend(PrependEnv {
            prepend: "PATH".to_string(),
            value: "/opt/tools/bin".to_string(),
            path: true,
            separator: None,
        })
    );
    assert_eq!(
        env.ops()[2],
        EnvOp::Append(AppendEnv {
            append: "CFLAGS".to_string(),
            value: "-O2".to_string(),
            path: false,
            separator: Some(",".to_string()),
        })
    );
    assert_eq!(
        env.ops()[3],
        EnvOp::Unset(UnsetEnv {
            unset: "CXXFLAGS".to_string()
        })
    );
}

#[rstest]
fn test_serialize_skips_defaults() {
    let yaml = serde_yaml::to_string(&EnvOp::append("MYVAR", "value")).unwrap();
    assert!(yaml.contains("append: MYVAR"));
    assert!(!yaml.contains("path"));
    assert!(!yaml.contains("separator"));
}

#[rstest]
fn test_builder_keeps_declaration_order() {
    let mut env = EnvInfo::new();
    env.define("A", "1")
        .append("B", "2")
        .prepend_path("PATH", "/bin")
        .unset("C");

    let names: Vec<&str> = env.iter().map(EnvOp::name).collect();
    assert_eq!(names, vec!["A", "B", "PATH", "C"]);
    assert_eq!(env.ops()[3].value(), None);
}

#[rstest]
#[case(EnvOp::define("A", "1"), None)]
#[case(EnvOp::append("A", "1").into_path(), Some(Separator::Path))]
#[case(EnvOp::prepend("A", "1").with_separator(","), Some(Separator::Text(",".to_string())))]
#[case(EnvOp::unset("A"), None)]
fn test_op_separator(#[case] op: EnvOp, #[case] expected: Option<Separator>) {
    assert_eq!(op.separator(), expected);
}
