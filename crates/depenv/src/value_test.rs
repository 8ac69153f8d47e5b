// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;

use super::*;

fn value_after(ops: &[EnvOp]) -> EnvValue {
    let mut value = EnvValue::new("MYVAR");
    for op in ops {
        value.apply(op);
    }
    value
}

#[rstest]
fn test_fresh_value_keeps_previous() {
    let value = EnvValue::new("MYVAR");
    assert!(value.keeps_previous());
    assert!(!value.is_unset());
    assert_eq!(value.get_str(Some("$MYVAR"), ":"), Some("$MYVAR".to_string()));
}

#[rstest]
fn test_append_and_prepend_wrap_previous() {
    let value = value_after(&[
        EnvOp::append("MYVAR", "tail"),
        EnvOp::prepend("MYVAR", "head"),
    ]);
    assert_eq!(value.get_str(None, ":"), Some("head tail".to_string()));
    assert_eq!(
        value.get_str(Some("$MYVAR"), ":"),
        Some("head $MYVAR tail".to_string())
    );
    assert_eq!(value.split_at_previous(), (vec!["head"], vec!["tail"]));
}

#[rstest]
fn test_define_discards_everything_before() {
    let value = value_after(&[
        EnvOp::append("MYVAR", "old"),
        EnvOp::define("MYVAR", "new"),
        EnvOp::append("MYVAR", "more"),
    ]);
    assert!(!value.keeps_previous());
    assert_eq!(value.get_str(Some("$MYVAR"), ":"), Some("new more".to_string()));
}

#[rstest]
fn test_unset_then_append_starts_fresh() {
    let unset = value_after(&[EnvOp::append("MYVAR", "a"), EnvOp::unset("MYVAR")]);
    assert!(unset.is_unset());
    assert_eq!(unset.get_str(Some("$MYVAR"), ":"), None);

    let reset = value_after(&[
        EnvOp::append("MYVAR", "a"),
        EnvOp::unset("MYVAR"),
        EnvOp::append("MYVAR", "b"),
    ]);
    assert_eq!(reset.get_str(Some("$MYVAR"), ":"), Some("b".to_string()));
}

#[rstest]
#[case::path(EnvOp::append("MYVAR", "b").into_path(), "a;b")]
#[case::custom(EnvOp::append("MYVAR", "b").with_separator(","), "a,b")]
#[case::plain(EnvOp::append("MYVAR", "b"), "a;b")]
fn test_declared_joiner_wins(#[case] last: EnvOp, #[case] expected: &str) {
    let value = value_after(&[EnvOp::define("MYVAR", "a").into_path(), last]);
    assert_eq!(value.get_str(None, ";"), Some(expected.to_string()));
}

#[rstest]
fn test_plain_operations_keep_path_joiner() {
    let value = value_after(&[
        EnvOp::prepend("PATH", "/a/bin").into_path(),
        EnvOp::append("PATH", "/b/bin"),
    ]);
    assert!(value.is_path());
    assert_eq!(
        value.get_str(Some("$PATH"), ":"),
        Some("/a/bin:$PATH:/b/bin".to_string())
    );

    let unset = value_after(&[
        EnvOp::define("PATH", "/a/bin").into_path(),
        EnvOp::unset("PATH"),
        EnvOp::append("PATH", "/b/bin"),
        EnvOp::append("PATH", "/c/bin"),
    ]);
    assert_eq!(unset.get_str(None, ":"), Some("/b/bin:/c/bin".to_string()));
}

#[rstest]
fn test_plain_operations_default_to_space() {
    let value = value_after(&[EnvOp::append("FLAGS", "-a"), EnvOp::prepend("FLAGS", "-b")]);
    assert_eq!(value.get_str(None, ":"), Some("-b -a".to_string()));
}

#[rstest]
fn test_empty_values_do_not_double_separators() {
    let value = value_after(&[
        EnvOp::append("MYVAR", "a"),
        EnvOp::append("MYVAR", ""),
        EnvOp::append("MYVAR", "b"),
    ]);
    assert_eq!(value.get_str(None, ":"), Some("a b".to_string()));
}
