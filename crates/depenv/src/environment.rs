// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Environment variable operations declared by packages and profiles.

use serde::{Deserialize, Serialize};

use crate::value::Separator;

#[cfg(test)]
#[path = "./environment_test.rs"]
mod environment_test;

/// A single operation on a named environment variable.
///
/// In YAML each operation is a mapping keyed by its kind:
///
/// ```yaml
/// - define: CC
///   value: gcc
/// - prepend: PATH
///   value: /opt/tools/bin
///   path: true
/// - append: CFLAGS
///   value: -O2
/// - unset: CXXFLAGS
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum EnvOp {
    Define(DefineEnv),
    Append(AppendEnv),
    Prepend(PrependEnv),
    Unset(UnsetEnv),
}

/// Replace the variable with a value, discarding everything before it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DefineEnv {
    pub define: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub path: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
}

/// Add a value at the tail of the variable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AppendEnv {
    pub append: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub path: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
}

/// Add a value at the head of the variable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PrependEnv {
    pub prepend: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub path: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
}

/// Remove the variable entirely.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UnsetEnv {
    pub unset: String,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl EnvOp {
    pub fn define(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Define(DefineEnv {
            define: name.into(),
            value: value.into(),
            path: false,
            separator: None,
        })
    }

    pub fn append(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Append(AppendEnv {
            append: name.into(),
            value: value.into(),
            path: false,
            separator: None,
        })
    }

    pub fn prepend(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Prepend(PrependEnv {
            prepend: name.into(),
            value: value.into(),
            path: false,
            separator: None,
        })
    }

    pub fn unset(name: impl Into<String>) -> Self {
        Self::Unset(UnsetEnv { unset: name.into() })
    }

    /// Mark this operation as acting on a path list.
    ///
    /// Has no effect on [`EnvOp::Unset`].
    pub fn into_path(mut self) -> Self {
        match &mut self {
            Self::Define(op) => op.path = true,
            Self::Append(op) => op.path = true,
            Self::Prepend(op) => op.path = true,
            Self::Unset(_) => {}
        }
        self
    }

    /// Use a custom separator when joining values of this variable.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        let separator = Some(separator.into());
        match &mut self {
            Self::Define(op) => op.separator = separator,
            Self::Append(op) => op.separator = separator,
            Self::Prepend(op) => op.separator = separator,
            Self::Unset(_) => {}
        }
        self
    }

    /// The name of the variable this operation acts on.
    pub fn name(&self) -> &str {
        match self {
            Self::Define(op) => &op.define,
            Self::Append(op) => &op.append,
            Self::Prepend(op) => &op.prepend,
            Self::Unset(op) => &op.unset,
        }
    }

    /// The operand, if this kind of operation carries one.
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Define(op) => Some(&op.value),
            Self::Append(op) => Some(&op.value),
            Self::Prepend(op) => Some(&op.value),
            Self::Unset(_) => None,
        }
    }

    /// The joiner this operation declares for the variable.
    ///
    /// `None` when neither `path` nor `separator` is given, and for unset:
    /// the variable then keeps whatever joiner it already had.
    pub fn separator(&self) -> Option<Separator> {
        let (path, separator) = match self {
            Self::Define(op) => (op.path, &op.separator),
            Self::Append(op) => (op.path, &op.separator),
            Self::Prepend(op) => (op.path, &op.separator),
            Self::Unset(_) => return None,
        };
        if path {
            return Some(Separator::Path);
        }
        separator.clone().map(Separator::Text)
    }
}

/// The ordered operation log one node (or profile) declares for one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct EnvInfo {
    ops: Vec<EnvOp>,
}

impl EnvInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.push(EnvOp::define(name, value))
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.push(EnvOp::append(name, value))
    }

    pub fn prepend(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.push(EnvOp::prepend(name, value))
    }

    pub fn unset(&mut self, name: impl Into<String>) -> &mut Self {
        self.push(EnvOp::unset(name))
    }

    pub fn define_path(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.push(EnvOp::define(name, value).into_path())
    }

    pub fn append_path(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.push(EnvOp::append(name, value).into_path())
    }

    pub fn prepend_path(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        self.push(EnvOp::prepend(name, value).into_path())
    }

    /// Record an operation after all previously declared ones.
    pub fn push(&mut self, op: EnvOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    pub fn extend(&mut self, other: &EnvInfo) {
        self.ops.extend(other.ops.iter().cloned());
    }

    pub fn ops(&self) -> &[EnvOp] {
        &self.ops
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EnvOp> {
        self.ops.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

impl From<Vec<EnvOp>> for EnvInfo {
    fn from(ops: Vec<EnvOp>) -> Self {
        Self { ops }
    }
}

impl FromIterator<EnvOp> for EnvInfo {
    fn from_iter<T: IntoIterator<Item = EnvOp>>(iter: T) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a EnvInfo {
    type Item = &'a EnvOp;
    type IntoIter = std::slice::Iter<'a, EnvOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}
