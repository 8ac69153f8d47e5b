// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Accumulated state of a single environment variable.

use serde::{Deserialize, Serialize};

use crate::environment::EnvOp;

#[cfg(test)]
#[path = "./value_test.rs"]
mod value_test;

/// How the values of a variable are joined when flattened.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum Separator {
    /// Join with a literal string, a single space unless declared otherwise.
    Text(String),
    /// Join with the path separator of the target platform.
    Path,
}

impl Default for Separator {
    fn default() -> Self {
        Self::Text(" ".to_string())
    }
}

/// One entry of a variable's value list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum EnvItem {
    Value(String),
    /// Whatever the variable held before this environment was applied.
    Previous,
}

/// The running value of one variable while contributions are folded.
///
/// A variable that has never been touched is `[Previous]`: appending or
/// prepending wraps the outer value, defining replaces it, and unsetting
/// clears the list so later operations start without it.
///
/// The joiner is a single space until an operation declares `path` or a
/// separator; plain operations never change it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EnvValue {
    name: String,
    items: Vec<EnvItem>,
    separator: Separator,
}

impl EnvValue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: vec![EnvItem::Previous],
            separator: Separator::default(),
        }
    }

    /// Layer one operation on top of the current state.
    pub fn apply(&mut self, op: &EnvOp) {
        match op {
            EnvOp::Define(def) => {
                self.items = vec![EnvItem::Value(def.value.clone())];
            }
            EnvOp::Append(app) => self.items.push(EnvItem::Value(app.value.clone())),
            EnvOp::Prepend(pre) => self.items.insert(0, EnvItem::Value(pre.value.clone())),
            EnvOp::Unset(_) => self.items.clear(),
        }
        if let Some(separator) = op.separator() {
            self.separator = separator;
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn items(&self) -> &[EnvItem] {
        &self.items
    }

    pub fn separator(&self) -> &Separator {
        &self.separator
    }

    pub fn is_path(&self) -> bool {
        self.separator == Separator::Path
    }

    /// True when the variable must be removed from the environment.
    pub fn is_unset(&self) -> bool {
        self.items.is_empty()
    }

    /// True when the outer value of the variable is kept.
    pub fn keeps_previous(&self) -> bool {
        self.items.contains(&EnvItem::Previous)
    }

    /// The string placed between two values.
    pub fn joiner<'a>(&'a self, path_separator: &'a str) -> &'a str {
        match &self.separator {
            Separator::Text(text) => text,
            Separator::Path => path_separator,
        }
    }

    /// Concrete values before and after the outer value.
    ///
    /// When the outer value is not kept, everything is reported as `before`.
    pub fn split_at_previous(&self) -> (Vec<&str>, Vec<&str>) {
        let mut before = Vec::new();
        let mut after = Vec::new();
        let mut seen_previous = false;
        for item in &self.items {
            match item {
                EnvItem::Previous => seen_previous = true,
                EnvItem::Value(value) if seen_previous => after.push(value.as_str()),
                EnvItem::Value(value) => before.push(value.as_str()),
            }
        }
        (before, after)
    }

    /// Flatten the value list into a single string.
    ///
    /// The outer value is rendered as `placeholder` when one is given and
    /// dropped otherwise. Empty values are skipped so no separator is ever
    /// doubled. Returns `None` for an unset variable.
    pub fn get_str(&self, placeholder: Option<&str>, path_separator: &str) -> Option<String> {
        if self.is_unset() {
            return None;
        }
        let parts: Vec<&str> = self
            .items
            .iter()
            .filter_map(|item| match item {
                EnvItem::Value(value) if value.is_empty() => None,
                EnvItem::Value(value) => Some(value.as_str()),
                EnvItem::Previous => placeholder,
            })
            .collect();
        Some(parts.join(self.joiner(path_separator)))
    }
}
