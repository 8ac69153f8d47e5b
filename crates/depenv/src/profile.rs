// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Profile parsing, `include()` resolution and composition.
//!
//! A profile is a text file with sections. Only the `[buildenv]` and
//! `[runenv]` sections are interpreted here:
//!
//! ```text
//! include(base)
//!
//! [buildenv]
//! CC=gcc
//! PATH+=(path)$PROFILE_DIR/tools
//! mypkg*:PATH=!
//! mypkg*:PATH+=(path)/opt/mypkg/bin
//! ```

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::environment::{EnvInfo, EnvOp};
use crate::resolve::Scope;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./profile_test.rs"]
mod profile_test;

static INCLUDE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^include\(\s*(.+?)\s*\)$").expect("valid include regex"));

static SECTION_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[\s*([A-Za-z_][\w.]*)\s*\]$").expect("valid section regex"));

/// Placeholder expanded to the directory holding the profile file.
pub const PROFILE_DIR_VAR: &str = "$PROFILE_DIR";

/// Environment variable naming the depenv home directory.
pub const DEPENV_HOME_VAR: &str = "DEPENV_HOME";

/// Environment operations of one profile section, grouped by package pattern.
///
/// Groups keep the order in which their pattern first appeared. The group
/// without a pattern applies to every consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileEnvironment {
    groups: IndexMap<Option<String>, EnvInfo>,
}

impl ProfileEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an operation, optionally restricted to a package pattern.
    pub fn push(&mut self, pattern: Option<String>, op: EnvOp) {
        self.groups.entry(pattern).or_default().push(op);
    }

    /// Layer `other` on top of this environment.
    ///
    /// Operations of a pattern already present are appended to its group,
    /// so they apply after (and win over) the existing ones; new patterns
    /// are added at the end.
    pub fn update(&mut self, other: &ProfileEnvironment) {
        for (pattern, env) in &other.groups {
            self.groups.entry(pattern.clone()).or_default().extend(env);
        }
    }

    /// The operations that apply to the consumer with the given reference.
    pub fn for_reference(&self, reference: &str) -> EnvInfo {
        let mut result = EnvInfo::new();
        for (pattern, env) in &self.groups {
            let applies = match pattern {
                None => true,
                Some(pattern) => pattern_matches(pattern, reference),
            };
            if applies {
                result.extend(env);
            }
        }
        result
    }

    pub fn groups(&self) -> impl Iterator<Item = (Option<&str>, &EnvInfo)> {
        self.groups.iter().map(|(p, env)| (p.as_deref(), env))
    }

    pub fn is_empty(&self) -> bool {
        self.groups.values().all(EnvInfo::is_empty)
    }
}

fn pattern_matches(pattern: &str, reference: &str) -> bool {
    match glob::Pattern::new(pattern) {
        Ok(glob) => glob.matches(reference),
        Err(err) => {
            tracing::warn!(%pattern, %err, "invalid package pattern, comparing literally");
            pattern == reference
        }
    }
}

/// A parsed profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    /// `include()` targets not yet merged into this profile.
    pub includes: Vec<String>,
    pub buildenv: ProfileEnvironment,
    pub runenv: ProfileEnvironment,
    /// Files that contributed to this profile, includes first.
    pub source_files: Vec<PathBuf>,
}

impl Profile {
    /// Parse profile text without resolving its includes.
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with_origin(text, None)
    }

    fn parse_with_origin(text: &str, origin: Option<&Path>) -> Result<Self> {
        let text = match origin.and_then(Path::parent) {
            Some(dir) => text.replace(PROFILE_DIR_VAR, &dir.display().to_string()),
            None => text.to_string(),
        };

        let mut profile = Profile::default();
        let mut section: Option<String> = None;
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(caps) = SECTION_LINE.captures(line) {
                section = Some(caps[1].to_string());
                continue;
            }

            let target = match section.as_deref() {
                None => {
                    if let Some(caps) = INCLUDE_LINE.captures(line) {
                        profile.includes.push(caps[1].to_string());
                    } else {
                        tracing::debug!(%line, "ignoring profile line outside of a section");
                    }
                    continue;
                }
                Some("buildenv") => &mut profile.buildenv,
                Some("runenv") => &mut profile.runenv,
                Some(_) => continue,
            };

            let (pattern, op) =
                parse_env_line(line).ok_or_else(|| Error::BadEnvDefinition {
                    path: origin.map(Path::to_path_buf),
                    line_number: index + 1,
                    line: line.to_string(),
                })?;
            target.push(pattern, op);
        }
        Ok(profile)
    }

    /// Load a profile file and merge everything it includes.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut stack = Vec::new();
        load_with_includes(path.as_ref(), &mut stack)
    }

    /// The section used for the given scope.
    pub fn environment(&self, scope: Scope) -> &ProfileEnvironment {
        match scope {
            Scope::Build => &self.buildenv,
            Scope::Run => &self.runenv,
        }
    }

    /// Layer `other` on top of this profile.
    pub fn update(&mut self, other: &Profile) {
        self.buildenv.update(&other.buildenv);
        self.runenv.update(&other.runenv);
        self.includes.extend(other.includes.iter().cloned());
        self.source_files.extend(other.source_files.iter().cloned());
    }
}

/// Compose profiles in order, later profiles taking precedence.
pub fn compose_profiles(profiles: &[Profile]) -> Profile {
    let mut composed = Profile::default();
    for profile in profiles {
        composed.update(profile);
    }
    composed
}

/// Split one environment line into its pattern and operation.
///
/// The operator is found at the first `=`: `NAME+=v` appends, `NAME=+v`
/// prepends, `NAME=!` unsets and `NAME=v` defines. A `(path)` prefix on the
/// value makes the variable a path list.
fn parse_env_line(line: &str) -> Option<(Option<String>, EnvOp)> {
    let (lhs, rhs) = line.split_once('=')?;
    let (lhs, appending) = match lhs.strip_suffix('+') {
        Some(lhs) => (lhs, true),
        None => (lhs, false),
    };

    let (pattern, name) = match lhs.rsplit_once(':') {
        Some((pattern, name)) => (Some(pattern.trim().to_string()), name.trim()),
        None => (None, lhs.trim()),
    };
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    if pattern.as_deref() == Some("") {
        return None;
    }

    if !appending && rhs.starts_with('!') {
        return Some((pattern, EnvOp::unset(name)));
    }
    let (rhs, prepending) = match rhs.strip_prefix('+') {
        Some(rest) if !appending => (rest, true),
        _ => (rhs, false),
    };

    let value = rhs.trim();
    let (value, path) = match value.strip_prefix("(path)") {
        Some(rest) => (rest, true),
        None => (value, false),
    };

    let op = if appending {
        EnvOp::append(name, value)
    } else if prepending {
        EnvOp::prepend(name, value)
    } else {
        EnvOp::define(name, value)
    };
    Some((pattern, if path { op.into_path() } else { op }))
}

fn load_with_includes(path: &Path, stack: &mut Vec<PathBuf>) -> Result<Profile> {
    let canonical = dunce::canonicalize(path).map_err(|e| Error::ReadFailed {
        path: path.to_path_buf(),
        error: e,
    })?;
    if stack.contains(&canonical) {
        return Err(Error::CircularInclude(canonical));
    }

    let text = std::fs::read_to_string(&canonical).map_err(|e| Error::ReadFailed {
        path: canonical.clone(),
        error: e,
    })?;
    let mut own = Profile::parse_with_origin(&text, Some(&canonical))?;
    own.source_files.push(canonical.clone());

    stack.push(canonical.clone());
    let mut composed = Profile::default();
    for include in std::mem::take(&mut own.includes) {
        let include_path = find_profile(&include, canonical.parent())?;
        let included = load_with_includes(&include_path, stack)?;
        composed.update(&included);
    }
    stack.pop();

    composed.update(&own);
    tracing::debug!(profile = %canonical.display(), "loaded profile");
    Ok(composed)
}

/// Directory searched for profiles referenced by bare name.
pub fn profiles_dir() -> Option<PathBuf> {
    let home = match std::env::var_os(DEPENV_HOME_VAR) {
        Some(home) => PathBuf::from(home),
        None => dirs::home_dir()?.join(".depenv"),
    };
    Some(home.join("profiles"))
}

/// Locate a profile given as a path or as a name.
///
/// `~/` paths are home-relative, relative paths are resolved against
/// `base_dir` first and then looked up in [`profiles_dir`].
pub fn find_profile(name: &str, base_dir: Option<&Path>) -> Result<PathBuf> {
    let path = if let Some(rel) = name.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or_else(|| {
            Error::ValidationFailed("Cannot resolve ~ without HOME".to_string())
        })?;
        home.join(rel)
    } else if Path::new(name).is_absolute() {
        PathBuf::from(name)
    } else {
        let local = match base_dir {
            Some(base) => base.join(name),
            None => PathBuf::from(name),
        };
        if local.is_file() {
            local
        } else {
            let searched = profiles_dir().unwrap_or_default();
            let candidate = searched.join(name);
            if !candidate.is_file() {
                return Err(Error::ProfileNotFound {
                    name: name.to_string(),
                    searched,
                });
            }
            candidate
        }
    };

    if !path.is_file() {
        return Err(Error::ProfileNotFound {
            name: name.to_string(),
            searched: path,
        });
    }
    Ok(path)
}
