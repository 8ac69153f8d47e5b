// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! depenv - Layered Environment Composition
//!
//! This crate computes the environment a package sees while it is being
//! built and while it runs, from the environment declarations of every
//! package in its dependency graph plus profile overrides.
//!
//! # Overview
//!
//! Each node of a [`DependencyGraph`] declares a `buildenv` (what it gives
//! to packages that build with it) and a `runenv` (what it needs at
//! runtime) as ordered logs of define/append/prepend/unset operations.
//! [`resolve`] walks the graph from a consumer, folds those logs leaf-first
//! so closer dependencies layer on top of deeper ones, applies the
//! matching [`Profile`] entries last, and returns a [`ResolvedEnv`].
//!
//! # Example
//!
//! ```yaml
//! # depenv.yaml
//! api: depenv/v0
//! root: app
//! settings:
//!   os: Linux
//! settings_build:
//!   os: Linux
//!
//! nodes:
//!   - name: app
//!     requires: [zlib]
//!     build_requires: [cmake]
//!   - name: zlib
//!     runenv:
//!       - append: ZLIB_FLAGS
//!         value: -fPIC
//!   - name: cmake
//!     buildenv:
//!       - prepend: PATH
//!         value: /opt/cmake/bin
//!         path: true
//! ```

pub mod environment;
pub mod error;
pub mod graph;
pub mod profile;
pub mod resolve;
pub mod script;
pub mod value;

pub use environment::{EnvInfo, EnvOp};
pub use error::{Error, Result};
pub use graph::{CppInfo, DependencyGraph, Node, Os, Requirement, RequirementKind, Settings};
pub use profile::{compose_profiles, find_profile, Profile, ProfileEnvironment};
pub use resolve::{resolve, ResolvedEnv, Scope};
pub use script::{generate_activate_script, save_script, ScriptFormat};
pub use value::{EnvItem, EnvValue, Separator};

/// Well-known filename for dependency graphs.
pub const DEPENV_FILENAME: &str = "depenv.yaml";
