// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Activation scripts for resolved environments.

use std::path::{Path, PathBuf};

use crate::graph::Os;
use crate::resolve::{ResolvedEnv, Scope};
use crate::value::EnvItem;
use crate::Result;

#[cfg(test)]
#[path = "./script_test.rs"]
mod script_test;

/// Prefix of generated script names, as in `depenvbuildenv.sh`.
pub const DEFAULT_SCRIPT_PREFIX: &str = "depenv";

/// Shell dialect of a generated script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptFormat {
    /// POSIX shell, sourced with `.`.
    Sh,
    /// Windows batch file, run with `call`.
    Bat,
}

impl ScriptFormat {
    /// The dialect native to an operating system; shell when unknown.
    pub fn for_os(os: Option<&Os>) -> Self {
        match os {
            Some(os) if os.is_windows() => Self::Bat,
            _ => Self::Sh,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Sh => "sh",
            Self::Bat => "bat",
        }
    }
}

/// File name of the activation script for a scope.
pub fn script_name(prefix: &str, scope: Scope, format: ScriptFormat) -> String {
    format!("{prefix}{scope}env.{}", format.extension())
}

/// File name of the script that restores what activation changed.
pub fn deactivate_script_name(prefix: &str, scope: Scope, format: ScriptFormat) -> String {
    format!("deactivate_{}", script_name(prefix, scope, format))
}

/// Generate a script that applies `env` on top of the calling environment.
///
/// Before changing anything the script records the current value of every
/// variable it touches into `deactivate_path`, so running that file
/// afterwards restores the previous state.
pub fn generate_activate_script(
    env: &ResolvedEnv,
    format: ScriptFormat,
    deactivate_path: &Path,
) -> String {
    match format {
        ScriptFormat::Sh => generate_sh(env, deactivate_path),
        ScriptFormat::Bat => generate_bat(env, deactivate_path),
    }
}

/// Write the activation script for `env` into `dir`.
///
/// The format follows the operating system of the environment's scope.
/// Returns the path of the written script.
pub fn save_script(env: &ResolvedEnv, dir: &Path, prefix: &str) -> Result<PathBuf> {
    let format = ScriptFormat::for_os(env.os());
    let script_path = dir.join(script_name(prefix, env.scope(), format));
    let deactivate_path = dir.join(deactivate_script_name(prefix, env.scope(), format));

    std::fs::create_dir_all(dir)?;
    std::fs::write(
        &script_path,
        generate_activate_script(env, format, &deactivate_path),
    )?;

    #[cfg(unix)]
    if format == ScriptFormat::Sh {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&script_path, std::fs::Permissions::from_mode(0o755))?;
    }

    tracing::debug!(path = %script_path.display(), scope = %env.scope(), "wrote activation script");
    Ok(script_path)
}

/// Render a variable's items, with the outer value as `placeholder` and
/// each concrete value passed through `escape`.
fn render_value(
    env: &ResolvedEnv,
    name: &str,
    placeholder: &str,
    escape: fn(&str) -> String,
) -> Option<String> {
    let value = env.value(name)?;
    if value.is_unset() {
        return None;
    }
    let parts: Vec<String> = value
        .items()
        .iter()
        .filter_map(|item| match item {
            EnvItem::Value(v) if v.is_empty() => None,
            EnvItem::Value(v) => Some(escape(v)),
            EnvItem::Previous => Some(placeholder.to_string()),
        })
        .collect();
    Some(parts.join(value.joiner(env.path_separator())))
}

fn escape_sh(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn escape_bat(value: &str) -> String {
    value.replace('%', "%%")
}

fn generate_sh(env: &ResolvedEnv, deactivate_path: &Path) -> String {
    let deactivate = escape_sh(&deactivate_path.display().to_string());
    let names: Vec<&str> = env.iter().map(|(name, _)| name).collect();

    let mut script = String::new();
    script.push_str(&format!(
        "# {} environment for {}\n",
        env.scope(),
        env.consumer()
    ));
    script.push_str(&format!(
        "echo \"echo Restoring environment\" > \"{deactivate}\"\n"
    ));
    if !names.is_empty() {
        script.push_str(&format!("for v in {}\n", names.join(" ")));
        script.push_str("do\n");
        script.push_str("    is_defined=\"true\"\n");
        script.push_str("    value=$(printenv $v) || is_defined=\"\" || true\n");
        script.push_str("    if [ -n \"$value\" ] || [ -n \"$is_defined\" ]\n");
        script.push_str("    then\n");
        script.push_str(&format!(
            "        echo export \"$v='$value'\" >> \"{deactivate}\"\n"
        ));
        script.push_str("    else\n");
        script.push_str(&format!("        echo unset $v >> \"{deactivate}\"\n"));
        script.push_str("    fi\n");
        script.push_str("done\n");
    }
    script.push('\n');

    for name in names {
        let placeholder = format!("${{{name}}}");
        match render_value(env, name, &placeholder, escape_sh) {
            Some(value) => script.push_str(&format!("export {name}=\"{value}\"\n")),
            None => script.push_str(&format!("unset {name}\n")),
        }
    }

    script
}

fn generate_bat(env: &ResolvedEnv, deactivate_path: &Path) -> String {
    let deactivate = deactivate_path.display().to_string();
    let names: Vec<&str> = env.iter().map(|(name, _)| name).collect();

    let mut script = String::new();
    script.push_str("@echo off\r\n");
    script.push_str(&format!(
        "rem {} environment for {}\r\n",
        env.scope(),
        env.consumer()
    ));
    script.push_str("chcp 65001 > nul\r\n");
    script.push_str("setlocal\r\n");
    script.push_str(&format!("echo @echo off > \"{deactivate}\"\r\n"));
    script.push_str(&format!(
        "echo echo Restoring environment >> \"{deactivate}\"\r\n"
    ));
    if !names.is_empty() {
        script.push_str(&format!("for %%v in ({}) do (\r\n", names.join(" ")));
        script.push_str("    set foundenvvar=\r\n");
        script.push_str("    for /f \"delims== tokens=1,2\" %%a in ('set') do (\r\n");
        script.push_str("        if /I \"%%a\" == \"%%v\" (\r\n");
        script.push_str(&format!(
            "            echo set \"%%a=%%b\">> \"{deactivate}\"\r\n"
        ));
        script.push_str("            set foundenvvar=1\r\n");
        script.push_str("        )\r\n");
        script.push_str("    )\r\n");
        script.push_str("    if not defined foundenvvar (\r\n");
        script.push_str(&format!("        echo set %%v=>> \"{deactivate}\"\r\n"));
        script.push_str("    )\r\n");
        script.push_str(")\r\n");
    }
    script.push_str("endlocal\r\n\r\n");

    for name in names {
        let placeholder = format!("%{name}%");
        match render_value(env, name, &placeholder, escape_bat) {
            Some(value) => script.push_str(&format!("set \"{name}={value}\"\r\n")),
            None => script.push_str(&format!("set {name}=\r\n")),
        }
    }

    script
}
