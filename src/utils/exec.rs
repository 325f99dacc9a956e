//! External command execution.
//!
//! Runs a command to completion, logs its stderr on success and turns a
//! non-zero exit into an error carrying the command's own output.

use crate::log;
use anyhow::{Context, Result};
use regex::Regex;
use std::{
    borrow::Cow,
    ffi::OsString,
    path::Path,
    process::{Command, Output},
    sync::LazyLock,
};

// ============================================================================
// Macro
// ============================================================================

/// Run an external command with arguments. Empty arguments are dropped.
///
/// # Examples
/// ```ignore
/// exec!(root; &["tailwindcss".to_string()]; "-i", input, "-o", output)?;
///
/// const MY_FILTER: FilterRule = FilterRule::new(&["≈"]);
/// exec!(filter=&MY_FILTER; root; &command; "--minify")?;
/// ```
#[macro_export]
macro_rules! exec {
    (filter=$filter:expr; $root:expr; $cmd:expr; $($arg:expr),* $(,)?) => {
        $crate::utils::exec::exec(
            $root,
            $cmd,
            &$crate::utils::exec::filter_args(&[$(::std::ffi::OsString::from($arg)),*]),
            $filter,
        )
    };
    ($root:expr; $cmd:expr; $($arg:expr),* $(,)?) => {
        $crate::exec!(filter=&$crate::utils::exec::EMPTY_FILTER; $root; $cmd; $($arg),*)
    };
}

/// Filter out empty args.
#[inline]
pub fn filter_args(args: &[OsString]) -> Vec<OsString> {
    args.iter().filter(|a| !a.is_empty()).cloned().collect()
}

// ============================================================================
// Command Execution
// ============================================================================

/// Execute `cmd` plus `args` in `root` and capture its output.
///
/// # Errors
/// Returns error if command fails to execute or returns non-zero exit code.
pub fn exec(
    root: &Path,
    cmd: &[String],
    args: &[OsString],
    filter: &'static FilterRule,
) -> Result<Output> {
    let name = cmd.first().context("Empty command")?;

    let output = Command::new(name)
        .args(&cmd[1..])
        .args(args)
        .current_dir(root)
        .output()
        .with_context(|| format!("Failed to execute `{name}`"))?;

    if !output.status.success() {
        anyhow::bail!(format_error(name, &output));
    }

    // On success, only log stderr (warnings) to reduce noise
    filter.log(name, String::from_utf8_lossy(&output.stderr).trim());
    Ok(output)
}

fn format_error(name: &str, output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    let mut msg = format!("Command `{name}` failed with {}", output.status);
    for stream in [stderr.trim(), stdout.trim()] {
        if !stream.is_empty() {
            msg.push('\n');
            msg.push_str(&strip_ansi(stream));
        }
    }
    msg
}

// ============================================================================
// Output Filtering
// ============================================================================

fn strip_ansi(s: &str) -> Cow<'_, str> {
    static RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").unwrap());
    RE.replace_all(s, "")
}

/// Line prefixes to drop from command output before logging.
pub struct FilterRule {
    pub skip_prefixes: &'static [&'static str],
}

impl FilterRule {
    pub const fn new(skip_prefixes: &'static [&'static str]) -> Self {
        Self { skip_prefixes }
    }

    fn should_skip(&self, line: &str) -> bool {
        line.is_empty() || self.skip_prefixes.iter().any(|p| line.starts_with(p))
    }

    fn log(&self, name: &str, output: &str) {
        let lines: Vec<_> = output
            .lines()
            .filter(|line| !self.should_skip(strip_ansi(line).trim()))
            .collect();

        if !lines.is_empty() {
            log!(name; "{}", lines.join("\n"));
        }
    }
}

/// Empty filter (no skipping).
pub const EMPTY_FILTER: FilterRule = FilterRule::new(&[]);
