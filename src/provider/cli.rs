//! Provider command execution.
//!
//! Runs provider CLI commands and parses their JSON output.

use crate::error::TopologyError;
use colored::Colorize;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::process::Command;
use std::sync::OnceLock;

/// Largest stdout accepted from a single command.
const MAX_OUTPUT_BYTES: usize = 2_000_000;

/// Regex for splitting command strings while preserving quoted substrings.
static COMMAND_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_command_regex() -> &'static Regex {
    COMMAND_REGEX.get_or_init(|| {
        Regex::new(r#"'([^']*)'\s*|\"([^\"]*)\"\s*|([^'\s]*)\s*"#).expect("Invalid Regex")
    })
}

/// Run a shell command and return its stdout.
///
/// The command string is split on spaces, with quoted substrings kept whole.
///
/// # Returns
/// * `Ok(String)` - The stdout output on success
/// * `Err` - If the command fails, is empty or produces too much output
pub fn run(cmd: &str) -> Result<String, TopologyError> {
    log::trace!("run({cmd})", cmd = cmd.on_blue());

    let cmds: Vec<&str> = split_and_strip(cmd);
    let (program, args) = cmds
        .split_first()
        .ok_or_else(|| TopologyError::Provider("empty command".to_string()))?;

    let output = Command::new(program).args(args).output().map_err(|e| {
        log::error!("Command execution failed: {}", e);
        TopologyError::Provider(format!("failed to execute {program}: {e}"))
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        log::warn!(
            "{failed} to run {cmd} code={code:?}",
            failed = "failed".on_red(),
            cmd = cmd.on_blue(),
            code = output.status.code()
        );
        return Err(TopologyError::Provider(format!("{cmd}: {}", stderr.trim())));
    }

    log::debug!("Success cmd: {cmd} stdout.len()={}", output.stdout.len());
    if output.stdout.len() > MAX_OUTPUT_BYTES {
        return Err(TopologyError::Provider(format!(
            "response too large: {} bytes for command: {cmd}",
            output.stdout.len()
        )));
    }

    String::from_utf8(output.stdout)
        .map_err(|e| TopologyError::Provider(format!("invalid UTF-8 from {cmd}: {e}")))
}

/// Run a command and deserialize its JSON stdout, reporting the failing path.
pub fn run_json<T: DeserializeOwned>(cmd: &str) -> Result<T, TopologyError> {
    let output = run(cmd)?;
    parse_json(cmd, &output)
}

pub(crate) fn parse_json<T: DeserializeOwned>(cmd: &str, output: &str) -> Result<T, TopologyError> {
    let mut deserializer = serde_json::Deserializer::from_str(output);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        log::error!("OUTPUT START:\n\n{}\n\nOUTPUT END\n", output);
        TopologyError::Provider(format!(
            "error parsing output of {cmd}: path={} error={}",
            e.path(),
            e
        ))
    })
}

/// Split a command string on spaces, preserving quoted substrings.
fn split_and_strip(input: &str) -> Vec<&str> {
    get_command_regex()
        .find_iter(input)
        .map(|m| m.as_str().trim().trim_matches('\'').trim_matches('"'))
        .filter(|s| !s.is_empty())
        .collect()
}
