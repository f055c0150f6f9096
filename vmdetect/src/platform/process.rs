// SPDX-License-Identifier: Apache-2.0

//! Subprocess-backed probes: run a read-only diagnostic command and hand
//! its stdout back as text.

use std::process::Command;

/// Runs `cmd` with `args`, returning trimmed stdout on a zero exit status.
/// A nonzero exit status, a missing binary, or non-UTF8 output all collapse
/// to `None` (logged at `trace`/`warn` respectively) — matching the
/// filesystem primitives' policy of not distinguishing failure modes past
/// this boundary.
#[must_use]
pub fn run(cmd: &str, args: &[&str]) -> Option<String> {
    match Command::new(cmd).args(args).output() {
        Ok(output) if output.status.success() => {
            String::from_utf8(output.stdout).ok().map(|s| s.trim().to_string())
        }
        Ok(output) => {
            log::trace!("{cmd} exited with {}", output.status);
            None
        }
        Err(err) => {
            log::trace!("failed to spawn {cmd}: {err}");
            None
        }
    }
}

/// True if `cmd` can be spawned at all and its `run` output's lowercase
/// form contains `needle`. Convenience wrapper for the common
/// run-then-substring-match probe shape.
#[must_use]
pub fn run_output_contains(cmd: &str, args: &[&str], needle: &str) -> bool {
    run(cmd, args)
        .map(|out| out.to_lowercase().contains(&needle.to_lowercase()))
        .unwrap_or(false)
}
