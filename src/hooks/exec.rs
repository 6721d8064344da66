//! Shell command execution with prefixed, streamed output.

use crate::error::{HookError, Result};
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};

/// Run `command` through `sh -c` inside `working_dir`.
///
/// Stdout is echoed line by line as `<label> | <line>` while the command runs;
/// stderr is inherited. A non-zero exit is [`HookError::CommandFailed`].
pub fn run_shell(command: &str, working_dir: &Path, label: &str) -> Result<()> {
    if !working_dir.is_absolute() {
        return Err(HookError::RelativeWorkingDir {
            path: working_dir.to_path_buf(),
        }
        .into());
    }

    log::debug!("{} | $ {}", label, command);
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|source| HookError::Spawn {
            command: command.to_string(),
            source,
        })?;

    let streamed = match child.stdout.take() {
        Some(stdout) => echo_prefixed(stdout, label),
        None => Ok(()),
    };

    // Reap the child even when reading its output failed
    let status = child.wait()?;
    streamed?;
    if !status.success() {
        return Err(HookError::CommandFailed {
            label: label.to_string(),
            command: command.to_string(),
            status: status.to_string(),
        }
        .into());
    }

    Ok(())
}

/// Echo `reader` line by line; bytes that are not UTF-8 are printed lossily
fn echo_prefixed<R: Read>(reader: R, label: &str) -> io::Result<()> {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        println!("{} | {}", label, line.trim_end_matches(['\r', '\n']));
    }
}

/// Run `commands` in order, labelled `<prefix>.<index>`; stops at the first failure
pub fn run_command_list<S: AsRef<str>>(commands: &[S], working_dir: &Path, prefix: &str) -> Result<()> {
    for (index, command) in commands.iter().enumerate() {
        run_shell(command.as_ref(), working_dir, &format!("{}.{}", prefix, index))?;
    }
    Ok(())
}
