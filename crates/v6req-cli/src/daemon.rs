//! Background mode
//!
//! `-d` re-executes the current binary as a detached child that serves on
//! the IPv6 loopback only. The parent reports the child's PID and exits.

use anyhow::{Context, Result};
use std::process::{Command, Stdio};

/// Hidden flag marking the re-executed child
pub const DAEMON_CHILD_FLAG: &str = "--daemon-child";

/// Arguments for the child: the parent's, minus the daemon flag
pub fn child_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out: Vec<String> = args
        .into_iter()
        .filter(|arg| arg != "-d" && arg != "--daemon")
        .collect();
    out.push(DAEMON_CHILD_FLAG.to_string());
    out
}

/// Start the detached child, returning its PID
pub fn spawn_detached() -> Result<u32> {
    let exe = std::env::current_exe().context("cannot locate current executable")?;
    let args = child_args(std::env::args().skip(1));

    let mut command = Command::new(exe);
    command
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let child = command.spawn().context("failed to start daemon process")?;
    Ok(child.id())
}
