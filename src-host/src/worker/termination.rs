// Platform termination strategies for the worker process
//
// Unix delivers a signal to the worker's pid. Windows has no reliable signal
// delivery to detached consoles, so every path force-kills the process tree.

use std::fmt;

/// Why the supervisor is terminating a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// A new launch is replacing the current worker
    Relaunch,
    /// An explicit `terminate()` call
    Requested,
    /// The host itself is exiting
    HostExit,
}

/// How a worker is stopped on this platform.
///
/// Termination is best-effort: a process that is already gone is not an
/// error, and callers never wait for the exit.
pub trait TerminationStrategy: Send + Sync + fmt::Debug {
    fn terminate(&self, pid: u32, reason: TerminationReason);
}

/// Select the strategy for the host platform
pub fn for_host() -> Box<dyn TerminationStrategy> {
    #[cfg(windows)]
    {
        Box::new(TreeKill)
    }

    #[cfg(not(windows))]
    {
        Box::new(SignalTermination)
    }
}

/// SIGTERM on relaunch/terminate, SIGINT when the host exits
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalTermination;

#[cfg(unix)]
impl SignalTermination {
    fn signal_for(reason: TerminationReason) -> libc::c_int {
        match reason {
            TerminationReason::HostExit => libc::SIGINT,
            TerminationReason::Relaunch | TerminationReason::Requested => libc::SIGTERM,
        }
    }
}

#[cfg(unix)]
impl TerminationStrategy for SignalTermination {
    fn terminate(&self, pid: u32, reason: TerminationReason) {
        let Ok(pid) = libc::pid_t::try_from(pid) else {
            return;
        };
        let signal = Self::signal_for(reason);
        // Safety: kill(2) has no memory-safety preconditions
        let rc = unsafe { libc::kill(pid, signal) };
        if rc != 0 {
            tracing::debug!(
                pid,
                signal,
                error = %std::io::Error::last_os_error(),
                "worker signal not delivered"
            );
        }
    }
}

/// `taskkill /F /T` by pid, regardless of reason
#[derive(Debug, Default, Clone, Copy)]
pub struct TreeKill;

impl TerminationStrategy for TreeKill {
    fn terminate(&self, pid: u32, reason: TerminationReason) {
        tracing::debug!(pid, ?reason, "killing worker process tree");
        let spawned = std::process::Command::new("taskkill")
            .args(["/F", "/PID", &pid.to_string(), "/T"])
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn();
        if let Err(e) = spawned {
            tracing::debug!(pid, error = %e, "taskkill could not be started");
        }
    }
}
