//! PTY (pseudo-terminal) device.
//!
//! Creates a PTY pair sized to the configured grid, spawns the child under
//! the configured shell, and provides async read/write to the master side.

use std::ffi::CString;
use std::os::fd::{AsFd, AsRawFd, FromRawFd, IntoRawFd, OwnedFd};
use std::time::Duration;

use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::pty::{forkpty, Winsize};
use nix::sys::signal::{kill, signal, SigHandler, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{ForkResult, Pid};
use tokio::io::unix::AsyncFd;

use crate::error::{Error, Result};
use crate::session::SessionConfig;

/// The master fd must be non-blocking for `AsyncFd` readiness polling to
/// make sense.
fn set_non_blocking<F: AsRawFd>(fd: &F) -> nix::Result<()> {
    let current = OFlag::from_bits_truncate(fcntl(fd.as_raw_fd(), FcntlArg::F_GETFL)?);
    fcntl(fd.as_raw_fd(), FcntlArg::F_SETFL(current | OFlag::O_NONBLOCK))?;
    Ok(())
}

/// Non-blocking read; `None` means try again after the next readiness
/// event. Linux reports EIO on the master once every slave fd is closed,
/// which callers should treat as EOF, so it maps to a zero-length read.
fn nb_read<F: AsRawFd>(fd: &F, buf: &mut [u8]) -> nix::Result<Option<usize>> {
    match nix::unistd::read(fd.as_raw_fd(), buf) {
        Ok(n) => Ok(Some(n)),
        Err(Errno::EAGAIN) => Ok(None),
        Err(Errno::EIO) => Ok(Some(0)),
        Err(e) => Err(e),
    }
}

/// Non-blocking write; `None` means the kernel buffer is full and the
/// caller should await writability.
fn nb_write<F: AsFd>(fd: &F, buf: &[u8]) -> nix::Result<Option<usize>> {
    match nix::unistd::write(fd, buf) {
        Ok(n) => Ok(Some(n)),
        Err(Errno::EAGAIN) => Ok(None),
        Err(e) => Err(e),
    }
}

/// A running PTY with a child process attached.
pub struct Pty {
    master_fd: AsyncFd<OwnedFd>,
    child_pid: Pid,
}

impl Pty {
    /// Spawn the configured shell in a fresh PTY sized `rows × cols`, with
    /// the host environment plus `config.env`. With a command the shell
    /// runs `shell -c command`; without one it hosts an interactive
    /// session driven through `write`/`submit`.
    pub fn spawn(config: &SessionConfig) -> Result<Self> {
        let winsize = Winsize {
            ws_row: config.rows,
            ws_col: config.cols,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };

        let describe = || config.command.clone().unwrap_or_else(|| config.shell.clone());
        let cstr = |s: &str| {
            CString::new(s).map_err(|_| Error::Spawn {
                command: describe(),
                source: Errno::EINVAL,
            })
        };

        let shell = cstr(&config.shell)?;
        let mut argv = vec![shell.clone()];
        if let Some(command) = &config.command {
            argv.push(cstr("-c")?);
            argv.push(cstr(command)?);
        }

        // SAFETY: forkpty creates the PTY pair and forks; the child execs
        // immediately, so no shared state survives in it.
        let result = unsafe {
            forkpty(&winsize, None).map_err(|e| Error::Spawn {
                command: describe(),
                source: e,
            })?
        };

        match result.fork_result {
            ForkResult::Child => {
                // SAFETY: restoring SIGPIPE before exec; the child is
                // single-threaded at this point.
                unsafe { signal(Signal::SIGPIPE, SigHandler::SigDfl).ok() };
                std::env::set_var("TERM", "vt100");
                for (key, value) in &config.env {
                    std::env::set_var(key, value);
                }
                let _ = nix::unistd::execvp(&shell, &argv);
                // exec failed; nothing sensible to do but die with the
                // conventional code.
                std::process::exit(127);
            }
            ForkResult::Parent { child } => {
                let master = result.master;
                set_non_blocking(&master)?;

                // SAFETY: the master fd comes straight from forkpty and is
                // not used anywhere else after this transfer.
                let owned: OwnedFd = unsafe { OwnedFd::from_raw_fd(master.into_raw_fd()) };
                let async_fd = AsyncFd::new(owned)?;

                tracing::debug!(pid = child.as_raw(), command = %describe(), "spawned child in pty");

                Ok(Self {
                    master_fd: async_fd,
                    child_pid: child,
                })
            }
        }
    }

    /// Read child output. Returns 0 at EOF (child closed the slave side).
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        loop {
            let mut guard = self.master_fd.readable().await?;
            match nb_read(self.master_fd.get_ref(), buf)? {
                Some(n) => return Ok(n),
                None => guard.clear_ready(),
            }
        }
    }

    /// Write input to the child as if typed at the terminal.
    pub async fn write(&self, data: &[u8]) -> Result<()> {
        let mut written = 0;
        while written < data.len() {
            let mut guard = self.master_fd.writable().await?;
            match nb_write(self.master_fd.get_ref(), &data[written..])? {
                Some(n) => written += n,
                None => guard.clear_ready(),
            }
        }
        Ok(())
    }

    /// Send a signal to the child.
    pub fn kill(&self, sig: Signal) -> Result<()> {
        kill(self.child_pid, sig)?;
        Ok(())
    }

    /// Non-blocking reap attempt. `Ok(None)` means the child is still
    /// running; a waitpid failure is surfaced, never mistaken for an
    /// exit status.
    fn try_reap(&self) -> Result<Option<i32>> {
        match waitpid(self.child_pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(_, code)) => Ok(Some(code)),
            Ok(WaitStatus::Signaled(_, sig, _)) => Ok(Some(128 + sig as i32)),
            Ok(_) => Ok(None),
            Err(Errno::EINTR) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Wait for the child to exit on its own, polling until `deadline`.
    /// Returns `None` if it is still running when the deadline passes.
    pub async fn wait_until(&self, deadline: tokio::time::Instant) -> Result<Option<i32>> {
        loop {
            if let Some(code) = self.try_reap()? {
                return Ok(Some(code));
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// Terminate the child and reap it: SIGTERM, then SIGKILL once the
    /// grace period expires. Returns the child's exit code.
    pub async fn close(&self, grace: Duration) -> Result<i32> {
        kill(self.child_pid, Signal::SIGTERM).ok();

        let deadline = tokio::time::Instant::now() + grace;
        loop {
            if let Some(code) = self.try_reap()? {
                tracing::debug!(pid = self.child_pid.as_raw(), code, "child exited");
                return Ok(code);
            }
            if tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        tracing::debug!(pid = self.child_pid.as_raw(), "grace period expired, sending SIGKILL");
        kill(self.child_pid, Signal::SIGKILL).ok();
        let pid = self.child_pid;
        let status = tokio::task::spawn_blocking(move || waitpid(pid, None))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))??;
        match status {
            WaitStatus::Exited(_, code) => Ok(code),
            WaitStatus::Signaled(_, sig, _) => Ok(128 + sig as i32),
            _ => Ok(1),
        }
    }

    /// Best-effort synchronous kill, used by the session's drop guard.
    pub(crate) fn kill_now(&self) {
        kill(self.child_pid, Signal::SIGKILL).ok();
        waitpid(self.child_pid, Some(WaitPidFlag::WNOHANG)).ok();
    }
}
