//! Master side of a pseudo-terminal pair, plus the fork that wires the
//! slave side onto a child's standard streams.

use crate::{PtyError, Result};
use std::io;
use std::os::unix::io::RawFd;
use tracing::{debug, error, info};

/// Outcome of [`Pty::fork`]. In the child the slave device is already duped
/// onto fds 0/1/2 and the master is closed; the caller is expected to exec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forked {
    Parent(libc::pid_t),
    Child,
}

/// Readiness reported by [`Pty::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadEvent {
    Readable,
    Closed,
}

/// Owner of the master file descriptor. Created closed; `open` allocates
/// the master and authorizes the slave; `read`/`write` are valid only while
/// the master is open. Dropping closes.
pub struct Pty {
    master: RawFd,
}

impl Default for Pty {
    fn default() -> Self {
        Self::new()
    }
}

impl Pty {
    pub fn new() -> Self {
        Self { master: -1 }
    }

    /// Acquire the master and authorize the slave device.
    pub fn open(&mut self) -> Result<()> {
        // SAFETY: plain syscalls; the returned fd is owned by self and
        // closed exactly once.
        let master = unsafe { libc::posix_openpt(libc::O_RDWR) };
        if master == -1 {
            let err = io::Error::last_os_error();
            error!(target: "pty", %err, "posix_openpt failed");
            return Err(PtyError::Open(err));
        }
        if unsafe { libc::grantpt(master) } == -1 {
            let err = io::Error::last_os_error();
            error!(target: "pty", %err, "grantpt failed");
            unsafe { libc::close(master) };
            return Err(PtyError::Grant(err));
        }
        if unsafe { libc::unlockpt(master) } == -1 {
            let err = io::Error::last_os_error();
            error!(target: "pty", %err, "unlockpt failed");
            unsafe { libc::close(master) };
            return Err(PtyError::Unlock(err));
        }
        self.master = master;
        info!(target: "pty", master, "pty open");
        Ok(())
    }

    /// Fork a child with the slave side as its controlling terminal.
    ///
    /// The parent gets `Forked::Parent(pid)`. The child resolves the slave
    /// device, closes the master, starts a new session, acquires the
    /// controlling TTY, dups the slave onto stdin/stdout/stderr, and
    /// returns `Forked::Child`; any failure on that path `_exit(-1)`s.
    pub fn fork(&mut self) -> Result<Forked> {
        if self.master == -1 {
            error!(target: "pty", "pty not initialized, cannot fork");
            return Err(PtyError::NotOpen);
        }

        // SAFETY: fork itself is always permitted; the child restricts
        // itself to async-signal-safe calls until exec.
        let pid = unsafe { libc::fork() };
        if pid == -1 {
            let err = io::Error::last_os_error();
            error!(target: "pty", %err, "fork failed");
            return Err(PtyError::Fork(err));
        }
        if pid != 0 {
            info!(target: "pty", child = pid, "pty fork");
            return Ok(Forked::Parent(pid));
        }

        // === child fall-through ===
        // SAFETY: open/setsid/ioctl/dup2/close on fds the child owns;
        // every failure path diverges through _exit.
        unsafe {
            let mut slave_name = [0 as libc::c_char; 64];
            if libc::ptsname_r(self.master, slave_name.as_mut_ptr(), slave_name.len()) != 0 {
                child_fail("ptsname_r");
            }

            // No longer needed in the child.
            libc::close(self.master);

            let slave_fd = libc::open(slave_name.as_ptr(), libc::O_RDWR);
            if slave_fd == -1 {
                child_fail("open(slave)");
            }

            if libc::setsid() == -1 {
                child_fail("setsid");
            }

            #[cfg(any(target_os = "linux", target_os = "macos"))]
            if libc::ioctl(slave_fd, libc::TIOCSCTTY as _, 0) == -1 {
                child_fail("ioctl(TIOCSCTTY)");
            }

            if libc::dup2(slave_fd, libc::STDIN_FILENO) != libc::STDIN_FILENO
                || libc::dup2(slave_fd, libc::STDOUT_FILENO) != libc::STDOUT_FILENO
                || libc::dup2(slave_fd, libc::STDERR_FILENO) != libc::STDERR_FILENO
            {
                child_fail("dup2");
            }
            libc::close(slave_fd);
        }
        self.master = -1;
        Ok(Forked::Child)
    }

    /// Blocking read from the master. `EINTR`/`EAGAIN` are retried
    /// internally; `Ok(0)` is end of file (the slave side is gone).
    pub fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            // SAFETY: buf is a valid writable region of buf.len() bytes.
            let n = unsafe {
                libc::read(self.master, buf.as_mut_ptr() as *mut libc::c_void, buf.len())
            };
            if n >= 0 {
                return Ok(n as usize);
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EINTR) | Some(libc::EAGAIN) => continue,
                _ => {
                    error!(target: "pty", %err, "read failed");
                    return Err(err);
                }
            }
        }
    }

    /// Blocking write to the master; loops until the whole buffer is out.
    pub fn write(&self, mut data: &[u8]) -> io::Result<()> {
        while !data.is_empty() {
            // SAFETY: data is a valid readable region of data.len() bytes.
            let n = unsafe {
                libc::write(self.master, data.as_ptr() as *const libc::c_void, data.len())
            };
            if n < 0 {
                let err = io::Error::last_os_error();
                if err.raw_os_error() == Some(libc::EINTR) {
                    continue;
                }
                error!(target: "pty", %err, "write failed");
                return Err(err);
            }
            data = &data[n as usize..];
        }
        Ok(())
    }

    /// Wait for the master to become readable (level-triggered, no timeout).
    pub fn poll(&self) -> io::Result<ReadEvent> {
        let mut pfd = libc::pollfd {
            fd: self.master,
            events: libc::POLLIN,
            revents: 0,
        };
        loop {
            // SAFETY: pfd is a valid pollfd for the duration of the call.
            let rc = unsafe { libc::poll(&mut pfd, 1, -1) };
            if rc == -1 {
                let err = io::Error::last_os_error();
                if err.raw_os_error() == Some(libc::EINTR) {
                    continue;
                }
                debug!(target: "pty", %err, "poll failed");
                return Err(err);
            }
            if pfd.revents & (libc::POLLERR | libc::POLLHUP) != 0 {
                return Ok(ReadEvent::Closed);
            }
            if pfd.revents & libc::POLLIN != 0 {
                return Ok(ReadEvent::Readable);
            }
        }
    }

    /// Push the window size (in character cells) to the slave side.
    pub fn set_winsize(&self, cols: u16, rows: u16) {
        let ws = libc::winsize {
            ws_row: rows,
            ws_col: cols,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        // SAFETY: ws is initialized and the ioctl only reads it.
        if unsafe { libc::ioctl(self.master, libc::TIOCSWINSZ, &ws) } == -1 {
            let err = io::Error::last_os_error();
            error!(target: "pty", %err, "ioctl(TIOCSWINSZ) failed");
        }
    }

    /// The master fd, for external event loops.
    pub fn fileno(&self) -> RawFd {
        self.master
    }

    /// A non-owning read handle for a dedicated reader thread. The caller
    /// must join that thread before closing the master.
    pub fn reader(&self) -> PtyReader {
        PtyReader { master: self.master }
    }

    pub fn is_closed(&self) -> bool {
        self.master == -1
    }

    /// Release the master. Idempotent.
    pub fn close(&mut self) {
        if self.master != -1 {
            // SAFETY: self.master is an fd we own; it is closed once.
            unsafe { libc::close(self.master) };
            self.master = -1;
        }
    }
}

impl Drop for Pty {
    fn drop(&mut self) {
        self.close();
    }
}

/// Borrowed view of the master fd with the same blocking-read semantics as
/// [`Pty::read`]. Does not close on drop.
#[derive(Debug, Clone, Copy)]
pub struct PtyReader {
    master: RawFd,
}

impl PtyReader {
    pub fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            // SAFETY: buf is a valid writable region of buf.len() bytes.
            let n = unsafe {
                libc::read(self.master, buf.as_mut_ptr() as *mut libc::c_void, buf.len())
            };
            if n >= 0 {
                return Ok(n as usize);
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EINTR) | Some(libc::EAGAIN) => continue,
                _ => {
                    error!(target: "pty", %err, "read failed");
                    return Err(err);
                }
            }
        }
    }
}

/// Report a child-side setup failure and die. Only raw `write` is safe
/// between fork and exec.
fn child_fail(context: &str) -> ! {
    let msg = format!("pty child: {context} failed\n");
    // SAFETY: write is async-signal-safe; stderr is valid in the child.
    unsafe {
        libc::write(
            libc::STDERR_FILENO,
            msg.as_ptr() as *const libc::c_void,
            msg.len(),
        );
        libc::_exit(-1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_closed() {
        let pty = Pty::new();
        assert!(pty.is_closed());
        assert_eq!(pty.fileno(), -1);
    }

    #[test]
    fn fork_before_open_is_rejected() {
        let mut pty = Pty::new();
        assert!(matches!(pty.fork(), Err(PtyError::NotOpen)));
    }

    #[test]
    fn open_then_close_is_idempotent() {
        let mut pty = Pty::new();
        pty.open().expect("posix_openpt should succeed");
        assert!(!pty.is_closed());
        assert!(pty.fileno() >= 0);
        pty.close();
        assert!(pty.is_closed());
        pty.close();
        assert!(pty.is_closed());
    }
}
