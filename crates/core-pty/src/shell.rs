//! The user's login shell running as a child of the PTY.

use crate::{Forked, Pty, Result};
use std::ffi::{CStr, CString};
use std::io;
use tracing::{error, info, warn};

/// How the shell child ended, as reported by `waitpid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellExit {
    Exited(i32),
    Signaled(i32),
}

/// Runs an actual shell (e.g. bash) in a child process, with an established
/// PTY. Destruction order matters to callers: drop the screen first, then
/// the shell, then the ring.
pub struct Shell {
    pty: Pty,
    pid: libc::pid_t,
    term: String,
    program: Option<String>,
}

impl Default for Shell {
    fn default() -> Self {
        Self::new()
    }
}

impl Shell {
    pub fn new() -> Self {
        Self {
            pty: Pty::new(),
            pid: -1,
            term: "xterm".to_string(),
            program: None,
        }
    }

    /// Override the `TERM` value exported to the child.
    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.term = term.into();
        self
    }

    /// Override the program to exec instead of the login shell.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// Open the PTY and fork the shell. In the child this never returns.
    pub fn start(&mut self) -> Result<()> {
        self.pty.open()?;
        match self.pty.fork()? {
            Forked::Parent(pid) => {
                self.pid = pid;
                Ok(())
            }
            Forked::Child => self.exec_child(),
        }
    }

    /// Child side: export TERM and replace the process image with the shell.
    fn exec_child(&self) -> ! {
        let term = CString::new(self.term.as_str()).unwrap_or_else(|_| c"xterm".to_owned());
        // SAFETY: setenv before exec, single-threaded child after fork.
        unsafe {
            libc::setenv(c"TERM".as_ptr(), term.as_ptr(), 1);
        }

        let program = self
            .program
            .clone()
            .unwrap_or_else(login_shell)
            .into_bytes();
        let program = CString::new(program).unwrap_or_else(|_| c"/bin/sh".to_owned());
        let argv = [program.as_ptr(), std::ptr::null()];
        // SAFETY: argv is NULL-terminated and program outlives the call;
        // execvp only returns on failure.
        unsafe {
            libc::execvp(program.as_ptr(), argv.as_ptr());
            let msg = b"shell: exec failed\n";
            libc::write(
                libc::STDERR_FILENO,
                msg.as_ptr() as *const libc::c_void,
                msg.len(),
            );
            libc::_exit(-1);
        }
    }

    pub fn pty(&self) -> &Pty {
        &self.pty
    }

    pub fn pty_mut(&mut self) -> &mut Pty {
        &mut self.pty
    }

    pub fn pid(&self) -> libc::pid_t {
        self.pid
    }

    /// Forward bytes to the shell's stdin.
    pub fn write(&self, data: &[u8]) -> io::Result<()> {
        self.pty.write(data)
    }

    /// Ask the child to hang up. `join` still has to reap it.
    pub fn stop(&self) {
        if self.pid > 0 {
            // SAFETY: pid belongs to the child this struct spawned.
            unsafe { libc::kill(self.pid, libc::SIGHUP) };
        }
    }

    /// Close the master and reap the child, logging how it went away.
    pub fn join(&mut self) -> Option<ShellExit> {
        self.pty.close();
        if self.pid <= 0 {
            return None;
        }
        let mut status: libc::c_int = 0;
        loop {
            // SAFETY: pid belongs to the child this struct spawned; status
            // is a valid out pointer.
            let rc = unsafe { libc::waitpid(self.pid, &mut status, 0) };
            if rc == self.pid {
                break;
            }
            if rc == -1 {
                let err = io::Error::last_os_error();
                if err.raw_os_error() == Some(libc::EINTR) {
                    continue;
                }
                error!(target: "pty.shell", %err, "waitpid failed");
                self.pid = -1;
                return None;
            }
        }
        self.pid = -1;

        if libc::WIFEXITED(status) {
            let code = libc::WEXITSTATUS(status);
            info!(target: "pty.shell", code, "shell exited");
            Some(ShellExit::Exited(code))
        } else if libc::WIFSIGNALED(status) {
            let signal = libc::WTERMSIG(status);
            warn!(target: "pty.shell", signal, "shell killed");
            Some(ShellExit::Signaled(signal))
        } else {
            None
        }
    }
}

impl Drop for Shell {
    fn drop(&mut self) {
        if self.pid > 0 {
            self.stop();
            self.join();
        }
    }
}

/// The user's login shell from the password database, `/bin/sh` when the
/// lookup comes up empty.
fn login_shell() -> String {
    // SAFETY: getpwuid returns a pointer into static libc storage; it is
    // only dereferenced while non-null and copied out immediately.
    unsafe {
        let pw = libc::getpwuid(libc::getuid());
        if pw.is_null() || (*pw).pw_shell.is_null() {
            return "/bin/sh".to_string();
        }
        CStr::from_ptr((*pw).pw_shell)
            .to_str()
            .unwrap_or("/bin/sh")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_shell_is_absolute() {
        let shell = login_shell();
        assert!(shell.starts_with('/'), "unexpected shell path: {shell}");
    }

    #[test]
    fn join_without_start_is_a_no_op() {
        let mut shell = Shell::new();
        assert_eq!(shell.join(), None);
        assert!(shell.pty().is_closed());
    }
}
