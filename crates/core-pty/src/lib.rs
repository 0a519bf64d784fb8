//! POSIX pseudo-terminal plumbing: the master/slave pair and the shell
//! child process attached to it.

mod pty;
mod shell;

pub use pty::{Forked, Pty, PtyReader, ReadEvent};
pub use shell::{Shell, ShellExit};

use std::io;
use thiserror::Error;

/// Failures while establishing the pseudo-terminal or the child process.
/// All of these are fatal at startup; the host exits non-zero.
#[derive(Debug, Error)]
pub enum PtyError {
    #[error("posix_openpt failed: {0}")]
    Open(#[source] io::Error),
    #[error("grantpt failed: {0}")]
    Grant(#[source] io::Error),
    #[error("unlockpt failed: {0}")]
    Unlock(#[source] io::Error),
    #[error("fork failed: {0}")]
    Fork(#[source] io::Error),
    #[error("pty is not open")]
    NotOpen,
}

pub type Result<T> = std::result::Result<T, PtyError>;
