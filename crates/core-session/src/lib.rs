//! Session glue: a reader thread pumps PTY output into the byte ring, the
//! renderer's tick drains the ring through the decoder into the screen,
//! and user input flows back out through the PTY.
//!
//! Channel policy: the ring carries the payload; the bounded event channel
//! carries only wakeups and lifecycle notices. Wakeups coalesce: the
//! reader uses `try_send`, and a full channel means a wakeup is already
//! pending, so dropping the new one loses nothing — whoever drains the
//! pending wakeup drains the whole ring. The reader therefore never parks
//! on the channel, only on the PTY read or on a full ring. Shell exit is
//! published through an atomic flag first; the `ShellExited` event is a
//! best-effort nudge on top of it.

use anyhow::{Context, Result};
use core_config::Config;
use core_decode::Decoder;
use core_input::{Encoded, KeyEvent, encode_char, encode_key};
use core_pty::{PtyReader, Shell, ShellExit};
use core_ring::{Consumer, Producer, ring};
use core_screen::Screen;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Capacity of the PTY output ring.
pub const RING_CAPACITY: usize = 64 * 1024;

/// Capacity of the session event channel.
pub const EVENT_CHANNEL_CAP: usize = 64;

/// Notifications delivered to the host's event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// New bytes are waiting in the ring; pump and refresh.
    Wakeup,
    /// The PTY reached end of file or failed hard; the child is gone and
    /// should be reaped via [`Session::shutdown`].
    ShellExited,
}

/// Host-provided clipboard seam (the GUI window in the real program).
pub trait Clipboard {
    fn set_contents(&mut self, text: &str);
    fn get_contents(&mut self) -> Option<String>;
}

/// One live terminal session: shell child, byte ring, decoder, screen.
///
/// Field order is load-bearing: the screen goes first, then the shell,
/// then the ring consumer, so teardown happens in that order.
pub struct Session {
    screen: Screen,
    shell: Shell,
    decoder: Decoder,
    consumer: Consumer<RING_CAPACITY>,
    reader: Option<thread::JoinHandle<()>>,
    pty_eof: Arc<AtomicBool>,
}

impl Session {
    /// Start the shell and the reader thread. Returns the session plus the
    /// event stream the host loop should consume.
    pub fn spawn(config: &Config) -> Result<(Self, mpsc::Receiver<SessionEvent>)> {
        let cols = usize::from(config.screen.columns);
        let rows = usize::from(config.screen.rows);

        let mut shell = Shell::new().with_term(&config.shell.term);
        if let Some(program) = &config.shell.program {
            shell = shell.with_program(program);
        }
        shell.start().context("starting shell")?;
        shell.pty().set_winsize(cols as u16, rows as u16);

        let screen = Screen::new(cols, rows).with_scrollback_limit(config.screen.scrollback_limit);

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAP);
        let (producer, consumer) = ring::<RING_CAPACITY>();
        let pty_eof = Arc::new(AtomicBool::new(false));

        let reader = {
            let pty = shell.pty().reader();
            let eof = Arc::clone(&pty_eof);
            thread::Builder::new()
                .name("pty-reader".into())
                .spawn(move || reader_main(pty, producer, tx, eof))
                .context("spawning pty reader thread")?
        };

        info!(target: "session", pid = shell.pid(), cols, rows, "session started");
        Ok((
            Self {
                screen,
                shell,
                decoder: Decoder::new(),
                consumer,
                reader: Some(reader),
                pty_eof,
            },
            rx,
        ))
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut Screen {
        &mut self.screen
    }

    /// True once the reader observed EOF on the master.
    pub fn is_shell_exited(&self) -> bool {
        self.pty_eof.load(Ordering::Acquire)
    }

    /// Per-frame tick: drain the ring through the decoder and flush any
    /// replies (DA) back to the PTY. Returns true when the screen changed.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        loop {
            let span = self.consumer.read_buffer();
            if span.is_empty() {
                break;
            }
            let n = span.len();
            self.decoder.decode_input(&mut self.screen, span);
            self.consumer.bytes_read(n);
            changed = true;
        }
        let replies = self.decoder.drain_replies();
        if !replies.is_empty() {
            let _ = self.shell.write(&replies);
        }
        changed
    }

    /// Key event from the host. Returns true when handled; any handled
    /// keystroke first snaps the view out of scrollback.
    pub fn key_event(&mut self, ev: &KeyEvent, clipboard: &mut dyn Clipboard) -> bool {
        let app_cursor_keys = self.screen.modes().app_cursor_keys;
        let Some(encoded) = encode_key(ev, app_cursor_keys) else {
            return false;
        };
        self.screen.cancel_scrollback();
        match encoded {
            Encoded::Bytes(bytes) => {
                let _ = self.shell.write(&bytes);
            }
            Encoded::Copy => {
                // No selection model yet: the line under the cursor.
                let y = self.screen.cursor_pos().y;
                let text = self
                    .screen
                    .line(y)
                    .map(|line| line.content())
                    .unwrap_or_default();
                clipboard.set_contents(&text);
            }
            Encoded::Paste => {
                // Bracketed-paste framing is recognized as a mode but not
                // applied; the clipboard goes out as literal bytes.
                if let Some(text) = clipboard.get_contents() {
                    let _ = self.shell.write(text.as_bytes());
                }
            }
        }
        true
    }

    /// Printable input from the host.
    pub fn char_event(&mut self, code_point: char) {
        self.screen.cancel_scrollback();
        let _ = self.shell.write(&encode_char(code_point));
    }

    /// Scroll wheel: moves the view through history, never touches the PTY.
    pub fn scroll_event(&mut self, delta: isize) {
        self.screen.scrollback(delta);
    }

    /// Write literal text to the shell (paste path and tests).
    pub fn send_text(&mut self, text: &str) {
        self.screen.cancel_scrollback();
        let _ = self.shell.write(text.as_bytes());
    }

    /// Propagate a window resize to the grid and the child.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.screen.resize(usize::from(cols), usize::from(rows));
        self.shell.pty().set_winsize(cols, rows);
    }

    /// Tear the session down: hang up the child, let the reader drain out,
    /// close the master, reap. Safe to call more than once.
    pub fn shutdown(&mut self) -> Option<ShellExit> {
        self.shell.stop();
        if let Some(reader) = self.reader.take() {
            // The reader may be parked on a full ring; keep draining until
            // it observes EOF and exits.
            while !reader.is_finished() {
                self.pump();
                thread::sleep(Duration::from_millis(1));
            }
            let _ = reader.join();
            self.pump();
        }
        let exit = self.shell.join();
        debug!(target: "session", ?exit, "session shut down");
        exit
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.reader.is_some() {
            self.shutdown();
        }
    }
}

/// Producer side: blocking PTY reads straight into ring spans, one wakeup
/// per published chunk. Exits on EOF or a hard read error.
fn reader_main(
    pty: PtyReader,
    mut producer: Producer<RING_CAPACITY>,
    tx: mpsc::Sender<SessionEvent>,
    eof: Arc<AtomicBool>,
) {
    use tokio::sync::mpsc::error::TrySendError;
    loop {
        let span = producer.acquire_write_buffer();
        match pty.read(span) {
            Ok(0) => {
                debug!(target: "session", "pty slave closed");
                break;
            }
            Err(_) => break,
            Ok(n) => {
                producer.bytes_written(n);
                match tx.try_send(SessionEvent::Wakeup) {
                    // Full: a wakeup is already pending, coalesce.
                    Ok(()) | Err(TrySendError::Full(_)) => {}
                    Err(TrySendError::Closed(_)) => {
                        // Host loop is gone; stop reading.
                        break;
                    }
                }
                renderer_yield();
            }
        }
    }
    eof.store(true, Ordering::Release);
    let _ = tx.try_send(SessionEvent::ShellExited);
}

/// Give the render thread a chance to pick up the wakeup. On macOS a
/// strict yield is not enough for the GL context handover, so sleep a
/// moment instead.
#[cfg(target_os = "macos")]
fn renderer_yield() {
    thread::sleep(Duration::from_micros(500));
}

#[cfg(not(target_os = "macos"))]
fn renderer_yield() {
    thread::yield_now();
}
