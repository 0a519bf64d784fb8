//! Smelt entrypoint: wires a shell session to the host terminal.

mod paint;
mod term;

use anyhow::Result;
use clap::Parser;
use core_input::{Key, KeyAction, KeyEvent, KeyModifiers};
use core_session::{Clipboard, Session, SessionEvent};
use paint::Painter;
use std::path::PathBuf;
use std::sync::Once;
use term::CrosstermBackend;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "smelt", version, about = "Smelt terminal")]
struct Args {
    /// Optional configuration file path (overrides discovery of `smelt.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Program to run instead of the configured shell.
    #[arg(long = "shell")]
    pub shell: Option<String>,
}

/// Top-level event enum consumed by the central loop.
#[derive(Debug)]
enum Event {
    Session(SessionEvent),
    Input(crossterm::event::Event),
}

const EVENT_CHANNEL_CAP: usize = 1024;

struct AppStartup {
    log_guard: Option<WorkerGuard>,
}

impl AppStartup {
    fn new() -> Self {
        Self { log_guard: None }
    }

    fn configure_logging(&mut self) -> Result<()> {
        let log_dir = std::path::Path::new(".");
        let log_path = log_dir.join("smelt.log");
        if log_path.exists() {
            let _ = std::fs::remove_file(&log_path);
        }

        let file_appender = tracing_appender::rolling::never(log_dir, "smelt.log");
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        match tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(nb_writer)
            .try_init()
        {
            Ok(_) => {
                self.log_guard = Some(guard);
            }
            Err(_err) => {
                // Global tracing subscriber already installed; drop guard so
                // the writer shuts down.
            }
        }
        Ok(())
    }

    fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }
}

/// In-process clipboard standing in for the windowing system's.
#[derive(Default)]
struct HostClipboard {
    contents: Option<String>,
}

impl Clipboard for HostClipboard {
    fn set_contents(&mut self, text: &str) {
        self.contents = Some(text.to_string());
    }

    fn get_contents(&mut self) -> Option<String> {
        self.contents.clone()
    }
}

/// What a host input event means for the session.
#[derive(Debug, PartialEq, Eq)]
enum Translated {
    Key(KeyEvent),
    Char(char),
}

fn convert_modifiers(mods: crossterm::event::KeyModifiers) -> KeyModifiers {
    use crossterm::event::KeyModifiers as M;
    let mut out = KeyModifiers::empty();
    if mods.contains(M::CONTROL) {
        out |= KeyModifiers::CTRL;
    }
    if mods.contains(M::ALT) {
        out |= KeyModifiers::ALT;
    }
    if mods.contains(M::SHIFT) {
        out |= KeyModifiers::SHIFT;
    }
    out
}

fn convert_action(kind: crossterm::event::KeyEventKind) -> KeyAction {
    use crossterm::event::KeyEventKind as K;
    match kind {
        K::Press => KeyAction::Press,
        K::Repeat => KeyAction::Repeat,
        K::Release => KeyAction::Release,
    }
}

/// Map a crossterm key event onto the session's input model. Printable
/// characters without chord modifiers become character events; everything
/// else goes through the key encoder.
fn translate_key(ev: &crossterm::event::KeyEvent) -> Option<Translated> {
    use crossterm::event::KeyCode as K;
    let mods = convert_modifiers(ev.modifiers);
    let action = convert_action(ev.kind);

    let key = match ev.code {
        K::Char(c) => {
            if mods.intersects(KeyModifiers::CTRL) {
                Key::Char(c)
            } else if action == KeyAction::Release {
                return None;
            } else {
                // The terminal already applied shift to the code point.
                return Some(Translated::Char(c));
            }
        }
        K::Esc => Key::Escape,
        K::Enter => Key::Enter,
        K::Backspace => Key::Backspace,
        K::Tab => Key::Tab,
        K::Up => Key::Up,
        K::Down => Key::Down,
        K::Left => Key::Left,
        K::Right => Key::Right,
        K::Home => Key::Home,
        K::End => Key::End,
        K::PageUp => Key::PageUp,
        K::PageDown => Key::PageDown,
        K::Insert => Key::Insert,
        K::Delete => Key::Delete,
        K::F(n) => Key::F(n),
        _ => return None,
    };
    Some(Translated::Key(KeyEvent { action, key, mods }))
}

struct Runtime {
    session: Session,
    painter: Painter,
    clipboard: HostClipboard,
    rx: mpsc::Receiver<Event>,
}

impl Runtime {
    async fn run(&mut self) -> Result<()> {
        self.painter.paint(self.session.screen())?;

        while let Some(event) = self.rx.recv().await {
            match event {
                Event::Session(SessionEvent::Wakeup) => {
                    if self.session.pump() {
                        if self.session.screen_mut().take_bell() {
                            debug!(target: "runtime", "bell");
                        }
                        self.painter.paint(self.session.screen())?;
                    }
                    // The exit notice can coalesce away under load; the
                    // flag is authoritative.
                    if self.session.is_shell_exited() {
                        info!(target: "runtime", "shell exited, closing");
                        break;
                    }
                }
                Event::Session(SessionEvent::ShellExited) => {
                    info!(target: "runtime", "shell exited, closing");
                    self.session.pump();
                    break;
                }
                Event::Input(input) => {
                    if self.handle_input(input)? {
                        self.painter.paint(self.session.screen())?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Returns true when the event warrants a repaint.
    fn handle_input(&mut self, input: crossterm::event::Event) -> Result<bool> {
        use crossterm::event::{Event as CtEvent, MouseEventKind};
        match input {
            CtEvent::Key(key) => match translate_key(&key) {
                Some(Translated::Char(c)) => {
                    self.session.char_event(c);
                    Ok(false)
                }
                Some(Translated::Key(ev)) => {
                    let handled = self.session.key_event(&ev, &mut self.clipboard);
                    Ok(handled)
                }
                None => Ok(false),
            },
            CtEvent::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollUp => {
                    self.session.scroll_event(1);
                    Ok(true)
                }
                MouseEventKind::ScrollDown => {
                    self.session.scroll_event(-1);
                    Ok(true)
                }
                _ => Ok(false),
            },
            CtEvent::Resize(cols, rows) => {
                self.session.resize(cols, rows);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut startup = AppStartup::new();
    startup.configure_logging()?;
    AppStartup::install_panic_hook();
    info!(target: "runtime", "startup");

    let mut config = core_config::load_from(args.config.clone())?;
    if let Some(shell) = args.shell {
        config.shell.program = Some(shell);
    }
    if let Ok((cols, rows)) = crossterm::terminal::size() {
        config.screen.columns = cols;
        config.screen.rows = rows;
    }

    let (session, mut session_rx) = Session::spawn(&config).inspect_err(|err| {
        error!(target: "runtime", %err, "failed to start session");
    })?;

    let mut backend = CrosstermBackend::new();
    backend.set_title("Smelt")?;
    let _terminal_guard = backend.enter_guard()?;

    let (tx, rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);

    // Session notifications feed the central loop.
    let session_tx = tx.clone();
    tokio::spawn(async move {
        while let Some(ev) = session_rx.recv().await {
            if session_tx.send(Event::Session(ev)).await.is_err() {
                break;
            }
        }
    });

    // Blocking input thread; backpressure parks it rather than dropping
    // keystrokes.
    std::thread::Builder::new()
        .name("host-input".into())
        .spawn(move || {
            loop {
                match crossterm::event::read() {
                    Ok(ev) => {
                        if tx.blocking_send(Event::Input(ev)).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        error!(target: "runtime", %err, "input read failed");
                        break;
                    }
                }
            }
        })?;

    let mut runtime = Runtime {
        session,
        painter: Painter::new(),
        clipboard: HostClipboard::default(),
        rx,
    };
    runtime.run().await?;

    let exit = runtime.session.shutdown();
    info!(target: "runtime", ?exit, "shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEventKind, KeyEventState};

    fn ct_key(
        code: KeyCode,
        modifiers: crossterm::event::KeyModifiers,
        kind: KeyEventKind,
    ) -> crossterm::event::KeyEvent {
        crossterm::event::KeyEvent {
            code,
            modifiers,
            kind,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn printable_chars_become_char_events() {
        use crossterm::event::KeyModifiers as M;
        let ev = ct_key(KeyCode::Char('q'), M::NONE, KeyEventKind::Press);
        assert_eq!(translate_key(&ev), Some(Translated::Char('q')));
        // Shifted characters arrive pre-shifted.
        let ev = ct_key(KeyCode::Char('Q'), M::SHIFT, KeyEventKind::Press);
        assert_eq!(translate_key(&ev), Some(Translated::Char('Q')));
    }

    #[test]
    fn ctrl_chords_become_key_events() {
        use crossterm::event::KeyModifiers as M;
        let ev = ct_key(KeyCode::Char('a'), M::CONTROL, KeyEventKind::Press);
        match translate_key(&ev) {
            Some(Translated::Key(key)) => {
                assert_eq!(key.key, Key::Char('a'));
                assert_eq!(key.mods, KeyModifiers::CTRL);
            }
            other => panic!("unexpected translation: {other:?}"),
        }
    }

    #[test]
    fn special_keys_map_to_the_session_model() {
        use crossterm::event::KeyModifiers as M;
        let cases = [
            (KeyCode::Esc, Key::Escape),
            (KeyCode::Enter, Key::Enter),
            (KeyCode::Up, Key::Up),
            (KeyCode::F(5), Key::F(5)),
            (KeyCode::PageDown, Key::PageDown),
        ];
        for (code, expected) in cases {
            let ev = ct_key(code, M::NONE, KeyEventKind::Press);
            match translate_key(&ev) {
                Some(Translated::Key(key)) => assert_eq!(key.key, expected),
                other => panic!("unexpected translation for {code:?}: {other:?}"),
            }
        }
    }

    #[test]
    fn char_release_events_are_dropped() {
        use crossterm::event::KeyModifiers as M;
        let ev = ct_key(KeyCode::Char('q'), M::NONE, KeyEventKind::Release);
        assert_eq!(translate_key(&ev), None);
        // Special-key releases survive translation; the encoder drops them.
        let ev = ct_key(KeyCode::Enter, M::NONE, KeyEventKind::Release);
        match translate_key(&ev) {
            Some(Translated::Key(key)) => assert_eq!(key.action, KeyAction::Release),
            other => panic!("unexpected translation: {other:?}"),
        }
    }
}
