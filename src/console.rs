//! Line-oriented console surface.
//!
//! Input arrives as whole lines from a reader thread, Ctrl-C arrives through a
//! signal thread, and run events arrive from the worker. All of them are
//! funnelled into one channel so `App` is only ever mutated on the loop thread.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use signal_hook::iterator::{Handle, Signals};

use crate::app::{App, Message, Mode, Role, RunId};
use crate::runtime::{lock_unpoisoned, RuntimeController, UiEvent};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

const ANSI_RESET: &str = "\x1b[0m";
const ANSI_DIM: &str = "\x1b[2m";
const ANSI_BOLD_RED: &str = "\x1b[1;31m";
const ANSI_CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Incremental renderer for the `App` transcript.
///
/// Only messages added since the previous render are written, so the log view
/// grows like a terminal scrollback.
pub struct Console<W: Write> {
    out: W,
    color: bool,
    rendered: usize,
    generation: u64,
    announced_run: Option<RunId>,
}

impl Console<io::Stdout> {
    /// Writes to stdout, with colors only when stdout is a terminal.
    pub fn stdout() -> Self {
        Self::new(io::stdout(), stdout_is_terminal())
    }
}

impl<W: Write> Console<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self {
            out,
            color,
            rendered: 0,
            generation: 0,
            announced_run: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn banner(&mut self, app: &App) -> io::Result<()> {
        writeln!(self.out, "Gemini Workload Logger")?;
        if let Some(label) = app.provider_label() {
            self.styled(ANSI_DIM, &format!("Provider: {label}"))?;
        }
        self.styled(ANSI_DIM, &app.session().label())?;
        self.styled(ANSI_DIM, crate::app::HELP_TEXT)?;
        self.out.flush()
    }

    /// Writes what changed since the last call. Returns true when anything was written.
    pub fn render(&mut self, app: &App) -> io::Result<bool> {
        let mut wrote = false;

        if app.view_generation != self.generation {
            self.generation = app.view_generation;
            self.rendered = 0;
            if self.color {
                write!(self.out, "{ANSI_CLEAR_SCREEN}")?;
            }
            wrote = true;
        }

        let start = self.rendered.min(app.transcript.len());
        for message in &app.transcript[start..] {
            self.message(message)?;
            wrote = true;
        }
        self.rendered = app.transcript.len();

        if let Mode::Running { run_id } = app.mode {
            if self.announced_run != Some(run_id) {
                self.announced_run = Some(run_id);
                let label = app.provider_label().unwrap_or("provider");
                self.styled(ANSI_DIM, &format!("... rephrasing with {label}"))?;
                wrote = true;
            }
        }

        if wrote {
            self.out.flush()?;
        }
        Ok(wrote)
    }

    fn message(&mut self, message: &Message) -> io::Result<()> {
        match message.role {
            Role::Entry => writeln!(self.out, "{}", message.content),
            Role::Notice => self.styled(ANSI_DIM, &message.content),
            Role::Error => self.styled(ANSI_BOLD_RED, &format!("Error: {}", message.content)),
        }
    }

    fn styled(&mut self, style: &str, text: &str) -> io::Result<()> {
        if self.color {
            writeln!(self.out, "{style}{text}{ANSI_RESET}")
        } else {
            writeln!(self.out, "{text}")
        }
    }
}

fn stdout_is_terminal() -> bool {
    // SAFETY: `isatty` only inspects the descriptor.
    unsafe { libc::isatty(libc::STDOUT_FILENO) == 1 }
}

/// Forwards stdin lines until end of file.
pub fn spawn_stdin_reader(events: Sender<UiEvent>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("workload-logger-stdin".to_string())
        .spawn(move || forward_lines(io::stdin().lock(), &events))
}

/// Sends each line of `reader` as [`UiEvent::Line`], then [`UiEvent::InputClosed`].
///
/// Lines that are not valid UTF-8 are decoded lossily. Only end of file or a
/// read error closes the input.
pub fn forward_lines<R: BufRead>(mut reader: R, events: &Sender<UiEvent>) {
    let mut raw = Vec::new();
    loop {
        raw.clear();
        match reader.read_until(b'\n', &mut raw) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&raw);
                let line = line.trim_end_matches(['\n', '\r']).to_string();
                if events.send(UiEvent::Line(line)).is_err() {
                    return;
                }
            }
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => {
                tracing::warn!(%error, "stdin read failed");
                break;
            }
        }
    }
    let _ = events.send(UiEvent::InputClosed);
}

/// Keeps SIGINT routed to the console loop while alive.
pub struct InterruptGuard {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Turns SIGINT into [`UiEvent::Interrupt`] instead of terminating the process.
pub fn install_interrupt_handler(events: Sender<UiEvent>) -> io::Result<InterruptGuard> {
    let mut signals = Signals::new([libc::SIGINT])?;
    let handle = signals.handle();
    let thread = thread::Builder::new()
        .name("workload-logger-signals".to_string())
        .spawn(move || {
            for _ in signals.forever() {
                if events.send(UiEvent::Interrupt).is_err() {
                    break;
                }
            }
        })?;

    Ok(InterruptGuard {
        handle,
        thread: Some(thread),
    })
}

/// Runs until the app asks to exit or every event source is gone.
pub fn run_loop<W: Write>(
    controller: &Arc<RuntimeController>,
    events: &Receiver<UiEvent>,
    console: &mut Console<W>,
) -> io::Result<()> {
    {
        let app = lock_unpoisoned(controller.app());
        console.banner(&app)?;
        console.render(&app)?;
    }

    while let Ok(event) = events.recv() {
        if !handle_event(controller, event) {
            break;
        }

        let app = lock_unpoisoned(controller.app());
        console.render(&app)?;
        if app.should_exit {
            break;
        }
    }

    let app = lock_unpoisoned(controller.app());
    console.render(&app)?;
    drop(app);

    controller.shutdown(SHUTDOWN_GRACE);
    Ok(())
}

/// Applies one event. Returns false when the loop should stop.
pub fn handle_event(controller: &Arc<RuntimeController>, event: UiEvent) -> bool {
    let mut host = Arc::clone(controller);

    match event {
        UiEvent::Line(line) => {
            let mut app = lock_unpoisoned(controller.app());
            // A blank line resubmits a note kept after a failure.
            if !line.trim().is_empty() {
                app.on_input_replace(line);
            }
            app.on_submit(&mut host);
        }
        UiEvent::InputClosed => {
            let mut app = lock_unpoisoned(controller.app());
            if !app.should_exit {
                app.on_input_closed(&mut host);
            }
        }
        UiEvent::Interrupt => {
            lock_unpoisoned(controller.app()).on_control_c(&mut host);
        }
        UiEvent::DrainRunEvents => {
            controller.drain_pending_run_events();
        }
        UiEvent::Render => {}
        UiEvent::Stop => return false,
    }

    true
}
