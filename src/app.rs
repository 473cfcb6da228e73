use std::path::{Path, PathBuf};

use log_sink::{LogClock, LogTarget, SinkError};
use style_provider::ProviderProfile;

use crate::commands::{note_text, parse_slash_command, SlashCommand};
use crate::error::UpdateError;
use crate::session::Session;
use crate::transformer::{normalize_reply, PromptTemplate};

pub use style_provider::RunId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Running { run_id: RunId },
    Error(String),
    Exiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// A line that was written to the log file.
    Entry,
    Notice,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// State of the update whose transformation is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingUpdate {
    run_id: RunId,
    note: String,
    target: LogTarget,
    reply: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct App {
    pub mode: Mode,
    pub input: String,
    pub transcript: Vec<Message>,
    pub should_exit: bool,
    /// Bumped whenever the view is cleared so renderers can start over.
    pub view_generation: u64,
    session: Session,
    template: PromptTemplate,
    clock: LogClock,
    provider_label: Option<String>,
    pending: Option<PendingUpdate>,
    cancelling_run: Option<RunId>,
    /// Set when input ends during a run; the app exits once that run settles.
    quit_when_idle: bool,
}

pub trait HostOps {
    fn start_run(&mut self, prompt: String) -> Result<RunId, String>;
    fn cancel_run(&mut self, run_id: RunId);
    fn append_line(&mut self, target: &LogTarget, line: &str) -> Result<(), SinkError>;
    fn cycle_model(&mut self) -> Result<ProviderProfile, String>;
    fn request_render(&mut self);
    fn request_stop(&mut self);
}

pub const HELP_TEXT: &str = "Type a note and press Enter to log it. Commands: /save-as <path>, /open <path>, /file, /model, /cancel, /clear, /help, /quit. Start a note with // to log a leading slash.";
const ERROR_RUN_ALREADY_ACTIVE: &str = "Run already active";
const UPDATE_IN_PROGRESS: &str = "Update already in progress. Use /cancel to stop it.";
const INPUT_CLOSED_WAITING: &str = "Input closed; finishing the current update before exit.";
const RETRY_HINT: &str = "Note kept. Press Enter to resubmit or Ctrl-C to discard it.";

impl Default for App {
    fn default() -> Self {
        Self::new(PromptTemplate::default(), LogClock::default())
    }
}

impl App {
    pub fn new(template: PromptTemplate, clock: LogClock) -> Self {
        Self {
            mode: Mode::Idle,
            input: String::new(),
            transcript: Vec::new(),
            should_exit: false,
            view_generation: 0,
            session: Session::new(),
            template,
            clock,
            provider_label: None,
            pending: None,
            cancelling_run: None,
            quit_when_idle: false,
        }
    }

    #[must_use]
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn provider_label(&self) -> Option<&str> {
        self.provider_label.as_deref()
    }

    pub fn set_provider_label(&mut self, label: impl Into<String>) {
        self.provider_label = Some(label.into());
    }

    pub fn on_input_replace(&mut self, text: String) {
        self.input = text;
    }

    /// Appends a notice to the view without touching control state.
    pub fn push_notice(&mut self, content: impl Into<String>) {
        self.push(Role::Notice, content.into());
    }

    /// "Save as File": creates `path` and makes it the current target.
    pub fn create_target(&mut self, path: impl AsRef<Path>) {
        let result = self
            .session
            .create_target(path.as_ref())
            .map(|target| target.path().to_path_buf());
        self.report_selection(result, "created");
    }

    /// "Change File": makes the existing file at `path` the current target.
    pub fn open_target(&mut self, path: impl AsRef<Path>) {
        let result = self
            .session
            .open_target(path.as_ref())
            .map(|target| target.path().to_path_buf());
        self.report_selection(result, "opened");
    }

    fn report_selection(&mut self, result: Result<PathBuf, SinkError>, action: &str) {
        match result {
            Ok(path) => {
                tracing::info!(path = %path.display(), action, "log target selected");
                let label = self.session.label();
                self.push_notice(label);
            }
            Err(error) => {
                tracing::warn!(%error, action, "log target selection failed");
                self.push_error(error.to_string());
            }
        }
    }

    pub fn on_submit(&mut self, host: &mut dyn HostOps) {
        let submitted = std::mem::take(&mut self.input);
        let note = submitted.trim().to_string();

        if note.is_empty() {
            self.push_error(UpdateError::EmptyInput.to_string());
            host.request_render();
            return;
        }

        if let Some(command) = parse_slash_command(&note) {
            self.on_command(command, host);
            return;
        }

        if matches!(self.mode, Mode::Running { .. }) {
            self.input = submitted;
            self.push_notice(UPDATE_IN_PROGRESS);
            host.request_render();
            return;
        }

        if self.cancelling_run.is_some() {
            self.input = submitted;
            self.push_notice("Cancelling active update, please wait.");
            host.request_render();
            return;
        }

        let Some(target) = self.session.target().cloned() else {
            self.input = submitted;
            self.push_error(UpdateError::NoFileSelected.to_string());
            host.request_render();
            return;
        };

        match host.start_run(self.template.render(note_text(&note))) {
            Ok(run_id) => {
                tracing::debug!(run_id, "update started");
                self.mode = Mode::Running { run_id };
                self.pending = Some(PendingUpdate {
                    run_id,
                    note,
                    target,
                    reply: String::new(),
                });
            }
            Err(error) => {
                self.input = submitted;
                if error == ERROR_RUN_ALREADY_ACTIVE {
                    self.push_notice(UPDATE_IN_PROGRESS);
                } else {
                    self.mode = Mode::Error(error.clone());
                    self.push_error(format!("Failed to start update: {error}"));
                }
            }
        }

        host.request_render();
    }

    fn on_command(&mut self, command: SlashCommand, host: &mut dyn HostOps) {
        match command {
            SlashCommand::Help => {
                self.push_notice(HELP_TEXT);
            }
            SlashCommand::Clear => {
                self.transcript.clear();
                self.view_generation += 1;
                self.push_notice("View cleared; the log file is unchanged.");
            }
            SlashCommand::Cancel => {
                self.on_cancel(host);
                return;
            }
            SlashCommand::Quit => {
                self.on_quit(host);
                return;
            }
            SlashCommand::File => {
                let label = self.session.label();
                self.push_notice(label);
            }
            SlashCommand::Model => match host.cycle_model() {
                Ok(profile) => {
                    let label = profile.label();
                    self.push_notice(format!("Model: {label}"));
                    self.provider_label = Some(label);
                }
                Err(error) => self.push_error(error),
            },
            SlashCommand::SaveAs(path) => self.create_target(path),
            SlashCommand::Open(path) => self.open_target(path),
            SlashCommand::MissingArgument(usage) => {
                self.push_error(format!("Usage: {usage}"));
            }
            SlashCommand::Unknown(command) => {
                self.push_error(format!("Unknown command: {command}"));
            }
        }

        host.request_render();
    }

    pub fn on_cancel(&mut self, host: &mut dyn HostOps) {
        if self.cancelling_run.is_some() {
            host.request_render();
            return;
        }

        if let Mode::Running { run_id } = self.mode {
            self.cancelling_run = Some(run_id);
            self.mode = Mode::Idle;
            if let Some(pending) = self.pending.take() {
                self.restore_input(pending.note);
            }
            self.push_notice("Update cancelled; nothing was written.");
            host.cancel_run(run_id);
        } else {
            self.push_notice("No active update");
        }

        host.request_render();
    }

    pub fn on_control_c(&mut self, host: &mut dyn HostOps) {
        if !self.input.is_empty() {
            self.on_input_replace(String::new());
            self.push_notice("Pending note discarded");
            host.request_render();
            return;
        }

        if matches!(self.mode, Mode::Running { .. }) {
            self.on_cancel(host);
            return;
        }

        self.on_quit(host);
    }

    /// End of input: lets an in-flight update finish, then quits.
    pub fn on_input_closed(&mut self, host: &mut dyn HostOps) {
        if matches!(self.mode, Mode::Running { .. }) {
            self.quit_when_idle = true;
            self.push_notice(INPUT_CLOSED_WAITING);
            host.request_render();
            return;
        }

        self.on_quit(host);
    }

    /// Called after a terminal run event has been applied.
    pub fn on_run_settled(&mut self, host: &mut dyn HostOps) {
        if self.quit_when_idle && !self.should_exit && !matches!(self.mode, Mode::Running { .. })
        {
            self.on_quit(host);
        }
    }

    pub fn on_quit(&mut self, host: &mut dyn HostOps) {
        if let Mode::Running { run_id } = self.mode {
            if let Some(pending) = self.pending.take() {
                tracing::info!(run_id, "update discarded on quit");
                self.push_notice(format!(
                    "Update for \"{}\" cancelled on exit; nothing was written.",
                    pending.note
                ));
            }
            self.cancelling_run = Some(run_id);
            host.cancel_run(run_id);
        }

        self.mode = Mode::Exiting;
        self.should_exit = true;
        host.request_stop();
        host.request_render();
    }

    pub fn on_run_started(&mut self, run_id: RunId) {
        if !self.is_active_run(run_id) {
            return;
        }

        if let Some(label) = &self.provider_label {
            tracing::debug!(run_id, provider = %label, "provider accepted update");
        }
    }

    pub fn on_run_chunk(&mut self, run_id: RunId, chunk: &str) {
        if !self.should_apply_run_event(run_id) || self.is_cancelling(run_id) {
            return;
        }

        if let Some(pending) = self.pending_for(run_id) {
            pending.reply.push_str(chunk);
        }
    }

    /// Cleans the reply, stamps it and appends it to the target captured at submit.
    pub fn on_run_finished(&mut self, run_id: RunId, host: &mut dyn HostOps) {
        if !self.should_apply_run_event(run_id) {
            return;
        }

        if self.is_cancelling(run_id) {
            self.finalize_cancelled_run(run_id);
            return;
        }

        let Some(pending) = self.take_pending(run_id) else {
            return;
        };
        self.mode = Mode::Idle;

        let text = normalize_reply(&pending.reply);
        if text.is_empty() {
            self.fail_update(pending.note, UpdateError::EmptyReply);
            return;
        }

        let line = match self.clock.entry(text).line() {
            Ok(line) => line,
            Err(error) => {
                self.fail_update(pending.note, UpdateError::Write(error));
                return;
            }
        };

        match host.append_line(&pending.target, &line) {
            Ok(()) => {
                tracing::info!(run_id, path = %pending.target.path().display(), "log entry appended");
                self.push(Role::Entry, line);
            }
            Err(error) => self.fail_update(pending.note, UpdateError::Write(error)),
        }
    }

    pub fn on_run_failed(&mut self, run_id: RunId, error: &str) {
        if !self.should_apply_run_event(run_id) {
            return;
        }

        if self.is_cancelling(run_id) {
            self.finalize_cancelled_run(run_id);
            return;
        }

        let Some(pending) = self.take_pending(run_id) else {
            return;
        };

        self.fail_update(pending.note, UpdateError::Transform(error.to_string()));
    }

    pub fn on_run_cancelled(&mut self, run_id: RunId) {
        if !self.should_apply_run_event(run_id) || !self.is_cancelling(run_id) {
            return;
        }

        self.finalize_cancelled_run(run_id);
    }

    fn fail_update(&mut self, note: String, error: UpdateError) {
        tracing::warn!(%error, "log update failed");
        let message = error.to_string();
        self.mode = Mode::Error(message.clone());
        self.push_error(message);
        if self.restore_input(note) {
            self.push_notice(RETRY_HINT);
        }
    }

    /// Puts `note` back into the input unless the user already typed something new.
    fn restore_input(&mut self, note: String) -> bool {
        if self.input.is_empty() {
            self.input = note;
            true
        } else {
            false
        }
    }

    fn pending_for(&mut self, run_id: RunId) -> Option<&mut PendingUpdate> {
        self.pending
            .as_mut()
            .filter(|pending| pending.run_id == run_id)
    }

    fn take_pending(&mut self, run_id: RunId) -> Option<PendingUpdate> {
        if self.pending.as_ref().map(|pending| pending.run_id) == Some(run_id) {
            self.pending.take()
        } else {
            None
        }
    }

    fn should_apply_run_event(&self, run_id: RunId) -> bool {
        !self.should_exit && (self.is_active_run(run_id) || self.is_cancelling(run_id))
    }

    fn is_active_run(&self, run_id: RunId) -> bool {
        matches!(self.mode, Mode::Running { run_id: active } if active == run_id)
    }

    fn is_cancelling(&self, run_id: RunId) -> bool {
        self.cancelling_run == Some(run_id)
    }

    fn finalize_cancelled_run(&mut self, run_id: RunId) {
        if !self.is_cancelling(run_id) {
            return;
        }

        self.cancelling_run = None;
        if !matches!(self.mode, Mode::Running { .. }) {
            self.mode = Mode::Idle;
        }
    }

    fn push_error(&mut self, content: String) {
        self.push(Role::Error, content);
    }

    fn push(&mut self, role: Role, content: String) {
        self.transcript.push(Message { role, content });
    }
}
