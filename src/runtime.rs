use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log_sink::{LogTarget, SinkError};
use style_provider::{ProviderProfile, RunEvent, StyleProvider, StyleRequest};

use crate::app::{App, HostOps, Mode, RunId};

/// Everything the console loop reacts to, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// One line read from the input stream.
    Line(String),
    /// The input stream reached end of file.
    InputClosed,
    /// Ctrl-C.
    Interrupt,
    /// Run events are queued and must be applied on the UI thread.
    DrainRunEvents,
    Render,
    Stop,
}

struct ActiveRun {
    run_id: RunId,
    cancel: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
}

pub struct RuntimeController {
    app: Arc<Mutex<App>>,
    ui: Mutex<Sender<UiEvent>>,
    pending_events: Mutex<VecDeque<RunEvent>>,
    next_run_id: AtomicU64,
    active_run: Mutex<Option<ActiveRun>>,
    provider: Arc<dyn StyleProvider>,
}

impl RuntimeController {
    /// Creates a controller that buffers run events before applying them to `App`.
    ///
    /// Workers announce queued events with [`UiEvent::DrainRunEvents`]; the
    /// console loop answers by calling
    /// [`RuntimeController::drain_pending_run_events`]. Headless callers can
    /// poll [`RuntimeController::flush_pending_run_events`] instead.
    pub fn new(
        app: Arc<Mutex<App>>,
        ui: Sender<UiEvent>,
        provider: Arc<dyn StyleProvider>,
    ) -> Arc<Self> {
        Arc::new(Self {
            app,
            ui: Mutex::new(ui),
            pending_events: Mutex::new(VecDeque::new()),
            next_run_id: AtomicU64::new(1),
            active_run: Mutex::new(None),
            provider,
        })
    }

    pub fn app(&self) -> &Arc<Mutex<App>> {
        &self.app
    }

    pub fn profile(&self) -> ProviderProfile {
        self.provider.profile()
    }

    pub fn has_active_run(&self) -> bool {
        self.lock_active_run().is_some()
    }

    fn start_run_internal(self: &Arc<Self>, prompt: String) -> Result<RunId, String> {
        let mut active_run = self.lock_active_run();
        if active_run.is_some() {
            return Err("Run already active".to_string());
        }

        let run_id = self.next_run_id.fetch_add(1, Ordering::SeqCst);
        let cancel = Arc::new(AtomicBool::new(false));
        let request = StyleRequest { run_id, prompt };
        let join_handle = self.spawn_worker(request, Arc::clone(&cancel))?;

        *active_run = Some(ActiveRun {
            run_id,
            cancel,
            join_handle: Some(join_handle),
        });

        Ok(run_id)
    }

    fn spawn_worker(
        self: &Arc<Self>,
        request: StyleRequest,
        cancel: Arc<AtomicBool>,
    ) -> Result<JoinHandle<()>, String> {
        let run_id = request.run_id;
        let controller = Arc::clone(self);
        thread::Builder::new()
            .name(format!("workload-logger-run-{run_id}"))
            .spawn(move || controller.run_worker(request, cancel))
            .map_err(|error| format!("Failed to spawn run worker: {error}"))
    }

    fn run_worker(self: Arc<Self>, request: StyleRequest, cancel: Arc<AtomicBool>) {
        let run_id = request.run_id;
        self.wait_for_app_run_visibility(run_id);

        let terminal_emitted = Arc::new(AtomicBool::new(false));
        let terminal_emitted_for_emit = Arc::clone(&terminal_emitted);
        let controller = Arc::clone(&self);
        let provider = Arc::clone(&self.provider);

        let mut emit = move |event: RunEvent| {
            if event.is_terminal() {
                terminal_emitted_for_emit.store(true, Ordering::SeqCst);
            }

            controller.enqueue_run_event(event);
        };
        let run_outcome = catch_unwind(AssertUnwindSafe(|| {
            provider.run(request, Arc::clone(&cancel), &mut emit)
        }));

        match run_outcome {
            Ok(Ok(())) => {}
            Ok(Err(error)) => emit(RunEvent::Failed { run_id, error }),
            Err(_) => {
                tracing::error!(run_id, "style provider panicked");
                emit(RunEvent::Failed {
                    run_id,
                    error: "Style provider panicked".to_string(),
                });
            }
        }

        if !terminal_emitted.load(Ordering::SeqCst) && self.is_active_run_id(run_id) {
            emit(RunEvent::Failed {
                run_id,
                error: "Style provider exited without terminal event".to_string(),
            });
        }
    }

    fn enqueue_run_event(self: &Arc<Self>, event: RunEvent) {
        let should_drain = {
            let mut queue = lock_unpoisoned(&self.pending_events);
            let should_drain = queue.is_empty();
            queue.push_back(event);
            should_drain
        };

        if should_drain {
            self.send(UiEvent::DrainRunEvents);
        }
    }

    /// Applies every queued run event to `App`, returning how many were applied.
    pub fn drain_pending_run_events(self: &Arc<Self>) -> usize {
        let mut drained = 0usize;

        loop {
            let event = {
                let mut pending_events = lock_unpoisoned(&self.pending_events);
                pending_events.pop_front()
            };

            match event {
                Some(event) => {
                    self.apply_run_event(event);
                    drained += 1;
                }
                None => break,
            }
        }

        drained
    }

    /// Drains queued run events and schedules a render.
    pub fn flush_pending_run_events(self: &Arc<Self>) -> usize {
        let drained = self.drain_pending_run_events();
        if drained > 0 {
            self.send(UiEvent::Render);
        }

        drained
    }

    /// Cancels the active run and waits up to `grace` for its worker to exit.
    ///
    /// Returns true when no worker is left running.
    pub fn shutdown(&self, grace: Duration) -> bool {
        let join_handle = {
            let mut active_run = self.lock_active_run();
            match active_run.as_mut() {
                Some(active) => {
                    active.cancel.store(true, Ordering::SeqCst);
                    active.join_handle.take()
                }
                None => None,
            }
        };

        let Some(join_handle) = join_handle else {
            return true;
        };

        let deadline = Instant::now() + grace;
        while !join_handle.is_finished() {
            if Instant::now() >= deadline {
                tracing::warn!("run worker still busy at shutdown");
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }

        let _ = join_handle.join();
        true
    }

    fn wait_for_app_run_visibility(&self, run_id: RunId) {
        for _ in 0..256 {
            let run_visible = {
                let app = lock_unpoisoned(&self.app);
                matches!(app.mode, Mode::Running { run_id: current } if current == run_id)
            };

            if run_visible {
                return;
            }

            thread::yield_now();
        }
    }

    fn apply_run_event(self: &Arc<Self>, event: RunEvent) {
        let run_id = event.run_id();
        let terminal = event.is_terminal();

        {
            let mut host = Arc::clone(self);
            let mut app = lock_unpoisoned(&self.app);
            match event {
                RunEvent::Started { run_id } => app.on_run_started(run_id),
                RunEvent::Chunk { run_id, text } => app.on_run_chunk(run_id, &text),
                RunEvent::Finished { run_id } => app.on_run_finished(run_id, &mut host),
                RunEvent::Failed { run_id, error } => app.on_run_failed(run_id, &error),
                RunEvent::Cancelled { run_id } => app.on_run_cancelled(run_id),
            }
            if terminal {
                app.on_run_settled(&mut host);
            }
        }

        if terminal {
            self.clear_active_run_if_matching(run_id);
        }
    }

    fn clear_active_run_if_matching(&self, run_id: RunId) {
        let mut active_run = self.lock_active_run();
        let matches = active_run.as_ref().map(|active| active.run_id) == Some(run_id);
        if !matches {
            return;
        }

        let mut completed = match active_run.take() {
            Some(completed) => completed,
            None => return,
        };

        if let Some(join_handle) = completed.join_handle.take() {
            let is_current_thread = join_handle.thread().id() == thread::current().id();
            if !is_current_thread && join_handle.is_finished() {
                let _ = join_handle.join();
            }
        }
    }

    fn is_active_run_id(&self, run_id: RunId) -> bool {
        self.lock_active_run()
            .as_ref()
            .map(|active| active.run_id)
            == Some(run_id)
    }

    fn cancel_run_internal(&self, run_id: RunId) {
        let active_run = self.lock_active_run();
        if let Some(active_run) = active_run.as_ref() {
            if active_run.run_id == run_id {
                tracing::debug!(run_id, "cancelling run");
                active_run.cancel.store(true, Ordering::SeqCst);
            }
        }
    }

    fn send(&self, event: UiEvent) {
        // The loop may already be gone during shutdown.
        let _ = lock_unpoisoned(&self.ui).send(event);
    }

    fn lock_active_run(&self) -> MutexGuard<'_, Option<ActiveRun>> {
        lock_unpoisoned(&self.active_run)
    }
}

impl HostOps for Arc<RuntimeController> {
    fn start_run(&mut self, prompt: String) -> Result<RunId, String> {
        self.start_run_internal(prompt)
    }

    fn cancel_run(&mut self, run_id: RunId) {
        self.cancel_run_internal(run_id);
    }

    fn append_line(&mut self, target: &LogTarget, line: &str) -> Result<(), SinkError> {
        target.append(line)
    }

    fn cycle_model(&mut self) -> Result<ProviderProfile, String> {
        let profile = self.provider.cycle_model()?;
        tracing::info!(model = %profile.label(), "model switched");
        Ok(profile)
    }

    fn request_render(&mut self) {
        self.send(UiEvent::Render);
    }

    fn request_stop(&mut self) {
        self.send(UiEvent::Stop);
    }
}

pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
