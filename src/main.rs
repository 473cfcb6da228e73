use std::io;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::{mpsc, Arc, Mutex};

use clap::Parser;
use log_sink::LogClock;
use style_provider::StyleProvider;
use workload_logger::app::App;
use workload_logger::cli::Cli;
use workload_logger::config::{EnvConfig, Settings, StartupTarget};
use workload_logger::console::{install_interrupt_handler, run_loop, spawn_stdin_reader, Console};
use workload_logger::logging::init_tracing;
use workload_logger::oneshot::log_once;
use workload_logger::providers;
use workload_logger::runtime::RuntimeController;
use workload_logger::session::Session;
use workload_logger::transformer::StyleTransformer;

fn main() -> ExitCode {
    // Read the local offset before any thread exists.
    let clock = LogClock::local_or_utc();
    let cli = Cli::parse();

    match run(cli, clock) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, clock: LogClock) -> io::Result<ExitCode> {
    let env = EnvConfig::from_env().map_err(io::Error::other)?;
    let settings = Settings::resolve(env, &cli);
    init_tracing(settings.trace_log.as_deref())?;

    let provider = providers::provider_for_settings(&settings).map_err(io::Error::other)?;
    tracing::info!(provider = %provider.profile().label(), "provider selected");

    match settings.note.clone() {
        Some(note) => Ok(run_once(settings, provider, clock, &note)),
        None => run_interactive(settings, provider, clock).map(|()| ExitCode::SUCCESS),
    }
}

fn run_once(
    settings: Settings,
    provider: Arc<dyn StyleProvider>,
    clock: LogClock,
    note: &str,
) -> ExitCode {
    let mut session = Session::new();
    let selected = match &settings.startup_target {
        Some(StartupTarget::Open(path)) => session.open_target(path).map(|_| ()),
        Some(StartupTarget::Create(path)) => session.create_target(path).map(|_| ()),
        None => Ok(()),
    };
    if let Err(error) = selected {
        eprintln!("Error: {error}");
        return ExitCode::FAILURE;
    }

    let transformer = StyleTransformer::new(provider, settings.template);
    let cancel = Arc::new(AtomicBool::new(false));
    match log_once(&transformer, &session, &clock, note, cancel) {
        Ok(line) => {
            println!("{line}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run_interactive(
    settings: Settings,
    provider: Arc<dyn StyleProvider>,
    clock: LogClock,
) -> io::Result<()> {
    let mut app = App::new(settings.template, clock);
    app.set_provider_label(provider.profile().label());
    match &settings.startup_target {
        Some(StartupTarget::Open(path)) => app.open_target(path),
        Some(StartupTarget::Create(path)) => app.create_target(path),
        None => {}
    }
    let app = Arc::new(Mutex::new(app));

    let (events_tx, events_rx) = mpsc::channel();
    let controller = RuntimeController::new(Arc::clone(&app), events_tx.clone(), provider);
    let _interrupts = install_interrupt_handler(events_tx.clone())?;
    // The reader stays blocked on stdin; it is not joined.
    let _stdin_reader = spawn_stdin_reader(events_tx)?;

    let mut console = Console::stdout();
    run_loop(&controller, &events_rx, &mut console)
}
