mod cli;
mod console;
mod terminal;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use console::StdioConsole;
use posh_debug::remote_files::LocalSessionFiles;
use posh_debug::service::DebugService;
use posh_engine::command::EngineCommand;
use posh_engine::local::LocalRunspace;
use posh_engine::runspace::RunspaceHandle;
use posh_host::executor::PipelineExecutor;
use posh_host::options::ExecutionOptions;
use posh_protocol::bridge;
use terminal::TerminalReadLine;
use tokio_util::sync::CancellationToken;

fn main() {
	let code = match run() {
		Ok(()) => 0,
		Err(error) => {
			eprintln!("poshd: {error:#}");
			1
		}
	};
	std::process::exit(code);
}

fn run() -> anyhow::Result<()> {
	let cli = Cli::parse();
	init_logging(&cli)?;

	let console = Arc::new(StdioConsole);
	let readline = TerminalReadLine::spawn();
	let executor = Arc::new(
		PipelineExecutor::builder(|| LocalRunspace::local() as RunspaceHandle)
			.console(Arc::clone(&console) as Arc<dyn posh_host::console::ConsoleHost>)
			.readline(Arc::clone(&readline) as Arc<dyn posh_host::readline::ReadLineProvider>)
			.start()
			.context("failed to start the pipeline thread")?,
	);

	let mirror = Arc::new(LocalSessionFiles::new().context("failed to create the session scratch directory")?);
	let debug_service = DebugService::new(Arc::clone(&executor), mirror);
	let workspace = cli.workspace.clone().or_else(|| std::env::current_dir().ok());
	if let Some(workspace) = workspace {
		debug_service.set_workspace_root(workspace);
	}

	// Contractual notifications go to the log until a transport attaches.
	let _session_sub = executor.subscribe(Arc::new(|event| {
		if let Some((method, params)) = bridge::notification_for_session_event(event) {
			tracing::debug!(method, %params, "notify");
		}
	}));
	let _debug_sub = debug_service.subscribe(Arc::new(|event| {
		if let Some((method, params)) = bridge::notification_for_debug_event(event) {
			tracing::debug!(method, %params, "notify");
		}
	}));

	if let Some(command) = cli.command {
		let options = ExecutionOptions {
			must_run_in_foreground: true,
			write_output_to_host: true,
			throw_on_error: false,
			..ExecutionOptions::default()
		};
		executor
			.submit_command(EngineCommand::script(command), options, CancellationToken::new())
			.wait()
			.map_err(|error| anyhow::anyhow!("command failed: {error}"))?;
		executor.shutdown();
		return Ok(());
	}

	install_interrupt_handler(Arc::clone(&executor), Arc::clone(&readline));

	executor.start_repl();
	while !readline.finished() {
		std::thread::sleep(Duration::from_millis(50));
	}
	executor.shutdown();
	Ok(())
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
	let filter = tracing_subscriber::EnvFilter::try_new(&cli.log_level).with_context(|| format!("invalid log level '{}'", cli.log_level))?;
	match &cli.log_file {
		Some(path) => {
			let file = std::fs::OpenOptions::new()
				.create(true)
				.append(true)
				.open(path)
				.with_context(|| format!("cannot open log file {}", path.display()))?;
			tracing_subscriber::fmt().with_env_filter(filter).with_ansi(false).with_writer(Arc::new(file)).init();
		}
		None => {
			tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
		}
	}
	Ok(())
}

/// SIGINT cancels the current task instead of killing the session: the REPL
/// prints a fresh prompt, a running pipeline stops.
fn install_interrupt_handler(executor: Arc<PipelineExecutor>, readline: Arc<TerminalReadLine>) {
	std::thread::Builder::new()
		.name("posh-signals".to_string())
		.spawn(move || {
			let Ok(runtime) = tokio::runtime::Builder::new_current_thread().enable_io().build() else {
				tracing::warn!("signal runtime unavailable, Ctrl-C will terminate the process");
				return;
			};
			runtime.block_on(async {
				loop {
					if tokio::signal::ctrl_c().await.is_err() {
						break;
					}
					tracing::debug!("ctrl-c received");
					readline.record_ctrl_c();
					executor.cancel_current_task();
				}
			});
		})
		.ok();
}
