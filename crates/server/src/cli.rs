use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "poshd")]
#[command(about = "Editor services host for a PowerShell-style scripting engine")]
#[command(version)]
pub struct Cli {
	/// Log verbosity (error, warn, info, debug, trace)
	#[arg(long, default_value = "info")]
	pub log_level: String,

	/// Write logs to a file instead of stderr
	#[arg(long)]
	pub log_file: Option<PathBuf>,

	/// Workspace root used for stack-frame presentation hints
	#[arg(long)]
	pub workspace: Option<PathBuf>,

	/// Execute a single command and exit instead of running the REPL
	#[arg(long, short = 'c')]
	pub command: Option<String>,
}
