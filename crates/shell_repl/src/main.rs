//! Line-oriented REPL host for the shell engine.

use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

use clap::Parser;
use shell_engine::{ExecutionContext, Shell, ShellError, ShellSettings};
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

mod demo;
mod render;

#[derive(Parser, Debug)]
#[command(name = "shell-repl", about = "Interactive shell with demo commands")]
struct Cli {
    /// TOML settings file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory of command manifests, overriding the settings file.
    #[arg(long, value_name = "DIR")]
    commands_dir: Option<PathBuf>,

    /// Enables debug logging.
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<(), ShellError> {
    let cli = Cli::parse();
    let mut settings = match &cli.config {
        Some(path) => ShellSettings::load(path)?,
        None => ShellSettings::default(),
    };
    if cli.commands_dir.is_some() {
        settings.commands_dir = cli.commands_dir.clone();
    }
    settings.debug |= cli.debug;
    init_tracing(settings.debug);

    let shell = Shell::with_settings(settings);
    demo::register(&shell)?;
    let loaded = shell.load_configured_commands(&demo::catalog())?;
    info!(commands = shell.commands().len(), loaded, "shell ready");

    run(&shell).map_err(|err| ShellError::handler(format!("terminal i/o failed: {err}")))
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run(shell: &Shell) -> io::Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut context = ExecutionContext::new();
    let mut secret = false;

    loop {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{}", render::prompt(&context, secret))?;
        stdout.flush()?;
        drop(stdout);

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            debug!("input closed");
            return Ok(());
        }
        let line = line.trim_end_matches(['\r', '\n']);

        let response = shell.execute_blocking(line, &mut context);
        render::render(&response, &mut io::stdout().lock(), &mut io::stderr().lock())?;
        secret = response.password;
        if let Some(text) = &response.edit {
            println!("(suggested) {text}");
        }
        if response.exit {
            return Ok(());
        }
    }
}
