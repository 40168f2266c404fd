use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use zview::logging::setup_logging;
use zview::{Settings, ZView};

const PROMPT: &str = "ZVIEW> ";

/// ZVIEW-compatible FITS viewer command interpreter.
///
/// Commands are read from stdin, one per line; `help` lists them.
#[derive(Parser, Debug)]
#[command(name = "zview", version)]
struct Args {
    /// Settings file (default: <config dir>/zview/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// FITS files loaded at startup into buffers 0, 1, ... each in its own viewer
    files: Vec<PathBuf>,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { args.log_level.as_str() };
    setup_logging(level)?;

    let settings = match args.config.clone().or_else(Settings::default_path) {
        Some(path) => Settings::load(&path)?,
        None => Settings::default(),
    };
    let mut zv = ZView::new(settings)?;

    for (i, path) in args.files.iter().enumerate() {
        match zv.open_file(i, path) {
            Ok(()) => info!("Loaded {} into buffer {}", path.display(), i),
            Err(e) => error!("{:#}", e),
        }
    }

    repl(&mut zv)
}

fn repl(zv: &mut ZView) -> Result<()> {
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    let mut stdout = io::stdout().lock();

    let mut lines = stdin.lock().lines();
    loop {
        if interactive {
            write!(stdout, "{}", PROMPT)?;
            stdout.flush()?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("Failed to read command")?;

        let reply = zv.exec(&line);
        for l in &reply.lines {
            writeln!(stdout, "{}", l)?;
        }
        if zv.should_quit() {
            break;
        }
    }
    Ok(())
}
