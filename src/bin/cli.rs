//! nested_unzip CLI - recursive archive extraction
//!
//! # Examples
//!
//! ```bash
//! # Extract an archive and everything nested inside it
//! nested_unzip bundle.zip -d /tmp/out
//!
//! # Every archive in a folder, keeping the originals
//! nested_unzip --folder ~/Downloads -d /tmp/out --keep-archives
//!
//! # Japanese archive names instead of Chinese
//! nested_unzip old.zip --name-encoding shift_jis
//!
//! # Pause (p), resume (r) or stop (s) from stdin
//! nested_unzip huge.7z --interactive
//!
//! # List decoded entry names without extracting
//! nested_unzip bundle.zip --list
//!
//! # Generate shell completions
//! nested_unzip --completions bash > ~/.bash_completion.d/nested_unzip
//! ```

use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use nested_unzip::{worker, CancellationToken, Error, Input, Outcome, Session, SessionReport};
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use tracing_subscriber::EnvFilter;

const EXIT_CANCELLED: u8 = 130;

#[derive(Parser)]
#[command(
    name = "nested_unzip",
    about = "Recursive archive extraction - unpacks archives inside archives",
    version,
    after_help = "EXAMPLES:
    nested_unzip bundle.zip -d /tmp/out
    nested_unzip --folder ~/Downloads -d /tmp/out --keep-archives
    nested_unzip old.zip --name-encoding shift_jis
    nested_unzip bundle.zip --list"
)]
struct Cli {
    /// Archives to extract (ZIP, TAR, TAR.GZ, TAR.BZ2, 7Z, RAR)
    #[arg(required_unless_present_any = ["completions", "folder"])]
    archives: Vec<PathBuf>,

    /// Extract every archive directly inside this folder
    #[arg(long, conflicts_with = "archives")]
    folder: Option<PathBuf>,

    /// Destination directory (created if missing)
    #[arg(short, long, default_value = ".")]
    dest: PathBuf,

    /// Keep archives after extracting them
    #[arg(long)]
    keep_archives: bool,

    /// Do not collapse single wrapper folders
    #[arg(long)]
    no_flatten: bool,

    /// Codepage for entry names that are not UTF-8 (e.g. gbk, shift_jis, big5)
    #[arg(long, default_value = "gbk", value_name = "LABEL")]
    name_encoding: String,

    /// Maximum archive nesting depth
    #[arg(long, default_value_t = nested_unzip::session::DEFAULT_MAX_NESTING_DEPTH)]
    max_depth: usize,

    /// List decoded entry names without extracting
    #[arg(short, long)]
    list: bool,

    /// Read p (pause), r (resume) and s (stop) commands from stdin
    #[arg(long)]
    interactive: bool,

    /// Generate shell completions for the specified shell
    #[arg(long, value_enum)]
    completions: Option<Shell>,

    /// Quiet mode - only show errors
    #[arg(short, long)]
    quiet: bool,

    /// Verbose mode - debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Handle completions generation
    if let Some(shell) = cli.completions {
        generate(shell, &mut Cli::command(), "nested_unzip", &mut io::stdout());
        return ExitCode::SUCCESS;
    }

    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn build_session(cli: &Cli) -> Result<Session, Error> {
    // Listing never writes, so it must not create the destination either.
    let session = if cli.list {
        Session::new(".")?
    } else {
        Session::new_or_create(&cli.dest)?
    };
    let mut session = session
        .keep_original_archives(cli.keep_archives)
        .flatten_single_folder(!cli.no_flatten)
        .name_encoding(&cli.name_encoding)?
        .max_nesting_depth(cli.max_depth);

    if !cli.quiet {
        session = session.with_reveal(|path: &Path| println!("Output: {}", path.display()));
    }
    Ok(session)
}

fn run(cli: Cli) -> Result<ExitCode, Error> {
    let session = build_session(&cli)?;

    // List mode
    if cli.list {
        for archive in &cli.archives {
            list_archive(&session, archive, cli.quiet)?;
        }
        return Ok(ExitCode::SUCCESS);
    }

    let input = match &cli.folder {
        Some(folder) => Input::Folder(folder.clone()),
        None => Input::Files(cli.archives.clone()),
    };

    let job = worker::spawn(session, input)?;
    if cli.interactive {
        watch_stdin(job.token().clone());
    }

    for event in job.events().iter() {
        let message = event.message();
        if !cli.quiet && !message.is_empty() {
            println!("{}", message);
        }
    }

    let report = job.join();
    if !cli.quiet {
        print_summary(&report);
    }

    Ok(match report.outcome {
        Outcome::Completed => ExitCode::SUCCESS,
        Outcome::Cancelled => ExitCode::from(EXIT_CANCELLED),
        Outcome::Failed(_) => ExitCode::FAILURE,
    })
}

/// Forward stdin commands to the running job.
fn watch_stdin(token: CancellationToken) {
    eprintln!("Commands: p = pause, r = resume, s = stop");
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match line.trim() {
                "p" => {
                    token.pause();
                    eprintln!("Paused");
                }
                "r" => {
                    token.resume();
                    eprintln!("Resumed");
                }
                "s" => {
                    token.stop();
                    eprintln!("Stopping...");
                    break;
                }
                "" => {}
                other => eprintln!("Unknown command '{}'", other),
            }
        }
    });
}

fn list_archive(session: &Session, archive: &Path, quiet: bool) -> Result<(), Error> {
    let names = session.list(archive)?;

    if !quiet {
        println!("{} entries in {}:", names.len(), archive.display());
        println!();
    }
    for name in &names {
        println!("{}", name);
    }

    Ok(())
}

fn print_summary(report: &SessionReport) {
    match &report.outcome {
        Outcome::Completed => {
            println!(
                "Extracted {} archives ({} files, {})",
                report.archives_extracted,
                report.files_extracted,
                format_bytes(report.bytes_written)
            );
            if report.archives_skipped > 0 {
                println!("Skipped {} archives", report.archives_skipped);
            }
            if report.entries_skipped > 0 {
                println!("Skipped {} entries", report.entries_skipped);
            }
        }
        Outcome::Cancelled => println!("Cancelled, all output removed"),
        Outcome::Failed(reason) => eprintln!("Error: {}", reason),
    }
    if report.rollback_failures > 0 {
        eprintln!(
            "Warning: {} directories could not be removed",
            report.rollback_failures
        );
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes >= 1024 * 1024 * 1024 {
        format!("{:.1}G", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    } else if bytes >= 1024 * 1024 {
        format!("{:.1}M", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1}K", bytes as f64 / 1024.0)
    } else {
        format!("{}B", bytes)
    }
}
