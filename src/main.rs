use anyhow::Result;
use bit_status::areas::repository::Repository;
use bit_status::artifacts::status::StatusOptions;
use bit_status::artifacts::status::notifier::CancellationToken;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Set to any value to print plain, uncolored codes
const NO_COLOR_ENV: &str = "BIT_STATUS_NO_COLOR";

/// Exit code of a status interrupted by Ctrl-C
const INTERRUPTED_EXIT_CODE: u8 = 130;

#[derive(Parser)]
#[command(
    name = "bit-status",
    version = "0.1.0",
    author = "Sami Barbut-Dica",
    about = "Three-way status of a git working tree",
    long_about = "Compares HEAD (or another revision), the index and the working tree \
    of a git repository, path by path, honouring ignore rules, nested repositories, \
    file modes and line-ending settings.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "status",
        about = "Show the status of working tree paths",
        long_about = "Prints `XYZ path` for every changed path, where X compares the base \
        revision with the index, Y the index with the working tree and Z the base revision \
        with the working tree. Conflicts print UUU."
    )]
    Status {
        #[arg(short, long, help = "Compare against this revision instead of HEAD")]
        revision: Option<String>,
        #[arg(long, help = "Only look at the direct children of directory paths")]
        no_recursive: bool,
        #[arg(long, help = "Do not detect renamed or copied files")]
        no_renames: bool,
        #[arg(short, long, help = "Also print unchanged paths")]
        all: bool,
        #[arg(index = 1, help = "Paths to inspect; the whole working tree if none")]
        paths: Vec<PathBuf>,
    },
    #[command(name = "conflicts", about = "List paths with unresolved merge conflicts")]
    Conflicts {
        #[arg(short, long, help = "Describe each conflict instead of printing its code")]
        verbose: bool,
        #[arg(index = 1)]
        paths: Vec<PathBuf>,
    },
    #[command(
        name = "check-ignore",
        about = "Print the paths that are ignored",
        long_about = "Prints every given path that is ignored. Exits with 1 when none is."
    )]
    CheckIgnore {
        #[arg(short, long, help = "Show the file, line and pattern that decided")]
        verbose: bool,
        #[arg(index = 1, required = true)]
        paths: Vec<PathBuf>,
    },
    #[command(name = "ignore", about = "Add ignore rules so that the paths are ignored")]
    Ignore {
        #[arg(index = 1, required = true)]
        paths: Vec<PathBuf>,
    },
    #[command(name = "unignore", about = "Edit ignore rules so that the paths are not ignored")]
    Unignore {
        #[arg(index = 1, required = true)]
        paths: Vec<PathBuf>,
    },
    #[command(
        name = "hash-object",
        about = "Print the object id a working tree entry would be staged with"
    )]
    HashObject {
        #[arg(index = 1)]
        path: PathBuf,
    },
    #[command(name = "compare", about = "Show name-status differences between two revisions")]
    Compare {
        #[arg(index = 1)]
        first: String,
        #[arg(index = 2)]
        second: String,
        #[arg(index = 3)]
        paths: Vec<PathBuf>,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn absolute_paths(pwd: &Path, paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths.into_iter().map(|path| pwd.join(path)).collect()
}

fn run(command: Commands, cancel: CancellationToken) -> Result<ExitCode> {
    let pwd = std::env::current_dir()?;
    let repository = Repository::new(&pwd, Box::new(std::io::stdout()))?;

    match command {
        Commands::Status {
            revision,
            no_recursive,
            no_renames,
            all,
            paths,
        } => {
            let options = StatusOptions {
                recursive: !no_recursive,
                detect_renames: !no_renames,
            };
            let cancelled = repository.print_status(
                &absolute_paths(&pwd, paths),
                revision.as_deref(),
                options,
                all,
                cancel,
            )?;

            if cancelled {
                eprintln!("status interrupted");
                return Ok(ExitCode::from(INTERRUPTED_EXIT_CODE));
            }
        }
        Commands::Conflicts { verbose, paths } => {
            repository.print_conflicts(&absolute_paths(&pwd, paths), verbose)?;
        }
        Commands::CheckIgnore { verbose, paths } => {
            let ignored = repository.check_ignore(&absolute_paths(&pwd, paths), verbose)?;
            if ignored == 0 {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Ignore { paths } => repository.ignore_paths(&absolute_paths(&pwd, paths))?,
        Commands::Unignore { paths } => repository.unignore_paths(&absolute_paths(&pwd, paths))?,
        Commands::HashObject { path } => repository.hash_object(&pwd.join(path))?,
        Commands::Compare {
            first,
            second,
            paths,
        } => repository.print_comparison(&absolute_paths(&pwd, paths), &first, &second)?,
    }

    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();

    if std::env::var_os(NO_COLOR_ENV).is_some() {
        colored::control::set_override(false);
    }

    let cli = Cli::parse();
    let cancel = CancellationToken::new();

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    // the engine is synchronous and holds a non-Send writer
    tokio::task::spawn_blocking(move || run(cli.command, cancel)).await?
}
