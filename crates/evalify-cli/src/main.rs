//! evalify CLI, the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(name = "evalify", version, about = "OMR answer-sheet evaluator")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Exam definition file (overrides `exam_file` from the config)
    #[arg(long, global = true)]
    exam: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recognize and score one answer sheet
    Evaluate {
        /// Sheet image (png, jpg, webp, gif, heic)
        #[arg(long)]
        image: PathBuf,

        /// Answer key to grade against
        #[arg(long)]
        key: String,

        /// Optional label stored with the result
        #[arg(long)]
        name: Option<String>,

        /// Recognizer to use (default: `default_recognizer` from the config)
        #[arg(long)]
        recognizer: Option<String>,
    },

    /// Manage answer keys
    Keys {
        #[command(subcommand)]
        command: KeysCommand,
    },

    /// Inspect and export stored results
    Results {
        #[command(subcommand)]
        command: ResultsCommand,
    },

    /// Show or acknowledge notifications
    Notifications {
        #[command(subcommand)]
        command: NotificationsCommand,
    },

    /// Summary statistics over stored results
    Stats {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate the exam definition
    Validate,

    /// Create starter config and exam definition
    Init,
}

#[derive(Subcommand)]
enum KeysCommand {
    /// List built-in and custom answer keys
    List,

    /// Create a custom answer key
    Create {
        /// Key name
        #[arg(long)]
        name: String,

        /// Answers in compact form, e.g. "ABCDE -ABC" (`-` for blank)
        #[arg(long, conflicts_with = "master", required_unless_present = "master")]
        answers: Option<String>,

        /// Image of a correctly filled-in master sheet
        #[arg(long)]
        master: Option<PathBuf>,

        /// Recognizer to read the master sheet with
        #[arg(long, requires = "master")]
        recognizer: Option<String>,
    },
}

#[derive(Subcommand)]
enum ResultsCommand {
    /// List stored results, newest first
    List {
        /// Show at most this many results
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Export all stored results
    Export {
        /// Output format
        #[arg(long, value_enum, default_value = "csv")]
        format: ExportFormat,

        /// Output file
        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(Subcommand)]
enum NotificationsCommand {
    /// List the most recent notifications
    List {
        /// Show at most this many notifications
        #[arg(long, default_value = "5")]
        limit: usize,
    },

    /// Mark every notification as read
    ReadAll,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Html,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("evalify=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config;
    let exam = cli.exam;

    let result = match cli.command {
        Commands::Evaluate {
            image,
            key,
            name,
            recognizer,
        } => commands::evaluate::execute(config, exam, image, key, name, recognizer).await,
        Commands::Keys { command } => match command {
            KeysCommand::List => commands::keys::list(config, exam),
            KeysCommand::Create {
                name,
                answers,
                master,
                recognizer,
            } => commands::keys::create(config, exam, name, answers, master, recognizer).await,
        },
        Commands::Results { command } => match command {
            ResultsCommand::List { limit } => commands::results::list(config, exam, limit),
            ResultsCommand::Export { format, output } => {
                commands::results::export(config, exam, format, output)
            }
        },
        Commands::Notifications { command } => match command {
            NotificationsCommand::List { limit } => commands::notifications::list(config, limit),
            NotificationsCommand::ReadAll => commands::notifications::read_all(config),
        },
        Commands::Stats { json } => commands::stats::execute(config, exam, json),
        Commands::Validate => commands::validate::execute(config, exam),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
