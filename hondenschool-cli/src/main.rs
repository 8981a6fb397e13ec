mod commands;
mod render;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hondenschool_core::Collection;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hondenschool")]
#[command(about = "Manage lessons, series and notices for the dog school")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or change the configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
    /// Fetch collections and mirror them into the local buckets
    Sync {
        /// Only sync this collection (repeatable)
        #[arg(short, long = "collection")]
        collections: Vec<Collection>,

        /// Ignore the in-memory cache
        #[arg(long)]
        refresh: bool,
    },
    Lessons {
        #[command(subcommand)]
        action: LessonAction,
    },
    Notices {
        #[command(subcommand)]
        action: NoticeAction,
    },
    Series {
        #[command(subcommand)]
        action: SeriesAction,
    },
    /// Lessons and notices in date order
    Agenda {
        /// Skip everything before this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
    },
    /// Split the legacy single-blob store into per-collection buckets
    Migrate {
        /// Import this JSON file as the legacy blob first
        #[arg(long)]
        from: Option<std::path::PathBuf>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Show,
    SetBaseUrl { url: String },
    SetOrigin { url: String },
}

#[derive(Subcommand)]
enum LessonAction {
    List,
    Add {
        #[arg(short, long)]
        title: Option<String>,

        /// Start date/time (e.g., "2025-03-20T19:00")
        #[arg(short, long)]
        start: Option<String>,

        #[arg(short, long)]
        end: Option<String>,

        /// Length in minutes, used when no end is given
        #[arg(short, long)]
        duration: Option<i64>,

        #[arg(long = "trainer")]
        trainers: Vec<String>,

        #[arg(short, long)]
        location: Option<String>,

        #[arg(long)]
        series: Option<String>,

        /// Also send the lesson to the remote sheet
        #[arg(long)]
        push: bool,
    },
    Delete {
        id: String,

        #[arg(long)]
        push: bool,
    },
}

#[derive(Subcommand)]
enum NoticeAction {
    Add {
        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long, default_value = "")]
        message: String,

        /// Date (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<String>,

        #[arg(long)]
        color: Option<String>,

        #[arg(long)]
        push: bool,
    },
}

#[derive(Subcommand)]
enum SeriesAction {
    Generate {
        #[arg(long)]
        package: String,

        #[arg(long)]
        series: String,

        #[arg(long)]
        class: Option<String>,

        /// Lesson title; defaults to the series name
        #[arg(short, long, default_value = "")]
        title: String,

        /// First lesson date (YYYY-MM-DD)
        #[arg(long)]
        start_date: String,

        /// Lesson time (HH:MM)
        #[arg(long)]
        time: String,

        #[arg(long, default_value_t = 7)]
        interval: i64,

        #[arg(long, default_value_t = 1)]
        count: u32,

        #[arg(long, default_value_t = 60)]
        duration: i64,

        #[arg(long = "trainer")]
        trainers: Vec<String>,

        #[arg(short, long, default_value = "")]
        location: String,

        #[arg(long)]
        push: bool,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("HONDENSCHOOL_LOG")
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Config { action } => match action.unwrap_or(ConfigAction::Show) {
            ConfigAction::Show => commands::config::show(),
            ConfigAction::SetBaseUrl { url } => commands::config::set_base_url(&url),
            ConfigAction::SetOrigin { url } => commands::config::set_origin(&url),
        },
        Commands::Sync {
            collections,
            refresh,
        } => commands::sync::run(collections, refresh).await,
        Commands::Lessons { action } => match action {
            LessonAction::List => commands::lessons::list().await,
            LessonAction::Add {
                title,
                start,
                end,
                duration,
                trainers,
                location,
                series,
                push,
            } => {
                let args = commands::lessons::AddArgs {
                    title,
                    start,
                    end,
                    duration,
                    trainers,
                    location,
                    series,
                };
                commands::lessons::add(args, push).await
            }
            LessonAction::Delete { id, push } => commands::lessons::delete(&id, push).await,
        },
        Commands::Notices { action } => match action {
            NoticeAction::Add {
                title,
                message,
                date,
                color,
                push,
            } => commands::notices::add(title, message, date, color, push).await,
        },
        Commands::Series { action } => match action {
            SeriesAction::Generate {
                package,
                series,
                class,
                title,
                start_date,
                time,
                interval,
                count,
                duration,
                trainers,
                location,
                push,
            } => {
                let args = commands::series::GenerateArgs {
                    package,
                    series,
                    class,
                    title,
                    start_date,
                    time,
                    interval,
                    count,
                    duration,
                    trainers,
                    location,
                };
                commands::series::generate(args, push).await
            }
        },
        Commands::Agenda { from } => commands::agenda::run(from.as_deref()).await,
        Commands::Migrate { from } => commands::migrate::run(from.as_deref()),
    }
}
