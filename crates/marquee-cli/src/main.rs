use clap::{ArgAction, Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, WrapErr};
use commands::{admin, browse, config, play, resolve, session, watchlist};
use marquee_config::{Config, PathManager};
use marquee_models::{Episode, TitleKind};
use std::path::PathBuf;

mod app;
mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "marquee")]
#[command(about = "Marquee - browse, watch and curate a streaming catalog")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    /// Base directory holding config.toml, session.toml, data/ and logs/
    #[arg(long, global = true, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in (or create an account with --sign-up)
    Login {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        /// Create the account instead of signing in
        #[arg(long, action = ArgAction::SetTrue)]
        sign_up: bool,
    },
    /// Forget the signed-in identity
    Logout,
    /// Show the signed-in identity
    Whoami,
    /// Browse titles, optionally by kind and genre
    Browse {
        /// movie or series; both when omitted
        #[arg(long)]
        kind: Option<TitleKind>,

        #[arg(long)]
        genre: Option<String>,
    },
    /// Search titles by name (case-insensitive substring)
    Search {
        term: String,
    },
    /// Titles you started watching
    Continue {
        #[arg(long)]
        kind: Option<TitleKind>,
    },
    /// Manage your watchlist
    Watchlist {
        #[command(subcommand)]
        cmd: WatchlistCommands,
    },
    /// Simulate a playback session: resume, time updates and an optional end
    #[command(long_about = "Start playback of a movie or an episode, report where it resumes, feed the positions given with --at as time updates (saved at most once per save interval) and, with --end, mark it completed and show the next episode.")]
    Play {
        kind: TitleKind,

        id: String,

        #[arg(long, default_value_t = 1)]
        season: u32,

        #[arg(long, default_value_t = 1)]
        episode: u32,

        /// Playback positions in seconds, in order
        #[arg(long = "at", value_name = "SECS", num_args = 1..)]
        positions: Vec<f64>,

        /// Override the runtime in seconds
        #[arg(long)]
        duration: Option<f64>,

        /// Finish playback after the last position
        #[arg(long, action = ArgAction::SetTrue)]
        end: bool,
    },
    /// Show how a stored video URL resolves to playable sources
    Resolve {
        url: String,

        /// Request each candidate and report the first that answers
        #[arg(long, action = ArgAction::SetTrue)]
        probe: bool,
    },
    /// Curate the catalog (admin accounts only)
    Admin {
        #[command(subcommand)]
        cmd: AdminCommands,
    },
    /// Inspect or create the configuration
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum WatchlistCommands {
    /// List your watchlist, sorted by title
    List {
        #[arg(long)]
        kind: Option<TitleKind>,
    },
    /// Add the title if missing, remove it otherwise
    Toggle { kind: TitleKind, id: String },
    Add { kind: TitleKind, id: String },
    Remove { kind: TitleKind, id: String },
}

#[derive(Args)]
struct TitleArgs {
    /// Explicit id; derived from the title when omitted
    #[arg(long)]
    id: Option<String>,

    #[arg(long)]
    description: Option<String>,

    /// Genre (repeatable or comma separated)
    #[arg(long = "genre")]
    genres: Vec<String>,

    #[arg(long)]
    thumbnail_url: Option<String>,

    #[arg(long)]
    banner_url: Option<String>,

    #[arg(long)]
    year: Option<u32>,
}

impl TitleArgs {
    fn into_fields(self, title: String) -> admin::TitleFields {
        admin::TitleFields {
            id: self.id,
            title,
            description: self.description,
            genres: self.genres,
            thumbnail_url: self.thumbnail_url,
            banner_url: self.banner_url,
            year: self.year,
        }
    }
}

#[derive(Subcommand)]
enum AdminCommands {
    AddMovie {
        #[arg(long)]
        title: String,

        #[arg(long)]
        video_url: String,

        /// Runtime in seconds
        #[arg(long)]
        duration: Option<f64>,

        #[command(flatten)]
        fields: TitleArgs,
    },
    /// Create a series with its seasons and episodes in one step
    AddSeries {
        #[arg(long)]
        title: String,

        /// JSON file with the season plan: [{"number": 1, "episodes": [...]}]
        #[arg(long, value_name = "FILE", conflicts_with_all = ["seasons", "episodes"])]
        plan: Option<PathBuf>,

        /// Number of seasons to create when no plan file is given
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        seasons: u32,

        /// Episodes per generated season
        #[arg(long, default_value_t = 1)]
        episodes: u32,

        #[command(flatten)]
        fields: TitleArgs,
    },
    /// Change fields of an existing title
    Update {
        kind: TitleKind,

        id: String,

        #[arg(long, default_value = "")]
        title: String,

        #[arg(long)]
        video_url: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long = "genre")]
        genres: Vec<String>,

        #[arg(long)]
        thumbnail_url: Option<String>,

        #[arg(long)]
        banner_url: Option<String>,

        #[arg(long)]
        year: Option<u32>,
    },
    /// Delete a title; series are removed with all seasons and episodes
    Delete { kind: TitleKind, id: String },
    /// List the seasons and episodes of a series
    Seasons { series: String },
    AddSeason {
        series: String,

        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        number: u32,

        #[arg(long)]
        title: Option<String>,

        /// Number of blank episodes to create
        #[arg(long, default_value_t = 0)]
        episodes: u32,
    },
    AddEpisode {
        series: String,

        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        season: u32,

        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        number: u32,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        video_url: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        thumbnail_url: Option<String>,

        /// Runtime in seconds
        #[arg(long)]
        duration: Option<f64>,
    },
    DeleteSeason { series: String, season: u32 },
    DeleteEpisode { series: String, season: u32, episode: u32 },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Write a default config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,

        /// Email allowed to curate the catalog (repeatable)
        #[arg(long = "admin")]
        admins: Vec<String>,
    },
    /// Print where files are kept
    Path,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let paths = match &cli.base_dir {
        Some(dir) => PathManager::with_base(dir),
        None => PathManager::default(),
    };
    let config_file = paths.config_file();
    let config = Config::load_or_default(&config_file)
        .map_err(|e| eyre!("{}", e))
        .wrap_err_with(|| format!("Failed to load config from {}", config_file.display()))?;

    logging::init_logging(cli.verbose, cli.quiet, config.logging.as_ref()).map_err(|e| eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    if let Commands::Config { cmd } = &cli.command {
        return match cmd {
            ConfigCommands::Show => config::run_show(&paths, &config, &output),
            ConfigCommands::Init { force, admins } => config::run_init(&paths, *force, admins.clone(), &output),
            ConfigCommands::Path => config::run_path(&paths, &output),
        };
    }
    if let Commands::Resolve { url, probe } = &cli.command {
        return resolve::run_resolve(url, *probe, &output).await;
    }

    let app = app::App::open(paths, config).await?;

    match cli.command {
        Commands::Login { email, password, sign_up } => {
            session::run_login(&app, &email, &password, sign_up, &output).await
        }
        Commands::Logout => session::run_logout(&app, &output).await,
        Commands::Whoami => session::run_whoami(&app, &output),
        Commands::Browse { kind, genre } => browse::run_browse(&app, kind, genre, &output).await,
        Commands::Search { term } => browse::run_search(&app, &term, &output).await,
        Commands::Continue { kind } => browse::run_continue(&app, kind, &output).await,
        Commands::Watchlist { cmd } => match cmd {
            WatchlistCommands::List { kind } => watchlist::run_list(&app, kind, &output).await,
            WatchlistCommands::Toggle { kind, id } => {
                watchlist::run_change(&app, watchlist::WatchlistAction::Toggle, kind, &id, &output).await
            }
            WatchlistCommands::Add { kind, id } => {
                watchlist::run_change(&app, watchlist::WatchlistAction::Add, kind, &id, &output).await
            }
            WatchlistCommands::Remove { kind, id } => {
                watchlist::run_change(&app, watchlist::WatchlistAction::Remove, kind, &id, &output).await
            }
        },
        Commands::Play { kind, id, season, episode, positions, duration, end } => {
            let args = play::PlayArgs { kind, id, season, episode, positions, duration, end };
            play::run_play(&app, args, &output).await
        }
        Commands::Admin { cmd } => run_admin(&app, cmd, &output).await,
        Commands::Config { .. } | Commands::Resolve { .. } => Ok(()),
    }
}

async fn run_admin(app: &app::App, cmd: AdminCommands, output: &output::Output) -> color_eyre::Result<()> {
    match cmd {
        AdminCommands::AddMovie { title, video_url, duration, fields } => {
            admin::run_add_movie(app, fields.into_fields(title), video_url, duration, output).await
        }
        AdminCommands::AddSeries { title, plan, seasons, episodes, fields } => {
            let plans = admin::season_plans(plan.as_deref(), seasons, episodes)?;
            admin::run_add_series(app, fields.into_fields(title), plans, output).await
        }
        AdminCommands::Update {
            kind,
            id,
            title,
            video_url,
            description,
            genres,
            thumbnail_url,
            banner_url,
            year,
        } => {
            let fields = admin::TitleFields {
                id: None,
                title,
                description,
                genres,
                thumbnail_url,
                banner_url,
                year,
            };
            admin::run_update(app, kind, &id, fields, video_url, output).await
        }
        AdminCommands::Delete { kind, id } => admin::run_delete(app, kind, &id, output).await,
        AdminCommands::Seasons { series } => admin::run_list_seasons(app, &series, output).await,
        AdminCommands::AddSeason { series, number, title, episodes } => {
            admin::run_add_season(app, &series, number, title, episodes, output).await
        }
        AdminCommands::AddEpisode {
            series,
            season,
            number,
            title,
            video_url,
            description,
            thumbnail_url,
            duration,
        } => {
            let episode = Episode {
                id: String::new(),
                number,
                title: title.unwrap_or_default(),
                description: description.unwrap_or_default(),
                video_url,
                thumbnail_url,
                duration,
            };
            admin::run_add_episode(app, &series, season, episode, output).await
        }
        AdminCommands::DeleteSeason { series, season } => admin::run_delete_season(app, &series, season, output).await,
        AdminCommands::DeleteEpisode { series, season, episode } => {
            admin::run_delete_episode(app, &series, season, episode, output).await
        }
    }
}
