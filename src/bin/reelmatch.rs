use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use reelmatch_api::{
    config::Config,
    db::{create_redis_client, Cache},
    models::{DurationRange, GenreKey, VoteDirection},
    services::{CatalogProvider, HttpLedgerClient, LedgerApi, PlexProvider},
    session::{JsonFileStore, SessionController, SessionPhase},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Vote on a shared watchlist from the terminal
#[derive(Parser, Debug)]
#[command(name = "reelmatch", version)]
struct Cli {
    /// Ledger server to vote against
    #[arg(long, default_value = "http://localhost:3000")]
    server: String,

    /// Where this participant's session is kept between runs
    #[arg(long, default_value = ".reelmatch-session.json")]
    session: PathBuf,

    /// Cache catalog lookups in Redis (REDIS_URL)
    #[arg(long)]
    cache: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the genres the watchlist can be filtered by
    Genres,
    /// Replace the shared ledger with your watchlist
    Sync {
        /// Genre key as printed by `genres`
        #[arg(long, default_value = "any")]
        genre: String,
        /// any, short, standard, long or epic
        #[arg(long, default_value = "any")]
        length: String,
        #[arg(long)]
        shuffle: bool,
    },
    /// Start voting or show where you left off
    Start,
    /// Upvote the movie on screen
    Up,
    /// Downvote the movie on screen
    Down,
    /// Zero everyone's votes and start over
    Restart,
    /// Start over for yourself only
    RestartMe,
    /// Pick movies at random without voting
    Random {
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
    /// Show ledger totals and whether a match can still happen
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "reelmatch_api=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let ledger: Arc<dyn LedgerApi> = Arc::new(HttpLedgerClient::new(&cli.server));

    if let Command::Status = cli.command {
        return print_status(ledger.as_ref()).await;
    }

    let (cache, writer) = if cli.cache {
        let client = create_redis_client(&config.redis_url)?;
        let (cache, writer) = Cache::new(client).await;
        (cache, Some(writer))
    } else {
        (Cache::disabled(), None)
    };

    let token = config
        .plex_token
        .clone()
        .ok_or_else(|| anyhow!("PLEX_TOKEN must be set to reach the catalog"))?;
    let provider: Arc<dyn CatalogProvider> =
        Arc::new(PlexProvider::new(cache, token, config.plex_api_url.clone()));

    let store = JsonFileStore::open(&cli.session);
    let mut controller = SessionController::new(ledger, provider, store);

    let result = run(&mut controller, cli.command).await;

    if let Some(writer) = writer {
        writer.shutdown().await;
    }

    result
}

async fn run(controller: &mut SessionController<JsonFileStore>, command: Command) -> Result<()> {
    match command {
        Command::Genres => {
            controller.init().await?;
            for genre in controller.genres() {
                println!("{:<30} {}", genre.label, genre.key);
            }
        }
        Command::Sync {
            genre,
            length,
            shuffle,
        } => {
            let duration = DurationRange::preset(&length)
                .with_context(|| format!("Unknown movie length '{}'", length))?;
            controller.select_genre(GenreKey::from(genre.as_str()));
            controller.select_duration(duration);

            let inserted = controller.load_watchlist(shuffle).await?;
            println!("Loaded {} movies into the ledger", inserted);
        }
        Command::Start => {
            controller.initiate_or_resume_voting().await?;
            print_phase(controller);
        }
        Command::Up | Command::Down => {
            let direction = match command {
                Command::Up => VoteDirection::Up,
                _ => VoteDirection::Down,
            };

            controller.initiate_or_resume_voting().await?;
            if controller.current_movie().is_some() {
                controller.vote(direction).await?;
            }
            print_phase(controller);
        }
        Command::Restart => {
            controller.restart_voting().await?;
            print_phase(controller);
        }
        Command::RestartMe => {
            controller.restart_user_voting().await?;
            print_phase(controller);
        }
        Command::Random { count } => {
            let movie = controller.start_randomizing().await?;
            println!("{}", movie.details.title);
            for _ in 1..count {
                let movie = controller.next_random_movie().await?;
                println!("{}", movie.details.title);
            }
        }
        Command::Status => print_status(controller.ledger()).await?,
    }

    Ok(())
}

fn print_phase(controller: &SessionController<JsonFileStore>) {
    match (controller.phase(), controller.current_movie()) {
        (SessionPhase::Ended(outcome), _) => {
            println!("{}", outcome.headline);
            if let Some(title) = &outcome.title {
                println!("  {}", title);
            }
            println!("{}", outcome.message);
        }
        (_, Some(movie)) => {
            let details = &movie.details;
            match details.year {
                Some(year) => println!("#{} {} ({})", movie.id, details.title, year),
                None => println!("#{} {}", movie.id, details.title),
            }
            if let Some(tagline) = &details.tagline {
                println!("  {}", tagline);
            }
            if let Some(summary) = &details.summary {
                println!("{}", summary);
            }
        }
        (phase, None) => println!("Nothing to show ({:?})", phase),
    }
}

async fn print_status(ledger: &dyn LedgerApi) -> Result<()> {
    let movies = ledger.list_movies().await?;
    let capacity = ledger.can_match().await?;

    println!(
        "{} movies, {} of {} votes cast",
        movies.len(),
        capacity.votes_sum,
        capacity.threshold
    );

    match ledger.matching_movies().await?.first() {
        Some(movie) => println!("Matched: {}", movie.title),
        None if capacity.match_possible => println!("No match yet"),
        None => println!("No match possible"),
    }

    Ok(())
}
