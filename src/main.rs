use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueHint};
use tracing_subscriber::{EnvFilter, fmt};

use flashdeck::auth::issue_token;
use flashdeck::config::Config;
use flashdeck::crud::DB;
use flashdeck::generate::{GenerationRequest, Generator, RequestedCount};
use flashdeck::llm::{self, Provider};
use flashdeck::palette::Palette;
use flashdeck::server::{self, AppState};
use flashdeck::utils::{ask_yn, pluralize};

const DEFAULT_LOG_FILTER: &str = "flashdeck=info,tower_http=info";

#[derive(Parser, Debug)]
#[command(
    name = "flashdeck",
    version,
    about = "Turn study notes into flashcard decks.",
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true,
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Port to listen on. Overrides FLASHDECK_PORT
        #[arg(long)]
        port: Option<u16>,
        /// Model provider. Overrides FLASHDECK_PROVIDER
        #[arg(long, value_enum)]
        provider: Option<Provider>,
        /// Model name. Overrides FLASHDECK_MODEL
        #[arg(long)]
        model: Option<String>,
    },
    /// Generate a deck from a text file and save it for a user
    Generate {
        /// Source text file, or - to read stdin
        #[arg(value_name = "PATH", value_hint = ValueHint::FilePath)]
        path: PathBuf,
        /// Owner of the new deck. Created if it does not exist
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Number of cards to ask for (1-25)
        #[arg(long, value_name = "COUNT", default_value_t = 10)]
        count: i64,
        #[arg(long, value_enum)]
        provider: Option<Provider>,
        #[arg(long)]
        model: Option<String>,
    },
    /// Issue an API token for a user, creating the user if needed
    Token {
        #[arg(value_name = "EMAIL")]
        email: String,
    },
    /// Manage model API keys
    Llm {
        #[arg(long, value_enum, default_value = "openai")]
        provider: Provider,
        /// Store an API key in the local auth file. Prompts when KEY is omitted
        #[arg(long, value_name = "KEY", num_args = 0..=1, conflicts_with = "clear")]
        set: Option<Option<String>>,
        /// Remove the stored API key from the local auth file
        #[arg(long, conflicts_with = "test")]
        clear: bool,
        /// Verify the configured API key against the provider
        #[arg(long)]
        test: bool,
    },
}

#[tokio::main]
async fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run_cli().await {
        eprintln!("{:?}", err);
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            port,
            provider,
            model,
        } => {
            let config = Config::load()?.with_overrides(port, provider, model);
            let db = DB::open(&config.db_path).await?;
            let generator = build_generator(&config, &db)?;
            server::serve(AppState::new(db, generator), config.port).await?;
        }
        Command::Generate {
            path,
            email,
            count,
            provider,
            model,
        } => {
            let config = Config::load()?.with_overrides(None, provider, model);
            let count = RequestedCount::new(count)?;
            let text = read_source(&path)?;

            let db = DB::open(&config.db_path).await?;
            let generator = build_generator(&config, &db)?;
            let user = db.upsert_user(&email).await?;

            let deck = generator
                .generate(&GenerationRequest::new(text, count), user.id)
                .await?;
            db.close().await;

            println!(
                "Saved deck {} with {}",
                Palette::paint(Palette::ACCENT, &deck.topic),
                pluralize("card", deck.cards.len())
            );
            for (i, card) in deck.cards.iter().enumerate() {
                println!(
                    "\n{} {}\n{}",
                    Palette::paint(Palette::INFO, format!("{}.", i + 1)),
                    card.question,
                    Palette::dim(&card.answer)
                );
            }
        }
        Command::Token { email } => {
            let config = Config::load()?;
            let db = DB::open(&config.db_path).await?;

            if db.user_by_email(&email).await?.is_some() {
                let proceed = ask_yn(format!(
                    "{} already exists. A new token replaces the current one.",
                    Palette::paint(Palette::ACCENT, &email)
                ))?;
                if !proceed {
                    println!("Aborting; token unchanged.");
                    return Ok(());
                }
            }

            let (_, token) = issue_token(&db, &email).await?;
            db.close().await;

            println!("Token for {}:", Palette::paint(Palette::ACCENT, &email));
            println!("{}", Palette::paint(Palette::SUCCESS, token));
            println!(
                "{}",
                Palette::dim("Send it in the Authorization header. It is not shown again.")
            );
        }
        Command::Llm {
            provider,
            set,
            clear,
            test,
        } => handle_llm_command(provider, set, clear, test).await?,
    }

    Ok(())
}

fn build_generator(config: &Config, db: &DB) -> Result<Generator> {
    let oracle = llm::build_oracle(config.provider, &config.model)?;
    Ok(Generator::new(oracle, Arc::new(db.clone())).with_oracle_timeout(config.oracle_timeout))
}

fn read_source(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

async fn handle_llm_command(
    provider: Provider,
    set: Option<Option<String>>,
    clear: bool,
    test: bool,
) -> Result<()> {
    let mut action_taken = false;

    if let Some(key) = set {
        let key = match key {
            Some(key) => key,
            None => llm::prompt_for_api_key(provider)?,
        };
        llm::store_api_key(provider, &key)?;
        println!("Stored {} API key in the local auth file.", provider);
        action_taken = true;
    }

    if clear {
        let removed = llm::clear_api_key(provider)?;
        if removed {
            println!("Removed the stored {} API key.", provider);
        } else {
            println!("No {} API key found in the auth file.", provider);
        }
        action_taken = true;
    }

    if test {
        let source = llm::test_configured_api_key(provider).await?;
        println!(
            "{} API key from the {} is valid.",
            provider,
            source.description()
        );
        action_taken = true;
    }

    if !action_taken {
        bail!("No action provided. Use --set, --clear, or --test.");
    }
    Ok(())
}
