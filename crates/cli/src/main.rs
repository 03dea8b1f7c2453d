use clap::{Parser, Subcommand, ValueEnum};
use std::path::Path;
use std::sync::Arc;

use cover_resolver_core::config::{load_config, require_config_path, save_config_to, update_config_at, AppConfig};
use cover_resolver_core::identity::{CoverSize, FallbackCover};
use cover_resolver_core::isbn::BookKey;
use cover_resolver_core::recommend::load_recommendations;
use cover_resolver_core::resolve::{ResolutionResult, Resolver};
use cover_resolver_core::surface::CoverSlot;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinSet;

type CliResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "cover-resolver")]
#[command(about = "Book cover resolution with deterministic fallback covers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the palette and pattern a book's fallback cover uses
    Identity {
        #[arg(long, default_value = "")]
        title: String,

        #[arg(long, default_value = "")]
        author: String,
    },

    /// Render the fallback cover as SVG
    Fallback {
        #[arg(long, default_value = "")]
        title: String,

        #[arg(long, default_value = "")]
        author: String,

        #[arg(long, value_enum, default_value = "large")]
        size: SizeArg,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Resolve a cover image for one book
    Resolve {
        #[arg(long, default_value = "")]
        title: String,

        #[arg(long, default_value = "")]
        author: String,

        /// ISBN in any notation; digits are extracted
        #[arg(long)]
        isbn: Option<String>,
    },

    /// Resolve covers for every book in a recommendations JSON file
    Batch {
        /// JSON array of recommendations
        #[arg(required = true)]
        input: String,
    },

    /// List cover providers in resolution order
    Providers,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SizeArg {
    Small,
    Large,
}

impl From<SizeArg> for CoverSize {
    fn from(s: SizeArg) -> Self {
        match s {
            SizeArg::Small => CoverSize::Small,
            SizeArg::Large => CoverSize::Large,
        }
    }
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Initialize default config file
    Init,
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Key (dot-separated path)
        key: String,
        /// Value
        value: String,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Identity { title, author } => run_identity(title, author, cli.json),
        Commands::Fallback { title, author, size, output } => {
            run_fallback(title, author, (*size).into(), output.as_deref(), cli.json)
        }
        Commands::Resolve { title, author, isbn } => block_on(run_resolve(title, author, isbn.as_deref(), cli.json)),
        Commands::Batch { input } => block_on(run_batch(input, cli.json)),
        Commands::Providers => run_providers(cli.json),
        Commands::Config { action } => run_config(action, cli.json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn block_on(fut: impl std::future::Future<Output = CliResult>) -> CliResult {
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    rt.block_on(fut)
}

fn run_identity(title: &str, author: &str, json: bool) -> CliResult {
    // Same labels the rendered fallback uses, placeholders included.
    let id = FallbackCover::new(title, author).identity;
    if json {
        let out = serde_json::json!({
            "palette_index": id.palette_index,
            "pattern_index": id.pattern_index,
            "palette": id.palette(),
            "pattern": id.pattern(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        let palette = id.palette();
        println!("Palette: {} ({} -> {}, text {})", id.palette_index, palette.from, palette.to, palette.text);
        println!("Pattern: {} ({})", id.pattern_index, id.pattern().name);
    }
    Ok(())
}

fn run_fallback(title: &str, author: &str, size: CoverSize, output: Option<&str>, json: bool) -> CliResult {
    let cover = FallbackCover::new(title, author);
    let svg = cover.render_svg(size);
    match output {
        Some(path) => {
            std::fs::write(path, &svg)?;
            if json {
                let out = serde_json::json!({ "output": path, "cover": cover });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("Wrote fallback cover to {}", path);
            }
        }
        None if json => {
            let out = serde_json::json!({ "cover": cover, "svg": svg });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        None => println!("{}", svg),
    }
    Ok(())
}

async fn run_resolve(title: &str, author: &str, isbn: Option<&str>, json: bool) -> CliResult {
    let cfg = load_config();
    let resolver = Arc::new(Resolver::from_config(&cfg)?);
    let mut slot = CoverSlot::from_config(resolver, &cfg);
    let key = BookKey::new(title, author, isbn);

    slot.show(key.clone());
    let result = slot.settled().await.unwrap_or(ResolutionResult::Unresolved);
    let attempted = slot.session().map(|s| s.attempted_providers()).unwrap_or_default();
    let view = slot.view();

    if json {
        let out = serde_json::json!({
            "result": result,
            "attempted": attempted,
            "fallback": view.fallback(),
            "view": view,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_result(&key, &result);
        println!("Tried: {}", attempted.join(", "));
    }
    Ok(())
}

fn print_result(key: &BookKey, result: &ResolutionResult) {
    match result {
        ResolutionResult::Resolved { url, provider } => println!("{}: {} ({})", key.title, url, provider),
        ResolutionResult::Unresolved => {
            let id = FallbackCover::new(&key.title, &key.author).identity;
            println!(
                "{}: fallback (palette {}, pattern {})",
                key.title, id.palette_index, id.pattern_index
            );
        }
    }
}

async fn run_batch(input: &str, json: bool) -> CliResult {
    let books = load_recommendations(Path::new(input))?;
    let cfg = load_config();
    let resolver = Arc::new(Resolver::from_config(&cfg)?);

    let bar = if json {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(books.len() as u64);
        bar.set_style(ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}").map_err(|e| e.to_string())?);
        bar
    };

    // One independent session per book; results are collected back in input order.
    let mut tasks = JoinSet::new();
    for (index, book) in books.iter().enumerate() {
        let resolver = Arc::clone(&resolver);
        let key = book.book_key();
        tasks.spawn(async move {
            let result = resolver.resolve_once(&key).await;
            (index, key, result)
        });
    }

    let mut results: Vec<Option<(BookKey, ResolutionResult)>> = vec![None; books.len()];
    while let Some(joined) = tasks.join_next().await {
        let (index, key, result) = joined?;
        bar.set_message(key.title.clone());
        bar.inc(1);
        results[index] = Some((key, result));
    }
    bar.finish_and_clear();

    let results: Vec<(BookKey, ResolutionResult)> = results.into_iter().flatten().collect();
    if json {
        let out: Vec<_> = books
            .iter()
            .zip(&results)
            .map(|(book, (_, result))| {
                serde_json::json!({
                    "title": book.title,
                    "author": book.author,
                    "isbn": book.isbn,
                    "result": result,
                    "fallback": FallbackCover::new(&book.title, &book.author),
                    "purchase": book.purchase_links(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for (key, result) in &results {
            print_result(key, result);
        }
        let resolved = results.iter().filter(|(_, r)| r.is_resolved()).count();
        println!("Resolved {}/{}", resolved, results.len());
    }
    Ok(())
}

fn run_providers(json: bool) -> CliResult {
    let cfg = load_config();
    let resolver = Resolver::from_config(&cfg)?;
    let specs = resolver.registry().specs();
    if json {
        println!("{}", serde_json::to_string_pretty(&specs)?);
    } else {
        for (i, spec) in specs.iter().enumerate() {
            let status = if spec.enabled { "enabled" } else { "disabled" };
            println!("{}. {} [{}] {}ms per candidate", i + 1, spec.name, status, spec.candidate_timeout_ms);
        }
    }
    Ok(())
}

fn run_config(action: &ConfigAction, json: bool) -> CliResult {
    match action {
        ConfigAction::Init => {
            let path = require_config_path()?;
            save_config_to(&AppConfig::default(), &path)?;
            println!("Wrote default config to {}", path.display());
        }
        ConfigAction::Show => {
            let cfg = redacted(load_config());
            if json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else {
                println!("{}", toml::to_string_pretty(&cfg)?);
            }
        }
        ConfigAction::Set { key, value } => {
            let path = require_config_path()?;
            update_config_at(&path, key, value)?;
            if !json {
                println!("Updated {}", key);
            }
        }
    }
    Ok(())
}

/// Mask credentials before printing.
fn redacted(mut cfg: AppConfig) -> AppConfig {
    let mask = |v: &mut Option<String>| {
        if v.is_some() {
            *v = Some("********".to_string());
        }
    };
    mask(&mut cfg.credentials.kakao_api_key);
    mask(&mut cfg.credentials.naver_client_id);
    mask(&mut cfg.credentials.naver_client_secret);
    cfg
}
