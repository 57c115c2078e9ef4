//! repo-watch: load one resource repository, print it, optionally keep it hot.
//!
//! One-shot by default: load, print the published set, resolve one id if
//! asked. With `--watch`, stays running and re-resolves after every reload
//! until Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use tiered_core::config::load_dotenv;
use tiered_core::UNSET;
use tiered_repo::{read_text, Coordinator, RepoConfig, Repository, TextDocument, VariantKey};

// ── CLI ─────────────────────────────────────────────────────────────

/// Load a `<domain> <language> <version>` keyed repository and resolve from it.
#[derive(Parser, Debug)]
#[command(name = "repo-watch", about)]
struct Cli {
    /// Repository root directory.
    #[arg(env = "TIERED_ROOT")]
    root: PathBuf,

    /// Resource id (path relative to a key directory). Repeatable.
    #[arg(short, long = "file", env = "TIERED_FILES", value_delimiter = ',', required = true)]
    files: Vec<String>,

    /// Repository id used in logs and reload requests.
    #[arg(long, default_value = "repo")]
    name: String,

    /// Resource id to resolve after loading.
    #[arg(short, long)]
    resolve: Option<String>,

    #[arg(long, default_value = "_")]
    domain: String,

    #[arg(long, default_value = "_")]
    language: String,

    #[arg(long, default_value = "_")]
    version: String,

    /// Keep running and hot-reload on filesystem changes.
    #[arg(short, long)]
    watch: bool,

    /// Override the per-directory damper (TIERED_FILE_DAMPER_MS).
    #[arg(long)]
    file_damper_ms: Option<u64>,

    /// Override the cross-directory damper (TIERED_CALLBACK_DAMPER_MS).
    #[arg(long)]
    callback_damper_ms: Option<u64>,
}

impl Cli {
    /// Selector from the flags; `_` means unset, as in directory names.
    fn selector(&self) -> VariantKey {
        let part = |s: &str| if s == UNSET { String::new() } else { s.to_string() };
        VariantKey::new(part(&self.domain), part(&self.language), part(&self.version))
    }

    fn config(&self) -> RepoConfig {
        let mut config = RepoConfig::from_env();
        config.watch = self.watch;
        if let Some(ms) = self.file_damper_ms {
            config.file_damper_ms = ms;
        }
        if let Some(ms) = self.callback_damper_ms {
            config.callback_damper_ms = ms;
        }
        config
    }
}

fn print_resolution(repo: &Repository<TextDocument>, id: &str, selector: &VariantKey) -> bool {
    match repo.resolve(id, selector) {
        Some(doc) => {
            println!(
                "{id} [{selector}] -> {} ({})",
                doc.key.variant,
                doc.key.path.display()
            );
            println!("{}", doc.body);
            true
        }
        None => {
            println!("{id} [{selector}] -> no match");
            false
        }
    }
}

// ── Main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();
    let config = cli.config();
    config.log_summary();

    let coordinator = Coordinator::new(config)?;
    let repo = coordinator.register_homogeneous(&cli.name, &cli.root, cli.files.clone(), read_text)?;

    println!("{}", serde_json::to_string_pretty(&repo.summary())?);

    let selector = cli.selector();
    let resolved = match &cli.resolve {
        Some(id) => print_resolution(&repo, id, &selector),
        None => true,
    };

    if !cli.watch {
        if !resolved {
            anyhow::bail!("nothing to resolve for the requested key");
        }
        return Ok(());
    }

    let handle = Arc::downgrade(&repo);
    let resolve = cli.resolve.clone();
    coordinator.set_on_reload(&cli.name, move || {
        let Some(repo) = handle.upgrade() else {
            return;
        };
        info!(repository = %repo.id(), generation = repo.generation(), "hot swap");
        if let Some(id) = &resolve {
            print_resolution(&repo, id, &selector);
        }
    })?;

    info!(repository = %cli.name, root = %cli.root.display(), "watching for changes, Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("repo-watch exited cleanly");
    Ok(())
}
