use std::{io, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use federation::{HostRuntime, HttpManifestFetcher};
use shared::domain::RemoteDescriptor;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod route;
mod session;

use session::{Session, Step};

/// Composes the products and cart remotes and walks through a scripted
/// session, e.g. `host /products add=1:Headphones:199 /cart remove=0`.
#[derive(Parser, Debug)]
struct Args {
    /// Host config file (defaults to `host.toml` or `$HOST_CONFIG`).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Extra or replacement remote as `name@url`. Repeatable.
    #[arg(long = "remote")]
    remotes: Vec<RemoteDescriptor>,
    /// Run the remotes as if each were launched on its own: no host props,
    /// cart adds travel over the `mfe:cart:add` channel.
    #[arg(long)]
    standalone: bool,
    /// Paths (`/`, `/products`, `/cart`), `add=ID:NAME:PRICE` or `remove=INDEX`.
    #[arg(default_value = "/")]
    steps: Vec<Step>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let settings = config::load_settings(args.config.as_deref())?;
    let mut remotes = settings.descriptors()?;
    for remote in args.remotes {
        remotes.retain(|existing| existing.name != remote.name);
        remotes.push(remote);
    }

    let fetcher = HttpManifestFetcher::new(settings.fetch_timeout())
        .context("failed to build HTTP client")?;
    let runtime = HostRuntime::new(Arc::new(fetcher), settings.shared.clone());
    runtime.register_remotes(remotes)?;
    for remote in runtime.loader().registered() {
        info!(remote = %remote.name, url = %remote.remote_entry_url, "remote registered");
    }

    let mut session = if args.standalone {
        info!("remotes mounted standalone");
        Session::standalone(&runtime)
    } else {
        Session::new(&runtime)
    };
    let mut stdout = io::stdout().lock();
    for step in args.steps {
        session.apply(step, &mut stdout).await?;
    }

    let conflicts = runtime.registry().lock().conflicts().len();
    if conflicts > 0 {
        warn!(conflicts, "some remotes run their own copy of a shared dependency");
    }
    Ok(())
}
