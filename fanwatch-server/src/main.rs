use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

mod server;

#[derive(Parser, Debug, Clone)]
#[command(name = "fanwatch")]
#[command(author, version, about = "fanwatch - announces creator streams and posts in Discord guilds")]
pub struct Args {
    /// Environment file to load instead of `./.env`
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Run a single monitor cycle and exit (no gateway connection)
    #[arg(long, default_value = "false")]
    once: bool,

    /// Do not apply database migrations on startup
    #[arg(long, default_value = "false")]
    skip_migrations: bool,
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("fanwatch=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub)
        .expect("Failed to set global subscriber");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();
    info!("fanwatch starting. once={}, skip_migrations={}", args.once, args.skip_migrations);

    let result = if args.once {
        server::run_once(args).await
    } else {
        server::run_server(args).await
    };

    if let Err(e) = result {
        error!("Server error: {:?}", e);
        return Err(e.into());
    }

    info!("Main finished. Goodbye!");
    Ok(())
}
