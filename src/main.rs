use assessd::Args;
use clap::Parser;
use daemon_common::{maybe_daemonize, try_init_tracing};

fn main() -> anyhow::Result<()> {
    // A missing .env file is normal; the environment may already be set.
    dotenv::dotenv().ok();
    let args = Args::parse();
    try_init_tracing(args.log_level)?;
    maybe_daemonize(args.daemon)?;
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(assessd::run(args))
}
