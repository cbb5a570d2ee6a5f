use crate::broker::{self, Session};
use crate::cli::args::PurgeArgs;
use crate::config::Config;
use anyhow::Result;

/// Purge a queue and print how many messages were removed.
pub async fn run_purge(cfg: Config, args: PurgeArgs) -> Result<()> {
    cfg.validate()?;
    let session = Session::open(&cfg.connection).await?;
    let result = broker::purge(&session.channel, &args.queue).await;
    session.close().await;

    let purged = result?;
    tracing::info!(queue = %args.queue, purged, "queue purged");
    println!("{purged}");
    Ok(())
}
