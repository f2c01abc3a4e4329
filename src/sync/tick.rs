use crate::server::ServerState;
use crate::sync::probe;
use log::debug;
use std::sync::Arc;
use std::time::Duration;

/* The scheduling half of peer sync: every configured interval, poke every
 * configured node. Probe outcomes are deliberately discarded. */
pub fn spawn_sync_tick(state: Arc<ServerState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if state.config.sync.nodes.is_empty() {
            return;
        }

        let interval =
            Duration::from_secs(state.config.sync.interval * 60);

        loop {
            tokio::time::sleep(interval).await;

            for node in &state.config.sync.nodes {
                if let Err(e) = probe(node).await {
                    debug!("sync probe to {} failed: {:#}", node.host, e);
                }
            }
        }
    })
}
