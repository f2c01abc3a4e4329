use crate::config::SyncNode;
use anyhow::{Result, anyhow};
use log::trace;
use russh::client::{self, AuthResult};
use russh::{ChannelMsg, Disconnect};
use std::sync::Arc;
use std::time::Duration;

struct ProbeHandler;

impl client::Handler for ProbeHandler {
    type Error = anyhow::Error;

    /* Peers are configured by address and shared secret; their host keys
     * rotate every restart, so there is nothing to pin. */
    async fn check_server_key(
        &mut self,
        _server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/* One outbound probe: authenticate against the peer with the shared sync
 * credentials, run `check`, and hang up. The reply is discarded; the
 * probe exists to keep the peer link warm and kick its handshake. */
pub async fn probe(node: &SyncNode) -> Result<()> {
    let config = Arc::new(client::Config::default());

    let mut handle = client::connect(
        config,
        (node.host.as_str(), node.port),
        ProbeHandler,
    )
    .await?;

    let auth = handle
        .authenticate_password(&node.user, &node.password)
        .await?;
    if !matches!(auth, AuthResult::Success) {
        return Err(anyhow!("peer rejected sync credentials"));
    }

    let mut channel = handle.channel_open_session().await?;
    channel.exec(true, "check").await?;

    /* Drain until the peer closes the channel; a stuck peer gets cut
     * off rather than wedging the tick. */
    let drain = async {
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { data } => {
                    trace!(
                        "sync probe to {} answered {} byte(s)",
                        node.host,
                        data.len()
                    );
                }
                ChannelMsg::Close | ChannelMsg::Eof => break,
                _ => {}
            }
        }
    };
    let _ = tokio::time::timeout(Duration::from_secs(10), drain).await;

    handle
        .disconnect(Disconnect::ByApplication, "", "en-US")
        .await?;

    Ok(())
}
