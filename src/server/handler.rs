use crate::server::{FakeShell, ServerState};
use anyhow::{Context, Result};
use colored::Colorize;
use log::{debug, error, info};
use russh::keys::ssh_key::rand_core::OsRng;
use russh::keys::{Algorithm, PrivateKey};
use russh::server::{Auth, Handler, Msg, Server, Session};
use russh::{Channel, ChannelId, CryptoVec, Disconnect, Pty, SshId};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/* The SSH front-end. Accepts password authentication only, hands every
 * accepted session a fake shell bound to the attacker's sandbox, and
 * refuses anything that would reach past the trap (port forwarding in
 * either direction). */
pub struct TrapServer {
    state: Arc<ServerState>,
}

impl TrapServer {
    pub fn new(state: Arc<ServerState>) -> Self {
        TrapServer { state }
    }

    pub async fn run(&mut self) -> Result<()> {
        let config = russh::server::Config {
            server_id: SshId::Standard(self.state.config.version.clone()),
            inactivity_timeout: Some(Duration::from_secs(
                self.state.config.max_idle_timeout,
            )),
            auth_rejection_time: Duration::from_secs(3),
            auth_rejection_time_initial: Some(Duration::ZERO),
            keys: vec![
                PrivateKey::random(&mut OsRng, Algorithm::Ed25519)
                    .context("generating host key")?,
            ],
            ..Default::default()
        };

        info!(
            "Starting SSH honeypot on {}",
            format!("{}:{}", self.state.config.host, self.state.config.port)
                .bright_yellow()
        );

        let addr =
            (self.state.config.host.clone(), self.state.config.port);
        self.run_on_address(Arc::new(config), addr)
            .await
            .context("running SSH listener")?;

        Ok(())
    }
}

impl Server for TrapServer {
    type Handler = ClientHandler;

    fn new_client(&mut self, addr: Option<SocketAddr>) -> ClientHandler {
        let host = addr
            .map(|a| a.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let session_id = Uuid::new_v4();
        debug!("[{}] connection from {}", session_id, host);

        ClientHandler {
            state: self.state.clone(),
            host,
            user: String::new(),
            session_id,
            shell: None,
            finished: false,
        }
    }

    /* Hostile clients drop connections mid-handshake all day long; a
     * plain end-of-file is not worth a log line. */
    fn handle_session_error(&mut self, error: anyhow::Error) {
        if let Some(e) = error.downcast_ref::<russh::Error>() {
            match e {
                russh::Error::Disconnect => return,
                russh::Error::IO(io)
                    if io.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return;
                }
                _ => {}
            }
        }
        error!("connection failed: {:#}", error);
    }
}

pub struct ClientHandler {
    state: Arc<ServerState>,
    host: String,
    user: String,
    session_id: Uuid,
    shell: Option<FakeShell>,
    finished: bool,
}

impl ClientHandler {
    /* Logs a mid-session failure with attribution, then converts it into
     * a disconnect so the listener's catch-all stays quiet about it. */
    fn fail(&self, err: impl std::fmt::Display) -> anyhow::Error {
        self.state
            .connection_failed(&self.host, &err.to_string());
        russh::Error::Disconnect.into()
    }

    fn is_peer(&self) -> bool {
        self.state.is_sync_client(&self.host)
    }

    /* Builds the fake shell and, for attackers, mounts a fresh overlay
     * session over the sandbox belonging to this source address. Peers
     * get a plain shell; their sessions carry sync traffic, not attacks. */
    async fn start_shell(&mut self) -> Result<bool> {
        if self.shell.is_some() {
            return Ok(true);
        }

        let overlay = if self.is_peer() {
            None
        } else {
            let state = self.state.clone();
            let host = self.host.clone();
            let mounted = tokio::task::spawn_blocking(move || {
                let overlay = state.overlays.new_session(&host)?;
                overlay.mount()?;
                Ok::<_, anyhow::Error>(overlay)
            })
            .await
            .context("sandbox mount task")?;

            match mounted {
                Ok(overlay) => Some(overlay),
                Err(e) => {
                    error!(
                        "Failed to prepare sandbox for {}: {:#}",
                        self.host.bright_yellow(),
                        e
                    );
                    return Ok(false);
                }
            }
        };

        self.state.register_shell(&self.host, &self.user);
        self.shell =
            Some(FakeShell::new(&self.user, &self.host, overlay));

        Ok(true)
    }

    /* The session orchestration tail: time accounting, corpus
     * persistence, capture write, registry cleanup, sandbox teardown.
     * Runs exactly once, on whichever exit path comes first. */
    fn finalize(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        if let Some(mut shell) = self.shell.take() {
            let stats = shell.stats();
            self.state.finish_session(&stats);
            shell.close();
        }
        debug!("[{}] session finished", self.session_id);
    }
}

impl Drop for ClientHandler {
    fn drop(&mut self) {
        self.finalize();
    }
}

impl Handler for ClientHandler {
    type Error = anyhow::Error;

    async fn auth_password(
        &mut self,
        user: &str,
        password: &str,
    ) -> Result<Auth, Self::Error> {
        self.user = user.to_string();

        if self.state.authenticate(user, password, &self.host) {
            Ok(Auth::Accept)
        } else {
            Ok(Auth::reject())
        }
    }

    async fn auth_publickey(
        &mut self,
        user: &str,
        _public_key: &russh::keys::PublicKey,
    ) -> Result<Auth, Self::Error> {
        // password only; we want credentials, not key proofs
        self.user = user.to_string();
        Ok(Auth::reject())
    }

    async fn channel_open_session(
        &mut self,
        _channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }

    async fn pty_request(
        &mut self,
        channel: ChannelId,
        term: &str,
        _col_width: u32,
        _row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(Pty, u32)],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        if !self.is_peer() {
            info!(
                "{}@{} started {} PTY session",
                self.user.bright_green(),
                self.host.bright_yellow(),
                term.bright_blue()
            );
        }
        session.channel_success(channel).map_err(|e| self.fail(e))?;
        Ok(())
    }

    async fn shell_request(
        &mut self,
        channel: ChannelId,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        if !self.is_peer() {
            info!(
                "{}@{} requested {} session",
                self.user.bright_green(),
                self.host.bright_yellow(),
                "shell".bright_blue()
            );
        }

        if !self.start_shell().await? {
            let _ = session.disconnect(
                Disconnect::ByApplication,
                "",
                "en-US",
            );
            return Ok(());
        }

        if let Some(shell) = &self.shell {
            let greeting = format!("{}{}", shell.banner(), shell.prompt());
            session
                .data(channel, CryptoVec::from_slice(greeting.as_bytes()))
                .map_err(|e| self.fail(e))?;
        }
        session.channel_success(channel).map_err(|e| self.fail(e))?;

        Ok(())
    }

    async fn exec_request(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        let cmd = String::from_utf8_lossy(data).trim().to_string();

        if !self.is_peer() {
            info!(
                "{}@{} requested {} session",
                self.user.bright_green(),
                self.host.bright_yellow(),
                "exec".bright_blue()
            );
        }

        /* The peer handshake: a sync client asks `check` and gets the
         * stats hash back, which is how nodes notice divergence. */
        if self.is_peer() && cmd == "check" {
            let reply = format!("{}\n", self.state.stats_hash());
            session
                .data(channel, CryptoVec::from_slice(reply.as_bytes()))
                .map_err(|e| self.fail(e))?;
            session
                .exit_status_request(channel, 0)
                .map_err(|e| self.fail(e))?;
            session.close(channel).map_err(|e| self.fail(e))?;
            return Ok(());
        }

        if !self.start_shell().await? {
            let _ = session.disconnect(
                Disconnect::ByApplication,
                "",
                "en-US",
            );
            return Ok(());
        }

        let output = match &mut self.shell {
            Some(shell) => shell.exec(&cmd),
            None => String::new(),
        };
        if !output.is_empty() {
            session
                .data(channel, CryptoVec::from_slice(output.as_bytes()))
                .map_err(|e| self.fail(e))?;
        }
        session
            .exit_status_request(channel, 0)
            .map_err(|e| self.fail(e))?;
        session.close(channel).map_err(|e| self.fail(e))?;

        Ok(())
    }

    async fn data(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        let output = match &mut self.shell {
            Some(shell) => shell.feed(data),
            None => return Ok(()),
        };

        if !output.data.is_empty() {
            session
                .data(channel, CryptoVec::from_slice(&output.data))
                .map_err(|e| self.fail(e))?;
        }

        if output.disconnect {
            session.close(channel).map_err(|e| self.fail(e))?;
        }

        Ok(())
    }

    async fn channel_eof(
        &mut self,
        _channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.finalize();
        Ok(())
    }

    async fn channel_close(
        &mut self,
        _channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.finalize();
        Ok(())
    }

    /* Local port forwarding: always denied. */
    async fn channel_open_direct_tcpip(
        &mut self,
        _channel: Channel<Msg>,
        host_to_connect: &str,
        port_to_connect: u32,
        _originator_address: &str,
        _originator_port: u32,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        info!(
            "{}@{} tried to locally forward {}:{}. Request denied!",
            self.user.bright_green(),
            self.host.bright_yellow(),
            host_to_connect.bright_red(),
            port_to_connect.to_string().bright_red()
        );
        Ok(false)
    }

    /* Reverse port forwarding: always denied. */
    async fn tcpip_forward(
        &mut self,
        address: &str,
        port: &mut u32,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        info!(
            "{}@{} tried to reverse forward {}:{}. Request denied!",
            self.user.bright_green(),
            self.host.bright_yellow(),
            address.bright_red(),
            port.to_string().bright_red()
        );
        Ok(false)
    }
}
