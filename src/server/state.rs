use crate::config::Config;
use crate::corpus::{Corpus, ShellStats};
use crate::defaultfs::DEFAULT_FS;
use crate::overlay::OverlayFsManager;
use crate::util::mkdir;
use anyhow::{Context, Result};
use colored::Colorize;
use log::{error, info};
use std::collections::HashMap;
use std::sync::Mutex;

/* Everything the per-connection tasks share. The corpus and the two
 * registries sit behind one coarse lock; honeypot throughput never makes
 * that lock interesting. Mounting and unmounting happen well outside
 * it. */
#[derive(Default)]
struct Registries {
    corpus: Corpus,
    // host -> user of the currently running fake shell
    shells: HashMap<String, String>,
    // host -> authenticated with sync credentials on its last attempt
    sync_clients: HashMap<String, bool>,
}

pub struct ServerState {
    pub config: Config,
    pub overlays: OverlayFsManager,
    inner: Mutex<Registries>,
}

impl ServerState {
    /* Fatal on error: without the base layout there is no honeypot. */
    pub fn new(config: Config) -> Result<Self> {
        mkdir(&config.data_dir, 0o755).context("can't make data dir")?;
        mkdir(&config.path_captures, 0o755)
            .context("can't make captures dir")?;

        let overlays = OverlayFsManager::init(&config.base_dir, DEFAULT_FS)
            .context("initialising overlay manager")?;

        let mut registries = Registries::default();
        registries.corpus.load(&config);

        Ok(ServerState {
            config,
            overlays,
            inner: Mutex::new(registries),
        })
    }

    pub fn with_corpus<R>(&self, f: impl FnOnce(&mut Corpus) -> R) -> R {
        let mut inner = self.inner.lock().expect("Failed to lock registries");
        f(&mut inner.corpus)
    }

    pub fn authenticate(&self, usr: &str, pwd: &str, host: &str) -> bool {
        let now = chrono::Utc::now().timestamp();
        let mut inner = self.inner.lock().expect("Failed to lock registries");

        let decision = super::auth::decide(
            &inner.corpus,
            &self.config.sync.nodes,
            usr,
            pwd,
            host,
            now,
        );

        if decision.is_peer() {
            inner.sync_clients.insert(host.to_string(), true);
            return true;
        }
        inner.sync_clients.insert(host.to_string(), false);

        if decision.accept {
            inner
                .corpus
                .record_login_success(usr, pwd, host, decision.reason);
        } else {
            inner
                .corpus
                .record_login_failure(usr, pwd, host, decision.reason);
        }

        decision.accept
    }

    pub fn is_sync_client(&self, host: &str) -> bool {
        let inner = self.inner.lock().expect("Failed to lock registries");
        *inner.sync_clients.get(host).unwrap_or(&false)
    }

    pub fn register_shell(&self, host: &str, usr: &str) {
        let mut inner = self.inner.lock().expect("Failed to lock registries");
        inner.shells.insert(host.to_string(), usr.to_string());
    }

    pub fn unregister_shell(&self, host: &str) {
        let mut inner = self.inner.lock().expect("Failed to lock registries");
        inner.shells.remove(host);
    }

    /* Attributes a dropped connection to the attacker's current user when
     * a shell is live, or to the bare host otherwise. End-of-file errors
     * never reach this point. */
    pub fn connection_failed(&self, host: &str, err: &str) {
        let inner = self.inner.lock().expect("Failed to lock registries");
        if inner.corpus.has_host(host) {
            if let Some(usr) = inner.shells.get(host) {
                error!(
                    "{}@{}'s connection failed: {}",
                    usr.bright_green(),
                    host.bright_yellow(),
                    err.bright_red()
                );
                return;
            }
        }

        error!(
            "{}'s connection failed: {}",
            host.bright_yellow(),
            err.bright_red()
        );
    }

    /* Session wrap-up, run on every exit path: attacker time
     * accounting, corpus persistence, and the capture write. Peers are
     * exempt from everything except persistence. */
    pub fn finish_session(&self, stats: &ShellStats) {
        let is_peer = self.is_sync_client(&stats.host);

        let mut inner = self.inner.lock().expect("Failed to lock registries");

        if !is_peer {
            inner.corpus.time_wasted += stats.time_spent;
            info!(
                "{}@{} spent {}s running {} command(s)",
                stats.user.bright_green(),
                stats.host.bright_yellow(),
                stats.time_spent.to_string().bright_cyan(),
                stats.commands_executed.to_string().bright_blue(),
            );
        }

        inner.corpus.persist(&self.config);

        if !is_peer {
            inner
                .corpus
                .save_capture(&self.config.path_captures, stats);
        }

        inner.shells.remove(&stats.host);
    }

    pub fn stats_json(&self) -> String {
        self.with_corpus(|corpus| corpus.stats_json())
    }

    pub fn stats_hash(&self) -> String {
        self.with_corpus(|corpus| corpus.stats_hash())
    }
}
