use rand::Rng;
use rstest::*;
use sshtrap::config::{Config, SyncConfig, SyncNode};
use sshtrap::server::ServerState;
use std::collections::HashMap;
use std::path::Path;
use tempfile::TempDir;

#[allow(dead_code)]
pub fn rid() -> String {
    let mut rng = rand::rng();
    let rid: String = (0..10)
        .map(|_| rng.sample(rand::distr::Alphanumeric) as char)
        .collect();
    rid
}

#[allow(dead_code)]
pub fn test_config(data_dir: &Path) -> Config {
    Config {
        log_level: log::LevelFilter::Trace,
        host: "127.0.0.1".to_string(),
        port: 2222,
        version: "SSH-2.0-test".to_string(),
        max_idle_timeout: 30,
        base_dir: data_dir.join("fs"),
        path_hosts: data_dir.join("hosts"),
        path_users: data_dir.join("users"),
        path_passwords: data_dir.join("passwords"),
        path_fingerprints: data_dir.join("fingerprints"),
        path_captures: data_dir.join("captures"),
        data_dir: data_dir.to_path_buf(),
        sync: SyncConfig {
            interval: 10,
            nodes: vec![],
        },
        sources: HashMap::new(),
    }
}

#[allow(dead_code)]
pub fn test_sync_node() -> SyncNode {
    SyncNode {
        host: "192.0.2.77".to_string(),
        port: 2222,
        user: "syncbot".to_string(),
        password: "sync-secret".to_string(),
    }
}

/* A throwaway honeypot rooted in a temp directory. The directory lives as
 * long as the fixture, then everything under it goes away. */
pub struct TrapFixture {
    pub dir: TempDir,
    pub state: ServerState,
}

impl TrapFixture {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self::with_nodes(vec![])
    }

    #[allow(dead_code)]
    pub fn with_nodes(nodes: Vec<SyncNode>) -> Self {
        let dir = TempDir::with_prefix(format!("sshtrap-test-{}-", rid()))
            .expect("Failed to create temp dir");
        let mut config = test_config(dir.path());
        config.sync.nodes = nodes;
        let state =
            ServerState::new(config).expect("Failed to initialise state");
        TrapFixture { dir, state }
    }
}

#[fixture]
#[allow(dead_code)]
pub fn trap() -> TrapFixture {
    TrapFixture::new()
}

#[fixture]
#[allow(dead_code)]
pub fn trap_with_peer() -> TrapFixture {
    TrapFixture::with_nodes(vec![test_sync_node()])
}
