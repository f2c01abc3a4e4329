use super::impls::{default_ssh_port, deserialize_level_filter};
use serde::Deserialize;
use std::{collections::HashMap, path::PathBuf};

/* One peer node we exchange observations with. A session authenticating
 * with exactly this triple is a sync client, not an attacker. */
#[derive(Deserialize, Debug, Clone)]
pub struct SyncNode {
    pub host: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    pub user: String,
    pub password: String,
}

#[derive(Deserialize, Default)]
pub struct PartialSync {
    pub interval: Option<u64>,
    pub nodes: Option<Vec<SyncNode>>,
}

#[derive(Deserialize, Default)]
pub struct PartialConfig {
    #[serde(deserialize_with = "deserialize_level_filter", default)]
    pub log_level: Option<log::LevelFilter>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub version: Option<String>,
    pub max_idle_timeout: Option<u64>,
    pub data_dir: Option<String>,
    #[serde(default)]
    pub sync: PartialSync,
}

#[derive(Clone)]
pub struct SyncConfig {
    // Minutes between outbound probes
    pub interval: u64,
    pub nodes: Vec<SyncNode>,
}

#[derive(Clone)]
pub struct Config {
    pub log_level: log::LevelFilter,
    pub host: String,
    pub port: u16,
    // Advertised SSH version banner
    pub version: String,
    // Seconds of silence before the front-end drops a session
    pub max_idle_timeout: u64,
    pub data_dir: PathBuf,
    // Overlay base: defaultfs/ and sandboxes/ live under here
    pub base_dir: PathBuf,
    pub path_hosts: PathBuf,
    pub path_users: PathBuf,
    pub path_passwords: PathBuf,
    pub path_fingerprints: PathBuf,
    pub path_captures: PathBuf,
    pub sync: SyncConfig,
    pub sources: HashMap<String, String>,
}
