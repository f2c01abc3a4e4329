use super::cli::Args;
use super::{Config, PartialConfig, SyncConfig};
use anyhow::{Context, Result, anyhow};
use log::trace;
use std::collections::HashMap;
use std::path::PathBuf;
use std::{env, str::FromStr};

pub fn resolve_config(cli: Args) -> Result<Config> {
    let (mut partial_config, mut sources) = load_partial(cli.no_config)?;

    // Override with environment variables if set
    if let Ok(log_level) = env::var("SSHTRAP_LOG_LEVEL") {
        if let Ok(log_level) = log::LevelFilter::from_str(&log_level) {
            partial_config.log_level = Some(log_level);
            sources.insert("log_level".into(), "environment".into());
        } else {
            return Err(anyhow!("Invalid log level: {}", log_level));
        }
    }
    if let Ok(host) = env::var("SSHTRAP_HOST") {
        if !host.is_empty() {
            partial_config.host = Some(host);
            sources.insert("host".into(), "environment".into());
        }
    }
    if let Ok(port) = env::var("SSHTRAP_PORT") {
        if !port.is_empty() {
            let port = port
                .parse::<u16>()
                .context(format!("Invalid port: {}", port))?;
            partial_config.port = Some(port);
            sources.insert("port".into(), "environment".into());
        }
    }
    if let Ok(data_dir) = env::var("SSHTRAP_DATA_DIR") {
        if !data_dir.is_empty() {
            partial_config.data_dir = Some(data_dir);
            sources.insert("data_dir".into(), "environment".into());
        }
    }

    // Override with CLI args if provided (highest precedence)
    if let Some(log_level) = cli.log_level {
        partial_config.log_level = Some(log_level);
        sources.insert("log_level".into(), "cli".into());
    }
    if let Some(host) = cli.host {
        partial_config.host = Some(host);
        sources.insert("host".into(), "cli".into());
    }
    if let Some(port) = cli.port {
        partial_config.port = Some(port);
        sources.insert("port".into(), "cli".into());
    }
    if let Some(data_dir) = cli.data_dir {
        partial_config.data_dir = Some(data_dir);
        sources.insert("data_dir".into(), "cli".into());
    }

    // If nothing else, fill in with some default values
    let host = partial_config.host.unwrap_or("0.0.0.0".to_string());
    if !sources.contains_key("host") {
        sources.insert("host".into(), "default".into());
    }

    let port = partial_config.port.unwrap_or(2222);
    if !sources.contains_key("port") {
        sources.insert("port".into(), "default".into());
    }

    let version = partial_config
        .version
        .unwrap_or("SSH-2.0-OpenSSH_8.2p1 Ubuntu-4ubuntu0.4".to_string());
    if !sources.contains_key("version") {
        sources.insert("version".into(), "default".into());
    }

    let max_idle_timeout = partial_config.max_idle_timeout.unwrap_or(300);
    if !sources.contains_key("max_idle_timeout") {
        sources.insert("max_idle_timeout".into(), "default".into());
    }

    let data_dir = PathBuf::from(
        partial_config
            .data_dir
            .unwrap_or("/var/lib/sshtrap".to_string()),
    );
    if !sources.contains_key("data_dir") {
        sources.insert("data_dir".into(), "default".into());
    }

    let sync = SyncConfig {
        interval: partial_config.sync.interval.unwrap_or(10),
        nodes: partial_config.sync.nodes.unwrap_or_default(),
    };
    if !sources.contains_key("sync") {
        sources.insert("sync".into(), "default".into());
    }

    let config = Config {
        log_level: partial_config.log_level.unwrap_or(log::LevelFilter::Info),
        host,
        port,
        version,
        max_idle_timeout,
        base_dir: data_dir.join("fs"),
        path_hosts: data_dir.join("hosts"),
        path_users: data_dir.join("users"),
        path_passwords: data_dir.join("passwords"),
        path_fingerprints: data_dir.join("fingerprints"),
        path_captures: data_dir.join("captures"),
        data_dir,
        sync,
        sources,
    };

    validate_config(&config)?;

    trace!("Data dir: {:?}", config.data_dir);
    trace!("Listening on: {}:{}", config.host, config.port);

    Ok(config)
}

pub fn load_partial(
    no_config: bool,
) -> Result<(PartialConfig, HashMap<String, String>)> {
    let config_paths = if no_config {
        vec![]
    } else {
        find_config_files()
    };
    let mut sources = HashMap::new();
    if config_paths.is_empty() {
        trace!("No config files found, using default config");
        return Ok((PartialConfig::default(), sources));
    }

    let mut merged_config = PartialConfig::default();
    for path in config_paths.iter() {
        let config_str = std::fs::read_to_string(path).context(format!(
            "Failed to read config file {}",
            path.display()
        ))?;

        let config: PartialConfig = toml::from_str(&config_str).context(
            format!("Failed to parse config file {}", path.display()),
        )?;

        merge_configs(
            &mut merged_config,
            &mut sources,
            config,
            path.to_str()
                .context("Failed to convert config path to str")?,
        );
        trace!("Loaded config file: {}", path.display());
    }

    Ok((merged_config, sources))
}

/** Returns a vec of all config files found, lowest precedence first */
fn find_config_files() -> Vec<PathBuf> {
    let mut paths_to_check = vec![PathBuf::from("/etc/sshtrap.toml")];

    if let Ok(home) = env::var("HOME") {
        if !home.is_empty() {
            paths_to_check
                .push(PathBuf::from(home).join(".config/sshtrap/config.toml"));
        }
    }

    paths_to_check.push(PathBuf::from("./sshtrap.toml"));

    paths_to_check
        .into_iter()
        .filter(|path| path.exists())
        .collect()
}

fn merge_configs(
    base: &mut PartialConfig,
    sources: &mut HashMap<String, String>,
    override_config: PartialConfig,
    source: &str,
) {
    if let Some(log_level) = override_config.log_level {
        base.log_level = Some(log_level);
        sources.insert("log_level".into(), source.into());
    }
    if let Some(host) = override_config.host {
        base.host = Some(host);
        sources.insert("host".into(), source.into());
    }
    if let Some(port) = override_config.port {
        base.port = Some(port);
        sources.insert("port".into(), source.into());
    }
    if let Some(version) = override_config.version {
        base.version = Some(version);
        sources.insert("version".into(), source.into());
    }
    if let Some(max_idle_timeout) = override_config.max_idle_timeout {
        base.max_idle_timeout = Some(max_idle_timeout);
        sources.insert("max_idle_timeout".into(), source.into());
    }
    if let Some(data_dir) = override_config.data_dir {
        base.data_dir = Some(data_dir);
        sources.insert("data_dir".into(), source.into());
    }
    if let Some(interval) = override_config.sync.interval {
        base.sync.interval = Some(interval);
        sources.insert("sync".into(), source.into());
    }
    if let Some(nodes) = override_config.sync.nodes {
        base.sync.nodes = Some(nodes);
        sources.insert("sync".into(), source.into());
    }
}

fn validate_config(config: &Config) -> Result<()> {
    if config.port == 0 {
        return Err(anyhow!("Invalid listen port: 0"));
    }
    if config.sync.interval == 0 {
        return Err(anyhow!("Sync interval must be at least one minute"));
    }
    for node in &config.sync.nodes {
        if node.host.is_empty() || node.user.is_empty() {
            return Err(anyhow!("Sync node is missing a host or user"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::LevelFilter;

    #[test]
    fn test_merge_configs() {
        let mut base = PartialConfig::default();
        let mut sources = HashMap::new();

        let override_config = PartialConfig {
            log_level: Some(LevelFilter::Debug),
            host: Some("127.0.0.1".to_string()),
            port: Some(2022),
            version: Some("SSH-2.0-test".to_string()),
            max_idle_timeout: Some(60),
            data_dir: Some("/tmp/trap".to_string()),
            sync: super::super::PartialSync {
                interval: Some(5),
                nodes: None,
            },
        };

        merge_configs(&mut base, &mut sources, override_config, "test-config");

        assert_eq!(base.log_level, Some(LevelFilter::Debug));
        assert_eq!(base.host, Some("127.0.0.1".to_string()));
        assert_eq!(base.port, Some(2022));
        assert_eq!(base.version, Some("SSH-2.0-test".to_string()));
        assert_eq!(base.max_idle_timeout, Some(60));
        assert_eq!(base.data_dir, Some("/tmp/trap".to_string()));
        assert_eq!(base.sync.interval, Some(5));

        assert_eq!(sources.get("log_level"), Some(&"test-config".to_string()));
        assert_eq!(sources.get("host"), Some(&"test-config".to_string()));
        assert_eq!(sources.get("data_dir"), Some(&"test-config".to_string()));
    }

    #[test]
    fn test_validate_config_rejects_bad_values() {
        let args = Args {
            log_level: None,
            host: None,
            port: Some(0),
            data_dir: None,
            no_config: true,
        };
        assert!(resolve_config(args).is_err());
    }

    #[test]
    fn test_resolve_defaults() {
        let args = Args {
            log_level: None,
            host: None,
            port: None,
            data_dir: Some("/tmp/trap-test".to_string()),
            no_config: true,
        };
        let config = resolve_config(args).expect("config should resolve");
        assert_eq!(config.port, 2222);
        assert_eq!(config.base_dir, PathBuf::from("/tmp/trap-test/fs"));
        assert_eq!(config.path_hosts, PathBuf::from("/tmp/trap-test/hosts"));
        assert_eq!(
            config.path_captures,
            PathBuf::from("/tmp/trap-test/captures")
        );
        assert!(config.sync.nodes.is_empty());
    }
}
