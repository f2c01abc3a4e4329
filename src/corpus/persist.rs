use crate::config::Config;
use crate::corpus::Corpus;
use log::{debug, error};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/* Persistence is line-oriented and best-effort: a failed read or write is
 * logged and the in-memory corpus keeps accumulating. Only keys are
 * written; occurrence counts are rebuilt from zero by later
 * observations. */

fn load_into(path: &Path, what: &str, mut add: impl FnMut(&str)) {
    if !path.exists() {
        return;
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            error!("Failed to read {} file: {}", what, e);
            return;
        }
    };

    let lines: Vec<&str> = content.split('\n').collect();
    debug!("Loading {} {}", lines.len(), what);
    for line in lines {
        add(line);
    }
}

fn save_keys(path: &Path, what: &str, keys: &HashMap<String, u64>) {
    let mut data =
        keys.keys().cloned().collect::<Vec<String>>().join("\n");
    data.push('\n');

    if let Err(e) = fs::write(path, data) {
        error!("Failed to write {} file: {}", what, e);
    }
}

impl Corpus {
    pub fn load(&mut self, config: &Config) {
        load_into(&config.path_hosts, "hosts", |s| self.add_host(s));
        load_into(&config.path_users, "users", |s| self.add_user(s));
        load_into(&config.path_passwords, "passwords", |s| {
            self.add_password(s)
        });
        load_into(&config.path_fingerprints, "fingerprints", |s| {
            self.add_fingerprint(s)
        });
    }

    pub fn persist(&self, config: &Config) {
        save_keys(&config.path_users, "users", &self.users);
        save_keys(&config.path_passwords, "passwords", &self.passwords);
        save_keys(&config.path_hosts, "hosts", &self.hosts);
        save_keys(&config.path_fingerprints, "fingerprints", &self.fingerprints);
    }
}
