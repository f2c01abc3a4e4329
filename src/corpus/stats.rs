use crate::corpus::Corpus;
use crate::util::sha256_hex;
use log::error;
use serde::Serialize;

/* The snapshot peers compare. Only the keys of the multisets travel; two
 * nodes with the same keys agree regardless of how often each saw them. */
#[derive(Serialize)]
pub struct StatsJson {
    pub hosts: Vec<String>,
    pub users: Vec<String>,
    pub passwords: Vec<String>,
    pub fingerprints: Vec<String>,
}

impl Corpus {
    pub fn stats_json(&self) -> String {
        let data = StatsJson {
            hosts: self.hosts.keys().cloned().collect(),
            users: self.users.keys().cloned().collect(),
            passwords: self.passwords.keys().cloned().collect(),
            fingerprints: self.fingerprints.keys().cloned().collect(),
        };

        match serde_json::to_string(&data) {
            Ok(json) => json,
            Err(e) => {
                error!("Could not marshal sync data: {}", e);
                String::new()
            }
        }
    }

    pub fn stats_hash(&self) -> String {
        sha256_hex(&self.stats_json())
    }
}
