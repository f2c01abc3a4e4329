use std::collections::HashMap;

#[derive(Default)]
pub struct Logins {
    pub attempts: HashMap<String, u64>,
    pub failed: HashMap<String, u64>,
    pub ok: HashMap<String, u64>,
}

/* Everything the honeypot has learned so far. The multisets map an
 * observed artifact to how often it was seen; only the keys are ever
 * persisted, so counts restart at zero after a restart and are rebuilt by
 * new observations. */
#[derive(Default)]
pub struct Corpus {
    pub hosts: HashMap<String, u64>,
    pub users: HashMap<String, u64>,
    pub passwords: HashMap<String, u64>,
    pub fingerprints: HashMap<String, u64>,
    pub logins: Logins,
    // Seconds attackers spent talking to the fake shell. In-memory only.
    pub time_wasted: u64,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_host(&self, host: &str) -> bool {
        self.hosts.contains_key(host)
    }

    pub fn has_user(&self, usr: &str) -> bool {
        self.users.contains_key(usr)
    }

    pub fn has_password(&self, pwd: &str) -> bool {
        self.passwords.contains_key(pwd)
    }

    pub fn has_fingerprint(&self, sha1: &str) -> bool {
        self.fingerprints.contains_key(sha1)
    }

    /* The add_* family trims its input and silently drops empty keys, so
     * blank lines in the persisted files and whitespace credentials never
     * pollute the corpus. */
    pub fn add_host(&mut self, host: &str) {
        let host = host.trim();
        if host.is_empty() {
            return;
        }

        if !self.has_host(host) {
            self.logins.attempts.insert(host.to_string(), 0);
            self.logins.failed.insert(host.to_string(), 0);
            self.logins.ok.insert(host.to_string(), 0);
        }
        *self.hosts.entry(host.to_string()).or_insert(0) += 1;
    }

    pub fn add_user(&mut self, usr: &str) {
        let usr = usr.trim();
        if usr.is_empty() {
            return;
        }
        *self.users.entry(usr.to_string()).or_insert(0) += 1;
    }

    pub fn add_password(&mut self, pwd: &str) {
        let pwd = pwd.trim();
        if pwd.is_empty() {
            return;
        }
        *self.passwords.entry(pwd.to_string()).or_insert(0) += 1;
    }

    pub fn add_fingerprint(&mut self, sha1: &str) {
        let sha1 = sha1.trim();
        if sha1.is_empty() {
            return;
        }
        *self.fingerprints.entry(sha1.to_string()).or_insert(0) += 1;
    }
}
