use crate::corpus::Corpus;
use colored::Colorize;
use log::info;

impl Corpus {
    pub fn record_login_success(
        &mut self,
        usr: &str,
        pwd: &str,
        host: &str,
        reason: &str,
    ) {
        let pwd = if pwd.is_empty() { "(empty)" } else { pwd };
        self.add_user(usr);
        self.add_password(pwd);
        self.add_host(host);
        *self.logins.attempts.entry(host.to_string()).or_insert(0) += 1;
        *self.logins.ok.entry(host.to_string()).or_insert(0) += 1;

        info!(
            "{}@{} logged in with password {}: {}. ({} attempts; {} failed; {} success)",
            usr.bright_green(),
            host.bright_yellow(),
            pwd.bright_cyan(),
            reason.bright_blue(),
            self.logins.attempts.get(host).unwrap_or(&0),
            self.logins.failed.get(host).unwrap_or(&0),
            self.logins.ok.get(host).unwrap_or(&0),
        );
    }

    pub fn record_login_failure(
        &mut self,
        usr: &str,
        pwd: &str,
        host: &str,
        reason: &str,
    ) {
        let pwd = if pwd.is_empty() { "(empty)" } else { pwd };
        self.add_user(usr);
        self.add_password(pwd);
        self.add_host(host);
        *self.logins.attempts.entry(host.to_string()).or_insert(0) += 1;
        *self.logins.failed.entry(host.to_string()).or_insert(0) += 1;

        info!(
            "{}@{} failed to login with password {}: {}. ({} attempts; {} failed; {} success)",
            usr.bright_green(),
            host.bright_yellow(),
            pwd.bright_cyan(),
            reason.bright_red(),
            self.logins.attempts.get(host).unwrap_or(&0),
            self.logins.failed.get(host).unwrap_or(&0),
            self.logins.ok.get(host).unwrap_or(&0),
        );
    }
}
