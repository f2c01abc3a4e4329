use crate::corpus::Corpus;
use crate::util::sha1_hex;
use chrono::{DateTime, Local};
use colored::Colorize;
use log::{error, info};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/* What a completed fake-shell session boils down to. */
pub struct ShellStats {
    pub user: String,
    pub host: String,
    pub created: DateTime<Local>,
    pub commands_executed: u64,
    pub time_spent: u64,
    pub command_history: Vec<String>,
}

fn render_capture(stats: &ShellStats, commands: &str) -> String {
    format!(
        "#!/usr/bin/env bash\n\
         #\n\
         # {}@{}\n\
         # {}\n\
         #\n\
         {}\n",
        stats.user, stats.host, stats.created, commands
    )
}

impl Corpus {
    /* Writes the attack transcript, keyed by the SHA-1 of its command
     * history. An already-known transcript is skipped silently: one
     * capture per distinct attack, ever. */
    pub fn save_capture(&mut self, captures_dir: &Path, stats: &ShellStats) {
        let commands = stats.command_history.join("\n");
        let sha1 = sha1_hex(&commands);
        let path = captures_dir
            .join(format!("ocap-{}-{}.sh", stats.host, sha1));

        if path.exists() {
            return; // no need to save, we already have this attack
        }

        self.add_fingerprint(&sha1);

        let rendered = render_capture(stats, &commands);
        if let Err(e) = fs::write(&path, format!("\n{}\n", rendered)) {
            error!("Failed to write capture {}: {}", path.display(), e);
            return;
        }
        if let Err(e) =
            fs::set_permissions(&path, fs::Permissions::from_mode(0o744))
        {
            error!("Failed to chmod capture {}: {}", path.display(), e);
            return;
        }

        info!(
            "Capture saved: {}",
            path.display().to_string().bright_yellow()
        );
    }
}
