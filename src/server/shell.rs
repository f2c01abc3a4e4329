use crate::corpus::ShellStats;
use crate::overlay::OverlayFs;
use chrono::{DateTime, Local};
use log::trace;
use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::time::Instant;

const HOSTNAME: &str = "web01";

/* A line-oriented fake shell. Filesystem commands run against the
 * session's overlay mount through the path-scoped API, so whatever the
 * attacker touches lands in their sandbox's upper layer and greets them
 * again next visit. Everything else gets canned output. */
pub struct FakeShell {
    pub user: String,
    pub host: String,
    created: DateTime<Local>,
    started: Instant,
    cwd: String,
    line: String,
    history: Vec<String>,
    executed: u64,
    overlay: Option<OverlayFs>,
}

/* One round of input, interpreted. */
pub struct ShellOutput {
    pub data: Vec<u8>,
    pub disconnect: bool,
}

impl FakeShell {
    pub fn new(user: &str, host: &str, overlay: Option<OverlayFs>) -> Self {
        FakeShell {
            user: user.to_string(),
            host: host.to_string(),
            created: Local::now(),
            started: Instant::now(),
            cwd: "/root".to_string(),
            line: String::new(),
            history: Vec::new(),
            executed: 0,
            overlay,
        }
    }

    pub fn banner(&self) -> String {
        format!(
            "Welcome to Ubuntu 20.04.4 LTS (GNU/Linux 5.4.0-109-generic x86_64)\r\n\
             \r\n \
             * Documentation:  https://help.ubuntu.com\r\n \
             * Management:     https://landscape.canonical.com\r\n \
             * Support:        https://ubuntu.com/advantage\r\n\
             \r\n\
             Last login: {} from {}\r\n",
            self.created.format("%a %b %e %H:%M:%S %Y"),
            self.host
        )
    }

    pub fn prompt(&self) -> String {
        let cwd = if self.cwd == "/root" { "~" } else { self.cwd.as_str() };
        format!("{}@{}:{}# ", self.user, HOSTNAME, cwd)
    }

    /* Terminal input, byte by byte: echo, backspace, Ctrl-C clears the
     * line, Ctrl-D hangs up, newline executes. */
    pub fn feed(&mut self, input: &[u8]) -> ShellOutput {
        let mut data: Vec<u8> = Vec::new();

        for &byte in input {
            match byte {
                0x04 => {
                    data.extend_from_slice(
                        b"\r\nlogout\r\nConnection to host closed.\r\n",
                    );
                    return ShellOutput { data, disconnect: true };
                }
                0x03 => {
                    self.line.clear();
                    data.extend_from_slice(b"^C\r\n");
                    data.extend_from_slice(self.prompt().as_bytes());
                }
                0x7f | 0x08 => {
                    if self.line.pop().is_some() {
                        data.extend_from_slice(&[0x08, b' ', 0x08]);
                    }
                }
                b'\r' | b'\n' => {
                    data.extend_from_slice(b"\r\n");
                    let line = std::mem::take(&mut self.line);
                    let cmd = line.trim().to_string();

                    if cmd == "exit" || cmd == "logout" || cmd == "quit" {
                        self.history.push(cmd);
                        data.extend_from_slice(
                            b"logout\r\nConnection to host closed.\r\n",
                        );
                        return ShellOutput { data, disconnect: true };
                    }

                    if !cmd.is_empty() {
                        let output = self.exec(&cmd);
                        data.extend_from_slice(output.as_bytes());
                    }
                    data.extend_from_slice(self.prompt().as_bytes());
                }
                byte if !byte.is_ascii_control() => {
                    self.line.push(byte as char);
                    data.push(byte);
                }
                _ => {}
            }
        }

        ShellOutput { data, disconnect: false }
    }

    /* Runs one command line and returns its rendered output. */
    pub fn exec(&mut self, cmd: &str) -> String {
        trace!("{}@{} ran: {}", self.user, self.host, cmd);
        self.history.push(cmd.to_string());
        self.executed += 1;

        let mut parts = cmd.split_whitespace();
        let program = parts.next().unwrap_or("");
        let args: Vec<&str> = parts.collect();

        // `echo something > file` writes into the sandbox
        if program == "echo" {
            if let Some(pos) = args.iter().position(|a| *a == ">") {
                let content = args[..pos].join(" ");
                return match args.get(pos + 1) {
                    Some(target) => self.write_file(target, &content),
                    None => "bash: syntax error near unexpected token `newline'\r\n".to_string(),
                };
            }
            return format!("{}\r\n", args.join(" "));
        }

        match program {
            "ls" => self.ls(args.iter().find(|a| !a.starts_with('-'))),
            "cat" => match args.first() {
                Some(path) => self.cat(path),
                None => String::new(),
            },
            "mkdir" => match args.first() {
                Some(path) => self.mkdir(path),
                None => "mkdir: missing operand\r\n".to_string(),
            },
            "touch" => match args.first() {
                Some(path) => self.touch(path),
                None => "touch: missing file operand\r\n".to_string(),
            },
            "cd" => self.cd(args.first().copied().unwrap_or("/root")),
            "pwd" => format!("{}\r\n", self.cwd),
            "whoami" => format!("{}\r\n", self.user),
            "id" => "uid=0(root) gid=0(root) groups=0(root)\r\n".to_string(),
            "hostname" => format!("{}\r\n", HOSTNAME),
            "uname" => {
                if args.contains(&"-a") {
                    format!(
                        "Linux {} 5.4.0-109-generic #123-Ubuntu SMP Fri Apr 8 09:10:54 UTC 2022 x86_64 x86_64 x86_64 GNU/Linux\r\n",
                        HOSTNAME
                    )
                } else {
                    "Linux\r\n".to_string()
                }
            }
            "uptime" => " 12:40:01 up 42 days,  3:21,  1 user,  load average: 0.02, 0.04, 0.00\r\n".to_string(),
            "free" => "              total        used        free      shared  buff/cache   available\r\nMem:           3953        1499        1427         272        1027        1903\r\nSwap:          2048           0        2048\r\n".to_string(),
            "ps" => "  PID TTY          TIME CMD\r\n    1 ?        00:00:03 systemd\r\n  812 ?        00:00:00 sshd\r\n 1337 pts/0    00:00:00 bash\r\n 1338 pts/0    00:00:00 ps\r\n".to_string(),
            "sudo" => String::new(),
            "wget" | "curl" => format!(
                "{}: missing URL\r\nUsage: {} [OPTION]... [URL]...\r\n",
                program, program
            ),
            "" => String::new(),
            _ => format!("bash: {}: command not found\r\n", program),
        }
    }

    /* Joins a command argument onto the working directory; the overlay
     * layer re-checks the result against the merged root. */
    fn target(&self, path: &str) -> String {
        if path.starts_with('/') {
            path.to_string()
        } else {
            format!("{}/{}", self.cwd, path)
        }
    }

    fn ls(&self, path: Option<&&str>) -> String {
        let arg = path.copied().unwrap_or(self.cwd.as_str()).to_string();
        let overlay = match &self.overlay {
            Some(overlay) => overlay,
            None => return String::new(),
        };

        match overlay.read_dir(&self.target(&arg)) {
            Ok(entries) => {
                let mut names: Vec<String> = entries
                    .filter_map(Result::ok)
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect();
                names.sort();
                if names.is_empty() {
                    String::new()
                } else {
                    format!("{}\r\n", names.join("  "))
                }
            }
            Err(_) => format!(
                "ls: cannot access '{}': No such file or directory\r\n",
                arg
            ),
        }
    }

    fn cat(&self, path: &str) -> String {
        let overlay = match &self.overlay {
            Some(overlay) => overlay,
            None => return format!("cat: {}: No such file or directory\r\n", path),
        };

        let mut opts = OpenOptions::new();
        opts.read(true);
        match overlay.open_file(&self.target(path), &opts) {
            Ok(mut file) => {
                let mut content = String::new();
                match file.read_to_string(&mut content) {
                    Ok(_) => content.replace('\n', "\r\n"),
                    Err(_) => {
                        format!("cat: {}: Permission denied\r\n", path)
                    }
                }
            }
            Err(_) => format!("cat: {}: No such file or directory\r\n", path),
        }
    }

    fn mkdir(&self, path: &str) -> String {
        let overlay = match &self.overlay {
            Some(overlay) => overlay,
            None => return String::new(),
        };

        match overlay.mkdir(&self.target(path)) {
            Ok(_) => String::new(),
            Err(_) => format!(
                "mkdir: cannot create directory '{}': File exists\r\n",
                path
            ),
        }
    }

    fn touch(&self, path: &str) -> String {
        let overlay = match &self.overlay {
            Some(overlay) => overlay,
            None => return String::new(),
        };

        let mut opts = OpenOptions::new();
        opts.write(true).create(true);
        match overlay.open_file(&self.target(path), &opts) {
            Ok(_) => String::new(),
            Err(_) => format!(
                "touch: cannot touch '{}': No such file or directory\r\n",
                path
            ),
        }
    }

    fn write_file(&self, path: &str, content: &str) -> String {
        let overlay = match &self.overlay {
            Some(overlay) => overlay,
            None => return String::new(),
        };

        let mut opts = OpenOptions::new();
        opts.write(true).create(true).truncate(true);
        match overlay.open_file(&self.target(path), &opts) {
            Ok(mut file) => match writeln!(file, "{}", content) {
                Ok(_) => String::new(),
                Err(_) => format!("bash: {}: Permission denied\r\n", path),
            },
            Err(_) => {
                format!("bash: {}: No such file or directory\r\n", path)
            }
        }
    }

    fn cd(&mut self, path: &str) -> String {
        let target = self.target(path);
        let exists = match &self.overlay {
            Some(overlay) => overlay.dir_exists(&target),
            None => false,
        };

        if exists {
            self.cwd = normalize(&target);
            String::new()
        } else {
            format!("bash: cd: {}: No such file or directory\r\n", path)
        }
    }

    pub fn stats(&self) -> ShellStats {
        ShellStats {
            user: self.user.clone(),
            host: self.host.clone(),
            created: self.created,
            commands_executed: self.executed,
            time_spent: self.started.elapsed().as_secs(),
            command_history: self.history.clone(),
        }
    }

    /* Tears down the overlay mount; the upper layer stays promoted. */
    pub fn close(&mut self) {
        if let Some(overlay) = self.overlay.take() {
            if let Err(e) = overlay.close() {
                log::error!(
                    "Failed to close sandbox for {}: {:#}",
                    self.host,
                    e
                );
            }
        }
    }
}

/* Lexical cleanup of the shell's notion of its working directory. */
fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            part => parts.push(part),
        }
    }
    format!("/{}", parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canned_commands_without_overlay() {
        let mut shell = FakeShell::new("root", "10.0.0.1", None);
        assert_eq!(shell.exec("whoami"), "root\r\n");
        assert_eq!(shell.exec("pwd"), "/root\r\n");
        assert_eq!(shell.exec("echo hello world"), "hello world\r\n");
        assert!(shell.exec("uname -a").contains("GNU/Linux"));
        assert_eq!(
            shell.exec("no-such-binary"),
            "bash: no-such-binary: command not found\r\n"
        );
        assert_eq!(shell.stats().commands_executed, 5);
        assert_eq!(shell.stats().command_history.len(), 5);
    }

    #[test]
    fn test_line_discipline() {
        let mut shell = FakeShell::new("root", "10.0.0.1", None);

        // typed with a corrected typo
        let out = shell.feed(b"whoamX\x7fi\r");
        assert!(!out.disconnect);
        let rendered = String::from_utf8_lossy(&out.data).into_owned();
        assert!(rendered.contains("root"));
        assert_eq!(shell.stats().command_history, vec!["whoami"]);

        // ctrl-c drops the pending line
        shell.feed(b"rm -rf /");
        let out = shell.feed(b"\x03");
        assert!(String::from_utf8_lossy(&out.data).contains("^C"));
        let out = shell.feed(b"\r");
        assert!(!out.disconnect);
        assert_eq!(shell.stats().command_history, vec!["whoami"]);

        // ctrl-d hangs up
        let out = shell.feed(b"\x04");
        assert!(out.disconnect);
    }

    #[test]
    fn test_exit_disconnects() {
        let mut shell = FakeShell::new("admin", "10.0.0.1", None);
        let out = shell.feed(b"exit\r");
        assert!(out.disconnect);
        assert!(String::from_utf8_lossy(&out.data).contains("logout"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/a/b/../c/./d"), "/a/c/d");
        assert_eq!(normalize("/.."), "/");
        assert_eq!(normalize("/root"), "/root");
    }
}
