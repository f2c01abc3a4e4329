/* The default filesystem template every sandbox starts from. It is shipped
 * inside the binary as a flat table of entries and materialised to disk
 * once, at startup, by the overlay manager. After that the on-disk copy is
 * the bottom lower layer of every sandbox and is never written again. */

pub enum AssetKind {
    Dir,
    File(&'static [u8]),
}

pub struct AssetEntry {
    pub path: &'static str,
    pub mode: u32,
    pub kind: AssetKind,
}

const PASSWD: &[u8] = b"root:x:0:0:root:/root:/bin/bash
daemon:x:1:1:daemon:/usr/sbin:/usr/sbin/nologin
bin:x:2:2:bin:/bin:/usr/sbin/nologin
sys:x:3:3:sys:/dev:/usr/sbin/nologin
sshd:x:105:65534::/run/sshd:/usr/sbin/nologin
mysql:x:106:112:MySQL Server,,,:/nonexistent:/bin/false
admin:x:1000:1000:admin,,,:/home/admin:/bin/bash
nobody:x:65534:65534:nobody:/nonexistent:/usr/sbin/nologin
";

const SHADOW: &[u8] = b"root:$6$kxbQx0Yo$rC1cYC5wY3cGDkQ9H5NvGXj4jM1tYHb3sO0sAHsTfo3jP9SgkZ0:18859:0:99999:7:::
daemon:*:18474:0:99999:7:::
bin:*:18474:0:99999:7:::
sys:*:18474:0:99999:7:::
sshd:*:18474:0:99999:7:::
mysql:!:18703:0:99999:7:::
admin:$6$Wt2fCpMa$yQg0mPPuMg9C5FJnlYqPDC3F6X4Pm0d4E3O7nqC4b9M5e1:18859:0:99999:7:::
nobody:*:18474:0:99999:7:::
";

const HOSTS: &[u8] = b"127.0.0.1\tlocalhost
127.0.1.1\tweb01
::1\tlocalhost ip6-localhost ip6-loopback
";

const HOSTNAME: &[u8] = b"web01\n";

const RESOLV_CONF: &[u8] = b"nameserver 8.8.8.8\nnameserver 8.8.4.4\n";

const OS_RELEASE: &[u8] = b"NAME=\"Ubuntu\"
VERSION=\"20.04.4 LTS (Focal Fossa)\"
ID=ubuntu
ID_LIKE=debian
PRETTY_NAME=\"Ubuntu 20.04.4 LTS\"
VERSION_ID=\"20.04\"
";

const BASHRC: &[u8] = b"# ~/.bashrc: executed by bash(1) for non-login shells.
export PS1='\\u@\\h:\\w\\$ '
alias ll='ls -alF'
";

const ADMIN_HISTORY: &[u8] = b"ls -la
cd /var/www
tail -f /var/log/nginx/access.log
sudo systemctl restart nginx
exit
";

const AUTH_LOG: &[u8] = b"Apr 30 06:25:01 web01 CRON[1832]: pam_unix(cron:session): session opened for user root by (uid=0)
Apr 30 06:25:01 web01 CRON[1832]: pam_unix(cron:session): session closed for user root
Apr 30 06:47:13 web01 sshd[1901]: Accepted password for admin from 192.168.1.17 port 53212 ssh2
";

pub const DEFAULT_FS: &[AssetEntry] = &[
    AssetEntry { path: "etc", mode: 0o755, kind: AssetKind::Dir },
    AssetEntry { path: "etc/passwd", mode: 0o644, kind: AssetKind::File(PASSWD) },
    AssetEntry { path: "etc/shadow", mode: 0o640, kind: AssetKind::File(SHADOW) },
    AssetEntry { path: "etc/hosts", mode: 0o644, kind: AssetKind::File(HOSTS) },
    AssetEntry { path: "etc/hostname", mode: 0o644, kind: AssetKind::File(HOSTNAME) },
    AssetEntry { path: "etc/resolv.conf", mode: 0o644, kind: AssetKind::File(RESOLV_CONF) },
    AssetEntry { path: "etc/os-release", mode: 0o644, kind: AssetKind::File(OS_RELEASE) },
    AssetEntry { path: "home", mode: 0o755, kind: AssetKind::Dir },
    AssetEntry { path: "home/admin", mode: 0o755, kind: AssetKind::Dir },
    AssetEntry { path: "home/admin/.bashrc", mode: 0o644, kind: AssetKind::File(BASHRC) },
    AssetEntry { path: "home/admin/.bash_history", mode: 0o600, kind: AssetKind::File(ADMIN_HISTORY) },
    AssetEntry { path: "root", mode: 0o700, kind: AssetKind::Dir },
    AssetEntry { path: "root/.bashrc", mode: 0o644, kind: AssetKind::File(BASHRC) },
    AssetEntry { path: "tmp", mode: 0o777, kind: AssetKind::Dir },
    AssetEntry { path: "var", mode: 0o755, kind: AssetKind::Dir },
    AssetEntry { path: "var/log", mode: 0o755, kind: AssetKind::Dir },
    AssetEntry { path: "var/log/auth.log", mode: 0o640, kind: AssetKind::File(AUTH_LOG) },
    AssetEntry { path: "var/www", mode: 0o755, kind: AssetKind::Dir },
    AssetEntry { path: "usr", mode: 0o755, kind: AssetKind::Dir },
    AssetEntry { path: "usr/local", mode: 0o755, kind: AssetKind::Dir },
];
