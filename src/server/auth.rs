use crate::config::SyncNode;
use crate::corpus::Corpus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Peer,
    Attacker,
}

#[derive(Debug)]
pub struct Decision {
    pub accept: bool,
    pub reason: &'static str,
    pub classification: Classification,
}

impl Decision {
    pub fn is_peer(&self) -> bool {
        self.classification == Classification::Peer
    }
}

/* The per-attempt decision ladder, top-down, first match wins. The goal
 * is corpus diversity: hosts we know get in, replayed known credentials
 * do not, fresh credentials that overlap what we know get in, and novel
 * credentials face a dice roll so attackers cannot tell the door is
 * rigged. Every attacker outcome is recorded, which makes the ladder
 * stateful: whoever gets in once is welcome forever. */
pub fn decide(
    corpus: &Corpus,
    nodes: &[SyncNode],
    usr: &str,
    pwd: &str,
    host: &str,
    now: i64,
) -> Decision {
    if nodes
        .iter()
        .any(|n| n.user == usr && n.password == pwd && n.host == host)
    {
        return Decision {
            accept: true,
            reason: "sync peer",
            classification: Classification::Peer,
        };
    }

    let attacker = |accept: bool, reason: &'static str| Decision {
        accept,
        reason,
        classification: Classification::Attacker,
    };

    if corpus.has_host(host) {
        // let's see what it wants
        return attacker(true, "host is back for more");
    }

    if corpus.has_user(usr) && corpus.has_password(pwd) {
        // come back when you have something we don't know yet
        return attacker(false, "host does not have new credentials");
    }

    if corpus.has_user(usr) {
        return attacker(true, "host got the user name right");
    }

    if corpus.has_password(pwd) {
        return attacker(true, "host got the password right");
    }

    // the attacker brought credentials we don't know yet, roll the dice
    if now % 3 != 0 {
        return attacker(false, "host lost a game of dice");
    }

    attacker(true, "host dodged all obstacles")
}
