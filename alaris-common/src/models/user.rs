use std::fmt;

use serde::{Deserialize, Serialize};

/// The sender of an IRC line, as carried in its `nick!user@host` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct UserIdentity {
    pub nick: String,
    pub user: String,
    pub host: String,
}

impl UserIdentity {
    pub fn new(nick: &str, user: &str, host: &str) -> Self {
        Self {
            nick: nick.to_string(),
            user: user.to_string(),
            host: host.to_string(),
        }
    }

    /// Parses an IRC message prefix. A bare server name (no `!`/`@`)
    /// becomes an identity with only `nick` set.
    pub fn from_prefix(prefix: &str) -> Self {
        let prefix = prefix.trim_start_matches(':');
        let (nick, rest) = match prefix.split_once('!') {
            Some((n, r)) => (n, Some(r)),
            None => (prefix, None),
        };
        let (user, host) = match rest {
            Some(r) => match r.split_once('@') {
                Some((u, h)) => (u, h),
                None => (r, ""),
            },
            None => match nick.split_once('@') {
                // "nick@host" without a user part
                Some((_, h)) => ("", h),
                None => ("", ""),
            },
        };
        let nick = nick.split('@').next().unwrap_or(nick);
        Self::new(nick, user, host)
    }
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}@{}", self.nick, self.user, self.host)
    }
}

/// One row of the administrator list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminEntry {
    pub user: String,
    pub nick: String,
    pub host: String,
}

impl AdminEntry {
    pub fn matches(&self, identity: &UserIdentity) -> bool {
        self.user == identity.user
            && self.nick.eq_ignore_ascii_case(&identity.nick)
            && self.host.eq_ignore_ascii_case(&identity.host)
    }
}

impl fmt::Display for AdminEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}!{}@{})", self.user, self.nick, self.user, self.host)
    }
}
