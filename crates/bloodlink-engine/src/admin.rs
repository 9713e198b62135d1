use std::fmt;
use std::str::FromStr;

use bloodlink_types::models::UserHandle;

/// The single elevated principal: the chat user who receives operation
/// summaries, and the bearer token guarding the admin REST routes.
#[derive(Clone)]
pub struct AdminPolicy {
    handle: Option<UserHandle>,
    token: String,
}

impl AdminPolicy {
    pub fn new(handle: Option<UserHandle>, token: impl Into<String>) -> Self {
        Self {
            handle,
            token: token.into(),
        }
    }

    /// Chat user that receives operation summaries, if configured.
    pub fn handle(&self) -> Option<UserHandle> {
        self.handle
    }

    /// Compare a presented bearer token without short-circuiting on the
    /// first differing byte. An empty configured token admits nobody.
    pub fn verify_token(&self, presented: &str) -> bool {
        let expected = self.token.as_bytes();
        let presented = presented.as_bytes();
        if expected.is_empty() || expected.len() != presented.len() {
            return false;
        }
        expected
            .iter()
            .zip(presented)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl fmt::Debug for AdminPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminPolicy")
            .field("handle", &self.handle)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// What happens when a second donor commits to a request that already has one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommitPolicy {
    /// Every donor may commit; the requester chooses.
    #[default]
    AllowMultiple,
    /// The first commit fulfils the request and blocks the rest.
    FirstCommitWins,
}

impl FromStr for CommitPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow-multiple" => Ok(Self::AllowMultiple),
            "first-commit-wins" => Ok(Self::FirstCommitWins),
            other => Err(format!(
                "unknown commit policy {:?} (expected allow-multiple or first-commit-wins)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_must_match_exactly() {
        let policy = AdminPolicy::new(Some(UserHandle(1)), "s3cret-token");
        assert!(policy.verify_token("s3cret-token"));
        assert!(!policy.verify_token("s3cret-tokeN"));
        assert!(!policy.verify_token("s3cret"));
        assert!(!policy.verify_token(""));
    }

    #[test]
    fn empty_token_admits_nobody() {
        let policy = AdminPolicy::new(None, "");
        assert!(!policy.verify_token(""));
        assert_eq!(policy.handle(), None);
    }

    #[test]
    fn debug_output_hides_the_token() {
        let policy = AdminPolicy::new(None, "hunter2");
        assert!(!format!("{:?}", policy).contains("hunter2"));
    }

    #[test]
    fn parses_commit_policies() {
        assert_eq!("allow-multiple".parse::<CommitPolicy>(), Ok(CommitPolicy::AllowMultiple));
        assert_eq!(" First-Commit-Wins ".parse::<CommitPolicy>(), Ok(CommitPolicy::FirstCommitWins));
        assert!("whoever".parse::<CommitPolicy>().is_err());
        assert_eq!(CommitPolicy::default(), CommitPolicy::AllowMultiple);
    }
}
