use std::time::SystemTime;

use serde::{Deserialize, Serialize};

pub trait TimeLimited {
    fn set_validity(&mut self, until: SystemTime);
    fn check_validity(&self) -> bool;
}

/// Claim carried in API bearer tokens. `sub` is the user guid of the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiClaim {
    pub sub: String,
    pub exp: u64,
}

impl ApiClaim {
    /// New claim with zero validity, expected to be stamped by the token issuer.
    pub fn new_expired(sub: impl Into<String>) -> Self {
        ApiClaim {
            sub: sub.into(),
            exp: 0,
        }
    }
}

impl TimeLimited for ApiClaim {
    fn set_validity(&mut self, until: SystemTime) {
        self.exp = until
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
    }

    fn check_validity(&self) -> bool {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.exp > now
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_claim_validity() {
        let mut claim = ApiClaim::new_expired("user-1");
        assert!(!claim.check_validity());
        claim.set_validity(SystemTime::now() + Duration::from_secs(60));
        assert!(claim.check_validity());
        claim.set_validity(SystemTime::now() - Duration::from_secs(60));
        assert!(!claim.check_validity());
    }
}
