//! Decrypt-time access policy.
//!
//! The gate runs before any key derivation, so a denied caller learns nothing
//! about whether their passphrase would have worked. Encryption never consults
//! it: whoever encrypts chooses the policy, and locking themselves out is
//! possible.

use std::collections::BTreeSet;

use glyphcrypt_common::{DenyReason, DenyReasons};

/// Caller identity supplied at both encrypt and decrypt time.
///
/// Not authenticated on its own. It is bound into the key derivation and
/// checked against the envelope policy on decrypt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Actor identifier.
    pub actor_id: String,
    /// Authorization level.
    pub level: i64,
}

impl Identity {
    /// Construct an identity.
    pub fn new(actor_id: impl Into<String>, level: i64) -> Self {
        Self {
            actor_id: actor_id.into(),
            level,
        }
    }
}

/// Policy stored in an envelope header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    /// Actors allowed to decrypt. Empty means any actor.
    pub allowed_actors: Vec<String>,
    /// Minimum level required to decrypt.
    pub min_level: i64,
}

/// Outcome of [`evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Every check passed.
    Allow,
    /// At least one check failed; all failures are listed.
    Deny(DenyReasons),
}

impl Decision {
    /// Returns `true` for [`Decision::Allow`].
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Check `identity` against `policy`.
///
/// Both checks always run so that a denial reports every violated condition.
pub fn evaluate(policy: &Policy, identity: &Identity) -> Decision {
    let mut reasons = BTreeSet::new();

    if !policy.allowed_actors.is_empty()
        && !policy.allowed_actors.iter().any(|a| *a == identity.actor_id)
    {
        reasons.insert(DenyReason::ActorNotPermitted);
    }
    if identity.level < policy.min_level {
        reasons.insert(DenyReason::InsufficientLevel);
    }

    if reasons.is_empty() {
        Decision::Allow
    } else {
        Decision::Deny(DenyReasons(reasons))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gated(actors: &[&str], min_level: i64) -> Policy {
        Policy {
            allowed_actors: actors.iter().map(|s| s.to_string()).collect(),
            min_level,
        }
    }

    fn reasons(decision: Decision) -> DenyReasons {
        match decision {
            Decision::Deny(r) => r,
            Decision::Allow => panic!("expected denial"),
        }
    }

    #[test]
    fn member_with_sufficient_level_is_allowed() {
        let policy = gated(&["sp-ethos"], 2);
        assert!(evaluate(&policy, &Identity::new("sp-ethos", 3)).is_allowed());
        assert!(evaluate(&policy, &Identity::new("sp-ethos", 2)).is_allowed());
    }

    #[test]
    fn empty_allow_list_admits_any_actor() {
        let policy = gated(&[], 0);
        assert!(evaluate(&policy, &Identity::new("anyone", 0)).is_allowed());
    }

    #[test]
    fn non_member_is_denied() {
        let r = reasons(evaluate(&gated(&["sp-ethos"], 0), &Identity::new("sp-other", 9)));
        assert!(r.contains(DenyReason::ActorNotPermitted));
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn low_level_is_denied() {
        let r = reasons(evaluate(&gated(&[], 2), &Identity::new("sp-ethos", 1)));
        assert!(r.contains(DenyReason::InsufficientLevel));
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn both_violations_are_reported_together() {
        let r = reasons(evaluate(&gated(&["sp-ethos"], 5), &Identity::new("sp-other", 1)));
        assert!(r.contains(DenyReason::ActorNotPermitted));
        assert!(r.contains(DenyReason::InsufficientLevel));
    }

    #[test]
    fn actor_match_is_exact() {
        let r = reasons(evaluate(&gated(&["sp-ethos"], 0), &Identity::new("SP-ETHOS", 0)));
        assert!(r.contains(DenyReason::ActorNotPermitted));
    }

    #[test]
    fn negative_levels_compare_numerically() {
        assert!(evaluate(&gated(&[], -3), &Identity::new("a", -2)).is_allowed());
        assert!(!evaluate(&gated(&[], -1), &Identity::new("a", -2)).is_allowed());
    }
}
