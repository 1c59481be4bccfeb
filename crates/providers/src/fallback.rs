//! Tier fallback state machine.
//!
//! A chat completion starts at the requested tier. If that attempt fails and
//! the tier is not already the cheapest, exactly one more attempt is made on
//! the free tier. A failure there, or a failure on a free-tier request, ends
//! the call.
//!
//! ```text
//! Idle --begin--> Calling(requested) --ok--> Done
//!                        |
//!                       err (paid tier)
//!                        v
//!                 Calling(free) --ok--> Done
//!                        |
//!                       err
//!                        v
//!                      Failed
//! ```

use daycoach_core::tier::Tier;

/// One provider attempt within a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// Tier the caller asked for.
    pub requested: Tier,
    /// Tier whose model this attempt uses.
    pub tier: Tier,
}

impl Attempt {
    pub fn is_fallback(&self) -> bool {
        self.requested != self.tier
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackState {
    Idle,
    Calling(Attempt),
    Done(Attempt),
    Failed,
}

impl FallbackState {
    /// Leave `Idle` with a first attempt on the requested tier.
    pub fn begin(requested: Tier) -> Self {
        FallbackState::Calling(Attempt {
            requested,
            tier: requested,
        })
    }

    pub fn succeeded(self) -> Self {
        match self {
            FallbackState::Calling(attempt) => FallbackState::Done(attempt),
            other => other,
        }
    }

    pub fn failed(self) -> Self {
        match self {
            FallbackState::Calling(attempt) if !attempt.tier.is_cheapest() => {
                FallbackState::Calling(Attempt {
                    requested: attempt.requested,
                    tier: Tier::Free,
                })
            }
            FallbackState::Calling(_) => FallbackState::Failed,
            other => other,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FallbackState::Done(_) | FallbackState::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paid_tier_falls_back_once() {
        let state = FallbackState::begin(Tier::Premium).failed();
        assert_eq!(
            state,
            FallbackState::Calling(Attempt {
                requested: Tier::Premium,
                tier: Tier::Free
            })
        );
        assert_eq!(state.failed(), FallbackState::Failed);
    }

    #[test]
    fn pro_plus_falls_back_straight_to_free() {
        let FallbackState::Calling(attempt) = FallbackState::begin(Tier::ProPlus).failed() else {
            panic!("expected a second attempt");
        };
        assert_eq!(attempt.tier, Tier::Free);
        assert!(attempt.is_fallback());
    }

    #[test]
    fn free_tier_never_retries() {
        assert_eq!(FallbackState::begin(Tier::Free).failed(), FallbackState::Failed);
    }

    #[test]
    fn success_records_the_serving_attempt() {
        let done = FallbackState::begin(Tier::Premium).failed().succeeded();
        let FallbackState::Done(attempt) = done else {
            panic!("expected Done");
        };
        assert_eq!(attempt.requested, Tier::Premium);
        assert_eq!(attempt.tier, Tier::Free);
        assert!(done.is_terminal());
    }

    #[test]
    fn terminal_states_are_sticky() {
        assert_eq!(FallbackState::Failed.succeeded(), FallbackState::Failed);
        assert_eq!(FallbackState::Idle.failed(), FallbackState::Idle);
        assert!(!FallbackState::Idle.is_terminal());
    }
}
