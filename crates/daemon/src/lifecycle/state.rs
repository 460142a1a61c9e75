/// Phases of a session, in the only order they may occur
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Initializing,
    Mounting,
    Joining,
    Bootstrapping,
    Active,
    Ending,
    Ended,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Initializing => "initializing",
            LifecycleState::Mounting => "mounting",
            LifecycleState::Joining => "joining",
            LifecycleState::Bootstrapping => "bootstrapping",
            LifecycleState::Active => "active",
            LifecycleState::Ending => "ending",
            LifecycleState::Ended => "ended",
        }
    }

    fn ordinal(&self) -> u8 {
        match self {
            LifecycleState::Initializing => 0,
            LifecycleState::Mounting => 1,
            LifecycleState::Joining => 2,
            LifecycleState::Bootstrapping => 3,
            LifecycleState::Active => 4,
            LifecycleState::Ending => 5,
            LifecycleState::Ended => 6,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Ended)
    }

    /// Whether the session may move from `self` to `to`
    ///
    /// Only forward moves are allowed, plus re-entering `Mounting` for a
    /// mount retry.
    pub fn can_advance_to(&self, to: LifecycleState) -> bool {
        to.ordinal() > self.ordinal()
            || (*self == LifecycleState::Mounting && to == LifecycleState::Mounting)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("illegal lifecycle transition {from} -> {to}")]
pub struct TransitionError {
    pub from: LifecycleState,
    pub to: LifecycleState,
}

#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: LifecycleState,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Initializing,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn advance(&mut self, to: LifecycleState) -> Result<LifecycleState, TransitionError> {
        let from = self.state;
        if !from.can_advance_to(to) {
            return Err(TransitionError { from, to });
        }
        self.state = to;
        Ok(from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleState::*;

    const ALL: [LifecycleState; 7] = [
        Initializing,
        Mounting,
        Joining,
        Bootstrapping,
        Active,
        Ending,
        Ended,
    ];

    #[test]
    fn test_happy_path() {
        let mut lifecycle = Lifecycle::new();
        for to in &ALL[1..] {
            lifecycle.advance(*to).unwrap();
        }
        assert!(lifecycle.state().is_terminal());
    }

    #[test]
    fn test_never_moves_backwards() {
        for from in ALL {
            for to in ALL {
                let allowed = from.can_advance_to(to);
                if to.ordinal() < from.ordinal() {
                    assert!(!allowed, "{} -> {}", from, to);
                }
            }
        }
    }

    #[test]
    fn test_mount_retry_and_terminal_end() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.advance(Mounting).unwrap();
        lifecycle.advance(Mounting).unwrap();
        assert!(lifecycle.advance(Initializing).is_err());

        // ending may be reached from anywhere before it
        lifecycle.advance(Ending).unwrap();
        lifecycle.advance(Ended).unwrap();
        for to in ALL {
            let err = lifecycle.advance(to).unwrap_err();
            assert_eq!(err.from, Ended);
        }
    }

    #[test]
    fn test_only_mounting_repeats() {
        for state in ALL {
            assert_eq!(state.can_advance_to(state), state == Mounting, "{}", state);
        }
    }
}
