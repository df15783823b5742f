use crate::CoreError;
use std::fmt;

/// Progress of one side handler through a launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    Unconfigured,
    Validating,
    Invalid,
    Valid,
    Active,
}

impl fmt::Display for HandlerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unconfigured => "unconfigured",
            Self::Validating => "validating",
            Self::Invalid => "invalid",
            Self::Valid => "valid",
            Self::Active => "active",
        };
        f.write_str(s)
    }
}

pub fn validate_transition(from: HandlerState, to: HandlerState) -> Result<(), CoreError> {
    let valid = matches!(
        (from, to),
        (HandlerState::Unconfigured, HandlerState::Validating)
            | (
                HandlerState::Validating,
                HandlerState::Invalid | HandlerState::Valid
            )
            | (HandlerState::Valid, HandlerState::Active)
    );

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions() {
        assert!(validate_transition(HandlerState::Unconfigured, HandlerState::Validating).is_ok());
        assert!(validate_transition(HandlerState::Validating, HandlerState::Valid).is_ok());
        assert!(validate_transition(HandlerState::Validating, HandlerState::Invalid).is_ok());
        assert!(validate_transition(HandlerState::Valid, HandlerState::Active).is_ok());
    }

    #[test]
    fn invalid_transitions() {
        assert!(validate_transition(HandlerState::Unconfigured, HandlerState::Active).is_err());
        assert!(validate_transition(HandlerState::Unconfigured, HandlerState::Valid).is_err());
        assert!(validate_transition(HandlerState::Invalid, HandlerState::Active).is_err());
        assert!(validate_transition(HandlerState::Invalid, HandlerState::Valid).is_err());
        assert!(validate_transition(HandlerState::Active, HandlerState::Active).is_err()); // one activation per launch
        assert!(validate_transition(HandlerState::Valid, HandlerState::Validating).is_err());
    }
}
