use std::fmt;

/// Errors surfaced by the drop field core.
///
/// None of these cross component boundaries as control flow: the connection
/// logs and discards, boot/config errors are reported to the caller once.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldError {
    /// An inbound server message did not match `{ "pdr": f64, "drops": [...] }`.
    MalformedMessage(String),
    /// An inbound `pdr` was not a finite number in [0, 1].
    PdrOutOfRange(f64),
    /// The page-supplied boot parameters could not be parsed.
    InvalidBoot(String),
    /// A config override document could not be parsed.
    InvalidConfig(String),
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedMessage(reason) => write!(f, "malformed server message: {reason}"),
            Self::PdrOutOfRange(pdr) => write!(f, "pdr {pdr} outside [0, 1]"),
            Self::InvalidBoot(reason) => write!(f, "invalid boot parameters: {reason}"),
            Self::InvalidConfig(reason) => write!(f, "invalid field config: {reason}"),
        }
    }
}

impl std::error::Error for FieldError {}

impl From<serde_json::Error> for FieldError {
    fn from(err: serde_json::Error) -> Self {
        FieldError::MalformedMessage(err.to_string())
    }
}

/// Check that a pdr value is usable.
pub fn validate_pdr(pdr: f64) -> Result<f64, FieldError> {
    if pdr.is_finite() && (0.0..=1.0).contains(&pdr) {
        Ok(pdr)
    } else {
        Err(FieldError::PdrOutOfRange(pdr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdr_bounds_are_inclusive() {
        assert_eq!(validate_pdr(0.0), Ok(0.0));
        assert_eq!(validate_pdr(1.0), Ok(1.0));
        assert!(validate_pdr(1.01).is_err());
        assert!(validate_pdr(-0.1).is_err());
        assert!(validate_pdr(f64::NAN).is_err());
    }

    #[test]
    fn display_mentions_value() {
        let msg = FieldError::PdrOutOfRange(2.5).to_string();
        assert!(msg.contains("2.5"), "message was {msg}");
    }
}
