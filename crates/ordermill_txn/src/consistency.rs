//! Process-wide consistency policy.

use std::fmt;

/// Consistency level applied to every query a worker process issues.
///
/// `One` acknowledges after a single replica (fast, weaker reads);
/// `Quorum` waits for a majority (the safe default).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Consistency {
    One,
    Quorum,
}

impl Consistency {
    /// Parse the deployment configuration string. Case-insensitive `"ONE"`
    /// selects single-replica mode; anything else falls back to quorum.
    /// The fallback is logged rather than silent so an operator typo does
    /// not masquerade as a deliberate choice.
    pub fn from_config(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("one") {
            Consistency::One
        } else {
            if !raw.eq_ignore_ascii_case("quorum") {
                tracing::warn!(
                    requested = raw,
                    "unrecognized consistency level, falling back to QUORUM"
                );
            }
            Consistency::Quorum
        }
    }
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Consistency::One => write!(f, "ONE"),
            Consistency::Quorum => write!(f, "QUORUM"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Consistency::from_config("ONE"), Consistency::One);
        assert_eq!(Consistency::from_config("one"), Consistency::One);
        assert_eq!(Consistency::from_config("One"), Consistency::One);
    }

    #[test]
    fn unknown_levels_fall_back_to_quorum() {
        assert_eq!(Consistency::from_config("QUORUM"), Consistency::Quorum);
        assert_eq!(Consistency::from_config("ALL"), Consistency::Quorum);
        assert_eq!(Consistency::from_config(""), Consistency::Quorum);
    }
}
