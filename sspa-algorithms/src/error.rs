#[derive(Debug, Clone, PartialEq)]
pub enum MatchingError {
    InvalidConfiguration {
        reason: String,
    },
    MalformedInstance {
        reason: String,
    },
    NoSolution,
    RepeatedSolverFailure {
        consecutive: usize,
        last_reason: String,
    },
    SolverUnavailable {
        solver: String,
        reason: String,
    },
}

impl std::fmt::Display for MatchingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchingError::InvalidConfiguration { reason } => {
                write!(f, "Invalid configuration: {}", reason)
            }
            MatchingError::MalformedInstance { reason } => {
                write!(f, "Malformed instance: {}", reason)
            }
            MatchingError::NoSolution => {
                write!(f, "The run did not find any feasible solution")
            }
            MatchingError::RepeatedSolverFailure {
                consecutive,
                last_reason,
            } => write!(
                f,
                "Solver failed {} times in a row. Last failure: {}",
                consecutive, last_reason
            ),
            MatchingError::SolverUnavailable { solver, reason } => {
                write!(f, "Solver '{}' is unavailable: {}", solver, reason)
            }
        }
    }
}

impl std::error::Error for MatchingError {}

pub type MatchingResult<T> = std::result::Result<T, MatchingError>;
