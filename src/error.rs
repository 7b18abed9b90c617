use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiffusionError>;

/// Fatal conditions. Anything that merely degrades a single step (an iterative solve that stops
/// short of its tolerance, say) is reported through `StepReport` instead.
#[derive(Error, Debug)]
pub enum DiffusionError {
    /// The mesh cannot be built, or cannot be used by the requested strategy
    #[error("invalid mesh: {reason}")]
    InvalidMesh { reason: String },

    #[error("invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// A direct solve met a zero pivot. `step` is `None` when this was detected while factorizing
    /// the operator, before time stepping began.
    #[error("linear system is singular{}", step_suffix(.step))]
    SingularSystem { step: Option<usize> },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn step_suffix(step: &Option<usize>) -> String {
    match step {
        Some(n) => format!(" (time step {})", n),
        None => String::new(),
    }
}

impl DiffusionError {
    pub(crate) fn invalid_mesh(reason: impl Into<String>) -> Self {
        DiffusionError::InvalidMesh {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let err = DiffusionError::invalid_mesh("Nx must be positive");
        assert_eq!(err.to_string(), "invalid mesh: Nx must be positive");

        let err = DiffusionError::SingularSystem { step: Some(3) };
        assert_eq!(err.to_string(), "linear system is singular (time step 3)");

        let err = DiffusionError::SingularSystem { step: None };
        assert_eq!(err.to_string(), "linear system is singular");

        let err = DiffusionError::InvalidParameter {
            name: "dt",
            value: -1.0,
            reason: "must be positive",
        };
        assert_eq!(err.to_string(), "invalid parameter `dt` = -1: must be positive");
    }
}
