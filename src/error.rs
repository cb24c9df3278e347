use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoxError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoxError {
    #[error("dimensions don't match: {message}")]
    InvalidDimensions { message: String },

    #[error("optimization blew up: {message}")]
    OptimizationFailed { message: String },

    #[error("bad parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    #[error("numerical issues: {message}")]
    NumericalError { message: String },

    #[error("survival data is broken: {message}")]
    InvalidSurvivalData { message: String },

    #[error("datafit not initialized - call initialize() first")]
    DatafitNotInitialized,

    #[error("solver parameter `{solver}` is not supported in {adapter}")]
    UnsupportedSolver { solver: String, adapter: String },

    #[error("no objective set - call set_objective() first")]
    ObjectiveNotSet,

    #[error("no result yet - call run() first")]
    ResultNotAvailable,

    #[error("bad config: {message}")]
    Config { message: String },
}

impl CoxError {
    pub fn invalid_dimensions(message: impl Into<String>) -> Self {
        Self::InvalidDimensions { message: message.into() }
    }

    pub fn optimization_failed(message: impl Into<String>) -> Self {
        Self::OptimizationFailed { message: message.into() }
    }

    pub fn invalid_parameter(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    pub fn numerical_error(message: impl Into<String>) -> Self {
        Self::NumericalError { message: message.into() }
    }

    pub fn invalid_survival_data(message: impl Into<String>) -> Self {
        Self::InvalidSurvivalData { message: message.into() }
    }

    pub fn unsupported_solver(solver: impl Into<String>, adapter: impl Into<String>) -> Self {
        Self::UnsupportedSolver {
            solver: solver.into(),
            adapter: adapter.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }
}

impl From<toml::de::Error> for CoxError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_solver_message() {
        let err = CoxError::unsupported_solver("Foo", "coxnet");
        let msg = err.to_string();
        assert!(msg.contains("Foo"));
        assert!(msg.contains("coxnet"));
    }

    #[test]
    fn test_invalid_parameter_formats_value() {
        let err = CoxError::invalid_parameter("alpha", -1.0);
        assert_eq!(err.to_string(), "bad parameter: alpha = -1");
    }
}
