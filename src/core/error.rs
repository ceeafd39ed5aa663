use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("no allocation satisfies the budget and payment bounds")]
    Infeasible,
    #[error("objective is unbounded")]
    Unbounded,
    #[error("variable `{variable}` has lower bound {lower} above upper bound {upper}")]
    ContradictoryBounds {
        variable: String,
        lower: f64,
        upper: f64,
    },
    #[error("solver backend failure: {0}")]
    Backend(String),
}

impl SolveError {
    pub fn is_infeasibility(&self) -> bool {
        matches!(
            self,
            Self::Infeasible | Self::Unbounded | Self::ContradictoryBounds { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizeError {
    #[error(
        "monthly budget {monthly_budget:.2} cannot cover minimum payments and savings floor of {required_minimum:.2}"
    )]
    InfeasibleBudget {
        monthly_budget: f64,
        required_minimum: f64,
    },
    #[error("invalid debt `{id}`: {reason}")]
    InvalidDebt { id: String, reason: String },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("sweep_points must be between 1 and {max}")]
    InvalidSweepPoints { max: u32 },
    #[error("solver `{solver}` is unavailable: {source}")]
    SolverUnavailable {
        solver: &'static str,
        #[source]
        source: SolveError,
    },
    #[error("sweep cancelled after {completed} of {total} samples")]
    Cancelled { completed: usize, total: usize },
}

impl OptimizeError {
    pub fn invalid_debt(id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDebt {
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidDebt { .. } | Self::InvalidRequest(_) | Self::InvalidSweepPoints { .. }
        )
    }
}
