mod engine;
mod error;
mod lp;
mod solver;
mod types;

pub use engine::{
    MAX_SWEEP_POINTS, knee_scores, optimize, optimize_with, select_knee, sweep_frontier,
    validate_request,
};
pub use error::{OptimizeError, SolveError};
pub use lp::{
    LinearProgram, LpVariable, SAVINGS_VARIABLE, build_program, debts_by_id,
    payment_variable_name,
};
pub use solver::{LpSolution, LpSolver, MicroLpSolver, allocate, solve_allocation};
pub use types::{AllocationRequest, AllocationResult, Debt, Optimization, OptimizationRequest};
