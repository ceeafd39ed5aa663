use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};

use super::error::OptimizeError;
use super::solver::{LpSolver, MicroLpSolver, allocate};
use super::types::{AllocationResult, Optimization, OptimizationRequest};

pub const MAX_SWEEP_POINTS: u32 = 101;

pub fn optimize(request: &OptimizationRequest) -> Result<Optimization, OptimizeError> {
    let never = AtomicBool::new(false);
    optimize_with(&MicroLpSolver, request, &never)
}

pub fn optimize_with<S: LpSolver + ?Sized>(
    solver: &S,
    request: &OptimizationRequest,
    cancel: &AtomicBool,
) -> Result<Optimization, OptimizeError> {
    validate_request(request)?;
    solver
        .check_available()
        .map_err(|source| OptimizeError::SolverUnavailable {
            solver: solver.name(),
            source,
        })?;

    if request.monthly_budget <= 0.0 {
        return Err(infeasible_budget(request));
    }

    let frontier = sweep_frontier(solver, request, cancel)?;
    let Some(selected_index) = select_knee(&frontier) else {
        return Err(infeasible_budget(request));
    };
    let selected = frontier[selected_index].clone();
    info!(
        "selected weight {:.3} from {} frontier points: interest {:.2}, savings {:.2}",
        selected.weight,
        frontier.len(),
        selected.interest,
        selected.savings
    );

    Ok(Optimization {
        frontier,
        selected,
        selected_index,
    })
}

fn infeasible_budget(request: &OptimizationRequest) -> OptimizeError {
    OptimizeError::InfeasibleBudget {
        monthly_budget: request.monthly_budget,
        required_minimum: request.required_minimum(),
    }
}

pub fn sweep_frontier<S: LpSolver + ?Sized>(
    solver: &S,
    request: &OptimizationRequest,
    cancel: &AtomicBool,
) -> Result<Vec<AllocationResult>, OptimizeError> {
    let weights = request.weights();
    let mut frontier = Vec::with_capacity(weights.len());

    for (completed, &weight) in weights.iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            return Err(OptimizeError::Cancelled {
                completed,
                total: weights.len(),
            });
        }
        let result = allocate(solver, &request.at_weight(weight));
        if result.feasible {
            frontier.push(result);
        }
    }

    debug!(
        "sweep kept {} of {} samples",
        frontier.len(),
        weights.len()
    );
    Ok(frontier)
}

pub fn knee_scores(frontier: &[AllocationResult]) -> Vec<f64> {
    let (min_s, max_s) = min_max(frontier.iter().map(|p| p.savings));
    let (min_i, max_i) = min_max(frontier.iter().map(|p| p.interest));

    frontier
        .iter()
        .map(|p| normalize(p.savings, min_s, max_s) - normalize(p.interest, min_i, max_i))
        .collect()
}

// Earliest point wins ties.
pub fn select_knee(frontier: &[AllocationResult]) -> Option<usize> {
    let scores = knee_scores(frontier);
    let mut best: Option<usize> = None;
    for (idx, &score) in scores.iter().enumerate() {
        match best {
            Some(current) if score <= scores[current] => {}
            _ => best = Some(idx),
        }
    }
    best
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max == min {
        0.0
    } else {
        (value - min) / (max - min)
    }
}

pub fn validate_request(request: &OptimizationRequest) -> Result<(), OptimizeError> {
    if !request.monthly_budget.is_finite() {
        return Err(OptimizeError::InvalidRequest(
            "monthly_budget must be finite".to_string(),
        ));
    }
    if !request.minimum_savings.is_finite() || request.minimum_savings < 0.0 {
        return Err(OptimizeError::InvalidRequest(
            "minimum_savings must be finite and >= 0".to_string(),
        ));
    }
    if !(1..=MAX_SWEEP_POINTS).contains(&request.sweep_points) {
        return Err(OptimizeError::InvalidSweepPoints {
            max: MAX_SWEEP_POINTS,
        });
    }

    let mut seen = HashSet::with_capacity(request.debts.len());
    for debt in &request.debts {
        if debt.id.trim().is_empty() {
            return Err(OptimizeError::invalid_debt(&debt.id, "id must not be empty"));
        }
        if !seen.insert(debt.id.as_str()) {
            return Err(OptimizeError::invalid_debt(&debt.id, "duplicate id"));
        }
        if !debt.balance.is_finite() || debt.balance < 0.0 {
            return Err(OptimizeError::invalid_debt(
                &debt.id,
                "balance must be finite and >= 0",
            ));
        }
        if !debt.apr.is_finite() || debt.apr < 0.0 {
            return Err(OptimizeError::invalid_debt(
                &debt.id,
                "apr must be finite and >= 0",
            ));
        }
        if !debt.min_payment.is_finite() || debt.min_payment < 0.0 {
            return Err(OptimizeError::invalid_debt(
                &debt.id,
                "min_payment must be finite and >= 0",
            ));
        }
        if let Some(max) = debt.max_payment {
            if max.is_nan() || max < 0.0 {
                return Err(OptimizeError::invalid_debt(
                    &debt.id,
                    "max_payment must be >= 0",
                ));
            }
        }
    }
    Ok(())
}
