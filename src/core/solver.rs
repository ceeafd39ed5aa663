use good_lp::{
    Expression, ResolutionError, Solution, SolverModel, Variable, default_solver, variable,
    variables,
};
use log::{debug, warn};
use std::sync::OnceLock;

use super::error::SolveError;
use super::lp::{LinearProgram, LpVariable, build_program, debts_by_id};
use super::types::{AllocationRequest, AllocationResult};

#[derive(Debug, Clone, PartialEq)]
pub struct LpSolution {
    pub values: Vec<f64>,
}

pub trait LpSolver {
    fn name(&self) -> &'static str;

    fn check_available(&self) -> Result<(), SolveError>;

    fn solve(&self, program: &LinearProgram) -> Result<LpSolution, SolveError>;
}

static MICROLP_READY: OnceLock<Result<(), SolveError>> = OnceLock::new();

#[derive(Debug, Clone, Copy, Default)]
pub struct MicroLpSolver;

impl MicroLpSolver {
    fn solve_capability_program(&self) -> Result<(), SolveError> {
        let program = LinearProgram {
            variables: vec![LpVariable {
                name: "capability".to_string(),
                lower: 0.0,
                upper: 2.0,
                cost: -1.0,
            }],
            row: vec![1.0],
            rhs: 1.0,
            objective_offset: 0.0,
        };
        let solution = self.solve(&program)?;
        match solution.values.first() {
            Some(value) if (value - 1.0).abs() <= 1e-6 => {
                debug!("microlp capability check passed");
                Ok(())
            }
            other => Err(SolveError::Backend(format!(
                "capability program returned {other:?}, expected 1.0"
            ))),
        }
    }
}

impl LpSolver for MicroLpSolver {
    fn name(&self) -> &'static str {
        "microlp"
    }

    // Solved once per process; later calls reuse the cached outcome.
    fn check_available(&self) -> Result<(), SolveError> {
        MICROLP_READY
            .get_or_init(|| self.solve_capability_program())
            .clone()
    }

    fn solve(&self, program: &LinearProgram) -> Result<LpSolution, SolveError> {
        let mut vars = variables!();
        let mut columns: Vec<Variable> = Vec::with_capacity(program.variables.len());
        let mut objective = Expression::with_capacity(program.variables.len());
        let mut row = Expression::with_capacity(program.variables.len());

        for (var, &coefficient) in program.variables.iter().zip(&program.row) {
            let mut definition = variable().name(var.name.clone()).min(var.lower);
            if var.upper.is_finite() {
                definition = definition.max(var.upper);
            }
            let column = vars.add(definition);
            objective.add_mul(var.cost, column);
            row.add_mul(coefficient, column);
            columns.push(column);
        }

        let solution = vars
            .minimise(objective)
            .using(default_solver)
            .with(row.eq(program.rhs))
            .solve()
            .map_err(from_resolution_error)?;

        Ok(LpSolution {
            values: columns.iter().map(|&column| solution.value(column)).collect(),
        })
    }
}

fn from_resolution_error(err: ResolutionError) -> SolveError {
    match err {
        ResolutionError::Infeasible => SolveError::Infeasible,
        ResolutionError::Unbounded => SolveError::Unbounded,
        other => SolveError::Backend(other.to_string()),
    }
}

pub fn solve_allocation<S: LpSolver + ?Sized>(
    solver: &S,
    request: &AllocationRequest<'_>,
) -> Result<AllocationResult, SolveError> {
    let program = build_program(request);
    program.check_bounds()?;
    let solution = solver.solve(&program)?;

    if solution.values.len() != program.variables.len() {
        return Err(SolveError::Backend(format!(
            "expected {} primal values, got {}",
            program.variables.len(),
            solution.values.len()
        )));
    }

    let ordered = debts_by_id(request.debts);
    let payments = ordered
        .iter()
        .zip(&solution.values)
        .map(|(debt, &value)| (debt.id.clone(), value))
        .collect();
    let interest = ordered
        .iter()
        .zip(&solution.values)
        .map(|(debt, &value)| debt.monthly_interest_at(value))
        .sum();

    Ok(AllocationResult {
        feasible: true,
        weight: request.weight,
        payments,
        savings: solution.values[program.savings_index()],
        interest,
        objective: program.objective_value(&solution.values),
    })
}

pub fn allocate<S: LpSolver + ?Sized>(
    solver: &S,
    request: &AllocationRequest<'_>,
) -> AllocationResult {
    match solve_allocation(solver, request) {
        Ok(result) => result,
        Err(err) if err.is_infeasibility() => {
            debug!("weight {:.3}: {err}", request.weight);
            AllocationResult::infeasible(request.weight)
        }
        Err(err) => {
            warn!("weight {:.3}: {} failed: {err}", request.weight, solver.name());
            AllocationResult::infeasible(request.weight)
        }
    }
}
