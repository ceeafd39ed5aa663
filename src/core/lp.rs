use log::warn;

use super::error::SolveError;
use super::types::{AllocationRequest, Debt};

pub const SAVINGS_VARIABLE: &str = "savings";

#[derive(Debug, Clone, PartialEq)]
pub struct LpVariable {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
    pub cost: f64,
}

// Payments sorted by debt id, then savings.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearProgram {
    pub variables: Vec<LpVariable>,
    pub row: Vec<f64>,
    pub rhs: f64,
    pub objective_offset: f64,
}

impl LinearProgram {
    pub fn savings_index(&self) -> usize {
        self.variables.len() - 1
    }

    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.variables
            .iter()
            .zip(values)
            .map(|(var, value)| var.cost * value)
            .sum::<f64>()
            + self.objective_offset
    }

    pub fn check_bounds(&self) -> Result<(), SolveError> {
        match self.variables.iter().find(|var| var.lower > var.upper) {
            Some(var) => Err(SolveError::ContradictoryBounds {
                variable: var.name.clone(),
                lower: var.lower,
                upper: var.upper,
            }),
            None => Ok(()),
        }
    }
}

pub fn payment_variable_name(debt_id: &str) -> String {
    format!("pay_{debt_id}")
}

pub fn debts_by_id(debts: &[Debt]) -> Vec<&Debt> {
    let mut ordered: Vec<&Debt> = debts.iter().collect();
    ordered.sort_by(|a, b| a.id.cmp(&b.id));
    ordered
}

pub fn build_program(request: &AllocationRequest<'_>) -> LinearProgram {
    let w = request.weight;
    let mut variables = Vec::with_capacity(request.debts.len() + 1);
    let mut objective_offset = 0.0;

    for debt in debts_by_id(request.debts) {
        if debt.min_payment > debt.balance {
            warn!(
                "debt `{}` minimum payment {:.2} exceeds balance {:.2}; allocation will overpay",
                debt.id, debt.min_payment, debt.balance
            );
        }
        objective_offset += w * (debt.apr / 12.0) * debt.balance;
        variables.push(LpVariable {
            name: payment_variable_name(&debt.id),
            lower: debt.payment_lower_bound(),
            upper: debt.payment_upper_bound(),
            cost: -w * (debt.apr / 24.0),
        });
    }

    variables.push(LpVariable {
        name: SAVINGS_VARIABLE.to_string(),
        lower: request.savings_lower_bound(),
        upper: f64::INFINITY,
        cost: -(1.0 - w),
    });

    LinearProgram {
        row: vec![1.0; variables.len()],
        variables,
        rhs: request.monthly_budget,
        objective_offset,
    }
}
