use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Debt {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub balance: f64,
    pub apr: f64,
    pub min_payment: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payment: Option<f64>,
}

impl Debt {
    pub fn payment_lower_bound(&self) -> f64 {
        self.min_payment.max(0.0)
    }

    // Never below the lower bound: a minimum above the balance overpays.
    pub fn payment_upper_bound(&self) -> f64 {
        let cap = self.max_payment.unwrap_or(f64::INFINITY);
        self.payment_lower_bound().max(self.balance.min(cap))
    }

    pub fn monthly_interest_at(&self, payment: f64) -> f64 {
        (self.apr / 12.0) * self.balance - (self.apr / 24.0) * payment
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AllocationRequest<'a> {
    pub monthly_budget: f64,
    pub debts: &'a [Debt],
    pub weight: f64,
    pub enforce_minimum_savings: bool,
    pub minimum_savings: f64,
}

impl AllocationRequest<'_> {
    pub fn savings_lower_bound(&self) -> f64 {
        savings_floor(self.enforce_minimum_savings, self.minimum_savings)
    }
}

fn savings_floor(enforce: bool, minimum_savings: f64) -> f64 {
    if enforce {
        minimum_savings.max(0.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationRequest {
    pub monthly_budget: f64,
    pub debts: Vec<Debt>,
    pub enforce_minimum_savings: bool,
    pub minimum_savings: f64,
    pub sweep_points: u32,
}

impl OptimizationRequest {
    pub fn at_weight(&self, weight: f64) -> AllocationRequest<'_> {
        AllocationRequest {
            monthly_budget: self.monthly_budget,
            debts: &self.debts,
            weight,
            enforce_minimum_savings: self.enforce_minimum_savings,
            minimum_savings: self.minimum_savings,
        }
    }

    pub fn required_minimum(&self) -> f64 {
        let payments: f64 = self.debts.iter().map(Debt::payment_lower_bound).sum();
        payments + savings_floor(self.enforce_minimum_savings, self.minimum_savings)
    }

    pub fn weights(&self) -> Vec<f64> {
        match self.sweep_points {
            0 => Vec::new(),
            1 => vec![0.5],
            n => (0..n).map(|k| k as f64 / (n - 1) as f64).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationResult {
    pub feasible: bool,
    pub weight: f64,
    pub payments: BTreeMap<String, f64>,
    pub savings: f64,
    pub interest: f64,
    pub objective: f64,
}

impl AllocationResult {
    pub fn infeasible(weight: f64) -> Self {
        Self {
            feasible: false,
            weight,
            payments: BTreeMap::new(),
            savings: 0.0,
            interest: 0.0,
            objective: 0.0,
        }
    }

    pub fn total_payments(&self) -> f64 {
        self.payments.values().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Optimization {
    pub frontier: Vec<AllocationResult>,
    pub selected: AllocationResult,
    pub selected_index: usize,
}
