use axum::{
    Router,
    extract::Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::Parser;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    AllocationResult, Debt, LpSolver, MAX_SWEEP_POINTS, MicroLpSolver, Optimization,
    OptimizationRequest, OptimizeError, knee_scores, optimize, validate_request,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct OptimizePayload {
    monthly_budget: Option<f64>,
    debts: Option<Vec<Debt>>,
    enforce_minimum_savings: Option<bool>,
    #[serde(alias = "emergencyFundMin")]
    minimum_savings: Option<f64>,
    sweep_points: Option<u32>,
}

#[derive(Parser, Debug)]
#[command(
    name = "payplan",
    about = "Split a monthly budget between debt payments and savings along an interest/savings Pareto frontier",
    after_help = "Run `payplan serve [port]` to start the HTTP API instead."
)]
pub struct Cli {
    #[arg(long, help = "Money available each month for debt payments and savings")]
    monthly_budget: f64,
    #[arg(
        long = "debt",
        value_parser = parse_debt,
        help = "Debt as id=cc1,balance=2500,apr=0.219,min=50[,max=300][,name=Card]; repeatable"
    )]
    debts: Vec<Debt>,
    #[arg(long, help = "Allow savings below --minimum-savings")]
    no_minimum_savings: bool,
    #[arg(
        long,
        default_value_t = 200.0,
        help = "Monthly savings floor while the floor is enforced"
    )]
    minimum_savings: f64,
    #[arg(
        long,
        default_value_t = 11,
        help = "Number of interest/savings weights sampled between 0 and 1"
    )]
    sweep_points: u32,
    #[arg(long, help = "Pretty-print the JSON result")]
    pretty: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
enum ResponseStatus {
    Optimal,
    InfeasibleBudget,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OptimizeResponse {
    status: ResponseStatus,
    monthly_budget: f64,
    enforce_minimum_savings: bool,
    minimum_savings: f64,
    sweep_points: u32,
    frontier: Vec<AllocationResult>,
    knee_scores: Vec<f64>,
    selected: Option<AllocationResult>,
    selected_index: Option<usize>,
    required_minimum: Option<f64>,
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    solver: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn parse_debt(raw: &str) -> Result<Debt, String> {
    let mut id = None;
    let mut name = None;
    let mut balance = None;
    let mut apr = None;
    let mut min_payment = None;
    let mut max_payment = None;

    for part in raw.split(',').filter(|p| !p.trim().is_empty()) {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| format!("expected key=value in debt spec, got `{part}`"))?;
        let value = value.trim();
        match key.trim() {
            "id" => id = Some(value.to_string()),
            "name" => name = Some(value.to_string()),
            "balance" => balance = Some(parse_amount("balance", value)?),
            "apr" => apr = Some(parse_amount("apr", value)?),
            "min" | "minPayment" | "min_payment" => {
                min_payment = Some(parse_amount("min", value)?)
            }
            "max" | "maxPayment" | "max_payment" => {
                max_payment = Some(parse_amount("max", value)?)
            }
            other => return Err(format!("unknown debt field `{other}`")),
        }
    }

    let id = id.ok_or_else(|| "debt spec is missing `id`".to_string())?;
    Ok(Debt {
        name: name.unwrap_or_else(|| id.clone()),
        balance: balance.ok_or_else(|| format!("debt `{id}` is missing `balance`"))?,
        apr: apr.ok_or_else(|| format!("debt `{id}` is missing `apr`"))?,
        min_payment: min_payment.unwrap_or(0.0),
        max_payment,
        id,
    })
}

fn parse_amount(field: &str, value: &str) -> Result<f64, String> {
    value
        .parse::<f64>()
        .map_err(|e| format!("invalid {field} `{value}`: {e}"))
}

fn build_request(cli: Cli) -> Result<OptimizationRequest, String> {
    if !cli.monthly_budget.is_finite() {
        return Err("--monthly-budget must be a finite number".to_string());
    }

    if !(1..=MAX_SWEEP_POINTS).contains(&cli.sweep_points) {
        return Err(format!(
            "--sweep-points must be between 1 and {MAX_SWEEP_POINTS}"
        ));
    }

    if !cli.minimum_savings.is_finite() || cli.minimum_savings < 0.0 {
        return Err("--minimum-savings must be >= 0".to_string());
    }

    let request = OptimizationRequest {
        monthly_budget: cli.monthly_budget,
        debts: cli.debts,
        enforce_minimum_savings: !cli.no_minimum_savings,
        minimum_savings: cli.minimum_savings,
        sweep_points: cli.sweep_points,
    };
    validate_request(&request).map_err(|e| e.to_string())?;
    Ok(request)
}

pub fn run_cli(cli: Cli) -> Result<String, String> {
    let pretty = cli.pretty;
    let request = build_request(cli)?;
    let response = build_optimize_response(&request, optimize(&request))
        .map_err(|(_, msg)| msg)?;
    let rendered = if pretty {
        serde_json::to_string_pretty(&response)
    } else {
        serde_json::to_string(&response)
    };
    rendered.map_err(|e| format!("failed to render result: {e}"))
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let solver = MicroLpSolver;
    match solver.check_available() {
        Ok(()) => info!("solver {} ready", solver.name()),
        Err(e) => warn!("solver {} failed its capability check: {e}", solver.name()),
    }

    let app = Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/optimize", post(optimize_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!("payplan HTTP API listening on http://{addr}");
    info!("Local access: http://127.0.0.1:{port}/api/health");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    let solver = MicroLpSolver;
    match solver.check_available() {
        Ok(()) => json_response(
            StatusCode::OK,
            HealthResponse {
                status: "ok",
                solver: solver.name(),
            },
        ),
        Err(e) => {
            warn!("solver capability check failed: {e}");
            error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                &format!("solver {} unavailable: {e}", solver.name()),
            )
        }
    }
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn optimize_handler(Json(payload): Json<OptimizePayload>) -> Response {
    optimize_handler_impl(payload).await
}

async fn optimize_handler_impl(payload: OptimizePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let outcome = tokio::task::spawn_blocking(move || {
        let result = optimize(&request);
        build_optimize_response(&request, result)
    })
    .await;

    match outcome {
        Ok(Ok(response)) => json_response(StatusCode::OK, response),
        Ok(Err((status, msg))) => error_response(status, &msg),
        Err(e) => {
            warn!("optimization worker failed: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "optimization failed")
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<OptimizationRequest, String> {
    let payload = serde_json::from_str::<OptimizePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: OptimizePayload) -> Result<OptimizationRequest, String> {
    let mut cli = default_cli_for_api();

    match payload.monthly_budget {
        Some(v) => cli.monthly_budget = v,
        None => return Err("monthlyBudget is required".to_string()),
    }
    match payload.debts {
        Some(v) => cli.debts = v,
        None => return Err("debts is required".to_string()),
    }
    if let Some(v) = payload.enforce_minimum_savings {
        cli.no_minimum_savings = !v;
    }
    if let Some(v) = payload.minimum_savings {
        cli.minimum_savings = v;
    }
    if let Some(v) = payload.sweep_points {
        cli.sweep_points = v;
    }

    build_request(cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        monthly_budget: 0.0,
        debts: Vec::new(),
        no_minimum_savings: false,
        minimum_savings: 200.0,
        sweep_points: 11,
        pretty: false,
    }
}

fn build_optimize_response(
    request: &OptimizationRequest,
    outcome: Result<Optimization, OptimizeError>,
) -> Result<OptimizeResponse, (StatusCode, String)> {
    let base = OptimizeResponse {
        status: ResponseStatus::Optimal,
        monthly_budget: request.monthly_budget,
        enforce_minimum_savings: request.enforce_minimum_savings,
        minimum_savings: request.minimum_savings,
        sweep_points: request.sweep_points,
        frontier: Vec::new(),
        knee_scores: Vec::new(),
        selected: None,
        selected_index: None,
        required_minimum: None,
        message: None,
    };

    match outcome {
        Ok(optimization) => Ok(OptimizeResponse {
            knee_scores: knee_scores(&optimization.frontier),
            selected: Some(optimization.selected),
            selected_index: Some(optimization.selected_index),
            frontier: optimization.frontier,
            ..base
        }),
        Err(
            e @ OptimizeError::InfeasibleBudget {
                required_minimum, ..
            },
        ) => Ok(OptimizeResponse {
            status: ResponseStatus::InfeasibleBudget,
            required_minimum: Some(required_minimum),
            message: Some(e.to_string()),
            ..base
        }),
        Err(e) if e.is_invalid_input() => Err((StatusCode::BAD_REQUEST, e.to_string())),
        Err(e @ OptimizeError::SolverUnavailable { .. }) => {
            warn!("{e}");
            Err((StatusCode::SERVICE_UNAVAILABLE, e.to_string()))
        }
        Err(e) => {
            warn!("{e}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}
