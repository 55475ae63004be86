use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;
use spreadline_core::accounting::{PeriodShare, PERIOD_COUNT};
use spreadline_core::config::ConfigOverrides;
use spreadline_core::engine::Engine;
use spreadline_core::reconcile::{
    distribute_carryover_to_accounting_periods, production_period_with_carryover,
    reconcile_production_quarter, reconcile_production_year, AmountBasis, Dimension,
    ProductionPeriod, ProductionQuarter, ProductionYear,
};
use spreadline_core::{Category, Quarter};

use crate::commands::input::read_proposals;
use crate::commands::{input_failure, load_config, to_data, CommandResult, EXIT_INPUT};

const COMMAND: &str = "reconcile";

#[derive(Debug, Clone, Default)]
pub struct ReconcileArgs {
    pub input: PathBuf,
    pub year: i32,
    pub quarter: Option<u32>,
    pub weighted: bool,
    pub category: Option<String>,
    pub typology: Option<String>,
}

#[derive(Debug, Serialize)]
struct ReconcileReport {
    basis: AmountBasis,
    dimension: Dimension,
    production: ProductionYear,
    periods: Vec<ProductionPeriod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quarter: Option<QuarterReport>,
    excluded: usize,
}

#[derive(Debug, Serialize)]
struct QuarterReport {
    production: ProductionQuarter,
    carryover_by_period: Vec<PeriodShare>,
}

pub fn run(args: &ReconcileArgs, config_path: Option<PathBuf>, today: NaiveDate) -> CommandResult {
    let config = match load_config(COMMAND, config_path, ConfigOverrides::default()) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let engine = Engine::from_config(config, today);
    let horizon = engine.horizon();

    if !horizon.year_range().contains(&args.year) {
        return CommandResult::failure(
            COMMAND,
            "input",
            format!(
                "year {} is outside the tracked horizon {}..={}",
                args.year,
                horizon.first_year(),
                horizon.last_year()
            ),
            EXIT_INPUT,
        );
    }

    let quarter = match args.quarter.map(Quarter::from_number) {
        None => None,
        Some(Some(quarter)) => Some(quarter),
        Some(None) => {
            return CommandResult::failure(
                COMMAND,
                "input",
                "quarter must be in range 1..=4",
                EXIT_INPUT,
            );
        }
    };

    let proposals = match read_proposals(&args.input, &engine) {
        Ok(proposals) => proposals,
        Err(error) => return input_failure(COMMAND, &error),
    };
    let outcome = engine.run(&proposals);
    let records = &outcome.records;

    let basis = if args.weighted { AmountBasis::Weighted } else { AmountBasis::Raw };
    let dimension = dimension(args);
    let calendar = engine.config().accounting_calendar();

    let production = reconcile_production_year(records, args.year, basis, &dimension);
    let periods = (0..PERIOD_COUNT)
        .map(|period| {
            production_period_with_carryover(
                records, args.year, period, basis, &dimension, &calendar,
            )
        })
        .collect();
    let quarter = quarter.map(|quarter| {
        let production =
            reconcile_production_quarter(records, args.year, quarter, basis, &dimension);
        let carryover_by_period =
            distribute_carryover_to_accounting_periods(production.carryover, quarter, &calendar);
        QuarterReport { production, carryover_by_period }
    });

    let message = format!(
        "production {}: total {:.2}, carryover {:.2}",
        args.year, production.total, production.carryover
    );
    let report = ReconcileReport {
        basis,
        dimension,
        production,
        periods,
        quarter,
        excluded: outcome.failures.len(),
    };

    match to_data(COMMAND, &report) {
        Ok(data) => CommandResult::success_with_data(COMMAND, message, Some(data)),
        Err(failure) => failure,
    }
}

fn dimension(args: &ReconcileArgs) -> Dimension {
    if let Some(category) = &args.category {
        return Dimension::Category(Category::from(category.clone()));
    }
    if let Some(typology) = &args.typology {
        return Dimension::Typology(typology.clone());
    }
    Dimension::All
}
