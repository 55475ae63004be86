use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::aggregate::{weighted_amount, ProposalRevenue};
use crate::allocation::{allocate, select_shape, MonthlyAllocation, SpreadShape};
use crate::classify::classify;
use crate::config::EngineConfig;
use crate::dates::{resolve, ResolvedDates};
use crate::domain::proposal::{Category, Proposal, ProposalId, ProposalStatus};
use crate::errors::AllocationError;
use crate::horizon::Horizon;
use crate::ingest::{normalize, RawProposal};
use crate::typology::allocate_typology;

/// Everything computed for one proposal in one run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRecord {
    pub proposal_id: ProposalId,
    pub title: String,
    pub category: Category,
    pub status: ProposalStatus,
    pub amount: Decimal,
    pub probability_percent: Option<Decimal>,
    pub creation_date: Option<NaiveDate>,
    pub proposal_date: Option<NaiveDate>,
    pub signature_date: Option<NaiveDate>,
    pub signing_year: i32,
    pub typology_tags: Vec<String>,
    pub primary_typology: Option<String>,
    pub dates: ResolvedDates,
    pub shape: SpreadShape,
    pub allocations: Vec<MonthlyAllocation>,
    pub revenue: ProposalRevenue,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalFailure {
    pub proposal_id: ProposalId,
    pub title: String,
    pub error: AllocationError,
}

#[derive(Clone, Debug, Serialize)]
pub struct BatchOutcome {
    pub run_id: Uuid,
    pub horizon: Horizon,
    pub records: Vec<ProposalRecord>,
    pub failures: Vec<ProposalFailure>,
}

/// Stateless allocation pipeline bound to one configuration and horizon.
#[derive(Clone, Debug)]
pub struct Engine {
    config: EngineConfig,
    horizon: Horizon,
}

impl Engine {
    pub fn new(config: EngineConfig, horizon: Horizon) -> Self {
        Self { config, horizon }
    }

    /// Engine whose horizon starts on the configured year, or `today`'s.
    pub fn from_config(config: EngineConfig, today: NaiveDate) -> Self {
        let horizon = config.horizon(today);
        Self::new(config, horizon)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn horizon(&self) -> Horizon {
        self.horizon
    }

    pub fn classify(&self, proposal: &Proposal) -> Category {
        classify(&proposal.title, &proposal.category_hint, &self.config.keywords)
    }

    pub fn normalize(&self, raw: &[RawProposal]) -> Vec<Proposal> {
        raw.iter().map(|record| normalize(record, &self.config.status)).collect()
    }

    /// Classify, resolve, allocate and clamp a single proposal.
    pub fn process(&self, proposal: &Proposal) -> Result<ProposalRecord, AllocationError> {
        let category = self.classify(proposal);
        let dates = resolve(
            &category,
            proposal.creation_date,
            proposal.start_date,
            proposal.end_date,
        )?;

        let shape = select_shape(proposal.amount, &dates, &category, &self.config.design);
        let spread = allocate(proposal.amount, &dates, &category, &self.config.design);
        let allocations: Vec<MonthlyAllocation> = self
            .horizon
            .clamp(spread)
            .into_iter()
            .map(|(month, amount)| MonthlyAllocation {
                proposal_id: proposal.id.clone(),
                month,
                amount,
                weighted_amount: weighted_amount(amount, proposal.probability_percent),
            })
            .collect();
        let revenue = ProposalRevenue::from_allocations(&self.horizon, &allocations);

        let typology = allocate_typology(
            proposal.typology.as_deref(),
            &proposal.title,
            &self.config.keywords.placeholders,
        );
        let signing_year =
            proposal.signing_year().unwrap_or_else(|| dates.effective_start.year());

        Ok(ProposalRecord {
            proposal_id: proposal.id.clone(),
            title: proposal.title.clone(),
            category,
            status: proposal.status,
            amount: proposal.amount,
            probability_percent: proposal.probability_percent,
            creation_date: proposal.creation_date,
            proposal_date: proposal.proposal_date,
            signature_date: proposal.signature_date,
            signing_year,
            typology_tags: typology.tags,
            primary_typology: typology.primary,
            dates,
            shape,
            allocations,
            revenue,
        })
    }

    /// Processes the batch in parallel. Bad records are skipped and reported;
    /// input order is kept in both lists.
    pub fn run(&self, proposals: &[Proposal]) -> BatchOutcome {
        let run_id = Uuid::new_v4();
        let correlation_id = run_id.to_string();
        info!(
            event_name = "engine.run.start",
            correlation_id = %correlation_id,
            proposal_count = proposals.len(),
            first_year = self.horizon.first_year(),
            last_year = self.horizon.last_year(),
            "starting allocation run"
        );

        let results: Vec<Result<ProposalRecord, ProposalFailure>> = proposals
            .par_iter()
            .map(|proposal| {
                self.process(proposal).map_err(|error| ProposalFailure {
                    proposal_id: proposal.id.clone(),
                    title: proposal.title.clone(),
                    error,
                })
            })
            .collect();

        let mut records = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(record) => {
                    if record.dates.one_month_fallback {
                        debug!(
                            event_name = "engine.proposal.one_month_fallback",
                            correlation_id = %correlation_id,
                            proposal_id = %record.proposal_id,
                            "inferred start fell after the end date"
                        );
                    }
                    records.push(record);
                }
                Err(failure) => {
                    warn!(
                        event_name = "engine.proposal.excluded",
                        correlation_id = %correlation_id,
                        proposal_id = %failure.proposal_id,
                        error_class = failure.error.error_class(),
                        error = %failure.error,
                        "proposal excluded from allocation"
                    );
                    failures.push(failure);
                }
            }
        }

        info!(
            event_name = "engine.run.complete",
            correlation_id = %correlation_id,
            allocated = records.len(),
            excluded = failures.len(),
            "allocation run complete"
        );

        BatchOutcome { run_id, horizon: self.horizon, records, failures }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    use super::{Engine, ProposalRecord};
    use crate::accounting::AccountingCalendar;
    use crate::aggregate::{aggregate_portfolio, PeriodKey};
    use crate::allocation::{DesignBand, SpreadShape};
    use crate::config::EngineConfig;
    use crate::dates::DateRule;
    use crate::domain::month::Quarter;
    use crate::domain::proposal::{Category, Proposal};
    use crate::errors::AllocationError;
    use crate::horizon::Horizon;
    use crate::reconcile::{reconcile_production_year, AmountBasis, Dimension};

    fn date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, month, day)
    }

    fn engine() -> Engine {
        Engine::new(EngineConfig::default(), Horizon::starting_at(2025, 4))
    }

    fn proposal(id: &str, hint: &str, amount: i64) -> Proposal {
        let mut proposal = Proposal::new(id, format!("Project {id}"), Decimal::new(amount, 0));
        proposal.category_hint = hint.to_string();
        proposal.creation_date = date(2025, 1, 2);
        proposal
    }

    fn field(record: &ProposalRecord, name: &str) -> Decimal {
        record
            .revenue
            .fields()
            .into_iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
            .unwrap_or_else(|| panic!("missing field {name}"))
    }

    fn amounts(record: &ProposalRecord) -> Vec<(String, Decimal)> {
        record
            .allocations
            .iter()
            .map(|row| (row.month.to_string(), row.amount))
            .collect()
    }

    #[test]
    fn maintenance_year_is_twelve_equal_months() {
        let mut input = proposal("S1", "Maintenance", 12_000);
        input.start_date = date(2025, 1, 1);
        input.end_date = date(2025, 12, 31);
        input.probability_percent = Some(Decimal::new(40, 0));

        let record = engine().process(&input).expect("allocates");
        assert_eq!(record.allocations.len(), 12);
        assert!(record.allocations.iter().all(|row| row.amount == Decimal::new(1_000, 0)));
        assert_eq!(field(&record, "TotalAmount_2025"), Decimal::new(12_000, 0));
        assert_eq!(field(&record, "TotalAmount_Q2_2025"), Decimal::new(3_000, 0));
        assert_eq!(field(&record, "WeightedAmount_2025"), Decimal::new(4_800, 0));
        assert_eq!(field(&record, "TotalAmount_2026"), Decimal::ZERO);
    }

    #[test]
    fn short_works_book_everything_in_the_start_month() {
        let mut input = proposal("S2", "Works", 5_000);
        input.start_date = date(2025, 3, 10);
        input.end_date = date(2025, 3, 25);

        let record = engine().process(&input).expect("allocates");
        assert_eq!(record.shape, SpreadShape::SingleMonth);
        assert_eq!(amounts(&record), vec![("2025-03".to_string(), Decimal::new(5_000, 0))]);
        assert_eq!(field(&record, "TotalAmount_Q1_2025"), Decimal::new(5_000, 0));
    }

    #[test]
    fn medium_design_spreads_over_eighteen_months() {
        let mut input = proposal("S3", "Design", 24_000);
        input.start_date = date(2025, 1, 1);

        let record = engine().process(&input).expect("allocates");
        assert_eq!(record.dates.rule_applied, DateRule::EndMissing);
        assert_eq!(record.shape, SpreadShape::Design(DesignBand::Medium));
        assert_eq!(record.allocations.len(), 18);
        assert_eq!(field(&record, "TotalAmount_2025"), Decimal::new(14_400, 0));
        assert_eq!(field(&record, "TotalAmount_Q3_2025"), Decimal::ZERO);
        assert_eq!(field(&record, "TotalAmount_2026"), Decimal::new(9_600, 0));
    }

    #[test]
    fn large_design_spreads_over_thirty_months() {
        let mut input = proposal("S4", "Design", 60_000);
        input.start_date = date(2025, 1, 1);

        let record = engine().process(&input).expect("allocates");
        assert_eq!(record.allocations.len(), 30);
        assert_eq!(field(&record, "TotalAmount_2025"), Decimal::new(24_000, 0));
        assert_eq!(field(&record, "TotalAmount_Q1_2026"), Decimal::ZERO);
        assert_eq!(field(&record, "TotalAmount_Q3_2026"), Decimal::new(9_000, 0));
        assert_eq!(field(&record, "TotalAmount_2027"), Decimal::new(18_000, 0));
    }

    #[test]
    fn inferred_maintenance_start_is_clamped_into_the_horizon() {
        let mut input = proposal("S5", "Maintenance", 12_000);
        input.end_date = date(2025, 3, 31);

        let record = engine().process(&input).expect("allocates");
        assert_eq!(record.dates.rule_applied, DateRule::StartMissing);
        assert_eq!(Some(record.dates.effective_start), date(2024, 4, 30));
        assert_eq!(
            amounts(&record),
            vec![
                ("2025-01".to_string(), Decimal::new(10_000, 0)),
                ("2025-02".to_string(), Decimal::new(1_000, 0)),
                ("2025-03".to_string(), Decimal::new(1_000, 0)),
            ]
        );
    }

    #[test]
    fn carryover_comes_from_earlier_signing_years() {
        let mut earlier = proposal("S6-A", "Maintenance", 12_000);
        earlier.signature_date = date(2024, 12, 1);
        earlier.start_date = date(2025, 1, 1);
        earlier.end_date = date(2025, 12, 31);

        let mut current = proposal("S6-B", "Maintenance", 6_000);
        current.signature_date = date(2025, 2, 1);
        current.start_date = date(2025, 7, 1);
        current.end_date = date(2025, 12, 31);

        let outcome = engine().run(&[earlier, current]);
        let production =
            reconcile_production_year(&outcome.records, 2025, AmountBasis::Raw, &Dimension::All);

        assert_eq!(production.total, Decimal::new(18_000, 0));
        assert_eq!(production.carryover, Decimal::new(12_000, 0));
        assert_eq!(production.by_signing_year.get(&2025), Some(&Decimal::new(6_000, 0)));
    }

    #[test]
    fn bad_records_are_reported_without_aborting_the_batch() {
        let mut inverted = proposal("BAD-1", "Works", 1_000);
        inverted.start_date = date(2025, 6, 1);
        inverted.end_date = date(2025, 5, 1);

        let mut orphan = proposal("BAD-2", "Works", 1_000);
        orphan.creation_date = None;

        let good = proposal("OK-1", "Works", 6_000);

        let outcome = engine().run(&[inverted, good, orphan]);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].proposal_id.0, "OK-1");
        assert_eq!(outcome.failures.len(), 2);
        assert_eq!(outcome.failures[0].proposal_id.0, "BAD-1");
        assert!(matches!(outcome.failures[0].error, AllocationError::InvalidDateRange { .. }));
        assert_eq!(outcome.failures[1].error, AllocationError::UnresolvableDates);
    }

    #[test]
    fn signing_year_falls_back_to_effective_start() {
        let mut input = proposal("SY", "Maintenance", 1_200);
        input.creation_date = None;
        input.end_date = date(2026, 5, 31);

        let record = engine().process(&input).expect("allocates");
        assert_eq!(record.signing_year, 2025);
    }

    #[test]
    fn ts_titles_are_works_and_tagged() {
        let mut input = proposal("TS-1", "Maintenance", 2_000);
        input.title = "Hedge trimming (TS)".to_string();

        let record = engine().process(&input).expect("allocates");
        assert_eq!(record.category, Category::Works);
        assert_eq!(record.primary_typology.as_deref(), Some("Maintenance TS"));
    }

    #[test]
    fn portfolio_aggregates_carry_over_per_period() {
        let mut earlier = proposal("P-A", "Maintenance", 12_000);
        earlier.signature_date = date(2024, 11, 1);
        earlier.start_date = date(2025, 1, 1);
        earlier.end_date = date(2025, 12, 31);
        let current = proposal("P-B", "Works", 6_000);

        let outcome = engine().run(&[earlier, current]);
        let aggregates = aggregate_portfolio(&outcome.records, &AccountingCalendar::default());

        let q1 = aggregates
            .iter()
            .find(|aggregate| aggregate.key == PeriodKey::Quarter { year: 2025, quarter: Quarter::Q1 })
            .expect("q1 aggregate");
        assert_eq!(q1.totals.raw, Decimal::new(6_000, 0));
        assert_eq!(q1.carryover.raw, Decimal::new(3_000, 0));

        let summer = aggregates
            .iter()
            .find(|aggregate| aggregate.key == PeriodKey::AccountingPeriod { year: 2025, period: 6 })
            .expect("july+august aggregate");
        assert_eq!(summer.totals.raw, Decimal::new(2_000, 0));
    }

    fn hint() -> impl Strategy<Value = &'static str> {
        prop_oneof![Just("Maintenance"), Just("Works"), Just("Design"), Just("Landscaping")]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn clamped_rows_keep_the_amount_and_quarters_add_up(
            cents in -5_000_000i64..200_000_000i64,
            hint in hint(),
            start_offset in -1_500i64..2_500,
            length in 0i64..1_200,
            probability in prop::option::of(0i64..=100),
        ) {
            let base = NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date");
            let start = base + chrono::Duration::days(start_offset);
            let mut input = Proposal::new("PROP", "Generated", Decimal::new(cents, 2));
            input.category_hint = hint.to_string();
            input.creation_date = Some(start);
            input.start_date = Some(start);
            input.end_date = Some(start + chrono::Duration::days(length));
            input.probability_percent = probability.map(|value| Decimal::new(value, 0));

            let engine = engine();
            let record = engine.process(&input).expect("consistent dates allocate");
            let clamped: Decimal = record.allocations.iter().map(|row| row.amount).sum();
            prop_assert_eq!(clamped, input.amount);
            prop_assert!(record.allocations.iter().all(|row| engine.horizon().contains(row.month)));
            prop_assert!(record.allocations.windows(2).all(|pair| pair[0].month < pair[1].month));

            for year in &record.revenue.years {
                let raw: Decimal = year.quarters.iter().map(|quarter| quarter.raw).sum();
                let weighted: Decimal = year.quarters.iter().map(|quarter| quarter.weighted).sum();
                prop_assert_eq!(raw, year.total.raw);
                prop_assert_eq!(weighted, year.total.weighted);
            }
            prop_assert_eq!(record.revenue.total().raw, input.amount);
        }
    }
}
