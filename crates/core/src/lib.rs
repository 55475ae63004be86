pub mod accounting;
pub mod aggregate;
pub mod allocation;
pub mod classify;
pub mod config;
pub mod dates;
pub mod diagnostics;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod followup;
pub mod horizon;
pub mod ingest;
pub mod projection;
pub mod reconcile;
pub mod typology;
pub mod views;

pub use accounting::{AccountingCalendar, PeriodShare};
pub use aggregate::{
    aggregate_portfolio, weighted_amount, weighting_probability, PeriodAggregate, PeriodKey,
    ProposalRevenue, Totals, YearRevenue,
};
pub use allocation::{
    allocate, month_span, BandThresholds, DesignBand, MonthlyAllocation, SpreadShape,
};
pub use classify::classify;
pub use config::{
    ConfigError, ConfigOverrides, EngineConfig, FollowupConfig, LoadOptions, LogFormat,
};
pub use dates::{resolve, DateRule, ResolvedDates};
pub use diagnostics::{diagnose, DataQualityFlag, ProposalDiagnostic};
pub use domain::month::{Quarter, YearMonth};
pub use domain::proposal::{Category, Proposal, ProposalId, ProposalStatus};
pub use engine::{BatchOutcome, Engine, ProposalFailure, ProposalRecord};
pub use errors::AllocationError;
pub use followup::{followup_window_start, needs_followup, select_followups, FollowupCandidate};
pub use horizon::Horizon;
pub use ingest::{parse_batch, IngestError, RawProposal};
pub use projection::{project_works, ProjectedWorks};
pub use reconcile::{
    distribute_carryover_to_accounting_periods, production_period_with_carryover,
    reconcile_production_quarter, reconcile_production_year, AmountBasis, Dimension,
    ProductionPeriod, ProductionQuarter, ProductionYear,
};
pub use typology::{allocate_typology, TypologyAllocation};
pub use views::{build_view, monthly_views, GroupSummary, MonthlyViews, ViewKind, ViewResult};
