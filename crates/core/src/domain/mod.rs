pub mod month;
pub mod proposal;
