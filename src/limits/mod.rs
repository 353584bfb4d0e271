//! Threshold evaluation against daily aggregates.

mod aggregate;
mod evaluator;

pub use aggregate::DailyAggregate;
pub use evaluator::ThresholdEvaluator;
