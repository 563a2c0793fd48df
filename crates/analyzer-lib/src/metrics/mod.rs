//! Usage aggregation and efficiency scoring

mod aggregator;
mod efficiency;


pub use aggregator::{AggregatorConfig, MetricsAggregator};
pub use efficiency::{classify, compute_efficiency, HIGH_THRESHOLD, MEDIUM_THRESHOLD};
