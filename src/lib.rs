//! Batch reconciliation of ticket-derived credit counters.
//!
//! Classifies every ticket associated with a company into five named credit
//! buckets, aggregates per-deal deltas, and patches the totals back onto the
//! company and deal records through the CRM REST API. Classification is a
//! pure function of ticket fields, so re-running against unchanged tickets
//! reproduces identical counters.

pub mod cli;
pub mod client;
pub mod crm;
pub mod recon;
pub mod rules;

pub use client::{ApiError, CrmApi, CrmClient, CrmClientConfig};
pub use recon::{run, ReconError, RunReport};
pub use rules::Bucket;
