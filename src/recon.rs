//! The ticket credit reconciliation job.
//!
//! Pages through every ticket associated with one company, classifies each
//! ticket against the rule table in [`crate::rules`], aggregates per-deal
//! credit deltas, and writes the totals back to the company and deal records.
//!
//! The page loop is strictly sequential (each page's cursor comes from the
//! previous response); the only concurrency is the final deal-patch fan-out,
//! which joins all patches and tolerates per-deal failures.

use std::collections::{BTreeSet, HashMap};

use futures_util::future::join_all;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::client::{ApiError, CrmApi};
use crate::crm::{PropertyPatch, TicketRecord};
use crate::rules::{rule_for, Bucket, RULES};

/// Fatal job errors, by tier. Per-page association failures and per-deal
/// patch failures never reach this type; they are degraded or isolated
/// locally.
#[derive(Debug, Error)]
pub enum ReconError {
    #[error("Company ID must be numeric and valid")]
    InvalidCompanyId { given: String },
    #[error("ticket search failed: {0}")]
    Search(#[source] ApiError),
    #[error("company update failed: {0}")]
    CompanyPatch(#[source] ApiError),
}

impl ReconError {
    /// Top-level message for the structured error result.
    pub fn message(&self) -> &'static str {
        match self {
            ReconError::InvalidCompanyId { .. } => "Error: Invalid or missing Company ID",
            _ => "Error occurred while processing",
        }
    }
}

/// One classification counter: running count plus the ids of the tickets
/// that matched, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterBucket {
    pub count: u64,
    pub matches: Vec<String>,
}

/// Per-deal credit deltas, additive across pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DealAggregate {
    pub credits_available: u64,
    pub credits_purchased: u64,
}

/// Distinct categorical codes observed across the run. Diagnostic only.
#[derive(Debug, Clone, Default)]
pub struct SeenCodes {
    pub pipelines: BTreeSet<String>,
    pub stages: BTreeSet<String>,
    pub products: BTreeSet<String>,
}

/// All state accumulated over the page loop. Threaded by value through
/// [`fold_page`] so a single page's processing is a pure function of the
/// prior accumulator, the page, and the association map.
#[derive(Debug, Clone, Default)]
pub struct RunAccumulator {
    buckets: [CounterBucket; Bucket::COUNT],
    pub deals: HashMap<String, DealAggregate>,
    pub total_tickets: u64,
    pub seen: SeenCodes,
}

impl RunAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bucket(&self, bucket: Bucket) -> &CounterBucket {
        &self.buckets[bucket.index()]
    }
}

/// Fold one ticket page into the accumulator.
///
/// Company-level buckets and deal-level aggregates are evaluated
/// independently; a ticket updates every bucket whose rule it matches, and
/// additionally updates its associated deal (if `deal_map` has one) for the
/// two deal-level rules. Tickets absent from `deal_map` still count at the
/// company level.
pub fn fold_page(
    mut acc: RunAccumulator,
    tickets: &[TicketRecord],
    deal_map: &HashMap<String, String>,
) -> RunAccumulator {
    for ticket in tickets {
        let pipeline = ticket.pipeline();
        let stage = ticket.pipeline_stage();
        let product = ticket.product_id();

        acc.seen.pipelines.insert(pipeline.to_string());
        acc.seen.stages.insert(stage.to_string());
        acc.seen.products.insert(product.to_string());

        for rule in &RULES {
            if rule.matches(pipeline, stage, product) {
                let bucket = &mut acc.buckets[rule.bucket.index()];
                bucket.count += 1;
                bucket.matches.push(ticket.id.clone());
            }
        }

        if let Some(deal_id) = deal_map.get(&ticket.id) {
            let deal = acc.deals.entry(deal_id.clone()).or_default();
            if rule_for(Bucket::DealAvailable).matches(pipeline, stage, product) {
                deal.credits_available += 1;
            }
            if rule_for(Bucket::DealPurchased).matches(pipeline, stage, product) {
                deal.credits_purchased += 1;
            }
        }

        acc.total_tickets += 1;
    }
    acc
}

/// Outcome of one deal patch in the commit fan-out. Failures are isolated
/// here and never escalate to the run result.
#[derive(Debug)]
pub struct DealPatchOutcome {
    pub deal_id: String,
    pub result: Result<(), ApiError>,
}

/// Company credit totals written in the commit phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompanyCredits {
    pub pending: u64,
    pub purchased: u64,
    pub extended: u64,
}

/// Successful run summary.
///
/// `deals_updated` is the number of deals that had aggregated deltas, not
/// the number of patches that succeeded; individual patch failures are only
/// visible in `deal_outcomes` (and in the logs). The success signal does not
/// distinguish "no deals needed updating" from "all deal patches failed".
#[derive(Debug)]
pub struct RunReport {
    pub message: String,
    pub total_tickets: u64,
    pub company: CompanyCredits,
    pub deals_updated: usize,
    pub deal_outcomes: Vec<DealPatchOutcome>,
}

/// A syntactically valid company id is a non-empty string of ASCII digits.
pub fn validate_company_id(company_id: &str) -> Result<(), ReconError> {
    if company_id.is_empty() || !company_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(ReconError::InvalidCompanyId {
            given: company_id.to_string(),
        });
    }
    Ok(())
}

/// Run the full reconciliation for one company.
///
/// # Errors
/// - [`ReconError::InvalidCompanyId`] — before any network call.
/// - [`ReconError::Search`] — a ticket search page failed.
/// - [`ReconError::CompanyPatch`] — the company update failed; company state
///   is authoritative and must not silently fail.
pub async fn run<C: CrmApi>(api: &C, company_id: &str) -> Result<RunReport, ReconError> {
    validate_company_id(company_id)?;
    info!(company_id, "starting credit reconciliation");

    let mut acc = RunAccumulator::new();
    let mut after: Option<String> = None;

    loop {
        let page = api
            .search_tickets(company_id, after.take())
            .await
            .map_err(ReconError::Search)?;

        // An empty page ends the run even if a cursor is present.
        if page.results.is_empty() {
            break;
        }

        let ticket_ids: Vec<String> = page.results.iter().map(|t| t.id.clone()).collect();
        let deal_map = match api.deal_associations(&ticket_ids).await {
            Ok(map) => map,
            Err(e) => {
                // Degrade, don't abort: company-level counting proceeds,
                // deal-level updates for this page are skipped.
                warn!(error = %e, tickets = ticket_ids.len(),
                    "deal association lookup failed, skipping deal updates for this page");
                HashMap::new()
            }
        };

        acc = fold_page(acc, &page.results, &deal_map);
        info!(
            page_tickets = ticket_ids.len(),
            total_tickets = acc.total_tickets,
            "processed ticket page"
        );

        match page.next_after() {
            Some(cursor) => after = Some(cursor.to_string()),
            None => break,
        }
    }

    let company = CompanyCredits {
        pending: acc.bucket(Bucket::TotalAvailable).count,
        purchased: acc.bucket(Bucket::TotalPurchased).count,
        extended: acc.bucket(Bucket::ExtendedPlacement).count,
    };

    let patch = PropertyPatch::company_credits(company.pending, company.purchased, company.extended);
    api.patch_company(company_id, &patch)
        .await
        .map_err(ReconError::CompanyPatch)?;
    info!(company_id, pending = company.pending, purchased = company.purchased,
        extended = company.extended, "updated company credits");

    // Fan out one patch per deal, join all, tolerate individual failures.
    let deal_outcomes = join_all(acc.deals.iter().map(|(deal_id, agg)| async move {
        let patch = PropertyPatch::deal_credits(agg.credits_available, agg.credits_purchased);
        let result = api.patch_deal(deal_id, &patch).await;
        match &result {
            Ok(()) => info!(deal_id = %deal_id, "updated deal"),
            Err(e) => error!(deal_id = %deal_id, error = %e, "deal update failed"),
        }
        DealPatchOutcome {
            deal_id: deal_id.clone(),
            result,
        }
    }))
    .await;

    info!(
        total_tickets = acc.total_tickets,
        deals_updated = acc.deals.len(),
        distinct_pipelines = acc.seen.pipelines.len(),
        distinct_stages = acc.seen.stages.len(),
        distinct_products = acc.seen.products.len(),
        "reconciliation complete"
    );

    Ok(RunReport {
        message: format!(
            "Successfully processed {} tickets, updated company credits and {} deals",
            acc.total_tickets,
            acc.deals.len()
        ),
        total_tickets: acc.total_tickets,
        company,
        deals_updated: acc.deals.len(),
        deal_outcomes,
    })
}
