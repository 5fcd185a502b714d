use std::env;

use clap::Parser;
use colored::*;
use tracing_subscriber::EnvFilter;

use credit_recon::cli::Args;
use credit_recon::client::{CrmClient, CrmClientConfig};
use credit_recon::recon::{self, RunReport};

fn print_summary(report: &RunReport) {
    println!("\n{}", "=== Final Summary ===".bold());
    println!("Total tickets processed: {}", report.total_tickets.to_string().cyan());
    println!(
        "Company credits: Available={}, Purchased={}, Extended={}",
        report.company.pending.to_string().green(),
        report.company.purchased.to_string().green(),
        report.company.extended.to_string().green()
    );
    println!("Deals updated: {}", report.deals_updated.to_string().cyan());
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let token = env::var("HUBSPOT_ACCESS_TOKEN")
        .map_err(|_| "HUBSPOT_ACCESS_TOKEN not set. Export it or pass via environment.")?;

    let client = CrmClient::new(CrmClientConfig::new(args.base_url), token);

    // The job's external contract is a single structured result on stdout:
    // {"message": ...} on success, {"message": ..., "error": ...} on failure.
    match recon::run(&client, &args.company_id).await {
        Ok(report) => {
            if !args.quiet {
                print_summary(&report);
            }
            println!("{}", serde_json::json!({ "message": report.message }));
            Ok(())
        }
        Err(e) => {
            println!(
                "{}",
                serde_json::json!({ "message": e.message(), "error": e.to_string() })
            );
            Err(e.into())
        }
    }
}
