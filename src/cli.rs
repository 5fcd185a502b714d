use clap::Parser;

use crate::client::DEFAULT_BASE_URL;

#[derive(Parser)]
#[command(name = "credit-recon")]
#[command(version)]
#[command(about = "Reconcile ticket-derived credit counters onto CRM company and deal records")]
pub struct Args {
    /// Company record id to reconcile (numeric string)
    pub company_id: String,

    /// CRM API base URL (override for testing against a local server)
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Suppress the colored end-of-run summary block
    #[arg(long, short)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse_company_id() {
        let args = Args::parse_from(["credit-recon", "500"]);
        assert_eq!(args.company_id, "500");
        assert_eq!(args.base_url, DEFAULT_BASE_URL);
        assert!(!args.quiet);
    }

    #[test]
    fn test_args_parse_base_url_override() {
        let args = Args::parse_from(["credit-recon", "500", "--base-url", "http://localhost:9900"]);
        assert_eq!(args.base_url, "http://localhost:9900");
    }

    #[test]
    fn test_args_parse_quiet_flag() {
        let args = Args::parse_from(["credit-recon", "500", "-q"]);
        assert!(args.quiet);
    }
}
