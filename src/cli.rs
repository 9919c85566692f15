//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Which upstream to resolve DOIs through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendChoice {
    /// CrossRef works API, normalized metadata
    Crossref,
    /// doi.org content negotiation, raw CSL-JSON
    DoiOrg,
}

/// Resolve DOIs to bibliographic metadata.
///
/// Each resolved record is printed to stdout as one JSON document per line.
/// Failures are logged to stderr and make the process exit with status 1.
#[derive(Parser, Debug)]
#[command(name = "bibli")]
#[command(author, version, about)]
pub struct Args {
    /// DOIs to resolve
    #[arg(required = true, value_name = "DOI")]
    pub dois: Vec<String>,

    /// Upstream to resolve through
    #[arg(short, long, value_enum, default_value_t = BackendChoice::Crossref)]
    pub backend: BackendChoice,

    /// Contact address for the CrossRef polite pool
    #[arg(short, long)]
    pub mailto: Option<String>,

    /// EZproxy host to route requests and links through
    #[arg(long, conflicts_with = "institutional_access")]
    pub proxy_host: Option<String>,

    /// Use the University of Texas institutional proxy
    #[arg(long)]
    pub institutional_access: bool,

    /// Maximum attempts per DOI for transport failures (1-10)
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_retries: Option<u32>,

    /// Maximum concurrent resolutions (1-100)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: Option<u8>,

    /// Config file path (defaults to $XDG_CONFIG_HOME/bibli/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_single_doi_uses_defaults() {
        let args = Args::try_parse_from(["bibli", "10.1234/example.doi"]).unwrap();
        assert_eq!(args.dois, vec!["10.1234/example.doi"]);
        assert_eq!(args.backend, BackendChoice::Crossref);
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(!args.institutional_access);
        assert_eq!(args.max_retries, None);
        assert_eq!(args.concurrency, None);
    }

    #[test]
    fn test_cli_requires_a_doi() {
        let err = Args::try_parse_from(["bibli"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_multiple_dois_keep_order() {
        let args = Args::try_parse_from(["bibli", "10.1/a", "10.1/b", "10.1/c"]).unwrap();
        assert_eq!(args.dois, vec!["10.1/a", "10.1/b", "10.1/c"]);
    }

    #[test]
    fn test_cli_backend_doi_org() {
        let args = Args::try_parse_from(["bibli", "--backend", "doi-org", "10.1/a"]).unwrap();
        assert_eq!(args.backend, BackendChoice::DoiOrg);
    }

    #[test]
    fn test_cli_unknown_backend_rejected() {
        let err = Args::try_parse_from(["bibli", "--backend", "pubmed", "10.1/a"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["bibli", "-vv", "10.1/a"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_max_retries_range() {
        let args = Args::try_parse_from(["bibli", "-r", "10", "10.1/a"]).unwrap();
        assert_eq!(args.max_retries, Some(10));

        assert!(Args::try_parse_from(["bibli", "-r", "0", "10.1/a"]).is_err());
        assert!(Args::try_parse_from(["bibli", "-r", "11", "10.1/a"]).is_err());
    }

    #[test]
    fn test_cli_concurrency_range() {
        let args = Args::try_parse_from(["bibli", "-c", "100", "10.1/a"]).unwrap();
        assert_eq!(args.concurrency, Some(100));

        assert!(Args::try_parse_from(["bibli", "-c", "0", "10.1/a"]).is_err());
        assert!(Args::try_parse_from(["bibli", "-c", "101", "10.1/a"]).is_err());
    }

    #[test]
    fn test_cli_proxy_host_conflicts_with_institutional_access() {
        let err = Args::try_parse_from([
            "bibli",
            "--proxy-host",
            "proxy.example.edu",
            "--institutional-access",
            "10.1/a",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["bibli", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
