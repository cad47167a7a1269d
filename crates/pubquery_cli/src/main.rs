//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `pubquery_core` linkage and print its version.
//! - Optionally load a snapshot, index its content in memory and run one
//!   term search, printing `rank score id name` lines and the total.

use clap::Parser;
use log::info;
use pubquery_core::{
    load_config, CoreConfig, IndexDocument, MemoryIndex, PublishedContentQuery,
    PublishedSnapshot, QueryFacade, SearchProviderRegistry,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

const PROVIDER_NAME: &str = "internal";

#[derive(Parser, Debug)]
#[command(name = "pubquery_cli")]
#[command(about = "Resolve and search a published content snapshot")]
#[command(version)]
struct Cli {
    /// Snapshot JSON file with `content` and `media` arrays
    #[arg(requires = "term")]
    snapshot: Option<PathBuf>,

    /// Term searched across all indexed fields
    term: Option<String>,

    /// Results to skip (0 with take 0 returns everything)
    #[arg(default_value_t = 0)]
    skip: usize,

    /// Results to return
    #[arg(default_value_t = 0)]
    take: usize,

    /// Core config JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Absolute directory for rolling log files
    #[arg(long)]
    log_dir: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    println!("pubquery_core ping={}", pubquery_core::ping());
    println!("pubquery_core version={}", pubquery_core::core_version());

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Cli) -> Result<(), String> {
    let config = match &args.config {
        Some(path) => load_config(path).map_err(|err| err.to_string())?,
        None => CoreConfig::default(),
    };
    if let Some(log_dir) = &args.log_dir {
        pubquery_core::init_logging_from_config(&config, log_dir)?;
    }

    let (Some(snapshot_path), Some(term)) = (&args.snapshot, &args.term) else {
        return Ok(());
    };
    let snapshot = PublishedSnapshot::load(snapshot_path).map_err(|err| err.to_string())?;

    let fields = if config.search.fallback_search_fields.is_empty() {
        let mut fields = vec![pubquery_core::search::document::NODE_NAME_FIELD.to_string()];
        for item in snapshot.content.iter() {
            for alias in item.properties.keys() {
                if !fields.contains(alias) {
                    fields.push(alias.clone());
                }
            }
        }
        fields
    } else {
        config.search.fallback_search_fields.clone()
    };

    let index = MemoryIndex::new(PROVIDER_NAME, &fields);
    index.index_all(snapshot.content.iter().map(|item| IndexDocument::from_item(item)));

    let mut registry = SearchProviderRegistry::with_settings(&config.search);
    registry
        .register(Arc::new(index))
        .map_err(|err| err.to_string())?;
    let facade = QueryFacade::from_snapshot(&snapshot, Arc::new(registry));

    let page = facade
        .search_term_paged(
            args.skip,
            args.take,
            term,
            config.search.use_wildcards,
            None,
        )
        .map_err(|err| err.to_string())?;
    info!(
        "event=cli_search module=cli status=ok total={} returned={}",
        page.total,
        page.results.len()
    );

    for result in &page.results {
        println!(
            "{} {:.3} {} {}",
            result.rank, result.score, result.item.id, result.item.name
        );
    }
    println!("total={}", page.total);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn snapshot_term_and_paging_are_positional() {
        let cli = Cli::try_parse_from(["pubquery_cli", "snap.json", "rust", "5", "10"]).unwrap();
        assert_eq!(cli.snapshot.unwrap().to_str(), Some("snap.json"));
        assert_eq!(cli.term.as_deref(), Some("rust"));
        assert_eq!((cli.skip, cli.take), (5, 10));
    }

    #[test]
    fn paging_defaults_to_unpaged() {
        let cli = Cli::try_parse_from(["pubquery_cli", "snap.json", "rust"]).unwrap();
        assert_eq!((cli.skip, cli.take), (0, 0));
        assert!(cli.config.is_none());
    }

    #[test]
    fn no_arguments_only_prints_the_version() {
        let cli = Cli::try_parse_from(["pubquery_cli"]).unwrap();
        assert!(cli.snapshot.is_none());
        assert!(cli.term.is_none());
    }

    #[test]
    fn snapshot_without_term_is_rejected() {
        assert!(Cli::try_parse_from(["pubquery_cli", "snap.json"]).is_err());
    }

    #[test]
    fn non_numeric_skip_is_rejected() {
        assert!(Cli::try_parse_from(["pubquery_cli", "snap.json", "rust", "five"]).is_err());
    }

    #[test]
    fn options_are_parsed() {
        let cli = Cli::try_parse_from([
            "pubquery_cli",
            "--config",
            "core.json",
            "--log-dir",
            "/tmp/pubquery-logs",
        ])
        .unwrap();
        assert_eq!(cli.config.unwrap().to_str(), Some("core.json"));
        assert_eq!(cli.log_dir.as_deref(), Some("/tmp/pubquery-logs"));
    }
}
