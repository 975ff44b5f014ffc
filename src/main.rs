mod config;
mod crawler;
mod db;
mod fetch;
mod normalize;
mod pipeline;

use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use config::{Config, SiteUrls, DEFAULT_BASE_URL};
use fetch::HttpFetcher;

#[derive(Parser)]
#[command(name = "books_scraper", about = "Book catalogue scraper into SQLite")]
struct Cli {
    /// Site root the listing and detail pages hang off
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the book table
    Init,
    /// Collect every book link, then scrape and store each book
    Run {
        /// Max books to scrape (default: all found)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Walk the listing and print the book URLs without storing anything
    Collect,
    /// Scrape one book page and print the extracted fields as JSON
    Inspect {
        /// Absolute URL of a book detail page
        url: String,
    },
    /// Show counts from the book table
    Stats,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => {
            let config = Config::from_env(&cli.base_url)?;
            let conn = db::connect(&config.database_url)
                .with_context(|| format!("Failed to open {}", config.database_url))?;
            db::init_schema(&conn)?;
            println!("Schema ready in {}", config.database_url);
            Ok(())
        }
        Commands::Run { limit } => {
            let config = Config::from_env(&cli.base_url)?;
            let conn = db::connect(&config.database_url)
                .with_context(|| format!("Failed to open {}", config.database_url))?;
            db::init_schema(&conn)?;
            drop(conn);

            println!("Scraping all books from {} ...", config.site.base);
            let stats = pipeline::run(&config, &HttpFetcher::new(), limit)?;
            println!("Total books found: {}", stats.found);
            println!(
                "Done: {} extracted, {} inserted, {} skipped, {} failed.",
                stats.extracted, stats.inserted, stats.skipped, stats.failed
            );
            Ok(())
        }
        Commands::Collect => {
            let site = SiteUrls::new(&cli.base_url)?;
            let links = crawler::collect_links(&HttpFetcher::new(), &site);
            for link in &links {
                println!("{}", link);
            }
            println!("\n{} book links", links.len());
            Ok(())
        }
        Commands::Inspect { url } => {
            let site = SiteUrls::new(&cli.base_url)?;
            let book = crawler::detail::extract_detail(&HttpFetcher::new(), &url, &site)?;
            println!("{}", serde_json::to_string_pretty(&book)?);
            Ok(())
        }
        Commands::Stats => {
            let config = Config::from_env(&cli.base_url)?;
            let conn = db::connect(&config.database_url)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Books:            {}", s.total);
            println!("In stock:         {}", s.in_stock);
            println!("With description: {}", s.with_description);
            println!("No category:      {}", s.without_category);
            println!("Categories:       {}", s.categories);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }

    #[test]
    fn cli_parses_run_limit() {
        let cli = Cli::try_parse_from(["books_scraper", "run", "-n", "5"]).unwrap();
        assert_eq!(cli.base_url, DEFAULT_BASE_URL);
        assert!(matches!(cli.command, Commands::Run { limit: Some(5) }));
    }

    #[test]
    fn cli_parses_inspect() {
        let cli = Cli::try_parse_from([
            "books_scraper",
            "--base-url",
            "http://localhost:8000/",
            "inspect",
            "http://localhost:8000/catalogue/x_1/index.html",
        ])
        .unwrap();
        assert_eq!(cli.base_url, "http://localhost:8000/");
        assert!(matches!(cli.command, Commands::Inspect { .. }));
    }
}
