use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::crawler::{collect_links, detail::extract_detail};
use crate::db;
use crate::fetch::Fetch;

/// Counters returned after a run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub found: usize,
    pub extracted: usize,
    pub inserted: usize,
    /// Detail pages that could not be fetched or had no title.
    pub skipped: usize,
    /// Extracted books the database refused.
    pub failed: usize,
}

/// Collect every book link, then extract and store each book in turn.
///
/// Nothing in here aborts the run: a bad page or a rejected row is logged
/// and counted, and the loop moves on.
pub fn run(config: &Config, fetcher: &dyn Fetch, limit: Option<usize>) -> anyhow::Result<RunStats> {
    info!("Collecting book links from {}", config.site.start);
    let mut links = collect_links(fetcher, &config.site);
    let mut stats = RunStats {
        found: links.len(),
        ..Default::default()
    };
    info!("Found {} book links", stats.found);

    if let Some(n) = limit {
        links.truncate(n);
    }

    let pb = ProgressBar::new(links.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    for url in &links {
        debug!("Scraping {}", url);
        match extract_detail(fetcher, url, &config.site) {
            Ok(book) => {
                stats.extracted += 1;
                match db::insert_book(&config.database_url, &book) {
                    Ok(()) => {
                        stats.inserted += 1;
                        debug!("Inserted book: {}", book.title);
                    }
                    Err(e) => {
                        stats.failed += 1;
                        warn!("Could not insert {:?} ({}): {}", book.title, url, e);
                    }
                }
            }
            Err(e) => {
                stats.skipped += 1;
                warn!("Skipping {}: {}", url, e);
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!(
        "Run finished: {} found, {} extracted, {} inserted, {} skipped, {} failed",
        stats.found, stats.extracted, stats.inserted, stats.skipped, stats.failed
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_BASE_URL;
    use crate::db::tests::temp_db;
    use crate::fetch::testing::StaticSite;

    const INDEX: &str = "https://books.toscrape.com/index.html";
    const PAGE_2: &str = "https://books.toscrape.com/catalogue/page-2.html";

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    fn detail_page(upc: &str, title: &str) -> String {
        format!(
            r#"<html><body><article class="product_page">
              <h1>{title}</h1>
              <p class="price_color">£10.00</p>
              <p class="instock availability">In stock (3 available)</p>
              <table class="table table-striped">
                <tr><th>UPC</th><td>{upc}</td></tr>
                <tr><th>Price (excl. tax)</th><td>£10.00</td></tr>
                <tr><th>Tax</th><td>£0.00</td></tr>
              </table>
            </article></body></html>"#
        )
    }

    /// Index page (3 books) → page 2 (2 books, served from the last-page
    /// fixture). One of the five detail pages answers 500.
    fn small_site() -> StaticSite {
        StaticSite::new()
            .page(INDEX, fixture("index"))
            .page(PAGE_2, fixture("page-50"))
            .page(
                "https://books.toscrape.com/catalogue/a-light-in-the-attic_1000/index.html",
                fixture("detail"),
            )
            .page(
                "https://books.toscrape.com/catalogue/tipping-the-velvet_999/index.html",
                detail_page("90fa61229261140a", "Tipping the Velvet"),
            )
            .status(
                "https://books.toscrape.com/catalogue/soumission_998/index.html",
                500,
            )
            .page(
                "https://books.toscrape.com/catalogue/its-only-the-himalayas_981/index.html",
                detail_page("a22124811bfa8350", "It's Only the Himalayas"),
            )
            .page(
                "https://books.toscrape.com/catalogue/1000-places-to-see-before-you-die_1/index.html",
                detail_page("228ba5e7577e1d49", "1,000 Places to See Before You Die"),
            )
    }

    #[test]
    fn end_to_end() {
        let (_dir, url) = temp_db();
        let config = Config::new(Some(url.clone()), DEFAULT_BASE_URL).unwrap();
        let site = small_site();

        let stats = run(&config, &site, None).unwrap();
        assert_eq!(
            stats,
            RunStats {
                found: 5,
                extracted: 4,
                inserted: 4,
                skipped: 1,
                failed: 0,
            }
        );

        let conn = db::connect(&url).unwrap();
        assert_eq!(db::get_stats(&conn).unwrap().total, 4);
    }

    #[test]
    fn limit_caps_detail_fetches() {
        let (_dir, url) = temp_db();
        let config = Config::new(Some(url), DEFAULT_BASE_URL).unwrap();
        let site = small_site();

        let stats = run(&config, &site, Some(2)).unwrap();
        assert_eq!(stats.found, 5);
        assert_eq!(stats.extracted, 2);
        assert_eq!(stats.inserted, 2);
        // two listing pages + two detail pages
        assert_eq!(site.requests().len(), 4);
    }

    #[test]
    fn second_run_fails_every_insert_on_upc() {
        let (_dir, url) = temp_db();
        let config = Config::new(Some(url.clone()), DEFAULT_BASE_URL).unwrap();

        let first = run(&config, &small_site(), None).unwrap();
        assert_eq!(first.inserted, 4);

        let second = run(&config, &small_site(), None).unwrap();
        assert_eq!(second.extracted, 4);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.failed, 4);

        let conn = db::connect(&url).unwrap();
        assert_eq!(db::get_stats(&conn).unwrap().total, 4);
    }

    #[test]
    fn unreachable_listing_stores_nothing() {
        let (_dir, url) = temp_db();
        let config = Config::new(Some(url), DEFAULT_BASE_URL).unwrap();
        let site = StaticSite::new().status(INDEX, 404);

        let stats = run(&config, &site, None).unwrap();
        assert_eq!(stats, RunStats::default());
    }
}
