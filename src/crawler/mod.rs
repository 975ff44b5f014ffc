pub mod detail;
pub mod listing;

use tracing::{debug, info, warn};
use url::Url;

use crate::config::SiteUrls;
use crate::fetch::Fetch;
use listing::parse_listing;

/// Walks the paginated listing one page per `next()`, yielding the absolute
/// detail-page URLs found on that page.
///
/// The walk ends when a page has no "next" link, or as soon as a page cannot
/// be fetched; pages already yielded stay valid. There is no cycle
/// detection: a server whose "next" link leads back to an already visited
/// page keeps the walk going forever.
pub struct ListingWalk<'a> {
    fetcher: &'a dyn Fetch,
    site: &'a SiteUrls,
    cursor: Option<Url>,
    pages: usize,
}

impl<'a> ListingWalk<'a> {
    pub fn new(fetcher: &'a dyn Fetch, site: &'a SiteUrls) -> Self {
        ListingWalk {
            fetcher,
            site,
            cursor: Some(site.start.clone()),
            pages: 0,
        }
    }

    pub fn pages_visited(&self) -> usize {
        self.pages
    }

    /// Links on the start page are relative to the site root; everywhere
    /// else they are relative to the catalogue directory.
    fn base_for(&self, page: &Url) -> &'a Url {
        if *page == self.site.start {
            &self.site.base
        } else {
            &self.site.catalogue
        }
    }
}

impl Iterator for ListingWalk<'_> {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.cursor.take()?;

        let html = match self.fetcher.fetch(current.as_str()) {
            Ok(html) => html,
            Err(e) => {
                warn!("Listing walk stopped at {}: {}", current, e);
                return None;
            }
        };
        self.pages += 1;

        let page = parse_listing(&html);
        let base = self.base_for(&current);

        let links: Vec<String> = page
            .item_links
            .iter()
            .filter_map(|href| match base.join(href) {
                Ok(url) => Some(String::from(url)),
                Err(e) => {
                    warn!("Skipping item link {:?} on {}: {}", href, current, e);
                    None
                }
            })
            .collect();

        self.cursor = page.next.as_deref().and_then(|href| match base.join(href) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Unresolvable next link {:?} on {}: {}", href, current, e);
                None
            }
        });

        debug!(
            "Listing page {} ({}): {} items, next = {:?}",
            self.pages,
            current,
            links.len(),
            self.cursor.as_ref().map(Url::as_str)
        );
        Some(links)
    }
}

/// Every detail-page URL across the whole listing, in page order.
pub fn collect_links(fetcher: &dyn Fetch, site: &SiteUrls) -> Vec<String> {
    let mut walk = ListingWalk::new(fetcher, site);
    let links: Vec<String> = walk.by_ref().flatten().collect();
    info!("Walked {} listing pages", walk.pages_visited());
    links
}
