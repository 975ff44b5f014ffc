use std::sync::LazyLock;

use scraper::{Html, Selector};

static ITEM_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article.product_pod").unwrap());
static ITEM_LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.image_container a").unwrap());
static NEXT_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li.next a").unwrap());

/// One listing page, with hrefs exactly as they appear in the markup.
#[derive(Debug, Default, PartialEq)]
pub struct ListingPage {
    pub item_links: Vec<String>,
    pub next: Option<String>,
}

pub fn parse_listing(html: &str) -> ListingPage {
    let doc = Html::parse_document(html);

    let item_links = doc
        .select(&ITEM_SEL)
        .filter_map(|item| {
            item.select(&ITEM_LINK_SEL)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string)
        })
        .collect();

    let next = doc
        .select(&NEXT_SEL)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string);

    ListingPage { item_links, next }
}
