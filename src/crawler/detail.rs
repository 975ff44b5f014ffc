use std::collections::BTreeMap;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use thiserror::Error;

use crate::config::SiteUrls;
use crate::fetch::{Fetch, FetchError};
use crate::normalize::category_id_from_href;

static TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static PRICE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p.price_color").unwrap());
static AVAILABILITY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p.instock.availability").unwrap());
static RATING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p.star-rating").unwrap());
static DESCRIPTION_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div#product_description").unwrap());
static INFO_TABLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.table.table-striped").unwrap());
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static TH_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").unwrap());
static TD_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static BREADCRUMB_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("ul.breadcrumb").unwrap());
static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static THUMBNAIL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.thumbnail").unwrap());
static IMG_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());

pub const UPC_KEY: &str = "UPC";
pub const PRICE_EXCL_TAX_KEY: &str = "Price (excl. tax)";
pub const TAX_KEY: &str = "Tax";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("no <h1> title on {0}")]
    MissingTitle(String),
}

/// Everything scraped from one book page, still as raw text.
///
/// `product_info` holds the rows of the product information table keyed by
/// their header cell (`UPC`, `Price (excl. tax)`, `Tax`, ...).
#[derive(Debug, Clone, Default, Serialize)]
pub struct BookDetail {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub product_info: BTreeMap<String, String>,
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl BookDetail {
    pub fn info(&self, key: &str) -> Option<&str> {
        self.product_info.get(key).map(String::as_str)
    }

    pub fn upc(&self) -> Option<&str> {
        self.info(UPC_KEY)
    }
}

pub fn extract_detail(
    fetcher: &dyn Fetch,
    url: &str,
    site: &SiteUrls,
) -> Result<BookDetail, ExtractError> {
    let html = fetcher.fetch(url)?;
    parse_detail(&html, site).ok_or_else(|| ExtractError::MissingTitle(url.to_string()))
}

/// Parse a book page. `None` only when the page has no `<h1>`; every other
/// landmark is optional and simply left out when missing.
pub fn parse_detail(html: &str, site: &SiteUrls) -> Option<BookDetail> {
    let doc = Html::parse_document(html);

    let title = doc.select(&TITLE_SEL).next().map(text_of)?;

    let rating = doc
        .select(&RATING_SEL)
        .next()
        .and_then(|p| p.value().attr("class"))
        .and_then(|class| class.split_whitespace().nth(1))
        .map(str::to_string);

    let description = doc
        .select(&DESCRIPTION_SEL)
        .next()
        .and_then(|div| find_next(div, "p"))
        .map(text_of);

    let mut product_info = BTreeMap::new();
    if let Some(table) = doc.select(&INFO_TABLE_SEL).next() {
        for row in table.select(&ROW_SEL) {
            let key = row.select(&TH_SEL).next().map(text_of);
            let value = row.select(&TD_SEL).next().map(text_of);
            if let (Some(key), Some(value)) = (key, value) {
                product_info.insert(key, value);
            }
        }
    }

    let category_id = doc
        .select(&BREADCRUMB_SEL)
        .next()
        .and_then(|ul| ul.select(&LINK_SEL).last())
        .and_then(|a| a.value().attr("href"))
        .and_then(category_id_from_href);

    let image = doc
        .select(&THUMBNAIL_SEL)
        .next()
        .and_then(|div| div.select(&IMG_SEL).next())
        .and_then(|img| img.value().attr("src"))
        .and_then(|src| site.base.join(src).ok())
        .map(String::from);

    Some(BookDetail {
        title,
        price: first_text(&doc, &PRICE_SEL),
        availability: first_text(&doc, &AVAILABILITY_SEL),
        rating,
        description,
        product_info,
        category_id,
        image,
    })
}

fn text_of(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn first_text(doc: &Html, sel: &Selector) -> Option<String> {
    doc.select(sel).next().map(text_of)
}

/// First element named `name` after `start` in document order, looking
/// inside `start` first and then through everything that follows it.
fn find_next<'a>(start: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    let following = std::iter::once(*start)
        .chain(start.ancestors())
        .flat_map(|node| node.next_siblings())
        .flat_map(|node| node.descendants());

    start
        .descendants()
        .skip(1)
        .chain(following)
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == name)
}
