//! Taobao listing pages
//!
//! Search results are HTML with 44 listings per page, paged by item offset
//! (`s = (page - 1) * 44`) and sorted by sales.

use crate::platform::crawler::{search_endpoint, CrawlerContext, PlatformCrawler};
use crate::platform::items::{HtmlItemSource, ItemSource, RawItem};
use crate::record::{FieldValue, Record, DATE_FORMAT};
use crate::ParseError;
use async_trait::async_trait;
use chrono::Local;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Listing containers, tried in order
pub const ITEM_SELECTORS: &[&str] = &[
    r#"div[data-category="auctions"]"#,
    ".item",
    ".ctx-box",
    "[data-auction]",
];

/// Listings per result page
pub const ITEMS_PER_PAGE: u32 = 44;

struct ListingSelectors {
    title: Selector,
    price: Selector,
    sales: Selector,
    shop: Selector,
    location: Selector,
}

impl ListingSelectors {
    fn new() -> Result<Self, ParseError> {
        let parse = |s: &str| {
            Selector::parse(s).map_err(|e| ParseError::Selector(format!("{}: {:?}", s, e)))
        };
        Ok(Self {
            title: parse("a.title")?,
            price: parse("span.price")?,
            sales: parse("span.deal-cnt")?,
            shop: parse("a.shopname")?,
            location: parse("span.location")?,
        })
    }
}

pub struct TaobaoCrawler {
    context: CrawlerContext,
    items: HtmlItemSource,
    selectors: ListingSelectors,
}

impl TaobaoCrawler {
    pub fn new(context: CrawlerContext) -> Result<Self, ParseError> {
        Ok(Self {
            context,
            items: HtmlItemSource::new(ITEM_SELECTORS)?,
            selectors: ListingSelectors::new()?,
        })
    }

    /// Absolute listing URL; protocol-relative and relative links resolve
    /// against the search host over https
    fn listing_url(&self, href: &str) -> Option<String> {
        let base = Url::parse(&self.context.config.base_url).ok()?;
        let mut url = base.join(href.trim()).ok()?;
        if url.scheme() == "http" {
            url.set_scheme("https").ok()?;
        }
        Some(url.to_string())
    }
}

#[async_trait]
impl PlatformCrawler for TaobaoCrawler {
    fn context(&self) -> &CrawlerContext {
        &self.context
    }

    fn item_source(&self) -> &dyn ItemSource {
        &self.items
    }

    fn build_search_url(&self, keyword: &str, page: u32) -> crate::Result<Url> {
        let mut url = search_endpoint(&self.context.config)?;
        let offset = page.saturating_sub(1) * ITEMS_PER_PAGE;
        url.query_pairs_mut()
            .append_pair("q", keyword)
            .append_pair("s", &offset.to_string())
            .append_pair("sort", "sale-desc");
        Ok(url)
    }

    fn parse_item(&self, item: &RawItem) -> Result<Record, ParseError> {
        let RawItem::Html(html) = item else {
            return Err(ParseError::UnexpectedShape(
                "expected an HTML listing element".to_string(),
            ));
        };

        let fragment = Html::parse_fragment(html);
        let root = fragment.root_element();
        let text_of = |selector: &Selector| {
            root.select(selector)
                .next()
                .map(element_text)
                .filter(|t| !t.is_empty())
        };

        let title = text_of(&self.selectors.title).ok_or(ParseError::MissingField("title"))?;
        let category = self.classify(&title, "");

        let mut record = Record::new(self.display_name(), title.clone(), title);
        record.price = text_of(&self.selectors.price).map(FieldValue::Text);
        record.sales = text_of(&self.selectors.sales).map(FieldValue::Text);
        record.shop_name = text_of(&self.selectors.shop);
        record.location = text_of(&self.selectors.location);
        record.source_url = root
            .select(&self.selectors.title)
            .next()
            .and_then(|a| a.value().attr("href"))
            .filter(|href| !href.trim().is_empty())
            .and_then(|href| self.listing_url(href));
        record.publish_date = Some(Local::now().format(DATE_FORMAT).to_string());
        record.tags.insert(category.clone());
        record.product_type = Some(category);

        Ok(record)
    }
}

/// Element text with each text node trimmed and joined without separators
fn element_text(element: ElementRef<'_>) -> String {
    element.text().map(str::trim).collect()
}
