//! Discovery of ceremony pages on the awards listing

use reqwest::Url;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use crate::normalize::collapse_whitespace;
use crate::render::{LoadStrategy, RenderError, Renderer};
use crate::types::CeremonyLink;

const CARD: &str = r#"div[class="max-w-610px w-full md-xl:pt-25px md-xl:pr-20px md-xl:pl-5px relative"]"#;
const CARD_TITLE: &str = r#"div[class="mb-20px md-xl:mb-30px text-center md-xl:text-left leading-7"]"#;

/// Render the listing with every "show more" page expanded and collect the
/// ceremony links in document order
pub fn crawl(
    renderer: &dyn Renderer,
    seed_url: &str,
    show_more_xpath: &str,
) -> Result<Vec<CeremonyLink>, RenderError> {
    let page = renderer.render(seed_url, &LoadStrategy::click_expand(show_more_xpath))?;
    let links = parse_listing(&page.html, seed_url);
    info!("Found {} ceremony pages on {}", links.len(), seed_url);
    Ok(links)
}

/// Ceremony links of a rendered listing page. A title seen twice keeps its
/// first position and takes the later URL.
pub fn parse_listing(html: &str, base_url: &str) -> Vec<CeremonyLink> {
    let document = Html::parse_document(html);
    let card_sel = Selector::parse(CARD).expect("valid card selector");
    let title_sel = Selector::parse(CARD_TITLE).expect("valid card title selector");
    let link_sel = Selector::parse("a").expect("valid link selector");
    let base = Url::parse(base_url).ok();

    let mut links: Vec<CeremonyLink> = Vec::new();
    for card in document.select(&card_sel) {
        let Some(anchor) = card
            .select(&title_sel)
            .next()
            .and_then(|div| div.select(&link_sel).next())
        else {
            continue;
        };
        let Some(href) = anchor.value().attr("href") else {
            debug!("Card link without href skipped");
            continue;
        };
        let title = collapse_whitespace(&anchor.text().collect::<String>().replace("..", ""));
        let url = match resolve(base.as_ref(), href) {
            Some(url) => url,
            None => {
                warn!("Could not resolve ceremony link {:?} against {}", href, base_url);
                continue;
            }
        };

        match links.iter_mut().find(|l| l.title == title) {
            Some(existing) => existing.url = url,
            None => links.push(CeremonyLink { title, url }),
        }
    }
    links
}

fn resolve(base: Option<&Url>, href: &str) -> Option<String> {
    match base {
        Some(base) => base.join(href).ok().map(|u| u.to_string()),
        None => Url::parse(href).ok().map(|u| u.to_string()),
    }
}
