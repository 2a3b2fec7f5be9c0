//! Three-tier webpage text extraction with fallback.
//!
//! Tier 1 pulls the main article content out of a plain HTTP fetch. Tier 2
//! reuses the same HTML and takes the whole stripped body text. Tier 3
//! renders the page in a headless browser for JS-heavy sites. Tiers are
//! tried in order and the first one that clears its length threshold wins.

use std::time::Duration;

use reqwest::Client;
use scraper::{Html, Selector};
use thirtyfour::prelude::*;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const PAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(45);
const RENDER_SETTLE_TIMEOUT: Duration = Duration::from_secs(15);

/// Minimum extracted length for the article tier to count as a success.
const ARTICLE_MIN_CHARS: usize = 200;
/// Minimum stripped-body length for the static fallback tier.
const STATIC_MIN_CHARS: usize = 300;

/// Which tier produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Article,
    StaticFallback,
    DynamicFallback,
}

impl Tier {
    pub fn label(&self) -> &'static str {
        match self {
            Tier::Article => "article",
            Tier::StaticFallback => "static fallback",
            Tier::DynamicFallback => "dynamic fallback",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ScrapeOutcome {
    Success { text: String, tier: Tier },
    Failure { reason: String },
}

impl ScrapeOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ScrapeOutcome::Failure { .. })
    }

    /// Text form for tool results and prompt assembly. Fallback tiers carry
    /// a provenance tag; failures are a plain failure string since tool
    /// output can only be text.
    pub fn render(&self) -> String {
        match self {
            ScrapeOutcome::Success {
                text,
                tier: Tier::Article,
            } => text.clone(),
            ScrapeOutcome::Success { text, tier } => {
                format!("{}\n(extracted via {})", text, tier.label())
            }
            ScrapeOutcome::Failure { reason } => reason.clone(),
        }
    }
}

/// Scrape a URL, trying each tier in order. Never returns `Err`; every
/// failure mode collapses into [`ScrapeOutcome::Failure`].
pub async fn scrape_url(http: &Client, webdriver_url: Option<&str>, url: &str) -> ScrapeOutcome {
    let mut fetched_html: Option<String> = None;

    // Tier 1: plain fetch + main-content extraction.
    match http
        .get(url)
        .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
        .timeout(FETCH_TIMEOUT)
        .send()
        .await
    {
        Ok(response) if response.status().is_success() => {
            if let Ok(html) = response.text().await {
                let text = extract_article(&html);
                if text.chars().count() > ARTICLE_MIN_CHARS {
                    return ScrapeOutcome::Success {
                        text,
                        tier: Tier::Article,
                    };
                }
                fetched_html = Some(html);
            }
        }
        Ok(response) => {
            tracing::debug!("scrape fetch for {} returned {}", url, response.status());
        }
        Err(err) => {
            tracing::debug!("scrape fetch for {} failed: {}", url, err);
        }
    }

    // Tier 2: reuse the fetched HTML, take the stripped body text.
    if let Some(html) = &fetched_html {
        let text = static_fallback_text(html);
        if text.chars().count() > STATIC_MIN_CHARS {
            return ScrapeOutcome::Success {
                text,
                tier: Tier::StaticFallback,
            };
        }
    }

    // Tier 3: rendered DOM via headless browser.
    let Some(webdriver_url) = webdriver_url else {
        return ScrapeOutcome::Failure {
            reason: format!(
                "All scrape tiers failed for {}. Headless browser is not configured (WEBDRIVER_URL unset).",
                url
            ),
        };
    };

    tracing::info!("Switching to headless browser for {}", url);
    match dynamic_fetch(webdriver_url, url).await {
        Ok(text) if !text.trim().is_empty() => ScrapeOutcome::Success {
            text,
            tier: Tier::DynamicFallback,
        },
        Ok(_) => ScrapeOutcome::Failure {
            reason: format!("Failed to extract text from {}.", url),
        },
        Err(err) => ScrapeOutcome::Failure {
            reason: format!("All scrape tiers failed for {}. Dynamic tier error: {}", url, err),
        },
    }
}

/// Readability-style extraction: strip boilerplate elements, then take the
/// text of the first main-content container.
pub fn extract_article(html: &str) -> String {
    let cleaned = strip_boilerplate(html);
    let document = Html::parse_document(&cleaned);

    for selector_str in ["article", "main", "[role=\"main\"]"] {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let text = collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "));
            if !text.is_empty() {
                return text;
            }
        }
    }

    String::new()
}

/// Whole-page fallback: strip script/style/nav/footer and collapse the
/// remaining body text.
pub fn static_fallback_text(html: &str) -> String {
    let cleaned = strip_boilerplate(html);
    let document = Html::parse_document(&cleaned);

    let Ok(selector) = Selector::parse("body") else {
        return String::new();
    };
    let Some(body) = document.select(&selector).next() else {
        return String::new();
    };

    collapse_whitespace(&body.text().collect::<Vec<_>>().join(" "))
}

fn strip_boilerplate(html: &str) -> String {
    let mut result = html.to_owned();
    for tag in ["script", "style", "nav", "footer", "header", "aside", "noscript"] {
        result = strip_tag(&result, tag);
    }
    result
}

/// Remove every instance of `tag` including its content. Case-insensitive;
/// an unterminated tag drops everything to the end of its opening tag.
fn strip_tag(html: &str, tag: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let lower = html.to_lowercase();
    let open_tag = format!("<{}", tag);
    let close_tag = format!("</{}>", tag);

    let mut pos = 0;
    loop {
        let start = match lower[pos..].find(&open_tag) {
            Some(offset) => pos + offset,
            None => {
                result.push_str(&html[pos..]);
                break;
            }
        };

        // Make sure it is the target tag itself, not a longer name
        // sharing the prefix (e.g. <navigate> for <nav>).
        let after_tag = start + open_tag.len();
        if after_tag < lower.len() {
            let next_byte = lower.as_bytes()[after_tag];
            if !matches!(next_byte, b' ' | b'>' | b'/' | b'\n' | b'\r' | b'\t') {
                result.push_str(&html[pos..after_tag]);
                pos = after_tag;
                continue;
            }
        }

        result.push_str(&html[pos..start]);

        pos = match lower[start..].find(&close_tag) {
            Some(offset) => start + offset + close_tag.len(),
            None => match lower[start..].find('>') {
                Some(offset) => start + offset + 1,
                None => html.len(),
            },
        };
    }

    result
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

async fn dynamic_fetch(webdriver_url: &str, url: &str) -> anyhow::Result<String> {
    let mut caps = DesiredCapabilities::chrome();
    caps.set_headless()?;
    caps.add_arg(&format!("--user-agent={}", BROWSER_USER_AGENT))?;

    let driver = WebDriver::new(webdriver_url, caps).await?;
    let result = rendered_text(&driver, url).await;
    // The session is per-scrape; close it regardless of the outcome.
    let _ = driver.quit().await;
    result
}

async fn rendered_text(driver: &WebDriver, url: &str) -> anyhow::Result<String> {
    driver.set_page_load_timeout(PAGE_LOAD_TIMEOUT).await?;
    driver.goto(url).await?;

    // Give scripts a chance to settle; a slow page is fine, we proceed with
    // whatever has rendered once the wait times out.
    let _ = tokio::time::timeout(RENDER_SETTLE_TIMEOUT, wait_for_ready(driver)).await;

    let html = driver.source().await?;
    let text = extract_article(&html);
    if text.chars().count() > ARTICLE_MIN_CHARS {
        return Ok(text);
    }

    // Rendered DOM still has no article body; brute-force the visible text.
    let body = driver.find(By::Tag("body")).await?;
    Ok(body.text().await?)
}

async fn wait_for_ready(driver: &WebDriver) {
    loop {
        if let Ok(ret) = driver.execute("return document.readyState", Vec::new()).await {
            if ret.json().as_str() == Some("complete") {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}
