use std::ffi::OsStr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions, Tab};
use regex::Regex;

/// Flat wait after navigation for client-side rendering. The results section
/// is injected after load and exposes no readiness signal worth polling.
pub const RENDER_WAIT: Duration = Duration::from_secs(5);

const AUCTION_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/144.0.0.0 Safari/537.36";

const WEBDRIVER_SPOOF: &str =
    r#"Object.defineProperty(navigator, "webdriver", {get: () => undefined})"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeResult {
    Found(String),
    NotFound,
}

/// Headless Chrome wrapper for the MAS auction results page. One browser and
/// tab pair is reused across calls; dropping the scraper shuts the browser down.
pub struct AuctionScraper {
    _browser: Browser, // kept alive for the tab; dropping it closes Chrome
    tab: Arc<Tab>,
}

impl AuctionScraper {
    pub fn new() -> Result<AuctionScraper, String> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .args(vec![
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-blink-features=AutomationControlled"),
            ])
            .build()
            .map_err(|e| format!("Failed to configure browser launch: {}", e))?;

        let browser =
            Browser::new(options).map_err(|e| format!("Failed to launch browser: {}", e))?;
        let tab = browser
            .new_tab()
            .map_err(|e| format!("Failed to open browser tab: {}", e))?;

        tab.set_user_agent(AUCTION_USER_AGENT, None, None)
            .map_err(|e| format!("Failed to set user agent: {}", e))?;

        // The results page hides auction data from automated browsers.
        tab.call_method(Page::AddScriptToEvaluateOnNewDocument {
            source: WEBDRIVER_SPOOF.to_owned(),
            world_name: None,
            include_command_line_api: None,
            run_immediately: None,
        })
        .map_err(|e| format!("Failed to register webdriver spoof: {}", e))?;

        Ok(AuctionScraper { _browser: browser, tab })
    }

    /// Scrapes the Cut-off Yield for a single bill. Driver and transport
    /// failures surface as `Err`; a page that renders without the expected
    /// content is `Ok(NotFound)`.
    pub fn scrape_cutoff_yield(
        &self,
        issue_code: &str,
        issue_date: NaiveDate,
    ) -> Result<ScrapeResult, String> {
        let url = format!(
            "https://www.mas.gov.sg/bonds-and-bills/auctions-and-issuance-calendar/auction-mas-bill?issue_code={issue_code}&issue_date={issue_date}",
            issue_code = issue_code,
            issue_date = issue_date.format("%Y-%m-%d")
        );

        self.tab
            .navigate_to(&url)
            .map_err(|e| format!("Failed to load {}: {}", url, e))?;
        thread::sleep(RENDER_WAIT);

        // Primary: the auction results render as <dt>Cut-off Yield</dt><dd>..</dd>
        // pairs, often inside a collapsed section that visible text misses.
        let source = self
            .tab
            .get_content()
            .map_err(|e| format!("Failed to read page source for {}: {}", issue_code, e))?;
        if let Some(value) = extract_from_markup(&source) {
            return Ok(ScrapeResult::Found(value));
        }

        let body_text = self
            .tab
            .find_element("body")
            .and_then(|body| body.get_inner_text())
            .map_err(|e| format!("Failed to read page text for {}: {}", issue_code, e))?;
        if let Some(value) = extract_from_visible_text(&body_text) {
            return Ok(ScrapeResult::Found(value));
        }

        println!("  WARNING: Could not find Cut-off Yield on page for {}", issue_code);
        println!("  URL: {}", url);
        Ok(ScrapeResult::NotFound)
    }
}

/// Scans raw page markup for the Cut-off Yield definition pair, stripping any
/// markup embedded in the value.
pub fn extract_from_markup(source: &str) -> Option<String> {
    lazy_static! {
        static ref RE_CUTOFF_PAIR: Regex =
            Regex::new(r"(?is)<dt>\s*Cut-off Yield\s*</dt>\s*<dd>\s*(.*?)\s*</dd>").unwrap();
        static ref RE_MARKUP_TAG: Regex = Regex::new(r"<[^>]+>").unwrap();
    }

    let captures = RE_CUTOFF_PAIR.captures(source)?;
    let value = RE_MARKUP_TAG.replace_all(captures.get(1)?.as_str(), "");
    let value = value.trim();

    if value.is_empty() {
        None
    } else {
        Some(value.to_owned())
    }
}

/// Fallback over the rendered visible text: find a line mentioning the
/// cut-off yield, prefer the first numeric-looking token on it, otherwise
/// take the next non-blank line verbatim.
pub fn extract_from_visible_text(body_text: &str) -> Option<String> {
    let lines: Vec<&str> = body_text.split('\n').collect();

    for (number, line) in lines.iter().enumerate() {
        if !line.to_lowercase().contains("cut-off yield") {
            continue;
        }

        for part in line.split_whitespace() {
            let cleaned = part.replace('%', "").replace(',', "");
            if cleaned.parse::<f64>().is_ok() {
                return Some(part.to_owned());
            }
        }

        if let Some(next_line) = lines.get(number + 1) {
            let next_line = next_line.trim();
            if !next_line.is_empty() {
                return Some(next_line.to_owned());
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markup_extraction_takes_dt_dd_pair() {
        let source = "<dl><dt>Cut-off Yield</dt><dd> 2.80% </dd></dl>";
        assert_eq!(extract_from_markup(source), Some("2.80%".to_owned()));
    }

    #[test]
    fn markup_extraction_strips_embedded_tags() {
        let source = "<dt>Cut-off Yield</dt>\n<dd><span class=\"value\">2.80%</span></dd>";
        assert_eq!(extract_from_markup(source), Some("2.80%".to_owned()));
    }

    #[test]
    fn markup_extraction_is_case_insensitive() {
        let source = "<dt>CUT-OFF YIELD</dt><dd>2.80%</dd>";
        assert_eq!(extract_from_markup(source), Some("2.80%".to_owned()));
    }

    #[test]
    fn markup_extraction_rejects_blank_value() {
        let source = "<dt>Cut-off Yield</dt><dd> <span></span> </dd>";
        assert_eq!(extract_from_markup(source), None);
    }

    #[test]
    fn markup_extraction_misses_unrelated_pairs() {
        let source = "<dt>Total Applied</dt><dd>S$12.3 billion</dd>";
        assert_eq!(extract_from_markup(source), None);
    }

    #[test]
    fn visible_text_takes_numeric_token_from_line() {
        let body = "Auction Results\nCut-off Yield  2.80%\nTotal Applied";
        assert_eq!(extract_from_visible_text(body), Some("2.80%".to_owned()));
    }

    #[test]
    fn visible_text_ignores_commas_when_testing_tokens() {
        let body = "cut-off yield was 1,234 points";
        assert_eq!(extract_from_visible_text(body), Some("1,234".to_owned()));
    }

    #[test]
    fn visible_text_falls_back_to_next_line() {
        let body = "Cut-off Yield\n2.80%\n";
        assert_eq!(extract_from_visible_text(body), Some("2.80%".to_owned()));
    }

    #[test]
    fn visible_text_skips_line_with_blank_follower() {
        let body = "Cut-off Yield\n\nCut-off Yield\n3.10%";
        assert_eq!(extract_from_visible_text(body), Some("3.10%".to_owned()));
    }

    #[test]
    fn visible_text_misses_when_absent() {
        let body = "Auction Results\nTotal Applied\nS$12.3 billion";
        assert_eq!(extract_from_visible_text(body), None);
    }
}
