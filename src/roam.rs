use std::collections::BTreeMap;
use std::fs;

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::store::{format_date_dmy, BillRecord};

pub const CREDENTIALS_PATH: &str = "Roam_Research";

const API_ROOT: &str = "https://api.roamresearch.com/api/graph";
const CONNECT_TIMEOUT: u64 = 30000;
const RECEIVE_TIMEOUT: u64 = 30000;
const MAX_REDIRECTS: usize = 5;

pub const SUMMARY_BLOCK: &str = "> [!Summary]+ **MAS Bills Auction Results**";

#[derive(Debug)]
pub struct RoamCredentials {
    pub token: String,
    pub graph: String,
}

/// Parses the key=value credentials file: `#` comments and blank lines are
/// skipped, surrounding quotes on values are dropped.
pub fn parse_credentials(raw: &str) -> Result<RoamCredentials, String> {
    let mut token = None;
    let mut graph = None;

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (key, value) = match line.find('=') {
            Some(position) => (line[..position].trim(), line[position + 1..].trim()),
            None => continue,
        };
        let value = value.trim_matches(|c| c == '\'' || c == '"').to_owned();

        match key {
            "ROAM_API_TOKEN" => token = Some(value),
            "ROAM_GRAPH_NAME" => graph = Some(value),
            _ => {}
        }
    }

    match (token, graph) {
        (Some(token), Some(graph)) => Ok(RoamCredentials { token, graph }),
        (None, _) => Err("Credentials file is missing ROAM_API_TOKEN".to_owned()),
        (_, None) => Err("Credentials file is missing ROAM_GRAPH_NAME".to_owned()),
    }
}

pub fn load_credentials(path: &str) -> Result<RoamCredentials, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read credentials from {}: {}", path, e))?;
    parse_credentials(&raw)
}

/// Authenticated Roam API session. Redirects are handled by hand so the
/// bearer header is re-attached on every hop; the API redirects cross-host
/// and a client following blindly would drop the credential.
pub struct RoamSession {
    token: String,
    graph: String,
}

impl RoamSession {
    pub fn new(credentials: RoamCredentials) -> RoamSession {
        RoamSession {
            token: credentials.token,
            graph: credentials.graph,
        }
    }

    fn query_url(&self) -> String {
        format!("{}/{}/q", API_ROOT, self.graph)
    }

    fn write_url(&self) -> String {
        format!("{}/{}/write", API_ROOT, self.graph)
    }

    fn post_json(&self, url: &str, payload: serde_json::Value) -> Result<ureq::Response, String> {
        let mut url = url.to_owned();

        for _ in 0..=MAX_REDIRECTS {
            let response = ureq::post(&url)
                .set("Authorization", &format!("Bearer {}", self.token))
                .set("Content-Type", "application/json")
                .timeout_connect(CONNECT_TIMEOUT)
                .timeout_read(RECEIVE_TIMEOUT)
                .redirects(0)
                .send_json(payload.clone());

            if let Some(error) = response.synthetic_error() {
                return Err(format!("Failed to reach journal API at {}. Error: {}", url, error));
            }

            let status = response.status();
            if status == 301 || status == 302 || status == 307 || status == 308 {
                match response.header("location") {
                    Some(next) => {
                        url = resolve_location(&url, next);
                        continue;
                    }
                    None => {
                        return Err(format!("Redirect from {} carried no Location header", url));
                    }
                }
            }

            if !response.ok() {
                return Err(format!("Journal API returned HTTP {} for {}", status, url));
            }

            return Ok(response);
        }

        Err(format!("Too many redirects while posting to {}", url))
    }
}

/// Resolves a Location header against the current request URL. Absolute
/// targets win outright; path-only targets keep the current origin.
fn resolve_location(current: &str, location: &str) -> String {
    if location.starts_with("http://") || location.starts_with("https://") {
        return location.to_owned();
    }

    let origin_end = current
        .find("://")
        .and_then(|scheme| current[scheme + 3..].find('/').map(|host| scheme + 3 + host))
        .unwrap_or_else(|| current.len());

    format!("{}{}", &current[..origin_end], location)
}

pub fn ordinal(n: u32) -> String {
    let suffix = if (11..=13).contains(&(n % 100)) {
        "th"
    } else {
        match n % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        }
    };

    format!("{}{}", n, suffix)
}

/// Roam's daily page title, e.g. "February 14th, 2026".
pub fn roam_daily_title(date: NaiveDate) -> String {
    format!("{} {}, {}", date.format("%B"), ordinal(date.day()), date.year())
}

pub fn block_text(record: &BillRecord) -> String {
    format!(
        "{} | {} | {} | {}",
        record.tenor,
        format_date_dmy(record.maturity_date),
        record.issue_code,
        record.cutoff_yield.clone().unwrap_or_default()
    )
}

#[derive(Deserialize, Debug)]
struct QueryResponse {
    #[serde(default)]
    result: Option<String>,
}

fn query_page_uid(session: &RoamSession, title: &str) -> Result<Option<String>, String> {
    let query = format!(
        r#"[:find ?uid . :where [?e :node/title "{}"] [?e :block/uid ?uid]]"#,
        title
    );
    let response = session.post_json(&session.query_url(), json!({ "query": query }))?;

    let parsed = response
        .into_json_deserialize::<QueryResponse>()
        .map_err(|_| format!("Journal query response for page '{}' is not valid JSON", title))?;

    Ok(parsed.result)
}

/// Resolves a page uid by title, creating the page on a miss. Creation costs
/// two extra round trips: the write call returns no uid, so we query again.
pub fn find_or_create_page_uid(
    session: &RoamSession,
    title: &str,
) -> Result<Option<String>, String> {
    if let Some(uid) = query_page_uid(session, title)? {
        return Ok(Some(uid));
    }

    session.post_json(
        &session.write_url(),
        json!({ "action": "create-page", "page": { "title": title } }),
    )?;

    query_page_uid(session, title)
}

pub fn create_block(
    session: &RoamSession,
    parent_uid: &str,
    text: &str,
    block_uid: Option<&str>,
) -> Result<(), String> {
    let mut block = json!({ "string": text });
    if let Some(uid) = block_uid {
        block["uid"] = json!(uid);
    }

    session.post_json(
        &session.write_url(),
        json!({
            "action": "create-block",
            "location": { "parent-uid": parent_uid, "order": "last" },
            "block": block,
        }),
    )?;

    Ok(())
}

/// Rows worth posting: auction date within [start, end], yield present.
pub fn select_postable<'a>(
    records: &'a [BillRecord],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<&'a BillRecord> {
    records
        .iter()
        .filter(|r| r.auction_date >= start && r.auction_date <= end)
        .filter(|r| r.cutoff_yield.is_some())
        .collect()
}

/// Groups by auction date; the map iterates dates ascending and each group
/// keeps store row order.
pub fn group_by_auction_date<'a>(
    records: &[&'a BillRecord],
) -> BTreeMap<NaiveDate, Vec<&'a BillRecord>> {
    let mut groups = BTreeMap::new();

    for record in records {
        groups
            .entry(record.auction_date)
            .or_insert_with(Vec::new)
            .push(*record);
    }

    groups
}

fn new_block_uid() -> String {
    Uuid::new_v4().to_string().chars().take(9).collect()
}

#[derive(Debug, PartialEq, Eq)]
pub enum PostOutcome {
    /// No rows with a yield fell in the range; no network call was made.
    NothingToPost,
    /// The selection was non-empty; carries the number of child blocks
    /// created, which can be zero if every page resolution was skipped.
    Posted(usize),
}

/// Posts every bill with a result in the date range to its daily page, one
/// summary parent block per auction date, one child block per bill. A page
/// that cannot be resolved skips its group; transport failures abort the run.
pub fn post_auction_results(
    session: &RoamSession,
    records: &[BillRecord],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PostOutcome, String> {
    let selected = select_postable(records, start, end);
    if selected.is_empty() {
        println!("No bills with Cut-off Yield found for the specified date(s).");
        return Ok(PostOutcome::NothingToPost);
    }

    let mut posted = 0;

    for (auction_date, group) in group_by_auction_date(&selected) {
        let page_title = roam_daily_title(auction_date);
        println!("\nPosting to '{}'...", page_title);

        let page_uid = match find_or_create_page_uid(session, &page_title)? {
            Some(uid) => uid,
            None => {
                eprintln!("  ERROR: Could not get uid for page '{}'. Skipping.", page_title);
                continue;
            }
        };

        let parent_uid = new_block_uid();
        create_block(session, &page_uid, SUMMARY_BLOCK, Some(&parent_uid))?;

        for record in group {
            let text = block_text(record);
            create_block(session, &parent_uid, &text, None)?;
            println!("  {}", text);
            posted += 1;
        }
    }

    Ok(PostOutcome::Posted(posted))
}
