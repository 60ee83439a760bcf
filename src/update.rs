use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;

use crate::scrape::{AuctionScraper, ScrapeResult};
use crate::store::{BillRecord, BillStatus};

/// Fixed delay between scrapes, courtesy to the MAS site.
pub const REQUEST_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy)]
pub enum UpdateMode {
    /// Re-scrape every closed bill to fill or refresh its yield.
    ClosedBackfill,
    /// Scrape upcoming bills whose auction date is on or before the cutoff.
    UpcomingByCutoff(NaiveDate),
}

impl UpdateMode {
    pub fn selects(&self, record: &BillRecord) -> bool {
        match self {
            UpdateMode::ClosedBackfill => record.status == BillStatus::Closed,
            UpdateMode::UpcomingByCutoff(cutoff) => {
                record.status == BillStatus::Upcoming && record.auction_date <= *cutoff
            }
        }
    }
}

/// A scraped yield always lands together with the status transition, so a row
/// is never Closed with a blank yield.
fn apply_yield(record: &mut BillRecord, value: String, mode: &UpdateMode) {
    record.cutoff_yield = Some(value);
    if let UpdateMode::UpcomingByCutoff(_) = mode {
        record.status = BillStatus::Closed;
    }
}

#[derive(Debug, Default)]
pub struct UpdateOutcome {
    pub updated: usize,
    pub missed: usize,
}

/// Scrapes every selected row in store order, mutating records in place.
/// The caller persists the store once afterwards.
pub fn run_update(
    records: &mut [BillRecord],
    scraper: &AuctionScraper,
    mode: &UpdateMode,
) -> UpdateOutcome {
    let mut outcome = UpdateOutcome::default();

    for record in records.iter_mut().filter(|r| mode.selects(r)) {
        print!("Scraping {} ({})... ", record.issue_code, record.tenor);
        let _ = io::stdout().flush();

        match scraper.scrape_cutoff_yield(&record.issue_code, record.issue_date) {
            Ok(ScrapeResult::Found(value)) => {
                println!("{}", value);
                apply_yield(record, value, mode);
                outcome.updated += 1;
            }
            Ok(ScrapeResult::NotFound) => {
                println!("NOT FOUND");
                outcome.missed += 1;
            }
            Err(e) => {
                println!("NOT FOUND");
                eprintln!("  ERROR scraping {}: {}", record.issue_code, e);
                outcome.missed += 1;
            }
        }

        thread::sleep(REQUEST_DELAY);
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::parse_date_dmy;

    fn bill(issue_code: &str, auction_date: &str, status: BillStatus) -> BillRecord {
        BillRecord {
            issue_code: issue_code.to_owned(),
            tenor: "28-day".to_owned(),
            issue_date: parse_date_dmy(auction_date).unwrap(),
            maturity_date: parse_date_dmy(auction_date).unwrap(),
            auction_date: parse_date_dmy(auction_date).unwrap(),
            status,
            cutoff_yield: None,
        }
    }

    #[test]
    fn cutoff_filter_is_inclusive_of_the_cutoff_day() {
        let mode = UpdateMode::UpcomingByCutoff(NaiveDate::from_ymd(2026, 2, 1));

        let on_cutoff = bill("BS26105H", "01/02/2026", BillStatus::Upcoming);
        let after_cutoff = bill("BS26106J", "05/02/2026", BillStatus::Upcoming);

        assert!(mode.selects(&on_cutoff));
        assert!(!mode.selects(&after_cutoff));
    }

    #[test]
    fn cutoff_filter_skips_closed_rows() {
        let mode = UpdateMode::UpcomingByCutoff(NaiveDate::from_ymd(2026, 2, 1));
        let closed = bill("BS26104G", "01/01/2026", BillStatus::Closed);
        assert!(!mode.selects(&closed));
    }

    #[test]
    fn backfill_selects_only_closed_rows() {
        let mode = UpdateMode::ClosedBackfill;

        assert!(mode.selects(&bill("BS26104G", "01/01/2026", BillStatus::Closed)));
        assert!(!mode.selects(&bill("BS26105H", "01/02/2026", BillStatus::Upcoming)));
    }

    #[test]
    fn upcoming_mode_closes_row_only_together_with_yield() {
        let mode = UpdateMode::UpcomingByCutoff(NaiveDate::from_ymd(2026, 2, 1));
        let mut record = bill("BS26105H", "01/02/2026", BillStatus::Upcoming);

        apply_yield(&mut record, "2.75".to_owned(), &mode);

        assert_eq!(record.status, BillStatus::Closed);
        assert_eq!(record.cutoff_yield.as_deref(), Some("2.75"));
    }

    #[test]
    fn backfill_mode_leaves_status_untouched() {
        let mut record = bill("BS26104G", "01/01/2026", BillStatus::Closed);

        apply_yield(&mut record, "2.60".to_owned(), &UpdateMode::ClosedBackfill);

        assert_eq!(record.status, BillStatus::Closed);
        assert_eq!(record.cutoff_yield.as_deref(), Some("2.60"));
    }
}
