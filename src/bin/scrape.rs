use chrono::NaiveDate;
use clap::{App, Arg};

use mas_bills::scrape::AuctionScraper;
use mas_bills::store;
use mas_bills::update::{run_update, UpdateMode};

fn command_usage<'a, 'b>() -> App<'a, 'b> {
    App::new("scrape")
        .about("Scrapes Cut-off Yield results for MAS Bills from the auction results pages")
        .arg(
            Arg::with_name("cutoff-date")
                .takes_value(true)
                .help("Cutoff date in yyyy-mm-dd format. Upcoming bills with Auction Date on or before this date are scraped; omit to re-scrape all closed bills.")
        )
        .arg(
            Arg::with_name("inventory")
                .long("inventory")
                .takes_value(true)
                .default_value(store::INVENTORY_PATH)
                .help("Location of the bill inventory CSV")
        )
}

fn main() {
    let matches = command_usage().get_matches();
    let inventory_path = matches.value_of("inventory").unwrap();

    let mode = match matches.value_of("cutoff-date") {
        Some(raw) => {
            let cutoff = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .unwrap_or_else(|e| panic!("Invalid cutoff date specified: '{}': {}", raw, e));
            UpdateMode::UpcomingByCutoff(cutoff)
        }
        None => UpdateMode::ClosedBackfill,
    };

    let mut records = store::load_inventory(inventory_path).expect("Failed to load bill inventory");

    let target_count = records.iter().filter(|r| mode.selects(r)).count();
    match mode {
        UpdateMode::ClosedBackfill => {
            println!("Found {} closed bills to scrape.\n", target_count);
        }
        UpdateMode::UpcomingByCutoff(cutoff) => {
            if target_count == 0 {
                println!(
                    "No upcoming bills with Auction Date on or before {}.",
                    cutoff.format("%Y-%m-%d")
                );
                return;
            }
            println!("Found {} upcoming bill(s) to scrape.\n", target_count);
        }
    }

    let scraper = AuctionScraper::new().expect("Failed to launch headless browser");
    let outcome = run_update(&mut records, &scraper, &mode);

    store::save_inventory(inventory_path, &records).expect("Failed to save bill inventory");
    println!(
        "\nDone. Updated {} bill(s), {} not found. CSV updated at {}",
        outcome.updated, outcome.missed, inventory_path
    );
}
