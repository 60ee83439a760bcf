use std::process;

use chrono::NaiveDate;
use clap::{App, Arg};

use mas_bills::roam::{self, PostOutcome, RoamSession};
use mas_bills::store;

fn command_usage<'a, 'b>() -> App<'a, 'b> {
    App::new("post-results")
        .about("Posts MAS Bill auction results to Roam Research daily pages")
        .arg(
            Arg::with_name("date")
                .long("date")
                .takes_value(true)
                .conflicts_with_all(&["from", "to"])
                .help("Single date in yyyy-mm-dd format"),
        )
        .arg(
            Arg::with_name("from")
                .long("from")
                .takes_value(true)
                .requires("to")
                .help("Start date in yyyy-mm-dd format"),
        )
        .arg(
            Arg::with_name("to")
                .long("to")
                .takes_value(true)
                .requires("from")
                .help("End date in yyyy-mm-dd format"),
        )
        .arg(
            Arg::with_name("inventory")
                .long("inventory")
                .takes_value(true)
                .default_value(store::INVENTORY_PATH)
                .help("Location of the bill inventory CSV"),
        )
        .arg(
            Arg::with_name("credentials")
                .long("credentials")
                .takes_value(true)
                .default_value(roam::CREDENTIALS_PATH)
                .help("Location of the Roam Research credentials file"),
        )
}

fn parse_ymd(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .unwrap_or_else(|e| panic!("Invalid date specified: '{}': {}", raw, e))
}

fn main() {
    let matches = command_usage().get_matches();

    let (start, end) = match (
        matches.value_of("date"),
        matches.value_of("from"),
        matches.value_of("to"),
    ) {
        (Some(date), None, None) => {
            let date = parse_ymd(date);
            (date, date)
        }
        (None, Some(from), Some(to)) => (parse_ymd(from), parse_ymd(to)),
        _ => {
            eprintln!("Provide either --date or both --from and --to.");
            process::exit(2);
        }
    };

    let credentials = roam::load_credentials(matches.value_of("credentials").unwrap())
        .expect("Failed to load Roam credentials");
    let session = RoamSession::new(credentials);

    let records =
        store::load_inventory(matches.value_of("inventory").unwrap()).expect("Failed to load bill inventory");

    match roam::post_auction_results(&session, &records, start, end) {
        Ok(PostOutcome::NothingToPost) => {}
        Ok(PostOutcome::Posted(posted)) => println!("\nDone. Posted {} bill(s).", posted),
        Err(e) => {
            eprintln!("Failed to post auction results: {}", e);
            process::exit(1);
        }
    }
}
