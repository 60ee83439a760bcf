use clap::{App, Arg};

use mas_bills::export;
use mas_bills::store;

fn command_usage<'a, 'b>() -> App<'a, 'b> {
    App::new("export-xlsx")
        .about("Exports the MAS Bill inventory CSV to an XLSX workbook")
        .arg(
            Arg::with_name("inventory")
                .long("inventory")
                .takes_value(true)
                .default_value(store::INVENTORY_PATH)
                .help("Location of the bill inventory CSV"),
        )
        .arg(
            Arg::with_name("workbook")
                .long("workbook")
                .takes_value(true)
                .default_value(export::WORKBOOK_PATH)
                .help("Location to write the XLSX workbook"),
        )
}

fn main() {
    let matches = command_usage().get_matches();
    let workbook_path = matches.value_of("workbook").unwrap();

    let records = store::load_inventory(matches.value_of("inventory").unwrap())
        .expect("Failed to load bill inventory");
    let exported =
        export::export_workbook(&records, workbook_path).expect("Failed to export workbook");

    println!("Exported {} rows to {}", exported, workbook_path);
}
