use std::fs;

use chrono::NaiveDate;

pub const INVENTORY_PATH: &str = "inventory/MAS Bills - MAS Bills.csv";

/// Column order of the inventory sheet. The file is rewritten in full on
/// every update with this exact header, dates as DD/MM/YYYY.
pub const COLUMNS: [&str; 7] = [
    "Issue Code",
    "Tenor",
    "Issue Date",
    "Maturity Date",
    "Auction Date",
    "Status",
    "Cut-off Yield",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillStatus {
    Upcoming,
    Closed,
}

impl BillStatus {
    pub fn parse(s: &str) -> Result<BillStatus, String> {
        match s.trim() {
            "Upcoming" => Ok(BillStatus::Upcoming),
            "Closed" => Ok(BillStatus::Closed),
            q => Err(format!("Unknown bill status: '{}'", q)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Upcoming => "Upcoming",
            BillStatus::Closed => "Closed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BillRecord {
    pub issue_code: String,
    pub tenor: String,
    pub issue_date: NaiveDate,
    pub maturity_date: NaiveDate,
    pub auction_date: NaiveDate,
    pub status: BillStatus,
    pub cutoff_yield: Option<String>,
}

impl BillRecord {
    pub fn to_row(&self) -> [String; 7] {
        [
            self.issue_code.clone(),
            self.tenor.clone(),
            format_date_dmy(self.issue_date),
            format_date_dmy(self.maturity_date),
            format_date_dmy(self.auction_date),
            self.status.as_str().to_owned(),
            self.cutoff_yield.clone().unwrap_or_default(),
        ]
    }
}

pub fn parse_date_dmy(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%d/%m/%Y")
        .map_err(|e| format!("Failed to parse date '{}' as DD/MM/YYYY: {}", s, e))
}

pub fn format_date_dmy(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Parses the inventory sheet from raw text. Tolerates a UTF-8 BOM, requires
/// every known column to be present, and rejects duplicate issue codes.
pub fn parse_inventory(raw: &str) -> Result<Vec<BillRecord>, String> {
    let raw = raw.trim_start_matches('\u{feff}');
    let mut reader = csv::Reader::from_reader(raw.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| format!("Failed to read inventory header: {}", e))?
        .clone();

    let mut indices = Vec::with_capacity(COLUMNS.len());
    for column in &COLUMNS {
        match headers.iter().position(|h| h == *column) {
            Some(i) => indices.push(i),
            None => return Err(format!("Inventory is missing required column '{}'", column)),
        }
    }

    let mut records: Vec<BillRecord> = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let row = result.map_err(|e| format!("Failed to read inventory row {}: {}", line + 2, e))?;

        let field = |column: usize| -> &str { row.get(indices[column]).unwrap_or("") };

        let cutoff_yield = {
            let value = field(6).trim();
            if value.is_empty() {
                None
            } else {
                Some(value.to_owned())
            }
        };

        let record = BillRecord {
            issue_code: field(0).trim().to_owned(),
            tenor: field(1).trim().to_owned(),
            issue_date: parse_date_dmy(field(2))?,
            maturity_date: parse_date_dmy(field(3))?,
            auction_date: parse_date_dmy(field(4))?,
            status: BillStatus::parse(field(5))?,
            cutoff_yield,
        };

        if records.iter().any(|r| r.issue_code == record.issue_code) {
            return Err(format!("Duplicate issue code in inventory: {}", record.issue_code));
        }

        records.push(record);
    }

    Ok(records)
}

/// Renders the inventory back to CSV text, fixed column order, leading BOM
/// preserved so the file round-trips as the original sheet export produced it.
pub fn render_inventory(records: &[BillRecord]) -> Result<String, String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(&COLUMNS)
        .map_err(|e| format!("Failed to write inventory header: {}", e))?;

    for record in records {
        writer
            .write_record(&record.to_row())
            .map_err(|e| format!("Failed to write row for {}: {}", record.issue_code, e))?;
    }

    let data = writer
        .into_inner()
        .map_err(|e| format!("Failed to flush inventory writer: {}", e))?;
    let body = String::from_utf8(data).map_err(|e| format!("Inventory is not valid UTF-8: {}", e))?;

    Ok(format!("\u{feff}{}", body))
}

pub fn load_inventory(path: &str) -> Result<Vec<BillRecord>, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read inventory from {}: {}", path, e))?;
    parse_inventory(&raw)
}

pub fn save_inventory(path: &str, records: &[BillRecord]) -> Result<(), String> {
    let rendered = render_inventory(records)?;
    fs::write(path, rendered).map_err(|e| format!("Failed to write inventory to {}: {}", path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\u{feff}Issue Code,Tenor,Issue Date,Maturity Date,Auction Date,Status,Cut-off Yield\n\
        BS26114Z,28-day,12/02/2026,12/03/2026,12/02/2026,Closed,2.75\n\
        BS26115A,84-day,19/02/2026,14/05/2026,17/02/2026,Upcoming,\n";

    #[test]
    fn parses_typed_records() {
        let records = parse_inventory(SAMPLE).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.issue_code, "BS26114Z");
        assert_eq!(first.tenor, "28-day");
        assert_eq!(first.auction_date, NaiveDate::from_ymd(2026, 2, 12));
        assert_eq!(first.status, BillStatus::Closed);
        assert_eq!(first.cutoff_yield.as_deref(), Some("2.75"));

        let second = &records[1];
        assert_eq!(second.status, BillStatus::Upcoming);
        assert_eq!(second.cutoff_yield, None);
    }

    #[test]
    fn round_trips_exactly() {
        let records = parse_inventory(SAMPLE).unwrap();
        let rendered = render_inventory(&records).unwrap();
        assert_eq!(rendered, SAMPLE);
    }

    #[test]
    fn tolerates_missing_bom() {
        let without_bom = SAMPLE.trim_start_matches('\u{feff}');
        let records = parse_inventory(without_bom).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn rejects_missing_column() {
        let raw = "Issue Code,Tenor,Issue Date,Maturity Date,Auction Date,Status\n\
            BS26114Z,28-day,12/02/2026,12/03/2026,12/02/2026,Closed\n";
        let err = parse_inventory(raw).unwrap_err();
        assert!(err.contains("Cut-off Yield"), "{}", err);
    }

    #[test]
    fn rejects_duplicate_issue_code() {
        let raw = "Issue Code,Tenor,Issue Date,Maturity Date,Auction Date,Status,Cut-off Yield\n\
            BS26114Z,28-day,12/02/2026,12/03/2026,12/02/2026,Closed,2.75\n\
            BS26114Z,28-day,12/02/2026,12/03/2026,12/02/2026,Closed,2.75\n";
        let err = parse_inventory(raw).unwrap_err();
        assert!(err.contains("BS26114Z"), "{}", err);
    }

    #[test]
    fn rejects_bad_date() {
        let raw = "Issue Code,Tenor,Issue Date,Maturity Date,Auction Date,Status,Cut-off Yield\n\
            BS26114Z,28-day,2026-02-12,12/03/2026,12/02/2026,Closed,2.75\n";
        assert!(parse_inventory(raw).is_err());
    }

    #[test]
    fn blank_yield_is_none_even_with_spaces() {
        let raw = "Issue Code,Tenor,Issue Date,Maturity Date,Auction Date,Status,Cut-off Yield\n\
            BS26114Z,28-day,12/02/2026,12/03/2026,12/02/2026,Upcoming,   \n";
        let records = parse_inventory(raw).unwrap();
        assert_eq!(records[0].cutoff_yield, None);
    }
}
