// src/services/annual_sheet.rs
use chrono::{Datelike, NaiveDate};
use csv::ReaderBuilder;
use log::{info, warn};
use std::collections::BTreeMap;
use std::path::Path;

use crate::handlers::error::{PipelineError, Result};
use crate::models::AnnualSheetRow;

pub const SP_RETURNS: &str = "SP Returns";
pub const TBILL: &str = "3-month T.Bill";
pub const TBOND10: &str = "US T. Bond (10-year)";
pub const BAA_CORPORATE: &str = "Baa Corporate Bond";

fn parse_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    for format in ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date.year());
        }
    }
    raw.parse::<i32>().ok()
}

/// Read the historical annual returns sheet. Header names are matched after
/// trimming (the corporate bond column carries a leading space). Returns are
/// fractions. Each column is read on its own: a blank cell only drops that
/// series for the year. Rows without a readable date are dropped, and a
/// repeated year keeps its last row.
pub fn read_annual_sheet(path: &Path) -> Result<Vec<AnnualSheetRow>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;

    let headers = rdr.headers()?.clone();
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))
    };
    let idx_date = find("Date")?;
    let idx_sp = find(SP_RETURNS)?;
    let idx_tbill = find(TBILL)?;
    let idx_tbond = find(TBOND10)?;
    let idx_baa = find(BAA_CORPORATE)?;

    let mut by_year: BTreeMap<i32, AnnualSheetRow> = BTreeMap::new();
    for (line, record) in rdr.records().enumerate() {
        let row = record?;
        let Some(year) = row.get(idx_date).and_then(parse_year) else {
            warn!("Skipping row {} in {}: unreadable date", line + 2, path.display());
            continue;
        };
        let value = |idx: usize| row.get(idx).and_then(|v| v.trim().parse::<f64>().ok());

        let parsed = AnnualSheetRow {
            year,
            sp_return: value(idx_sp),
            tbill: value(idx_tbill),
            tbond10: value(idx_tbond),
            baa_corporate: value(idx_baa),
        };
        if by_year.insert(year, parsed).is_some() {
            warn!("Year {} repeated in {}; keeping row {}", year, path.display(), line + 2);
        }
    }

    let rows: Vec<AnnualSheetRow> = by_year.into_values().collect();
    info!("Loaded {} annual rows from {}", rows.len(), path.display());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn sheet_columns_are_matched_after_trimming() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "Date,SP Returns,3-month T.Bill,US T. Bond (10-year), Baa Corporate Bond\n\
1929-12-31,-0.083,0.0316,0.042,0.030\n\
1928-12-31,0.4381,0.0308,0.0084,0.0322\n\
bad,0.1,0.1,0.1,0.1\n"
        )
        .unwrap();

        let rows = read_annual_sheet(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].year, 1928);
        assert_eq!(rows[0].sp_return, Some(0.4381));
        assert_eq!(rows[1].baa_corporate, Some(0.030));
    }

    #[test]
    fn blank_cell_only_drops_its_own_series() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "Date,SP Returns,3-month T.Bill,US T. Bond (10-year), Baa Corporate Bond\n\
2023-12-31,0.26,0.05,0.04,0.08\n\
2024-12-31,0.25,0.05,,\n"
        )
        .unwrap();

        let rows = read_annual_sheet(file.path()).unwrap();
        let years: Vec<i32> = rows.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2023, 2024]);
        assert_eq!(rows[1].sp_return, Some(0.25));
        assert_eq!(rows[1].tbill, Some(0.05));
        assert_eq!(rows[1].tbond10, None);
        assert_eq!(rows[1].baa_corporate, None);
    }

    #[test]
    fn repeated_year_keeps_the_last_row() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "Date,SP Returns,3-month T.Bill,US T. Bond (10-year), Baa Corporate Bond\n\
2020,0.1,0.01,0.02,0.03\n\
2019,0.2,0.01,0.02,0.03\n\
2020,0.3,0.01,0.02,0.03\n"
        )
        .unwrap();

        let rows = read_annual_sheet(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].year, 2019);
        assert_eq!(rows[1].year, 2020);
        assert_eq!(rows[1].sp_return, Some(0.3));
    }

    #[test]
    fn missing_column_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Date,SP Returns\n1928-12-31,0.43").unwrap();
        assert!(matches!(read_annual_sheet(file.path()), Err(PipelineError::MissingColumn(_))));
    }

    #[test]
    fn plain_years_and_us_dates_parse() {
        assert_eq!(parse_year("12/31/1999"), Some(1999));
        assert_eq!(parse_year("2001"), Some(2001));
        assert_eq!(parse_year("n/a"), None);
    }
}
