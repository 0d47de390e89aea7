//! # Renderer
//!
//! Output encodings for one report page. The structured envelope nests
//! full summaries; the tabular encodings flatten each client to one row
//! in a fixed column order shared by CSV and the workbook.
//!
//! Exports cover the page being rendered, not the full filtered set.

use crate::report::ReportPage;
use crate::types::{ClientSummary, VantageError};
use serde::{Deserialize, Serialize};

/// Column order shared by both tabular encodings.
pub const EXPORT_COLUMNS: [&str; 7] = [
    "Client Name",
    "Total Projects",
    "Total Budget",
    "Total Spent",
    "Delivery Health",
    "Overdue Projects",
    "Top Teams",
];

/// Worksheet name in the workbook export.
pub const SHEET_NAME: &str = "Project Health";

// =============================================================================
// STRUCTURED RESPONSE
// =============================================================================

/// Paginated structured response: total count, adjacent page numbers,
/// and the page of client summaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageEnvelope {
    pub count: u64,
    pub next: Option<u64>,
    pub previous: Option<u64>,
    pub results: Vec<ClientSummary>,
}

impl From<ReportPage> for PageEnvelope {
    fn from(page: ReportPage) -> Self {
        Self {
            count: page.count,
            next: page.next_page(),
            previous: page.previous_page(),
            results: page.results,
        }
    }
}

// =============================================================================
// TABULAR EXPORTS
// =============================================================================

/// One flattened row per summary, in `EXPORT_COLUMNS` order.
fn summary_row(summary: &ClientSummary) -> [String; 7] {
    [
        summary.name.clone(),
        summary.total_projects.to_string(),
        summary.total_budget.to_string(),
        summary.total_spent.to_string(),
        summary.delivery_health.as_str().to_string(),
        summary.overdue_projects.to_string(),
        summary.top_teams.join(", "),
    ]
}

/// Encode the page as CSV: one header row, one row per summary.
pub fn to_csv(page: &ReportPage) -> Result<Vec<u8>, VantageError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(EXPORT_COLUMNS)
        .map_err(|e| VantageError::SerializationError(e.to_string()))?;
    for summary in &page.results {
        writer
            .write_record(summary_row(summary))
            .map_err(|e| VantageError::SerializationError(e.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| VantageError::SerializationError(e.to_string()))
}

/// Encode the page as an XLSX workbook with a single worksheet.
pub fn to_xlsx(page: &ReportPage) -> Result<Vec<u8>, VantageError> {
    let mut book = umya_spreadsheet::new_file();
    let sheet = book
        .get_sheet_by_name_mut("Sheet1")
        .ok_or_else(|| VantageError::SerializationError("missing default worksheet".to_string()))?;
    sheet.set_name(SHEET_NAME);

    for (col, header) in EXPORT_COLUMNS.iter().enumerate() {
        sheet
            .get_cell_mut(((col + 1) as u32, 1))
            .set_value((*header).to_string());
    }
    for (row, summary) in page.results.iter().enumerate() {
        for (col, value) in summary_row(summary).into_iter().enumerate() {
            sheet
                .get_cell_mut(((col + 1) as u32, (row + 2) as u32))
                .set_value(value);
        }
    }

    let mut out: Vec<u8> = Vec::new();
    umya_spreadsheet::writer::xlsx::write_writer(&book, &mut out)
        .map_err(|e| VantageError::SerializationError(e.to_string()))?;
    Ok(out)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeliveryHealth;

    fn summary(name: &str, teams: &[&str]) -> ClientSummary {
        ClientSummary {
            name: name.to_string(),
            total_projects: 2,
            total_budget: 5000.0,
            total_spent: 120.5,
            delivery_health: DeliveryHealth::OnTrack,
            overdue_projects: 1,
            top_teams: teams.iter().map(|t| (*t).to_string()).collect(),
            projects: Vec::new(),
        }
    }

    fn page_of(results: Vec<ClientSummary>) -> ReportPage {
        let count = results.len() as u64;
        ReportPage {
            count,
            page: 1,
            page_size: 10,
            pages: 1,
            results,
        }
    }

    #[test]
    fn envelope_carries_adjacent_pages() {
        let middle = ReportPage {
            count: 25,
            page: 2,
            page_size: 10,
            pages: 3,
            results: Vec::new(),
        };
        let envelope = PageEnvelope::from(middle);
        assert_eq!(envelope.count, 25);
        assert_eq!(envelope.next, Some(3));
        assert_eq!(envelope.previous, Some(1));

        let only = PageEnvelope::from(page_of(Vec::new()));
        assert_eq!(only.next, None);
        assert_eq!(only.previous, None);
    }

    #[test]
    fn envelope_serializes_expected_shape() {
        let envelope = PageEnvelope::from(page_of(vec![summary("Acme", &["Falcons"])]));
        let value = serde_json::to_value(&envelope).expect("serialize");
        assert_eq!(value["count"], 1);
        assert_eq!(value["next"], serde_json::Value::Null);
        assert_eq!(value["results"][0]["name"], "Acme");
        assert_eq!(value["results"][0]["delivery_health"], "on_track");
    }

    #[test]
    fn csv_has_header_and_page_rows_only() {
        let page = page_of(vec![
            summary("Acme", &["Falcons", "Owls"]),
            summary("Globex", &[]),
        ]);
        let bytes = to_csv(&page).expect("csv");
        let text = String::from_utf8(bytes).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "Client Name,Total Projects,Total Budget,Total Spent,Delivery Health,Overdue Projects,Top Teams"
        );
        assert_eq!(lines[1], "Acme,2,5000,120.5,on_track,1,\"Falcons, Owls\"");
        assert_eq!(lines[2], "Globex,2,5000,120.5,on_track,1,");
    }

    #[test]
    fn csv_empty_page_is_header_only() {
        let bytes = to_csv(&page_of(Vec::new())).expect("csv");
        let text = String::from_utf8(bytes).expect("utf8");
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn xlsx_round_trips_cells() {
        let page = page_of(vec![summary("Acme", &["Falcons", "Owls"])]);
        let bytes = to_xlsx(&page).expect("xlsx");

        let book = umya_spreadsheet::reader::xlsx::read_reader(std::io::Cursor::new(bytes), true)
            .expect("read back");
        assert_eq!(book.get_sheet_collection().len(), 1);

        let sheet = book.get_sheet_by_name(SHEET_NAME).expect("sheet");
        assert_eq!(sheet.get_value((1u32, 1u32)), "Client Name");
        assert_eq!(sheet.get_value((7u32, 1u32)), "Top Teams");
        assert_eq!(sheet.get_value((1u32, 2u32)), "Acme");
        assert_eq!(sheet.get_value((4u32, 2u32)), "120.5");
        assert_eq!(sheet.get_value((7u32, 2u32)), "Falcons, Owls");
    }
}
