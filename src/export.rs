//! CSV projection of the current filtered view.
//!
//! Column order and placeholder policy mirror the dashboard table: only
//! name, phone, address and source fall back to "N/A" (a missing level is
//! already `Low` by canonicalization); website and collected-at stay empty.
//! Values are joined verbatim. Embedded commas are NOT quoted or escaped,
//! so a field containing a comma produces a malformed row. Known
//! limitation, kept as documented behavior and pinned by tests.

use chrono::Utc;

use crate::lead::Lead;

pub const CSV_HEADER: &str =
    "Name,Phone,Website,Address,Score,Level,Qualified,Source,CollectedAt";

const PLACEHOLDER: &str = "N/A";

/// Render the rows as CSV text, header line first.
pub fn to_csv(leads: &[Lead]) -> String {
    let mut out = String::with_capacity(64 * (leads.len() + 1));
    out.push_str(CSV_HEADER);
    out.push('\n');
    for lead in leads {
        let row = [
            or_placeholder(&lead.name),
            or_placeholder(&lead.phone),
            lead.website.clone(),
            or_placeholder(&lead.address),
            format_score(lead.score),
            lead.level.to_string(),
            if lead.qualified { "Yes" } else { "No" }.to_string(),
            or_placeholder(&lead.source),
            lead.collected_at.clone(),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// Date-stamped download name, e.g. `leads_2025-09-04.csv`.
pub fn csv_filename() -> String {
    format!("leads_{}.csv", Utc::now().format("%Y-%m-%d"))
}

fn or_placeholder(value: &str) -> String {
    if value.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        value.to_string()
    }
}

/// Whole scores print without a trailing ".0", like the table does.
fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{}", score as i64)
    } else {
        format!("{score}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lead::Level;

    fn mk(name: &str, website: &str, score: f64) -> Lead {
        Lead {
            name: name.to_string(),
            phone: "(11) 91234-5678".to_string(),
            website: website.to_string(),
            address: "10 High Street".to_string(),
            score,
            qualified: true,
            level: Level::High,
            source: "Google Places".to_string(),
            ..Lead::default()
        }
    }

    #[test]
    fn header_has_fixed_column_order() {
        let csv = to_csv(&[]);
        assert_eq!(
            csv.lines().next().unwrap(),
            "Name,Phone,Website,Address,Score,Level,Qualified,Source,CollectedAt"
        );
    }

    #[test]
    fn empty_website_stays_empty_not_placeholder() {
        let csv = to_csv(&[mk("Via Bakery", "", 4.0)]);
        let row = csv.lines().nth(1).unwrap();
        let fields: Vec<&str> = row.split(',').collect();
        assert_eq!(fields[2], "", "website column must stay empty");
        assert_ne!(fields[2], "N/A");
    }

    #[test]
    fn missing_name_phone_address_source_get_placeholders() {
        let lead = Lead {
            score: 2.5,
            ..Lead::default()
        };
        let csv = to_csv(&[lead]);
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(row, "N/A,N/A,,N/A,2.5,Low,No,N/A,");
    }

    #[test]
    fn qualified_renders_yes_or_no() {
        let mut lead = mk("Yes Shop", "https://yes.example.com", 5.0);
        let csv = to_csv(&[lead.clone()]);
        assert!(csv.lines().nth(1).unwrap().contains(",Yes,"));

        lead.qualified = false;
        let csv = to_csv(&[lead]);
        assert!(csv.lines().nth(1).unwrap().contains(",No,"));
    }

    #[test]
    fn whole_scores_print_without_decimal_point() {
        let csv = to_csv(&[mk("A", "w", 5.0), mk("B", "w", 5.5)]);
        let rows: Vec<&str> = csv.lines().skip(1).collect();
        assert!(rows[0].contains(",5,"));
        assert!(rows[1].contains(",5.5,"));
    }

    #[test]
    fn embedded_commas_are_not_escaped() {
        let mut lead = mk("Books, Coffee & Co", "https://bcc.example.com", 3.0);
        lead.address = "1 Left Lane, Suite 2".to_string();
        let csv = to_csv(&[lead]);
        let row = csv.lines().nth(1).unwrap();
        // 9 columns + 2 embedded commas = 11 raw fields. Documented
        // limitation: rows with commas in values are malformed.
        assert_eq!(row.split(',').count(), 11);
        assert!(!row.contains('"'));
    }

    #[test]
    fn filename_is_date_stamped() {
        let name = csv_filename();
        assert!(name.starts_with("leads_"));
        assert!(name.ends_with(".csv"));
        assert_eq!(name.len(), "leads_2025-09-04.csv".len());
    }
}
