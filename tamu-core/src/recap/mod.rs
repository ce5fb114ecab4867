//! Recap view support: searching stored records and exporting them as CSV.
//!
//! Deleting records is a store operation; this module only covers the
//! read-side of the recap screen.

use chrono::Local;

use crate::record::VisitRecord;

/// Header row of the CSV export.
pub const CSV_HEADER: &str = "Date,Name,Affiliation,Address,Purpose";

/// Case-insensitive substring filter over name, affiliation, purpose and
/// visit date. The address column is deliberately not searched. An empty or
/// whitespace-only query matches everything.
pub fn filter_records<'a>(records: &'a [VisitRecord], query: &str) -> Vec<&'a VisitRecord> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return records.iter().collect();
    }
    records
        .iter()
        .filter(|record| {
            record.visitor_name.to_lowercase().contains(&needle)
                || record.affiliation.to_lowercase().contains(&needle)
                || record.purpose.to_lowercase().contains(&needle)
                || record.visit_date.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Render records as a CSV document: the header plus one row per record in
/// the given order, joined with `\n` and no trailing newline. Fields are
/// joined naively; embedded commas are not escaped.
pub fn csv_document(records: &[VisitRecord]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(CSV_HEADER.to_string());
    for record in records {
        lines.push(format!(
            "{},{},{},{},{}",
            record.visit_date,
            record.visitor_name,
            record.affiliation,
            record.address,
            record.purpose
        ));
    }
    lines.join("\n")
}

/// Dated export filename, e.g. `guest-book-recap-2026-08-25.csv`.
pub fn export_filename() -> String {
    format!("guest-book-recap-{}.csv", Local::now().format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::new_id;

    fn record(name: &str, affiliation: &str, address: &str, purpose: &str) -> VisitRecord {
        VisitRecord {
            id: new_id("visit"),
            visit_date: "2026-08-25".into(),
            visitor_name: name.into(),
            affiliation: affiliation.into(),
            address: address.into(),
            purpose: purpose.into(),
            signature_image: "data:image/png;base64,AAAA".into(),
            created_at: 1_756_000_000_000,
        }
    }

    fn sample_book() -> Vec<VisitRecord> {
        vec![
            record("Budi Santoso", "SMP Negeri 2", "Jl. Merdeka 5", "konsultasi"),
            record("Siti Aminah", "wali murid", "Jl. Budi Utomo 3", "pengambilan rapor"),
            record("Andi Wijaya", "dinas pendidikan", "Jl. Sudirman 88", "rapat koordinasi"),
        ]
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let book = sample_book();

        let by_name = filter_records(&book, "budi santoso");
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].visitor_name, "Budi Santoso");

        let by_affiliation = filter_records(&book, "WALI");
        assert_eq!(by_affiliation.len(), 1);
        assert_eq!(by_affiliation[0].visitor_name, "Siti Aminah");

        let by_purpose = filter_records(&book, "Rapor");
        assert_eq!(by_purpose.len(), 1);
        assert_eq!(by_purpose[0].visitor_name, "Siti Aminah");
    }

    #[test]
    fn search_does_not_look_at_addresses() {
        let book = sample_book();
        // "Sudirman" appears only in an address.
        assert!(filter_records(&book, "sudirman").is_empty());
        // "Budi" in an address does not match, but the visitor named Budi does.
        let hits = filter_records(&book, "budi");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].visitor_name, "Budi Santoso");
    }

    #[test]
    fn blank_query_matches_everything() {
        let book = sample_book();
        assert_eq!(filter_records(&book, "").len(), 3);
        assert_eq!(filter_records(&book, "   ").len(), 3);
    }

    #[test]
    fn date_substring_matches() {
        let book = sample_book();
        assert_eq!(filter_records(&book, "2026-08").len(), 3);
        assert!(filter_records(&book, "2025-01").is_empty());
    }

    #[test]
    fn csv_has_header_and_one_row_per_record() {
        let book = vec![
            record("Budi Santoso", "SMP Negeri 2", "Jl. Merdeka 5", "konsultasi"),
            record("Siti Aminah", "wali murid", "Jl. Budi Utomo 3", "pengambilan rapor"),
        ];

        let doc = csv_document(&book);
        assert_eq!(
            doc,
            "Date,Name,Affiliation,Address,Purpose\n\
             2026-08-25,Budi Santoso,SMP Negeri 2,Jl. Merdeka 5,konsultasi\n\
             2026-08-25,Siti Aminah,wali murid,Jl. Budi Utomo 3,pengambilan rapor"
        );
        assert!(!doc.ends_with('\n'));
    }

    #[test]
    fn empty_book_exports_just_the_header() {
        assert_eq!(csv_document(&[]), CSV_HEADER);
    }

    #[test]
    fn export_filename_is_dated_csv() {
        let name = export_filename();
        assert!(name.starts_with("guest-book-recap-"));
        assert!(name.ends_with(".csv"));
        // guest-book-recap-YYYY-MM-DD.csv
        assert_eq!(name.len(), "guest-book-recap-".len() + 10 + 4);
    }
}
