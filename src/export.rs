//! Catalog export: both relations serialized to CSV and bundled into a
//! single Deflate-compressed ZIP, built entirely in memory.

use std::io::{Cursor, Write};

use anyhow::Result;
use chrono::Utc;
use zip::{CompressionMethod, ZipWriter, write::FileOptions};

use crate::catalog::{Bookmark, Folder};

/// UTC stamp shared by both archive entries and the download filename.
pub fn export_stamp() -> String {
    Utc::now().format("%Y%m%d-%H%M").to_string()
}

pub fn archive_filename(stamp: &str) -> String {
    format!("bookmark_export_{}.zip", stamp)
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row(fields: &[String]) -> String {
    let mut row = fields
        .iter()
        .map(|f| csv_field(f))
        .collect::<Vec<_>>()
        .join(",");
    row.push('\n');
    row
}

fn opt_str(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn opt_i32(value: &Option<i32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Full bookmark relation as CSV, header row plus one row per record.
pub fn bookmarks_csv(bookmarks: &[Bookmark]) -> String {
    let mut out =
        String::from("id,url,title,comment,folder_id,favicon_color,created_at,updated_at\n");
    for b in bookmarks {
        out.push_str(&csv_row(&[
            b.id.to_string(),
            b.url.clone(),
            b.title.clone(),
            opt_str(&b.comment),
            opt_i32(&b.folder_id),
            opt_str(&b.favicon_color),
            b.created_at.clone(),
            opt_str(&b.updated_at),
        ]));
    }
    out
}

/// Full folder relation as CSV, header row plus one row per record.
pub fn folders_csv(folders: &[Folder]) -> String {
    let mut out = String::from("id,name,parent_id,color,created_at,updated_at\n");
    for f in folders {
        out.push_str(&csv_row(&[
            f.id.to_string(),
            f.name.clone(),
            opt_i32(&f.parent_id),
            opt_str(&f.color),
            f.created_at.clone(),
            opt_str(&f.updated_at),
        ]));
    }
    out
}

/// Packs the two CSV payloads into one ZIP archive in memory.
pub fn build_archive(bookmarks_csv: &str, folders_csv: &str, stamp: &str) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut cursor);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file(format!("bookmarks_{}.csv", stamp), options)?;
        zip.write_all(bookmarks_csv.as_bytes())?;

        zip.start_file(format!("folders_{}.csv", stamp), options)?;
        zip.write_all(folders_csv.as_bytes())?;

        zip.finish()?;
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn sample_bookmark() -> Bookmark {
        Bookmark {
            id: 1,
            url: "https://example.com".to_string(),
            title: "Example".to_string(),
            comment: None,
            folder_id: Some(2),
            favicon_color: Some("rgb(1,2,3)".to_string()),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: None,
        }
    }

    #[test]
    fn fields_with_commas_quotes_and_newlines_are_quoted() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn bookmark_csv_has_header_and_rows() {
        let csv = bookmarks_csv(&[sample_bookmark()]);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,url,title,comment,folder_id,favicon_color,created_at,updated_at"
        );
        assert_eq!(
            lines.next().unwrap(),
            "1,https://example.com,Example,,2,\"rgb(1,2,3)\",2026-01-01T00:00:00.000Z,"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn empty_relation_serializes_to_header_only() {
        let csv = bookmarks_csv(&[]);
        assert_eq!(csv.lines().count(), 1);
        let csv = folders_csv(&[]);
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn archive_contains_both_stamped_entries() {
        let stamp = "20260830-1200";
        let bytes = build_archive(&bookmarks_csv(&[]), &folders_csv(&[]), stamp).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains(&"bookmarks_20260830-1200.csv".to_string()));
        assert!(names.contains(&"folders_20260830-1200.csv".to_string()));
    }

    #[test]
    fn archive_round_trips_csv_content() {
        let stamp = "20260830-1200";
        let bm = bookmarks_csv(&[sample_bookmark()]);
        let fd = folders_csv(&[]);
        let bytes = build_archive(&bm, &fd, stamp).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut entry = archive.by_name("bookmarks_20260830-1200.csv").unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        assert_eq!(content, bm);
    }

    #[test]
    fn download_name_carries_the_stamp() {
        assert_eq!(
            archive_filename("20260830-1200"),
            "bookmark_export_20260830-1200.zip"
        );
    }
}
