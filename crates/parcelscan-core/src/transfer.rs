//! Import/export adapter for the record store.
//!
//! Two flat formats: delimited text (CSV with a fixed header) and structured
//! text (a JSON envelope). `timestamp` is authoritative on import; the
//! `date`/`time` columns are derived display strings and only consulted when
//! no usable timestamp is present. Round trips are lossless for `tracking`,
//! `timestamp`, `checked`, and `deviceName`.

use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::error::{Error, Result};
use crate::models::{NewScan, Scan, DEFAULT_DEVICE_NAME};
use crate::store::ScanStore;
use crate::tracking;

/// Maximum accepted upload size
pub const MAX_IMPORT_BYTES: u64 = 10 * 1024 * 1024;

const DELIMITED_HEADER: &str = "tracking,timestamp,date,time,checked,deviceName";

/// Export output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    /// CSV with a fixed header row
    Delimited,
    /// JSON envelope with export metadata
    Structured,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Delimited => "csv",
            Self::Structured => "json",
        }
    }

    /// Infer the format from a file extension, case-insensitive.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Delimited),
            "json" => Some(Self::Structured),
            _ => None,
        }
    }
}

/// Structured-export envelope
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StructuredExport {
    export_date: String,
    total_scans: usize,
    scans: Vec<ExportRow>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportRow {
    tracking: String,
    timestamp: i64,
    date: String,
    time: String,
    checked: bool,
    device_name: String,
}

fn to_export_row(scan: &Scan) -> ExportRow {
    let (date, time) = display_date_time(scan.timestamp);
    ExportRow {
        tracking: scan.tracking.clone(),
        timestamp: scan.timestamp,
        date,
        time,
        checked: scan.checked,
        device_name: scan.device_name.clone(),
    }
}

fn display_date_time(timestamp_ms: i64) -> (String, String) {
    Local.timestamp_millis_opt(timestamp_ms).single().map_or_else(
        || (String::new(), String::new()),
        |dt| {
            (
                dt.format("%Y-%m-%d").to_string(),
                dt.format("%H:%M:%S").to_string(),
            )
        },
    )
}

/// Render a store snapshot in the requested format.
pub fn render_export(scans: &[Scan], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Delimited => Ok(render_delimited(scans)),
        ExportFormat::Structured => render_structured(scans),
    }
}

/// Render the delimited (CSV) format.
#[must_use]
pub fn render_delimited(scans: &[Scan]) -> String {
    let mut output = String::from(DELIMITED_HEADER);
    output.push('\n');

    for scan in scans {
        let row = to_export_row(scan);
        output.push_str(&format!(
            "{},{},{},{},{},{}\n",
            quote_field(&row.tracking),
            row.timestamp,
            row.date,
            row.time,
            row.checked,
            quote_field(&row.device_name),
        ));
    }

    output
}

/// Render the structured (JSON) format.
pub fn render_structured(scans: &[Scan]) -> Result<String> {
    let envelope = StructuredExport {
        export_date: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        total_scans: scans.len(),
        scans: scans.iter().map(to_export_row).collect(),
    };
    Ok(serde_json::to_string_pretty(&envelope)?)
}

/// Build the conventional export file name:
/// `<prefix>-<ISO timestamp with colons and dots replaced by dashes>.<ext>`.
#[must_use]
pub fn export_file_name(prefix: &str, format: ExportFormat, now: DateTime<Utc>) -> String {
    let stamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{prefix}-{stamp}.{}", format.extension())
}

fn quote_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Outcome of an import run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported: usize,
    /// Rows skipped as same-day duplicates of existing scans
    pub skipped: usize,
    /// Per-row errors and warnings; a bad row never aborts the batch
    pub errors: Vec<String>,
    pub total_rows: usize,
}

/// Import a file after gating on extension and size.
///
/// Both gates fail before any parsing with [`Error::ImportRejected`].
pub async fn import_file<S: ScanStore>(store: &S, path: &Path) -> Result<ImportReport> {
    let Some(format) = ExportFormat::from_path(path) else {
        return Err(Error::ImportRejected(format!(
            "unsupported file type for {}; expected .csv or .json",
            path.display()
        )));
    };

    let size = std::fs::metadata(path)?.len();
    if size > MAX_IMPORT_BYTES {
        return Err(Error::ImportRejected(format!(
            "file is {size} bytes; maximum accepted size is {MAX_IMPORT_BYTES}"
        )));
    }

    let content = std::fs::read_to_string(path)?;
    import_str(store, &content, format).await
}

/// Import already-loaded content in the given format.
pub async fn import_str<S: ScanStore>(
    store: &S,
    content: &str,
    format: ExportFormat,
) -> Result<ImportReport> {
    let mut report = ImportReport::default();

    let rows = match format {
        ExportFormat::Delimited => parse_delimited(content)?,
        ExportFormat::Structured => parse_structured(content)?,
    };
    report.total_rows = rows.len();

    for (index, row) in rows.into_iter().enumerate() {
        let row_num = index + 1;
        let Some(scan) = coerce_row(row, row_num, &mut report.errors) else {
            continue;
        };

        if store
            .find_same_day(&scan.tracking, scan.timestamp)
            .await?
            .is_some()
        {
            report.skipped += 1;
            continue;
        }

        store.insert(scan).await?;
        report.imported += 1;
    }

    Ok(report)
}

/// A row as parsed from either format, before coercion
#[derive(Debug, Default)]
struct RawRow {
    tracking: Option<String>,
    timestamp: Option<Value>,
    date: Option<String>,
    time: Option<String>,
    checked: Option<Value>,
    device_name: Option<String>,
}

/// Coerce a raw row into an insertable scan, recording problems by row number.
/// Returns `None` only when the row is rejected outright.
fn coerce_row(row: RawRow, row_num: usize, errors: &mut Vec<String>) -> Option<NewScan> {
    let tracking = row
        .tracking
        .as_deref()
        .map(tracking::normalize)
        .filter(|code| !code.is_empty());
    let Some(tracking) = tracking else {
        errors.push(format!("row {row_num}: missing/invalid tracking"));
        return None;
    };

    let timestamp = coerce_timestamp(&row).unwrap_or_else(|| {
        errors.push(format!(
            "row {row_num}: unparseable timestamp, using current time"
        ));
        Utc::now().timestamp_millis()
    });

    let checked = row.checked.as_ref().is_some_and(|value| match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    });

    let device_name = row
        .device_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_DEVICE_NAME.to_string());

    Some(NewScan {
        tracking,
        timestamp,
        device_name,
        checked,
    })
}

fn coerce_timestamp(row: &RawRow) -> Option<i64> {
    match &row.timestamp {
        Some(Value::Number(n)) => {
            if let Some(ms) = n.as_i64() {
                return Some(ms);
            }
            #[allow(clippy::cast_possible_truncation)]
            return n.as_f64().map(|f| f as i64);
        }
        Some(Value::String(s)) => {
            if let Ok(ms) = s.trim().parse::<i64>() {
                return Some(ms);
            }
        }
        _ => {}
    }

    // Fall back to the combined date+time display fields.
    let date = row.date.as_deref()?.trim();
    let time = row.time.as_deref().map_or("00:00:00", str::trim);
    let naive = NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M:%S").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp_millis())
}

fn parse_structured(content: &str) -> Result<Vec<RawRow>> {
    let value: Value = serde_json::from_str(content)?;

    // Accept both the export envelope and a bare array.
    let items = match &value {
        Value::Object(map) => map
            .get("scans")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        Value::Array(items) => items.clone(),
        _ => Vec::new(),
    };

    Ok(items.into_iter().map(raw_row_from_value).collect())
}

fn raw_row_from_value(value: Value) -> RawRow {
    let Value::Object(map) = value else {
        return RawRow::default();
    };

    let string_field = |keys: &[&str]| -> Option<String> {
        keys.iter()
            .find_map(|key| map.get(*key))
            .and_then(Value::as_str)
            .map(ToString::to_string)
    };

    RawRow {
        tracking: string_field(&["tracking"]),
        timestamp: map.get("timestamp").cloned(),
        date: string_field(&["date"]),
        time: string_field(&["time"]),
        checked: map.get("checked").cloned(),
        device_name: string_field(&["deviceName", "device_name"]),
    }
}

fn parse_delimited(content: &str) -> Result<Vec<RawRow>> {
    let mut lines = content.lines().filter(|line| !line.trim().is_empty());

    let Some(header) = lines.next() else {
        return Ok(Vec::new());
    };
    let columns: Vec<String> = parse_csv_line(header)
        .into_iter()
        .map(|name| name.trim().to_string())
        .collect();
    if !columns.iter().any(|name| name == "tracking") {
        return Err(Error::ImportRejected(
            "delimited file is missing a tracking column".to_string(),
        ));
    }

    let index_of = |name: &str| columns.iter().position(|column| column == name);
    let tracking_idx = index_of("tracking");
    let timestamp_idx = index_of("timestamp");
    let date_idx = index_of("date");
    let time_idx = index_of("time");
    let checked_idx = index_of("checked");
    let device_idx = index_of("deviceName");

    let rows = lines
        .map(|line| {
            let fields = parse_csv_line(line);
            let field = |idx: Option<usize>| -> Option<String> {
                idx.and_then(|i| fields.get(i)).cloned()
            };

            RawRow {
                tracking: field(tracking_idx),
                timestamp: field(timestamp_idx).map(Value::String),
                date: field(date_idx),
                time: field(time_idx),
                checked: field(checked_idx).map(Value::String),
                device_name: field(device_idx),
            }
        })
        .collect();

    Ok(rows)
}

/// Parse one CSV line with double-quote quoting and doubled-quote escapes.
fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut field));
            }
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScanId;
    use crate::store::SqliteStore;
    use pretty_assertions::assert_eq;

    fn sample(tracking: &str, timestamp: i64, checked: bool) -> Scan {
        Scan {
            id: ScanId::Local(0),
            tracking: tracking.to_string(),
            timestamp,
            device_name: "dock-3".to_string(),
            checked,
            remote_id: None,
        }
    }

    #[test]
    fn csv_line_parsing_handles_quotes() {
        assert_eq!(parse_csv_line("a,b,c"), vec!["a", "b", "c"]);
        assert_eq!(parse_csv_line("\"a,b\",c"), vec!["a,b", "c"]);
        assert_eq!(parse_csv_line("\"he said \"\"hi\"\"\",x"), vec![
            "he said \"hi\"",
            "x"
        ]);
    }

    #[test]
    fn delimited_render_has_header_and_quoted_fields() {
        let rendered = render_delimited(&[sample("ABC123", 1_700_000_000_000, true)]);
        let mut lines = rendered.lines();
        assert_eq!(lines.next().unwrap(), DELIMITED_HEADER);
        let row = lines.next().unwrap();
        assert!(row.starts_with("\"ABC123\","));
        assert!(row.contains(",true,"));
        assert!(row.ends_with("\"dock-3\""));
    }

    #[test]
    fn export_file_name_replaces_colons_and_dots() {
        let now = Utc.with_ymd_and_hms(2026, 8, 30, 12, 34, 56).unwrap();
        let name = export_file_name("scans", ExportFormat::Delimited, now);
        assert_eq!(name, "scans-2026-08-30T12-34-56-000Z.csv");
    }

    #[test]
    fn format_from_path_is_case_insensitive() {
        assert_eq!(
            ExportFormat::from_path(Path::new("x.CSV")),
            Some(ExportFormat::Delimited)
        );
        assert_eq!(
            ExportFormat::from_path(Path::new("x.json")),
            Some(ExportFormat::Structured)
        );
        assert_eq!(ExportFormat::from_path(Path::new("x.txt")), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delimited_round_trip_preserves_fields() {
        let scans = vec![
            sample("ABC123", 1_700_000_000_000, true),
            sample("XYZ789", 1_700_000_100_000, false),
        ];
        let rendered = render_delimited(&scans);

        let store = SqliteStore::open_in_memory().unwrap();
        let report = import_str(&store, &rendered, ExportFormat::Delimited)
            .await
            .unwrap();
        assert_eq!(report.imported, 2);
        assert_eq!(report.skipped, 0);
        assert!(report.errors.is_empty());

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 2);
        let abc = all.iter().find(|s| s.tracking == "ABC123").unwrap();
        assert_eq!(abc.timestamp, 1_700_000_000_000);
        assert!(abc.checked);
        assert_eq!(abc.device_name, "dock-3");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn structured_round_trip_preserves_fields() {
        let scans = vec![sample("ABC123", 1_700_000_000_000, false)];
        let rendered = render_structured(&scans).unwrap();

        let store = SqliteStore::open_in_memory().unwrap();
        let report = import_str(&store, &rendered, ExportFormat::Structured)
            .await
            .unwrap();
        assert_eq!(report.imported, 1);

        let all = store.get_all().await.unwrap();
        assert_eq!(all[0].tracking, "ABC123");
        assert_eq!(all[0].timestamp, 1_700_000_000_000);
        assert!(!all[0].checked);
        assert_eq!(all[0].device_name, "dock-3");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn import_skips_same_day_duplicates() {
        let store = SqliteStore::open_in_memory().unwrap();
        let now = Utc::now().timestamp_millis();
        store
            .insert(NewScan {
                tracking: "EXISTING".to_string(),
                timestamp: now,
                device_name: "desk".to_string(),
                checked: false,
            })
            .await
            .unwrap();

        let content = format!(
            "{DELIMITED_HEADER}\n\"EXISTING\",{now},,,false,\"desk\"\n\"BRANDNEW\",{now},,,false,\"desk\"\n"
        );
        let report = import_str(&store, &content, ExportFormat::Delimited)
            .await
            .unwrap();

        assert_eq!(report.imported, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.total_rows, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn bad_rows_are_collected_not_fatal() {
        let store = SqliteStore::open_in_memory().unwrap();
        let content = format!("{DELIMITED_HEADER}\n\"\",123,,,false,\"desk\"\n\"GOOD1\",456,,,false,\"desk\"\n");
        let report = import_str(&store, &content, ExportFormat::Delimited)
            .await
            .unwrap();

        assert_eq!(report.imported, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("missing/invalid tracking"));
        assert_eq!(report.total_rows, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unparseable_timestamp_falls_back_to_now_with_warning() {
        let store = SqliteStore::open_in_memory().unwrap();
        let content =
            format!("{DELIMITED_HEADER}\n\"CODE1\",not-a-number,also-bad,,false,\"desk\"\n");
        let before = Utc::now().timestamp_millis();
        let report = import_str(&store, &content, ExportFormat::Delimited)
            .await
            .unwrap();

        assert_eq!(report.imported, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("unparseable timestamp"));

        let all = store.get_all().await.unwrap();
        assert!(all[0].timestamp >= before);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn date_time_fields_back_fill_missing_timestamp() {
        let store = SqliteStore::open_in_memory().unwrap();
        let content =
            format!("{DELIMITED_HEADER}\n\"CODE1\",,2026-08-30,09:15:00,false,\"desk\"\n");
        let report = import_str(&store, &content, ExportFormat::Delimited)
            .await
            .unwrap();

        assert_eq!(report.imported, 1);
        assert!(report.errors.is_empty());

        let all = store.get_all().await.unwrap();
        let (date, time) = display_date_time(all[0].timestamp);
        assert_eq!(date, "2026-08-30");
        assert_eq!(time, "09:15:00");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn checked_accepts_literal_true_case_insensitively() {
        let store = SqliteStore::open_in_memory().unwrap();
        let content = format!(
            "{DELIMITED_HEADER}\n\"A1\",100,,,TRUE,\"desk\"\n\"A2\",200,,,nope,\"desk\"\n"
        );
        import_str(&store, &content, ExportFormat::Delimited)
            .await
            .unwrap();

        let all = store.get_all().await.unwrap();
        let a1 = all.iter().find(|s| s.tracking == "A1").unwrap();
        let a2 = all.iter().find(|s| s.tracking == "A2").unwrap();
        assert!(a1.checked);
        assert!(!a2.checked);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn import_file_rejects_wrong_extension_and_oversize() {
        let store = SqliteStore::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();

        let bad_ext = dir.path().join("scans.txt");
        std::fs::write(&bad_ext, "whatever").unwrap();
        let err = import_file(&store, &bad_ext).await.unwrap_err();
        assert!(matches!(err, Error::ImportRejected(_)));

        // Nothing was parsed or inserted.
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn structured_import_accepts_bare_arrays() {
        let store = SqliteStore::open_in_memory().unwrap();
        let content = r#"[{"tracking":"ABC","timestamp":"123","checked":"true"}]"#;
        let report = import_str(&store, content, ExportFormat::Structured)
            .await
            .unwrap();

        assert_eq!(report.imported, 1);
        let all = store.get_all().await.unwrap();
        assert_eq!(all[0].timestamp, 123);
        assert!(all[0].checked);
        assert_eq!(all[0].device_name, DEFAULT_DEVICE_NAME);
    }
}
