//! Rendering resolved records as an aligned table or JSON.

use imsg::Record;
use serde_json::{Value, json};
use unicode_width::UnicodeWidthStr;

const HEADERS: [&str; 5] = ["INPUT", "KIND", "NAME", "CONTACT", "CANONICAL"];

/// Truncate to `max` display columns, marking the cut with `…`.
pub fn truncate(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_owned();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}

/// Pad `s` with spaces to `width` display columns.
fn pad(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(s.width());
    format!("{s}{}", " ".repeat(fill))
}

fn cells(r: &Record) -> [String; 5] {
    let mut name = r.name.clone().unwrap_or_else(|| "-".into());
    if r.ambiguous {
        name.push_str(" (+)");
    }
    [
        truncate(&r.input, 40),
        r.kind.to_string(),
        truncate(&name, 40),
        r.contact_id.clone().unwrap_or_else(|| "-".into()),
        r.canonical.clone().unwrap_or_else(|| "-".into()),
    ]
}

/// Aligned table, one line per record, preceded by a header line.
pub fn records_table(records: &[Record]) -> String {
    let rows: Vec<[String; 5]> = records.iter().map(cells).collect();
    let mut widths = HEADERS.map(|h| h.width());
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.width());
        }
    }

    let mut out = String::new();
    let mut line = |cols: [&str; 5]| {
        let joined: Vec<String> = cols
            .iter()
            .zip(widths)
            .map(|(c, w)| pad(c, w))
            .collect();
        out.push_str(joined.join("  ").trim_end());
        out.push('\n');
    };
    line(HEADERS);
    for row in &rows {
        line(row.each_ref().map(String::as_str));
    }
    out
}

/// JSON array of records.
pub fn records_json(records: &[Record]) -> Value {
    records
        .iter()
        .map(|r| {
            json!({
                "input": r.input,
                "found": r.found,
                "ambiguous": r.ambiguous,
                "kind": r.kind.to_string(),
                "name": r.name,
                "contact_id": r.contact_id,
                "canonical": r.canonical,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use imsg::MatchKind;

    use super::*;

    fn record(input: &str, name: Option<&str>) -> Record {
        Record {
            input: input.into(),
            name: name.map(Into::into),
            contact_id: name.map(|_| "ID-1".into()),
            canonical: name.map(|_| input.to_lowercase()),
            found: name.is_some(),
            ambiguous: false,
            kind: MatchKind::Email,
        }
    }

    #[test]
    fn truncate_counts_display_columns() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
        assert_eq!(truncate("日本語テキスト", 5), "日本…");
    }

    #[test]
    fn table_aligns_columns() {
        let table = records_table(&[
            record("ann@example.com", Some("Ann")),
            record("x@y.z", None),
        ]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("INPUT            KIND"));
        assert!(lines[1].starts_with("ann@example.com  email  Ann"));
        assert!(lines[2].starts_with("x@y.z            email  -"));
    }

    #[test]
    fn json_keeps_absent_fields_null() {
        let v = records_json(&[record("x@y.z", None)]);
        assert_eq!(v[0]["input"], "x@y.z");
        assert_eq!(v[0]["found"], false);
        assert!(v[0]["name"].is_null());
        assert_eq!(v[0]["kind"], "email");
    }
}
