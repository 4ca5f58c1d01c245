//! Tests for decoder module

use super::*;
use crate::error::Error;
use crate::types::FieldValue;
use pretty_assertions::assert_eq;
use std::io::Write;

// ============================================================================
// JSON Decoder Tests
// ============================================================================

#[test]
fn test_json_decoder_root_array() {
    let records = JsonDecoder::new()
        .decode(br#"[{"id": 1}, {"id": 2}]"#)
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].get("id"), Some(&FieldValue::Int(2)));
}

#[test]
fn test_json_decoder_root_object() {
    let records = JsonDecoder::new().decode(br#"{"id": 1}"#).unwrap();
    assert_eq!(records.len(), 1);
}

#[test]
fn test_json_decoder_nested_path() {
    let body = br#"{"newsOnAirResponse": {"results": [{"title": "a"}, {"title": "b"}]}}"#;
    let records = JsonDecoder::with_path("newsOnAirResponse.results")
        .decode(body)
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get("title"), Some(&FieldValue::from("a")));
}

#[test]
fn test_json_decoder_dollar_prefix_and_index() {
    let body = br#"{"data": [{"items": [1, 2]}, {"items": [3, 4]}]}"#;
    let records = JsonDecoder::with_path("$.data[-1].items").decode(body).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get("value"), Some(&FieldValue::Int(3)));
}

#[test]
fn test_json_decoder_missing_path_is_empty() {
    let records = JsonDecoder::with_path("Table")
        .decode(br#"{"Table1": []}"#)
        .unwrap();
    assert!(records.is_empty());
}

#[test]
fn test_json_decoder_missing_path_falls_back_to_root() {
    let body = br#"[{"company": "Acme Ltd"}]"#;
    let records = JsonDecoder::with_path("reportTableData")
        .or_root()
        .decode(body)
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("company"), Some(&FieldValue::from("Acme Ltd")));
}

#[test]
fn test_json_decoder_wildcard_path() {
    let body = br#"{"groups": [{"rows": [{"a": 1}]}, {"rows": [{"a": 2}]}]}"#;
    let records = JsonDecoder::with_path("$.groups[*].rows[*]")
        .decode(body)
        .unwrap();
    assert_eq!(records.len(), 2);
}

#[test]
fn test_json_decoder_invalid_body() {
    let err = JsonDecoder::new().decode(b"<html>").unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
}

// ============================================================================
// CSV Decoder Tests
// ============================================================================

#[test]
fn test_csv_decoder_basic() {
    let body = b"SYMBOL,NAME OF COMPANY, SERIES\nTCS,Tata Consultancy,EQ\nINFY,Infosys,EQ\n";
    let records = CsvDecoder::new().decode(body).unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get("SYMBOL"), Some(&FieldValue::from("TCS")));
    assert_eq!(records[1].get("SERIES"), Some(&FieldValue::from("EQ")));
}

#[test]
fn test_csv_decoder_empty_cell_is_null() {
    let records = CsvDecoder::new().decode(b"a,b\n1,\n").unwrap();
    assert_eq!(records[0].get("b"), Some(&FieldValue::Null));
}

#[test]
fn test_csv_decoder_skips_malformed_rows() {
    let body = b"a,b\n1,2\n3\n4,5,6\n7,8\n";
    let records = CsvDecoder::new().decode(body).unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[1].get("a"), Some(&FieldValue::from("7")));
}

#[test]
fn test_csv_decoder_quoted_fields() {
    let body = b"name,desc\n\"Smith, John\",\"He said \"\"hi\"\"\"\n";
    let records = CsvDecoder::new().decode(body).unwrap();
    assert_eq!(records[0].get("name"), Some(&FieldValue::from("Smith, John")));
    assert_eq!(records[0].get("desc"), Some(&FieldValue::from("He said \"hi\"")));
}

#[test]
fn test_csv_decoder_drops_blank_header_column() {
    let records = CsvDecoder::new().decode(b"a,b,\n1,2,\n").unwrap();
    assert_eq!(records[0].len(), 2);
}

#[test]
fn test_csv_decoder_latin1_fallback() {
    let body = b"name\nSoci\xe9t\xe9\n";
    let records = CsvDecoder::new().decode(body).unwrap();
    assert_eq!(records[0].get("name"), Some(&FieldValue::from("Société")));
}

#[test]
fn test_csv_decoder_strips_bom() {
    let records = CsvDecoder::new().decode(b"\xEF\xBB\xBFsym\nX\n").unwrap();
    assert_eq!(records[0].get("sym"), Some(&FieldValue::from("X")));
}

#[test]
fn test_csv_decoder_custom_delimiter() {
    let records = CsvDecoder::with_delimiter(b';').decode(b"a;b\n1;2\n").unwrap();
    assert_eq!(records[0].get("b"), Some(&FieldValue::from("2")));
}

#[test]
fn test_csv_decoder_empty_body() {
    assert!(CsvDecoder::new().decode(b"").unwrap().is_empty());
}

// ============================================================================
// HTML Tests
// ============================================================================

const COMPANY_PAGE: &str = r#"
<html><body>
  <ul id="top-ratios">
    <li><span class="name">Market Cap</span><span class="value">₹ <span class="number">12,34,567</span> Cr.</span></li>
    <li><span class="name">Stock P/E</span><span class="number">29.1</span></li>
    <li><span class="name"></span><span class="number">ignored</span></li>
  </ul>
  <section id="quarters">
    <h2>Quarterly Results</h2>
    <table>
      <thead><tr><th></th><th>Jun 2024</th><th>Sep 2024</th></tr></thead>
      <tbody>
        <tr><td>Sales +</td><td>100</td><td>110</td></tr>
        <tr><td>Broken</td><td>1</td></tr>
        <tr><td>Net Profit</td><td>10</td><td></td></tr>
      </tbody>
    </table>
  </section>
  <section id="shareholding">
    <table><tr><th>Holder</th><th>Share</th></tr><tr><td>Promoters</td><td>72%</td></tr></table>
    <table><tr><th>Holder</th></tr><tr><td>FIIs</td></tr></table>
  </section>
  <section><p>no table here</p></section>
</body></html>
"#;

#[test]
fn test_extract_tables_names_and_rows() {
    let tables = extract_tables(COMPANY_PAGE).unwrap();
    let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Quarterly Results", "shareholding", "shareholding 2"]
    );

    let quarters = &tables[0];
    assert_eq!(quarters.headers, vec!["column_1", "Jun 2024", "Sep 2024"]);
    assert_eq!(quarters.rows.len(), 2);
    assert_eq!(quarters.rows[0], vec!["Sales +", "100", "110"]);
}

#[test]
fn test_html_table_records() {
    let tables = extract_tables(COMPANY_PAGE).unwrap();
    let records = tables[0].records();

    assert_eq!(records[1].get("column_1"), Some(&FieldValue::from("Net Profit")));
    assert_eq!(records[1].get("Sep 2024"), Some(&FieldValue::Null));
}

#[test]
fn test_extract_ratios() {
    let ratios = extract_ratios(COMPANY_PAGE).unwrap();
    assert_eq!(
        ratios,
        vec![
            ("Market Cap".to_string(), "₹ 12,34,567 Cr.".to_string()),
            ("Stock P/E".to_string(), "29.1".to_string()),
        ]
    );
}

#[test]
fn test_extract_from_page_without_tables() {
    assert!(extract_tables("<html><body>blocked</body></html>")
        .unwrap()
        .is_empty());
    assert!(extract_ratios("").unwrap().is_empty());
}

// ============================================================================
// Archive Tests
// ============================================================================

fn zip_of(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, data) in files {
        writer
            .start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(data.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[test]
fn test_csv_entries_filters_non_csv() {
    let bytes = zip_of(&[
        ("Pd171024.csv", "a\n1\n"),
        ("readme.txt", "ignore"),
        ("nested/Gl171024.CSV", "b\n2\n"),
    ]);

    let entries = csv_entries(&bytes).unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Pd171024.csv", "nested/Gl171024.CSV"]);
    assert_eq!(entries[1].stem(), "Gl171024");
    assert_eq!(entries[0].data, b"a\n1\n".to_vec());
}

#[test]
fn test_csv_entries_rejects_garbage() {
    let err = csv_entries(b"<html>not a zip</html>").unwrap_err();
    assert!(matches!(err, Error::Archive { .. }));
}

#[test]
fn test_decode_text_utf8_passthrough() {
    assert_eq!(decode_text("₹ 100".as_bytes()), "₹ 100");
}

#[test]
fn test_decode_text_latin1_is_not_windows_1252() {
    // 0x80 is the euro sign in windows-1252 but U+0080 in ISO-8859-1
    assert_eq!(decode_text(b"\x80\xe9"), "\u{80}\u{e9}");
}
