//! Tests for market data sources

use super::*;
use crate::config::{BseConfig, FeedConfig, IpoConfig, NseConfig, ScreenerConfig};
use crate::engine::Fetcher;
use crate::error::{Error, ErrorKind};
use crate::http::HttpClientConfig;
use crate::types::{BackoffType, FieldValue, WriteMode};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use std::io::Write;
use std::time::Duration;
use test_case::test_case;
use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> Arc<HttpClient> {
    let config = HttpClientConfig::builder()
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(5),
            Duration::from_millis(50),
        )
        .max_retries(1)
        .no_rate_limit()
        .build();
    Arc::new(HttpClient::with_config(config).unwrap())
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

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

fn text(value: &str) -> FieldValue {
    FieldValue::from(value)
}

// ============================================================================
// NSE
// ============================================================================

#[tokio::test]
async fn test_nse_indices_warms_up_and_upserts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "nsit=abc; Path=/"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/allIndices"))
        .and(header_exists("cookie"))
        .and(header("Referer", format!("{}/", server.uri()).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                {"key": "BROAD MARKET INDICES", "index": "NIFTY 50", "indexSymbol": "NIFTY 50", "last": 24000.5},
                {"key": "SECTORAL INDICES", "index": "NIFTY BANK", "indexSymbol": "NIFTY BANK", "last": 51000}
            ],
            "timestamp": "18-Oct-2024 15:30"
        })))
        .mount(&server)
        .await;

    let config = NseConfig {
        base_url: server.uri(),
        ..NseConfig::default()
    };
    let batches = NseIndices::new(client(), config).fetch().await.unwrap();

    assert_eq!(batches.len(), 1);
    let batch = &batches[0];
    assert_eq!(batch.table, NseIndices::TABLE);
    assert_eq!(batch.mode, WriteMode::upsert(["key", "indexSymbol"]));
    assert!(batch.options.created_at);
    assert_eq!(batch.records.len(), 2);
    assert_eq!(batch.records[1].get("indexSymbol"), Some(&text("NIFTY BANK")));
}

#[tokio::test]
async fn test_listed_companies_csv() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/content/equities/EQUITY_L.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "SYMBOL,NAME OF COMPANY, SERIES, DATE OF LISTING\n\
             20MICRONS,20 Microns Limited,EQ,06-OCT-2008\n\
             broken row\n\
             3MINDIA,3M India Limited,EQ,13-AUG-2004\n",
        ))
        .mount(&server)
        .await;

    let config = NseConfig {
        listed_companies_url: format!("{}/content/equities/EQUITY_L.csv", server.uri()),
        ..NseConfig::default()
    };
    let batches = ListedCompanies::new(client(), config).fetch().await.unwrap();

    assert_eq!(batches[0].table, "listed_companies");
    assert_eq!(batches[0].mode, WriteMode::upsert(["SYMBOL"]));
    assert_eq!(batches[0].records.len(), 2);
    assert_eq!(batches[0].records[0].get("SERIES"), Some(&text("EQ")));
}

#[test_case("Pr171024", "pr")]
#[test_case("PR171024", "pr")]
#[test_case("sme171024", "sme")]
#[test_case("MCAP17102024", "mcap")]
#[test_case("corpbond171024", "corpbond")]
fn test_bhavcopy_table(stem: &str, expected: &str) {
    assert_eq!(bhavcopy_table(stem), expected);
}

#[test]
fn test_bhavcopy_archive_url() {
    let config = NseConfig {
        bhavcopy_url: "https://example.test/PR{date}.zip".to_string(),
        ..NseConfig::default()
    };
    let source = Bhavcopy::new(client(), config, date(2024, 10, 7));
    assert_eq!(source.archive_url(), "https://example.test/PR071024.zip");
}

#[tokio::test]
async fn test_bhavcopy_fans_out_and_marks_missing() {
    let server = MockServer::start().await;
    let archive = zip_of(&[
        ("Pr171024.csv", "SYMBOL,CLOSE\nTCS,4100\nINFY,1900\n"),
        ("Gl171024.csv", "SYMBOL,GAIN_LOSS\nTCS,G\n"),
        ("readme.txt", "not data"),
    ]);
    Mock::given(method("GET"))
        .and(path("/PR171024.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
        .mount(&server)
        .await;

    let config = NseConfig {
        bhavcopy_url: format!("{}/PR{{date}}.zip", server.uri()),
        bhavcopy_expected_files: vec!["pr".into(), "gl".into(), "bc".into()],
        ..NseConfig::default()
    };
    let batches = Bhavcopy::new(client(), config, date(2024, 10, 17))
        .fetch()
        .await
        .unwrap();

    let tables: Vec<&str> = batches.iter().map(|b| b.table.as_str()).collect();
    assert_eq!(tables, vec!["pr", "gl", "bc"]);
    assert!(batches.iter().all(|b| b.mode == WriteMode::Append));

    let pr = &batches[0];
    assert_eq!(pr.records.len(), 2);
    assert_eq!(pr.records[0].get("source_date"), Some(&text("2024-10-17")));
    assert_eq!(pr.records[0].get("status"), Some(&text("OK")));

    let bc = &batches[2];
    assert_eq!(bc.records.len(), 1);
    assert_eq!(bc.records[0].get("status"), Some(&text("MISSING")));
    assert_eq!(bc.records[0].len(), 2);
}

#[tokio::test]
async fn test_bhavcopy_holiday_is_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = NseConfig {
        bhavcopy_url: format!("{}/PR{{date}}.zip", server.uri()),
        ..NseConfig::default()
    };
    let err = Bhavcopy::new(client(), config, date(2024, 10, 19))
        .fetch()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 404, .. }));
    assert_eq!(err.kind(), ErrorKind::Fetch);
}

#[test]
fn test_bhavcopy_rejects_non_zip_body() {
    let source = Bhavcopy::new(client(), NseConfig::default(), date(2024, 10, 17));
    let err = source.batches_from_archive(b"<html>maintenance</html>").unwrap_err();
    assert!(matches!(err, Error::Archive { .. }));
}

// ============================================================================
// Government news
// ============================================================================

#[tokio::test]
async fn test_gov_news_posts_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/news/dd-news/dataservices/getddnews"))
        .and(body_json(serde_json::json!({"pageNumber": 1, "pageSize": 15})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ddnewResponse": {"results": [
                {"title": "Budget session", "tags": ["economy"]},
                {"title": "Monsoon update"}
            ]}
        })))
        .mount(&server)
        .await;

    let feed = FeedConfig {
        table: "dd_news".to_string(),
        endpoint: "/news/dd-news/dataservices/getddnews".to_string(),
        payload: serde_json::json!({"pageNumber": 1, "pageSize": 15}),
        records_path: "ddnewResponse.results".to_string(),
    };
    let source = GovNewsFeed::new(client(), server.uri(), feed);
    assert_eq!(source.table(), "dd_news");

    let batches = source.fetch().await.unwrap();
    assert_eq!(batches[0].table, "dd_news");
    assert_eq!(batches[0].mode, WriteMode::Append);
    assert_eq!(batches[0].records.len(), 2);
    assert_eq!(
        batches[0].records[0].get("tags"),
        Some(&FieldValue::Nested(serde_json::json!(["economy"])))
    );
}

// ============================================================================
// IPO
// ============================================================================

#[test_case(date(2024, 4, 1), "2024-25")]
#[test_case(date(2025, 3, 31), "2024-25")]
#[test_case(date(2025, 1, 15), "2024-25")]
#[test_case(date(1999, 12, 1), "1999-00")]
fn test_financial_year(day: NaiveDate, expected: &str) {
    assert_eq!(financial_year(day), expected);
}

#[test]
fn test_ipo_report_url() {
    let config = IpoConfig {
        base_url: "https://ipo.example".to_string(),
        ..IpoConfig::default()
    };
    let report = IpoReport::new(client(), config, IpoBoard::Sme, date(2024, 10, 17));
    assert_eq!(
        report.report_url(),
        "https://ipo.example/cloud/report/data-read/22/1/10/2024/2024-25/0/0/0"
    );
    assert_eq!(report.board().table(), "sme_data");
}

#[tokio::test]
async fn test_ipo_report_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cloud/report/data-read/21/1/10/2024/2024-25/0/0/0"))
        .and(query_param("v", "15-25"))
        .and(header("Origin", "https://www.chittorgarh.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "reportTableData": [{"Company": "Acme Ltd IPO", "Issue Size (Rs Cr.)": "120.5"}],
            "title": "Mainboard IPOs"
        })))
        .mount(&server)
        .await;

    let config = IpoConfig {
        base_url: server.uri(),
        ..IpoConfig::default()
    };
    let batches = IpoReport::new(client(), config, IpoBoard::Mainboard, date(2024, 10, 17))
        .fetch()
        .await
        .unwrap();

    assert_eq!(batches[0].table, "mainboard_data");
    assert!(batches[0].options.created_at);
    assert_eq!(batches[0].records.len(), 1);
    assert_eq!(batches[0].records[0].get("Company"), Some(&text("Acme Ltd IPO")));
}

#[tokio::test]
async fn test_ipo_report_without_table_key_uses_whole_object() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"msg": "no data"})),
        )
        .mount(&server)
        .await;

    let config = IpoConfig {
        base_url: server.uri(),
        ..IpoConfig::default()
    };
    let batches = IpoReport::new(client(), config, IpoBoard::Sme, date(2024, 10, 17))
        .fetch()
        .await
        .unwrap();

    assert_eq!(batches[0].records.len(), 1);
    assert_eq!(batches[0].records[0].get("msg"), Some(&text("no data")));
}

// ============================================================================
// BSE
// ============================================================================

#[tokio::test]
async fn test_bse_announcements_window_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/AnnSubCategoryGetData/w"))
        .and(query_param("strPrevDate", "20241015"))
        .and(query_param("strToDate", "20241017"))
        .and(query_param("strCat", "-1"))
        .and(query_param("strType", "C"))
        .and(header("Referer", "https://www.bseindia.com/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Table": [{"NEWSID": "a1", "SLONGNAME": "Acme"}, {"NEWSID": "b2", "SLONGNAME": "Beta"}],
            "Table1": [{"ROWCNT": 2}]
        })))
        .mount(&server)
        .await;

    let config = BseConfig {
        announcements_url: format!("{}/api/AnnSubCategoryGetData/w", server.uri()),
        lookback_days: 2,
    };
    let source = BseAnnouncements::ending(client(), config, date(2024, 10, 17));
    assert_eq!(source.window(), (date(2024, 10, 15), date(2024, 10, 17)));

    let batches = source.fetch().await.unwrap();
    assert_eq!(batches[0].table, "announcements");
    assert_eq!(batches[0].mode, WriteMode::upsert(["NEWSID"]));
    assert_eq!(batches[0].records.len(), 2);
}

// ============================================================================
// Screener
// ============================================================================

const COMPANY_PAGE: &str = r#"
<html><body>
  <ul id="top-ratios">
    <li><span class="name">Market Cap</span><span class="value">₹ <span class="number">14,90,000</span> Cr.</span></li>
    <li><span class="name">ROE</span><span class="value"><span class="number">51.5</span> %</span></li>
  </ul>
  <section id="profit-loss">
    <h2>Profit &amp; Loss</h2>
    <table>
      <thead><tr><th></th><th>Mar 2023</th><th>Mar 2024</th></tr></thead>
      <tbody>
        <tr><td>Sales</td><td>225,458</td><td>240,893</td></tr>
        <tr><td>Net Profit</td><td>42,303</td><td>46,099</td></tr>
      </tbody>
    </table>
  </section>
</body></html>
"#;

#[test]
fn test_screener_page_batches() {
    let source = ScreenerCompany::new(client(), ScreenerConfig::default(), " tcs ");
    assert_eq!(source.symbol(), "TCS");

    let batches = source.batches_from_page(COMPANY_PAGE).unwrap();
    let tables: Vec<&str> = batches.iter().map(|b| b.table.as_str()).collect();
    assert_eq!(tables, vec!["financial_ratios", "tables_profit_and_loss"]);

    let ratios = &batches[0];
    assert_eq!(ratios.mode, WriteMode::upsert(["symbol", "key"]));
    assert_eq!(ratios.records[1].get("key"), Some(&text("ROE")));
    assert_eq!(ratios.records[1].get("value"), Some(&text("51.5 %")));
    assert_eq!(ratios.records[1].get("symbol"), Some(&text("TCS")));

    let pnl = &batches[1];
    assert_eq!(pnl.mode, WriteMode::Append);
    assert_eq!(pnl.records.len(), 2);
    assert_eq!(pnl.records[0].get("symbol"), Some(&text("TCS")));
    assert_eq!(pnl.records[0].get("column_1"), Some(&text("Sales")));
    assert_eq!(pnl.records[1].get("Mar 2024"), Some(&text("46,099")));
}

#[tokio::test]
async fn test_screener_fetches_statement_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/company/TCS/consolidated/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(COMPANY_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let config = ScreenerConfig {
        base_url: server.uri(),
        ..ScreenerConfig::default()
    };
    let batches = ScreenerCompany::new(client(), config, "TCS")
        .fetch()
        .await
        .unwrap();
    assert_eq!(batches.len(), 2);
}

#[tokio::test]
async fn test_screener_unknown_symbol_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Page not found"))
        .mount(&server)
        .await;

    let config = ScreenerConfig {
        base_url: server.uri(),
        ..ScreenerConfig::default()
    };
    let err = ScreenerCompany::new(client(), config, "NOPE")
        .fetch()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 404, .. }));
}

// ============================================================================
// Context
// ============================================================================

#[test]
fn test_source_context_builds_sessions() {
    let context = SourceContext::new(&crate::config::HttpConfig::default(), SourcesConfig::default())
        .unwrap();
    assert!(context.client.has_rate_limiter());
    assert!(context.scraper.has_rate_limiter());
    assert_eq!(context.config.ipo.retention_days, 7);
}

#[test]
fn test_join_url() {
    assert_eq!(join_url("https://a.test/", "/b/c"), "https://a.test/b/c");
    assert_eq!(join_url("https://a.test", "b"), "https://a.test/b");
}
