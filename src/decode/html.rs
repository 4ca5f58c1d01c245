//! HTML table extraction
//!
//! Financial statement pages group each table under a `<section>` with an
//! `<h2>` heading. Tables are named after that heading.

use crate::error::{Error, Result};
use crate::types::{FieldValue, Record};
use scraper::{ElementRef, Html, Selector};

/// A table scraped from an HTML page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlTable {
    /// Heading text of the enclosing section
    pub name: String,
    /// Column headers; blank headers are named by position
    pub headers: Vec<String>,
    /// Body rows whose cell count matches the header
    pub rows: Vec<Vec<String>>,
}

impl HtmlTable {
    /// Rows as records keyed by header
    pub fn records(&self) -> Vec<Record> {
        self.rows
            .iter()
            .map(|row| {
                self.headers
                    .iter()
                    .zip(row)
                    .map(|(header, cell)| {
                        let value = if cell.is_empty() {
                            FieldValue::Null
                        } else {
                            FieldValue::Text(cell.clone())
                        };
                        (header.clone(), value)
                    })
                    .collect()
            })
            .collect()
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::decode(format!("Invalid selector {css:?}: {e}")))
}

fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract every `<section>` table from a page.
///
/// A section's first table takes the heading as its name; later tables in
/// the same section get a numeric suffix. Sections without a heading fall
/// back to their `id`.
pub fn extract_tables(html: &str) -> Result<Vec<HtmlTable>> {
    let document = Html::parse_document(html);
    let section_sel = selector("section")?;
    let heading_sel = selector("h2")?;
    let table_sel = selector("table")?;
    let header_sel = selector("th")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;

    let mut tables = Vec::new();
    for section in document.select(&section_sel) {
        let heading = section
            .select(&heading_sel)
            .next()
            .map(text_of)
            .filter(|h| !h.is_empty())
            .or_else(|| section.value().attr("id").map(str::to_string));
        let Some(heading) = heading else {
            continue;
        };

        for (position, table) in section.select(&table_sel).enumerate() {
            let headers: Vec<String> = table
                .select(&header_sel)
                .map(text_of)
                .enumerate()
                .map(|(i, h)| {
                    if h.is_empty() {
                        format!("column_{}", i + 1)
                    } else {
                        h
                    }
                })
                .collect();
            if headers.is_empty() {
                continue;
            }

            let rows = table
                .select(&row_sel)
                .skip(1)
                .map(|tr| tr.select(&cell_sel).map(text_of).collect::<Vec<_>>())
                .filter(|cells| cells.len() == headers.len())
                .collect();

            let name = if position == 0 {
                heading.clone()
            } else {
                format!("{heading} {}", position + 1)
            };
            tables.push(HtmlTable {
                name,
                headers,
                rows,
            });
        }
    }

    Ok(tables)
}

/// Extract the headline ratio list as `(name, value)` pairs
pub fn extract_ratios(html: &str) -> Result<Vec<(String, String)>> {
    let document = Html::parse_document(html);
    let item_sel = selector("#top-ratios li")?;
    let name_sel = selector(".name")?;
    let value_sel = selector(".value, .number")?;

    Ok(document
        .select(&item_sel)
        .filter_map(|item| {
            let name = item.select(&name_sel).next().map(text_of)?;
            let value = item.select(&value_sel).next().map(text_of)?;
            (!name.is_empty()).then_some((name, value))
        })
        .collect())
}
