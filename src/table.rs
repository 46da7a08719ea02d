//! Decoding of HTML `<table>` markup into a header + rows grid
//!
//! Reference pages spread one value over several rows or columns with
//! `rowspan`/`colspan`; the grid repeats such a value in every slot it covers,
//! so each row has one entry per header column.

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use crate::normalize::{collapse_whitespace, strip_brackets};

const MAX_SPAN: usize = 1000;

/// A decoded table: header names plus data rows of the same width
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Index of a column by header name, ignoring case and surrounding space
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name.trim()))
    }

    /// Index of the first header matching any of `names`
    pub fn column_any(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|name| self.column(name))
    }

    /// Cell text of `row` at `column`, empty when either is missing
    pub fn cell<'a>(&self, row: &'a [String], column: Option<usize>) -> &'a str {
        column
            .and_then(|idx| row.get(idx))
            .map(|s| s.as_str())
            .unwrap_or("")
    }
}

/// Decode the first `<table>` of a document, `None` if there is no table
pub fn parse_first_table(html: &str) -> Option<Table> {
    let document = Html::parse_document(html);
    let table_sel = Selector::parse("table").expect("valid table selector");
    let table = document.select(&table_sel).next()?;
    Some(decode_table(table))
}

struct RawRow {
    all_header_cells: bool,
    values: Vec<String>,
}

fn decode_table(table: ElementRef) -> Table {
    let row_sel = Selector::parse("tr").expect("valid row selector");

    // Column slots still covered by a rowspan from an earlier row: (text, rows left)
    let mut carry: Vec<Option<(String, usize)>> = Vec::new();
    let mut raw_rows: Vec<RawRow> = Vec::new();

    for tr in table.select(&row_sel) {
        if !owned_by(tr, table) {
            continue;
        }
        let cells: Vec<ElementRef> = tr
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|e| matches!(e.value().name(), "th" | "td"))
            .collect();
        if cells.is_empty() {
            continue;
        }
        let all_header_cells = cells.iter().all(|c| c.value().name() == "th");

        let mut values = Vec::new();
        let mut col = 0;
        let mut cells = cells.into_iter();
        loop {
            if let Some(text) = take_carry(&mut carry, col) {
                values.push(text);
                col += 1;
                continue;
            }
            let Some(cell) = cells.next() else {
                // Trailing columns may still be covered by earlier rowspans
                while col < carry.len() {
                    values.push(take_carry(&mut carry, col).unwrap_or_default());
                    col += 1;
                }
                break;
            };
            let text = cell_text(cell);
            let colspan = span(cell, "colspan");
            let rowspan = span(cell, "rowspan");
            for _ in 0..colspan {
                if col >= carry.len() {
                    carry.resize(col + 1, None);
                }
                if rowspan > 1 {
                    carry[col] = Some((text.clone(), rowspan - 1));
                }
                values.push(text.clone());
                col += 1;
            }
        }

        raw_rows.push(RawRow {
            all_header_cells,
            values,
        });
    }

    let mut rows = raw_rows.into_iter().peekable();
    let headers: Vec<String> = match rows.peek() {
        Some(first) if first.all_header_cells => rows
            .next()
            .map(|r| {
                r.values
                    .iter()
                    .map(|h| strip_brackets(h).trim().to_string())
                    .collect()
            })
            .unwrap_or_default(),
        Some(first) => (0..first.values.len()).map(|i| i.to_string()).collect(),
        None => Vec::new(),
    };

    // Extra leading header rows (grouped headings) carry no data
    while rows.peek().map_or(false, |r| r.all_header_cells) {
        rows.next();
    }

    let width = headers.len();
    let data = rows
        .map(|r| r.values)
        .filter(|values| values.iter().any(|v| !v.is_empty()))
        .map(|mut values| {
            values.resize(width, String::new());
            values
        })
        .collect();

    Table {
        headers,
        rows: data,
    }
}

fn take_carry(carry: &mut [Option<(String, usize)>], col: usize) -> Option<String> {
    let slot = carry.get_mut(col)?;
    let (text, left) = slot.as_mut()?;
    let text = text.clone();
    *left -= 1;
    if *left == 0 {
        *slot = None;
    }
    Some(text)
}

/// True when `tr` belongs to `table` itself rather than to a nested table
fn owned_by(tr: ElementRef, table: ElementRef) -> bool {
    tr.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "table")
        .map_or(false, |owner| owner.id() == table.id())
}

fn span(cell: ElementRef, attr: &str) -> usize {
    cell.value()
        .attr(attr)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(1)
        .min(MAX_SPAN)
}

/// Text of a cell with `<br>` read as a space and whitespace collapsed
fn cell_text(cell: ElementRef) -> String {
    let mut text = String::new();
    for node in cell.descendants() {
        match node.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(e) if e.name() == "br" => text.push(' '),
            _ => {}
        }
    }
    collapse_whitespace(&text)
}
