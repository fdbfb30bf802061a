//! Label-driven lookups over the report markup.
//!
//! Report pages are nested layout tables where a field is a label cell
//! followed by a value cell. Everything that walks the tree lives here, so the
//! extractors only ever ask for "the value next to label X inside section Y".

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::error::ReportError;

static CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td, th").unwrap());
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());

pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
        }
    }

    /// The whole page as a lookup scope.
    pub fn root(&self) -> Scope<'_> {
        Scope {
            el: self.html.root_element(),
        }
    }

    /// Innermost cell whose text contains `marker`. Outer layout cells
    /// contain the same text, so the deepest match is the one that matters.
    pub fn find_cell_containing(&self, marker: &str) -> Option<ElementRef<'_>> {
        let candidates: Vec<ElementRef> = self
            .html
            .select(&CELL_SEL)
            .filter(|c| cell_text(*c).contains(marker))
            .collect();
        candidates
            .iter()
            .find(|c| {
                !candidates
                    .iter()
                    .any(|other| other.id() != c.id() && is_within(*other, **c))
            })
            .copied()
    }

    pub fn find_cell_by_label(&self, label: &str) -> Option<ElementRef<'_>> {
        self.root().find_cell_by_label(label)
    }

    /// The table introduced by heading cell `heading` that also carries a
    /// `marker` label. Several tables can share a heading; the marker picks
    /// the one with the expected fields.
    pub fn section(&self, heading: &str, marker: &str) -> Result<Scope<'_>, ReportError> {
        self.html
            .select(&CELL_SEL)
            .filter(|c| label_matches(*c, heading))
            .filter_map(ancestor_table)
            .map(|el| Scope { el })
            .find(|scope| scope.find_cell_by_label(marker).is_some())
            .ok_or_else(|| ReportError::missing(format!("section {heading:?}")))
    }
}

/// A subtree that label lookups are confined to, usually one table.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    el: ElementRef<'a>,
}

impl<'a> Scope<'a> {
    /// Scope of the table that holds `cell`.
    pub fn table_of(cell: ElementRef<'a>) -> Option<Self> {
        ancestor_table(cell).map(|el| Scope { el })
    }

    pub fn find_cell_by_label(&self, label: &str) -> Option<ElementRef<'a>> {
        self.el.select(&CELL_SEL).find(|c| label_matches(*c, label))
    }

    /// Value next to `label`, or `None` when the label cell is absent or
    /// its value cell is blank.
    pub fn optional(&self, label: &str) -> Option<String> {
        self.find_cell_by_label(label)
            .and_then(sibling_text)
            .filter(|v| !v.is_empty())
    }

    /// Value next to `label`. Absence or a blank value means the layout is not
    /// what we expect.
    pub fn required(&self, label: &str) -> Result<String, ReportError> {
        let cell = self
            .find_cell_by_label(label)
            .ok_or_else(|| ReportError::missing(format!("label {label:?}")))?;
        sibling_text(cell)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ReportError::missing(format!("value for {label:?}")))
    }

    /// Data rows of a grid whose header row reads `columns`. Rows belonging to
    /// nested tables, blank rows and the trailing `Total` row are skipped. Any
    /// other row must have exactly one cell per column.
    pub fn grid(&self, columns: &[&str]) -> Result<Vec<Vec<String>>, ReportError> {
        let rows: Vec<Vec<String>> = self
            .el
            .select(&ROW_SEL)
            .filter(|r| ancestor_table(*r).map(|t| t.id()) == Some(self.el.id()))
            .map(row_cells)
            .collect();

        let header = rows
            .iter()
            .position(|cells| {
                cells.len() == columns.len()
                    && cells
                        .iter()
                        .zip(columns)
                        .all(|(c, want)| normalize_label(c) == normalize_label(want))
            })
            .ok_or_else(|| ReportError::missing(format!("grid header {columns:?}")))?;

        let mut data = Vec::new();
        for cells in rows.into_iter().skip(header + 1) {
            if cells.iter().all(|c| c.is_empty()) || is_total_row(&cells) {
                continue;
            }
            if cells.len() != columns.len() {
                return Err(ReportError::StructuralParse(format!(
                    "grid row {:?} has {} cells, expected {}",
                    cells,
                    cells.len(),
                    columns.len()
                )));
            }
            data.push(cells);
        }
        Ok(data)
    }
}

/// Whitespace-collapsed text of an element. `<br>` and `&nbsp;` count as
/// whitespace.
pub fn cell_text(el: ElementRef) -> String {
    normalize_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

/// Text of the first element sibling after `cell`.
pub fn sibling_text(cell: ElementRef) -> Option<String> {
    cell.next_siblings()
        .find_map(ElementRef::wrap)
        .map(cell_text)
}

/// Markup of every element sibling after `cell`, concatenated.
pub fn following_markup(cell: ElementRef) -> String {
    cell.next_siblings()
        .filter_map(ElementRef::wrap)
        .map(|e| e.html())
        .collect()
}

pub fn ancestor_table(el: ElementRef) -> Option<ElementRef> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "table")
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn row_cells(row: ElementRef) -> Vec<String> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|c| matches!(c.value().name(), "td" | "th"))
        .map(cell_text)
        .collect()
}

fn is_total_row(cells: &[String]) -> bool {
    cells
        .first()
        .is_some_and(|c| matches!(normalize_label(c).as_str(), "total" | "totals"))
}

fn normalize_label(text: &str) -> String {
    normalize_whitespace(text)
        .trim_end_matches(':')
        .trim()
        .to_lowercase()
}

fn label_matches(cell: ElementRef, label: &str) -> bool {
    normalize_label(&cell_text(cell)) == normalize_label(label)
}

fn is_within(inner: ElementRef, outer: ElementRef) -> bool {
    inner.ancestors().any(|a| a.id() == outer.id())
}
