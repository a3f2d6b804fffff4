//! Per-screen data provider cache
//!
//! A [`DataBook`] holds the rows of one data provider as seen by one screen,
//! split into pages: [`CURRENT_PAGE`] for the root rows and one page per
//! master row key for detail books.
//!
//! Row arrays are patched by range. They are only replaced as a whole by an
//! explicit clear.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use thinview_core::{MetaData, Row, SelectedRow, SortDefinition, CURRENT_PAGE};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataBook {
    pages: HashMap<String, Vec<Row>>,
    all_fetched: HashMap<String, bool>,
    meta_data: Option<Arc<MetaData>>,
    selected_row: SelectedRow,
    sorted_columns: Vec<SortDefinition>,
}

impl DataBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self, key: &str) -> Option<&[Row]> {
        self.pages.get(key).map(Vec::as_slice)
    }

    pub fn current(&self) -> Option<&[Row]> {
        self.page(CURRENT_PAGE)
    }

    pub fn page_keys(&self) -> impl Iterator<Item = &str> {
        self.pages.keys().map(String::as_str)
    }

    pub fn is_all_fetched(&self, key: &str) -> bool {
        self.all_fetched.get(key).copied().unwrap_or(false)
    }

    pub fn meta_data(&self) -> Option<&Arc<MetaData>> {
        self.meta_data.as_ref()
    }

    pub fn selected_row(&self) -> &SelectedRow {
        &self.selected_row
    }

    pub fn sorted_columns(&self) -> &[SortDefinition] {
        &self.sorted_columns
    }

    /// Page addressed by a selection: its tree path, or the current page.
    pub fn selection_page(selection: &SelectedRow) -> String {
        match &selection.tree_path {
            Some(path) if !path.is_empty() => Value::from(path.clone()).to_string(),
            _ => CURRENT_PAGE.to_string(),
        }
    }

    /// Patch `rows` into `page` starting at `from`.
    ///
    /// Rows past the end of the page are appended. When `all_fetched` is set
    /// the page ends with the last patched row; rows the server no longer
    /// reports are dropped.
    pub fn update_rows(&mut self, page: &str, from: usize, rows: Vec<Row>, all_fetched: bool) {
        let existing = self.pages.entry(page.to_string()).or_default();
        if from > existing.len() {
            tracing::debug!(
                "Fetch for {} starts at {} past page end {}, appending",
                page,
                from,
                existing.len()
            );
        }
        let start = from.min(existing.len());
        let end = start + rows.len();
        for (offset, row) in rows.into_iter().enumerate() {
            let index = start + offset;
            if index < existing.len() {
                existing[index] = row;
            } else {
                existing.push(row);
            }
        }
        if all_fetched {
            existing.truncate(end);
        }
        self.all_fetched.insert(page.to_string(), all_fetched);
        self.validate_selection();
    }

    /// Insert `row` at `index` (clamped to the page length).
    pub fn insert_row(&mut self, page: &str, index: usize, row: Row) {
        let rows = self.pages.entry(page.to_string()).or_default();
        let index = index.min(rows.len());
        rows.insert(index, row);

        if Self::selection_page(&self.selected_row) == page
            && self.selected_row.index >= index as i64
        {
            self.selected_row.index += 1;
        }
    }

    /// Remove the row at `index`. Returns the removed row.
    pub fn delete_row(&mut self, page: &str, index: usize) -> Option<Row> {
        let rows = self.pages.get_mut(page)?;
        if index >= rows.len() {
            return None;
        }
        let removed = rows.remove(index);

        if Self::selection_page(&self.selected_row) == page {
            let selected = self.selected_row.index;
            if selected == index as i64 {
                self.selected_row = SelectedRow::none();
            } else if selected > index as i64 {
                self.selected_row.index -= 1;
            }
        }
        Some(removed)
    }

    /// Overwrite the columns present in `values` on the row at `index`.
    /// Returns false when the row does not exist.
    pub fn patch_row(&mut self, page: &str, index: usize, values: Row) -> bool {
        let Some(row) = self.pages.get_mut(page).and_then(|rows| rows.get_mut(index)) else {
            return false;
        };
        row.extend(values);
        if Self::selection_page(&self.selected_row) == page
            && self.selected_row.index == index as i64
        {
            self.selected_row.data_row = Some(row.clone());
        }
        true
    }

    /// Drop one page, or every page when `page` is `None`.
    pub fn clear(&mut self, page: Option<&str>) {
        match page {
            Some(page) => {
                self.pages.remove(page);
                self.all_fetched.remove(page);
            }
            None => {
                self.pages.clear();
                self.all_fetched.clear();
            }
        }
        self.validate_selection();
    }

    /// Store a selection. An index outside its page becomes "no selection".
    pub fn set_selected_row(&mut self, selection: SelectedRow) {
        self.selected_row = selection;
        self.validate_selection();
    }

    pub fn clear_selected_row(&mut self) {
        self.selected_row = SelectedRow::none();
    }

    pub fn set_sorted_columns(&mut self, sort: Vec<SortDefinition>) {
        self.sorted_columns = sort;
    }

    pub fn set_meta_data(&mut self, meta_data: MetaData) {
        self.meta_data = Some(Arc::new(meta_data));
    }

    fn validate_selection(&mut self) {
        let index = self.selected_row.index;
        if index < 0 {
            if index != -1 {
                self.selected_row = SelectedRow::none();
            }
            return;
        }
        let page = Self::selection_page(&self.selected_row);
        let len = self.pages.get(&page).map_or(0, Vec::len);
        if index as usize >= len {
            tracing::debug!(
                "Selected row {} outside page {:?} of {} rows, clearing selection",
                index,
                page,
                len
            );
            self.selected_row = SelectedRow::none();
        }
    }
}
