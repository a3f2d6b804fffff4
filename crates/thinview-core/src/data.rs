//! Data-provider domain types
//!
//! Rows, column metadata, selection and sort state for the data books a
//! screen binds its editors and tables to.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One record, keyed by column name.
pub type Row = Map<String, Value>;

/// Page key of the unfiltered / root page of a data book.
pub const CURRENT_PAGE: &str = "current";

/// Build a row from positional `records` values and their column names.
pub fn row_from_record(column_names: &[String], record: &[Value]) -> Row {
    column_names
        .iter()
        .cloned()
        .zip(record.iter().cloned())
        .collect()
}

/// Owning screen segment of a data provider name.
///
/// Data providers are named `<ownerScreen>/<dataBook>`; the segment before the
/// final book name identifies the screen that owns the data. Names without a
/// `/` have no owner.
pub fn owner_screen(data_provider: &str) -> Option<&str> {
    let (prefix, _book) = data_provider.rsplit_once('/')?;
    let owner = prefix.rsplit('/').next().unwrap_or(prefix);
    (!owner.is_empty()).then_some(owner)
}

// ============================================================================
// MetaData
// ============================================================================

/// Column definition of a data book.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub width: Option<i32>,
}

fn default_true() -> bool {
    true
}

/// Link of a detail data book to its master.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterReference {
    pub referenced_data_book: String,
    pub column_names: Vec<String>,
    pub referenced_column_names: Vec<String>,
}

impl MasterReference {
    /// Page key of the detail rows belonging to `master_row`.
    ///
    /// The key is the JSON encoding of the referenced column values, so
    /// equal master keys always address the same cached page.
    pub fn page_key(&self, master_row: &Row) -> String {
        let key: Map<String, Value> = self
            .referenced_column_names
            .iter()
            .zip(self.column_names.iter())
            .map(|(referenced, column)| {
                (
                    column.clone(),
                    master_row.get(referenced).cloned().unwrap_or(Value::Null),
                )
            })
            .collect();
        Value::Object(key).to_string()
    }
}

/// Column definitions, keys and CRUD capabilities of a data book.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaData {
    pub data_provider: String,
    #[serde(default)]
    pub columns: Vec<ColumnDefinition>,
    #[serde(default)]
    pub primary_key_columns: Vec<String>,
    #[serde(default)]
    pub insert_enabled: bool,
    #[serde(default)]
    pub update_enabled: bool,
    #[serde(default)]
    pub delete_enabled: bool,
    #[serde(default)]
    pub master_reference: Option<MasterReference>,
}

impl MetaData {
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }
}

// ============================================================================
// Selection / Sort
// ============================================================================

/// Selected row of a data book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedRow {
    pub data_row: Option<Row>,
    /// Index into the addressed page, -1 when nothing is selected.
    pub index: i64,
    #[serde(default)]
    pub tree_path: Option<Vec<i64>>,
    #[serde(default)]
    pub selected_column: Option<String>,
}

impl SelectedRow {
    pub fn none() -> Self {
        Self {
            data_row: None,
            index: -1,
            tree_path: None,
            selected_column: None,
        }
    }

    pub fn at(index: i64, data_row: Option<Row>) -> Self {
        Self {
            data_row,
            index,
            tree_path: None,
            selected_column: None,
        }
    }

    pub fn is_selected(&self) -> bool {
        self.index >= 0
    }
}

impl Default for SelectedRow {
    fn default() -> Self {
        Self::none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortMode {
    #[default]
    Ascending,
    Descending,
    Unsorted,
}

/// Sort state of one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortDefinition {
    pub column_name: String,
    #[serde(default)]
    pub mode: SortMode,
}
