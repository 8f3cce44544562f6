use serde::{Deserialize, Serialize};
use std::fmt;

/// How the target spreadsheet is located. `Id` is stable; `Name` breaks
/// silently when the document is renamed and is kept only for old setups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpreadsheetRef {
    Id(String),
    Name(String),
}

impl fmt::Display for SpreadsheetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpreadsheetRef::Id(id) => write!(f, "id:{}", id),
            SpreadsheetRef::Name(name) => write!(f, "name:'{}'", name),
        }
    }
}

/// A tab inside a spreadsheet; its whole content is replaced on every publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetTarget {
    pub spreadsheet: SpreadsheetRef,
    pub tab: String,
}

impl SheetTarget {
    pub fn new(spreadsheet: SpreadsheetRef, tab: impl Into<String>) -> Self {
        Self {
            spreadsheet,
            tab: tab.into(),
        }
    }
}
