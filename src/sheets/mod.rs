pub mod auth;
pub mod google;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::SinkError;
use crate::models::{ListingRow, SheetTarget, SpreadsheetRef};

pub use google::GoogleSheets;

/// The spreadsheet operations publishing needs.
#[async_trait]
pub trait SheetsApi: Send + Sync {
    async fn resolve_spreadsheet(&self, spreadsheet: &SpreadsheetRef) -> Result<String, SinkError>;
    async fn tab_titles(&self, spreadsheet_id: &str) -> Result<Vec<String>, SinkError>;
    async fn clear_tab(&self, spreadsheet_id: &str, tab: &str) -> Result<(), SinkError>;
    /// Writes `values` starting at the tab's top-left cell.
    async fn write_rows(
        &self,
        spreadsheet_id: &str,
        tab: &str,
        values: &[Vec<String>],
    ) -> Result<(), SinkError>;
}

#[async_trait]
pub trait Sink: Send + Sync {
    /// Replaces the tab's content with `header` followed by `rows` and
    /// returns the number of data rows written.
    async fn publish(
        &self,
        header: &[String],
        rows: &[ListingRow],
        target: &SheetTarget,
    ) -> Result<usize, SinkError>;
}

/// Full-overwrite publishing on top of any [`SheetsApi`].
///
/// The clear and the write are separate calls. If the process dies between
/// them the tab stays empty until the next successful run.
pub struct SheetSink<A> {
    api: A,
}

impl<A: SheetsApi> SheetSink<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    #[cfg(test)]
    pub(crate) fn api(&self) -> &A {
        &self.api
    }
}

#[async_trait]
impl<A: SheetsApi> Sink for SheetSink<A> {
    async fn publish(
        &self,
        header: &[String],
        rows: &[ListingRow],
        target: &SheetTarget,
    ) -> Result<usize, SinkError> {
        if let SpreadsheetRef::Name(name) = &target.spreadsheet {
            warn!(name = %name, "Spreadsheet addressed by name, which breaks on rename");
        }
        let spreadsheet_id = self.api.resolve_spreadsheet(&target.spreadsheet).await?;

        let tabs = self.api.tab_titles(&spreadsheet_id).await?;
        if !tabs.iter().any(|t| t == &target.tab) {
            return Err(SinkError::TabNotFound {
                spreadsheet: target.spreadsheet.to_string(),
                tab: target.tab.clone(),
            });
        }

        let values: Vec<Vec<String>> = std::iter::once(header.to_vec())
            .chain(rows.iter().map(|row| row.fields().to_vec()))
            .collect();

        info!("Writing {} listings to {} tab...", rows.len(), target.tab);
        self.api.clear_tab(&spreadsheet_id, &target.tab).await?;
        self.api
            .write_rows(&spreadsheet_id, &target.tab, &values)
            .await?;

        Ok(rows.len())
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-process stand-in for a spreadsheet service. Writes overwrite cells
    /// from the top-left and leave any rows below untouched, like the real API.
    #[derive(Default)]
    pub(crate) struct MemorySheets {
        names: HashMap<String, String>,
        tabs: Mutex<HashMap<(String, String), Vec<Vec<String>>>>,
        calls: Mutex<Vec<String>>,
    }

    impl MemorySheets {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn with_tab(self, spreadsheet_id: &str, tab: &str, content: Vec<Vec<String>>) -> Self {
            self.tabs
                .lock()
                .unwrap()
                .insert((spreadsheet_id.to_string(), tab.to_string()), content);
            self
        }

        pub(crate) fn with_name(mut self, name: &str, spreadsheet_id: &str) -> Self {
            self.names.insert(name.to_string(), spreadsheet_id.to_string());
            self
        }

        pub(crate) fn content(&self, spreadsheet_id: &str, tab: &str) -> Vec<Vec<String>> {
            self.tabs
                .lock()
                .unwrap()
                .get(&(spreadsheet_id.to_string(), tab.to_string()))
                .cloned()
                .unwrap_or_default()
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl SheetsApi for MemorySheets {
        async fn resolve_spreadsheet(&self, spreadsheet: &SpreadsheetRef) -> Result<String, SinkError> {
            match spreadsheet {
                SpreadsheetRef::Id(id) => Ok(id.clone()),
                SpreadsheetRef::Name(name) => self
                    .names
                    .get(name)
                    .cloned()
                    .ok_or_else(|| SinkError::SpreadsheetNotFound(spreadsheet.to_string())),
            }
        }

        async fn tab_titles(&self, spreadsheet_id: &str) -> Result<Vec<String>, SinkError> {
            let tabs = self.tabs.lock().unwrap();
            let titles: Vec<String> = tabs
                .keys()
                .filter(|(id, _)| id == spreadsheet_id)
                .map(|(_, tab)| tab.clone())
                .collect();
            if titles.is_empty() {
                return Err(SinkError::SpreadsheetNotFound(spreadsheet_id.to_string()));
            }
            Ok(titles)
        }

        async fn clear_tab(&self, spreadsheet_id: &str, tab: &str) -> Result<(), SinkError> {
            self.record(format!("clear {}", tab));
            self.tabs
                .lock()
                .unwrap()
                .insert((spreadsheet_id.to_string(), tab.to_string()), Vec::new());
            Ok(())
        }

        async fn write_rows(
            &self,
            spreadsheet_id: &str,
            tab: &str,
            values: &[Vec<String>],
        ) -> Result<(), SinkError> {
            self.record(format!("write {} {}", tab, values.len()));
            let mut tabs = self.tabs.lock().unwrap();
            let grid = tabs
                .entry((spreadsheet_id.to_string(), tab.to_string()))
                .or_default();
            for (i, row) in values.iter().enumerate() {
                if i < grid.len() {
                    grid[i] = row.clone();
                } else {
                    grid.push(row.clone());
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemorySheets;
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn header() -> Vec<String> {
        strings(&["Title", "Link", "Description", "Published"])
    }

    fn rows() -> Vec<ListingRow> {
        vec![
            ListingRow(strings(&["Bakery", "https://x/1", "Bread", "Mon"])),
            ListingRow(strings(&["Car Wash", "https://x/2", "", ""])),
        ]
    }

    fn target() -> SheetTarget {
        SheetTarget::new(SpreadsheetRef::Id("sheet-1".to_string()), "BizBuySell")
    }

    #[tokio::test]
    async fn publish_writes_header_then_rows() {
        let sink = SheetSink::new(MemorySheets::new().with_tab("sheet-1", "BizBuySell", vec![]));

        let written = sink.publish(&header(), &rows(), &target()).await.unwrap();

        assert_eq!(written, 2);
        assert_eq!(
            sink.api.content("sheet-1", "BizBuySell"),
            vec![
                header(),
                strings(&["Bakery", "https://x/1", "Bread", "Mon"]),
                strings(&["Car Wash", "https://x/2", "", ""]),
            ]
        );
        assert_eq!(sink.api.calls(), vec!["clear BizBuySell", "write BizBuySell 3"]);
    }

    #[tokio::test]
    async fn publish_replaces_longer_previous_content() {
        let stale: Vec<Vec<String>> = (0..10).map(|i| strings(&[format!("old {}", i).as_str()])).collect();
        let sink = SheetSink::new(MemorySheets::new().with_tab("sheet-1", "BizBuySell", stale));

        sink.publish(&header(), &rows(), &target()).await.unwrap();

        assert_eq!(sink.api.content("sheet-1", "BizBuySell").len(), 3);
    }

    #[tokio::test]
    async fn publishing_twice_matches_publishing_once() {
        let once = SheetSink::new(MemorySheets::new().with_tab("sheet-1", "BizBuySell", vec![]));
        once.publish(&header(), &rows(), &target()).await.unwrap();

        let twice = SheetSink::new(MemorySheets::new().with_tab("sheet-1", "BizBuySell", vec![]));
        twice.publish(&header(), &rows(), &target()).await.unwrap();
        twice.publish(&header(), &rows(), &target()).await.unwrap();

        assert_eq!(
            once.api.content("sheet-1", "BizBuySell"),
            twice.api.content("sheet-1", "BizBuySell")
        );
    }

    #[tokio::test]
    async fn missing_tab_is_fatal_and_nothing_is_cleared() {
        let sink = SheetSink::new(MemorySheets::new().with_tab("sheet-1", "Other", vec![strings(&["keep"])]));

        let err = sink.publish(&header(), &rows(), &target()).await.unwrap_err();

        assert!(matches!(err, SinkError::TabNotFound { ref tab, .. } if tab == "BizBuySell"));
        assert!(sink.api.calls().is_empty());
        assert_eq!(sink.api.content("sheet-1", "Other"), vec![strings(&["keep"])]);
    }

    #[tokio::test]
    async fn unknown_spreadsheet_is_not_found() {
        let sink = SheetSink::new(MemorySheets::new());
        let err = sink.publish(&header(), &rows(), &target()).await.unwrap_err();
        assert!(matches!(err, SinkError::SpreadsheetNotFound(_)));
    }

    #[tokio::test]
    async fn name_reference_resolves_to_id() {
        let sink = SheetSink::new(
            MemorySheets::new()
                .with_name("BizBuySell Listings", "sheet-1")
                .with_tab("sheet-1", "BizBuySell", vec![]),
        );
        let target = SheetTarget::new(
            SpreadsheetRef::Name("BizBuySell Listings".to_string()),
            "BizBuySell",
        );

        sink.publish(&header(), &[], &target).await.unwrap();

        assert_eq!(sink.api.content("sheet-1", "BizBuySell"), vec![header()]);
    }
}
