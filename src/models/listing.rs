use serde::{Deserialize, Serialize};

/// One positional spreadsheet row. Column meaning is fixed per source type;
/// empty strings are valid for every column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRow(pub Vec<String>);

impl ListingRow {
    /// Title, URL, Price, Asset Type, Short Description
    pub fn marketplace(
        title: String,
        url: String,
        price: String,
        asset_type: String,
        short_description: String,
    ) -> Self {
        Self(vec![title, url, price, asset_type, short_description])
    }

    /// Title, Link, Description, Published
    pub fn feed(title: String, link: String, description: String, published: String) -> Self {
        Self(vec![title, link, description, published])
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    pub fn title(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    Marketplace,
    Feed,
}

impl SourceType {
    pub fn header(&self) -> &'static [&'static str] {
        match self {
            SourceType::Marketplace => &["Title", "URL", "Price", "Asset Type", "Short Description"],
            SourceType::Feed => &["Title", "Link", "Description", "Published"],
        }
    }
}
