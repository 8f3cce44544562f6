pub mod feed;
pub mod html;

pub use feed::{extract_feed, has_entries, parse_entries};
pub use html::{extract_html, ListingLayout};
