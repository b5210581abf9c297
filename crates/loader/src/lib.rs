//! Content discovery and parsing.
//!
//! Walks `<content>/<section>/<item>.md`, splits each file into its YAML
//! metadata header and markdown body, and groups the resulting items by
//! section.

mod front_matter;
mod loader;

pub use front_matter::{FrontMatter, parse_date, split_front_matter};
pub use loader::{ContentLoader, Source, SourceKind};
