pub mod config;
pub mod error;
pub mod types;

pub use config::{parse_site_toml, parse_site_toml_str};
pub use error::*;
pub use types::*;
