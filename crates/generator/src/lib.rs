//! Site generation: markdown rendering, the theme contract, transform
//! plugins, feed and sitemap output, and the atomic output writer.

pub mod feed;
pub mod markdown;
pub mod node;
pub mod plugins;
pub mod site;
pub mod sitemap;
pub mod theme;
pub mod writer;

pub use node::{Document, Element, Node};
pub use plugins::{Favicon, Highlighter, Plugin, apply_body_plugins, apply_output_plugins};
pub use site::{OutputFile, OutputTree, render_site};
pub use theme::{BasicTheme, Theme};
pub use writer::{OutputWriter, WriteReport};
