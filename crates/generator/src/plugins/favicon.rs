use super::Plugin;
use crate::node::el;
use crate::site::OutputTree;
use anyhow::Context;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::PathBuf;

/// (file name, edge length, `rel` of the injected link)
const ICONS: &[(&str, u32, &str)] = &[
    ("favicon-16x16.png", 16, "icon"),
    ("favicon-32x32.png", 32, "icon"),
    ("apple-touch-icon.png", 180, "apple-touch-icon"),
];

/// Generates favicons from one source image and links them from every page.
pub struct Favicon {
    source: PathBuf,
}

impl Favicon {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

fn encode(image: &DynamicImage, size: u32, format: ImageFormat) -> anyhow::Result<Vec<u8>> {
    let mut bytes = Cursor::new(Vec::new());
    image
        .resize_exact(size, size, FilterType::Lanczos3)
        .write_to(&mut bytes, format)
        .with_context(|| format!("failed to encode {size}x{size} icon"))?;
    Ok(bytes.into_inner())
}

impl Plugin for Favicon {
    fn name(&self) -> &str {
        "favicon"
    }

    fn transform_output(&self, tree: &mut OutputTree) -> anyhow::Result<()> {
        let image = image::open(&self.source)
            .with_context(|| format!("failed to read {}", self.source.display()))?;

        for &(file, size, _) in ICONS {
            tree.insert_asset(file, encode(&image, size, ImageFormat::Png)?)?;
        }
        tree.insert_asset("favicon.ico", encode(&image, 32, ImageFormat::Ico)?)?;

        for page in tree.pages_mut() {
            for &(file, size, rel) in ICONS {
                let mut link = el("link").attr("rel", rel);
                if rel == "icon" {
                    link = link.attr("type", "image/png");
                }
                page.head.push(
                    link.attr("sizes", format!("{size}x{size}"))
                        .attr("href", format!("/{file}"))
                        .into(),
                );
            }
        }
        Ok(())
    }
}
