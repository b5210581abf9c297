use crate::error::ConfigError;
use crate::types::*;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

type Result<T> = std::result::Result<T, ConfigError>;

/// Raw TOML configuration structure
/// This matches the site.toml file structure exactly
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    site: SiteInfo,
    #[serde(default)]
    paths: RawPaths,
    #[serde(default)]
    metadata: MetadataSchema,
    #[serde(default)]
    sections: BTreeMap<String, RawSection>,
    #[serde(default)]
    feed: RawFeed,
    #[serde(default)]
    plugins: RawPlugins,
    #[serde(default)]
    deploy: Option<RawDeploy>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPaths {
    content: Option<String>,
    resources: Option<String>,
    output: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSection {
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFeed {
    enabled: Option<bool>,
    max_items: Option<usize>,
    ttl: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPlugins {
    #[serde(default)]
    highlight: RawHighlight,
    favicon: Option<RawFavicon>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHighlight {
    enabled: Option<bool>,
    theme: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFavicon {
    source: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDeploy {
    github: Option<RawGitHub>,
    git: Option<RawGit>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGitHub {
    repository: String,
    #[serde(default = "default_branch")]
    branch: String,
    #[serde(default = "default_use_ssh")]
    use_ssh: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGit {
    remote: String,
    #[serde(default = "default_branch")]
    branch: String,
}

fn default_branch() -> String {
    "master".to_string()
}

fn default_use_ssh() -> bool {
    true
}

/// Parse site.toml from a file path
pub fn parse_site_toml<S: SectionId, P: AsRef<Path>>(path: P) -> Result<SiteConfig<S>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_site_toml_str(&content)
}

/// Parse site.toml from a string (useful for testing)
pub fn parse_site_toml_str<S: SectionId>(content: &str) -> Result<SiteConfig<S>> {
    let raw: RawConfig = toml::from_str(content)?;

    validate_site(&raw.site)?;

    let defaults = ContentPaths::default();
    let paths = ContentPaths {
        content: optional_path(raw.paths.content, "paths.content")?.unwrap_or(defaults.content),
        resources: optional_path(raw.paths.resources, "paths.resources")?
            .unwrap_or(defaults.resources),
        output: optional_path(raw.paths.output, "paths.output")?.unwrap_or(defaults.output),
    };

    // Section keys must name declared sections
    let mut section_titles = BTreeMap::new();
    for (tag, section) in raw.sections {
        let id = S::from_tag(&tag).ok_or_else(|| {
            ConfigError::invalid(format!(
                "Unknown section '{}'. Declared sections: {}",
                tag,
                S::all()
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })?;
        if let Some(title) = section.title {
            if title.trim().is_empty() {
                return Err(ConfigError::invalid(format!(
                    "Empty title for section '{}'",
                    tag
                )));
            }
            section_titles.insert(id, title);
        }
    }

    for key in &raw.metadata.required {
        if key.trim().is_empty() {
            return Err(ConfigError::invalid("Empty key in metadata.required"));
        }
    }

    let feed_defaults = FeedConfig::default();
    let feed = FeedConfig {
        enabled: raw.feed.enabled.unwrap_or(feed_defaults.enabled),
        max_items: raw.feed.max_items.unwrap_or(feed_defaults.max_items),
        ttl: raw.feed.ttl.unwrap_or(feed_defaults.ttl),
    };
    if feed.enabled && feed.max_items == 0 {
        return Err(ConfigError::invalid("feed.max_items must be at least 1"));
    }

    let highlight_defaults = HighlightConfig::default();
    let plugins = PluginsConfig {
        highlight: HighlightConfig {
            enabled: raw
                .plugins
                .highlight
                .enabled
                .unwrap_or(highlight_defaults.enabled),
            theme: raw
                .plugins
                .highlight
                .theme
                .unwrap_or(highlight_defaults.theme),
        },
        favicon: match raw.plugins.favicon {
            Some(favicon) => Some(FaviconConfig {
                source: validate_path(&favicon.source, "plugins.favicon.source")?,
            }),
            None => None,
        },
    };

    let deploy = match raw.deploy {
        None => None,
        Some(RawDeploy {
            github: Some(_),
            git: Some(_),
        }) => {
            return Err(ConfigError::invalid(
                "Configure either [deploy.github] or [deploy.git], not both",
            ));
        }
        Some(RawDeploy {
            github: Some(github),
            ..
        }) => {
            validate_repository(&github.repository)?;
            validate_branch(&github.branch)?;
            Some(DeploymentTarget::GitHub {
                repository: github.repository,
                branch: github.branch,
                use_ssh: github.use_ssh,
            })
        }
        Some(RawDeploy { git: Some(git), .. }) => {
            if git.remote.trim().is_empty() {
                return Err(ConfigError::invalid("Empty deploy.git.remote"));
            }
            validate_branch(&git.branch)?;
            Some(DeploymentTarget::Git {
                remote: git.remote,
                branch: git.branch,
            })
        }
        Some(RawDeploy {
            github: None,
            git: None,
        }) => None,
    };

    Ok(SiteConfig {
        site: raw.site,
        paths,
        sections: S::all().to_vec(),
        section_titles,
        metadata: raw.metadata,
        feed,
        plugins,
        deploy,
    })
}

fn validate_site(site: &SiteInfo) -> Result<()> {
    if !(site.url.starts_with("https://") || site.url.starts_with("http://")) {
        return Err(ConfigError::invalid(format!(
            "site.url must start with http:// or https://, got '{}'",
            site.url
        )));
    }
    if site.name.trim().is_empty() {
        return Err(ConfigError::invalid("site.name must not be empty"));
    }
    let language_ok = !site.language.is_empty()
        && !site.language.starts_with('-')
        && !site.language.ends_with('-')
        && site
            .language
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');
    if !language_ok {
        return Err(ConfigError::invalid(format!(
            "site.language must be a language tag such as 'en' or 'en-US', got '{}'",
            site.language
        )));
    }
    Ok(())
}

fn validate_repository(repository: &str) -> Result<()> {
    let mut parts = repository.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => Ok(()),
        _ => Err(ConfigError::invalid(format!(
            "deploy.github.repository must look like 'owner/name', got '{}'",
            repository
        ))),
    }
}

fn validate_branch(branch: &str) -> Result<()> {
    if branch.is_empty() || branch.starts_with('-') || branch.contains(char::is_whitespace) {
        return Err(ConfigError::invalid(format!(
            "Invalid deploy branch '{}'",
            branch
        )));
    }
    Ok(())
}

fn optional_path(path: Option<String>, field_name: &str) -> Result<Option<PathBuf>> {
    path.map(|p| validate_path(&p, field_name)).transpose()
}

/// Validate and convert a path string to PathBuf.
///
/// Rejects absolute paths and parent directory references (`..`) so a
/// site.toml can never point outside the site directory.
///
/// ```text
/// validate_path("Resources/favicon.png", "source")  → Ok(PathBuf)
/// validate_path("/etc/passwd", "source")            → Err("Absolute paths not allowed...")
/// validate_path("../secret", "output")              → Err("Parent directory references...")
/// ```
fn validate_path(path_str: &str, field_name: &str) -> Result<PathBuf> {
    let path = Path::new(path_str);

    if path.is_absolute() {
        return Err(ConfigError::invalid(format!(
            "Absolute paths not allowed in '{}': '{}'. Use relative paths only.",
            field_name, path_str
        )));
    }

    for component in path.components() {
        if component == Component::ParentDir {
            return Err(ConfigError::invalid(format!(
                "Parent directory references (..) not allowed in '{}': '{}'",
                field_name, path_str
            )));
        }
    }

    if path_str.trim().is_empty() {
        return Err(ConfigError::invalid(format!(
            "Empty path in '{}' field",
            field_name
        )));
    }

    Ok(path.to_path_buf())
}
