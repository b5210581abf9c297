use blog_kit_core::{ItemMetadata, LoadErrorKind, MetadataSchema, Tag};
use chrono::{NaiveDate, NaiveDateTime};
use serde_yaml_ng::Value;
use std::collections::BTreeMap;

const FENCE: &str = "---";

/// Metadata header of a content file, before schema checks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub extra: BTreeMap<String, String>,
}

/// Split a document into its `---` fenced header and the body.
///
/// Returns `Ok(None)` when the document has no header at all, and an error
/// when a header is opened but never closed.
pub fn split_front_matter(text: &str) -> Result<Option<(&str, &str)>, LoadErrorKind> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut lines = text.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return Ok(None);
    };
    if first.trim_end() != FENCE {
        return Ok(None);
    }

    let header_start = first.len();
    let mut offset = header_start;
    for line in lines {
        if line.trim_end() == FENCE {
            let header = &text[header_start..offset];
            let body = &text[offset + line.len()..];
            return Ok(Some((header, body)));
        }
        offset += line.len();
    }

    Err(LoadErrorKind::MalformedMetadata(
        "metadata header is never closed with '---'".to_string(),
    ))
}

impl FrontMatter {
    /// Parse the YAML between the fences
    pub fn parse(header: &str) -> Result<Self, LoadErrorKind> {
        let value: Value = serde_yaml_ng::from_str(header)
            .map_err(|e| LoadErrorKind::MalformedMetadata(e.to_string()))?;

        let mapping = match value {
            Value::Null => return Ok(FrontMatter::default()),
            Value::Mapping(mapping) => mapping,
            _ => {
                return Err(LoadErrorKind::MalformedMetadata(
                    "metadata header must be a list of 'key: value' pairs".to_string(),
                ));
            }
        };

        let mut front = FrontMatter::default();
        for (key, value) in mapping {
            let Value::String(key) = key else {
                return Err(LoadErrorKind::MalformedMetadata(
                    "metadata keys must be strings".to_string(),
                ));
            };
            match key.as_str() {
                "title" => front.title = scalar(&key, &value)?,
                "date" => front.date = scalar(&key, &value)?,
                "description" => front.description = scalar(&key, &value)?,
                "tags" => front.tags = tags(&value)?,
                _ => {
                    if let Some(v) = scalar(&key, &value)? {
                        front.extra.insert(key, v);
                    }
                }
            }
        }
        Ok(front)
    }

    /// Apply the required-field rules and produce item metadata
    pub fn into_metadata(self, schema: &MetadataSchema) -> Result<ItemMetadata, LoadErrorKind> {
        let title = self
            .title
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| LoadErrorKind::MissingField("title".to_string()))?;

        for key in &schema.required {
            let present = match key.as_str() {
                "date" => self.date.is_some(),
                "description" => self.description.is_some(),
                "tags" => !self.tags.is_empty(),
                _ => self.extra.contains_key(key),
            };
            if !present {
                return Err(LoadErrorKind::MissingField(key.clone()));
            }
        }

        let date = self.date.as_deref().map(parse_date).transpose()?;

        let mut tags: Vec<Tag> = Vec::new();
        for name in self.tags {
            let tag = Tag::new(name);
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        Ok(ItemMetadata {
            title: title.trim().to_string(),
            date,
            description: self.description.unwrap_or_default(),
            tags,
            extra: self.extra,
        })
    }
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM` and `YYYY-MM-DD HH:MM:SS`
pub fn parse_date(s: &str) -> Result<NaiveDateTime, LoadErrorKind> {
    let s = s.trim();
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| LoadErrorKind::InvalidDate(s.to_string()))
}

fn scalar(key: &str, value: &Value) -> Result<Option<String>, LoadErrorKind> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        _ => Err(LoadErrorKind::MalformedMetadata(format!(
            "value of '{}' must be a single value",
            key
        ))),
    }
}

/// Tags are either a YAML list or a comma separated string
fn tags(value: &Value) -> Result<Vec<String>, LoadErrorKind> {
    let raw: Vec<String> = match value {
        Value::Null => Vec::new(),
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        Value::Sequence(seq) => seq
            .iter()
            .map(|v| scalar("tags", v).map(Option::unwrap_or_default))
            .collect::<Result<_, _>>()?,
        _ => {
            return Err(LoadErrorKind::MalformedMetadata(
                "tags must be a list or a comma separated string".to_string(),
            ));
        }
    };
    Ok(raw
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_front_matter() {
        let doc = "---\ntitle: Hello\n---\nWorld\n";
        let (header, body) = split_front_matter(doc).unwrap().unwrap();
        assert_eq!(header, "title: Hello\n");
        assert_eq!(body, "World\n");
    }

    #[test]
    fn test_split_front_matter_crlf_and_bom() {
        let doc = "\u{feff}---\r\ntitle: Hello\r\n---\r\nWorld";
        let (header, body) = split_front_matter(doc).unwrap().unwrap();
        assert_eq!(header, "title: Hello\r\n");
        assert_eq!(body, "World");
    }

    #[test]
    fn test_split_front_matter_missing() {
        assert!(split_front_matter("# Just markdown\n").unwrap().is_none());
        assert!(split_front_matter("").unwrap().is_none());
    }

    #[test]
    fn test_split_front_matter_unclosed() {
        let err = split_front_matter("---\ntitle: Hello\nWorld\n").unwrap_err();
        assert!(matches!(err, LoadErrorKind::MalformedMetadata(_)));
    }

    #[test]
    fn test_body_keeps_later_rules() {
        let doc = "---\ntitle: A\n---\nabove\n\n---\n\nbelow\n";
        let (_, body) = split_front_matter(doc).unwrap().unwrap();
        assert_eq!(body, "above\n\n---\n\nbelow\n");
    }

    #[test]
    fn test_parse_full_header() {
        let header = "title: Hello\ndate: 2020-02-13 19:30\ndescription: First post\ntags: swift, llvm\nauthor: tg\ndraft: false\n";
        let front = FrontMatter::parse(header).unwrap();
        assert_eq!(front.title.as_deref(), Some("Hello"));
        assert_eq!(front.date.as_deref(), Some("2020-02-13 19:30"));
        assert_eq!(front.tags, vec!["swift", "llvm"]);
        assert_eq!(front.extra.get("author").map(String::as_str), Some("tg"));
        assert_eq!(front.extra.get("draft").map(String::as_str), Some("false"));
    }

    #[test]
    fn test_parse_tag_list() {
        let front = FrontMatter::parse("title: A\ntags:\n  - rust\n  - \" mlir \"\n  - \"\"\n").unwrap();
        assert_eq!(front.tags, vec!["rust", "mlir"]);
    }

    #[test]
    fn test_parse_empty_header() {
        assert_eq!(FrontMatter::parse("").unwrap(), FrontMatter::default());
    }

    #[test]
    fn test_parse_rejects_nested_values() {
        let err = FrontMatter::parse("title:\n  nested: true\n").unwrap_err();
        assert!(err.to_string().contains("'title'"));
    }

    #[test]
    fn test_parse_rejects_invalid_yaml() {
        assert!(matches!(
            FrontMatter::parse("title: [unclosed\n"),
            Err(LoadErrorKind::MalformedMetadata(_))
        ));
    }

    #[test]
    fn test_into_metadata_requires_title() {
        let front = FrontMatter::parse("date: 2020-01-01\n").unwrap();
        let err = front.into_metadata(&MetadataSchema::default()).unwrap_err();
        assert!(matches!(err, LoadErrorKind::MissingField(f) if f == "title"));

        let blank = FrontMatter::parse("title: \"  \"\n").unwrap();
        assert!(blank.into_metadata(&MetadataSchema::default()).is_err());
    }

    #[test]
    fn test_into_metadata_schema_required_keys() {
        let schema = MetadataSchema {
            required: vec!["author".to_string(), "date".to_string()],
        };
        let front = FrontMatter::parse("title: A\ndate: 2020-01-01\n").unwrap();
        let err = front.into_metadata(&schema).unwrap_err();
        assert!(matches!(err, LoadErrorKind::MissingField(f) if f == "author"));

        let front = FrontMatter::parse("title: A\ndate: 2020-01-01\nauthor: me\n").unwrap();
        assert!(front.into_metadata(&schema).is_ok());
    }

    #[test]
    fn test_into_metadata_dedups_tags() {
        let front = FrontMatter::parse("title: A\ntags: rust, llvm, rust\n").unwrap();
        let meta = front.into_metadata(&MetadataSchema::default()).unwrap();
        assert_eq!(meta.tags, vec![Tag::new("rust"), Tag::new("llvm")]);
    }

    #[test]
    fn test_parse_date_formats() {
        let d = parse_date("2020-02-13").unwrap();
        assert_eq!(d.to_string(), "2020-02-13 00:00:00");
        let d = parse_date("2020-02-13 19:30").unwrap();
        assert_eq!(d.to_string(), "2020-02-13 19:30:00");
        let d = parse_date("2020-02-13 19:30:05").unwrap();
        assert_eq!(d.to_string(), "2020-02-13 19:30:05");
        assert!(matches!(
            parse_date("13/02/2020"),
            Err(LoadErrorKind::InvalidDate(_))
        ));
    }
}
