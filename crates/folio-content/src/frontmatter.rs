//! Front-matter extraction and parsing.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

/// Line that opens and closes a front-matter block.
pub const DELIMITER: &str = "---";

/// Parsed front-matter from a content file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrontMatter {
    /// Page title
    pub title: Option<String>,

    /// Publish timestamp
    pub date: Option<DateTime<FixedOffset>>,

    /// Excluded from published output unless drafts are requested
    pub draft: bool,

    /// Short summary used on listing pages
    pub description: Option<String>,

    /// Tags in declaration order
    pub tags: Vec<String>,

    /// Custom slug override
    pub slug: Option<String>,

    /// Unrecognized keys, kept in source order and passed through untouched
    pub extra: Mapping,
}

/// Errors that can occur when parsing front-matter.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetadataError {
    #[error("unclosed front-matter block - missing closing ---")]
    Unclosed,

    #[error("invalid YAML in front-matter: {0}")]
    InvalidYaml(String),

    #[error("front-matter must be a mapping of keys to values")]
    NotAMapping,

    #[error("front-matter field `{key}` must be {expected}, found {found}")]
    InvalidField {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("front-matter field `date` is not an ISO 8601 timestamp: {value:?}")]
    InvalidDate { value: String },

    #[error("slug {value:?} has no usable characters")]
    EmptySlug { value: String },

    #[error("slug `{slug}` is already used by {first}")]
    DuplicateSlug { slug: String, first: String },
}

/// Extract front-matter from a content file.
///
/// Returns the parsed front-matter and the remaining content after the closing
/// delimiter. Files that do not open with a `---` line have no front-matter.
pub fn extract_frontmatter(source: &str) -> Result<(Option<FrontMatter>, &str), MetadataError> {
    let trimmed = source.trim_start();

    let (first, mut remaining) = split_line(trimmed);
    if first.trim_end() != DELIMITER {
        return Ok((None, source));
    }

    let block = remaining;
    let mut block_len = 0;

    loop {
        if remaining.is_empty() {
            return Err(MetadataError::Unclosed);
        }

        let (line, next) = split_line(remaining);
        if line.trim_end() == DELIMITER {
            let frontmatter = parse_block(&block[..block_len])?;
            return Ok((Some(frontmatter), next));
        }

        block_len += remaining.len() - next.len();
        remaining = next;
    }
}

fn split_line(s: &str) -> (&str, &str) {
    match s.find('\n') {
        Some(i) => (&s[..i], &s[i + 1..]),
        None => (s, ""),
    }
}

/// Recognized keys as they appear in the block, before type checks.
///
/// Fields stay untyped so a wrong type reports the key by name.
#[derive(Debug, Default, Deserialize)]
struct RawFrontMatter {
    #[serde(default)]
    title: Option<Value>,
    #[serde(default)]
    date: Option<Value>,
    #[serde(default)]
    draft: Option<Value>,
    #[serde(default)]
    description: Option<Value>,
    #[serde(default)]
    tags: Option<Value>,
    #[serde(default)]
    slug: Option<Value>,
    #[serde(flatten)]
    extra: Mapping,
}

/// Parse the YAML between the delimiters into typed fields.
fn parse_block(yaml: &str) -> Result<FrontMatter, MetadataError> {
    if yaml.trim().is_empty() {
        return Ok(FrontMatter::default());
    }

    let value: Value =
        serde_yaml::from_str(yaml).map_err(|e| MetadataError::InvalidYaml(e.to_string()))?;
    if !value.is_mapping() {
        return Err(MetadataError::NotAMapping);
    }

    let raw: RawFrontMatter =
        serde_yaml::from_value(value).map_err(|e| MetadataError::InvalidYaml(e.to_string()))?;

    let date = match raw.date {
        Some(value) => {
            let text = value
                .as_str()
                .ok_or_else(|| invalid("date", "a timestamp string", &value))?;
            Some(parse_timestamp(text)?)
        }
        None => None,
    };

    Ok(FrontMatter {
        title: raw.title.map(|v| expect_string("title", v)).transpose()?,
        date,
        draft: match raw.draft {
            Some(value) => value
                .as_bool()
                .ok_or_else(|| invalid("draft", "a boolean", &value))?,
            None => false,
        },
        description: raw
            .description
            .map(|v| expect_string("description", v))
            .transpose()?,
        tags: raw
            .tags
            .map(|v| expect_string_list("tags", v))
            .transpose()?
            .unwrap_or_default(),
        slug: raw.slug.map(|v| expect_string("slug", v)).transpose()?,
        extra: raw.extra,
    })
}

fn expect_string(key: &str, value: Value) -> Result<String, MetadataError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(invalid(key, "a string", &other)),
    }
}

fn expect_string_list(key: &str, value: Value) -> Result<Vec<String>, MetadataError> {
    let Value::Sequence(items) = value else {
        return Err(invalid(key, "a sequence of strings", &value));
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            other => Err(invalid(key, "a sequence of strings", &other)),
        })
        .collect()
}

fn invalid(key: &str, expected: &'static str, found: &Value) -> MetadataError {
    MetadataError::InvalidField {
        key: key.to_string(),
        expected,
        found: kind_of(found),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Parse an ISO 8601 timestamp.
///
/// Accepts RFC 3339 (`2024-03-01T09:30:00+02:00`), a date and time without
/// offset (read as UTC), and a bare date (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, MetadataError> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt);
    }

    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S %z") {
        return Ok(dt);
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
        .ok_or_else(|| MetadataError::InvalidDate {
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_valid_frontmatter() {
        let source = r#"---
title: "First Post"
date: 2024-01-15T10:00:00Z
draft: false
description: An introduction
tags: ["hugo", "papermod"]
---

# First Post
"#;

        let (fm, content) = extract_frontmatter(source).unwrap();
        let fm = fm.unwrap();

        assert_eq!(fm.title.as_deref(), Some("First Post"));
        assert_eq!(fm.description.as_deref(), Some("An introduction"));
        assert!(!fm.draft);
        assert_eq!(fm.tags, vec!["hugo", "papermod"]);
        assert_eq!(
            fm.date.unwrap().to_rfc3339(),
            "2024-01-15T10:00:00+00:00"
        );
        assert!(content.trim_start().starts_with("# First Post"));
    }

    #[test]
    fn handles_no_frontmatter() {
        let source = "# Just Markdown\n\nNo front-matter here.";

        let (fm, content) = extract_frontmatter(source).unwrap();

        assert!(fm.is_none());
        assert_eq!(content, source);
    }

    #[test]
    fn handles_empty_block() {
        let (fm, content) = extract_frontmatter("---\n---\nbody").unwrap();

        assert_eq!(fm, Some(FrontMatter::default()));
        assert_eq!(content, "body");
    }

    #[test]
    fn errors_on_unclosed_frontmatter() {
        let source = "---\ntitle: Test\n# No closing";

        let result = extract_frontmatter(source);

        assert!(matches!(result, Err(MetadataError::Unclosed)));
    }

    #[test]
    fn longer_dash_runs_do_not_close_the_block() {
        let result = extract_frontmatter("---\ntitle: Test\n----\nbody");

        assert!(matches!(result, Err(MetadataError::Unclosed)));
    }

    #[test]
    fn errors_on_invalid_yaml() {
        let source = "---\ntitle: [invalid yaml\n---\n";

        let result = extract_frontmatter(source);

        assert!(matches!(result, Err(MetadataError::InvalidYaml(_))));
    }

    #[test]
    fn errors_on_non_mapping_block() {
        let result = extract_frontmatter("---\n- a\n- b\n---\n");

        assert!(matches!(result, Err(MetadataError::NotAMapping)));
    }

    #[test]
    fn errors_on_wrong_field_types() {
        let result = extract_frontmatter("---\ndraft: \"yes\"\n---\n");
        assert_eq!(
            result.unwrap_err(),
            MetadataError::InvalidField {
                key: "draft".to_string(),
                expected: "a boolean",
                found: "a string",
            }
        );

        let result = extract_frontmatter("---\ntags: [1, 2]\n---\n");
        assert!(matches!(
            result,
            Err(MetadataError::InvalidField { ref key, .. }) if key == "tags"
        ));
    }

    #[test]
    fn errors_on_invalid_date() {
        let result = extract_frontmatter("---\ndate: last tuesday\n---\n");

        assert_eq!(
            result.unwrap_err(),
            MetadataError::InvalidDate {
                value: "last tuesday".to_string()
            }
        );
    }

    #[test]
    fn preserves_unrecognized_keys_in_order() {
        let source = "---\ntitle: T\ncover: cover.png\nweight: 3\nauthor: ann\n---\n";

        let (fm, _) = extract_frontmatter(source).unwrap();
        let keys: Vec<_> = fm
            .unwrap()
            .extra
            .keys()
            .filter_map(|k| k.as_str().map(str::to_string))
            .collect();

        assert_eq!(keys, vec!["cover", "weight", "author"]);
    }

    #[test]
    fn parses_timestamp_forms() {
        let with_offset = parse_timestamp("2024-03-01T09:30:00+02:00").unwrap();
        assert_eq!(with_offset.to_rfc3339(), "2024-03-01T09:30:00+02:00");

        let naive = parse_timestamp("2024-03-01T09:30:00").unwrap();
        assert_eq!(naive.to_rfc3339(), "2024-03-01T09:30:00+00:00");

        let date_only = parse_timestamp("2024-03-01").unwrap();
        assert_eq!(date_only.to_rfc3339(), "2024-03-01T00:00:00+00:00");

        assert!(parse_timestamp("03/01/2024").is_err());
    }
}
