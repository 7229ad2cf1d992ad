//! Lenient deserializers for form-style inputs.
//!
//! Browser clients send booleans and numbers either as JSON scalars or as
//! strings (multipart and query strings only carry text).

use serde::{Deserialize, Deserializer, de::Error};

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolOrText {
    Bool(bool),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrText {
    Int(i64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagsOrText {
    List(Vec<String>),
    Text(String),
}

/// Interpret a form flag. Only a real `true` or the literal string `"true"` is truthy.
pub fn parse_flag(value: &str) -> bool {
    value.trim() == "true"
}

/// Parse an optional integer out of form text; blank means absent.
pub fn parse_int(value: &str) -> Result<Option<i32>, std::num::ParseIntError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed.parse().map(Some)
}

/// Split comma-separated tags, dropping blanks.
pub fn split_tags(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// `Option<bool>` accepting `true`/`false` or strings; missing and `null` map to `None`.
pub fn opt_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<BoolOrText>::deserialize(deserializer)?.map(|value| match value {
            BoolOrText::Bool(b) => b,
            BoolOrText::Text(s) => parse_flag(&s),
        }),
    )
}

/// `bool` with the same leniency as [`opt_flag`]; missing and `null` are `false`.
pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    opt_flag(deserializer).map(|value| value.unwrap_or(false))
}

/// `Option<i32>` accepting numbers or numeric strings.
pub fn opt_int<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<IntOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(IntOrText::Int(n)) => i32::try_from(n)
            .map(Some)
            .map_err(|_| D::Error::custom(format!("integer out of range: {n}"))),
        Some(IntOrText::Text(s)) => {
            parse_int(&s).map_err(|_| D::Error::custom(format!("expected an integer, got {s:?}")))
        }
    }
}

/// `Option<Vec<String>>` accepting a JSON list or a comma-separated string.
pub fn opt_tags<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<TagsOrText>::deserialize(deserializer)?.map(|value| match value {
            TagsOrText::List(tags) => tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            TagsOrText::Text(s) => split_tags(&s),
        }),
    )
}
