//! Topic codec
//!
//! Topics are `.`-delimited strings. Publishers address a base topic such as
//! `todos.Task.create`; a special subscriber listens on the base topic plus a
//! unique suffix (`todos.Task.create.2882717310567`) and receives filtered
//! copies there. Fields are not escaped, so they must not contain `.`.

use crate::utils::error::TopicError;

pub const DELIMITER: char = '.';

/// `{app}.{kind}.{operation}` with the operation lower-cased.
pub fn build_topic(app: &str, kind: &str, operation: &str) -> String {
    format!("{app}{DELIMITER}{kind}{DELIMITER}{}", operation.to_lowercase())
}

/// Joins `parts` with the delimiter.
pub fn build_topic_arbitrary<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut topic = String::new();
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            topic.push(DELIMITER);
        }
        topic.push_str(part.as_ref());
    }
    topic
}

/// Splits a special topic into `(base_topic, unique_id)`.
///
/// The unique id is the last segment; everything before it is the base.
pub fn split_special_topic(topic: &str) -> Result<(&str, &str), TopicError> {
    let (base, unique) = topic
        .rsplit_once(DELIMITER)
        .ok_or_else(|| TopicError::MissingSuffix(topic.to_string()))?;

    if base.is_empty() {
        return Err(TopicError::EmptyBase(topic.to_string()));
    }

    Ok((base, unique))
}
