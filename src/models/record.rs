use serde::{Deserialize, Serialize};

/// Sentinel term for courses that were transferred or waived rather than
/// taken with an SCU instructor. Sorts as if dated Fall 2000.
pub const NOT_TAKEN_TERM: &str = "Not taken at SCU";

/// A completed course, decoded from a `P{..}C{..}T{..}` token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TakenCourse {
    pub professor_name: String,
    pub course_code: String,
    pub course_name: String,
    pub term: String,
    /// The original encoded token, kept when the caller needs to issue a
    /// follow-up remove/edit referencing this exact entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// A saved (not-yet-enrolled) section, decoded from a `P{..}S{..}M{..}`
/// token. The expiration timestamp is stored out-of-band as the map value
/// under the encoded key, not embedded in the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestedSection {
    pub professor_name: String,
    pub course_code: String,
    pub course_name: String,
    pub meeting_pattern: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}
