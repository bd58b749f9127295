//! Encoding and decoding of taken-course and interested-section tokens.
//!
//! Tokens are single-line strings used as map keys in persisted storage:
//!
//! - taken course:       `P{<prof>}C{<courseCodeAndName>}T{<term>}`
//! - interested section: `P{<prof>}S{<courseCodeAndName>}M{<meetingPattern>}`
//!
//! The course group is `"<code> - <name>"`, optionally terminated with the
//! marker `(-)` (or `((-))` for names that themselves contain a hyphen).
//! Braces are not escaped; professor and course names are assumed not to
//! contain them.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::warn;

use crate::error::AppError;
use crate::models::record::{InterestedSection, NOT_TAKEN_TERM, TakenCourse};

/// Quarters in most-recent-first order within a year.
const QUARTERS: [&str; 4] = ["Fall", "Summer", "Spring", "Winter"];

pub fn encode_taken(professor: &str, course_code_and_name: &str, term: &str) -> String {
    format!("P{{{professor}}}C{{{course_code_and_name}}}T{{{term}}}")
}

pub fn encode_interested(professor: &str, course_code_and_name: &str, meeting_pattern: &str) -> String {
    format!("P{{{professor}}}S{{{course_code_and_name}}}M{{{meeting_pattern}}}")
}

/// Splits a token into its three delimited groups. Each group is the
/// shortest run up to the next tag (non-greedy).
fn capture3<'a>(token: &'a str, mid_tag: &str, tail_tag: &str) -> Option<(&'a str, &'a str, &'a str)> {
    let start = token.find("P{")?;
    let rest = &token[start + 2..];
    let mid = rest.find(mid_tag)?;
    let professor = &rest[..mid];
    let rest = &rest[mid + mid_tag.len()..];
    let tail = rest.find(tail_tag)?;
    let course_group = &rest[..tail];
    let rest = &rest[tail + tail_tag.len()..];
    let end = rest.find('}')?;
    Some((professor, course_group, &rest[..end]))
}

/// Splits the course group of a taken-course token into (code, name).
///
/// The first `-` is the code/name boundary. A second `-` within 5 characters
/// of the first moves the name start instead (cross-listed codes with an
/// embedded dash). The display name ends at `((-))` or `(-)` when present.
fn split_taken_course_group(group: &str) -> (String, String) {
    let (code_end, name_start) = match group.find('-') {
        Some(first) => {
            let second = group[first + 1..].find('-').map(|i| first + 1 + i);
            match second {
                Some(second) if second - first <= 5 => (first, second + 1),
                _ => (first, first + 1),
            }
        }
        None => (0, 0),
    };
    let name_end = terminator_index(group, true);
    (
        strip_whitespace(&group[..code_end]),
        slice_lenient(group, name_start, name_end).trim().to_string(),
    )
}

/// Same as above but for interested sections: first-dash boundary only, and
/// only the single-paren terminator is recognized.
fn split_interested_course_group(group: &str) -> (String, String) {
    let (code_end, name_start) = match group.find('-') {
        Some(first) => (first, first + 1),
        None => (0, 0),
    };
    let name_end = terminator_index(group, false);
    (
        strip_whitespace(&group[..code_end]),
        slice_lenient(group, name_start, name_end).trim().to_string(),
    )
}

fn terminator_index(group: &str, double_paren: bool) -> usize {
    if double_paren {
        if let Some(i) = group.find("((-))") {
            return i;
        }
    }
    group.find("(-)").unwrap_or(group.len())
}

/// Substring that tolerates a terminator appearing before the name start.
fn slice_lenient(s: &str, start: usize, end: usize) -> &str {
    let (a, b) = if start <= end { (start, end) } else { (end, start) };
    &s[a.min(s.len())..b.min(s.len())]
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

pub fn decode_taken(token: &str, include_key: bool) -> Result<TakenCourse, AppError> {
    let (professor, course_group, term) = capture3(token, "}C{", "}T{")
        .ok_or_else(|| AppError::MalformedRecord(token.to_string()))?;
    let (course_code, course_name) = split_taken_course_group(course_group);
    Ok(TakenCourse {
        professor_name: if professor.is_empty() {
            "unknown".to_string()
        } else {
            professor.to_string()
        },
        course_code,
        course_name,
        term: term.to_string(),
        key: include_key.then(|| token.to_string()),
    })
}

pub fn decode_interested(token: &str, include_key: bool) -> Result<InterestedSection, AppError> {
    let (professor, course_group, meeting_group) = capture3(token, "}S{", "}M{")
        .ok_or_else(|| AppError::MalformedRecord(token.to_string()))?;
    let (course_code, course_name) = split_interested_course_group(course_group);
    Ok(InterestedSection {
        professor_name: professor.to_string(),
        course_code,
        course_name,
        meeting_pattern: format_meeting_pattern(meeting_group),
        key: include_key.then(|| token.to_string()),
    })
}

/// Reformats a raw `"days | start - end | location"` meeting group into a
/// compact display string like `"M W F at 9:15am-10:20am"`. Anything that
/// does not split into at least two fields passes through unchanged.
pub fn format_meeting_pattern(raw: &str) -> String {
    let parts: Vec<&str> = raw.split(" | ").collect();
    let (days, time) = match parts.len() {
        0 | 1 => return raw.to_string(),
        2 => (parts[0].to_string(), parts[1]),
        n => (parts[..n - 2].join(" | "), parts[n - 2]),
    };
    let time = time.replace(' ', "").replace(":00", "").to_lowercase();
    format!("{days} at {time}")
}

/// Decodes every token, dropping (and logging) unparseable ones, then sorts
/// most recent term first.
pub fn decode_taken_courses<'a, I>(tokens: I, include_key: bool) -> Vec<TakenCourse>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut courses: Vec<TakenCourse> = tokens
        .into_iter()
        .filter_map(|token| match decode_taken(token, include_key) {
            Ok(course) => Some(course),
            Err(_) => {
                warn!("skipping unparseable taken course: {}", token);
                None
            }
        })
        .collect();
    courses.sort_by(most_recent_term_first);
    courses
}

/// Decodes the keys of an interested-sections map, dropping unparseable ones.
pub fn decode_interested_sections(
    sections: &BTreeMap<String, String>,
    include_key: bool,
) -> Vec<InterestedSection> {
    sections
        .keys()
        .filter_map(|token| match decode_interested(token, include_key) {
            Ok(section) => Some(section),
            Err(_) => {
                warn!("skipping unparseable interested section: {}", token);
                None
            }
        })
        .collect()
}

/// Comparator placing the most recent term first: year descending, then a
/// fixed quarter priority (Fall > Summer > Spring > Winter) for same-year
/// ties, then course code for identical terms. The `"Not taken at SCU"`
/// sentinel (and an empty term) sorts as Fall 2000, pushing transferred
/// courses to the bottom.
pub fn most_recent_term_first(a: &TakenCourse, b: &TakenCourse) -> Ordering {
    let term_a = normalize_term(&a.term);
    let term_b = normalize_term(&b.term);
    if term_a == term_b {
        return a.course_code.cmp(&b.course_code);
    }
    let (quarter_a, year_a) = split_term(term_a);
    let (quarter_b, year_b) = split_term(term_b);
    if year_a == year_b {
        quarter_rank(quarter_a).cmp(&quarter_rank(quarter_b))
    } else {
        year_b.cmp(&year_a)
    }
}

fn normalize_term(term: &str) -> &str {
    if term.is_empty() || term == NOT_TAKEN_TERM {
        "Fall 2000"
    } else {
        term
    }
}

fn split_term(term: &str) -> (&str, i32) {
    let mut parts = term.splitn(2, ' ');
    let quarter = parts.next().unwrap_or("");
    let year = parts.next().and_then(|y| y.parse().ok()).unwrap_or(0);
    (quarter, year)
}

fn quarter_rank(quarter: &str) -> i32 {
    QUARTERS
        .iter()
        .position(|q| *q == quarter)
        .map(|i| i as i32)
        .unwrap_or(-1)
}

/// Heuristic shape check used when building friend indexes: a course code is
/// a run of letters followed by digits (e.g. `CSCI10`, possibly with a
/// trailing section letter).
pub fn looks_like_course_code(code: &str) -> bool {
    let letters = code.chars().take_while(|c| c.is_ascii_alphabetic()).count();
    if letters == 0 || letters == code.len() {
        return false;
    }
    code[letters..].chars().next().is_some_and(|c| c.is_ascii_digit())
        && code.chars().all(|c| c.is_ascii_alphanumeric())
}
