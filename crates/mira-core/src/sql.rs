//! Cleanup of model output into an executable statement.

use serde::Serialize;
use std::fmt;

const FENCE: &str = "```";

/// A single SQL statement produced for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GeneratedQuery(String);

impl GeneratedQuery {
    /// Sanitize raw model output into a query.
    pub fn from_model_output(raw: &str) -> Self {
        Self(sanitize_generated_sql(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for GeneratedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strip markdown code fences, surrounding whitespace and one trailing `;`.
///
/// A fence opener may carry a SQL language tag (```` ```sql ````), which is
/// removed together with the whitespace after it. Any other word after a
/// fence is kept, so an inline fence such as ```` ```SELECT 1``` ```` keeps its
/// statement.
pub fn sanitize_generated_sql(raw: &str) -> String {
    let unfenced = strip_fences(raw.trim());
    let trimmed = unfenced.trim();
    let without_terminator = trimmed.strip_suffix(';').unwrap_or(trimmed);
    without_terminator.trim_end().to_string()
}

/// Language tags a model puts after an opening fence.
const LANGUAGE_TAGS: [&str; 4] = ["postgresql", "postgres", "pgsql", "sql"];

fn strip_fences(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find(FENCE) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + FENCE.len()..];

        rest = match strip_language_tag(rest) {
            Some(after_tag) => after_tag.trim_start(),
            None => rest
                .strip_prefix("\r\n")
                .or_else(|| rest.strip_prefix('\n'))
                .unwrap_or(rest),
        };
    }

    out.push_str(rest);
    out
}

/// The text after a leading language tag, if `s` starts with one that ends at
/// whitespace, a fence or the end of input.
fn strip_language_tag(s: &str) -> Option<&str> {
    LANGUAGE_TAGS.iter().find_map(|tag| {
        let head = s.get(..tag.len())?;
        if !head.eq_ignore_ascii_case(tag) {
            return None;
        }
        let after = &s[tag.len()..];
        let at_boundary = after.is_empty()
            || after.starts_with(FENCE)
            || after.starts_with(char::is_whitespace);
        at_boundary.then_some(after)
    })
}
