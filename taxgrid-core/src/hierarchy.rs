//! Dotted hierarchical research ids, e.g. `1.1.1.4.3.0.0.0`.
//!
//! Trailing zero segments carry no meaning for lookups; interior zeros do.

/// Strip trailing `0` segments.
///
/// An id made only of zero segments keeps its original (trimmed) text so it
/// does not collapse into an empty key.
pub fn normalize(research_id: &str) -> String {
    let trimmed = research_id.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let mut parts: Vec<&str> = trimmed.split('.').collect();
    while parts.last() == Some(&"0") {
        parts.pop();
    }

    if parts.is_empty() {
        return trimmed.to_string();
    }
    parts.join(".")
}

/// Ancestor ids of `research_id`, shallowest first.
///
/// For every cut point whose kept segment is non-zero, keep the segments up
/// to the cut and zero the rest. The id itself is never included.
pub fn parent_ids(research_id: &str) -> Vec<String> {
    let trimmed = research_id.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let parts: Vec<&str> = trimmed.split('.').collect();
    let mut out = Vec::new();

    for cut in 0..parts.len() {
        if parts[cut] == "0" {
            continue;
        }
        let candidate: Vec<&str> = parts
            .iter()
            .enumerate()
            .map(|(i, seg)| if i <= cut { *seg } else { "0" })
            .collect();
        let candidate = candidate.join(".");
        if candidate != trimmed {
            out.push(candidate);
        }
    }

    out
}
