//! Post-processing of model responses.

/// Fraction of the response after which a trailing fragment is cut.
const TRUNCATION_THRESHOLD: f64 = 0.7;

/// Trim a response and drop a cut-off final sentence.
///
/// If the text does not end in `.`, `!` or `?` and its last `.` lies past
/// 70% of its length, everything after that period is removed. Lengths are
/// counted in characters.
pub fn clean_response(response: &str) -> String {
    let trimmed = response.trim();
    if trimmed.is_empty() || trimmed.ends_with(|c| matches!(c, '.' | '!' | '?')) {
        return trimmed.to_string();
    }

    let total = trimmed.chars().count();
    if let Some(period) = trimmed.rfind('.') {
        let position = trimmed[..period].chars().count();
        if position as f64 > total as f64 * TRUNCATION_THRESHOLD {
            return trimmed[..=period].to_string();
        }
    }

    trimmed.to_string()
}
