use crate::error::{ArtifactError, Result};

const FORBIDDEN: &[char] = &['/', '\\', '"', ':', '<', '>', '|', '*', '?', '\r', '\n'];

/// Check an artifact name: non-empty, no path separators and none of
/// `" : < > | * ? \r \n`.
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ArtifactError::invalid("artifact name must not be empty"));
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN.contains(c)) {
        return Err(ArtifactError::invalid(format!(
            "artifact name '{}' contains forbidden character {c:?}",
            name.escape_debug()
        )));
    }
    Ok(())
}

/// Check a retention override against the configured ceiling.
pub fn validate_retention(days: u32, max_days: u32) -> Result<()> {
    if days == 0 || days > max_days {
        return Err(ArtifactError::invalid(format!(
            "retention of {days} days is outside 1..={max_days}"
        )));
    }
    Ok(())
}

/// Check a service-assigned id before it is put into a request path.
pub(crate) fn validate_id(id: &str) -> Result<()> {
    let unsafe_char = |c: char| matches!(c, '/' | '?' | '#' | '%') || c.is_whitespace() || c.is_control();
    if id.is_empty() || id.chars().any(unsafe_char) {
        return Err(ArtifactError::invalid(format!("invalid artifact id '{}'", id.escape_debug())));
    }
    Ok(())
}
