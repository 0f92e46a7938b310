use crate::error::ValidationError;
use std::fmt;

const REQUIRED_PREFIX: &str = "https://github.com/";
/// `https:` + `` + `github.com` + owner + repository
const MIN_SEGMENTS: usize = 5;

/// A repository reference that passed [`validate`]. Holds the trimmed input unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidReference(String);

impl ValidReference {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn owner(&self) -> &str {
        self.0.split('/').nth(3).unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.0.split('/').nth(4).unwrap_or_default()
    }
}

impl fmt::Display for ValidReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Check a user-supplied repository link before any network activity.
pub fn validate(reference: &str) -> Result<ValidReference, ValidationError> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyInput);
    }
    if !trimmed.starts_with(REQUIRED_PREFIX) || trimmed.split('/').count() < MIN_SEGMENTS {
        return Err(ValidationError::MalformedReference);
    }
    Ok(ValidReference(trimmed.to_string()))
}
