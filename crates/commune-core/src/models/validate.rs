//! Client-side validation of outgoing payloads

use thiserror::Error;

use crate::util::trimmed_char_count;

/// A user-facing validation failure detected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Implemented by every create payload.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

pub(crate) fn require_min_chars(
    field: &str,
    value: &str,
    min: usize,
) -> Result<(), ValidationError> {
    if trimmed_char_count(value) < min {
        return Err(ValidationError::new(format!(
            "{field} must be at least {min} characters"
        )));
    }
    Ok(())
}

pub(crate) fn require_present(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(format!("{field} is required")));
    }
    Ok(())
}

pub(crate) fn require_email(field: &str, value: &str) -> Result<(), ValidationError> {
    require_present(field, value)?;
    let value = value.trim();
    let valid = value.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
    });
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new(format!("{field} must be a valid email address")))
    }
}
