use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("foreign key: {0}")]
    ForeignKey(String),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ContactError {
    /// Single-field validation failure.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::ForeignKey(_) => 400,
            Self::Internal(_) => 500,
        }
    }

    /// Machine-readable kind sent to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::ForeignKey(_) => "foreign_key",
            Self::Internal(_) => "internal_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.field.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, ContactError>;

#[cfg(test)]
mod tests {
    use super::*;

    // ── http_status: exhaustive variant coverage ──────────────────

    #[test]
    fn http_status_validation() {
        assert_eq!(ContactError::invalid("email", "bad").http_status(), 400);
    }

    #[test]
    fn http_status_not_found() {
        assert_eq!(ContactError::NotFound("x".into()).http_status(), 404);
    }

    #[test]
    fn http_status_conflict() {
        assert_eq!(ContactError::Conflict("x".into()).http_status(), 409);
    }

    #[test]
    fn http_status_foreign_key() {
        assert_eq!(ContactError::ForeignKey("x".into()).http_status(), 400);
    }

    #[test]
    fn http_status_internal() {
        let err = ContactError::Internal(anyhow::anyhow!("boom"));
        assert_eq!(err.http_status(), 500);
    }

    // ── kind ─────────────────────────────────────────────────────

    #[test]
    fn kinds_are_distinct() {
        let kinds = [
            ContactError::invalid("a", "b").kind(),
            ContactError::NotFound("x".into()).kind(),
            ContactError::Conflict("x".into()).kind(),
            ContactError::ForeignKey("x".into()).kind(),
            ContactError::Internal(anyhow::anyhow!("x")).kind(),
        ];
        let mut dedup = kinds.to_vec();
        dedup.sort_unstable();
        dedup.dedup();
        assert_eq!(dedup.len(), kinds.len());
    }

    // ── Display ──────────────────────────────────────────────────

    #[test]
    fn display_validation_joins_fields() {
        let e = ContactError::Validation(vec![
            FieldError::new("firstName", "First name is required"),
            FieldError::new("email", "Invalid email format"),
        ]);
        assert_eq!(
            e.to_string(),
            "validation failed: firstName: First name is required; email: Invalid email format"
        );
    }

    #[test]
    fn display_field_error_without_field() {
        let f = FieldError::new("", "At least one search parameter is required");
        assert_eq!(f.to_string(), "At least one search parameter is required");
    }

    #[test]
    fn display_not_found() {
        let e = ContactError::NotFound("person 7".into());
        assert_eq!(e.to_string(), "not found: person 7");
    }

    #[test]
    fn display_internal() {
        let e = ContactError::Internal(anyhow::anyhow!("pool closed"));
        assert_eq!(e.to_string(), "internal: pool closed");
    }
}
