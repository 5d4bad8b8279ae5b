use std::collections::BTreeMap;

use potion::Error;

pub struct QueryError {
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match &value {
            // Membership is checked before every insert, so reaching a
            // unique index means two requests raced on the same row.
            sqlx::Error::Database(e) if e.is_unique_violation() => {
                log::error!("Unique constraint violated: {e}");
            }
            sqlx::Error::RowNotFound => log::trace!("> Row not found"),
            _ => {}
        }
        Self::new(value.to_string())
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        Error {
            code: 500,
            info: Some(value.info),
            redirect: None,
        }
    }
}

pub struct CacheError {
    info: String,
}

impl From<redis::RedisError> for CacheError {
    fn from(value: redis::RedisError) -> Self {
        Self {
            info: format!("{:?} - {:?}", value.code(), value.detail()),
        }
    }
}

impl CacheError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<CacheError> for Error {
    fn from(value: CacheError) -> Self {
        Error {
            code: 500,
            info: Some(value.info),
            redirect: None,
        }
    }
}

/// An error that maps onto one specific HTTP status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusError {
    code: u16,
    info: String,
}

impl StatusError {
    pub fn new(code: u16, info: &str) -> Self {
        Self {
            code,
            info: info.to_string(),
        }
    }

    pub fn unauthenticated() -> Self {
        Self::new(401, "Authentication credentials were not provided")
    }

    pub fn forbidden(info: &str) -> Self {
        Self::new(403, info)
    }

    pub fn not_found(info: &str) -> Self {
        Self::new(404, info)
    }

    pub fn unavailable(info: &str) -> Self {
        Self::new(503, info)
    }

    pub fn code(&self) -> u16 {
        self.code
    }
}

impl From<StatusError> for Error {
    fn from(value: StatusError) -> Self {
        Error {
            code: value.code.into(),
            info: Some(value.info),
            redirect: None,
        }
    }
}

/// Field-level validation failures, keyed by field name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationError {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.fields
    }

    /// Returns `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<ValidationError> for Error {
    fn from(value: ValidationError) -> Self {
        let info = serde_json::to_string(&value.fields)
            .unwrap_or_else(|_| String::from("Invalid request"));

        Error {
            code: 400,
            info: Some(info),
            redirect: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_keeps_code_and_message() {
        let error: Error = StatusError::not_found("Recipe not found").into();

        assert!(error.code == 404);
        assert_eq!(error.info.as_deref(), Some("Recipe not found"));
    }

    #[test]
    fn validation_error_serializes_fields() {
        let mut errors = ValidationError::new();
        errors.add("cooking_time", "Ensure this value is at least 1");
        errors.add("tags", "This list may not be empty");
        errors.add("tags", "Duplicate tag 3");

        let error: Error = errors.into();
        assert!(error.code == 400);
        assert_eq!(
            error.info.as_deref(),
            Some(
                r#"{"cooking_time":["Ensure this value is at least 1"],"tags":["This list may not be empty","Duplicate tag 3"]}"#
            )
        );
    }

    #[test]
    fn empty_validation_error_is_ok() {
        assert!(ValidationError::new().into_result().is_ok());
    }
}
