//! Shared error type for the core crate.

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl CoreError {
    pub fn invalid_settings(msg: impl Into<String>) -> Self {
        Self::InvalidSettings(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            CoreError::invalid_settings("x")
                .to_string()
                .contains("invalid settings:")
        );
        let serde_err = serde_json::from_str::<u32>("nope").unwrap_err();
        assert!(
            CoreError::from(serde_err)
                .to_string()
                .contains("serialization error:")
        );
    }
}
