use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Analysis backend error: {0}")]
    Backend(String),

    #[error("Valora error: {0}")]
    Cloud(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] printpdf::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let error = AppError::Config("VALORA_API_KEY is required".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: VALORA_API_KEY is required"
        );
    }

    #[test]
    fn test_validation_error() {
        let error = AppError::Validation("living_area_sqm is required".to_string());
        assert_eq!(
            error.to_string(),
            "Validation error: living_area_sqm is required"
        );
    }

    #[test]
    fn test_backend_error() {
        let error = AppError::Backend("model unavailable".to_string());
        assert_eq!(
            error.to_string(),
            "Analysis backend error: model unavailable"
        );
    }

    #[test]
    fn test_cloud_error() {
        let error = AppError::Cloud("account quota exceeded".to_string());
        assert_eq!(error.to_string(), "Valora error: account quota exceeded");
    }

    #[test]
    fn test_decode_error() {
        let error = AppError::Decode("estimate response: missing field".to_string());
        assert_eq!(
            error.to_string(),
            "Decode error: estimate response: missing field"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        fn writes() -> AppResult<()> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into())
        }
        let result = writes();
        assert!(matches!(result, Err(AppError::Io(_))));
    }

    #[test]
    fn test_app_result_ok() {
        fn returns_ok() -> AppResult<i32> {
            Ok(42)
        }
        let result = returns_ok();
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), 42);
    }
}
