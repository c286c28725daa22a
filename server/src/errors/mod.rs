pub mod api_error;

pub use api_error::ApiError;

pub type ApiResult<T> = Result<T, ApiError>;
