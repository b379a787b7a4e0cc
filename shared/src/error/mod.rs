//! Unified error system for the print server
//!
//! - [`ErrorCode`]: Standardized error codes for all error types
//! - [`ErrorCategory`]: Classification of errors by domain
//! - [`AppError`]: Rich error type with codes, messages, and details
//! - [`ApiResponse`]: Unified response envelope
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Authentication errors (admin token)
//! - 2xxx: Permission errors
//! - 3xxx: Team errors
//! - 4xxx: Job and queue errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ApiResponse};
//!
//! let err = AppError::new(ErrorCode::QueueFull);
//! assert_eq!(err.http_status(), shared::http::StatusCode::SERVICE_UNAVAILABLE);
//!
//! let err = AppError::with_message(ErrorCode::TeamNotFound, "Team 'rockets' not found")
//!     .with_detail("team_id", "rockets");
//!
//! let response = ApiResponse::<()>::error(&err);
//! ```

mod category;
mod codes;
mod http;
mod printer;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult};
