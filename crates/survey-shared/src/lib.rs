//! # Survey Shared
//!
//! Wire types shared between the API server and its clients: the response
//! envelope, the error taxonomy and request/response DTOs.

pub mod dto;
pub mod error_kind;
pub mod response;

pub use error_kind::ErrorKind;
pub use response::{ApiResponse, PaginatedResponse, Pagination};
