//! REST API client module for the clinic backend.
//!
//! `ApiClient` is the single gateway for outbound calls: it attaches the
//! current bearer credential to every request and reports credential
//! rejections to the session monitor so the login ends immediately,
//! whichever call noticed it.

pub mod client;
pub mod error;
pub mod models;

pub use client::{ApiClient, CredentialSlot, Rejection, RejectionCause};
pub use error::{ApiError, LoginError};
pub use models::{Identity, LoginSuccess, Role};
