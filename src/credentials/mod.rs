//! Connection credentials
//!
//! Turns the token endpoint's response into `ConnectionDetails` and keeps the
//! latest value cached for fast re-reads.

mod details;
mod source;

pub use details::ConnectionDetails;
pub use source::{CredentialSource, HttpCredentialSource};
