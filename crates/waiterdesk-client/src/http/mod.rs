//! REST transport
//!
//! - [`backend`] - the [`HttpBackend`] seam and its reqwest implementation
//! - [`client`] - [`ApiClient`], which owns token injection and 401 handling

pub mod backend;
pub mod client;

pub use backend::{HttpBackend, HttpRequest, HttpResponse, Method, ReqwestBackend};
pub use client::{decode, path_segment, unwrap_envelope, ApiClient};
