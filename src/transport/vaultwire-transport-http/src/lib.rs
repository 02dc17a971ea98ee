//! # Vaultwire HTTP Transport
//!
//! [`Transport`](vaultwire_transport::Transport) implementation speaking the
//! secrets server HTTP API.
//!
//! ## Features
//!
//! - Token and namespace headers on every request
//! - Environment based configuration (`VAULT_ADDR`, `VAULT_TOKEN`, ...)
//! - Absent results (404, 204, empty body) surfaced as `None`

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;

pub use client::HttpTransport;
pub use config::{parse_timeout, HttpConfig};
