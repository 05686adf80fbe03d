//! Built-in senders for live endpoints.
//!
//! Only available with the `native` feature.

pub mod http;

pub use http::NativeHttpSender;
