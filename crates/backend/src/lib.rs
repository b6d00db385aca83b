//! Client side of the quest backend: the `QuestApi` contract, the HTTP
//! adapter and an in-memory implementation for tests and offline use.

#![forbid(unsafe_code)]

pub mod api;
pub mod http;

pub use api::{BackendError, Call, InMemoryBackend, QuestApi};
pub use http::{HttpBackend, HttpConfig};
