//! Fixture assembly for mediaproof regression tests.
//!
//! Two invocation paths reach the generation backend:
//!
//! - **In-process**: a [`GenerationBackend`] wired by [`TestGroup`] to a
//!   shared, byte-budgeted LRU cache split into namespaced keyspaces,
//!   called through a status-capturing [`CallContext`] double.
//! - **HTTP**: a blocking [`HttpClient`] against an already-running
//!   service; nothing to bootstrap beyond the base URL.
//!
//! Both paths produce bytes plus a content kind and feed the same
//! comparison core in `mediaproof-snapshot`.

pub mod cache;
pub mod context;
pub mod http;
pub mod request;
pub mod service;

pub use cache::{ByteLruCache, Keyspace, MB};
pub use context::{CallContext, CallError, StatusCode};
pub use http::{HttpClient, HttpError, HttpReply, HOST_ENV_VAR};
pub use request::{
    seed_from_str, GenerationRequest, MaskSource, Sampler, TextPrompt,
};
pub use service::{
    EngineHandle, GenerationBackend, GenerationService, Monitor, NullMonitor, ServiceConfig,
    TestGroup,
};
