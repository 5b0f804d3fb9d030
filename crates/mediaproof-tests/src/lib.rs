//! Shared fixtures for mediaproof integration tests.

pub mod fixtures;
