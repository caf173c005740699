//! Integration tests against a local mock HTTP server

pub mod mock_server;
