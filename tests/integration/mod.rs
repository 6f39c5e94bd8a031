//! Integration tests with mock HTTP server

pub mod content_client;
pub mod mock_server;
pub mod session;
pub mod transport;
