//! End-to-end test utilities for the ArvanCloud webhook solver
//!
//! This crate provides test harnesses and utilities for running E2E tests
//! of the solver without requiring a cluster or the real ArvanCloud API.

pub mod certificates;
pub mod harness;
pub mod mock_api;
pub mod mock_dns;

pub use certificates::TestCertificates;
pub use harness::{challenge, TestWebhook};
pub use mock_api::{MockArvancloudApi, RecordedRequest};
pub use mock_dns::{MockClientFactory, MockDnsProvider};
