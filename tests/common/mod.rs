//! Shared test utilities for the integration tests.
//!
//! This module provides:
//! - A scripted mock `CommandRunner` that records every command
//! - Oplog entry builders for plain and transactional entries

pub mod fixtures;
pub mod mock_destination;

#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use mock_destination::*;
