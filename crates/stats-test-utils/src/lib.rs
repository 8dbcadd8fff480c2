//! # Stats Reporter Test Utilities
//!
//! Mock implementations and fixtures for testing the stats reporter without
//! a monitoring backend.
//!
//! ## Modules
//!
//! - `mock_backend` - Recording backend client and connector with scripted
//!   initialization and setup outcomes
//! - `mock_source` - Mutable in-memory stats source
//! - `fixtures` - Stream statistics builders
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stats_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     // Backend that initializes immediately and holds setup until told
//!     let connector = MockConnector::new(InitBehavior::Succeed, SetupBehavior::Hold);
//!
//!     let source = MockStatsSource::new();
//!     source.set_receive("ep1", vec![TestStream::new(111_u64).build()]);
//!
//!     // ... build a registry and a ConferenceReporter, then:
//!     connector.client(ApplicationId(42)).unwrap().confirm_setup("S1");
//! }
//! ```

pub mod fixtures;
pub mod mock_backend;
pub mod mock_source;

// Re-export commonly used items
pub use fixtures::*;
pub use mock_backend::*;
pub use mock_source::*;
