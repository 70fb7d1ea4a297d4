// fanwatch-core/src/test_utils/mod.rs
//
// Test doubles shared by the unit and integration tests.

pub mod presence;
pub mod sink;
pub mod store;
pub mod upstream;

pub use presence::FakePresence;
pub use sink::{RecordingSink, SentNotification};
pub use store::InMemoryStore;
pub use upstream::FakeUpstream;
