// File: fanwatch-common/src/models/mod.rs
pub mod watch;
pub mod upstream;
pub mod notification;

pub use watch::{GuildSubscription, NotificationKind, NotificationOverride, WatchRegistration};
pub use upstream::{AccountInfo, ContentItem, StreamState, StreamStatus, UpstreamSnapshot};
pub use notification::{OutboundNotification, RichContent, ServiceStatus};
