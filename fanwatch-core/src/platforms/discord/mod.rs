pub mod embed;
pub mod runtime;
pub mod sink;

pub use runtime::{DiscordPresence, DiscordRuntime};
pub use sink::DiscordNotificationSink;
