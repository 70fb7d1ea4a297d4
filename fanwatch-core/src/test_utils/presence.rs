// fanwatch-core/src/test_utils/presence.rs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use fanwatch_common::error::Error;
use fanwatch_common::traits::api::BotPresence;

#[derive(Default)]
pub struct FakePresence {
    guilds: AtomicUsize,
    history: Mutex<Vec<String>>,
}

impl FakePresence {
    pub fn with_guilds(count: usize) -> Self {
        Self {
            guilds: AtomicUsize::new(count),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn set_guilds(&self, count: usize) {
        self.guilds.store(count, Ordering::SeqCst);
    }

    pub fn history(&self) -> Vec<String> {
        self.history.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

impl BotPresence for FakePresence {
    fn guild_count(&self) -> usize {
        self.guilds.load(Ordering::SeqCst)
    }

    fn set_watching(&self, text: &str) -> Result<(), Error> {
        if let Ok(mut guard) = self.history.lock() {
            guard.push(text.to_string());
        }
        Ok(())
    }
}
