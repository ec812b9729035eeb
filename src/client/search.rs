use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::users::MIN_SEARCH_CHARS;

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Debounces search-box input: only the latest keystroke fires, after a quiet
/// period, and only when it is long enough to search.
///
/// Each call to [`settle`](Self::settle) supersedes every earlier call still
/// waiting. Clones share the same generation counter.
#[derive(Debug, Clone)]
pub struct SearchDebouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new(SEARCH_DEBOUNCE)
    }
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Resolves to the trimmed query if no newer input arrived during the
    /// delay, `None` otherwise.
    pub async fn settle(&self, input: &str) -> Option<String> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let query = input.trim().to_string();

        tokio::time::sleep(self.delay).await;

        if self.generation.load(Ordering::SeqCst) != ticket {
            return None;
        }
        (query.chars().count() >= MIN_SEARCH_CHARS).then_some(query)
    }
}
