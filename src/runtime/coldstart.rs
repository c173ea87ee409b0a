use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use uuid::Uuid;

static COLD: AtomicBool = AtomicBool::new(true);
static CONTAINER_ID: OnceLock<String> = OnceLock::new();

/// True exactly once per process: the first invocation a runtime instance
/// serves is the cold one, every later invocation on the same instance is
/// warm.
pub fn consume_cold_start() -> bool {
    COLD.swap(false, Ordering::SeqCst)
}

/// Stable id for this runtime instance, minted on first use.
pub fn container_id() -> &'static str {
    CONTAINER_ID.get_or_init(|| Uuid::new_v4().to_string())
}
