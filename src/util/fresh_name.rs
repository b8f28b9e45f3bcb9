use std::sync::atomic::{AtomicUsize, Ordering};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Generate a process-wide fresh identifier with the given prefix. The
/// counter is shared by all threads, so parallel provers never collide.
pub fn unique_name(prefix: &str) -> String {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}#{}", prefix, n)
}
