//! Module sharing example for singleton-index.
//!
//! Demonstrates:
//! - A host publishing its registry to "modules" with `set_instance()`
//! - Modules obtaining the same global through `get_or_create()`
//! - Ordered release at `shutdown()`
//!
//! Run with: `RUST_LOG=debug cargo run --example module_sharing`

use singleton_index::{get_or_create, instance, set_instance, shutdown, Registry};
use std::sync::{Arc, Mutex};

/// A global every module wants exactly one of.
#[derive(Debug, Default)]
struct EventLog {
    lines: Mutex<Vec<String>>,
}

impl EventLog {
    fn push(&self, line: impl Into<String>) {
        self.lines.lock().unwrap().push(line.into());
    }
}

/// Stand-in for a plugin's load hook: install the host's registry first,
/// then use globals as usual.
fn load_plugin(name: &str, host: &Arc<Registry>) {
    set_instance(Arc::clone(host));

    let log: Arc<EventLog> = get_or_create("app.event_log").unwrap();
    log.push(format!("{name} loaded"));
    println!("   [{name}] event log at {:p}", Arc::as_ptr(&log));
}

fn main() {
    pretty_env_logger::init();

    println!("=== singleton-index: Module Sharing ===\n");

    // -------------------------------------------------------------------------
    // 1. Host creates the registry and announces itself
    // -------------------------------------------------------------------------
    println!("1. Host starting...");

    let host = instance();
    host.set_trace_callback(|event| println!("   [trace] {event}"));

    let log: Arc<EventLog> = get_or_create("app.event_log").unwrap();
    log.push("host started");
    println!("   [host] event log at {:p}", Arc::as_ptr(&log));

    // -------------------------------------------------------------------------
    // 2. Plugins are handed the host's registry
    // -------------------------------------------------------------------------
    println!("\n2. Loading plugins...");

    load_plugin("audio", &host);
    load_plugin("network", &host);

    // -------------------------------------------------------------------------
    // 3. Everyone wrote into the same instance
    // -------------------------------------------------------------------------
    println!("\n3. Shared event log contents:");

    for line in log.lines.lock().unwrap().iter() {
        println!("   - {line}");
    }

    // -------------------------------------------------------------------------
    // 4. Teardown
    // -------------------------------------------------------------------------
    println!("\n4. Shutting down...");

    let released = shutdown();
    println!("   Released {released} global(s)");

    println!("\n=== Example Complete ===");
}
