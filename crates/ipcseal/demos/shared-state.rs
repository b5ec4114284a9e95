//! Shared memory example: a publisher overwrites a status block that a
//! reader polls. Reads are non-destructive; the latest write wins.
//!
//! Run with:
//!   cargo run --example shared-state

use std::sync::Arc;

use ipcseal::channel::{AccessControl, ChannelError, ChannelRegistry, SecurityContext};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let security = Arc::new(SecurityContext::new(b"shm example secret".to_vec())?);
    let registry = ChannelRegistry::new(security, Arc::new(AccessControl::new()));

    registry.create_shared_memory("status", 512)?;
    registry.access_control().allow("status", "publisher");
    registry.access_control().allow("status", "reader");
    eprintln!(
        "[main] block {} attached",
        registry.shared_memory_os_name("status")?
    );

    match registry.read_shared_memory("status", "reader") {
        Err(ChannelError::EmptyMessage) => eprintln!("[reader] nothing published yet"),
        other => eprintln!("[reader] unexpected: {other:?}"),
    }

    for state in ["starting", "ready", "draining"] {
        registry.write_shared_memory("status", "publisher", state.as_bytes())?;
        let (meta, message) = registry.read_shared_memory("status", "reader")?;
        eprintln!(
            "[reader] {} (from {} at {})",
            String::from_utf8_lossy(&message),
            meta.client_id,
            meta.ts
        );
    }

    let oversized = vec![b'x'; 1024];
    if let Err(err) = registry.write_shared_memory("status", "publisher", &oversized) {
        eprintln!("[publisher] rejected: {err}");
    }
    let (_, message) = registry.read_shared_memory("status", "reader")?;
    eprintln!("[reader] still {}", String::from_utf8_lossy(&message));

    registry.unlink_shared_memory("status")?;
    Ok(())
}
