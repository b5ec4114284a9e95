//! Queue example: a producer and two consumers with separate allow lists.
//!
//! Run with:
//!   cargo run --example queue-jobs

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ipcseal::channel::{AccessControl, ChannelError, ChannelRegistry, SecurityContext};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let security = Arc::new(SecurityContext::new(b"queue example secret".to_vec())?);
    let registry = Arc::new(ChannelRegistry::new(security, Arc::new(AccessControl::new())));

    registry.create_queue("jobs")?;
    registry.access_control().allow("jobs", "producer");
    registry.access_control().allow("jobs", "worker-1");
    registry.access_control().allow("jobs", "worker-2");

    for i in 0..6 {
        registry.send_queue("jobs", "producer", format!("job-{i}").as_bytes())?;
    }

    let workers: Vec<_> = ["worker-1", "worker-2"]
        .into_iter()
        .map(|id| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || loop {
                match registry.recv_queue("jobs", id, Some(Duration::from_millis(200))) {
                    Ok((meta, job)) => eprintln!(
                        "[{id}] {} from {}",
                        String::from_utf8_lossy(&job),
                        meta.client_id
                    ),
                    Err(ChannelError::Timeout(_)) => break,
                    Err(err) => {
                        eprintln!("[{id}] error: {err}");
                        break;
                    }
                }
            })
        })
        .collect();

    for worker in workers {
        let _ = worker.join();
    }

    // An id that is not on the list is refused before anything is queued.
    match registry.send_queue("jobs", "intruder", b"rm -rf") {
        Err(err) => eprintln!("[intruder] refused: {err}"),
        Ok(()) => eprintln!("[intruder] unexpectedly accepted"),
    }
    Ok(())
}
