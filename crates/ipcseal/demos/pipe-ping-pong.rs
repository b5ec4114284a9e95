//! Pipe example: encrypted ping/pong between two threads.
//!
//! Run with:
//!   cargo run --example pipe-ping-pong

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ipcseal::channel::{AccessControl, ChannelRegistry, SecurityConfig, SecurityContext};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let security = SecurityContext::with_config(
        b"pipe example secret".to_vec(),
        SecurityConfig {
            enable_encryption: true,
        },
    )?;
    let registry = Arc::new(ChannelRegistry::new(
        Arc::new(security),
        Arc::new(AccessControl::new()),
    ));
    registry.access_control().allow("control", "client");
    registry.access_control().allow("control", "server");

    let (mut client_end, mut server_end) = registry.create_pipe("control")?;

    let server = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || -> Result<(), ipcseal::channel::ChannelError> {
            for _ in 0..3 {
                let (meta, message) = registry.recv_pipe("control", &mut server_end, "server", None)?;
                eprintln!(
                    "[server] {} from {}",
                    String::from_utf8_lossy(&message),
                    meta.client_id
                );
                registry.send_pipe("control", &mut server_end, "server", b"pong")?;
            }
            Ok(())
        })
    };

    for round in 0..3 {
        registry.send_pipe("control", &mut client_end, "client", format!("ping {round}").as_bytes())?;
        let (_, reply) =
            registry.recv_pipe("control", &mut client_end, "client", Some(Duration::from_secs(2)))?;
        eprintln!("[client] {}", String::from_utf8_lossy(&reply));
    }

    server
        .join()
        .map_err(|_| "server thread panicked")??;
    Ok(())
}
