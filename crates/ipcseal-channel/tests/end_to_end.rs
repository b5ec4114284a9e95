//! Cross-thread exchanges over every channel kind.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use ipcseal_channel::{
    package, unpackage, AccessControl, ChannelError, ChannelKind, ChannelRegistry, EnvelopeMeta,
    SecurityConfig, SecurityContext,
};

const SECRET: &[u8] = b"end-to-end-shared-secret";

fn registry_with(encrypt: bool) -> Arc<ChannelRegistry> {
    let security = SecurityContext::with_config(
        SECRET.to_vec(),
        SecurityConfig {
            enable_encryption: encrypt,
        },
    )
    .unwrap();
    Arc::new(ChannelRegistry::new(
        Arc::new(security),
        Arc::new(AccessControl::new()),
    ))
}

fn registry() -> Arc<ChannelRegistry> {
    registry_with(false)
}

#[test]
fn queue_ping_pong_between_threads() {
    let reg = registry();
    reg.create_queue("jobs").unwrap();
    reg.access_control().allow("jobs", "A");
    reg.access_control().allow("jobs", "B");

    let producer = {
        let reg = Arc::clone(&reg);
        thread::spawn(move || reg.send_queue("jobs", "A", b"ping").unwrap())
    };
    producer.join().unwrap();

    let (meta, message) = reg.recv_queue("jobs", "B", Some(Duration::from_secs(5))).unwrap();
    assert_eq!(meta.client_id, "A");
    assert_eq!(message, b"ping");

    reg.send_queue("jobs", "B", b"pong").unwrap();
    let (meta, message) = reg.recv_queue("jobs", "A", None).unwrap();
    assert_eq!(meta.client_id, "B");
    assert_eq!(message, b"pong");
}

#[test]
fn blocked_receiver_wakes_on_send() {
    let reg = registry();
    reg.create_queue("jobs").unwrap();
    reg.access_control().allow("jobs", "A");

    let consumer = {
        let reg = Arc::clone(&reg);
        thread::spawn(move || reg.recv_queue("jobs", "A", None).unwrap())
    };
    thread::sleep(Duration::from_millis(50));
    reg.send_queue("jobs", "A", b"late").unwrap();

    let (_, message) = consumer.join().unwrap();
    assert_eq!(message, b"late");
}

#[test]
fn unauthorized_ids_rejected_both_directions() {
    let reg = registry();
    reg.create_queue("jobs").unwrap();
    reg.access_control().allow("jobs", "A");

    assert!(matches!(
        reg.send_queue("jobs", "C", b"x"),
        Err(ChannelError::PermissionDenied { ref client_id, .. }) if client_id == "C"
    ));

    reg.send_queue("jobs", "A", b"for-a").unwrap();
    assert!(matches!(
        reg.recv_queue("jobs", "C", Some(Duration::ZERO)),
        Err(ChannelError::PermissionDenied { .. })
    ));
    let (_, message) = reg.recv_queue("jobs", "A", Some(Duration::ZERO)).unwrap();
    assert_eq!(message, b"for-a");
}

#[test]
fn revoked_id_loses_access() {
    let reg = registry();
    reg.create_queue("jobs").unwrap();
    reg.access_control().allow("jobs", "A");
    reg.send_queue("jobs", "A", b"one").unwrap();

    reg.access_control().revoke("jobs", "A");
    assert!(matches!(
        reg.send_queue("jobs", "A", b"two"),
        Err(ChannelError::PermissionDenied { .. })
    ));
}

#[test]
fn round_trip_every_kind() {
    for encrypt in [false, true] {
        if encrypt && !cfg!(feature = "encryption") {
            continue;
        }
        let reg = registry_with(encrypt);
        let acl = reg.access_control();
        for name in ["q", "p", "m"] {
            acl.allow(name, "A");
        }

        reg.create_queue("q").unwrap();
        reg.send_queue("q", "A", b"queue-message").unwrap();
        let (meta, message) = reg.recv_queue("q", "A", None).unwrap();
        assert_eq!((meta.client_id.as_str(), &message[..]), ("A", &b"queue-message"[..]));

        let (mut left, mut right) = reg.create_pipe("p").unwrap();
        reg.send_pipe("p", &mut left, "A", b"pipe-message").unwrap();
        let (meta, message) = reg
            .recv_pipe("p", &mut right, "A", Some(Duration::from_secs(5)))
            .unwrap();
        assert_eq!((meta.client_id.as_str(), &message[..]), ("A", &b"pipe-message"[..]));

        reg.create_shared_memory("m", 1024).unwrap();
        reg.write_shared_memory("m", "A", b"shm-message").unwrap();
        let (meta, message) = reg.read_shared_memory("m", "A").unwrap();
        assert_eq!((meta.client_id.as_str(), &message[..]), ("A", &b"shm-message"[..]));
    }
}

#[test]
fn binary_payloads_survive_every_kind() {
    let every_byte: Vec<u8> = (0..=255u8).collect();
    let payloads: [&[u8]; 4] = [&every_byte, &[], &[0], b"\0\0tail after zeros"];

    for encrypt in [false, true] {
        if encrypt && !cfg!(feature = "encryption") {
            continue;
        }
        let reg = registry_with(encrypt);
        for name in ["q", "p", "m"] {
            reg.access_control().allow(name, "A");
        }
        reg.create_queue("q").unwrap();
        let (mut left, mut right) = reg.create_pipe("p").unwrap();
        reg.create_shared_memory("m", 4096).unwrap();

        for payload in payloads {
            reg.send_queue("q", "A", payload).unwrap();
            let (_, message) = reg.recv_queue("q", "A", Some(Duration::ZERO)).unwrap();
            assert_eq!(message, payload, "queue, encrypt={encrypt}");

            reg.send_pipe("p", &mut left, "A", payload).unwrap();
            let (_, message) = reg
                .recv_pipe("p", &mut right, "A", Some(Duration::from_secs(5)))
                .unwrap();
            assert_eq!(message, payload, "pipe, encrypt={encrypt}");

            // Zero bytes in the payload are base64-encoded, so they never
            // reach the block as a terminator.
            reg.write_shared_memory("m", "A", payload).unwrap();
            let (_, message) = reg.read_shared_memory("m", "A").unwrap();
            assert_eq!(message, payload, "shared memory, encrypt={encrypt}");
        }
    }
}

#[test]
fn unbounded_timeout_is_accepted_by_queue_and_pipe() {
    let reg = registry();
    reg.access_control().allow("q", "A");
    reg.access_control().allow("p", "A");

    reg.create_queue("q").unwrap();
    reg.send_queue("q", "A", b"x").unwrap();
    let (_, message) = reg.recv_queue("q", "A", Some(Duration::MAX)).unwrap();
    assert_eq!(message, b"x");

    let (mut left, mut right) = reg.create_pipe("p").unwrap();
    reg.send_pipe("p", &mut left, "A", b"x").unwrap();
    let (_, message) = reg.recv_pipe("p", &mut right, "A", Some(Duration::MAX)).unwrap();
    assert_eq!(message, b"x");

    // Nothing buffered: the wait ends when the peer writes.
    let writer = {
        let reg = Arc::clone(&reg);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            reg.send_pipe("p", &mut left, "A", b"later").unwrap();
        })
    };
    let (_, message) = reg.recv_pipe("p", &mut right, "A", Some(Duration::MAX)).unwrap();
    assert_eq!(message, b"later");
    writer.join().unwrap();
}

#[test]
fn pipe_exchange_across_threads() {
    let reg = registry();
    reg.access_control().allow("p", "A");
    reg.access_control().allow("p", "B");
    let (mut left, mut right) = reg.create_pipe("p").unwrap();

    let worker = {
        let reg = Arc::clone(&reg);
        thread::spawn(move || {
            let (meta, message) = reg.recv_pipe("p", &mut right, "B", None).unwrap();
            assert_eq!(meta.client_id, "A");
            assert_eq!(message, b"ping");
            reg.send_pipe("p", &mut right, "B", b"pong").unwrap();
        })
    };

    reg.send_pipe("p", &mut left, "A", b"ping").unwrap();
    let (meta, message) = reg
        .recv_pipe("p", &mut left, "A", Some(Duration::from_secs(5)))
        .unwrap();
    assert_eq!(meta.client_id, "B");
    assert_eq!(message, b"pong");
    worker.join().unwrap();
}

#[test]
fn oversized_shared_memory_write_leaves_block_unchanged() {
    let reg = registry();
    reg.create_shared_memory("m", 256).unwrap();
    reg.access_control().allow("m", "A");
    reg.write_shared_memory("m", "A", b"small").unwrap();

    let big = vec![b'x'; 4096];
    match reg.write_shared_memory("m", "A", &big) {
        Err(ChannelError::MessageTooLarge { size, capacity }) => {
            assert_eq!(capacity, 256);
            assert!(size > capacity);
        }
        other => panic!("expected MessageTooLarge, got {other:?}"),
    }

    let (_, message) = reg.read_shared_memory("m", "A").unwrap();
    assert_eq!(message, b"small");
}

#[test]
fn never_written_block_is_empty() {
    let reg = registry();
    reg.create_shared_memory("m", 128).unwrap();
    reg.access_control().allow("m", "A");
    assert!(matches!(
        reg.read_shared_memory("m", "A"),
        Err(ChannelError::EmptyMessage)
    ));
}

#[test]
fn unlinked_block_is_gone() {
    let reg = registry();
    reg.create_shared_memory("m", 128).unwrap();
    reg.access_control().allow("m", "A");
    reg.write_shared_memory("m", "A", b"bye").unwrap();

    reg.unlink_shared_memory("m").unwrap();
    assert!(matches!(
        reg.read_shared_memory("m", "A"),
        Err(ChannelError::ChannelNotFound(_))
    ));
    assert!(matches!(
        reg.write_shared_memory("m", "A", b"again"),
        Err(ChannelError::ChannelNotFound(_))
    ));
}

#[test]
fn queue_timeout_waits_and_leaves_queue_empty() {
    let reg = registry();
    reg.create_queue("q").unwrap();
    reg.access_control().allow("q", "A");

    let wait = Duration::from_millis(100);
    let start = Instant::now();
    assert!(matches!(
        reg.recv_queue("q", "A", Some(wait)),
        Err(ChannelError::Timeout(d)) if d == wait
    ));
    assert!(start.elapsed() >= wait);

    assert!(matches!(
        reg.recv_queue("q", "A", Some(Duration::ZERO)),
        Err(ChannelError::QueueEmpty)
    ));
}

#[test]
fn pipe_timeout_when_nothing_sent() {
    let reg = registry();
    reg.access_control().allow("p", "A");
    let (_left, mut right) = reg.create_pipe("p").unwrap();

    let wait = Duration::from_millis(50);
    assert!(matches!(
        reg.recv_pipe("p", &mut right, "A", Some(wait)),
        Err(ChannelError::Timeout(_))
    ));
}

#[test]
fn pipe_peer_gone_is_disconnect() {
    let reg = registry();
    reg.access_control().allow("p", "A");
    let (left, mut right) = reg.create_pipe("p").unwrap();
    drop(left);

    assert!(matches!(
        reg.recv_pipe("p", &mut right, "A", Some(Duration::from_secs(1))),
        Err(ChannelError::Disconnected)
    ));
}

#[test]
fn endpoint_from_other_pipe_rejected() {
    let reg = registry();
    reg.access_control().allow("p1", "A");
    reg.access_control().allow("p2", "A");
    let (mut p1_left, _p1_right) = reg.create_pipe("p1").unwrap();
    let (_p2_left, _p2_right) = reg.create_pipe("p2").unwrap();

    assert!(matches!(
        reg.send_pipe("p2", &mut p1_left, "A", b"x"),
        Err(ChannelError::ForeignEndpoint { .. })
    ));
    assert!(matches!(
        reg.recv_pipe("p2", &mut p1_left, "A", Some(Duration::ZERO)),
        Err(ChannelError::ForeignEndpoint { .. })
    ));
}

#[test]
fn envelope_from_other_secret_fails_verification() {
    let reg = registry();
    let outsider = SecurityContext::new(b"not-the-shared-secret".to_vec()).unwrap();
    let forged = package(&outsider, "A", b"evil").unwrap();

    let json: serde_json::Value = serde_json::from_slice(&forged).unwrap();
    assert_eq!(json["meta"]["client_id"], "A");
    assert_eq!(json["payload"], STANDARD.encode(b"evil"));
    assert!(matches!(
        unpackage(reg.security(), &forged),
        Err(ChannelError::VerificationFailed)
    ));
}

#[cfg(feature = "encryption")]
#[test]
fn resigned_tampered_ciphertext_fails_decryption() {
    let reg = registry_with(true);
    let security = reg.security();

    let wire = package(security, "A", b"attack at dawn").unwrap();
    let mut json: serde_json::Value = serde_json::from_slice(&wire).unwrap();
    let mut body = STANDARD.decode(json["payload"].as_str().unwrap()).unwrap();
    let last = body.len() - 1;
    body[last] ^= 0x01;
    let payload = STANDARD.encode(&body);

    let meta: EnvelopeMeta = serde_json::from_value(json["meta"].clone()).unwrap();
    json["hmac"] = serde_json::Value::String(security.sign(&meta, &payload).unwrap());
    json["payload"] = serde_json::Value::String(payload);
    let forged = serde_json::to_vec(&json).unwrap();

    assert!(matches!(
        unpackage(security, &forged),
        Err(ChannelError::DecryptionFailed)
    ));
}

#[cfg(feature = "encryption")]
#[test]
fn encryption_feature_enables_the_cipher() {
    assert!(registry_with(true).security().encryption_enabled());
}

#[cfg(not(feature = "encryption"))]
#[test]
fn without_encryption_feature_payloads_stay_plaintext() {
    let reg = registry_with(true);
    assert!(!reg.security().encryption_enabled());

    let wire = package(reg.security(), "A", b"visible").unwrap();
    let json: serde_json::Value = serde_json::from_slice(&wire).unwrap();
    assert_eq!(json["payload"], STANDARD.encode(b"visible"));
}

#[test]
fn garbage_bytes_fail_verification() {
    let reg = registry();
    assert!(matches!(
        unpackage(reg.security(), b"\x00\x01garbage"),
        Err(ChannelError::VerificationFailed)
    ));
}

#[test]
fn duplicate_names_rejected() {
    let reg = registry();
    reg.create_queue("dup").unwrap();
    assert!(matches!(
        reg.create_shared_memory("dup", 64),
        Err(ChannelError::ChannelExists(_))
    ));
    assert_eq!(reg.kind("dup"), Some(ChannelKind::Queue));
}

#[test]
fn operations_check_channel_kind() {
    let reg = registry();
    reg.create_queue("q").unwrap();
    reg.create_shared_memory("m", 64).unwrap();
    let (mut left, _right) = reg.create_pipe("p").unwrap();
    reg.access_control().allow("q", "A");
    reg.access_control().allow("m", "A");
    reg.access_control().allow("p", "A");

    assert!(matches!(
        reg.write_shared_memory("q", "A", b"x"),
        Err(ChannelError::WrongChannelKind {
            expected: ChannelKind::SharedMemory,
            actual: ChannelKind::Queue,
            ..
        })
    ));
    assert!(matches!(
        reg.send_queue("m", "A", b"x"),
        Err(ChannelError::WrongChannelKind {
            expected: ChannelKind::Queue,
            actual: ChannelKind::SharedMemory,
            ..
        })
    ));
    assert!(matches!(
        reg.send_pipe("q", &mut left, "A", b"x"),
        Err(ChannelError::WrongChannelKind {
            expected: ChannelKind::Pipe,
            ..
        })
    ));
    assert!(matches!(
        reg.recv_queue("p", "A", Some(Duration::ZERO)),
        Err(ChannelError::WrongChannelKind {
            actual: ChannelKind::Pipe,
            ..
        })
    ));
}
