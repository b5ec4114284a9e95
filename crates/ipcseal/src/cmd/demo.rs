use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ipcseal_channel::{AccessControl, ChannelRegistry, RegistryConfig};
use rand::RngCore;
use tracing::info;

use crate::cmd::{parse_duration, DemoArgs};
use crate::exit::{channel_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_message, OutputFormat, Received};

const QUEUE: &str = "jobs";
const PIPE: &str = "pipe1";
const SHM: &str = "shm1";

type WorkerResult = ipcseal_channel::Result<()>;

pub fn run(args: DemoArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let secret = match args.secret.secret_bytes()? {
        Some(secret) => secret,
        None => {
            info!("no shared secret supplied, using an ephemeral one");
            let mut secret = vec![0u8; 32];
            rand::thread_rng().fill_bytes(&mut secret);
            secret
        }
    };
    let security = args.secret.context_from(secret)?;

    let config = RegistryConfig {
        default_shm_size: args.shm_size,
        ..RegistryConfig::default()
    };
    let registry = Arc::new(ChannelRegistry::with_config(
        Arc::new(security),
        Arc::new(AccessControl::new()),
        config,
    ));
    info!(
        encryption = registry.security().encryption_enabled(),
        "demo starting"
    );

    queue_exchange(&registry, timeout, format)?;
    pipe_exchange(&registry, timeout, format)?;
    shared_memory_exchange(&registry, format)?;

    info!("demo complete");
    Ok(SUCCESS)
}

/// clientA enqueues, workerA dequeues and replies reversed on the same queue.
fn queue_exchange(
    registry: &Arc<ChannelRegistry>,
    timeout: Duration,
    format: OutputFormat,
) -> CliResult<()> {
    registry
        .create_queue(QUEUE)
        .map_err(|err| channel_error("create queue failed", err))?;
    registry.access_control().allow(QUEUE, "clientA");
    registry.access_control().allow(QUEUE, "workerA");

    registry
        .send_queue(QUEUE, "clientA", b"Hello workerA via QUEUE")
        .map_err(|err| channel_error("queue send failed", err))?;

    let worker = {
        let registry = Arc::clone(registry);
        spawn_worker("worker-queue", move || {
            let (meta, message) = registry.recv_queue(QUEUE, "workerA", Some(timeout))?;
            show(QUEUE, "workerA", &meta, &message, format);
            let reply: Vec<u8> = message.iter().rev().copied().collect();
            registry.send_queue(QUEUE, "workerA", &reply)
        })?
    };
    join_worker(worker, "queue worker")?;

    let (meta, message) = registry
        .recv_queue(QUEUE, "clientA", Some(timeout))
        .map_err(|err| channel_error("queue receive failed", err))?;
    show(QUEUE, "clientA", &meta, &message, format);
    Ok(())
}

/// clientB writes on one end, workerB answers `ACK:<message>` on the other.
fn pipe_exchange(
    registry: &Arc<ChannelRegistry>,
    timeout: Duration,
    format: OutputFormat,
) -> CliResult<()> {
    let (mut client_end, mut worker_end) = registry
        .create_pipe(PIPE)
        .map_err(|err| channel_error("create pipe failed", err))?;
    registry.access_control().allow(PIPE, "clientB");
    registry.access_control().allow(PIPE, "workerB");

    let worker = {
        let registry = Arc::clone(registry);
        spawn_worker("worker-pipe", move || {
            let (meta, message) =
                registry.recv_pipe(PIPE, &mut worker_end, "workerB", Some(timeout))?;
            show(PIPE, "workerB", &meta, &message, format);
            let mut reply = b"ACK:".to_vec();
            reply.extend_from_slice(&message);
            registry.send_pipe(PIPE, &mut worker_end, "workerB", &reply)
        })?
    };

    registry
        .send_pipe(PIPE, &mut client_end, "clientB", b"Hello workerB via PIPE")
        .map_err(|err| channel_error("pipe send failed", err))?;
    let (meta, message) = registry
        .recv_pipe(PIPE, &mut client_end, "clientB", Some(timeout))
        .map_err(|err| channel_error("pipe receive failed", err))?;
    join_worker(worker, "pipe worker")?;
    show(PIPE, "clientB", &meta, &message, format);
    Ok(())
}

/// clientC publishes state, workerC reads it and overwrites with a reply.
fn shared_memory_exchange(registry: &Arc<ChannelRegistry>, format: OutputFormat) -> CliResult<()> {
    registry
        .create_shared_memory_default(SHM)
        .map_err(|err| channel_error("create shared memory failed", err))?;
    registry.access_control().allow(SHM, "clientC");
    registry.access_control().allow(SHM, "workerC");

    registry
        .write_shared_memory(SHM, "clientC", b"Hello workerC via SHM")
        .map_err(|err| channel_error("shared memory write failed", err))?;

    let worker = {
        let registry = Arc::clone(registry);
        spawn_worker("worker-shm", move || {
            let (meta, message) = registry.read_shared_memory(SHM, "workerC")?;
            show(SHM, "workerC", &meta, &message, format);
            let mut reply = b"REPLY:".to_vec();
            reply.extend_from_slice(&message);
            registry.write_shared_memory(SHM, "workerC", &reply)
        })?
    };
    join_worker(worker, "shared memory worker")?;

    let (meta, message) = registry
        .read_shared_memory(SHM, "clientC")
        .map_err(|err| channel_error("shared memory read failed", err))?;
    show(SHM, "clientC", &meta, &message, format);

    registry
        .unlink_shared_memory(SHM)
        .map_err(|err| channel_error("shared memory unlink failed", err))
}

fn show(
    channel: &str,
    receiver: &str,
    meta: &ipcseal_channel::EnvelopeMeta,
    message: &[u8],
    format: OutputFormat,
) {
    print_message(
        &Received {
            channel: Some(channel),
            receiver: Some(receiver),
            meta,
            message,
        },
        format,
    );
}

fn spawn_worker<F>(name: &str, work: F) -> CliResult<JoinHandle<WorkerResult>>
where
    F: FnOnce() -> WorkerResult + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(work)
        .map_err(|err| CliError::new(INTERNAL, format!("failed to spawn {name}: {err}")))
}

fn join_worker(handle: JoinHandle<WorkerResult>, context: &str) -> CliResult<()> {
    handle
        .join()
        .map_err(|_| CliError::new(INTERNAL, format!("{context} panicked")))?
        .map_err(|err| channel_error(&format!("{context} failed"), err))
}
