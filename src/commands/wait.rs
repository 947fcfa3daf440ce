use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crate::commands::{Command, CommandError, CommandOutcome};
use crate::context::ServerContext;
use crate::replication::AckBarrier;
use crate::resp;
use crate::resp::RespValue;

pub struct WaitArguments {
    num_replicas: usize,
    /// `None` means no deadline.
    timeout: Option<Duration>,
}

impl WaitArguments {
    pub fn parse(command: &Command) -> Result<Self, CommandError> {
        if command.args.len() != 2 {
            return Err(CommandError::WrongArity("wait"));
        }

        let num_replicas = command
            .arg_str(0)?
            .parse::<usize>()
            .map_err(|_| CommandError::SyntaxError)?;

        let timeout_ms = command
            .arg_str(1)?
            .parse::<u64>()
            .map_err(|_| CommandError::SyntaxError)?;

        let timeout = match timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };

        Ok(Self {
            num_replicas,
            timeout,
        })
    }
}

/// Blocks until `num_replicas` replicas have acknowledged the propagation
/// offset observed at entry, or the deadline passes.
///
/// If the quorum is already met the reply is immediate and nothing is
/// sent to the replicas. Otherwise a `REPLCONF GETACK *` is broadcast, a
/// barrier sized to `min(num_replicas, attached)` is armed, and the
/// caller sleeps on it under the deadline. Either way the reply is the
/// number of replicas synced to the entry offset. The broadcast GETACK
/// frame itself counts toward the propagation offset afterwards.
///
/// Concurrent WAIT callers serialise on the master's wait gate; ordinary
/// dispatch is not blocked.
pub async fn wait(ctx: &ServerContext, command: &Command) -> Result<CommandOutcome, CommandError> {
    let ServerContext::Master(master) = ctx else {
        return Err(CommandError::MasterOnly("WAIT"));
    };

    let args = WaitArguments::parse(command)?;
    let _gate = master.wait_gate.lock().await;

    let target_offset = master.prop_offset.load(Ordering::SeqCst);

    let synced = master.replicas.synced_count(target_offset).await;
    if synced >= args.num_replicas {
        return Ok(CommandOutcome::Response(
            RespValue::Integer(synced as i64).encode(),
        ));
    }

    let getack = resp::encode_bulk_array([b"REPLCONF".as_slice(), b"GETACK", b"*"]);
    master.replicas.propagate(&getack).await;

    let needed = args.num_replicas.min(master.replicas.count().await);
    let barrier = Arc::new(AckBarrier::new(needed));
    *master.barrier.lock().await = Some(Arc::clone(&barrier));

    match args.timeout {
        Some(deadline) => {
            let _ = tokio::time::timeout(deadline, barrier.wait()).await;
        }
        None => barrier.wait().await,
    }

    *master.barrier.lock().await = None;

    let synced = master.replicas.synced_count(target_offset).await;
    master
        .prop_offset
        .fetch_add(getack.len() as u64, Ordering::SeqCst);

    Ok(CommandOutcome::Response(
        RespValue::Integer(synced as i64).encode(),
    ))
}
