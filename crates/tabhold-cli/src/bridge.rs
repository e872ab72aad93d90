//! Line-delimited JSON bridge
//!
//! Connects the arbiter runtime to a process that relays browser events:
//! every input line is one host message, storage notification or settings
//! load, and every output line is either the reply to a host message or a
//! request for the host.
//!
//! Requests for the host are fire-and-forget across the bridge; the relay
//! does not report back whether the host accepted them.

use crate::error::{CliError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tabhold_core::{
    ArbiterConfig, HostChannel, OutboundMessage, StorageChanges, TabholdError, TabholdResult,
};
use tabhold_runtime::{RuntimeBuilder, RuntimeHandle};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

// ----------------------------------------------------------------------------
// Wire Types
// ----------------------------------------------------------------------------

/// One input line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BridgeInput {
    /// A message from another extension, answered with a `reply` line
    Message {
        id: u64,
        sender: String,
        message: Value,
    },
    StorageChanged { changes: StorageChanges },
    StorageLoaded { values: Map<String, Value> },
}

impl BridgeInput {
    pub fn parse(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }
}

/// One output line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BridgeOutput {
    Reply { id: u64, value: bool },
    Send { message: OutboundMessage },
}

impl BridgeOutput {
    pub fn to_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

type OutputSender = mpsc::UnboundedSender<BridgeOutput>;
type OutputReceiver = mpsc::UnboundedReceiver<BridgeOutput>;

// ----------------------------------------------------------------------------
// Bridge Host
// ----------------------------------------------------------------------------

/// Host channel that writes requests to the bridge output
#[derive(Debug, Clone)]
pub struct BridgeHost {
    outputs: OutputSender,
}

impl BridgeHost {
    fn new(outputs: OutputSender) -> Self {
        Self { outputs }
    }
}

#[async_trait]
impl HostChannel for BridgeHost {
    async fn send(&self, message: OutboundMessage) -> TabholdResult<Value> {
        self.outputs
            .send(BridgeOutput::Send { message })
            .map_err(|_| TabholdError::host_unavailable("bridge output closed"))?;
        Ok(Value::Null)
    }
}

// ----------------------------------------------------------------------------
// Serve Loop
// ----------------------------------------------------------------------------

/// Run the arbiter over `input` and `output` until the input ends.
///
/// However the input ends, the runtime is shut down, every outstanding reply
/// is written, and the output is closed. Lines that are not UTF-8 or not a
/// known input are skipped.
pub async fn serve<R, W>(
    config: ArbiterConfig,
    initial_settings: Option<Map<String, Value>>,
    input: R,
    output: W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (output_sender, output_receiver) = mpsc::unbounded_channel();
    let (stop_sender, stop_receiver) = oneshot::channel();
    let writer = tokio::spawn(write_outputs(output, output_receiver, stop_receiver));

    let host = Arc::new(BridgeHost::new(output_sender.clone()));
    let mut handle = match RuntimeBuilder::new(host)
        .with_config(config)
        .build_and_start()
    {
        Ok(handle) => handle,
        Err(e) => {
            let _ = stop_sender.send(());
            return Err(e.into());
        }
    };

    let mut replies = JoinSet::new();
    let served: Result<()> = async {
        if let Some(values) = initial_settings {
            handle.load_settings(values).await?;
        }
        read_inputs(&handle, input, &output_sender, &mut replies).await
    }
    .await;
    match &served {
        Ok(()) => info!("Bridge input closed"),
        Err(e) => warn!("Bridge input failed: {}", e),
    }

    let stopped = handle.shutdown().await;
    while let Some(result) = replies.join_next().await {
        if let Err(e) = result {
            warn!("Reply task failed: {}", e);
        }
    }

    let _ = stop_sender.send(());
    let written = writer
        .await
        .map_err(|e| CliError::Bridge(format!("Output writer failed: {}", e)))?;
    served?;
    stopped?;
    written
}

async fn read_inputs<R>(
    handle: &RuntimeHandle,
    mut input: R,
    outputs: &OutputSender,
    replies: &mut JoinSet<()>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        if input.read_until(b'\n', &mut buffer).await? == 0 {
            return Ok(());
        }
        let line = match std::str::from_utf8(&buffer) {
            Ok(line) => line.trim(),
            Err(e) => {
                warn!("Skipping bridge input that is not UTF-8: {}", e);
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }
        match BridgeInput::parse(line) {
            Ok(input) => process_input(handle, input, outputs, replies).await?,
            Err(e) => warn!("Skipping malformed bridge input: {}", e),
        }
        while replies.try_join_next().is_some() {}
    }
}

async fn process_input(
    handle: &RuntimeHandle,
    input: BridgeInput,
    outputs: &OutputSender,
    replies: &mut JoinSet<()>,
) -> Result<()> {
    match input {
        BridgeInput::Message {
            id,
            sender,
            message,
        } => match handle.dispatch(sender, message).await? {
            Some(reply) => {
                let outputs = outputs.clone();
                replies.spawn(async move {
                    let value = reply.await;
                    let _ = outputs.send(BridgeOutput::Reply { id, value });
                });
            }
            None => debug!("Message {} not answered", id),
        },
        BridgeInput::StorageChanged { changes } => handle.storage_changed(changes).await?,
        BridgeInput::StorageLoaded { values } => handle.load_settings(values).await?,
    }
    Ok(())
}

/// Single writer for the output stream
async fn write_outputs<W>(
    mut output: W,
    mut outputs: OutputReceiver,
    mut stop: oneshot::Receiver<()>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            biased;
            next = outputs.recv() => match next {
                Some(line) => write_line(&mut output, &line).await?,
                None => break,
            },
            _ = &mut stop => {
                while let Ok(line) = outputs.try_recv() {
                    write_line(&mut output, &line).await?;
                }
                break;
            }
        }
    }
    output.shutdown().await?;
    Ok(())
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, line: &BridgeOutput) -> Result<()> {
    output.write_all(line.to_line()?.as_bytes()).await?;
    output.flush().await?;
    Ok(())
}
