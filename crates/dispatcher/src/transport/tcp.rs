//! TcpConnector - framed request/response channel over TCP
//!
//! Wire layout: 4-byte big-endian length prefix, then a JSON or bincode body.
//! The request body is a `TaskEnvelope`, the response body a `DeliveryReply`.

use bytes::{BufMut, BytesMut};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, instrument};

use contracts::{ContractError, DeliveryReply, Task, WireFormat, WorkerChannel, WorkerConnector};

/// Upper bound for a reply frame; anything larger is treated as a corrupt peer
pub const DEFAULT_MAX_REPLY_BYTES: usize = 64 * 1024;

/// Wire envelope around one delivered task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEnvelope {
    /// The task, verbatim
    pub task: Task,

    /// When this attempt left the dispatcher
    pub dispatched_at: DateTime<Utc>,
}

/// Connector producing framed TCP channels
#[derive(Debug, Clone)]
pub struct TcpConnector {
    format: WireFormat,
    max_reply_bytes: usize,
}

impl TcpConnector {
    /// Create a connector for the given wire format
    pub fn new(format: WireFormat) -> Self {
        Self {
            format,
            max_reply_bytes: DEFAULT_MAX_REPLY_BYTES,
        }
    }

    /// Override the reply frame cap
    pub fn with_max_reply_bytes(mut self, max_reply_bytes: usize) -> Self {
        self.max_reply_bytes = max_reply_bytes;
        self
    }
}

impl WorkerConnector for TcpConnector {
    type Channel = TcpChannel;

    #[instrument(name = "tcp_dial", skip(self), fields(addr = %addr))]
    async fn dial(&self, addr: &str) -> Result<TcpChannel, ContractError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| ContractError::dial(addr, e.to_string()))?;

        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "could not disable nagle on worker channel");
        }

        debug!(
            peer = %addr,
            format = self.format.as_str(),
            "tcp channel established"
        );

        Ok(TcpChannel {
            stream,
            peer: addr.to_string(),
            format: self.format,
            max_reply_bytes: self.max_reply_bytes,
        })
    }
}

/// One established TCP channel to the worker
pub struct TcpChannel {
    stream: TcpStream,
    peer: String,
    format: WireFormat,
    max_reply_bytes: usize,
}

impl WorkerChannel for TcpChannel {
    fn peer(&self) -> &str {
        &self.peer
    }

    #[instrument(
        name = "tcp_deliver",
        skip(self, task),
        fields(peer = %self.peer, task_id = %task.id)
    )]
    async fn deliver(&mut self, task: &Task) -> Result<DeliveryReply, ContractError> {
        let frame = encode_task_frame(task, self.format)?;
        self.stream
            .write_all(&frame)
            .await
            .map_err(|e| ContractError::delivery(&self.peer, format!("send failed: {e}")))?;

        let mut len_buf = [0u8; 4];
        self.stream
            .read_exact(&mut len_buf)
            .await
            .map_err(|e| ContractError::delivery(&self.peer, format!("reply read failed: {e}")))?;

        let len = u32::from_be_bytes(len_buf) as usize;
        if len > self.max_reply_bytes {
            return Err(ContractError::delivery(
                &self.peer,
                format!(
                    "reply frame of {len} bytes exceeds cap of {}",
                    self.max_reply_bytes
                ),
            ));
        }

        let mut body = vec![0u8; len];
        self.stream
            .read_exact(&mut body)
            .await
            .map_err(|e| ContractError::delivery(&self.peer, format!("reply read failed: {e}")))?;

        decode_body::<DeliveryReply>(&body, self.format)
    }
}

/// Encode a task into a ready-to-send frame (length prefix included)
pub fn encode_task_frame(task: &Task, format: WireFormat) -> Result<Vec<u8>, ContractError> {
    let envelope = TaskEnvelope {
        task: task.clone(),
        dispatched_at: Utc::now(),
    };
    Ok(frame(encode_body(&envelope, format)?))
}

/// Encode a reply into a ready-to-send frame (used by worker stubs in tests)
pub fn encode_reply_frame(
    reply: &DeliveryReply,
    format: WireFormat,
) -> Result<Vec<u8>, ContractError> {
    Ok(frame(encode_body(reply, format)?))
}

/// Decode a request body into its envelope (used by worker stubs in tests)
pub fn decode_envelope(body: &[u8], format: WireFormat) -> Result<TaskEnvelope, ContractError> {
    decode_body(body, format)
}

fn encode_body<T: Serialize>(value: &T, format: WireFormat) -> Result<Vec<u8>, ContractError> {
    match format {
        WireFormat::Json => serde_json::to_vec(value)
            .map_err(|e| ContractError::codec(format.as_str(), e.to_string())),
        WireFormat::Bincode => bincode::serialize(value)
            .map_err(|e| ContractError::codec(format.as_str(), e.to_string())),
    }
}

fn decode_body<T: DeserializeOwned>(body: &[u8], format: WireFormat) -> Result<T, ContractError> {
    match format {
        WireFormat::Json => serde_json::from_slice(body)
            .map_err(|e| ContractError::codec(format.as_str(), e.to_string())),
        WireFormat::Bincode => bincode::deserialize(body)
            .map_err(|e| ContractError::codec(format.as_str(), e.to_string())),
    }
}

fn frame(body: Vec<u8>) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(4 + body.len());
    buf.put_u32(body.len() as u32);
    buf.put_slice(&body);
    buf.to_vec()
}
