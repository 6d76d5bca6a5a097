//! Runtime message channel over stdio
//!
//! One JSON document per line in each direction. Inbound lines are
//! `{ "id", "action", "data" }`; the host answers each with
//! `{ "id", "response" }` and interleaves one-way notices
//! (`{ "event": "progress" | "badge", .. }`) on the same stream.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use vidsum_core::{Inbound, Notifier};
use vidsum_domain::{ForegroundNotice, Result, RpcRequest, RpcResponse, VidSumError};

/// One request line
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundFrame {
    /// Correlation id chosen by the foreground; echoed back untouched.
    #[serde(default)]
    pub id: Value,
    #[serde(flatten)]
    pub request: RpcRequest,
}

/// One output line
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutboundFrame {
    Response { id: Value, response: RpcResponse },
    Notice(ForegroundNotice),
}

/// A line that could not be turned into a request
#[derive(Debug)]
pub struct Rejected {
    pub id: Value,
    pub error: VidSumError,
}

impl From<Rejected> for OutboundFrame {
    fn from(rejected: Rejected) -> Self {
        Self::Response { id: rejected.id, response: RpcResponse::from(&rejected.error) }
    }
}

/// Raw line as text, without its terminator; `None` for a blank line.
fn decode_line(raw: &[u8]) -> std::result::Result<Option<&str>, Rejected> {
    let text = std::str::from_utf8(raw).map_err(|e| Rejected {
        id: Value::Null,
        error: VidSumError::Serialization(format!("request line is not UTF-8: {e}")),
    })?;
    let trimmed = text.trim();
    Ok((!trimmed.is_empty()).then_some(trimmed))
}

/// Parse one request line.
///
/// Malformed envelopes keep whatever `id` could be recovered so the
/// foreground can still correlate the failure.
///
/// # Errors
/// Returns [`Rejected`] when the line is not JSON or not an envelope.
pub fn parse_frame(line: &str) -> std::result::Result<InboundFrame, Rejected> {
    let value: Value = serde_json::from_str(line).map_err(|e| Rejected {
        id: Value::Null,
        error: VidSumError::Serialization(e.to_string()),
    })?;
    let id = value.get("id").cloned().unwrap_or(Value::Null);

    serde_json::from_value(value)
        .map_err(|e| Rejected { id, error: VidSumError::InvalidInput(e.to_string()) })
}

/// Notifier that interleaves notices with responses on the output stream
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    outbound: mpsc::Sender<OutboundFrame>,
}

impl ChannelNotifier {
    pub const fn new(outbound: mpsc::Sender<OutboundFrame>) -> Self {
        Self { outbound }
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, notice: ForegroundNotice) -> Result<()> {
        self.outbound
            .send(OutboundFrame::Notice(notice))
            .await
            .map_err(|_| VidSumError::Internal("foreground channel closed".to_string()))
    }
}

/// Read request lines until EOF or `shutdown`, handing each envelope to the
/// dispatcher inbox.
///
/// Every envelope gets a forwarding task that writes its response as soon as
/// it is ready, so slow actions never hold back fast ones.
///
/// # Errors
/// Returns the underlying I/O error when reading fails.
pub async fn read_requests<R>(
    reader: R,
    inbox: mpsc::Sender<Inbound>,
    outbound: mpsc::Sender<OutboundFrame>,
    shutdown: CancellationToken,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();

    loop {
        line.clear();
        let bytes_read = tokio::select! {
            () = shutdown.cancelled() => break,
            read = reader.read_until(b'\n', &mut line) => read?,
        };

        if bytes_read == 0 {
            debug!("Foreground closed the request stream");
            break;
        }

        let frame = match decode_line(&line).and_then(|text| text.map(parse_frame).transpose()) {
            Ok(None) => continue,
            Ok(Some(frame)) => frame,
            Err(rejected) => {
                warn!(error = %rejected.error, "Rejecting malformed request line");
                if outbound.send(rejected.into()).await.is_err() {
                    break;
                }
                continue;
            }
        };

        let (envelope, receiver) = Inbound::new(frame.request);
        if inbox.send(envelope).await.is_err() {
            debug!("Dispatcher inbox closed");
            break;
        }

        let outbound = outbound.clone();
        let id = frame.id;
        tokio::spawn(async move {
            match receiver.await {
                Ok(response) => {
                    if outbound.send(OutboundFrame::Response { id, response }).await.is_err() {
                        debug!("Output stream closed before the response was written");
                    }
                }
                Err(_) => warn!(id = %id, "Dispatcher dropped a request without answering"),
            }
        });
    }

    Ok(())
}

/// Write frames as they arrive until every sender is gone.
///
/// # Errors
/// Returns the underlying I/O error when writing fails.
pub async fn write_frames<W>(mut writer: W, mut frames: mpsc::Receiver<OutboundFrame>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = frames.recv().await {
        let mut bytes = match serde_json::to_vec(&frame) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(error = %err, "Dropping frame that failed to serialize");
                continue;
            }
        };
        bytes.push(b'\n');

        writer.write_all(&bytes).await?;
        writer.flush().await?;
    }

    Ok(())
}
