//! Line-delimited JSON command transport
//!
//! Each input line is one request:
//!
//! ```text
//! {"id": 1, "command": "populate_with_value", "value": 100, "size": 4}
//! ```
//!
//! and produces exactly one response line, `{"id", "ok": true, "result"}` or
//! `{"id", "ok": false, "error": {"kind", "code", "message"}}`. Watch events
//! are interleaved as `{"event": "value_update", "subscription", "value"}`
//! or `{"event": "values_update", "subscription", "values"}` lines.

use crate::core::types::{Address, MemoryError, MemoryResult, ProcessId, WatchId};
use crate::engine::Engine;
use crate::watch::{WatchEvent, WatchSubscription, WatchTarget};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// One command, tagged by `command`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Request {
    SelectProcess {
        pid: ProcessId,
    },
    ListProcesses {
        #[serde(default)]
        query: String,
    },
    GetCurrentProcess,
    RefreshRegions,
    PopulateWithValue {
        value: u64,
        #[serde(default)]
        size: Option<usize>,
    },
    ScanNext {
        value: u64,
    },
    ExpectChange {
        is_changed: bool,
    },
    #[serde(alias = "reset_values")]
    Reset,
    Detach,
    ResetState,
    WatchValue {
        address: Address,
        size: usize,
    },
    WatchValues {
        addresses: Vec<Address>,
        size: usize,
    },
    #[serde(alias = "unlisten_value", alias = "unlisten_values")]
    Unlisten,
    Write {
        address: Address,
        size: usize,
        value: u64,
    },
    Neighbors {
        offset: Address,
    },
    Bhop {
        address: Address,
        size: usize,
    },
    ChangeSettings {
        value_size: usize,
    },
    GetSettings,
    GetProcessMemory {
        #[serde(default, alias = "sizing")]
        size: Option<usize>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub code: &'static str,
    pub message: String,
}

impl From<&MemoryError> for ErrorBody {
    fn from(error: &MemoryError) -> Self {
        ErrorBody {
            kind: error.kind(),
            code: error.code(),
            message: error.to_string(),
        }
    }
}

/// The answer to one request line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub id: Option<u64>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    fn from_outcome(id: Option<u64>, outcome: MemoryResult<Value>) -> Self {
        match outcome {
            Ok(result) => Response {
                id,
                ok: true,
                result: Some(result),
                error: None,
            },
            Err(error) => Response {
                id,
                ok: false,
                result: None,
                error: Some(ErrorBody::from(&error)),
            },
        }
    }
}

/// Serves an [`Engine`] over a line-oriented reader/writer pair
pub struct Server {
    engine: Engine,
    forwarder: Option<(WatchId, JoinHandle<()>)>,
}

impl Server {
    pub fn new(engine: Engine) -> Self {
        Server {
            engine,
            forwarder: None,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Runs until `reader` reaches end of input, then detaches
    pub async fn serve<R, W>(mut self, reader: R, writer: W) -> MemoryResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (outbound, mut lines_out) = mpsc::unbounded_channel::<String>();
        let writer_task = tokio::spawn(async move {
            let mut writer = writer;
            while let Some(line) = lines_out.recv().await {
                writer.write_all(line.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
            Ok::<(), std::io::Error>(())
        });

        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let response = self.handle_line(&line, &outbound).await;
            let encoded = serde_json::to_string(&response)?;
            if outbound.send(encoded).is_err() {
                warn!("output closed; stopping");
                break;
            }
        }

        info!("input closed; detaching");
        self.engine.detach().await;
        self.join_forwarder().await;
        drop(outbound);

        match writer_task.await {
            Ok(result) => result?,
            Err(e) => warn!(error = %e, "writer task failed"),
        }
        Ok(())
    }

    /// Parses and executes one request line
    pub async fn handle_line(
        &mut self,
        line: &str,
        outbound: &mpsc::UnboundedSender<String>,
    ) -> Response {
        let raw: Value = match serde_json::from_str(line) {
            Ok(raw) => raw,
            Err(e) => return Response::from_outcome(None, Err(e.into())),
        };
        let id = raw.get("id").and_then(Value::as_u64);
        let request = match serde_json::from_value::<Request>(raw) {
            Ok(request) => request,
            Err(e) => return Response::from_outcome(id, Err(e.into())),
        };

        debug!(?id, ?request, "request");
        let outcome = self.dispatch(request, outbound).await;
        // Events of a cancelled watch are flushed before this response.
        if let Some((watch, _)) = &self.forwarder {
            if self.engine.active_watch() != Some(*watch) {
                self.join_forwarder().await;
            }
        }
        if let Err(e) = &outcome {
            debug!(?id, error = %e, "request failed");
        }
        Response::from_outcome(id, outcome)
    }

    async fn dispatch(
        &mut self,
        request: Request,
        outbound: &mpsc::UnboundedSender<String>,
    ) -> MemoryResult<Value> {
        let engine = &mut self.engine;
        let result = match request {
            Request::SelectProcess { pid } => json!(engine.select_process(pid).await?),
            Request::ListProcesses { query } => json!(engine.list_processes(&query)),
            Request::GetCurrentProcess => json!(engine.current_process()),
            Request::RefreshRegions => json!({ "regions": engine.refresh_regions()? }),
            Request::PopulateWithValue { value, size } => {
                json!(engine.populate_with_value(value, size)?)
            }
            Request::ScanNext { value } => json!(engine.scan_next(value)?),
            Request::ExpectChange { is_changed } => json!(engine.expect_change(is_changed)?),
            Request::Reset => {
                engine.reset();
                Value::Null
            }
            Request::Detach => {
                engine.detach().await;
                Value::Null
            }
            Request::ResetState => {
                engine.reset_state().await;
                Value::Null
            }
            Request::WatchValue { address, size } => {
                let subscription = engine.watch(WatchTarget::Single(address), size).await;
                self.start_forwarding(subscription?, outbound).await
            }
            Request::WatchValues { addresses, size } => {
                let subscription = engine.watch(WatchTarget::Batch(addresses), size).await;
                self.start_forwarding(subscription?, outbound).await
            }
            Request::Unlisten => json!({ "cancelled": engine.unlisten().await }),
            Request::Write {
                address,
                size,
                value,
            } => {
                engine.write(address, size, value)?;
                Value::Null
            }
            Request::Neighbors { offset } => json!(engine.neighbors(offset)?),
            Request::Bhop { address, size } => {
                engine.bhop(address, size)?;
                Value::Null
            }
            Request::ChangeSettings { value_size } => json!(engine.change_settings(value_size)?),
            Request::GetSettings => json!(engine.settings()),
            Request::GetProcessMemory { size } => json!(engine.process_memory(size)?),
        };
        Ok(result)
    }

    /// Waits for the previous subscription's forwarder to drain
    ///
    /// Its poller has already been cancelled, so the channel is closed and
    /// only buffered events remain.
    async fn join_forwarder(&mut self) {
        if let Some((watch, task)) = self.forwarder.take() {
            if let Err(e) = task.await {
                warn!(watch, error = %e, "event forwarder failed");
            }
        }
    }

    /// Pipes a subscription's events to the output; returns the subscription id
    async fn start_forwarding(
        &mut self,
        subscription: WatchSubscription,
        outbound: &mpsc::UnboundedSender<String>,
    ) -> Value {
        self.join_forwarder().await;
        let id = subscription.id;
        let task = forward_events(subscription, outbound.clone());
        self.forwarder = Some((id, task));
        json!({ "subscription": id })
    }
}

fn forward_events(
    mut subscription: WatchSubscription,
    outbound: mpsc::UnboundedSender<String>,
) -> JoinHandle<()> {
    let id = subscription.id;
    tokio::spawn(async move {
        while let Some(event) = subscription.events.recv().await {
            let line = match serde_json::to_string::<WatchEvent>(&event) {
                Ok(line) => line,
                Err(e) => {
                    warn!(watch = id, error = %e, "failed to encode event");
                    continue;
                }
            };
            if outbound.send(line).is_err() {
                break;
            }
        }
        debug!(watch = id, "event forwarding finished");
    })
}
