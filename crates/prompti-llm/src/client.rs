//! Client facade
//!
//! [`ModelClient::run`] checks the call up front, then spawns one task per
//! call that posts to the vendor, decodes the answer and pushes canonical
//! events into a bounded channel. The caller reads them through
//! [`EventStream`]; dropping it aborts the task and the socket with it.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};
use opentelemetry::context::FutureExt as _;
use prompti_config::{ModelConfig, parse_duration};
use prompti_telemetry::MetricsSink;
use secrecy::SecretString;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;
use url::Url;

use crate::error::LlmError;
use crate::instrument::{self, EventTimer, InflightGuard, Tick};
use crate::provider::{Provider, ProviderRegistry};
use crate::retry::{RetryPolicy, with_retry};
use crate::stream::{DecoderState, StreamDecoder};
use crate::types::{Message, Request, StreamEvent};

/// Events buffered between the call task and the consumer
const EVENT_BUFFER: usize = 32;

type EventResult = Result<StreamEvent, LlmError>;

/// Entry point for model calls
///
/// Owns the HTTP connection pool and the metrics sink. The config may be
/// swapped between calls; each call works on a snapshot taken when it
/// starts.
pub struct ModelClient {
    config: ModelConfig,
    registry: ProviderRegistry,
    http: Option<reqwest::Client>,
    metrics: Arc<dyn MetricsSink>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for ModelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelClient")
            .field("provider", &self.config.provider)
            .field("model", &self.config.model)
            .field("closed", &self.is_closed())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ModelClient {
    /// Build a client for `config`, reporting to `metrics`
    ///
    /// # Errors
    ///
    /// Returns an error if a configured timeout cannot be parsed or the HTTP
    /// client cannot be built
    pub fn new(config: ModelConfig, metrics: Arc<dyn MetricsSink>) -> Result<Self, LlmError> {
        let http = build_http(&config)?;

        Ok(Self {
            config,
            registry: ProviderRegistry::builtin(),
            http: Some(http),
            metrics,
            retry: RetryPolicy::default(),
        })
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub const fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Replace the config used by subsequent calls
    ///
    /// Calls already running keep the config they started with.
    ///
    /// # Errors
    ///
    /// Returns an error if changed timeouts cannot be applied
    pub fn set_config(&mut self, config: ModelConfig) -> Result<(), LlmError> {
        let timeouts_changed =
            config.connect_timeout != self.config.connect_timeout || config.read_timeout != self.config.read_timeout;

        if self.http.is_some() && timeouts_changed {
            self.http = Some(build_http(&config)?);
        }

        self.config = config;
        Ok(())
    }

    /// Release the connection pool
    ///
    /// Idempotent; calls already running finish on their own handle.
    pub fn close(&mut self) {
        if self.http.take().is_some() {
            tracing::debug!(provider = %self.config.provider, "model client closed");
        }
    }

    pub const fn is_closed(&self) -> bool {
        self.http.is_none()
    }

    /// Start a call and return its event stream
    ///
    /// Must be called from within a Tokio runtime. Misuse is reported here,
    /// before anything is sent; vendor failures arrive as
    /// [`StreamEvent::Error`] and exhausted transport retries as a final
    /// `Err` item on the stream.
    ///
    /// # Errors
    ///
    /// Returns `Closed` after [`close`](Self::close), `MissingConfig` for a
    /// blank provider or model (or an unresolvable endpoint),
    /// `ProviderNotFound` for an unknown provider, `InvalidRequest` for a
    /// malformed request and `NoRuntime` outside a Tokio runtime
    pub fn run(&self, request: &Request) -> Result<EventStream, LlmError> {
        let http = self.http.clone().ok_or(LlmError::Closed)?;
        let config = self.config.clone();

        if config.provider.trim().is_empty() {
            return Err(LlmError::MissingConfig("model.provider".to_owned()));
        }
        if config.model.trim().is_empty() {
            return Err(LlmError::MissingConfig("model.model".to_owned()));
        }

        let provider = self
            .registry
            .get(&config.provider)
            .ok_or_else(|| LlmError::ProviderNotFound {
                provider: config.provider.clone(),
            })?;

        request.validate()?;

        let call = Call {
            endpoint: provider.endpoint(&config)?,
            api_key: provider.api_key(&config),
            body: provider.to_wire(request, &config)?,
            stream: request.stream,
            max_calls: request.tool_params.as_ref().and_then(|params| params.max_calls),
            http,
            provider,
            model: config.model,
            metrics: Arc::clone(&self.metrics),
            retry: self.retry.clone(),
        };

        let span = instrument::call_span(call.provider.id(), &call.model, &request.trace);
        let baggage = instrument::baggage_context(&request.trace);

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| LlmError::NoRuntime)?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let task = runtime.spawn(call.drive(tx).instrument(span).with_context(baggage));

        Ok(EventStream { rx, task })
    }
}

fn build_http(config: &ModelConfig) -> Result<reqwest::Client, LlmError> {
    let mut builder = reqwest::Client::builder();

    if let Some(timeout) = &config.connect_timeout {
        builder = builder.connect_timeout(parse_duration(timeout)?);
    }
    // Idle limit per read, not a deadline on the whole exchange
    if let Some(timeout) = &config.read_timeout {
        builder = builder.read_timeout(parse_duration(timeout)?);
    }

    builder
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}").into())
}

/// Canonical events of one call, in vendor order
///
/// Ends after the last event, or after a single `Err` once transport
/// retries are exhausted. Dropping the stream cancels the call.
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::Receiver<EventResult>,
    task: JoinHandle<()>,
}

impl EventStream {
    /// Collect the answer as assistant messages
    ///
    /// Messages received before a [`StreamEvent::Reset`] are discarded.
    ///
    /// # Errors
    ///
    /// Returns the transport error that ended the call
    pub async fn into_messages(mut self) -> Result<Vec<Message>, LlmError> {
        let mut messages = Vec::new();

        while let Some(item) = self.next().await {
            match item?.into_message() {
                Some(message) => messages.push(message),
                None => messages.clear(),
            }
        }

        Ok(messages)
    }
}

impl Stream for EventStream {
    type Item = EventResult;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// How an attempt that did not fail at the transport level ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed,
    VendorError,
}

/// Everything one call needs, snapshotted at `run`
struct Call {
    http: reqwest::Client,
    provider: Arc<dyn Provider>,
    model: String,
    endpoint: Url,
    api_key: Option<SecretString>,
    body: Value,
    stream: bool,
    max_calls: Option<usize>,
    metrics: Arc<dyn MetricsSink>,
    retry: RetryPolicy,
}

impl Call {
    async fn drive(self, tx: mpsc::Sender<EventResult>) {
        let provider = self.provider.id();
        let _inflight = InflightGuard::new(Arc::clone(&self.metrics), provider);

        let emitter = Emitter {
            tx,
            timer: Mutex::new(EventTimer::start()),
            dirty: AtomicBool::new(false),
            metrics: Arc::clone(&self.metrics),
            provider,
            model: self.model.clone(),
        };

        let call = &self;
        let events = &emitter;
        let outcome = with_retry(&self.retry, move |attempt| call.attempt(attempt, events)).await;

        self.metrics.request_latency(provider, emitter.elapsed_secs());

        let (result, is_error) = match &outcome {
            Ok(Outcome::Completed) => ("success", false),
            Ok(Outcome::VendorError) => ("vendor_error", true),
            Err(LlmError::Cancelled) => ("cancelled", false),
            Err(_) => ("transport_error", true),
        };
        self.metrics.request_finished(provider, result, is_error);

        match outcome {
            Ok(_) => tracing::debug!(result, "model call finished"),
            Err(LlmError::Cancelled) => tracing::debug!("event stream dropped, call abandoned"),
            Err(e) => {
                tracing::warn!(error = %e, "model call failed");
                // Nobody left to tell if this fails
                let _ = emitter.tx.send(Err(e)).await;
            }
        }
    }

    async fn attempt(&self, attempt: u32, emitter: &Emitter) -> Result<Outcome, LlmError> {
        if attempt > 1 && emitter.take_dirty() {
            emitter.emit(StreamEvent::Reset { attempt }).await?;
        }

        let mut decoder = StreamDecoder::new(self.provider.decoder(), self.max_calls);
        let outcome = self.exchange(attempt, &mut decoder, emitter).await;

        let usage = decoder.usage();
        if !usage.is_empty() {
            self.metrics.usage(
                self.provider.id(),
                &self.model,
                usage.prompt_tokens,
                usage.completion_tokens,
            );
        }

        outcome
    }

    async fn exchange(
        &self,
        attempt: u32,
        decoder: &mut StreamDecoder,
        emitter: &Emitter,
    ) -> Result<Outcome, LlmError> {
        tracing::debug!(attempt, endpoint = %self.endpoint, stream = self.stream, "sending request");

        let builder = self.http.post(self.endpoint.clone()).json(&self.body);
        let response = self.provider.prepare(builder, self.api_key.as_ref()).send().await?;

        let status = response.status();
        decoder.on_response(status.as_u16());

        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await?;
            tracing::warn!(status = %status, "vendor returned an error status");
            emitter.emit(decoder.fail(status.as_u16(), body)).await?;
            return Ok(Outcome::VendorError);
        }

        if self.stream {
            let mut events = response.bytes_stream().eventsource();

            while let Some(event) = events.next().await {
                let event = event.map_err(|e| LlmError::Transport(format!("event stream failed: {e}")))?;
                emitter.emit_all(decoder.on_data(&event.data)).await?;

                if decoder.is_terminal() {
                    break;
                }
            }

            emitter.emit_all(decoder.finish()).await?;
        } else {
            let body = response.text().await?;
            emitter.emit_all(decoder.on_body(body)).await?;
        }

        Ok(match decoder.state() {
            DecoderState::Errored => Outcome::VendorError,
            _ => Outcome::Completed,
        })
    }
}

/// Sending side of a call, timing every event
struct Emitter {
    tx: mpsc::Sender<EventResult>,
    timer: Mutex<EventTimer>,
    /// Set once an attempt has delivered an event
    dirty: AtomicBool,
    metrics: Arc<dyn MetricsSink>,
    provider: &'static str,
    model: String,
}

impl Emitter {
    async fn emit(&self, event: StreamEvent) -> Result<(), LlmError> {
        if !matches!(event, StreamEvent::Reset { .. }) {
            let tick = self.timer.lock().unwrap_or_else(PoisonError::into_inner).tick();
            match tick {
                Tick::FirstToken(secs) => self.metrics.first_token(self.provider, &self.model, secs),
                Tick::Gap(secs) => self.metrics.token_gap(self.provider, &self.model, secs),
            }
            self.dirty.store(true, Ordering::Relaxed);
        }

        self.tx.send(Ok(event)).await.map_err(|_| LlmError::Cancelled)
    }

    async fn emit_all(&self, events: Vec<StreamEvent>) -> Result<(), LlmError> {
        for event in events {
            self.emit(event).await?;
        }
        Ok(())
    }

    fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::Relaxed)
    }

    fn elapsed_secs(&self) -> f64 {
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
            .as_secs_f64()
    }
}
