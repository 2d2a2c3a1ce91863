//! Streaming session façade — wraps one long-lived bidirectional voice
//! session behind a strict lifecycle.
//!
//! The façade exclusively owns the call handle returned by the transport;
//! `close` consumes it, so the underlying release can only happen once. The
//! transport sits behind an adapter trait — the façade never reaches into
//! SDK internals. The session's voice is fixed for its lifetime; changing it
//! is disconnect-then-connect, never an in-place repair.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

/// Lifecycle states. `Error` is reachable from any non-idle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacadeState {
    Idle,
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
    Error,
}

impl FacadeState {
    /// States a fresh `connect()` is valid from. `Disconnected` and `Error`
    /// are terminal-idle: nothing is held, reconnecting is a fresh session.
    fn connectable(&self) -> bool {
        matches!(self, Self::Idle | Self::Disconnected | Self::Error)
    }
}

impl fmt::Display for FacadeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnecting => "disconnecting",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// Speech-activity events emitted while connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpeechEvent {
    ListeningStarted,
    ListeningStopped,
    SpeakingStarted,
    SpeakingStopped,
}

/// Mints the short-lived credential for one streaming session from a
/// trusted backend. A long-lived provider key never reaches the client side.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn mint(&self) -> anyhow::Result<String>;
}

/// Adapter over the provider's streaming SDK.
#[async_trait]
pub trait StreamingTransport: Send + Sync {
    async fn open(&self, client_secret: &str, voice: &str)
        -> anyhow::Result<Box<dyn StreamingCall>>;
}

/// An open streaming call. The event receiver can be taken once; `close`
/// consumes the handle and is the single documented release operation.
#[async_trait]
pub trait StreamingCall: Send + Sync {
    fn call_id(&self) -> &str;

    /// Take the speech-activity event stream. Yields `None` once taken.
    fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<SpeechEvent>>;

    async fn close(self: Box<Self>) -> anyhow::Result<()>;
}

struct Inner {
    state: FacadeState,
    call: Option<Box<dyn StreamingCall>>,
}

pub struct StreamingFacade {
    credentials: Arc<dyn CredentialSource>,
    transport: Arc<dyn StreamingTransport>,
    // One lock serializes connect/disconnect; neither is reentrant.
    inner: Mutex<Inner>,
}

impl StreamingFacade {
    pub fn new(
        credentials: Arc<dyn CredentialSource>,
        transport: Arc<dyn StreamingTransport>,
    ) -> Self {
        Self {
            credentials,
            transport,
            inner: Mutex::new(Inner {
                state: FacadeState::Idle,
                call: None,
            }),
        }
    }

    pub async fn state(&self) -> FacadeState {
        self.inner.lock().await.state
    }

    /// Establish the streaming session and return its event stream.
    ///
    /// Valid only from a connectable state. On failure anything partially
    /// acquired is released and the state becomes `Error`.
    pub async fn connect(
        &self,
        voice: &str,
    ) -> anyhow::Result<mpsc::UnboundedReceiver<SpeechEvent>> {
        let mut inner = self.inner.lock().await;
        if !inner.state.connectable() {
            anyhow::bail!(
                "connect is not valid from the {} state",
                inner.state
            );
        }
        inner.state = FacadeState::Connecting;

        let secret = match self.credentials.mint().await {
            Ok(s) => s,
            Err(e) => {
                inner.state = FacadeState::Error;
                return Err(e.context("failed to mint streaming credential"));
            }
        };

        let mut call = match self.transport.open(&secret, voice).await {
            Ok(c) => c,
            Err(e) => {
                inner.state = FacadeState::Error;
                return Err(e.context("failed to open streaming transport"));
            }
        };

        let Some(events) = call.take_events() else {
            // A handle without an event stream is unusable; release it.
            if let Err(e) = call.close().await {
                warn!(%e, "Release of unusable call handle failed");
            }
            inner.state = FacadeState::Error;
            anyhow::bail!("transport returned a call with no event stream");
        };

        info!(call_id = call.call_id(), voice, "Streaming session connected");
        inner.call = Some(call);
        inner.state = FacadeState::Connected;
        Ok(events)
    }

    /// Release the session. Idempotent: a concurrent or repeated call finds
    /// the handle already taken and no-ops. The transport and capture
    /// resources are released on every exit path; a failed release is
    /// logged and the state still becomes `Disconnected` so the user can
    /// reconnect.
    pub async fn disconnect(&self) {
        let mut inner = self.inner.lock().await;
        let Some(call) = inner.call.take() else {
            if inner.state != FacadeState::Idle {
                inner.state = FacadeState::Disconnected;
            }
            return;
        };

        inner.state = FacadeState::Disconnecting;
        let call_id = call.call_id().to_string();
        if let Err(e) = call.close().await {
            warn!(call_id, %e, "Transport release failed, continuing");
        }
        inner.state = FacadeState::Disconnected;
        info!(call_id, "Streaming session disconnected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct MockCreds {
        fail: bool,
    }

    #[async_trait]
    impl CredentialSource for MockCreds {
        async fn mint(&self) -> anyhow::Result<String> {
            if self.fail {
                anyhow::bail!("no provider credential configured");
            }
            Ok("ek_test".into())
        }
    }

    struct MockCall {
        events: Option<mpsc::UnboundedReceiver<SpeechEvent>>,
        close_count: Arc<AtomicUsize>,
        close_fails: bool,
    }

    #[async_trait]
    impl StreamingCall for MockCall {
        fn call_id(&self) -> &str {
            "call_test"
        }

        fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<SpeechEvent>> {
            self.events.take()
        }

        async fn close(self: Box<Self>) -> anyhow::Result<()> {
            self.close_count.fetch_add(1, Ordering::SeqCst);
            if self.close_fails {
                anyhow::bail!("release failed");
            }
            Ok(())
        }
    }

    struct MockTransport {
        open_count: AtomicUsize,
        close_count: Arc<AtomicUsize>,
        fail_open: AtomicBool,
        close_fails: bool,
    }

    impl MockTransport {
        fn new() -> Self {
            Self {
                open_count: AtomicUsize::new(0),
                close_count: Arc::new(AtomicUsize::new(0)),
                fail_open: AtomicBool::new(false),
                close_fails: false,
            }
        }
    }

    #[async_trait]
    impl StreamingTransport for MockTransport {
        async fn open(
            &self,
            _client_secret: &str,
            _voice: &str,
        ) -> anyhow::Result<Box<dyn StreamingCall>> {
            self.open_count.fetch_add(1, Ordering::SeqCst);
            if self.fail_open.load(Ordering::SeqCst) {
                anyhow::bail!("transport unavailable");
            }
            let (tx, rx) = mpsc::unbounded_channel();
            tx.send(SpeechEvent::ListeningStarted).ok();
            Ok(Box::new(MockCall {
                events: Some(rx),
                close_count: self.close_count.clone(),
                close_fails: self.close_fails,
            }))
        }
    }

    fn facade(transport: Arc<MockTransport>) -> StreamingFacade {
        StreamingFacade::new(Arc::new(MockCreds { fail: false }), transport)
    }

    #[tokio::test]
    async fn test_connect_emits_events() {
        let transport = Arc::new(MockTransport::new());
        let facade = facade(transport.clone());

        let mut events = facade.connect("alloy").await.unwrap();
        assert_eq!(facade.state().await, FacadeState::Connected);
        assert_eq!(events.recv().await, Some(SpeechEvent::ListeningStarted));
    }

    #[tokio::test]
    async fn test_connect_while_connected_is_rejected() {
        let transport = Arc::new(MockTransport::new());
        let facade = facade(transport.clone());

        facade.connect("alloy").await.unwrap();
        let err = facade.connect("alloy").await.unwrap_err();
        assert!(err.to_string().contains("connected"));
        // the live session is untouched
        assert_eq!(facade.state().await, FacadeState::Connected);
        assert_eq!(transport.open_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_double_disconnect_releases_once() {
        let transport = Arc::new(MockTransport::new());
        let facade = facade(transport.clone());

        facade.connect("alloy").await.unwrap();
        facade.disconnect().await;
        assert_eq!(facade.state().await, FacadeState::Disconnected);

        // second call: no error, no second release
        facade.disconnect().await;
        assert_eq!(facade.state().await, FacadeState::Disconnected);
        assert_eq!(transport.close_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disconnect_from_idle_is_noop() {
        let transport = Arc::new(MockTransport::new());
        let facade = facade(transport.clone());

        facade.disconnect().await;
        assert_eq!(facade.state().await, FacadeState::Idle);
        assert_eq!(transport.close_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_release_still_disconnects() {
        let mut transport = MockTransport::new();
        transport.close_fails = true;
        let transport = Arc::new(transport);
        let facade = facade(transport.clone());

        facade.connect("alloy").await.unwrap();
        facade.disconnect().await;
        assert_eq!(facade.state().await, FacadeState::Disconnected);
        assert_eq!(transport.close_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_credential_failure_enters_error_state() {
        let transport = Arc::new(MockTransport::new());
        let facade =
            StreamingFacade::new(Arc::new(MockCreds { fail: true }), transport.clone());

        assert!(facade.connect("alloy").await.is_err());
        assert_eq!(facade.state().await, FacadeState::Error);
        assert_eq!(transport.open_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_enters_error_then_reconnects() {
        let transport = Arc::new(MockTransport::new());
        let facade = facade(transport.clone());

        transport.fail_open.store(true, Ordering::SeqCst);
        assert!(facade.connect("alloy").await.is_err());
        assert_eq!(facade.state().await, FacadeState::Error);

        // error is terminal-idle; a fresh connect works
        transport.fail_open.store(false, Ordering::SeqCst);
        facade.connect("alloy").await.unwrap();
        assert_eq!(facade.state().await, FacadeState::Connected);
    }

    #[tokio::test]
    async fn test_voice_change_is_disconnect_then_connect() {
        let transport = Arc::new(MockTransport::new());
        let facade = facade(transport.clone());

        facade.connect("alloy").await.unwrap();
        facade.disconnect().await;
        facade.connect("verse").await.unwrap();

        assert_eq!(facade.state().await, FacadeState::Connected);
        assert_eq!(transport.open_count.load(Ordering::SeqCst), 2);
        assert_eq!(transport.close_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_event_wire_names() {
        let json = serde_json::to_string(&SpeechEvent::ListeningStarted).unwrap();
        assert_eq!(json, "\"listening-started\"");
        let json = serde_json::to_string(&SpeechEvent::SpeakingStopped).unwrap();
        assert_eq!(json, "\"speaking-stopped\"");
    }
}
