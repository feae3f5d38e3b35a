//! Relay for callers that cannot reach the key registry themselves.
//!
//! A sandboxed process holds a [`RelayedUrlTrust`] instead of a verifier. It
//! drops obviously unsigned URIs locally and forwards everything else,
//! unmodified, to the process that owns the verifier:
//!
//! ```text
//! sandbox: RelayedUrlTrust ── "sign=" in query? ──no──▶ false
//!                                   │ yes
//!                                   ▼
//!                          RelayTransport::forward
//!                                   │
//! host:    spawn_relay_service ──▶ UrlTrustVerifier ──▶ bool
//! ```
//!
//! The relay holds no cryptographic logic and gives the same answers as
//! calling the verifier directly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use url::Url;

use crate::error::{TrustError, TrustResult};
use crate::types::TrustConfig;
use crate::verifier::UrlTrust;

/// Carries a verification request to the process hosting the verifier.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    async fn forward(&self, uri: &Url) -> TrustResult<bool>;
}

/// [`UrlTrust`] that pre-filters and forwards over a transport.
#[derive(Debug, Clone)]
pub struct RelayedUrlTrust<T> {
    transport: T,
}

impl<T: RelayTransport> RelayedUrlTrust<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

/// Cheap check that a URI could be signed at all.
pub fn looks_signed(uri: &Url) -> bool {
    uri.query().is_some_and(|query| query.contains("sign="))
}

#[async_trait]
impl<T: RelayTransport> UrlTrust for RelayedUrlTrust<T> {
    async fn is_trusted(&self, uri: &Url) -> bool {
        if !looks_signed(uri) {
            return false;
        }

        match self.transport.forward(uri).await {
            Ok(trusted) => trusted,
            Err(e) => {
                tracing::warn!(error = %e, "failed to relay url trust check");
                false
            }
        }
    }
}

/// Transport that calls an in-process verifier directly.
#[derive(Clone)]
pub struct DirectTransport {
    target: Arc<dyn UrlTrust>,
}

impl DirectTransport {
    pub fn new(target: Arc<dyn UrlTrust>) -> Self {
        Self { target }
    }
}

impl std::fmt::Debug for DirectTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectTransport").finish_non_exhaustive()
    }
}

#[async_trait]
impl RelayTransport for DirectTransport {
    async fn forward(&self, uri: &Url) -> TrustResult<bool> {
        Ok(self.target.is_trusted(uri).await)
    }
}

/// One relayed verification.
///
/// The URI travels in serialized form, as it would across a process boundary.
#[derive(Debug)]
pub struct RelayRequest {
    pub uri: String,
    pub reply: oneshot::Sender<bool>,
}

/// Transport over a tokio channel to a relay service task.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    sender: mpsc::Sender<RelayRequest>,
    timeout: Duration,
}

impl ChannelTransport {
    pub fn new(sender: mpsc::Sender<RelayRequest>, timeout: Duration) -> Self {
        Self { sender, timeout }
    }
}

#[async_trait]
impl RelayTransport for ChannelTransport {
    async fn forward(&self, uri: &Url) -> TrustResult<bool> {
        let (reply, response) = oneshot::channel();
        let request = RelayRequest {
            uri: uri.as_str().to_string(),
            reply,
        };

        let exchange = async {
            self.sender
                .send(request)
                .await
                .map_err(|_| TrustError::Relay {
                    message: "relay service is not running".into(),
                })?;
            response.await.map_err(|_| TrustError::Relay {
                message: "relay service dropped the request".into(),
            })
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| TrustError::Relay {
                message: format!("no answer within {}ms", self.timeout.as_millis()),
            })?
    }
}

/// Serve relayed requests against `verifier` until every transport is dropped.
pub fn spawn_relay_service(
    verifier: Arc<dyn UrlTrust>,
    config: &TrustConfig,
) -> (ChannelTransport, JoinHandle<()>) {
    let (sender, mut receiver) = mpsc::channel::<RelayRequest>(config.relay_queue.max(1));

    let handle = tokio::spawn(async move {
        while let Some(request) = receiver.recv().await {
            let verifier = verifier.clone();
            tokio::spawn(async move {
                let trusted = match Url::parse(&request.uri) {
                    Ok(uri) => verifier.is_trusted(&uri).await,
                    Err(e) => {
                        tracing::trace!(error = %e, "relayed uri does not parse");
                        false
                    }
                };
                // The caller may have timed out and gone away
                let _ = request.reply.send(trusted);
            });
        }
        tracing::debug!("url trust relay stopped");
    });

    (
        ChannelTransport::new(sender, config.relay_timeout()),
        handle,
    )
}
