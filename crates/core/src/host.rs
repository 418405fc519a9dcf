//! One-shot request/response exchanges with the host process.
//!
//! The host answers each request kind at most once per request. A listener
//! is attached when a request is emitted and detaches itself when the
//! matching reply is delivered; a second request of the same kind cannot be
//! issued while one is in flight. Replies are picked up without blocking
//! through [`PendingReply::poll`], which keeps "not yet available" a
//! representable state.

use crate::error::{ArchscopeError, Result};
use archscope_api::CapabilityKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    ArchitectPlugins,
    InferencePlugins,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum HostRequest {
    #[serde(rename = "architectPlugins")]
    ArchitectPlugins,
    #[serde(rename = "inferencePlugins")]
    InferencePlugins,
}

impl HostRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            HostRequest::ArchitectPlugins => RequestKind::ArchitectPlugins,
            HostRequest::InferencePlugins => RequestKind::InferencePlugins,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum HostReply {
    #[serde(rename = "architectPluginsResult")]
    ArchitectPlugins(CapabilityPaths),
    #[serde(rename = "inferencePluginsResult")]
    InferencePlugins(Vec<InferencePluginInfo>),
}

impl HostReply {
    pub fn kind(&self) -> RequestKind {
        match self {
            HostReply::ArchitectPlugins(_) => RequestKind::ArchitectPlugins,
            HostReply::InferencePlugins(_) => RequestKind::InferencePlugins,
        }
    }
}

/// Session-wide table from capability to module path, relative to the
/// directory containing the modules directory and without extension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityPaths(BTreeMap<CapabilityKey, String>);

impl CapabilityPaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, relative_path: impl Into<String>) {
        self.0.insert(CapabilityKey::of(name), relative_path.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&CapabilityKey::of(name)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for CapabilityPaths {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut paths = Self::new();
        for (name, path) in iter {
            paths.insert(name, path);
        }
        paths
    }
}

/// An inference plugin known to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferencePluginInfo {
    pub name: String,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Outgoing side of the transport to the host.
pub trait HostChannel: Send + Sync {
    fn emit(&self, request: &HostRequest) -> Result<()>;
}

pub struct HostLink {
    channel: Arc<dyn HostChannel>,
    listeners: Mutex<HashMap<RequestKind, oneshot::Sender<HostReply>>>,
}

impl HostLink {
    pub fn new(channel: Arc<dyn HostChannel>) -> Self {
        Self {
            channel,
            listeners: Mutex::new(HashMap::new()),
        }
    }

    fn listeners(&self) -> Result<MutexGuard<'_, HashMap<RequestKind, oneshot::Sender<HostReply>>>> {
        self.listeners
            .lock()
            .map_err(|_| ArchscopeError::Internal("host listener table poisoned".to_string()))
    }

    pub fn request_capability_paths(&self) -> Result<PendingReply<CapabilityPaths>> {
        let rx = self.request(HostRequest::ArchitectPlugins)?;
        Ok(PendingReply::new(rx, |reply| match reply {
            HostReply::ArchitectPlugins(paths) => Some(paths),
            _ => None,
        }))
    }

    pub fn request_inference_plugins(&self) -> Result<PendingReply<Vec<InferencePluginInfo>>> {
        let rx = self.request(HostRequest::InferencePlugins)?;
        Ok(PendingReply::new(rx, |reply| match reply {
            HostReply::InferencePlugins(plugins) => Some(plugins),
            _ => None,
        }))
    }

    fn request(&self, request: HostRequest) -> Result<oneshot::Receiver<HostReply>> {
        let kind = request.kind();
        let (tx, rx) = oneshot::channel();
        {
            let mut listeners = self.listeners()?;
            if listeners.get(&kind).is_some_and(|listener| !listener.is_closed()) {
                return Err(ArchscopeError::RequestInFlight(format!("{:?}", kind)));
            }
            listeners.insert(kind, tx);
        }

        if let Err(e) = self.channel.emit(&request) {
            self.listeners()?.remove(&kind);
            return Err(e);
        }
        debug!("Requested {:?} from host", kind);
        Ok(rx)
    }

    pub fn in_flight(&self, kind: RequestKind) -> bool {
        self.listeners()
            .map(|listeners| listeners.contains_key(&kind))
            .unwrap_or(false)
    }

    /// Hand a reply to the listener waiting for it. Returns `false` when
    /// nobody was waiting (late or duplicate replies are dropped).
    pub fn deliver(&self, reply: HostReply) -> Result<bool> {
        let kind = reply.kind();
        let listener = self.listeners()?.remove(&kind);
        match listener {
            Some(tx) => Ok(tx.send(reply).is_ok()),
            None => {
                debug!("Dropping {:?} reply with no listener", kind);
                Ok(false)
            }
        }
    }

    pub fn deliver_json(&self, raw: &str) -> Result<bool> {
        let reply: HostReply = serde_json::from_str(raw)?;
        self.deliver(reply)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyState<T> {
    NotYetAvailable,
    Ready(T),
    Failed,
}

/// A reply that may not have arrived yet.
pub struct PendingReply<T> {
    state: ReplyState<T>,
    rx: Option<oneshot::Receiver<HostReply>>,
    extract: fn(HostReply) -> Option<T>,
}

impl<T> PendingReply<T> {
    fn new(rx: oneshot::Receiver<HostReply>, extract: fn(HostReply) -> Option<T>) -> Self {
        Self {
            state: ReplyState::NotYetAvailable,
            rx: Some(rx),
            extract,
        }
    }

    /// A reply that is already known.
    pub fn ready(value: T) -> Self {
        Self {
            state: ReplyState::Ready(value),
            rx: None,
            extract: |_| None,
        }
    }

    pub fn poll(&mut self) -> &ReplyState<T> {
        if let Some(rx) = self.rx.as_mut() {
            match rx.try_recv() {
                Ok(reply) => {
                    self.state = match (self.extract)(reply) {
                        Some(value) => ReplyState::Ready(value),
                        None => ReplyState::Failed,
                    };
                    self.rx = None;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Closed) => {
                    self.state = ReplyState::Failed;
                    self.rx = None;
                }
            }
        }
        &self.state
    }

    /// Wait for the reply.
    pub async fn wait(mut self) -> Result<T> {
        if let Some(rx) = self.rx.take() {
            let reply = rx
                .await
                .map_err(|_| ArchscopeError::Host("request dropped before reply".to_string()))?;
            return (self.extract)(reply)
                .ok_or_else(|| ArchscopeError::Host("unexpected reply kind".to_string()));
        }
        match self.state {
            ReplyState::Ready(value) => Ok(value),
            _ => Err(ArchscopeError::Host("reply failed".to_string())),
        }
    }
}
