//! In-process stand-in for the host: answers the resolver's requests from a
//! task on the runtime.

use archscope_core::host::{
    CapabilityPaths, HostChannel, HostLink, HostReply, HostRequest, InferencePluginInfo, RequestKind,
};
use archscope_core::{ArchscopeError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

struct QueueChannel {
    tx: mpsc::UnboundedSender<HostRequest>,
}

impl HostChannel for QueueChannel {
    fn emit(&self, request: &HostRequest) -> Result<()> {
        self.tx
            .send(request.clone())
            .map_err(|_| ArchscopeError::Host("host task stopped".to_string()))
    }
}

pub struct LocalHost {
    pub link: Arc<HostLink>,
    task: JoinHandle<()>,
}

impl LocalHost {
    pub fn spawn(paths: CapabilityPaths, plugins: Vec<InferencePluginInfo>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let link = Arc::new(HostLink::new(Arc::new(QueueChannel { tx })));

        let responder = Arc::clone(&link);
        let task = tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                debug!("Host received {:?}", request);
                let reply = match request {
                    HostRequest::ArchitectPlugins => HostReply::ArchitectPlugins(paths.clone()),
                    HostRequest::InferencePlugins => HostReply::InferencePlugins(plugins.clone()),
                };
                if let Err(e) = responder.deliver(reply) {
                    warn!("Failed to deliver host reply: {}", e);
                }
            }
        });

        Self { link, task }
    }

    /// Wait until no request is waiting for its reply.
    pub async fn settle(&self, limit: Duration) -> bool {
        let pending = async {
            while self.link.in_flight(RequestKind::ArchitectPlugins)
                || self.link.in_flight(RequestKind::InferencePlugins)
            {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(limit, pending).await.is_ok()
    }
}

impl Drop for LocalHost {
    fn drop(&mut self) {
        self.task.abort();
    }
}
