pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod resolver;

pub use config::ResolverConfig;
pub use error::{ArchscopeError, Result};
pub use host::{CapabilityPaths, HostChannel, HostLink, HostReply, HostRequest, PendingReply, ReplyState};
pub use resolver::ArchitectResolver;
