//! Compute provider trait definitions

use crate::error::Result;
use crate::request::Credentials;
use crate::template::{InstanceTemplate, TemplateSpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Compute provider abstraction trait
///
/// A provider knows how to turn credentials into an authenticated
/// [`CloudSession`]. Everything else happens on the session.
#[async_trait]
pub trait ComputeProvider: Send + Sync {
    /// Returns the provider identifier (e.g., "openstack-nova")
    fn name(&self) -> &str;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    /// Authenticate and return a session bound to these credentials
    ///
    /// Must not retry and must not mutate anything server-side.
    async fn open_session(&self, credentials: &Credentials) -> Result<Box<dyn CloudSession>>;
}

/// Authenticated handle to a compute control plane
///
/// Owned by a single invocation; never pooled.
#[async_trait]
pub trait CloudSession: Send + Sync {
    /// Identifier of the provider that opened this session
    fn provider(&self) -> &str;

    /// Look up flavors and images and apply the selection rules
    async fn resolve_template(&self, spec: &TemplateSpec) -> Result<InstanceTemplate>;

    /// Request creation of exactly one node and wait for the provider to accept it
    async fn create_node(&self, request: &NodeRequest) -> Result<InstanceCreated>;
}

/// One create-node request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRequest {
    pub group: String,
    pub name: String,
    pub template: InstanceTemplate,
}

/// Confirmation that the provider accepted a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceCreated {
    /// Provider-assigned node identifier
    pub node_id: String,
    pub name: String,
    pub group: String,
}
