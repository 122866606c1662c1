//! Session factory, instance provisioner and the create-instance step

use crate::error::{AuthError, ProvisionError, StepError};
use crate::provider::{CloudSession, ComputeProvider, InstanceCreated, NodeRequest};
use crate::registry::ProviderRegistry;
use crate::request::{Credentials, ProvisionRequest};
use std::collections::HashMap;

/// Open an authenticated session, folding every failure into [`AuthError`]
pub async fn open_session(
    provider: &dyn ComputeProvider,
    credentials: &Credentials,
) -> Result<Box<dyn CloudSession>, AuthError> {
    tracing::info!(
        ">> initializing {} session at {} as {}",
        provider.name(),
        credentials.endpoint,
        credentials.identity
    );

    provider.open_session(credentials).await.map_err(|e| {
        tracing::warn!("{} authentication failed: {}", provider.name(), e);
        AuthError::new(provider.name(), e.diagnostic())
    })
}

/// Creates one node per call from a validated request
#[derive(Debug, Default, Clone, Copy)]
pub struct Provisioner;

impl Provisioner {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a template and request exactly one node in the request's group
    ///
    /// Not idempotent: two calls issue two create requests. Any failure,
    /// template resolution included, is reported as `RunNodesException` with
    /// the provider's message unchanged.
    pub async fn create_instance(
        &self,
        session: &dyn CloudSession,
        request: &ProvisionRequest,
    ) -> Result<InstanceCreated, ProvisionError> {
        let template = session
            .resolve_template(&request.template_spec())
            .await
            .map_err(|e| {
                tracing::warn!("Template resolution failed: {}", e);
                ProvisionError::from(e)
            })?;

        let node = NodeRequest {
            group: request.group_name.clone(),
            name: request.instance_name.clone(),
            template,
        };

        tracing::info!(
            "Creating node {} in group {} (flavor={}, image={})",
            node.name,
            node.group,
            node.template.flavor_name,
            node.template.image_name
        );

        let created = session.create_node(&node).await.map_err(|e| {
            tracing::warn!("Node creation failed on {}: {}", session.provider(), e);
            ProvisionError::from(e)
        })?;

        tracing::info!("Node {} accepted (id: {})", created.name, created.node_id);
        Ok(created)
    }
}

/// The workflow step: configuration map in, one node out
#[derive(Debug, Clone)]
pub struct CreateInstanceStep {
    registry: ProviderRegistry,
    provisioner: Provisioner,
}

impl CreateInstanceStep {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            provisioner: Provisioner::new(),
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Validate, authenticate, create
    ///
    /// Validation runs before any network call.
    pub async fn execute(
        &self,
        properties: &HashMap<String, String>,
    ) -> Result<InstanceCreated, StepError> {
        let request = ProvisionRequest::from_properties(properties)?;
        let session = self.open(&request).await?;
        Ok(self
            .provisioner
            .create_instance(session.as_ref(), &request)
            .await?)
    }

    /// Validate and authenticate only
    pub async fn check_auth(&self, properties: &HashMap<String, String>) -> Result<(), StepError> {
        let request = ProvisionRequest::from_properties(properties)?;
        self.open(&request).await?;
        Ok(())
    }

    async fn open(&self, request: &ProvisionRequest) -> Result<Box<dyn CloudSession>, AuthError> {
        let provider = self.registry.get(&request.provider).ok_or_else(|| {
            AuthError::new(
                request.provider.as_str(),
                format!(
                    "unknown provider '{}' (available: {})",
                    request.provider,
                    self.registry.names().join(", ")
                ),
            )
        })?;

        open_session(provider.as_ref(), &request.credentials()).await
    }
}
