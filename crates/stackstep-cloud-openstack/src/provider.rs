//! OpenStack Nova provider implementation

use crate::compute::{CreateServer, Image, Nova};
use crate::identity::Keystone;
use async_trait::async_trait;
use stackstep_cloud::{
    CloudSession, ComputeProvider, Credentials, FlavorCandidate, ImageCandidate, InstanceCreated,
    InstanceTemplate, NodeRequest, TemplateSpec,
};
use std::collections::HashMap;

pub const PROVIDER_NAME: &str = "openstack-nova";

/// Metadata key recording the group a server was created in
pub const GROUP_METADATA_KEY: &str = "group";

/// OpenStack provider (Keystone identity + Nova compute)
#[derive(Clone, Default)]
pub struct OpenStackNovaProvider {
    client: reqwest::Client,
    region: Option<String>,
}

impl OpenStackNovaProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a caller-built HTTP client (timeouts, proxies, TLS roots)
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Only accept catalog endpoints in this region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

#[async_trait]
impl ComputeProvider for OpenStackNovaProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn display_name(&self) -> &str {
        "OpenStack Nova"
    }

    async fn open_session(
        &self,
        credentials: &Credentials,
    ) -> stackstep_cloud::Result<Box<dyn CloudSession>> {
        let keystone = Keystone::new(self.client.clone(), self.region.clone());
        let token = keystone.authenticate(credentials).await?;

        tracing::debug!(
            "Authenticated; compute endpoint {} (expires {})",
            token.compute_url,
            token.expires.as_deref().unwrap_or("unknown")
        );

        Ok(Box::new(NovaSession {
            nova: Nova::new(self.client.clone(), &token),
        }))
    }
}

/// Authenticated Nova session
pub struct NovaSession {
    nova: Nova,
}

#[async_trait]
impl CloudSession for NovaSession {
    fn provider(&self) -> &str {
        PROVIDER_NAME
    }

    async fn resolve_template(
        &self,
        spec: &TemplateSpec,
    ) -> stackstep_cloud::Result<InstanceTemplate> {
        let flavors: Vec<FlavorCandidate> = self
            .nova
            .list_flavors()
            .await?
            .into_iter()
            .map(|f| FlavorCandidate {
                id: f.id,
                name: f.name,
            })
            .collect();

        let images: Vec<ImageCandidate> = self
            .nova
            .list_images()
            .await?
            .iter()
            .map(image_candidate)
            .collect();

        tracing::debug!(
            "{} flavors and {} images listed at {}",
            flavors.len(),
            images.len(),
            self.nova.base_url()
        );

        spec.resolve(&flavors, &images)
    }

    async fn create_node(&self, request: &NodeRequest) -> stackstep_cloud::Result<InstanceCreated> {
        let server = CreateServer {
            name: request.name.clone(),
            image_ref: request.template.image_id.clone(),
            flavor_ref: request.template.flavor_id.clone(),
            metadata: HashMap::from([(GROUP_METADATA_KEY.to_string(), request.group.clone())]),
        };

        let accepted = self.nova.create_server(&server).await?;

        Ok(InstanceCreated {
            node_id: accepted.id,
            name: request.name.clone(),
            group: request.group.clone(),
        })
    }
}

fn image_candidate(image: &Image) -> ImageCandidate {
    ImageCandidate {
        id: image.id.clone(),
        name: image.name.clone().unwrap_or_default(),
        active: image.is_active(),
        os_distro: image.metadata_str("os_distro").map(str::to_string),
        architecture: image.metadata_str("architecture").map(str::to_string),
        updated: image.updated.clone(),
    }
}
