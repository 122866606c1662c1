//! In-memory provider that records every call
//!
//! Compiled for this crate's tests, or for hosts that enable the `mock` feature.

use crate::error::{CloudError, Result};
use crate::provider::{CloudSession, ComputeProvider, InstanceCreated, NodeRequest};
use crate::request::Credentials;
use crate::template::{FlavorCandidate, ImageCandidate, InstanceTemplate, TemplateSpec};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MockState {
    auth_failure: Option<String>,
    create_failure: Option<String>,
    unique_names: bool,
    flavors: Vec<FlavorCandidate>,
    images: Vec<ImageCandidate>,
    sessions: Vec<Credentials>,
    template_lookups: usize,
    created: Vec<NodeRequest>,
}

/// Recording provider registered as `openstack-nova` by default
#[derive(Debug, Clone)]
pub struct MockProvider {
    name: String,
    state: Arc<Mutex<MockState>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self::named("openstack-nova")
    }

    pub fn named(name: impl Into<String>) -> Self {
        let state = MockState {
            flavors: default_flavors(),
            images: default_images(),
            ..Default::default()
        };
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Reject every `open_session` with this message
    pub fn with_auth_failure(self, message: impl Into<String>) -> Self {
        self.lock().auth_failure = Some(message.into());
        self
    }

    /// Reject every `create_node` with this message
    pub fn with_create_failure(self, message: impl Into<String>) -> Self {
        self.lock().create_failure = Some(message.into());
        self
    }

    /// Reject a create whose name is already taken
    pub fn with_unique_names(self) -> Self {
        self.lock().unique_names = true;
        self
    }

    /// Replace the image catalog
    pub fn with_images(self, images: Vec<ImageCandidate>) -> Self {
        self.lock().images = images;
        self
    }

    pub fn sessions_opened(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn last_credentials(&self) -> Option<Credentials> {
        self.lock().sessions.last().cloned()
    }

    pub fn template_lookups(&self) -> usize {
        self.lock().template_lookups
    }

    pub fn created_nodes(&self) -> Vec<NodeRequest> {
        self.lock().created.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ComputeProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        "Mock compute"
    }

    async fn open_session(&self, credentials: &Credentials) -> Result<Box<dyn CloudSession>> {
        let mut state = self.lock();
        if let Some(message) = &state.auth_failure {
            return Err(CloudError::AuthenticationFailed(message.clone()));
        }
        state.sessions.push(credentials.clone());

        Ok(Box::new(MockSession {
            provider: self.name.clone(),
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockSession {
    provider: String,
    state: Arc<Mutex<MockState>>,
}

impl MockSession {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CloudSession for MockSession {
    fn provider(&self) -> &str {
        &self.provider
    }

    async fn resolve_template(&self, spec: &TemplateSpec) -> Result<InstanceTemplate> {
        let mut state = self.lock();
        state.template_lookups += 1;
        spec.resolve(&state.flavors, &state.images)
    }

    async fn create_node(&self, request: &NodeRequest) -> Result<InstanceCreated> {
        let mut state = self.lock();
        if let Some(message) = &state.create_failure {
            return Err(CloudError::ApiError {
                status: 403,
                message: message.clone(),
            });
        }
        if state.unique_names && state.created.iter().any(|n| n.name == request.name) {
            return Err(CloudError::ApiError {
                status: 409,
                message: format!("Server name '{}' is already in use", request.name),
            });
        }

        state.created.push(request.clone());
        Ok(InstanceCreated {
            node_id: format!("mock-{}", state.created.len()),
            name: request.name.clone(),
            group: request.group.clone(),
        })
    }
}

fn default_flavors() -> Vec<FlavorCandidate> {
    [("1", "m1.tiny"), ("2", "m1.small"), ("3", "m1.medium")]
        .into_iter()
        .map(|(id, name)| FlavorCandidate {
            id: id.to_string(),
            name: name.to_string(),
        })
        .collect()
}

fn default_images() -> Vec<ImageCandidate> {
    [
        ("img-ubuntu-64", "ubuntu-14.04-x86_64", "2014-04-20T00:00:00Z"),
        ("img-ubuntu-32", "ubuntu-12.04-i386", "2014-03-01T00:00:00Z"),
        ("img-centos-64", "centos-6.5-x86_64", "2014-02-10T00:00:00Z"),
        ("img-centos-32", "centos-6.5-i386", "2014-02-10T00:00:00Z"),
    ]
    .into_iter()
    .map(|(id, name, updated)| ImageCandidate {
        id: id.to_string(),
        name: name.to_string(),
        active: true,
        updated: Some(updated.to_string()),
        ..Default::default()
    })
    .collect()
}
