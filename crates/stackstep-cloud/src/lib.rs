//! StackStep compute provisioning
//!
//! This crate holds the provider abstraction and the create-instance
//! workflow step: validate a configuration map, open an authenticated
//! session, resolve a template and request exactly one node in a group.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │            host (stackstep CLI, engine)          │
//! └─────────────────┬───────────────────────────────┘
//!                   │ configuration map
//! ┌─────────────────▼───────────────────────────────┐
//! │                stackstep-cloud                   │
//! │  CreateInstanceStep ─► open_session ─► Provisioner│
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  trait ComputeProvider / CloudSession     │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │   Request    │  │  Templates   │            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼───────┐
//! │ openstack-nova│
//! │   provider    │
//! └───────────────┘
//! ```

pub mod description;
pub mod error;
pub mod provider;
pub mod provisioner;
pub mod registry;
pub mod request;
pub mod template;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-exports
pub use description::{PropertyKind, PropertySpec, StepDescription, describe};
pub use error::{
    AuthError, CloudError, FailureReason, ProvisionError, Result, StepError, ValidationError,
};
pub use provider::{CloudSession, ComputeProvider, InstanceCreated, NodeRequest};
pub use provisioner::{CreateInstanceStep, Provisioner, open_session};
pub use registry::ProviderRegistry;
pub use request::{Credentials, OsFamily, ProvisionRequest};
pub use template::{Bitness, FlavorCandidate, ImageCandidate, InstanceTemplate, TemplateSpec};
