//! OpenStack provider for StackStep
//!
//! This crate implements the ComputeProvider trait for OpenStack clouds,
//! talking to Keystone for authentication and Nova for compute.
//!
//! # Features
//!
//! - Keystone password authentication (identity v2.0 and v3)
//! - Compute endpoint discovery from the service catalog, optionally by region
//! - Flavor and image listing for template resolution
//! - Server creation with the group recorded in server metadata
//!
//! # Example
//!
//! ```ignore
//! use stackstep_cloud::{CreateInstanceStep, ProviderRegistry};
//! use stackstep_cloud_openstack::OpenStackNovaProvider;
//! use std::sync::Arc;
//!
//! let registry = ProviderRegistry::new()
//!     .with_provider(Arc::new(OpenStackNovaProvider::new().with_region("RegionOne")));
//! let step = CreateInstanceStep::new(registry);
//!
//! let created = step.execute(&properties).await?;
//! println!("created {} ({})", created.name, created.node_id);
//! ```

pub mod compute;
pub mod error;
pub mod identity;
pub mod provider;

pub use compute::{CreateServer, Flavor, Image, Nova, ServerRef};
pub use error::{OpenStackError, Result};
pub use identity::{Identity, IdentityVersion, Keystone, Token};
pub use provider::{GROUP_METADATA_KEY, NovaSession, OpenStackNovaProvider, PROVIDER_NAME};
