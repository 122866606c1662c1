//! Template selection rules
//!
//! Providers list their flavors and images and hand them to
//! [`TemplateSpec::resolve`], so every backend picks hardware and images the
//! same way. Nothing is cached: callers resolve fresh on every invocation.

use crate::error::{CloudError, Result};
use crate::request::OsFamily;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// What the caller asked for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSpec {
    pub flavor: String,
    pub os_family: OsFamily,
    pub is_64bit: bool,
    pub image_name: Option<String>,
}

/// What the provider will be asked to boot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceTemplate {
    pub flavor_id: String,
    pub flavor_name: String,
    pub image_id: String,
    pub image_name: String,
    pub os_family: OsFamily,
    pub is_64bit: bool,
}

/// Hardware profile as listed by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlavorCandidate {
    pub id: String,
    pub name: String,
}

/// Image as listed by a provider
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageCandidate {
    pub id: String,
    pub name: String,
    pub active: bool,
    /// `os_distro` image property, if published
    pub os_distro: Option<String>,
    /// `architecture` image property, if published
    pub architecture: Option<String>,
    /// RFC 3339 timestamp of the last update
    pub updated: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bitness {
    Bits32,
    Bits64,
    Unknown,
}

impl ImageCandidate {
    pub fn bitness(&self) -> Bitness {
        if let Some(arch) = self.architecture.as_deref() {
            let bitness = bitness_of_token(&arch.to_ascii_lowercase());
            if bitness != Bitness::Unknown {
                return bitness;
            }
        }

        self.name
            .to_ascii_lowercase()
            .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .map(bitness_of_token)
            .find(|b| *b != Bitness::Unknown)
            .unwrap_or(Bitness::Unknown)
    }

    fn matches_family(&self, family: &OsFamily) -> bool {
        let family = family.as_str().to_ascii_lowercase();
        if family.is_empty() {
            return false;
        }
        if let Some(distro) = self.os_distro.as_deref() {
            if distro.eq_ignore_ascii_case(&family) {
                return true;
            }
        }
        self.name.to_ascii_lowercase().contains(&family)
    }
}

fn bitness_of_token(token: &str) -> Bitness {
    match token {
        "x86_64" | "amd64" | "x64" | "aarch64" | "arm64" | "ppc64le" | "s390x" => Bitness::Bits64,
        "i386" | "i486" | "i586" | "i686" | "x86" | "armhf" | "armv7l" => Bitness::Bits32,
        _ => Bitness::Unknown,
    }
}

impl TemplateSpec {
    /// Pick a flavor and an image out of the provider's catalog
    pub fn resolve(
        &self,
        flavors: &[FlavorCandidate],
        images: &[ImageCandidate],
    ) -> Result<InstanceTemplate> {
        let flavor = self.select_flavor(flavors)?;
        let image = self.select_image(images)?;

        tracing::debug!(
            "Resolved template: flavor={} ({}), image={} ({})",
            flavor.name,
            flavor.id,
            image.name,
            image.id
        );

        Ok(InstanceTemplate {
            flavor_id: flavor.id.clone(),
            flavor_name: flavor.name.clone(),
            image_id: image.id.clone(),
            image_name: image.name.clone(),
            os_family: self.os_family.clone(),
            is_64bit: self.is_64bit,
        })
    }

    /// Exact name first, then exact id
    pub fn select_flavor<'a>(&self, flavors: &'a [FlavorCandidate]) -> Result<&'a FlavorCandidate> {
        flavors
            .iter()
            .find(|f| f.name == self.flavor)
            .or_else(|| flavors.iter().find(|f| f.id == self.flavor))
            .ok_or_else(|| {
                CloudError::ResourceNotFound(format!("no flavor matching '{}'", self.flavor))
            })
    }

    pub fn select_image<'a>(&self, images: &'a [ImageCandidate]) -> Result<&'a ImageCandidate> {
        let active = images.iter().filter(|i| i.active);

        if let Some(name) = self.image_name.as_deref() {
            return active.into_iter().find(|i| i.name == name).ok_or_else(|| {
                CloudError::ResourceNotFound(format!("no active image named '{}'", name))
            });
        }

        active
            .filter(|i| i.matches_family(&self.os_family))
            .filter_map(|i| self.bitness_rank(i).map(|rank| (rank, i)))
            .max_by(|(rank_a, a), (rank_b, b)| {
                rank_a
                    .cmp(rank_b)
                    .then_with(|| newer(a, b))
                    .then_with(|| a.name.cmp(&b.name))
            })
            .map(|(_, image)| image)
            .ok_or_else(|| {
                CloudError::ResourceNotFound(format!(
                    "no active {} image for os family '{}'",
                    if self.is_64bit { "64-bit" } else { "32-bit" },
                    self.os_family
                ))
            })
    }

    /// Higher is better; `None` excludes the image
    fn bitness_rank(&self, image: &ImageCandidate) -> Option<u8> {
        match (self.is_64bit, image.bitness()) {
            (true, Bitness::Bits64) => Some(2),
            (true, Bitness::Unknown) => Some(1),
            (true, Bitness::Bits32) => None,
            (false, Bitness::Bits32) => Some(2),
            (false, Bitness::Unknown) => Some(1),
            (false, Bitness::Bits64) => Some(0),
        }
    }
}

fn newer(a: &ImageCandidate, b: &ImageCandidate) -> Ordering {
    // RFC 3339 timestamps in the same offset sort lexicographically
    a.updated.cmp(&b.updated)
}
