//! Provisioning request built from the step's configuration map

use crate::description::{
    DEFAULT_OS_FAMILY, DEFAULT_PROVIDER, PROP_ENDPOINT, PROP_FLAVOR, PROP_GROUP_NAME,
    PROP_IDENTITY, PROP_IMAGE_NAME, PROP_INSTANCE_NAME, PROP_OS_64BIT, PROP_OS_FAMILY,
    PROP_PASSWORD, PROP_PROVIDER,
};
use crate::error::ValidationError;
use crate::template::TemplateSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use url::Url;

/// Operating system family used for the image query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OsFamily {
    Ubuntu,
    Centos,
    /// Any other family name, kept as given
    Other(String),
}

impl OsFamily {
    pub fn as_str(&self) -> &str {
        match self {
            OsFamily::Ubuntu => "ubuntu",
            OsFamily::Centos => "centos",
            OsFamily::Other(name) => name,
        }
    }
}

impl FromStr for OsFamily {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "ubuntu" => OsFamily::Ubuntu,
            "centos" => OsFamily::Centos,
            _ => OsFamily::Other(s.trim().to_string()),
        })
    }
}

impl std::fmt::Display for OsFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OsFamily {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OsFamily {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse().unwrap_or(OsFamily::Other(s)))
    }
}

/// Credentials handed to the session factory
///
/// The identity is passed through untouched; providers that encode a
/// tenant/user pair in it split it themselves.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub endpoint: Url,
    pub identity: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("endpoint", &self.endpoint.as_str())
            .field("identity", &self.identity)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One validated create-instance invocation
#[derive(Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    pub provider: String,
    pub endpoint: Url,
    pub identity: String,
    pub password: String,
    pub group_name: String,
    pub instance_name: String,
    pub flavor: String,
    pub os_family: OsFamily,
    pub is_64bit: bool,
    /// Exact image name; overrides the family query when set
    pub image_name: Option<String>,
}

impl std::fmt::Debug for ProvisionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisionRequest")
            .field("provider", &self.provider)
            .field("endpoint", &self.endpoint.as_str())
            .field("identity", &self.identity)
            .field("password", &"<redacted>")
            .field("group_name", &self.group_name)
            .field("instance_name", &self.instance_name)
            .field("flavor", &self.flavor)
            .field("os_family", &self.os_family)
            .field("is_64bit", &self.is_64bit)
            .field("image_name", &self.image_name)
            .finish()
    }
}

impl ProvisionRequest {
    /// Build a request from the host's key→value configuration
    ///
    /// Required keys must be present and non-blank. Optional keys fall back to
    /// their declared defaults. Nothing here touches the network.
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self, ValidationError> {
        let endpoint_raw = required(properties, PROP_ENDPOINT)?;
        let endpoint = parse_endpoint(endpoint_raw)?;

        let provider = optional(properties, PROP_PROVIDER)
            .unwrap_or(DEFAULT_PROVIDER)
            .to_string();
        let os_family = optional(properties, PROP_OS_FAMILY)
            .unwrap_or(DEFAULT_OS_FAMILY)
            .parse()
            .unwrap_or(OsFamily::Ubuntu);
        let is_64bit = match optional(properties, PROP_OS_64BIT) {
            Some(value) => parse_bool(PROP_OS_64BIT, value)?,
            None => false,
        };

        Ok(Self {
            provider,
            endpoint,
            identity: required(properties, PROP_IDENTITY)?.to_string(),
            password: required(properties, PROP_PASSWORD)?.to_string(),
            group_name: required(properties, PROP_GROUP_NAME)?.to_string(),
            instance_name: required(properties, PROP_INSTANCE_NAME)?.to_string(),
            flavor: required(properties, PROP_FLAVOR)?.to_string(),
            os_family,
            is_64bit,
            image_name: optional(properties, PROP_IMAGE_NAME).map(str::to_string),
        })
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            endpoint: self.endpoint.clone(),
            identity: self.identity.clone(),
            password: self.password.clone(),
        }
    }

    pub fn template_spec(&self) -> TemplateSpec {
        TemplateSpec {
            flavor: self.flavor.clone(),
            os_family: self.os_family.clone(),
            is_64bit: self.is_64bit,
            image_name: self.image_name.clone(),
        }
    }
}

fn required<'a>(
    properties: &'a HashMap<String, String>,
    key: &'static str,
) -> Result<&'a str, ValidationError> {
    optional(properties, key).ok_or(ValidationError::MissingProperty(key))
}

fn optional<'a>(properties: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    properties
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
}

fn parse_endpoint(value: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(value.trim()).map_err(|e| ValidationError::InvalidEndpoint {
        value: value.to_string(),
        reason: e.to_string(),
    })?;

    if matches!(url.scheme(), "http" | "https") && url.has_host() {
        return Ok(url);
    }

    Err(ValidationError::InvalidEndpoint {
        value: value.to_string(),
        reason: format!(
            "expected an http(s) URL with a host, got scheme '{}'",
            url.scheme()
        ),
    })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ValidationError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ValidationError::InvalidBoolean {
            key,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn minimal() -> HashMap<String, String> {
        properties(&[
            ("endpoint", "http://10.0.0.1:5000/v2.0/"),
            ("identity", "tenantA:user1"),
            ("password", "secret"),
            ("flavor", "m1.small"),
            ("instanceName", "web-01"),
            ("groupName", "web"),
        ])
    }

    #[test]
    fn test_defaults_applied() {
        let request = ProvisionRequest::from_properties(&minimal()).unwrap();

        assert_eq!(request.provider, "openstack-nova");
        assert_eq!(request.os_family, OsFamily::Ubuntu);
        assert!(!request.is_64bit);
        assert_eq!(request.image_name, None);
        assert_eq!(request.endpoint.as_str(), "http://10.0.0.1:5000/v2.0/");
    }

    #[test]
    fn test_identity_passed_through() {
        let request = ProvisionRequest::from_properties(&minimal()).unwrap();
        assert_eq!(request.identity, "tenantA:user1");
        assert_eq!(request.credentials().identity, "tenantA:user1");
    }

    #[test]
    fn test_missing_required_property() {
        for key in [
            "endpoint",
            "identity",
            "password",
            "flavor",
            "instanceName",
            "groupName",
        ] {
            let mut props = minimal();
            props.remove(key);
            let err = ProvisionRequest::from_properties(&props).unwrap_err();
            assert!(
                matches!(err, ValidationError::MissingProperty(k) if k == key),
                "unexpected error for {}: {:?}",
                key,
                err
            );
        }
    }

    #[test]
    fn test_blank_group_name_is_rejected() {
        let mut props = minimal();
        props.insert("groupName".to_string(), "   ".to_string());

        let err = ProvisionRequest::from_properties(&props).unwrap_err();
        assert_eq!(err, ValidationError::MissingProperty("groupName"));
    }

    #[test]
    fn test_invalid_endpoint() {
        let mut props = minimal();
        props.insert("endpoint".to_string(), "not a url".to_string());
        assert!(matches!(
            ProvisionRequest::from_properties(&props),
            Err(ValidationError::InvalidEndpoint { .. })
        ));

        props.insert("endpoint".to_string(), "ftp://10.0.0.1/".to_string());
        assert!(matches!(
            ProvisionRequest::from_properties(&props),
            Err(ValidationError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_os_options() {
        let mut props = minimal();
        props.insert("osFamily".to_string(), "CentOS".to_string());
        props.insert("os64Bit".to_string(), "TRUE".to_string());
        props.insert("imageName".to_string(), "centos-7-x86_64".to_string());

        let request = ProvisionRequest::from_properties(&props).unwrap();
        assert_eq!(request.os_family, OsFamily::Centos);
        assert!(request.is_64bit);
        assert_eq!(request.image_name.as_deref(), Some("centos-7-x86_64"));

        props.insert("osFamily".to_string(), "Debian".to_string());
        let request = ProvisionRequest::from_properties(&props).unwrap();
        assert_eq!(request.os_family, OsFamily::Other("Debian".to_string()));
    }

    #[test]
    fn test_invalid_boolean() {
        let mut props = minimal();
        props.insert("os64Bit".to_string(), "yes".to_string());

        assert_eq!(
            ProvisionRequest::from_properties(&props).unwrap_err(),
            ValidationError::InvalidBoolean {
                key: "os64Bit",
                value: "yes".to_string()
            }
        );
    }

    #[test]
    fn test_debug_redacts_password() {
        let request = ProvisionRequest::from_properties(&minimal()).unwrap();
        let debug = format!("{:?}", request);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }
}
