//! Declared property schema of the create-instance step
//!
//! Hosts read this at registration time to render forms and document the
//! step. It carries no behaviour beyond the defaults it names.

use serde::Serialize;

pub const STEP_NAME: &str = "stackstep.CreateInstanceStep";

pub const PROP_PROVIDER: &str = "provider";
pub const PROP_ENDPOINT: &str = "endpoint";
pub const PROP_IDENTITY: &str = "identity";
pub const PROP_PASSWORD: &str = "password";
pub const PROP_FLAVOR: &str = "flavor";
pub const PROP_OS_64BIT: &str = "os64Bit";
pub const PROP_OS_FAMILY: &str = "osFamily";
pub const PROP_IMAGE_NAME: &str = "imageName";
pub const PROP_INSTANCE_NAME: &str = "instanceName";
pub const PROP_GROUP_NAME: &str = "groupName";

pub const DEFAULT_PROVIDER: &str = "openstack-nova";
pub const DEFAULT_OS_FAMILY: &str = "ubuntu";

/// Kind of input a property expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PropertyKind {
    String,
    Boolean,
    /// One of `values`
    Select { values: Vec<String> },
    /// One of `values` or any free-form string
    FreeSelect { values: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertySpec {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    #[serde(flatten)]
    pub kind: PropertyKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<&'static str>,
}

impl PropertySpec {
    fn string(name: &'static str, title: &'static str, description: &'static str) -> Self {
        Self {
            name,
            title,
            description,
            kind: PropertyKind::String,
            required: true,
            default_value: None,
        }
    }

    fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    fn with_kind(mut self, kind: PropertyKind) -> Self {
        self.kind = kind;
        self
    }

    fn with_default(mut self, value: &'static str) -> Self {
        self.default_value = Some(value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepDescription {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub properties: Vec<PropertySpec>,
}

impl StepDescription {
    pub fn property(&self, name: &str) -> Option<&PropertySpec> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn required_properties(&self) -> impl Iterator<Item = &PropertySpec> {
        self.properties.iter().filter(|p| p.required)
    }
}

/// Property schema of the create-instance step
pub fn describe() -> StepDescription {
    let values = |vs: &[&str]| vs.iter().map(|v| v.to_string()).collect::<Vec<_>>();

    StepDescription {
        name: STEP_NAME,
        title: "OpenStack Create Instance Step",
        description: "Creates a new instance",
        properties: vec![
            PropertySpec::string(PROP_PROVIDER, "Provider", "Compute service provider")
                .optional()
                .with_kind(PropertyKind::Select {
                    values: values(&[DEFAULT_PROVIDER]),
                })
                .with_default(DEFAULT_PROVIDER),
            PropertySpec::string(
                PROP_ENDPOINT,
                "API endpoint",
                "Keystone endpoint to connect to, e.g. http://172.16.0.1:5000/v2.0/",
            ),
            PropertySpec::string(
                PROP_IDENTITY,
                "Identity",
                "Tenant name and user name separated by a colon, e.g. tenant:user",
            ),
            PropertySpec::string(PROP_PASSWORD, "Password", "The password"),
            PropertySpec::string(PROP_FLAVOR, "Flavor", "The hardware flavor"),
            PropertySpec::string(PROP_OS_64BIT, "64 bit", "Operating system 64bit?")
                .optional()
                .with_kind(PropertyKind::Boolean)
                .with_default("false"),
            PropertySpec::string(PROP_OS_FAMILY, "OS Family", "The OS family")
                .optional()
                .with_kind(PropertyKind::FreeSelect {
                    values: values(&["ubuntu", "centos"]),
                })
                .with_default(DEFAULT_OS_FAMILY),
            PropertySpec::string(
                PROP_IMAGE_NAME,
                "Image Name",
                "Exact image name; overrides the OS family query",
            )
            .optional(),
            PropertySpec::string(PROP_INSTANCE_NAME, "Instance Name", "The instance name"),
            PropertySpec::string(PROP_GROUP_NAME, "Group Name", "The group name"),
        ],
    }
}
