//! Keystone identity client
//!
//! Password authentication against identity v2.0 (`POST /tokens`) and
//! v3 (`POST /auth/tokens`), returning the token and the compute endpoint
//! from the service catalog.

use crate::error::{OpenStackError, Result, api_error};
use serde::{Deserialize, Serialize};
use stackstep_cloud::Credentials;
use url::Url;

const COMPUTE_SERVICE: &str = "compute";
const DEFAULT_DOMAIN: &str = "default";

/// Identity API version, picked from the endpoint path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityVersion {
    V2,
    V3,
}

impl IdentityVersion {
    pub fn detect(endpoint: &Url) -> Self {
        let last = endpoint
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last());
        match last {
            Some(segment) if segment.eq_ignore_ascii_case("v3") => IdentityVersion::V3,
            _ => IdentityVersion::V2,
        }
    }
}

/// `tenant:user` pair; a string without a colon is a bare user name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub tenant: Option<String>,
    pub user: String,
}

impl Identity {
    pub fn parse(identity: &str) -> Self {
        match identity.split_once(':') {
            Some((tenant, user)) => Self {
                tenant: Some(tenant.to_string()).filter(|t| !t.is_empty()),
                user: user.to_string(),
            },
            None => Self {
                tenant: None,
                user: identity.to_string(),
            },
        }
    }
}

/// Scoped token plus the compute endpoint it is valid for
#[derive(Clone)]
pub struct Token {
    pub id: String,
    pub compute_url: String,
    pub expires: Option<String>,
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("id", &"<redacted>")
            .field("compute_url", &self.compute_url)
            .field("expires", &self.expires)
            .finish()
    }
}

/// Keystone client
pub struct Keystone {
    client: reqwest::Client,
    region: Option<String>,
}

impl Keystone {
    pub fn new(client: reqwest::Client, region: Option<String>) -> Self {
        Self { client, region }
    }

    /// Authenticate with the password method and pick the compute endpoint
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Token> {
        let identity = Identity::parse(&credentials.identity);
        match IdentityVersion::detect(&credentials.endpoint) {
            IdentityVersion::V2 => {
                self.authenticate_v2(&credentials.endpoint, &identity, &credentials.password)
                    .await
            }
            IdentityVersion::V3 => {
                self.authenticate_v3(&credentials.endpoint, &identity, &credentials.password)
                    .await
            }
        }
    }

    async fn authenticate_v2(
        &self,
        endpoint: &Url,
        identity: &Identity,
        password: &str,
    ) -> Result<Token> {
        let url = format!("{}/tokens", endpoint.as_str().trim_end_matches('/'));
        let request_body = V2AuthRequest {
            auth: V2Auth {
                tenant_name: identity.tenant.clone(),
                password_credentials: V2PasswordCredentials {
                    username: identity.user.clone(),
                    password: password.to_string(),
                },
            },
        };

        tracing::debug!("POST {} (identity v2.0, user {})", url, identity.user);

        let response = self.client.post(&url).json(&request_body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(rejection(status, &body));
        }

        let access: V2AccessResponse = response.json().await?;
        let compute_url = access
            .access
            .service_catalog
            .iter()
            .filter(|service| service.r#type == COMPUTE_SERVICE)
            .flat_map(|service| service.endpoints.iter())
            .filter(|e| self.region_matches(e.region.as_deref()))
            .find_map(|e| e.public_url.clone())
            .ok_or_else(|| OpenStackError::ServiceNotFound(COMPUTE_SERVICE.to_string()))?;

        Ok(Token {
            id: access.access.token.id,
            compute_url,
            expires: access.access.token.expires,
        })
    }

    async fn authenticate_v3(
        &self,
        endpoint: &Url,
        identity: &Identity,
        password: &str,
    ) -> Result<Token> {
        let url = format!("{}/auth/tokens", endpoint.as_str().trim_end_matches('/'));
        let request_body = V3AuthRequest {
            auth: V3Auth {
                identity: V3Identity {
                    methods: vec!["password".to_string()],
                    password: V3Password {
                        user: V3User {
                            name: identity.user.clone(),
                            domain: V3Domain::default_domain(),
                            password: password.to_string(),
                        },
                    },
                },
                scope: identity.tenant.as_ref().map(|tenant| V3Scope {
                    project: V3Project {
                        name: tenant.clone(),
                        domain: V3Domain::default_domain(),
                    },
                }),
            },
        };

        tracing::debug!("POST {} (identity v3, user {})", url, identity.user);

        let response = self.client.post(&url).json(&request_body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(rejection(status, &body));
        }

        let token_id = response
            .headers()
            .get("X-Subject-Token")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(OpenStackError::MissingToken)?;

        let token: V3TokenResponse = response.json().await?;
        let compute_url = token
            .token
            .catalog
            .iter()
            .filter(|service| service.r#type == COMPUTE_SERVICE)
            .flat_map(|service| service.endpoints.iter())
            .filter(|e| e.interface == "public")
            .filter(|e| self.region_matches(e.region.as_deref().or(e.region_id.as_deref())))
            .map(|e| e.url.clone())
            .next()
            .ok_or_else(|| OpenStackError::ServiceNotFound(COMPUTE_SERVICE.to_string()))?;

        Ok(Token {
            id: token_id,
            compute_url,
            expires: token.token.expires_at,
        })
    }

    fn region_matches(&self, region: Option<&str>) -> bool {
        match (&self.region, region) {
            (None, _) => true,
            (Some(wanted), Some(region)) => wanted == region,
            (Some(_), None) => false,
        }
    }
}

fn rejection(status: reqwest::StatusCode, body: &str) -> OpenStackError {
    match api_error(status, body) {
        OpenStackError::Api { status: 401 | 403, message } => {
            OpenStackError::AuthenticationFailed(message)
        }
        other => other,
    }
}

// ============ API Types ============

#[derive(Debug, Serialize)]
struct V2AuthRequest {
    auth: V2Auth,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct V2Auth {
    #[serde(skip_serializing_if = "Option::is_none")]
    tenant_name: Option<String>,
    password_credentials: V2PasswordCredentials,
}

#[derive(Debug, Serialize)]
struct V2PasswordCredentials {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct V2AccessResponse {
    access: V2Access,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct V2Access {
    token: V2Token,
    #[serde(default)]
    service_catalog: Vec<V2Service>,
}

#[derive(Debug, Deserialize)]
struct V2Token {
    id: String,
    expires: Option<String>,
}

#[derive(Debug, Deserialize)]
struct V2Service {
    #[serde(rename = "type")]
    r#type: String,
    #[serde(default)]
    endpoints: Vec<V2Endpoint>,
}

#[derive(Debug, Deserialize)]
struct V2Endpoint {
    region: Option<String>,
    #[serde(rename = "publicURL")]
    public_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct V3AuthRequest {
    auth: V3Auth,
}

#[derive(Debug, Serialize)]
struct V3Auth {
    identity: V3Identity,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<V3Scope>,
}

#[derive(Debug, Serialize)]
struct V3Identity {
    methods: Vec<String>,
    password: V3Password,
}

#[derive(Debug, Serialize)]
struct V3Password {
    user: V3User,
}

#[derive(Debug, Serialize)]
struct V3User {
    name: String,
    domain: V3Domain,
    password: String,
}

#[derive(Debug, Serialize)]
struct V3Domain {
    id: String,
}

impl V3Domain {
    fn default_domain() -> Self {
        Self {
            id: DEFAULT_DOMAIN.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct V3Scope {
    project: V3Project,
}

#[derive(Debug, Serialize)]
struct V3Project {
    name: String,
    domain: V3Domain,
}

#[derive(Debug, Deserialize)]
struct V3TokenResponse {
    token: V3Token,
}

#[derive(Debug, Deserialize)]
struct V3Token {
    expires_at: Option<String>,
    #[serde(default)]
    catalog: Vec<V3Service>,
}

#[derive(Debug, Deserialize)]
struct V3Service {
    #[serde(rename = "type")]
    r#type: String,
    #[serde(default)]
    endpoints: Vec<V3Endpoint>,
}

#[derive(Debug, Deserialize)]
struct V3Endpoint {
    interface: String,
    region: Option<String>,
    region_id: Option<String>,
    url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_parse() {
        assert_eq!(
            Identity::parse("tenantA:user1"),
            Identity {
                tenant: Some("tenantA".to_string()),
                user: "user1".to_string()
            }
        );
        assert_eq!(
            Identity::parse("admin"),
            Identity {
                tenant: None,
                user: "admin".to_string()
            }
        );
        // only the first colon separates
        assert_eq!(Identity::parse("t:u:x").user, "u:x");
        assert_eq!(Identity::parse(":user").tenant, None);
    }

    #[test]
    fn test_version_detect() {
        let v2 = Url::parse("http://10.0.0.1:5000/v2.0/").unwrap();
        let v3 = Url::parse("https://keystone.example.com/identity/v3").unwrap();
        let bare = Url::parse("http://10.0.0.1:5000").unwrap();

        assert_eq!(IdentityVersion::detect(&v2), IdentityVersion::V2);
        assert_eq!(IdentityVersion::detect(&v3), IdentityVersion::V3);
        assert_eq!(IdentityVersion::detect(&bare), IdentityVersion::V2);
    }

    #[test]
    fn test_v2_request_shape() {
        let body = V2AuthRequest {
            auth: V2Auth {
                tenant_name: Some("tenantA".to_string()),
                password_credentials: V2PasswordCredentials {
                    username: "user1".to_string(),
                    password: "secret".to_string(),
                },
            },
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "auth": {
                    "tenantName": "tenantA",
                    "passwordCredentials": {"username": "user1", "password": "secret"}
                }
            })
        );
    }

    #[test]
    fn test_rejection_maps_unauthorized() {
        let err = rejection(
            reqwest::StatusCode::UNAUTHORIZED,
            r#"{"error": {"message": "Invalid user / password", "code": 401}}"#,
        );
        assert!(matches!(
            err,
            OpenStackError::AuthenticationFailed(m) if m == "Invalid user / password"
        ));

        let err = rejection(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert!(matches!(err, OpenStackError::Api { status: 500, .. }));
    }

    #[test]
    fn test_token_debug_redacted() {
        let token = Token {
            id: "gAAAAABsecret".to_string(),
            compute_url: "http://nova/v2/t".to_string(),
            expires: None,
        };
        assert!(!format!("{:?}", token).contains("gAAAAABsecret"));
    }
}
