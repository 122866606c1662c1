//! Nova compute API client
//!
//! Only the calls the create-instance step needs: flavor and image listing
//! and server creation.

use crate::error::{Result, api_error};
use crate::identity::Token;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Nova client bound to one token
pub struct Nova {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl Nova {
    pub fn new(client: reqwest::Client, token: &Token) -> Self {
        Self {
            client,
            base_url: token.compute_url.trim_end_matches('/').to_string(),
            token: token.id.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List flavors with details
    pub async fn list_flavors(&self) -> Result<Vec<Flavor>> {
        let url = format!("{}/flavors/detail", self.base_url);
        let response: FlavorsResponse = self.send(self.client.get(&url)).await?;
        Ok(response.flavors)
    }

    /// List images with details
    pub async fn list_images(&self) -> Result<Vec<Image>> {
        let url = format!("{}/images/detail", self.base_url);
        let response: ImagesResponse = self.send(self.client.get(&url)).await?;
        Ok(response.images)
    }

    /// Create a server; returns once Nova has accepted the request
    pub async fn create_server(&self, server: &CreateServer) -> Result<ServerRef> {
        let url = format!("{}/servers", self.base_url);
        let request_body = CreateServerRequest { server };

        let response: CreateServerResponse =
            self.send(self.client.post(&url).json(&request_body)).await?;
        Ok(response.server)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let request = request
            .header(AUTH_TOKEN_HEADER, &self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .build()?;

        tracing::debug!("{} {}", request.method(), request.url());

        let response = self.client.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }

        Ok(response.json().await?)
    }
}

// ============ API Types ============

#[derive(Debug, Clone, Deserialize)]
pub struct Flavor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub vcpus: Option<u32>,
    #[serde(default)]
    pub ram: Option<u64>,
    #[serde(default)]
    pub disk: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub id: String,
    /// Glance allows unnamed images; Nova reports them as `null`
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Image {
    pub fn is_active(&self) -> bool {
        self.status
            .as_deref()
            .is_none_or(|s| s.eq_ignore_ascii_case("active"))
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServer {
    pub name: String,
    pub image_ref: String,
    pub flavor_ref: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

/// Reference to an accepted server
#[derive(Debug, Clone, Deserialize)]
pub struct ServerRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
struct FlavorsResponse {
    flavors: Vec<Flavor>,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    images: Vec<Image>,
}

#[derive(Debug, Serialize)]
struct CreateServerRequest<'a> {
    server: &'a CreateServer,
}

#[derive(Debug, Deserialize)]
struct CreateServerResponse {
    server: ServerRef,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_server_body() {
        let server = CreateServer {
            name: "web-01".to_string(),
            image_ref: "img-1".to_string(),
            flavor_ref: "2".to_string(),
            metadata: HashMap::from([("group".to_string(), "web".to_string())]),
        };

        assert_eq!(
            serde_json::to_value(CreateServerRequest { server: &server }).unwrap(),
            serde_json::json!({
                "server": {
                    "name": "web-01",
                    "imageRef": "img-1",
                    "flavorRef": "2",
                    "metadata": {"group": "web"}
                }
            })
        );
    }

    #[test]
    fn test_image_status_and_metadata() {
        let image: Image = serde_json::from_value(serde_json::json!({
            "id": "abc",
            "name": "trusty",
            "status": "ACTIVE",
            "metadata": {"os_distro": "ubuntu", "min_ram": 0}
        }))
        .unwrap();

        assert!(image.is_active());
        assert_eq!(image.metadata_str("os_distro"), Some("ubuntu"));
        assert_eq!(image.metadata_str("min_ram"), None);

        let saving: Image =
            serde_json::from_value(serde_json::json!({"id": "x", "status": "SAVING"})).unwrap();
        assert!(!saving.is_active());
    }

    #[test]
    fn test_image_list_with_unnamed_image() {
        let response: ImagesResponse = serde_json::from_value(serde_json::json!({
            "images": [
                {"id": "snap", "name": null, "status": "ACTIVE", "metadata": {}},
                {"id": "img-c64", "name": "centos-6.5-x86_64", "status": "ACTIVE"}
            ]
        }))
        .unwrap();

        assert_eq!(response.images.len(), 2);
        assert_eq!(response.images[0].name, None);
        assert_eq!(response.images[1].name.as_deref(), Some("centos-6.5-x86_64"));
    }
}
