//! HAProxy Data Plane API (v2) registry client.
//!
//! # Responsibilities
//! - Read backend servers together with the configuration version
//! - Drive the transaction lifecycle for one backend
//! - Map HTTP answers onto `RegistryError`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use crate::config::RegistryConfig;
use crate::registry::{
    RegisteredEndpoint, Registry, RegistryError, RegistryResult, Snapshot, TransactionId,
};

#[derive(Debug, Deserialize)]
struct ServersResponse {
    #[serde(rename = "_version")]
    version: u64,
    #[serde(default)]
    data: Vec<RegisteredEndpoint>,
}

#[derive(Debug, Deserialize)]
struct TransactionResponse {
    id: String,
    #[serde(default)]
    status: Option<String>,
}

/// Registry backed by a running Data Plane API.
#[derive(Clone)]
pub struct DataPlaneRegistry {
    client: Client,
    base_url: String,
    backend: String,
    username: String,
    password: String,
}

impl DataPlaneRegistry {
    pub fn new(config: &RegistryConfig) -> RegistryResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            backend: config.backend.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v2/services/haproxy/{}", self.base_url, path)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.username, Some(&self.password))
    }

    fn server_request(&self, request: RequestBuilder, txn: &TransactionId) -> RequestBuilder {
        self.authed(request).query(&[
            ("backend", self.backend.as_str()),
            ("transaction_id", txn.0.as_str()),
        ])
    }

    /// Turn a non-success answer into the matching error.
    async fn check(response: Response) -> RegistryResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::CONFLICT => RegistryError::Conflict(message),
            _ => RegistryError::Rejected {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[async_trait]
impl Registry for DataPlaneRegistry {
    async fn snapshot(&self) -> RegistryResult<Snapshot> {
        let response = self
            .authed(self.client.get(self.url("configuration/servers")))
            .query(&[("backend", self.backend.as_str())])
            .send()
            .await?;
        let body: ServersResponse = Self::check(response).await?.json().await?;

        let (endpoints, portless): (Vec<_>, Vec<_>) =
            body.data.into_iter().partition(|server| server.port != 0);
        for server in &portless {
            tracing::warn!(name = %server.name, address = %server.address, "Ignoring server without a port");
        }

        tracing::debug!(
            version = body.version,
            servers = endpoints.len(),
            backend = %self.backend,
            "Read registry snapshot"
        );
        Ok(Snapshot {
            version: body.version,
            endpoints,
        })
    }

    async fn begin(&self, version: u64) -> RegistryResult<TransactionId> {
        let response = self
            .authed(self.client.post(self.url("transactions")))
            .query(&[("version", version)])
            .send()
            .await?;
        let body: TransactionResponse = Self::check(response).await?.json().await?;

        tracing::debug!(tid = %body.id, version, status = ?body.status, "Started transaction");
        Ok(TransactionId(body.id))
    }

    async fn create(&self, txn: &TransactionId, endpoint: &RegisteredEndpoint) -> RegistryResult<()> {
        let request = self.client.post(self.url("configuration/servers"));
        let response = self.server_request(request, txn).json(endpoint).send().await?;
        match Self::check(response).await {
            Ok(_) => Ok(()),
            // A 409 here means the name is taken, not that the version moved.
            Err(RegistryError::Conflict(_)) => {
                Err(RegistryError::DuplicateServer(endpoint.name.clone()))
            }
            Err(e) => Err(e),
        }
    }

    async fn edit(&self, txn: &TransactionId, endpoint: &RegisteredEndpoint) -> RegistryResult<()> {
        let request = self
            .client
            .put(self.url(&format!("configuration/servers/{}", endpoint.name)));
        let response = self.server_request(request, txn).json(endpoint).send().await?;
        match Self::check(response).await {
            Ok(_) => Ok(()),
            Err(RegistryError::Rejected { status: 404, .. }) => {
                Err(RegistryError::UnknownServer(endpoint.name.clone()))
            }
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, txn: &TransactionId, name: &str) -> RegistryResult<()> {
        let request = self
            .client
            .delete(self.url(&format!("configuration/servers/{}", name)));
        let response = self.server_request(request, txn).send().await?;
        match Self::check(response).await {
            Ok(_) => Ok(()),
            Err(RegistryError::Rejected { status: 404, .. }) => {
                Err(RegistryError::UnknownServer(name.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    async fn commit(&self, txn: &TransactionId) -> RegistryResult<()> {
        let response = self
            .authed(self.client.put(self.url(&format!("transactions/{}", txn))))
            .send()
            .await?;
        let status = Self::check(response).await?.status();
        tracing::debug!(tid = %txn, status = %status, "Committed transaction");
        Ok(())
    }

    async fn discard(&self, txn: &TransactionId) -> RegistryResult<()> {
        let response = self
            .authed(self.client.delete(self.url(&format!("transactions/{}", txn))))
            .send()
            .await?;
        // Committed transactions are gone already.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(response).await.map(drop)
    }
}

impl std::fmt::Debug for DataPlaneRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataPlaneRegistry")
            .field("base_url", &self.base_url)
            .field("backend", &self.backend)
            .field("username", &self.username)
            .finish()
    }
}
