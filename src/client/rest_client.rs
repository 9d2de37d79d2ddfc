use reqwest::StatusCode;
use reqwest::Url;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::ClientConfig;
use crate::ClientError;
use crate::TransportKind;

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub node_id: u32,
    pub transport: TransportKind,
    pub consensus_enabled: bool,
    /// Cluster size as seen by this node
    pub peers: usize,
}

#[derive(Debug, Clone)]
pub struct RestClient {
    base_url: String,
    base: Url,
    http: reqwest::Client,
}

impl RestClient {
    /// Binds a client to `endpoint`, e.g. `"http://localhost:9081"`.
    ///
    /// Fails with [`ClientError::InvalidUri`] unless the endpoint is a bare
    /// `http(s)://host[:port]` address.
    pub fn connect(endpoint: &str) -> Result<Self, ClientError> {
        Self::with_config(endpoint, ClientConfig::default())
    }

    pub fn with_config(
        endpoint: &str,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        let base = parse_endpoint(endpoint)?;
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .tcp_nodelay(config.tcp_nodelay)
            .build()?;

        debug!(%base, "rest client created");
        Ok(Self {
            base_url: endpoint.trim_end_matches('/').to_string(),
            base,
            http,
        })
    }

    pub fn for_address(
        host: &str,
        port: u16,
    ) -> Result<Self, ClientError> {
        Self::connect(&format!("http://{host}:{port}"))
    }

    /// The endpoint this client was bound to, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<NodeStatus, ClientError> {
        let url = self.url(&["health"])?;
        let response = ensure_success(self.http.get(url).send().await?)?;
        Ok(response.json().await?)
    }

    pub async fn put(
        &self,
        key: &str,
        value: impl Into<Vec<u8>>,
    ) -> Result<(), ClientError> {
        let url = self.key_url(key)?;
        ensure_success(self.http.put(url).body(value.into()).send().await?)?;
        Ok(())
    }

    /// Returns `None` when the node holds no value for `key`.
    pub async fn get(
        &self,
        key: &str,
    ) -> Result<Option<Vec<u8>>, ClientError> {
        let url = self.key_url(key)?;
        let response = self.http.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success(response)?;
        Ok(Some(response.bytes().await?.to_vec()))
    }

    pub fn key_url(
        &self,
        key: &str,
    ) -> Result<Url, ClientError> {
        self.url(&["v1", "keys", key])
    }

    fn url(
        &self,
        segments: &[&str],
    ) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| ClientError::InvalidUri {
                endpoint: self.base_url.clone(),
                reason: "endpoint cannot be a base address".into(),
            })?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }
}

fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ClientError::UnexpectedStatus {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}

pub(crate) fn parse_endpoint(endpoint: &str) -> Result<Url, ClientError> {
    let invalid = |reason: String| ClientError::InvalidUri {
        endpoint: endpoint.to_string(),
        reason,
    };

    let url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".into()));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(invalid("credentials are not supported".into()));
    }
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("endpoint must not carry a path, query or fragment".into()));
    }
    Ok(url)
}
