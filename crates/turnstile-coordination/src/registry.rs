//! Service registry
//!
//! Instances of a service register a plain ephemeral node under
//! `<root>/<encoded service key>/<node id>` whose payload is the JSON encoded
//! [`ServiceInstance`]. The service key is rendered as a query string and
//! escaped once more, so the whole key is a single path component.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use turnstile_common::path::{join_path, normalize_path};
use turnstile_common::{CommonError, host_address, is_valid_node_name};
use turnstile_store::CoordinationStore;

use crate::engine::CoordinationClient;
use crate::error::{CoordinationError, Result};
use crate::registrar::register_plain;

/// Field name used to escape the rendered key into one component
const KEY_FIELD: &str = "k";

/// Which side of a service an instance plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceRole {
    Consumer,
    Provider,
}

/// Composite identity of a service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceKey {
    pub group: String,
    pub protocol: String,
    pub role: ServiceRole,
    pub service: String,
    pub version: String,
}

impl ServiceKey {
    pub fn new(
        group: impl Into<String>,
        protocol: impl Into<String>,
        role: ServiceRole,
        service: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            protocol: protocol.into(),
            role,
            service: service.into(),
            version: version.into(),
        }
    }

    /// `group=..&protocol=..&role=..&service=..&version=..`
    pub fn query(&self) -> Result<String> {
        serde_urlencoded::to_string(self).map_err(|e| invalid_key(&self.service, e))
    }

    /// The query string escaped into a single node name
    pub fn node_name(&self) -> Result<String> {
        let query = self.query()?;
        let escaped = serde_urlencoded::to_string(vec![(KEY_FIELD, query.as_str())])
            .map_err(|e| invalid_key(&self.service, e))?;
        Ok(escaped
            .strip_prefix(KEY_FIELD)
            .and_then(|rest| rest.strip_prefix('='))
            .unwrap_or_default()
            .to_string())
    }

    /// Inverse of [`ServiceKey::node_name`]
    pub fn from_node_name(name: &str) -> Result<Self> {
        let fields: Vec<(String, String)> =
            serde_urlencoded::from_str(&format!("{}={}", KEY_FIELD, name))
                .map_err(|e| invalid_key(name, e))?;
        let query = fields
            .into_iter()
            .next()
            .map(|(_, query)| query)
            .unwrap_or_default();
        serde_urlencoded::from_str(&query).map_err(|e| invalid_key(name, e))
    }
}

fn invalid_key(key: &str, err: impl std::fmt::Display) -> CoordinationError {
    CoordinationError::InvalidPath(CommonError::InvalidComponent(
        key.to_string(),
        err.to_string(),
    ))
}

/// One registered instance of a service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstance {
    pub key: ServiceKey,
    pub node_id: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ServiceInstance {
    pub fn new(key: ServiceKey, node_id: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            key,
            node_id: node_id.into(),
            host: host.into(),
            port,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// `host:port`, IPv6 hosts bracketed
    pub fn address(&self) -> String {
        host_address(&self.host, self.port)
    }
}

/// Registers and discovers service instances under a root path
pub struct ServiceRegistry {
    store: Arc<dyn CoordinationStore>,
    root: String,
}

impl ServiceRegistry {
    pub fn new(store: Arc<dyn CoordinationStore>, root: &str) -> Result<Self> {
        Ok(Self {
            store,
            root: normalize_path(root)?,
        })
    }

    /// Registry sharing the client's session, rooted at its configured registry root
    pub fn for_client(client: &CoordinationClient) -> Result<Self> {
        Self::new(client.store().clone(), &client.config().registry_root)
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Path of the directory holding all instances of `key`
    pub fn service_path(&self, key: &ServiceKey) -> Result<String> {
        Ok(join_path(&self.root, &key.node_name()?))
    }

    fn instance_path(&self, instance: &ServiceInstance) -> Result<String> {
        if !is_valid_node_name(&instance.node_id) {
            return Err(CoordinationError::InvalidPath(CommonError::InvalidComponent(
                instance.node_id.clone(),
                instance.node_id.clone(),
            )));
        }
        Ok(join_path(&self.service_path(&instance.key)?, &instance.node_id))
    }

    /// Publish `instance` for the lifetime of the session. Returns the node path.
    pub async fn register(&self, instance: &ServiceInstance) -> Result<String> {
        let path = self.instance_path(instance)?;
        let payload = serde_json::to_vec(instance)?;

        let created = register_plain(self.store.as_ref(), &path, &payload).await?;
        info!(
            service = %instance.key.service,
            node_id = %instance.node_id,
            address = %instance.address(),
            "Registered service instance"
        );
        Ok(created)
    }

    /// Withdraw `instance`; withdrawing an absent instance succeeds.
    pub async fn deregister(&self, instance: &ServiceInstance) -> Result<()> {
        let path = self.instance_path(instance)?;
        match self.store.delete(&path).await {
            Ok(()) => {
                info!(service = %instance.key.service, node_id = %instance.node_id, "Deregistered service instance");
                Ok(())
            }
            Err(e) if e.is_no_node() => Ok(()),
            Err(e) => Err(CoordinationError::store("delete", path, e)),
        }
    }

    /// Every live instance of `key`, ordered by node id.
    pub async fn instances(&self, key: &ServiceKey) -> Result<Vec<ServiceInstance>> {
        let service_path = self.service_path(key)?;
        let children = match self.store.children(&service_path).await {
            Ok(children) => children,
            Err(e) if e.is_no_node() => return Ok(Vec::new()),
            Err(e) => return Err(CoordinationError::store("children", service_path, e)),
        };

        let mut instances = Vec::with_capacity(children.len());
        for child in children {
            let path = join_path(&service_path, &child);
            let data = match self.store.get_data(&path).await {
                Ok(data) => data,
                // Deregistered between listing and reading
                Err(e) if e.is_no_node() => continue,
                Err(e) => return Err(CoordinationError::store("get_data", path, e)),
            };
            instances.push(serde_json::from_slice::<ServiceInstance>(&data)?);
        }
        instances.sort_by(|a, b| a.node_id.cmp(&b.node_id));

        debug!(service = %key.service, count = instances.len(), "Listed service instances");
        Ok(instances)
    }
}
