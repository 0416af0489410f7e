use std::collections::HashMap;

use async_trait::async_trait;
use kube::{
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config,
};
use log::info;
use tokio::sync::RwLock;

use super::ManagerError;

/// Builds a client and resolves the default namespace for a kubeconfig.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    type Client: Clone + Send + Sync;

    async fn create_client(&self, kubeconfig: &[u8]) -> Result<(Self::Client, String), ManagerError>;
}

/// Resolves the namespace of the current context of a provider cluster kubeconfig.
#[async_trait]
pub trait NamespaceResolver: Send + Sync {
    async fn default_namespace(&self, kubeconfig: &[u8]) -> Result<String, ManagerError>;
}

#[derive(Debug, Default, Clone)]
pub struct KubeClientFactory;

#[async_trait]
impl ClientFactory for KubeClientFactory {
    type Client = Client;

    async fn create_client(&self, kubeconfig: &[u8]) -> Result<(Client, String), ManagerError> {
        let kubeconfig = String::from_utf8_lossy(kubeconfig);
        let kubeconfig = Kubeconfig::from_yaml(&kubeconfig).map_err(ManagerError::InvalidKubeconfig)?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(ManagerError::InvalidKubeconfig)?;
        let namespace = config.default_namespace.clone();
        let client = Client::try_from(config).map_err(ManagerError::ClientCreation)?;

        Ok((client, namespace))
    }
}

/// Memoizes one client per distinct kubeconfig for the lifetime of the process.
///
/// Entries are keyed by the exact kubeconfig bytes, so two semantically equal
/// kubeconfigs serialized differently get separate clients. Failed client
/// creations are not cached.
pub struct ClientCache<F: ClientFactory> {
    factory: F,
    clients: RwLock<HashMap<Vec<u8>, (F::Client, String)>>,
}

impl<F: ClientFactory> ClientCache<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            clients: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get_client(&self, kubeconfig: &[u8]) -> Result<(F::Client, String), ManagerError> {
        {
            let read_guard = self.clients.read().await;

            if let Some(entry) = read_guard.get(kubeconfig) {
                return Ok(entry.clone());
            }
        }

        let mut guard = self.clients.write().await;

        if let Some(entry) = guard.get(kubeconfig) {
            return Ok(entry.clone());
        }

        let entry = self.factory.create_client(kubeconfig).await?;
        info!("Created a client for the provider cluster (namespace '{}')", entry.1);
        guard.insert(kubeconfig.to_owned(), entry.clone());

        Ok(entry)
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    #[cfg(test)]
    pub(crate) async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }
}

impl Default for ClientCache<KubeClientFactory> {
    fn default() -> Self {
        Self::new(KubeClientFactory)
    }
}

#[async_trait]
impl<F: ClientFactory> NamespaceResolver for ClientCache<F> {
    async fn default_namespace(&self, kubeconfig: &[u8]) -> Result<String, ManagerError> {
        Ok(self.get_client(kubeconfig).await?.1)
    }
}
