//! Connection registry.
//!
//! Built once at startup from the configuration — one manager per
//! enabled TV, all sharing one key store — and handed to the HTTP
//! layer. No process-global state.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use tvlink_connection::{ConnectionManager, Endpoint, KeyStore};

use crate::config::BridgeConfig;

pub struct Registry {
    managers: HashMap<String, Arc<ConnectionManager>>,
}

impl Registry {
    /// Creates managers for every enabled TV in the configuration.
    pub fn build(config: &BridgeConfig) -> Self {
        let keys = Arc::new(KeyStore::open(config.keys_file.clone()));

        let mut managers = HashMap::new();
        for (name, tv) in &config.tvs {
            if !tv.enabled {
                info!(tv = %name, "skipping disabled TV");
                continue;
            }
            let endpoint = Endpoint::new(tv.host.clone(), tv.secure);
            let manager = Arc::new(ConnectionManager::new(endpoint, keys.clone()));
            info!(tv = %name, url = %manager.url(), "registered TV");
            managers.insert(name.clone(), manager);
        }

        Self { managers }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ConnectionManager>> {
        self.managers.get(name)
    }

    /// Opens every managed connection.
    pub async fn connect_all(&self) {
        for manager in self.managers.values() {
            manager.connect().await;
        }
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }
}
