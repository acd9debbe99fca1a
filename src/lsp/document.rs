use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tower_lsp::lsp_types::Url;

/// Latest known text of each open document
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    contents: Arc<RwLock<HashMap<Url, String>>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, uri: Url, content: String) {
        self.contents.write().await.insert(uri, content);
    }

    pub async fn get(&self, uri: &Url) -> Option<String> {
        self.contents.read().await.get(uri).cloned()
    }

    pub async fn remove(&self, uri: &Url) -> Option<String> {
        self.contents.write().await.remove(uri)
    }
}
