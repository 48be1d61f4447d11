//! Vector/embedding provider (consumed, not implemented here). Treated as
//! an external collaborator — only the `store/search/delete/hasEmbedding/
//! getModel` contract is consumed.

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatch {
    pub id: String,
    pub distance: f64,
}

#[async_trait]
pub trait VectorProvider: Send + Sync {
    async fn store(&self, id: &str, vector: &[f32], model: &str) -> anyhow::Result<()>;
    async fn search(&self, vector: &[f32], k: usize) -> anyhow::Result<Vec<VectorMatch>>;
    async fn delete(&self, id: &str) -> anyhow::Result<()>;
    fn get_model(&self) -> Option<String>;
    async fn has_embedding(&self, _id: &str) -> anyhow::Result<bool> {
        Ok(false)
    }
}

/// No-op provider used when no vector backend is injected. `search` always
/// reports the embedding capability as unavailable so the dispatcher routes
/// `handleSearch` to `PROVIDER_ERROR`.
pub struct NullVectorProvider;

#[async_trait]
impl VectorProvider for NullVectorProvider {
    async fn store(&self, _id: &str, _vector: &[f32], _model: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn search(&self, _vector: &[f32], _k: usize) -> anyhow::Result<Vec<VectorMatch>> {
        Ok(Vec::new())
    }

    async fn delete(&self, _id: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn get_model(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_provider_is_inert() {
        let provider = NullVectorProvider;
        provider.store("id", &[0.1, 0.2], "model").await.unwrap();
        assert!(provider.search(&[0.1], 5).await.unwrap().is_empty());
        assert_eq!(provider.get_model(), None);
        assert!(!provider.has_embedding("id").await.unwrap());
    }
}
