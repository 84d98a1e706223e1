//! Auxiliary context folded into evaluation requests

use crate::dataset::Row;
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Asynchronous lookup of extra context for one item (e.g. retrieval)
#[async_trait]
pub trait ContextResolver: Send + Sync {
    /// Produce context for the item
    async fn resolve(&self, item: &Row) -> Result<String>;
}

/// Context attached to an agent: a fixed string or a per-item resolver
#[derive(Clone)]
pub enum AuxContext {
    /// Same context for every item
    Constant(String),
    /// Looked up per item
    Resolver(Arc<dyn ContextResolver>),
}

impl AuxContext {
    /// Constant context
    pub fn constant(text: impl Into<String>) -> Self {
        Self::Constant(text.into())
    }

    /// Resolver-backed context
    pub fn resolver(resolver: Arc<dyn ContextResolver>) -> Self {
        Self::Resolver(resolver)
    }

    /// Resolve the context for one item
    pub async fn resolve(&self, item: &Row) -> Result<String> {
        match self {
            Self::Constant(text) => Ok(text.clone()),
            Self::Resolver(resolver) => resolver.resolve(item).await,
        }
    }
}

impl fmt::Debug for AuxContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(text) => f.debug_tuple("Constant").field(text).finish(),
            Self::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

/// Adapter turning an async closure into a [`ContextResolver`]
pub struct FnResolver<F>(pub F);

#[async_trait]
impl<F, Fut> ContextResolver for FnResolver<F>
where
    F: Fn(Row) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<String>> + Send,
{
    async fn resolve(&self, item: &Row) -> Result<String> {
        (self.0)(item.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_constant_and_resolver() {
        let item = json!({"title": "Sepsis"}).as_object().cloned().unwrap();

        let constant = AuxContext::constant("RAG context: protocol.pdf.");
        assert_eq!(
            constant.resolve(&item).await.unwrap(),
            "RAG context: protocol.pdf."
        );

        let lookup = AuxContext::resolver(Arc::new(FnResolver(|row: Row| async move {
            let title = row.get("title").and_then(|v| v.as_str()).unwrap_or("");
            Ok::<_, crate::error::Error>(format!("notes for {}", title))
        })));
        assert_eq!(lookup.resolve(&item).await.unwrap(), "notes for Sepsis");
    }
}
