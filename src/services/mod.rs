use crate::error::AppResult;

pub mod artifacts;
pub mod health;
pub mod mirror;
pub mod recommendation;
pub mod source;
pub mod sync;
pub mod training;

/// Round-trip check used by the health reporter against both data stores.
#[async_trait::async_trait]
pub trait Reachable: Send + Sync {
    async fn ping(&self) -> AppResult<()>;
}
