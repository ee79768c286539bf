use anyhow::Result;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};
use uuid::Uuid;

/// Where a queued operation stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationState {
    Pending,
    /// Finished; the result lives at `location`
    Done { location: String },
    Failed { error: String },
}

impl OperationState {
    fn is_terminal(&self) -> bool {
        !matches!(self, OperationState::Pending)
    }
}

/// Tracks background operations until a client has read their outcome
#[derive(Clone, Default)]
pub struct OperationManager {
    operations: Arc<RwLock<HashMap<String, OperationState>>>,
}

impl OperationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` in the background; returns the id to poll
    pub async fn spawn<F>(&self, work: F) -> String
    where
        F: Future<Output = Result<String>> + Send + 'static,
    {
        let id = Uuid::new_v4().to_string();
        self.operations
            .write()
            .await
            .insert(id.clone(), OperationState::Pending);

        let operations = self.operations.clone();
        let op_id = id.clone();
        tokio::spawn(async move {
            let state = match work.await {
                Ok(location) => {
                    info!("Operation {} completed", op_id);
                    OperationState::Done { location }
                }
                Err(e) => {
                    error!("Operation {} failed: {:#}", op_id, e);
                    OperationState::Failed {
                        error: format!("{:#}", e),
                    }
                }
            };
            operations.write().await.insert(op_id, state);
        });

        id
    }

    /// Current state; a finished operation is forgotten once returned
    pub async fn poll(&self, id: &str) -> Option<OperationState> {
        let mut operations = self.operations.write().await;
        let state = operations.get(id)?.clone();
        if state.is_terminal() {
            operations.remove(id);
        }
        Some(state)
    }

    pub async fn tracked(&self) -> usize {
        self.operations.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    async fn wait_terminal(ops: &OperationManager, id: &str) -> OperationState {
        for _ in 0..100 {
            // peek without consuming
            let state = ops.operations.read().await.get(id).cloned();
            if let Some(state) = state {
                if state.is_terminal() {
                    return ops.poll(id).await.unwrap();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("operation {} never finished", id);
    }

    #[tokio::test]
    async fn test_pending_until_work_finishes() {
        let ops = OperationManager::new();
        let (tx, rx) = oneshot::channel::<()>();

        let id = ops
            .spawn(async move {
                let _ = rx.await;
                Ok("/volumes/v1/georeplication".to_string())
            })
            .await;

        assert_eq!(ops.poll(&id).await, Some(OperationState::Pending));
        // pending entries survive polling
        assert_eq!(ops.poll(&id).await, Some(OperationState::Pending));

        tx.send(()).unwrap();
        assert_eq!(
            wait_terminal(&ops, &id).await,
            OperationState::Done {
                location: "/volumes/v1/georeplication".to_string()
            }
        );
        assert_eq!(ops.poll(&id).await, None);
        assert_eq!(ops.tracked().await, 0);
    }

    #[tokio::test]
    async fn test_failure_keeps_error_text() {
        let ops = OperationManager::new();
        let id = ops
            .spawn(async { Err(anyhow::anyhow!("Command failed on node1:22")) })
            .await;

        match wait_terminal(&ops, &id).await {
            OperationState::Failed { error } => assert!(error.contains("node1:22")),
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_id() {
        let ops = OperationManager::new();
        assert_eq!(ops.poll("nope").await, None);
    }
}
