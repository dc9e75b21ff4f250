use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock};
use tracing::info;
use uuid::Uuid;

use crate::journey::controller::{ControllerSettings, JourneyController};
use crate::journey::executor::StageExecutor;
use crate::journey::store::{JourneyStore, StoreError};

type Slot = Arc<OnceCell<Arc<JourneyController>>>;

/// One controller per user, created on first access and kept for the life
/// of the process. Two controllers for the same user would race on the store.
pub struct ControllerRegistry {
    store: Arc<dyn JourneyStore>,
    executor: Arc<dyn StageExecutor>,
    settings: ControllerSettings,
    controllers: RwLock<HashMap<Uuid, Slot>>,
}

impl ControllerRegistry {
    pub fn new(
        store: Arc<dyn JourneyStore>,
        executor: Arc<dyn StageExecutor>,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            store,
            executor,
            settings,
            controllers: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get_or_load(&self, user_id: Uuid) -> Result<Arc<JourneyController>, StoreError> {
        let slot = self.slot(user_id).await;
        let controller = slot
            .get_or_try_init(|| async {
                info!("Loading journey for user {user_id}");
                JourneyController::load(
                    user_id,
                    self.store.clone(),
                    self.executor.clone(),
                    self.settings,
                )
                .await
            })
            .await?;
        Ok(controller.clone())
    }

    async fn slot(&self, user_id: Uuid) -> Slot {
        if let Some(slot) = self.controllers.read().await.get(&user_id) {
            return slot.clone();
        }
        self.controllers
            .write()
            .await
            .entry(user_id)
            .or_default()
            .clone()
    }

    /// Number of users with a controller in memory.
    pub async fn loaded_count(&self) -> usize {
        self.controllers.read().await.len()
    }
}
