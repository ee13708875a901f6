use std::sync::Arc;

use boxoffice_core::{
    CatalogRepository, CoordinatorConfig, InMemoryStore, ReservationCoordinator, UserDirectory,
};
use boxoffice_shared::SeatEvent;
use boxoffice_store::app_config::RateLimitConfig;
use boxoffice_store::RedisClient;
use tokio::sync::broadcast;

/// Buffered seat events per subscriber before it starts lagging
const SEAT_EVENT_CAPACITY: usize = 100;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<ReservationCoordinator>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub users: Arc<dyn UserDirectory>,
    /// Rate limiting is skipped when absent
    pub redis: Option<Arc<RedisClient>>,
    pub seat_events: broadcast::Sender<SeatEvent>,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
}

impl AppState {
    pub fn new(
        coordinator: Arc<ReservationCoordinator>,
        catalog: Arc<dyn CatalogRepository>,
        users: Arc<dyn UserDirectory>,
        auth: AuthConfig,
    ) -> Self {
        let (seat_events, _) = broadcast::channel(SEAT_EVENT_CAPACITY);
        Self {
            coordinator,
            catalog,
            users,
            redis: None,
            seat_events,
            auth,
            rate_limit: RateLimitConfig::default(),
        }
    }

    /// Every repository served from one process-local store
    pub fn in_memory(store: InMemoryStore, reservations: CoordinatorConfig, auth: AuthConfig) -> Self {
        let coordinator = ReservationCoordinator::new(Arc::new(store.clone()), reservations);
        Self::new(
            Arc::new(coordinator),
            Arc::new(store.clone()),
            Arc::new(store),
            auth,
        )
    }

    pub fn with_rate_limit(mut self, redis: Arc<RedisClient>, limits: RateLimitConfig) -> Self {
        self.redis = Some(redis);
        self.rate_limit = limits;
        self
    }

    /// Nobody listening is fine; events are best-effort.
    pub fn publish(&self, event: SeatEvent) {
        let _ = self.seat_events.send(event);
    }
}
