use std::sync::Arc;

use labstock_infra::{
    ComponentRepository, InMemoryInventoryStore, MovementService, PlainLabelEncoder,
    PostgresInventoryStore, RegistryService, ServiceError, StockLogRepository,
};
use labstock_ledger::StockLogEntry;
use labstock_registry::Component;

/// The wired application services shared by all handlers.
///
/// Both store backends implement the same repository traits, so everything
/// past this point is backend-agnostic.
#[derive(Clone)]
pub struct AppServices {
    pub registry: Arc<RegistryService>,
    pub movements: Arc<MovementService>,
    components: Arc<dyn ComponentRepository>,
    logs: Arc<dyn StockLogRepository>,
}

impl AppServices {
    fn wire(
        components: Arc<dyn ComponentRepository>,
        logs: Arc<dyn StockLogRepository>,
    ) -> Self {
        Self {
            registry: Arc::new(RegistryService::new(
                components.clone(),
                Arc::new(PlainLabelEncoder),
            )),
            movements: Arc::new(MovementService::new(components.clone(), logs.clone())),
            components,
            logs,
        }
    }

    /// Raw rows for the dashboard derivations.
    pub async fn dashboard_rows(
        &self,
    ) -> Result<(Vec<Component>, Vec<StockLogEntry>), ServiceError> {
        let components = self.components.list_all().await?;
        let logs = self.logs.list_all().await?;
        Ok((components, logs))
    }
}

pub async fn build_services() -> AppServices {
    let use_persistent = std::env::var("USE_PERSISTENT_STORES")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    if use_persistent {
        match build_persistent_services().await {
            Ok(services) => return services,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "USE_PERSISTENT_STORES=true but Postgres is unavailable, falling back to in-memory"
                );
            }
        }
    }

    tracing::info!("using in-memory stores");
    let store = Arc::new(InMemoryInventoryStore::new());
    AppServices::wire(store.clone(), store)
}

async fn build_persistent_services() -> Result<AppServices, anyhow::Error> {
    let database_url = std::env::var("DATABASE_URL")?;
    let pool = sqlx::PgPool::connect(&database_url).await?;

    let store = PostgresInventoryStore::new(pool);
    store.ensure_schema().await?;

    tracing::info!("using Postgres stores");
    let store = Arc::new(store);
    Ok(AppServices::wire(store.clone(), store))
}
