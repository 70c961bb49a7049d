//! Store selection

use std::sync::Arc;

use labrack::prelude::*;

/// Lab services over PostgreSQL when configured, memory stores otherwise
#[cfg(feature = "database")]
pub async fn lab_services(
    config: &Config,
    provider: Arc<dyn CapabilityProvider>,
) -> anyhow::Result<LabServices> {
    use labrack::repository::Entity;

    let Some(database) = &config.database else {
        tracing::info!("no database configured, using memory stores");
        return Ok(LabServices::in_memory(provider)?);
    };

    let pool = create_pool(database).await?;

    async fn repository<E: Entity>(pool: &sqlx::PgPool) -> anyhow::Result<GenericRepository<E>> {
        let store = PgStore::<E>::new(pool.clone());
        store.ensure_schema().await?;
        Ok(GenericRepository::new(Arc::new(store))?)
    }

    Ok(LabServices::from_repositories(
        repository(&pool).await?,
        repository(&pool).await?,
        repository(&pool).await?,
        repository(&pool).await?,
        repository(&pool).await?,
        provider,
    ))
}

/// Lab services over memory stores
#[cfg(not(feature = "database"))]
pub async fn lab_services(
    config: &Config,
    provider: Arc<dyn CapabilityProvider>,
) -> anyhow::Result<LabServices> {
    if config.database.is_some() {
        tracing::warn!("a database is configured but this build lacks the `database` feature, using memory stores");
    }
    Ok(LabServices::in_memory(provider)?)
}
