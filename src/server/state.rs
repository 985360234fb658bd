use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;

use crate::channels::{ChannelSenders, InMemoryRecipientDirectory};
use crate::config::Settings;
use crate::feed::{create_notification_store, MemoryNotificationStore, NotificationFeed};
use crate::metrics::TemplateMetrics;
use crate::notification::{DispatchOptions, NotificationDispatcher};
use crate::postgres::PostgresPool;
use crate::preferences::{create_settings_store, MemorySettingsStore, SettingsStore};
use crate::rules::RulePolicy;
use crate::template::{create_template_store, RenderMode, TemplateStore};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub settings_store: Arc<dyn SettingsStore>,
    pub template_store: Arc<TemplateStore>,
    pub feed: NotificationFeed,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub postgres: Option<Arc<PostgresPool>>,
    pub started_at: Instant,
}

impl AppState {
    /// Build the state from configuration, connecting PostgreSQL when it is
    /// the configured backend. A failed connection or migration is fatal.
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        let postgres = if settings.storage.backend == "postgres" {
            Some(connect_postgres(&settings).await?)
        } else {
            None
        };

        let settings_store = create_settings_store(&settings.storage, postgres.clone())
            .context("Failed to create settings store")?;
        let feed = NotificationFeed::new(
            create_notification_store(&settings.storage, postgres.clone())
                .context("Failed to create notification store")?,
        );
        let template_store =
            create_template_store(&settings.templates).context("Failed to load templates")?;

        Ok(Self::assemble(
            settings,
            settings_store,
            template_store,
            feed,
            postgres,
            ChannelSenders::logging_defaults(),
        ))
    }

    /// Memory-backed state with the given transports, for tests and embedding
    pub fn in_memory(settings: Settings, senders: ChannelSenders) -> Self {
        Self::from_stores(
            settings,
            Arc::new(MemorySettingsStore::new()),
            NotificationFeed::new(Arc::new(MemoryNotificationStore::new())),
            senders,
        )
    }

    /// State over caller supplied stores, with an empty template store
    pub fn from_stores(
        settings: Settings,
        settings_store: Arc<dyn SettingsStore>,
        feed: NotificationFeed,
        senders: ChannelSenders,
    ) -> Self {
        let mode = if settings.templates.strict {
            RenderMode::Strict
        } else {
            RenderMode::Lenient
        };

        Self::assemble(
            settings,
            settings_store,
            Arc::new(TemplateStore::with_mode(mode)),
            feed,
            None,
            senders,
        )
    }

    fn assemble(
        settings: Settings,
        settings_store: Arc<dyn SettingsStore>,
        template_store: Arc<TemplateStore>,
        feed: NotificationFeed,
        postgres: Option<Arc<PostgresPool>>,
        senders: ChannelSenders,
    ) -> Self {
        TemplateMetrics::set_registered(template_store.count());

        let dispatcher = NotificationDispatcher::new(
            settings_store.clone(),
            template_store.clone(),
            feed.clone(),
        )
        .with_senders(senders)
        .with_recipients(Arc::new(InMemoryRecipientDirectory::new(
            settings.dispatch.recipient_fallback_to_user_id,
        )))
        .with_policy(RulePolicy::from_config(&settings.rules))
        .with_options(DispatchOptions::from_config(&settings.dispatch));

        tracing::info!(
            settings_backend = settings_store.backend_type(),
            feed_backend = feed.backend_type(),
            templates = template_store.count(),
            "Application state initialized"
        );

        Self {
            settings: Arc::new(settings),
            settings_store,
            template_store,
            feed,
            dispatcher: Arc::new(dispatcher),
            postgres,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

async fn connect_postgres(settings: &Settings) -> anyhow::Result<Arc<PostgresPool>> {
    let pool = PostgresPool::connect(&settings.database)
        .await
        .context("PostgreSQL storage configured but unreachable")?;

    if settings.database.run_migrations {
        if let Err(e) = pool.migrate().await {
            pool.close().await;
            return Err(anyhow::Error::new(e).context("PostgreSQL migrations failed"));
        }
    }

    Ok(Arc::new(pool))
}
