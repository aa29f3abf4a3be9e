//! Shared intake-test fixture over in-memory adapters.

use crate::backend::TaskBackend;
use crate::backend::adapters::memory::InMemoryBackend;
use crate::backend::record::{DatabaseRecord, PropertyValue, RawRecord};
use crate::config::{ConfigHandle, RetrySettings, SyncConfig, WebhookSettings};
use crate::correlation::adapters::memory::InMemoryCorrelationStore;
use crate::engine::{ApplyEngine, HealthState};
use crate::identity::{RecordId, SystemSide};
use crate::mapping::MappingConfig;
use chrono::{TimeZone, Utc};
use mockable::DefaultClock;
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct IntakeHarness {
    pub store: Arc<InMemoryCorrelationStore>,
    pub database: Arc<InMemoryBackend<DefaultClock>>,
    pub tasklist: Arc<InMemoryBackend<DefaultClock>>,
    pub engine: Arc<ApplyEngine<InMemoryCorrelationStore, DefaultClock>>,
    pub config: Arc<ConfigHandle>,
}

pub fn intake_harness(config: SyncConfig) -> IntakeHarness {
    let clock = Arc::new(DefaultClock);
    let store = Arc::new(InMemoryCorrelationStore::new());
    let database = Arc::new(InMemoryBackend::new(SystemSide::Database, Arc::clone(&clock)));
    let tasklist = Arc::new(InMemoryBackend::new(SystemSide::Tasklist, Arc::clone(&clock)));
    let config = Arc::new(ConfigHandle::fixed(config));
    let engine = Arc::new(ApplyEngine::new(
        Arc::clone(&store),
        Arc::clone(&database) as Arc<dyn TaskBackend>,
        Arc::clone(&tasklist) as Arc<dyn TaskBackend>,
        Arc::clone(&config),
        clock,
        Arc::new(HealthState::new()),
        4,
    ));
    IntakeHarness {
        store,
        database,
        tasklist,
        engine,
        config,
    }
}

pub fn harness_page(id: &str, title: &str) -> RawRecord {
    let mut properties = BTreeMap::new();
    properties.insert(
        "Name".to_owned(),
        PropertyValue::Title {
            text: title.to_owned(),
        },
    );
    RawRecord::Database(DatabaseRecord {
        id: RecordId::new(id),
        last_edited: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).single().expect("valid timestamp"),
        properties,
    })
}

pub fn base_config() -> SyncConfig {
    let mut field_mapping = BTreeMap::new();
    field_mapping.insert("Name".to_owned(), "content".to_owned());
    SyncConfig {
        mapping: MappingConfig {
            field_mapping,
            ..MappingConfig::default()
        },
        retry: RetrySettings {
            max_attempts: 3,
            initial_delay_ms: 1,
            max_delay_ms: 4,
            timeout_ms: 1_000,
        },
        webhooks: WebhookSettings {
            tasklist_secret: Some("shared-secret".to_owned()),
        },
        ..SyncConfig::default()
    }
}
