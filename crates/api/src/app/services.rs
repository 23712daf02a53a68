use std::{
    collections::HashMap,
    convert::Infallible,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use sqlx::PgPool;
use stockpilot_advisor::Advice;
use stockpilot_core::{AggregateId, DomainError, TenantId};
use stockpilot_events::{EventBus, EventEnvelope, InMemoryEventBus};
use stockpilot_infra::{
    advisor::{AdviceSink, ReorderAdvisorRunner, ReorderAdvisorRunnerHandle},
    command_dispatcher::{CommandDispatcher, DispatchError},
    event_store::{
        EventFilter, EventQuery, EventQueryResult, InMemoryEventStore, Pagination,
        PostgresEventStore, StoredEvent,
    },
    projections::{
        categories::{CategoryDirectoryProjection, CategoryReadModel},
        movements::{MovementRecord, StockMovementsProjection},
        products::{ProductCatalogProjection, ProductReadModel},
        purchasing::{PurchaseOrderReadModel, PurchaseOrdersProjection},
        stock_levels::{StockItemReadModel, StockLevelsProjection},
        suppliers::{SupplierDirectoryProjection, SupplierReadModel},
        PostgresCursorStore,
    },
    read_model::{InMemoryTenantStore, PostgresStockStore},
};
use tokio::sync::broadcast;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};

/// Realtime message broadcasted via SSE.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RealtimeMessage {
    pub tenant_id: TenantId,
    pub topic: String,
    pub payload: serde_json::Value,
}

/// API-local advice sink that stores batches and broadcasts "advice available"
/// notifications.
#[derive(Debug)]
pub struct ApiAdviceSink {
    inner: Mutex<Vec<(TenantId, Vec<Advice>)>>,
    realtime_tx: broadcast::Sender<RealtimeMessage>,
}

impl ApiAdviceSink {
    pub fn new(realtime_tx: broadcast::Sender<RealtimeMessage>) -> Self {
        Self {
            inner: Mutex::new(Vec::new()),
            realtime_tx,
        }
    }

    pub fn all(&self) -> Vec<(TenantId, Vec<Advice>)> {
        self.inner.lock().unwrap().clone()
    }

    /// Most recent batch for the tenant, if any run has completed.
    pub fn latest(&self, tenant_id: TenantId) -> Option<Vec<Advice>> {
        self.inner
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(t, _)| *t == tenant_id)
            .map(|(_, advice)| advice.clone())
    }
}

impl AdviceSink for ApiAdviceSink {
    fn emit(&self, tenant_id: TenantId, advice: Vec<Advice>) {
        let count = advice.len();
        self.inner.lock().unwrap().push((tenant_id, advice));

        // Broadcast that new advice is available (lossy; no backpressure on core).
        let _ = self.realtime_tx.send(RealtimeMessage {
            tenant_id,
            topic: "advisor.advice_available".to_string(),
            payload: serde_json::json!({
                "kind": "advice",
                "job": "inventory.reorder",
                "count": count,
            }),
        });
    }
}

// Type-erased dispatcher for in-memory implementations
type InMemoryDispatcher = CommandDispatcher<
    Arc<InMemoryEventStore>,
    Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>>,
>;

// Type-erased dispatcher for persistent implementations. The bus stays
// in-memory: projections and the realtime feed live in this process.
type PersistentDispatcher = CommandDispatcher<
    Arc<PostgresEventStore>,
    Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>>,
>;

type InMemoryStockProjection =
    StockLevelsProjection<Arc<InMemoryTenantStore<stockpilot_inventory::StockItemId, StockItemReadModel>>>;
type PersistentStockProjection =
    StockLevelsProjection<Arc<PostgresStockStore>, PostgresCursorStore>;

#[derive(Clone)]
pub enum AppServices {
    InMemory {
        dispatcher: Arc<InMemoryDispatcher>,
        event_store: Arc<InMemoryEventStore>,
        event_bus: Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>>,
        products_projection: Arc<
            ProductCatalogProjection<Arc<InMemoryTenantStore<stockpilot_catalog::ProductId, ProductReadModel>>>,
        >,
        categories_projection: Arc<
            CategoryDirectoryProjection<Arc<InMemoryTenantStore<stockpilot_catalog::CategoryId, CategoryReadModel>>>,
        >,
        suppliers_projection: Arc<
            SupplierDirectoryProjection<Arc<InMemoryTenantStore<stockpilot_suppliers::SupplierId, SupplierReadModel>>>,
        >,
        stock_projection: Arc<InMemoryStockProjection>,
        movements_projection: Arc<
            StockMovementsProjection<Arc<InMemoryTenantStore<stockpilot_inventory::StockItemId, Vec<MovementRecord>>>>,
        >,
        purchases_projection: Arc<
            PurchaseOrdersProjection<Arc<InMemoryTenantStore<stockpilot_purchasing::PurchaseOrderId, PurchaseOrderReadModel>>>,
        >,
        advice_sink: Arc<ApiAdviceSink>,
        realtime_tx: broadcast::Sender<RealtimeMessage>,
    },
    Persistent {
        dispatcher: Arc<PersistentDispatcher>,
        event_store: Arc<PostgresEventStore>,
        event_bus: Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>>,
        products_projection: Arc<
            ProductCatalogProjection<Arc<InMemoryTenantStore<stockpilot_catalog::ProductId, ProductReadModel>>>,
        >,
        categories_projection: Arc<
            CategoryDirectoryProjection<Arc<InMemoryTenantStore<stockpilot_catalog::CategoryId, CategoryReadModel>>>,
        >,
        suppliers_projection: Arc<
            SupplierDirectoryProjection<Arc<InMemoryTenantStore<stockpilot_suppliers::SupplierId, SupplierReadModel>>>,
        >,
        stock_projection: Arc<PersistentStockProjection>,
        movements_projection: Arc<
            StockMovementsProjection<Arc<InMemoryTenantStore<stockpilot_inventory::StockItemId, Vec<MovementRecord>>>>,
        >,
        purchases_projection: Arc<
            PurchaseOrdersProjection<Arc<InMemoryTenantStore<stockpilot_purchasing::PurchaseOrderId, PurchaseOrderReadModel>>>,
        >,
        advice_sink: Arc<ApiAdviceSink>,
        realtime_tx: broadcast::Sender<RealtimeMessage>,
    },
}

pub async fn build_services() -> AppServices {
    let use_persistent = std::env::var("USE_PERSISTENT_STORES")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    if use_persistent {
        return build_persistent_services().await;
    }

    build_in_memory_services()
}

fn build_in_memory_services() -> AppServices {
    // In-memory infra wiring (dev/test): store + bus + projections.
    let store = Arc::new(InMemoryEventStore::new());
    let bus: Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>> =
        Arc::new(InMemoryEventBus::new());

    let products_store: Arc<InMemoryTenantStore<stockpilot_catalog::ProductId, ProductReadModel>> =
        Arc::new(InMemoryTenantStore::new());
    let products_projection: Arc<ProductCatalogProjection<_>> =
        Arc::new(ProductCatalogProjection::new(products_store));

    let categories_store: Arc<InMemoryTenantStore<stockpilot_catalog::CategoryId, CategoryReadModel>> =
        Arc::new(InMemoryTenantStore::new());
    let categories_projection: Arc<CategoryDirectoryProjection<_>> =
        Arc::new(CategoryDirectoryProjection::new(categories_store));

    let suppliers_store: Arc<InMemoryTenantStore<stockpilot_suppliers::SupplierId, SupplierReadModel>> =
        Arc::new(InMemoryTenantStore::new());
    let suppliers_projection: Arc<SupplierDirectoryProjection<_>> =
        Arc::new(SupplierDirectoryProjection::new(suppliers_store));

    let stock_store: Arc<InMemoryTenantStore<stockpilot_inventory::StockItemId, StockItemReadModel>> =
        Arc::new(InMemoryTenantStore::new());
    let stock_projection: Arc<InMemoryStockProjection> =
        Arc::new(StockLevelsProjection::new(stock_store));

    let movements_store: Arc<
        InMemoryTenantStore<stockpilot_inventory::StockItemId, Vec<MovementRecord>>,
    > = Arc::new(InMemoryTenantStore::new());
    let movements_projection: Arc<StockMovementsProjection<_>> =
        Arc::new(StockMovementsProjection::new(movements_store));

    let purchases_store: Arc<
        InMemoryTenantStore<stockpilot_purchasing::PurchaseOrderId, PurchaseOrderReadModel>,
    > = Arc::new(InMemoryTenantStore::new());
    let purchases_projection: Arc<PurchaseOrdersProjection<_>> =
        Arc::new(PurchaseOrdersProjection::new(purchases_store));

    // Realtime channel (SSE): lossy broadcast, tenant-filtered in handlers.
    let (realtime_tx, _realtime_rx) = broadcast::channel::<RealtimeMessage>(256);

    // Advisor wiring: in-memory advice + per-tenant reorder runners.
    let advice_sink: Arc<ApiAdviceSink> = Arc::new(ApiAdviceSink::new(realtime_tx.clone()));
    let runners: Arc<Mutex<HashMap<TenantId, ReorderAdvisorRunnerHandle>>> =
        Arc::new(Mutex::new(HashMap::new()));
    let runner_cfg = ReorderAdvisorRunner::default();

    // Background subscriber: bus -> projections
    {
        let sub = bus.subscribe();
        let products_projection = products_projection.clone();
        let categories_projection = categories_projection.clone();
        let suppliers_projection = suppliers_projection.clone();
        let stock_projection = stock_projection.clone();
        let movements_projection = movements_projection.clone();
        let purchases_projection = purchases_projection.clone();
        let advice_sink = advice_sink.clone();
        let runners = runners.clone();
        let realtime_tx = realtime_tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match sub.recv() {
                Ok(env) => {
                    let at = env.aggregate_type();

                    // Apply to the relevant projection(s) only.
                    let apply_ok = match at {
                        "catalog.product" => {
                            products_projection.apply_envelope(&env).map_err(|e| e.to_string())
                        }
                        "catalog.category" => {
                            categories_projection.apply_envelope(&env).map_err(|e| e.to_string())
                        }
                        "suppliers.supplier" => {
                            suppliers_projection.apply_envelope(&env).map_err(|e| e.to_string())
                        }
                        "inventory.stock_item" => {
                            if let Err(e) = stock_projection.apply_envelope(&env) {
                                Err(e.to_string())
                            } else if let Err(e) = movements_projection.apply_envelope(&env) {
                                Err(e.to_string())
                            } else {
                                Ok(())
                            }
                        }
                        "purchasing.order" => {
                            purchases_projection.apply_envelope(&env).map_err(|e| e.to_string())
                        }
                        _ => Ok(()),
                    };

                    if let Err(e) = apply_ok {
                        tracing::warn!("projection apply failed: {e}");
                        continue;
                    }

                    // Broadcast projection update (lossy; no backpressure on core).
                    let _ = realtime_tx.send(RealtimeMessage {
                        tenant_id: env.tenant_id(),
                        topic: format!("{at}.projection_updated"),
                        payload: serde_json::json!({
                            "kind": "projection_update",
                            "aggregate_type": at,
                            "aggregate_id": env.aggregate_id().to_string(),
                            "sequence_number": env.sequence_number(),
                        }),
                    });

                    // Event-triggered advisor execution only for stock updates.
                    if at == "inventory.stock_item" {
                        let tenant_id = env.tenant_id();
                        let mut runners = runners.lock().unwrap();
                        let handle = runners.entry(tenant_id).or_insert_with(|| {
                            runner_cfg.spawn_for_tenant(
                                "advisor.reorder",
                                tenant_id,
                                stock_projection.clone(),
                                advice_sink.clone(),
                            )
                        });
                        handle.trigger();
                    }
                }
                Err(_) => break,
            }
        });
    }

    let dispatcher: Arc<InMemoryDispatcher> =
        Arc::new(CommandDispatcher::new(store.clone(), bus.clone()));
    AppServices::InMemory {
        dispatcher,
        event_store: store,
        event_bus: bus,
        products_projection,
        categories_projection,
        suppliers_projection,
        stock_projection,
        movements_projection,
        purchases_projection,
        advice_sink,
        realtime_tx,
    }
}

async fn build_persistent_services() -> AppServices {
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set when USE_PERSISTENT_STORES=true");

    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to Postgres");

    let store = Arc::new(PostgresEventStore::new(pool.clone()));
    let bus: Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>> =
        Arc::new(InMemoryEventBus::new());

    // Stock levels read model lives in Postgres; its projection cursor does
    // too, so a restart resumes instead of reapplying from sequence zero.
    let stock_store = Arc::new(PostgresStockStore::new(pool.clone()));
    let cursor_store = Arc::new(PostgresCursorStore::new(pool));
    let stock_projection: Arc<PersistentStockProjection> = Arc::new(
        StockLevelsProjection::new(stock_store)
            .with_persistent_cursors(cursor_store, "inventory.stock_levels"),
    );

    // Other projections currently use in-memory read models (can be swapped to Postgres later).
    let products_store: Arc<InMemoryTenantStore<stockpilot_catalog::ProductId, ProductReadModel>> =
        Arc::new(InMemoryTenantStore::new());
    let products_projection: Arc<ProductCatalogProjection<_>> =
        Arc::new(ProductCatalogProjection::new(products_store));

    let categories_store: Arc<InMemoryTenantStore<stockpilot_catalog::CategoryId, CategoryReadModel>> =
        Arc::new(InMemoryTenantStore::new());
    let categories_projection: Arc<CategoryDirectoryProjection<_>> =
        Arc::new(CategoryDirectoryProjection::new(categories_store));

    let suppliers_store: Arc<InMemoryTenantStore<stockpilot_suppliers::SupplierId, SupplierReadModel>> =
        Arc::new(InMemoryTenantStore::new());
    let suppliers_projection: Arc<SupplierDirectoryProjection<_>> =
        Arc::new(SupplierDirectoryProjection::new(suppliers_store));

    let movements_store: Arc<
        InMemoryTenantStore<stockpilot_inventory::StockItemId, Vec<MovementRecord>>,
    > = Arc::new(InMemoryTenantStore::new());
    let movements_projection: Arc<StockMovementsProjection<_>> =
        Arc::new(StockMovementsProjection::new(movements_store));

    let purchases_store: Arc<
        InMemoryTenantStore<stockpilot_purchasing::PurchaseOrderId, PurchaseOrderReadModel>,
    > = Arc::new(InMemoryTenantStore::new());
    let purchases_projection: Arc<PurchaseOrdersProjection<_>> =
        Arc::new(PurchaseOrdersProjection::new(purchases_store));

    let (realtime_tx, _realtime_rx) = broadcast::channel::<RealtimeMessage>(256);

    let advice_sink: Arc<ApiAdviceSink> = Arc::new(ApiAdviceSink::new(realtime_tx.clone()));
    let runners: Arc<Mutex<HashMap<TenantId, ReorderAdvisorRunnerHandle>>> =
        Arc::new(Mutex::new(HashMap::new()));
    let runner_cfg = ReorderAdvisorRunner::default();

    {
        let sub = bus.subscribe();
        let products_projection = products_projection.clone();
        let categories_projection = categories_projection.clone();
        let suppliers_projection = suppliers_projection.clone();
        let stock_projection = stock_projection.clone();
        let movements_projection = movements_projection.clone();
        let purchases_projection = purchases_projection.clone();
        let advice_sink = advice_sink.clone();
        let runners = runners.clone();
        let realtime_tx = realtime_tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match sub.recv() {
                Ok(env) => {
                    let at = env.aggregate_type();

                    let apply_ok = match at {
                        "catalog.product" => {
                            products_projection.apply_envelope(&env).map_err(|e| e.to_string())
                        }
                        "catalog.category" => {
                            categories_projection.apply_envelope(&env).map_err(|e| e.to_string())
                        }
                        "suppliers.supplier" => {
                            suppliers_projection.apply_envelope(&env).map_err(|e| e.to_string())
                        }
                        "inventory.stock_item" => {
                            if let Err(e) = stock_projection.apply_envelope(&env) {
                                Err(e.to_string())
                            } else if let Err(e) = movements_projection.apply_envelope(&env) {
                                Err(e.to_string())
                            } else {
                                Ok(())
                            }
                        }
                        "purchasing.order" => {
                            purchases_projection.apply_envelope(&env).map_err(|e| e.to_string())
                        }
                        _ => Ok(()),
                    };

                    if let Err(e) = apply_ok {
                        tracing::warn!("projection apply failed: {e}");
                        continue;
                    }

                    let _ = realtime_tx.send(RealtimeMessage {
                        tenant_id: env.tenant_id(),
                        topic: format!("{at}.projection_updated"),
                        payload: serde_json::json!({
                            "kind": "projection_update",
                            "aggregate_type": at,
                            "aggregate_id": env.aggregate_id().to_string(),
                            "sequence_number": env.sequence_number(),
                        }),
                    });

                    if at == "inventory.stock_item" {
                        let tenant_id = env.tenant_id();
                        let mut runners = runners.lock().unwrap();
                        let handle = runners.entry(tenant_id).or_insert_with(|| {
                            runner_cfg.spawn_for_tenant(
                                "advisor.reorder",
                                tenant_id,
                                stock_projection.clone(),
                                advice_sink.clone(),
                            )
                        });
                        handle.trigger();
                    }
                }
                Err(_) => break,
            }
        });
    }

    let dispatcher: Arc<PersistentDispatcher> =
        Arc::new(CommandDispatcher::new(store.clone(), bus.clone()));
    AppServices::Persistent {
        dispatcher,
        event_store: store,
        event_bus: bus,
        products_projection,
        categories_projection,
        suppliers_projection,
        stock_projection,
        movements_projection,
        purchases_projection,
        advice_sink,
        realtime_tx,
    }
}

impl AppServices {
    pub fn realtime_tx(&self) -> &broadcast::Sender<RealtimeMessage> {
        match self {
            AppServices::InMemory { realtime_tx, .. } => realtime_tx,
            AppServices::Persistent { realtime_tx, .. } => realtime_tx,
        }
    }

    pub fn advice_sink(&self) -> &Arc<ApiAdviceSink> {
        match self {
            AppServices::InMemory { advice_sink, .. } => advice_sink,
            AppServices::Persistent { advice_sink, .. } => advice_sink,
        }
    }

    pub fn dispatch<A>(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        command: A::Command,
        make_aggregate: impl FnOnce(TenantId, AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: stockpilot_core::Aggregate<Error = DomainError>,
        A::Event: stockpilot_events::Event + serde::Serialize + serde::de::DeserializeOwned,
    {
        match self {
            AppServices::InMemory { dispatcher, .. } => dispatcher.dispatch::<A>(
                tenant_id,
                aggregate_id,
                aggregate_type,
                command,
                make_aggregate,
            ),
            AppServices::Persistent { dispatcher, .. } => dispatcher.dispatch::<A>(
                tenant_id,
                aggregate_id,
                aggregate_type,
                command,
                make_aggregate,
            ),
        }
    }

    pub fn products_get(
        &self,
        tenant_id: TenantId,
        product_id: &stockpilot_catalog::ProductId,
    ) -> Option<ProductReadModel> {
        match self {
            AppServices::InMemory { products_projection, .. } => products_projection.get(tenant_id, product_id),
            AppServices::Persistent { products_projection, .. } => products_projection.get(tenant_id, product_id),
        }
    }

    pub fn products_list(&self, tenant_id: TenantId) -> Vec<ProductReadModel> {
        match self {
            AppServices::InMemory { products_projection, .. } => products_projection.list(tenant_id),
            AppServices::Persistent { products_projection, .. } => products_projection.list(tenant_id),
        }
    }

    pub fn categories_get(
        &self,
        tenant_id: TenantId,
        category_id: &stockpilot_catalog::CategoryId,
    ) -> Option<CategoryReadModel> {
        match self {
            AppServices::InMemory { categories_projection, .. } => categories_projection.get(tenant_id, category_id),
            AppServices::Persistent { categories_projection, .. } => categories_projection.get(tenant_id, category_id),
        }
    }

    pub fn categories_list(&self, tenant_id: TenantId) -> Vec<CategoryReadModel> {
        match self {
            AppServices::InMemory { categories_projection, .. } => categories_projection.list(tenant_id),
            AppServices::Persistent { categories_projection, .. } => categories_projection.list(tenant_id),
        }
    }

    pub fn suppliers_get(
        &self,
        tenant_id: TenantId,
        supplier_id: &stockpilot_suppliers::SupplierId,
    ) -> Option<SupplierReadModel> {
        match self {
            AppServices::InMemory { suppliers_projection, .. } => suppliers_projection.get(tenant_id, supplier_id),
            AppServices::Persistent { suppliers_projection, .. } => suppliers_projection.get(tenant_id, supplier_id),
        }
    }

    pub fn suppliers_list(&self, tenant_id: TenantId) -> Vec<SupplierReadModel> {
        match self {
            AppServices::InMemory { suppliers_projection, .. } => suppliers_projection.list(tenant_id),
            AppServices::Persistent { suppliers_projection, .. } => suppliers_projection.list(tenant_id),
        }
    }

    pub fn stock_get(
        &self,
        tenant_id: TenantId,
        item_id: &stockpilot_inventory::StockItemId,
    ) -> Option<StockItemReadModel> {
        match self {
            AppServices::InMemory { stock_projection, .. } => stock_projection.get(tenant_id, item_id),
            AppServices::Persistent { stock_projection, .. } => stock_projection.get(tenant_id, item_id),
        }
    }

    pub fn stock_list(&self, tenant_id: TenantId) -> Vec<StockItemReadModel> {
        match self {
            AppServices::InMemory { stock_projection, .. } => stock_projection.list(tenant_id),
            AppServices::Persistent { stock_projection, .. } => stock_projection.list(tenant_id),
        }
    }

    pub fn movements_for_item(
        &self,
        tenant_id: TenantId,
        item_id: &stockpilot_inventory::StockItemId,
    ) -> Vec<MovementRecord> {
        match self {
            AppServices::InMemory { movements_projection, .. } => movements_projection.for_item(tenant_id, item_id),
            AppServices::Persistent { movements_projection, .. } => movements_projection.for_item(tenant_id, item_id),
        }
    }

    pub fn movements_list(&self, tenant_id: TenantId) -> Vec<MovementRecord> {
        match self {
            AppServices::InMemory { movements_projection, .. } => movements_projection.list(tenant_id),
            AppServices::Persistent { movements_projection, .. } => movements_projection.list(tenant_id),
        }
    }

    pub fn purchases_get(
        &self,
        tenant_id: TenantId,
        order_id: &stockpilot_purchasing::PurchaseOrderId,
    ) -> Option<PurchaseOrderReadModel> {
        match self {
            AppServices::InMemory { purchases_projection, .. } => purchases_projection.get(tenant_id, order_id),
            AppServices::Persistent { purchases_projection, .. } => purchases_projection.get(tenant_id, order_id),
        }
    }

    pub fn purchases_list(&self, tenant_id: TenantId) -> Vec<PurchaseOrderReadModel> {
        match self {
            AppServices::InMemory { purchases_projection, .. } => purchases_projection.list(tenant_id),
            AppServices::Persistent { purchases_projection, .. } => purchases_projection.list(tenant_id),
        }
    }

    /// Query events with filters and pagination.
    pub async fn query_events(
        &self,
        tenant_id: TenantId,
        filter: EventFilter,
        pagination: Pagination,
    ) -> Result<EventQueryResult, stockpilot_infra::event_store::EventStoreError> {
        match self {
            AppServices::InMemory { event_store, .. } => {
                event_store.query_events(tenant_id, filter, pagination).await
            }
            AppServices::Persistent { event_store, .. } => {
                event_store.query_events(tenant_id, filter, pagination).await
            }
        }
    }

    /// Get events for a specific aggregate.
    pub async fn get_aggregate_events(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        pagination: Option<Pagination>,
    ) -> Result<EventQueryResult, stockpilot_infra::event_store::EventStoreError> {
        match self {
            AppServices::InMemory { event_store, .. } => {
                event_store.get_aggregate_events(tenant_id, aggregate_id, pagination).await
            }
            AppServices::Persistent { event_store, .. } => {
                event_store.get_aggregate_events(tenant_id, aggregate_id, pagination).await
            }
        }
    }

    /// Get a single event by its ID.
    pub async fn get_event_by_id(
        &self,
        tenant_id: TenantId,
        event_id: uuid::Uuid,
    ) -> Result<Option<StoredEvent>, stockpilot_infra::event_store::EventStoreError> {
        match self {
            AppServices::InMemory { event_store, .. } => {
                event_store.get_event_by_id(tenant_id, event_id).await
            }
            AppServices::Persistent { event_store, .. } => {
                event_store.get_event_by_id(tenant_id, event_id).await
            }
        }
    }
}

/// Build an SSE stream for a tenant (used by `/stream`).
pub fn tenant_sse_stream(
    services: Arc<AppServices>,
    tenant_id: TenantId,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |msg| match msg {
        Ok(m) if m.tenant_id == tenant_id => {
            let data = serde_json::to_string(&m.payload).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event(m.topic).data(data)))
        }
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
