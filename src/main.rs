//! Barbershop Cache - demo driver
//!
//! Runs the cache layer against a simulated booking backend: walks the
//! appointments list through a `Paginator`, loads the shop profile through a
//! `DataLoader`, shows invalidation, then keeps the TTL sweep running until
//! shutdown.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use barbershop_cache::{
    spawn_cleanup_task, CacheManager, Config, DataLoader, DataOptions, PaginatedResponse,
    PaginationCache, PaginationOptions, PaginationParams, Paginator, SortOrder,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Appointment {
    id: u64,
    client: String,
    service: String,
    starts_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ShopProfile {
    name: String,
    barbers: u32,
    rating: f32,
}

/// In-memory stand-in for the booking API.
#[derive(Clone)]
struct Backend {
    appointments: Arc<Vec<Appointment>>,
    requests: Arc<AtomicUsize>,
}

impl Backend {
    fn seeded(count: u64) -> Self {
        let services = ["Haircut", "Beard trim", "Hot towel shave"];
        let appointments = (1..=count)
            .map(|id| Appointment {
                id,
                client: format!("client-{id}"),
                service: services[(id as usize) % services.len()].to_string(),
                starts_at: format!("2026-10-{:02}T{:02}:00:00Z", 1 + id % 28, 9 + id % 9),
            })
            .collect();
        Self {
            appointments: Arc::new(appointments),
            requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    async fn list_appointments(
        &self,
        params: PaginationParams,
    ) -> anyhow::Result<PaginatedResponse<Appointment>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mut rows = self.appointments.as_ref().clone();
        if params.sort_by.as_deref() == Some("startsAt") {
            rows.sort_by(|a, b| a.starts_at.cmp(&b.starts_at));
        }
        if params.sort_order == SortOrder::Desc {
            rows.reverse();
        }

        let total = rows.len() as u64;
        let data = rows
            .into_iter()
            .skip(params.offset() as usize)
            .take(params.limit as usize)
            .collect();
        Ok(PaginatedResponse::new(data, params.page, params.limit, total))
    }

    async fn shop_profile(&self) -> anyhow::Result<ShopProfile> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(ShopProfile {
            name: "Barbearia Central".to_string(),
            barbers: 4,
            rating: 4.8,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "barbershop_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Barbershop Cache demo");

    let config = Config::from_env();
    info!(
        "Configuration loaded: default_ttl={}s, pagination_ttl={}s, cleanup_interval={}s, default_page_limit={}",
        config.default_ttl, config.pagination_ttl, config.cleanup_interval, config.default_page_limit
    );

    let cache = CacheManager::from_config(&config);
    let pages = PaginationCache::from_config(cache.clone(), &config);
    let sweep = spawn_cleanup_task(cache.clone(), config.cleanup_interval());
    info!("Cache initialized, TTL sweep running");

    let backend = Backend::seeded(23);
    run_walkthrough(&config, &cache, &pages, &backend).await?;

    info!("Demo finished; press Ctrl+C to exit");
    shutdown_signal(sweep).await;
    info!("Shutdown complete");
    Ok(())
}

async fn run_walkthrough(
    config: &Config,
    cache: &CacheManager,
    pages: &PaginationCache,
    backend: &Backend,
) -> anyhow::Result<()> {
    // == Paginated list ==
    let api = backend.clone();
    let paginator = Paginator::new(
        pages.clone(),
        "/appointments",
        move |params| {
            let api = api.clone();
            async move { api.list_appointments(params).await }
        },
        PaginationOptions::from_config(config).with_sort("startsAt", SortOrder::Asc),
    );

    let mut state = paginator.settled().await;
    info!(
        "{} page {}/{}: {} appointments (total {})",
        paginator.endpoint(),
        state.page,
        state.pages,
        state.data.len(),
        state.total
    );
    while state.has_next_page {
        paginator.next_page();
        state = paginator.settled().await;
        info!("Page {}/{}: {} appointments", state.page, state.pages, state.data.len());
    }

    // Revisiting a page is served from cache
    paginator.go_to_page(1);
    paginator.settled().await;
    info!(
        "Backend requests after walking every page twice: {}",
        backend.requests.load(Ordering::SeqCst)
    );

    // == Single value ==
    let api = backend.clone();
    let profile = DataLoader::new(
        cache.clone(),
        move || {
            let api = api.clone();
            async move { api.shop_profile().await }
        },
        DataOptions::new("shop:profile").with_tag("shop"),
    );
    if let Some(shop) = profile.settled().await.data {
        info!(
            "{}: {} ({} barbers, rated {})",
            profile.key(),
            shop.name,
            shop.barbers,
            shop.rating
        );
    }

    // == Invalidation ==
    let removed = pages.invalidate_endpoint(paginator.endpoint()).await;
    info!("A new booking invalidated {} cached pages", removed);
    paginator.refetch();
    paginator.settled().await;

    let snapshot = cache.debug().await;
    info!("Cache snapshot:\n{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then stops the sweep.
async fn shutdown_signal(sweep: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    sweep.abort();
    warn!("TTL sweep aborted");
}
