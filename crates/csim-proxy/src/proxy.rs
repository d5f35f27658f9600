//! # Proxy lifecycle
//!
//! `Proxy::create` wires the observer registry, the base processor, the
//! domain processors and their caches, the versions registry and the HTTP
//! router. `start` binds the listener; `close` stops every background loop
//! and drains the server.
//!
//! `create` spawns background loops and must run inside a Tokio runtime.

use crate::api::build_router;
use crate::domain::{LifecycleError, ProxyConfig};
use crate::facade::{ProxyFacade, ProxyFacadeArgs, SimulatorFacade};
use crate::lifecycle::ClosableComponentsHandler;
use crate::middleware::{MiddlewareStack, StatusMetrics};
use crate::observer::ObserverRegistry;
use crate::ports::{AddressConverter, ObserverClient, SimulatorHandler};
use crate::process::{
    AboutProcessor, AccountProcessor, BaseProcessor, BlockProcessor, EsdtSupplyProcessor,
    FaucetProcessor, NodeGroupProcessor, NodeStatusProcessor, ProofProcessor, ScQueryProcessor,
    StatusProcessor, TransactionProcessor, ValidatorStatisticsProcessor,
};
use crate::versions::VersionsRegistry;
use axum::Router;
use csim_sharding::ShardCoordinator;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// How long `close` waits for in-flight requests
pub const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Everything the proxy needs from the outside world
pub struct ProxyArgs {
    pub config: ProxyConfig,
    pub coordinator: ShardCoordinator,
    pub client: Arc<dyn ObserverClient>,
    pub converter: Arc<dyn AddressConverter>,
    pub simulator: Arc<dyn SimulatorHandler>,
}

struct RunningServer {
    addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<std::io::Result<()>>,
}

/// Chain simulator proxy
pub struct Proxy {
    config: ProxyConfig,
    router: Router,
    base: Arc<BaseProcessor>,
    facade: Arc<ProxyFacade>,
    simulator: Arc<SimulatorFacade>,
    metrics: Arc<StatusMetrics>,
    // the rate limiter is only reachable through the router otherwise
    _middleware: MiddlewareStack,
    closables: ClosableComponentsHandler,
    server: Mutex<Option<RunningServer>>,
}

impl Proxy {
    /// Build every component and start the background loops
    pub fn create(args: ProxyArgs) -> Result<Self, LifecycleError> {
        let ProxyArgs {
            config,
            coordinator,
            client,
            converter,
            simulator,
        } = args;

        config.validate()?;
        let settings = &config.general_settings;

        let registry = Arc::new(ObserverRegistry::new(
            &coordinator,
            &config.observers,
            &config.full_history_nodes,
        )?);

        let base = Arc::new(BaseProcessor::new(
            coordinator,
            registry,
            client,
            converter,
            settings.request_timeout(),
        ));
        base.start_nodes_sync_state_checks(settings.node_sync_check_interval());

        let middleware = MiddlewareStack::from_config(&config);
        middleware.rate_limit.start_cleanup_loop();

        let account = Arc::new(AccountProcessor::new(Arc::clone(&base)));
        let node_group = Arc::new(NodeGroupProcessor::new(
            Arc::clone(&base),
            settings.heartbeat_cache_validity(),
        ));
        let validator_stats = Arc::new(ValidatorStatisticsProcessor::new(
            Arc::clone(&base),
            settings.val_stats_cache_validity(),
        ));
        let node_status = Arc::new(NodeStatusProcessor::new(
            Arc::clone(&base),
            settings.economics_metrics_cache_validity(),
        ));
        let sc_query = Arc::new(ScQueryProcessor::new(Arc::clone(&base)));

        if config.features.heartbeat_cache_refresh {
            node_group.cache().start_refresh_loop();
        }
        validator_stats.cache().start_refresh_loop();
        node_status.cache().start_refresh_loop();

        let closables = ClosableComponentsHandler::new();
        closables.add(node_group.cache());
        closables.add(validator_stats.cache());
        closables.add(node_status.cache());
        closables.add(&middleware.rate_limit);
        closables.add(&base);

        let facade = Arc::new(ProxyFacade::new(ProxyFacadeArgs {
            account: Arc::clone(&account),
            transaction: Arc::new(TransactionProcessor::new(
                Arc::clone(&base),
                settings.allow_entire_tx_pool_fetch,
            )),
            block: Arc::new(BlockProcessor::new(Arc::clone(&base))),
            node_group,
            validator_stats: Arc::clone(&validator_stats),
            node_status,
            proof: Arc::new(ProofProcessor::new(Arc::clone(&base))),
            sc_query: Arc::clone(&sc_query),
            esdt_supply: Arc::new(EsdtSupplyProcessor::new(Arc::clone(&base), sc_query)),
            status: Arc::new(StatusProcessor::new(middleware.metrics())),
            about: Arc::new(AboutProcessor::new(Arc::clone(&base))),
            faucet: Arc::new(FaucetProcessor::new(
                account,
                Arc::clone(&simulator),
                &config.features,
            )),
        }));

        let versions =
            VersionsRegistry::from_config(&config.api_versions, |_| Arc::clone(&facade))?;
        let simulator = Arc::new(SimulatorFacade::new(simulator, validator_stats));
        let router = build_router(&versions, Arc::clone(&simulator), &middleware, &config.cors);

        info!(
            versions = ?versions.get_all_versions().map(|(name, _)| name).collect::<Vec<_>>(),
            default_version = versions.default_version(),
            closables = closables.len(),
            "Proxy created"
        );

        Ok(Self {
            metrics: middleware.metrics(),
            config,
            router,
            base,
            facade,
            simulator,
            _middleware: middleware,
            closables,
            server: Mutex::new(None),
        })
    }

    /// Bind the listener and serve in the background
    pub async fn start(&self) -> Result<SocketAddr, LifecycleError> {
        if let Some(running) = self.server.lock().as_ref() {
            return Err(LifecycleError::AlreadyStarted(running.addr));
        }

        let requested = self.config.server_addr();
        let listener = TcpListener::bind(requested)
            .await
            .map_err(|source| LifecycleError::Bind {
                addr: requested,
                source,
            })?;
        let addr = listener.local_addr().map_err(|source| LifecycleError::Bind {
            addr: requested,
            source,
        })?;

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let service = self
            .router
            .clone()
            .into_make_service_with_connect_info::<SocketAddr>();
        let task = tokio::spawn(async move {
            axum::serve(listener, service)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.wait_for(|stop| *stop).await;
                })
                .await
        });

        let mut server = self.server.lock();
        if let Some(running) = server.as_ref() {
            task.abort();
            return Err(LifecycleError::AlreadyStarted(running.addr));
        }
        *server = Some(RunningServer {
            addr,
            shutdown_tx,
            task,
        });

        info!(addr = %addr, "HTTP server started");
        Ok(addr)
    }

    /// Stop background loops and drain the server.
    ///
    /// Idempotent. Returns the number of components that failed to close.
    pub async fn close(&self) -> usize {
        let failures = self.closables.close();

        let running = self.server.lock().take();
        let Some(running) = running else {
            return failures;
        };

        running.shutdown_tx.send_replace(true);
        let mut task = running.task;
        match tokio::time::timeout(SHUTDOWN_DRAIN_TIMEOUT, &mut task).await {
            Ok(Ok(Ok(()))) => info!(addr = %running.addr, "HTTP server stopped"),
            Ok(Ok(Err(e))) => error!(error = %e, "HTTP server exited with error"),
            Ok(Err(e)) => error!(error = %e, "HTTP server task failed"),
            Err(_) => {
                warn!(
                    timeout_ms = SHUTDOWN_DRAIN_TIMEOUT.as_millis() as u64,
                    "HTTP server did not drain in time, aborting"
                );
                task.abort();
            }
        }
        failures
    }

    /// Address of the running server
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.lock().as_ref().map(|running| running.addr)
    }

    pub fn is_closed(&self) -> bool {
        self.closables.is_closed()
    }

    /// The application router, for in-process requests
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn facade(&self) -> &Arc<ProxyFacade> {
        &self.facade
    }

    pub fn simulator_facade(&self) -> &Arc<SimulatorFacade> {
        &self.simulator
    }

    pub fn base_processor(&self) -> &Arc<BaseProcessor> {
        &self.base
    }

    pub fn metrics(&self) -> &Arc<StatusMetrics> {
        &self.metrics
    }
}
