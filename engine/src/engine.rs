use crate::destinations::DestinationStore;
use crate::file::{FileSink, FileSource};
use crate::manager::SyncManager;
use crate::orchestrator::SyncOrchestrator;
use crate::poller::{Poller, PollTarget, DEFAULT_CRM_POLL_INTERVAL, DEFAULT_POLL_INTERVAL};
use crate::postgres::PostgresSource;
use crate::sqlite::{SqliteSink, SqliteSource};
use rs_core::{Config, CrmRegistry, RulesEngine, Sink, Source, Topology};
use error::SyncError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use threading::{QueueManager, SlidingWindowRateLimiter, StatusTracker};
use tokio::task::JoinSet;
use tracing::{info, warn};
use util::Context;
use value::Record;

const DEFAULT_RATE_LIMIT_PER_MINUTE: usize = 120;
const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Where to find each source/sink destination already built by
/// `Engine::start`, so the command surface and pollers share one set of
/// live adapters rather than re-parsing topology per request.
pub struct Engine {
    pub registry: Arc<CrmRegistry>,
    pub rules: Arc<RulesEngine>,
    pub queue: Arc<QueueManager>,
    pub status: Arc<StatusTracker>,
    pub destinations: Arc<DestinationStore>,
    pub sync_manager: Arc<SyncManager>,
    sources: HashMap<String, Arc<dyn Source>>,
    sinks: HashMap<String, Arc<dyn Sink>>,
    pollers: HashMap<String, Arc<Poller>>,
    ctx: Context,
    joins: Mutex<JoinSet<()>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}

impl Engine {
    /// Loads config/topology/rules from disk, builds every topology
    /// entry's adapter, spawns one poller task per (source, sink) pair
    /// declared via a source entry's `sinks` field, and returns the
    /// ready-to-serve engine (§4.11).
    pub async fn start(config_path: impl AsRef<Path>, topology_path: impl AsRef<Path>, rules_path: impl AsRef<Path>) -> Result<Arc<Engine>, SyncError> {
        let config = Config::load(&config_path)?;
        let topology = Topology::load(&topology_path)?;
        let rules = Arc::new(RulesEngine::load(rules_path.as_ref().to_path_buf())?);

        let registry = Arc::new(CrmRegistry::new());
        crate::crm::register_builtin_adapters(&registry);

        let rate_limiter = Arc::new(SlidingWindowRateLimiter::new(DEFAULT_RATE_LIMIT_PER_MINUTE, RATE_LIMIT_WINDOW));
        let queue = Arc::new(QueueManager::new(rate_limiter));
        let status = Arc::new(StatusTracker::new());

        let destinations_path: PathBuf = rules_path.as_ref().with_file_name("destinations.json");
        let destinations = Arc::new(DestinationStore::new(registry.clone(), destinations_path));

        let mut sources: HashMap<String, Arc<dyn Source>> = HashMap::new();
        let mut sinks: HashMap<String, Arc<dyn Sink>> = HashMap::new();
        let mut poll_plan: Vec<(String, String)> = Vec::new();

        for (name, entry) in topology.entries() {
            let section = config.section(name).cloned().unwrap_or_default();

            match entry.type_.as_str() {
                "file_source" => {
                    let path = required_str(&entry.fields, "path", name)?;
                    sources.insert(name.clone(), Arc::new(FileSource::new(path)));
                }
                "file_sink" => {
                    let path = required_str(&entry.fields, "path", name)?;
                    sinks.insert(name.clone(), Arc::new(FileSink::new(path)));
                }
                "sqlite_source" => {
                    let path = required_str(&entry.fields, "path", name)?;
                    let table = required_str(&entry.fields, "table", name)?;
                    sources.insert(name.clone(), Arc::new(SqliteSource::open(&path, table)?));
                }
                "sqlite_sink" => {
                    let path = required_str(&entry.fields, "path", name)?;
                    let table = required_str(&entry.fields, "table", name)?;
                    sinks.insert(name.clone(), Arc::new(SqliteSink::open(&path, table)?));
                }
                "postgres_source" => {
                    let conninfo = required_str(&entry.fields, "conninfo", name)?;
                    let table = required_str(&entry.fields, "table", name)?;
                    sources.insert(name.clone(), Arc::new(PostgresSource::connect(&conninfo, table).await?));
                }
                crm_type if registry.schema(crm_type).is_some() => {
                    destinations.register(name, crm_type, section)?;
                }
                other => {
                    return Err(SyncError::config(format!("topology entry '{name}' has unknown type '{other}'")));
                }
            }

            if let Some(sink_names) = entry.fields.get("sinks").and_then(|v| v.as_array()) {
                for sink_name in sink_names {
                    if let Some(sink_name) = sink_name.as_str() {
                        poll_plan.push((name.clone(), sink_name.to_string()));
                    }
                }
            }
        }

        let ctx = Context::new();
        let sync_manager = Arc::new(SyncManager::new(destinations.clone(), rules.clone(), queue.clone(), status.clone()));

        let mut pollers = HashMap::new();
        for (source_name, sink_name) in poll_plan {
            let Some(source) = sources.get(&source_name).cloned() else {
                warn!(source = %source_name, "poll plan references unknown source, skipping");
                continue;
            };

            let (target, interval) = if let Some(sink) = sinks.get(&sink_name).cloned() {
                (PollTarget::Sink(sink), DEFAULT_POLL_INTERVAL)
            } else if let Some(crm) = destinations.get(&sink_name) {
                (PollTarget::Crm(crm), DEFAULT_CRM_POLL_INTERVAL)
            } else {
                warn!(sink = %sink_name, "poll plan references unknown sink, skipping");
                continue;
            };

            let poller = Arc::new(Poller::new(
                format!("{source_name}->{sink_name}"),
                source,
                target,
                rules.clone(),
                status.clone(),
                interval,
                ctx.child(),
            ));
            pollers.insert(sink_name, poller);
        }

        let engine = Arc::new(Engine {
            registry,
            rules,
            queue,
            status,
            destinations,
            sync_manager,
            sources,
            sinks,
            pollers,
            ctx,
            joins: Mutex::new(JoinSet::new()),
        });

        engine.spawn_pollers();
        Ok(engine)
    }

    fn spawn_pollers(self: &Arc<Self>) {
        let mut joins = self.joins.lock();
        for poller in self.pollers.values() {
            joins.spawn(poller.clone().run());
        }
    }

    /// Cancels every poller task and waits for them to observe shutdown
    /// at their next interval boundary (§4.11, §5).
    pub async fn shutdown(&self) {
        self.ctx.shutdown();
        let mut joins = {
            let mut guard = self.joins.lock();
            std::mem::take(&mut *guard)
        };
        while joins.join_next().await.is_some() {}
    }

    pub fn enqueue_sync(&self, dest: &str, record: Record) -> Result<(), SyncError> {
        self.sync_manager.enqueue_sync(dest, record)
    }

    pub async fn try_flush(&self, dest: &str) -> Result<usize, SyncError> {
        self.sync_manager.try_flush(dest).await
    }

    /// §6 `POST /retry/:record_id`: resubmits a record that previously
    /// failed a CRM flush through the normal admission path. Records that
    /// never failed (or whose failure was already retried) are a config
    /// error, mirroring the "no such record" case other lookups surface.
    pub fn retry_record(&self, record_id: &str) -> Result<(), SyncError> {
        let (dest, record) = self
            .status
            .take_failed(record_id)
            .ok_or_else(|| SyncError::config(format!("no retryable failure recorded for '{record_id}'")))?;
        info!(record_id, dest, "retrying previously failed record");
        self.sync_manager.enqueue_sync(&dest, record)
    }

    /// Triggers one poll iteration of the poller feeding the named
    /// destination outside its normal interval (§6 `POST /poll/:name`).
    pub async fn poll_once(&self, destination: &str) -> Result<(), SyncError> {
        let poller = self
            .pollers
            .get(destination)
            .ok_or_else(|| SyncError::config(format!("no poller feeds destination '{destination}'")))?;
        info!(destination, "manual poll triggered");
        poller.run_once().await
    }

    /// §6 `POST /sync-all`: a one-shot bulk copy between exactly one
    /// source and one sink. The verb takes no selection parameter, so an
    /// ambiguous topology (more than one source or sink configured) is a
    /// config error rather than an arbitrary pick -- mirroring the
    /// original loader's explicit single `system_a`/`system_b` pairing.
    pub async fn sync_all(&self, allow_duplicates: bool) -> Result<usize, SyncError> {
        let source = self.only_source()?;
        let sink = self.only_sink()?;
        SyncOrchestrator::new(source, sink).sync_all(allow_duplicates).await
    }

    fn only_source(&self) -> Result<Arc<dyn Source>, SyncError> {
        match self.sources.len() {
            0 => Err(SyncError::config("no source configured")),
            1 => Ok(self.sources.values().next().cloned().unwrap()),
            n => Err(SyncError::config(format!("sync-all requires exactly one source, found {n}"))),
        }
    }

    fn only_sink(&self) -> Result<Arc<dyn Sink>, SyncError> {
        match self.sinks.len() {
            0 => Err(SyncError::config("no sink configured")),
            1 => Ok(self.sinks.values().next().cloned().unwrap()),
            n => Err(SyncError::config(format!("sync-all requires exactly one sink, found {n}"))),
        }
    }

    pub fn destination_names(&self) -> Vec<String> {
        self.destinations.names()
    }
}

fn required_str(fields: &serde_json::Map<String, serde_json::Value>, key: &str, topology_name: &str) -> Result<String, SyncError> {
    fields
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| SyncError::config(format!("topology entry '{topology_name}' is missing field '{key}'")))
}
