//! CLI dispatch: wires the parsed [`Cli`] onto the control-plane crates
//! this workspace builds, the way `aerolithdb-cli::commands` dispatches
//! onto `aerolithdb-core`. No cloud SDK client exists in this build
//! (spec.md §1 scopes cloud/scheduler clients out as external
//! collaborators reachable only through the narrow traits they implement);
//! every subcommand below that needs live cluster state runs against the
//! in-memory simulator in [`sim`] instead of a real AWS/Mesos/Kubernetes
//! backend. A production deployment swaps the simulator's three small
//! trait impls for real ones without touching anything above this crate.

pub mod cli;
pub mod config;
pub mod error;
pub mod resource_groups;
pub mod sim;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use clusterman_autoscaler::autoscaler::{Autoscaler, AutoscalerConfig};
use clusterman_autoscaler::signal_adapter::BuiltinTickSignal;
use clusterman_autoscaler::status::TracingMonitoringSink;
use clusterman_connector::migration_crd::{MigrationCrdStore, NodeMigrationSpec};
use clusterman_core::migration::{ConditionOperator, ConditionTrait, MigrationCondition, MigrationStatus};
use clusterman_core::lock::PoolLockRegistry;
use clusterman_draining::{DrainingClient, DrainingConfig, InMemoryDrainQueueStore};
use clusterman_kv::pause::{disable_autoscaling, enable_autoscaling, is_paused};
use clusterman_kv::store::InMemoryKvStore;
use clusterman_migration::settings::MIN_PORTION;
use clusterman_migration::worker::{MigrationWorker, UPTIME_CHECK_INTERVAL};
use clusterman_pool::manager::{PoolManager, ScalingLimits};
use clusterman_signal::pending_pods::PendingPodsSignal;
use clusterman_signal::registry::BuiltinSignal;

use crate::cli::{Cli, Commands};
use crate::config::PoolConfig;
use crate::error::{CliError, ConfigError};
use crate::resource_groups::{build_resource_groups, build_resource_groups_seeded};
use crate::sim::{
    seed_pool, InMemoryMigrationCrdStore, SimulatedClusterConnector, SimulatedDrainAction, SimulatedInstanceCatalog,
    SimulatedTerminator,
};

const DEMO_AVAILABILITY_ZONES: [&str; 2] = ["us-west-2a", "us-west-2b"];

/// Runs the parsed command to completion and returns the process exit
/// code: 0 on success, 2 on a validation/operational error per spec.md
/// §6.5. Exit code `1` ("no subcommand given") can't occur through this
/// function: `clap`'s derive makes `Commands` a required field, so
/// argument parsing itself fails first, before `run` is ever called.
pub async fn run(cli: Cli) -> i32 {
    match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            err.exit_code()
        }
    }
}

fn scaling_limits_from(config: &config::ScalingLimitsConfig) -> ScalingLimits {
    ScalingLimits {
        min_capacity: config.min_capacity,
        max_capacity: config.max_capacity,
        max_weight_to_add: config.max_weight_to_add,
        max_weight_to_remove: config.max_weight_to_remove,
        max_tasks_to_kill: config.max_tasks_to_kill,
    }
}

/// Resolves a pool's configured signal to something the autoscaler can
/// drive. This build has no subprocess launcher for an external signal
/// binary (spec.md §4.3's framed-socket protocol still lives in
/// `clusterman-signal::subprocess` for a deployment that does), so an
/// unrecognized `name` falls back to the default pending-pods signal, the
/// same recovery path `NoSignalConfiguredError` takes in spec.md §7.
fn resolve_signal(config: &config::AutoscaleSignalConfig) -> BuiltinTickSignal {
    match BuiltinSignal::by_name(&config.name, &config.parameters) {
        Some(signal) => BuiltinTickSignal(signal),
        None => {
            tracing::warn!(signal = %config.name, "signal not recognized by this build, falling back to PendingPodsSignal");
            BuiltinTickSignal(BuiltinSignal::PendingPods(PendingPodsSignal::from_parameters(&config.parameters)))
        }
    }
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Manage { cluster, pool, scheduler: _, target_capacity, dry_run } => {
            let config = PoolConfig::load(&cli.config, &pool)?;
            let mut pool_manager = PoolManager::new(cluster, pool, scaling_limits_from(&config.scaling_limits));
            pool_manager.resource_groups = build_resource_groups(&config);
            let connector = SimulatedClusterConnector::new();
            let catalog = SimulatedInstanceCatalog::new();
            let now = Utc::now();
            let (applied, decision) =
                pool_manager.modify_target_capacity(target_capacity, dry_run, false, &catalog, &connector, now).await?;

            // `manage` is a one-shot invocation with no long-lived drain
            // queue of its own (that's `run-drainer`'s job against the
            // shared store); log what it marked so an operator running
            // both against the same backing store can see the handoff.
            for instance_ids in decision.enqueue_for_draining.values() {
                for instance_id in instance_ids {
                    tracing::info!(instance_id = %instance_id, "marked for cooperative draining by run-drainer");
                }
            }
            println!("target capacity set to {applied} (dry_run={dry_run})");
            Ok(())
        }

        Commands::Status { cluster, pool, scheduler } => {
            let config = PoolConfig::load(&cli.config, &pool)?;
            let mut pool_manager = PoolManager::new(cluster.clone(), pool.clone(), scaling_limits_from(&config.scaling_limits));
            pool_manager.resource_groups = build_resource_groups(&config);

            let kv = InMemoryKvStore::new();
            let paused = is_paused(&kv, &cluster, &pool, &scheduler, Utc::now()).await?;

            let target = pool_manager.target_capacity().unwrap_or(0.0);
            println!("cluster={cluster} pool={pool} scheduler={scheduler}");
            println!("paused={paused} target_capacity={target} fulfilled_capacity={}", pool_manager.fulfilled_capacity());
            for (group_id, group) in &pool_manager.resource_groups {
                println!(
                    "  group={group_id} status={:?} target={} fulfilled={} stale={}",
                    group.status(),
                    group.target_capacity(),
                    group.fulfilled_capacity(),
                    group.is_stale()
                );
            }
            Ok(())
        }

        Commands::Disable { cluster, pool, scheduler, until } => {
            let expires_at = parse_until(&until)?;
            let kv = InMemoryKvStore::new();
            disable_autoscaling(&kv, &cluster, &pool, &scheduler, expires_at).await?;
            println!("paused {cluster}.{pool}.{scheduler} until {expires_at}");
            Ok(())
        }

        Commands::Enable { cluster, pool, scheduler } => {
            let kv = InMemoryKvStore::new();
            enable_autoscaling(&kv, &cluster, &pool, &scheduler).await?;
            println!("resumed {cluster}.{pool}.{scheduler}");
            Ok(())
        }

        Commands::Migrate { cluster, pool, condition_trait, condition_operator, condition_target, label_selectors } => {
            let trait_ = ConditionTrait::parse(&condition_trait)
                .ok_or_else(|| CliError::Validation(format!("unrecognized condition trait {condition_trait:?}")))?;
            let operator = ConditionOperator::parse(&condition_operator)
                .ok_or_else(|| CliError::Validation(format!("unrecognized condition operator {condition_operator:?}")))?;
            if !ConditionOperator::supported_for(trait_).contains(&operator) {
                return Err(CliError::Config(ConfigError::InvalidConditionOperator { trait_, operator }));
            }

            let spec = NodeMigrationSpec {
                cluster,
                pool,
                label_selectors,
                condition: MigrationCondition { trait_, operator, target: condition_target },
            };
            let store = InMemoryMigrationCrdStore::new();
            let crd = store.create_node_migration_resource(spec, MigrationStatus::Pending).await?;
            println!("created {} ({:?})", crd.name, crd.labels);
            Ok(())
        }

        Commands::Simulate { cluster, pool, scheduler, agent_count, instance_type } => {
            let config = PoolConfig::load(&cli.config, &pool)?;
            let now = Utc::now();
            let mut connector = SimulatedClusterConnector::new();
            let catalog = SimulatedInstanceCatalog::new();

            let tags: Vec<String> = config.resource_groups.iter().map(|e| e.entry().tag.clone()).collect();
            let seed_ids = seed_pool(&mut connector, &catalog, "demo", agent_count, &instance_type, &DEMO_AVAILABILITY_ZONES, 1, now);
            let seed_by_tag = distribute_round_robin(&tags, seed_ids);

            let mut pool_manager = PoolManager::new(cluster.clone(), pool.clone(), scaling_limits_from(&config.scaling_limits));
            pool_manager.resource_groups = build_resource_groups_seeded(&config, seed_by_tag);

            let mut autoscaler = Autoscaler {
                config: AutoscalerConfig {
                    cluster,
                    pool,
                    scheduler,
                    app: "cli-simulate".to_string(),
                    setpoint: config.autoscaling.setpoint,
                    setpoint_margin: config.autoscaling.setpoint_margin,
                    target_capacity_margin: config.autoscaling.target_capacity_margin,
                },
                connector,
                pool_manager,
                signal: Box::new(resolve_signal(&config.autoscale_signal)),
                default_signal: PendingPodsSignal::default(),
                kv: InMemoryKvStore::new(),
                catalog: Box::new(catalog),
                monitoring: Box::new(TracingMonitoringSink),
                draining: Arc::new(DrainingClient::new(
                    "cli-autoscaler",
                    InMemoryDrainQueueStore::new(),
                    SimulatedDrainAction,
                    SimulatedTerminator,
                    DrainingConfig::default(),
                )),
            };

            let outcome = autoscaler.tick(now, true, false).await?;
            println!("{outcome:?}");
            Ok(())
        }

        Commands::GenerateData { agent_count, instance_type } => {
            let mut connector = SimulatedClusterConnector::new();
            let catalog = SimulatedInstanceCatalog::new();
            let now = Utc::now();
            let ids = seed_pool(&mut connector, &catalog, "demo", agent_count, &instance_type, &DEMO_AVAILABILITY_ZONES, 2, now);
            let instances = catalog.describe_instances(&ids).map_err(|e| CliError::Validation(e.to_string()))?;

            #[derive(Serialize)]
            struct Snapshot {
                generated_at: DateTime<Utc>,
                instances: Vec<clusterman_core::instance::Instance>,
            }
            let snapshot = Snapshot { generated_at: now, instances };
            println!("{}", serde_json::to_string_pretty(&snapshot).expect("snapshot types are all serde-derived"));
            Ok(())
        }

        Commands::RunAutoscaler { cluster, pool, scheduler, app, dry_run } => {
            let config = PoolConfig::load(&cli.config, &pool)?;
            let now = Utc::now();
            let mut connector = SimulatedClusterConnector::new();
            let catalog = SimulatedInstanceCatalog::new();
            let tags: Vec<String> = config.resource_groups.iter().map(|e| e.entry().tag.clone()).collect();
            let seed_ids = seed_pool(&mut connector, &catalog, "demo", 10, "m5.large", &DEMO_AVAILABILITY_ZONES, 1, now);
            let seed_by_tag = distribute_round_robin(&tags, seed_ids);

            let mut pool_manager = PoolManager::new(cluster.clone(), pool.clone(), scaling_limits_from(&config.scaling_limits));
            pool_manager.resource_groups = build_resource_groups_seeded(&config, seed_by_tag);

            let mut autoscaler = Autoscaler {
                config: AutoscalerConfig {
                    cluster,
                    pool,
                    scheduler,
                    app,
                    setpoint: config.autoscaling.setpoint,
                    setpoint_margin: config.autoscaling.setpoint_margin,
                    target_capacity_margin: config.autoscaling.target_capacity_margin,
                },
                connector,
                pool_manager,
                signal: Box::new(resolve_signal(&config.autoscale_signal)),
                default_signal: PendingPodsSignal::default(),
                kv: InMemoryKvStore::new(),
                catalog: Box::new(catalog),
                monitoring: Box::new(TracingMonitoringSink),
                draining: Arc::new(DrainingClient::new(
                    "cli-autoscaler",
                    InMemoryDrainQueueStore::new(),
                    SimulatedDrainAction,
                    SimulatedTerminator,
                    DrainingConfig::default(),
                )),
            };

            let period = std::time::Duration::from_secs(config.autoscale_signal.period_minutes as u64 * 60);
            loop {
                if let Err(err) = autoscaler.tick(Utc::now(), dry_run, false).await {
                    tracing::error!(%err, "autoscaler tick failed");
                }
                tokio::time::sleep(period).await;
            }
        }

        Commands::RunDrainer { cluster, pool } => {
            let client = Arc::new(DrainingClient::new(
                cluster,
                InMemoryDrainQueueStore::new(),
                SimulatedDrainAction,
                SimulatedTerminator,
                DrainingConfig::default(),
            ));
            client.run_forever(vec![pool]).await
        }

        Commands::RunMigrationWorker { cluster, pool, scheduler } => {
            let config = PoolConfig::load(&cli.config, &pool)?;
            let migration = config
                .node_migration
                .as_ref()
                .ok_or_else(|| CliError::Validation("pool has no node_migration config".to_string()))?;
            let max_uptime = migration
                .max_uptime()?
                .ok_or_else(|| CliError::Validation("node_migration.trigger.max_uptime not set".to_string()))?;
            let setup = migration.worker_setup()?;

            let mut connector = SimulatedClusterConnector::new();
            let catalog = SimulatedInstanceCatalog::new();
            let now = Utc::now();
            let tags: Vec<String> = config.resource_groups.iter().map(|e| e.entry().tag.clone()).collect();
            let seed_ids = seed_pool(&mut connector, &catalog, "demo", 10, "m5.large", &DEMO_AVAILABILITY_ZONES, 1, now);
            let seed_by_tag = distribute_round_robin(&tags, seed_ids);

            let mut pool_manager = PoolManager::new(cluster.clone(), pool.clone(), scaling_limits_from(&config.scaling_limits));
            pool_manager.resource_groups = build_resource_groups_seeded(&config, seed_by_tag);

            let mut worker = MigrationWorker {
                cluster,
                pool,
                scheduler,
                setup,
                precedence: migration.precedence_rules(),
                disable_autoscaling_during_migration: false,
                connector,
                pool_manager,
                catalog: Box::new(catalog),
                kv: InMemoryKvStore::new(),
                draining: Arc::new(DrainingClient::new(
                    "cli-migration-worker",
                    InMemoryDrainQueueStore::new(),
                    SimulatedDrainAction,
                    SimulatedTerminator,
                    DrainingConfig::default(),
                )),
                locks: PoolLockRegistry::new(),
            };

            loop {
                match worker.run_uptime_migration(max_uptime, Utc::now()).await {
                    Ok(status) => tracing::info!(?status, "uptime migration pass complete"),
                    Err(err) => tracing::error!(%err, "uptime migration pass failed"),
                }
                tokio::time::sleep(UPTIME_CHECK_INTERVAL).await;
            }
        }
    }
}

/// `--until` accepts either a duration from now (`"1h"`, `"90m"`) or an
/// RFC 3339 timestamp, per spec.md §6.5.
fn parse_until(raw: &str) -> Result<DateTime<Utc>, CliError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    humantime::parse_duration(raw)
        .map(|d| Utc::now() + chrono::Duration::from_std(d).unwrap_or_default())
        .map_err(|e| CliError::Validation(format!("--until {raw:?} is neither an RFC 3339 timestamp nor a duration: {e}")))
}

/// Splits `ids` evenly across `tags` in round-robin order. `MIN_PORTION`
/// isn't used here directly; it documents why an empty `tags` list (no
/// resource groups configured) is itself a config error caught earlier by
/// [`PoolConfig::validate`], not handled by silently dropping the seed.
fn distribute_round_robin(tags: &[String], ids: Vec<String>) -> BTreeMap<String, Vec<String>> {
    let mut by_tag: BTreeMap<String, Vec<String>> = tags.iter().map(|t| (t.clone(), Vec::new())).collect();
    if tags.is_empty() {
        return by_tag;
    }
    for (i, id) in ids.into_iter().enumerate() {
        let tag = &tags[i % tags.len()];
        by_tag.get_mut(tag).expect("tag was just inserted above").push(id);
    }
    let _ = MIN_PORTION;
    by_tag
}
