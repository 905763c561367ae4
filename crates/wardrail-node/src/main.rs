//! wardrail-node — the guarded payment execution engine's demo node.
//!
//! Startup sequence:
//!   1. Seed the in-memory registries (providers, payees) and stores
//!      (attempt ledger, caps gate, presentation log, revocation
//!      registry) that back one `Executor`.
//!   2. Wire provider adapters: `mock` is always available; `sandbox`
//!      (and `live`, if explicitly enabled) are wired only when OAuth
//!      credentials are supplied.
//!   3. Start the JSON-RPC 2.0 server fronting the executor.
//!
//! There is no P2P layer and no persistent state: every store here lives
//! only for the life of the process, which matches the single-process,
//! single-instance-per-process deployment the engine assumes.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use wardrail_consensus::{ApproverSet, PresentationLog, UsedArtifacts};
use wardrail_core::{
    CircleId, Clock, SystemClock, ViewSnapshot, DEFAULT_CAP_CENTS, DEFAULT_FORCED_PAUSE_SECS,
    DEFAULT_MAX_ATTEMPTS_PER_ENVELOPE, DEFAULT_PRESENTATION_EXPIRY_SECS,
    DEFAULT_REVOCATION_POLL_MS, DEFAULT_VIEW_MAX_STALENESS_SECS,
};
use wardrail_executor::{CollectingAuditSink, Config, Executor};
use wardrail_provider::{MockProvider, ProviderAdapter, SandboxProvider, SandboxProviderConfig};
use wardrail_revocation::{PayeeRegistry, ProviderRegistry, RevocationRegistry, ViewProvider};
use wardrail_rpc::{RpcServer, RpcServerState};
use wardrail_state::{AttemptLedger, CapsGate};

#[derive(Parser, Debug)]
#[command(
    name = "wardrail-node",
    version,
    about = "Guarded payment execution engine — demo node"
)]
struct Args {
    /// JSON-RPC listen address.
    #[arg(long, default_value = "127.0.0.1:8645")]
    rpc_addr: SocketAddr,

    /// Circle ids required to approve an envelope (comma-separated).
    #[arg(long, value_delimiter = ',', default_value = "circle-primary")]
    required_circles: Vec<String>,

    /// Number of required circles that must have a recorded, matching
    /// approval artifact before the multi-party gate passes.
    #[arg(long, default_value_t = 1)]
    approval_threshold: u32,

    /// Per-circle daily spend cap, in minor units.
    #[arg(long, default_value_t = DEFAULT_CAP_CENTS)]
    circle_daily_cap_minor: u64,

    /// Forced-pause duration before an execution may proceed to the provider, in seconds.
    #[arg(long, default_value_t = DEFAULT_FORCED_PAUSE_SECS)]
    forced_pause_secs: u64,

    /// Interval between revocation polls during the forced pause, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_REVOCATION_POLL_MS)]
    revocation_poll_ms: u64,

    /// Maximum attempts per envelope before the ledger refuses a new one.
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS_PER_ENVELOPE)]
    max_attempts_per_envelope: u32,

    /// Window during which a recorded presentation remains valid, in seconds.
    #[arg(long, default_value_t = DEFAULT_PRESENTATION_EXPIRY_SECS)]
    presentation_expiry_secs: u64,

    /// Maximum age of a bound view snapshot before it is considered stale, in seconds.
    #[arg(long, default_value_t = DEFAULT_VIEW_MAX_STALENESS_SECS)]
    view_max_staleness_secs: u64,

    /// Allow the `live` provider entry to be reachable at all. Off by
    /// default; without sandbox credentials there is nothing behind it
    /// to reach anyway.
    #[arg(long, default_value_t = false)]
    enable_live_provider: bool,

    /// Sandbox OAuth token endpoint base. Wiring the sandbox adapter
    /// requires all four `--sandbox-*` flags.
    #[arg(long)]
    sandbox_auth_base: Option<String>,

    /// Sandbox payments API base.
    #[arg(long)]
    sandbox_payments_base: Option<String>,

    /// Sandbox OAuth client id.
    #[arg(long)]
    sandbox_client_id: Option<String>,

    /// Sandbox OAuth client secret.
    #[arg(long)]
    sandbox_client_secret: Option<String>,
}

/// A `ViewProvider` seeded with one fixed snapshot at startup. Standing
/// in for the account-view integration a production deployment would
/// have; this node has no external ledger to poll.
struct StaticViewProvider {
    snapshot: ViewSnapshot,
}

impl ViewProvider for StaticViewProvider {
    fn current_view(&self) -> Option<ViewSnapshot> {
        Some(self.snapshot.clone())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wardrail=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    info!("wardrail node starting");

    let config = Config {
        circle_daily_cap_minor: args.circle_daily_cap_minor,
        intersection_daily_cap_minor: None,
        payee_daily_cap_minor: None,
        max_attempts_per_envelope: args.max_attempts_per_envelope,
        max_attempts_per_day_circle: None,
        max_attempts_per_day_intersection: None,
        forced_pause_secs: args.forced_pause_secs,
        revocation_poll_ms: args.revocation_poll_ms,
        presentation_expiry_secs: args.presentation_expiry_secs,
        view_max_staleness_secs: args.view_max_staleness_secs,
        approval_threshold: args.approval_threshold,
        enable_live_provider: args.enable_live_provider,
    };

    let providers = Arc::new(ProviderRegistry::default_seeded(config.enable_live_provider));
    let payees = Arc::new(PayeeRegistry::default_seeded());

    // ── Provider adapters ─────────────────────────────────────────────────────
    let mut provider_adapters: HashMap<String, Arc<dyn ProviderAdapter>> = HashMap::new();
    provider_adapters.insert("mock".to_string(), Arc::new(MockProvider::new()));

    match (
        &args.sandbox_auth_base,
        &args.sandbox_payments_base,
        &args.sandbox_client_id,
        &args.sandbox_client_secret,
    ) {
        (Some(auth_base), Some(payments_base), Some(client_id), Some(client_secret)) => {
            let sandbox = SandboxProvider::new(SandboxProviderConfig {
                auth_base: auth_base.clone(),
                payments_base: payments_base.clone(),
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                live: false,
            });
            provider_adapters.insert("sandbox".to_string(), Arc::new(sandbox));

            if config.enable_live_provider {
                let live = SandboxProvider::new(SandboxProviderConfig {
                    auth_base: auth_base.clone(),
                    payments_base: payments_base.clone(),
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                    live: true,
                });
                provider_adapters.insert("live".to_string(), Arc::new(live));
            }
            info!("sandbox provider adapter wired");
        }
        (None, None, None, None) => {
            warn!("no sandbox credentials supplied — only the mock provider is reachable");
        }
        _ => {
            anyhow::bail!(
                "partial sandbox credentials supplied — all of --sandbox-auth-base, \
                 --sandbox-payments-base, --sandbox-client-id and --sandbox-client-secret \
                 are required together"
            );
        }
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let now = clock.now();

    let views: Arc<dyn ViewProvider> = Arc::new(StaticViewProvider {
        snapshot: ViewSnapshot {
            snapshot_id: "startup-snapshot".to_string(),
            account_ids: vec![],
            balance_ok: true,
            shared_view_hash: "0".repeat(64),
            captured_at: now,
        },
    });

    let required_circles = args.required_circles.iter().map(|c| CircleId::new(c.clone()));
    let approvers = ApproverSet::new(required_circles, config.approval_threshold);

    let audit = Arc::new(CollectingAuditSink::default());

    let executor = Arc::new(Executor {
        clock,
        config,
        ledger: Arc::new(AttemptLedger::new()),
        caps: Arc::new(CapsGate::new()),
        providers,
        payees,
        revocations: Arc::new(RevocationRegistry::new()),
        presentations: Arc::new(PresentationLog::new()),
        used_artifacts: Arc::new(UsedArtifacts::new()),
        approvers,
        provider_adapters,
        views,
        audit: audit.clone(),
    });

    let rpc_state = Arc::new(RpcServerState {
        executor,
        audit,
    });
    let rpc_addr = args.rpc_addr;
    let _rpc_handle = RpcServer::new(rpc_state)
        .start(rpc_addr)
        .await
        .context("starting RPC server")?;

    info!(addr = %rpc_addr, "wardrail node ready");
    std::future::pending::<()>().await;
    Ok(())
}
