use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use tracing::{info, instrument, warn};
use wardrail_core::{
    ApprovalBundle, AttemptId, AttemptStatus, CapsPolicy, Clock, EnvelopeId, ExecutionEnvelope,
    IdempotencyKey, TraceId, WardrailError,
};
use wardrail_consensus::{gate as multiparty_gate, ApproverSet, PresentationLog, UsedArtifacts};
use wardrail_pause::{poll_plan, PauseOutcome};
use wardrail_provider::{ExecCtx, ExecuteRequest, ExecuteStatus, PrepareRequest, ProviderAdapter};
use wardrail_revocation::{
    current_policy_snapshot, verify_policy, verify_view, PayeeRegistry, ProviderEnvironment,
    ProviderRegistry, RevocationRegistry, ViewProvider,
};
use wardrail_state::{AttemptLedger, CapsCheckRequest, CapsGate, ScopeType};

use crate::audit::AuditSink;
use crate::config::Config;

/// One caller-supplied execution request: the sealed envelope, the
/// attempt identity the caller wants this run recorded under, and the
/// approval bundle presented alongside it (an empty `artifacts` vec
/// reads as "no approvals presented yet" and fails the multi-party gate
/// the same way a missing presentation does).
pub struct ExecRequest {
    pub envelope: ExecutionEnvelope,
    pub attempt_id: AttemptId,
    pub trace_id: TraceId,
    pub bundle: ApprovalBundle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecResult {
    Settled { provider_reference: String },
    Simulated { provider_reference: String },
    Blocked { reason: String },
    Aborted,
    Revoked { reason: String },
    Expired,
    Failed { reason: String },
}

/// Wires together every singleton store and gate the pipeline touches.
/// `wardrail-node` builds one of these per process; `wardrail-rpc`
/// forwards caller requests into it.
pub struct Executor {
    pub clock: Arc<dyn Clock>,
    pub config: Config,
    pub ledger: Arc<AttemptLedger>,
    pub caps: Arc<CapsGate>,
    pub providers: Arc<ProviderRegistry>,
    pub payees: Arc<PayeeRegistry>,
    pub revocations: Arc<RevocationRegistry>,
    pub presentations: Arc<PresentationLog>,
    pub used_artifacts: Arc<UsedArtifacts>,
    pub approvers: ApproverSet,
    pub provider_adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
    pub views: Arc<dyn ViewProvider>,
    pub audit: Arc<dyn AuditSink>,
}

impl Executor {
    /// The UTC calendar day of the injected clock, not of the envelope —
    /// an envelope sealed yesterday and executed today is charged against
    /// today's cap bucket.
    fn day_key(&self) -> u32 {
        self.clock
            .now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always a valid time")
            .and_utc()
            .timestamp() as u32
    }

    fn caps_policy(&self) -> CapsPolicy {
        CapsPolicy {
            circle_daily_cap_minor: self.config.circle_daily_cap_minor,
            intersection_daily_cap_minor: self.config.intersection_daily_cap_minor,
            payee_daily_cap_minor: self.config.payee_daily_cap_minor,
            max_attempts_per_day_circle: self.config.max_attempts_per_day_circle,
            max_attempts_per_day_intersection: self.config.max_attempts_per_day_intersection,
        }
    }

    /// Every caps scope configured for an envelope: circle always,
    /// intersection only when the envelope carries one, payee always.
    fn caps_scopes<'e>(&self, envelope: &'e ExecutionEnvelope) -> Vec<(ScopeType, &'e str)> {
        let mut scopes = vec![(ScopeType::Circle, envelope.circle_id.as_str())];
        if let Some(intersection_id) = &envelope.intersection_id {
            scopes.push((ScopeType::Intersection, intersection_id.as_str()));
        }
        scopes.push((ScopeType::Payee, envelope.action.payee_id.as_str()));
        scopes
    }

    fn emit(&self, event_type: &str, envelope_id: &EnvelopeId, attempt_id: Option<&AttemptId>, detail: serde_json::Value) {
        let mut ev = wardrail_core::AuditEvent::new(event_type, self.clock.now(), detail)
            .with_envelope(envelope_id.clone());
        if let Some(a) = attempt_id {
            ev = ev.with_attempt(a.clone());
        }
        self.audit.emit(ev);
    }

    /// Runs the fixed execution pipeline for one envelope: expiry and
    /// revocation checks, policy and view snapshot verification, provider
    /// and payee registry checks, the multi-party gate, the caps gate,
    /// ledger bookkeeping, the forced pause, and finally the provider
    /// call. Every exit path finalizes the ledger entry and the caps
    /// counters before returning.
    #[instrument(skip_all, fields(envelope = %req.envelope.envelope_id, attempt = %req.attempt_id))]
    pub async fn execute(&self, req: ExecRequest) -> Result<ExecResult, WardrailError> {
        let envelope = req.envelope;
        let attempt_id = req.attempt_id;
        let now = self.clock.now();

        if envelope.is_expired(now) {
            self.emit("envelope.expired", &envelope.envelope_id, None, serde_json::json!({}));
            return Ok(ExecResult::Expired);
        }

        if let Err(WardrailError::EnvelopeRevoked { reason, .. }) = self.revocations.check(&envelope.envelope_id) {
            self.emit("envelope.revoked", &envelope.envelope_id, None, serde_json::json!({"reason": reason}));
            return Ok(ExecResult::Revoked { reason });
        }

        let policy_now = current_policy_snapshot(&self.providers, &self.payees, self.caps_policy());
        if let Err(e) = verify_policy(&envelope, &policy_now) {
            self.emit("policy.drift", &envelope.envelope_id, None, serde_json::json!({}));
            return Ok(ExecResult::Blocked { reason: e.to_string() });
        }

        if let Err(e) = verify_view(
            &envelope,
            self.views.as_ref(),
            Duration::seconds(self.config.view_max_staleness_secs as i64),
            now,
        ) {
            self.emit("view.stale_or_drifted", &envelope.envelope_id, None, serde_json::json!({}));
            return Ok(ExecResult::Blocked { reason: e.to_string() });
        }

        let provider_entry = match self.providers.require_allowed(&envelope.action.provider_id) {
            Ok(p) => p,
            Err(e) => {
                self.emit("provider.blocked", &envelope.envelope_id, None, serde_json::json!({}));
                return Ok(ExecResult::Blocked { reason: e.to_string() });
            }
        };

        if let Err(e) = self.payees.require_allowed(&envelope.action.payee_id, &envelope.action.provider_id) {
            self.emit("payee.blocked", &envelope.envelope_id, None, serde_json::json!({}));
            return Ok(ExecResult::Blocked { reason: e.to_string() });
        }

        let idempotency_key = IdempotencyKey::from_bytes(wardrail_crypto::derive_idempotency_key(
            envelope.envelope_id.as_str(),
            &envelope.action_hash.to_hex(),
            attempt_id.as_str(),
            &envelope.seal_hash.to_hex(),
        ));
        if self.ledger.check_replay(&idempotency_key).is_some() {
            self.emit("attempt.replay.blocked", &envelope.envelope_id, Some(&attempt_id), serde_json::json!({}));
            return Err(WardrailError::ReplayBlocked);
        }

        let day_key = self.day_key();

        // Atomic commit point: past this call the idempotency key can
        // never be reused for a different attempt. The attempt is
        // reserved before the multi-party and caps gates run, so a
        // gate-blocked attempt still leaves a terminal ledger record
        // behind rather than no record at all.
        self.ledger.start_attempt(
            attempt_id.clone(),
            envelope.envelope_id.clone(),
            idempotency_key.clone(),
            envelope.action.provider_id.clone(),
            req.trace_id.clone(),
            now,
        )?;
        self.emit("attempt.started", &envelope.envelope_id, Some(&attempt_id), serde_json::json!({}));

        let gate_result = match multiparty_gate::check(
            &envelope,
            &req.bundle,
            &self.presentations,
            &self.approvers,
            &self.used_artifacts,
            Duration::seconds(self.config.presentation_expiry_secs as i64),
            now,
        ) {
            Ok(g) => g,
            Err(e) => {
                self.emit("multiparty.blocked", &envelope.envelope_id, Some(&attempt_id), serde_json::json!({}));
                return self
                    .finalize(&envelope, &attempt_id, AttemptStatus::Blocked, None, day_key, 0, false,
                        ExecResult::Blocked { reason: e.to_string() })
                    .await;
            }
        };

        let caps_req = CapsCheckRequest {
            day_key,
            circle_id: envelope.circle_id.as_str(),
            intersection_id: envelope.intersection_id.as_ref().map(|i| i.as_str()),
            payee_id: envelope.action.payee_id.as_str(),
            currency: envelope.action.currency.clone(),
            amount_minor: envelope.action.amount_minor,
        };
        let caps_check = self.caps.check(&caps_req, &policy_now.caps);
        if !caps_check.allowed() {
            let failure = caps_check.first_failure();
            let reason = failure
                .and_then(|f| f.reason.clone())
                .unwrap_or_else(|| "cap exceeded".to_string());
            let event = if failure.map(|f| f.scope.ends_with("_rate_limit")).unwrap_or(false) {
                "ratelimit.blocked"
            } else {
                "caps.blocked"
            };
            self.emit(event, &envelope.envelope_id, Some(&attempt_id), serde_json::json!({}));
            return self
                .finalize(&envelope, &attempt_id, AttemptStatus::Blocked, None, day_key, 0, false,
                    ExecResult::Blocked { reason })
                .await;
        }

        // Past this point the attempt is both reserved and gated — the
        // consumed artifacts and per-scope attempt counters are safe to
        // commit, since every remaining exit path finalizes this same
        // ledger record rather than abandoning it.
        self.used_artifacts.mark_used(&gate_result.consumed_artifacts);
        for (scope, scope_id) in self.caps_scopes(&envelope) {
            self.caps.on_attempt_started(day_key, scope, scope_id, &envelope.action.currency, &attempt_id);
        }

        let adapter = match self.provider_adapters.get(envelope.action.provider_id.as_str()) {
            Some(a) => a.clone(),
            None => {
                return self
                    .finalize(
                        &envelope,
                        &attempt_id,
                        AttemptStatus::Failed,
                        None,
                        day_key,
                        0,
                        false,
                        ExecResult::Failed { reason: "no adapter bound for provider".into() },
                    )
                    .await;
            }
        };

        let ctx = ExecCtx {
            envelope_id: envelope.envelope_id.clone(),
            attempt_id: attempt_id.clone(),
            idempotency_key: idempotency_key.clone(),
        };

        let prepare = adapter
            .prepare(
                &ctx,
                &PrepareRequest {
                    payee_id: envelope.action.payee_id.clone(),
                    amount_minor: envelope.action.amount_minor,
                    currency: envelope.action.currency.clone(),
                },
            )
            .await;
        match prepare {
            Ok(p) if p.accepted => {}
            Ok(p) => {
                return self
                    .finalize(
                        &envelope,
                        &attempt_id,
                        AttemptStatus::Failed,
                        None,
                        day_key,
                        0,
                        false,
                        ExecResult::Failed { reason: p.detail.unwrap_or_else(|| "prepare rejected".into()) },
                    )
                    .await;
            }
            Err(e) => {
                return self
                    .finalize(&envelope, &attempt_id, AttemptStatus::Failed, None, day_key, 0, false,
                        ExecResult::Failed { reason: e.to_string() })
                    .await;
            }
        }
        self.ledger.update_status(&attempt_id, AttemptStatus::Prepared, None, self.clock.now())?;

        // Forced pause: the pipeline's first blocking region, during
        // which a revocation signal can still stop the payment.
        match self.run_forced_pause(&envelope).await {
            PauseOutcome::Revoked { reason } => {
                return self
                    .finalize(&envelope, &attempt_id, AttemptStatus::Revoked, None, day_key, 0, false,
                        ExecResult::Revoked { reason })
                    .await;
            }
            PauseOutcome::CancelledByCaller => {
                return self
                    .finalize(&envelope, &attempt_id, AttemptStatus::Aborted, None, day_key, 0, false, ExecResult::Aborted)
                    .await;
            }
            PauseOutcome::Aborted => {
                let _ = adapter.abort(&ctx).await;
                return self
                    .finalize(&envelope, &attempt_id, AttemptStatus::Aborted, None, day_key, 0, false, ExecResult::Aborted)
                    .await;
            }
            PauseOutcome::Completed => {}
        }

        // Time has passed during the pause; re-check what can have
        // changed underneath the attempt before invoking the provider.
        let now = self.clock.now();
        if envelope.is_expired(now) {
            return self
                .finalize(&envelope, &attempt_id, AttemptStatus::Expired, None, day_key, 0, false, ExecResult::Expired)
                .await;
        }
        if let Err(WardrailError::EnvelopeRevoked { reason, .. }) = self.revocations.check(&envelope.envelope_id) {
            return self
                .finalize(&envelope, &attempt_id, AttemptStatus::Revoked, None, day_key, 0, false,
                    ExecResult::Revoked { reason })
                .await;
        }

        // Invoke the provider — the pipeline's second and final blocking region.
        self.ledger.update_status(&attempt_id, AttemptStatus::Invoked, None, self.clock.now())?;
        let execute = adapter
            .execute(
                &ctx,
                &ExecuteRequest {
                    payee_id: envelope.action.payee_id.clone(),
                    amount_minor: envelope.action.amount_minor,
                    currency: envelope.action.currency.clone(),
                },
            )
            .await;

        let outcome = match execute {
            Ok(o) => o,
            Err(e) => {
                return self
                    .finalize(&envelope, &attempt_id, AttemptStatus::Failed, None, day_key, 0, false,
                        ExecResult::Failed { reason: e.to_string() })
                    .await;
            }
        };

        if provider_entry.environment == ProviderEnvironment::Mock && outcome.real_money_moved {
            panic!("invariant violated: mock provider reported real money moved");
        }

        let (terminal, result) = match outcome.status {
            ExecuteStatus::Settled => (
                AttemptStatus::Settled,
                ExecResult::Settled { provider_reference: outcome.provider_reference.clone() },
            ),
            ExecuteStatus::Simulated => (
                AttemptStatus::Simulated,
                ExecResult::Simulated { provider_reference: outcome.provider_reference.clone() },
            ),
            ExecuteStatus::Failed => (
                AttemptStatus::Failed,
                ExecResult::Failed { reason: "provider reported failure".into() },
            ),
        };

        self.finalize(
            &envelope,
            &attempt_id,
            terminal,
            Some(outcome.provider_reference),
            day_key,
            envelope.action.amount_minor,
            outcome.real_money_moved,
            result,
        )
        .await
    }

    async fn run_forced_pause(&self, envelope: &ExecutionEnvelope) -> PauseOutcome {
        let plan = poll_plan(
            StdDuration::from_secs(self.config.forced_pause_secs),
            StdDuration::from_millis(self.config.revocation_poll_ms),
        );
        let mut waited = StdDuration::ZERO;
        for tick in plan {
            tokio::time::sleep(tick - waited).await;
            waited = tick;
            if self.revocations.is_revoked(&envelope.envelope_id) {
                let signal = self.revocations.get(&envelope.envelope_id).expect("is_revoked just confirmed presence");
                return PauseOutcome::Revoked { reason: signal.reason };
            }
        }
        PauseOutcome::Completed
    }

    #[allow(clippy::too_many_arguments)]
    async fn finalize(
        &self,
        envelope: &ExecutionEnvelope,
        attempt_id: &AttemptId,
        terminal: AttemptStatus,
        provider_reference: Option<String>,
        day_key: u32,
        amount_minor: u64,
        money_moved: bool,
        result: ExecResult,
    ) -> Result<ExecResult, WardrailError> {
        let now = self.clock.now();
        if let Err(e) = self.ledger.finalize_attempt(attempt_id, terminal, provider_reference, now) {
            warn!(attempt = %attempt_id, error = %e, "finalize_attempt failed");
        }
        for (scope, scope_id) in self.caps_scopes(envelope) {
            self.caps.on_attempt_finalized(day_key, scope, scope_id, &envelope.action.currency, amount_minor, money_moved);
        }
        self.emit(
            "attempt.finalized",
            &envelope.envelope_id,
            Some(attempt_id),
            serde_json::json!({"status": format!("{:?}", terminal)}),
        );
        info!(attempt = %attempt_id, status = ?terminal, "execution pipeline finished");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use wardrail_core::{
        ActionKind, ApprovalArtifact, BundleContentHash, Currency, EnvelopeBuilder, FixedClock,
        PresentationId, ViewSnapshot,
    };
    use wardrail_provider::MockProvider;
    use wardrail_revocation::{current_policy_snapshot, policy_snapshot_hash, view_snapshot_hash};

    struct TestView {
        snapshot: ViewSnapshot,
    }

    impl ViewProvider for TestView {
        fn current_view(&self) -> Option<ViewSnapshot> {
            Some(self.snapshot.clone())
        }
    }

    /// Builds an executor plus one envelope/bundle pair sealed (and
    /// presented) so every gate up to and including the provider call
    /// passes, with the envelope's clock fixed at `seal_at` and the
    /// executor's clock fixed at `exec_now`.
    fn build_executor(seal_at: DateTime<Utc>, exec_now: DateTime<Utc>) -> (Executor, ExecutionEnvelope, ApprovalBundle) {
        let providers = Arc::new(ProviderRegistry::default_seeded(false));
        let payees = Arc::new(PayeeRegistry::default_seeded());
        let config = Config::default();

        let policy = current_policy_snapshot(&providers, &payees, CapsPolicy {
            circle_daily_cap_minor: config.circle_daily_cap_minor,
            intersection_daily_cap_minor: config.intersection_daily_cap_minor,
            payee_daily_cap_minor: config.payee_daily_cap_minor,
            max_attempts_per_day_circle: config.max_attempts_per_day_circle,
            max_attempts_per_day_intersection: config.max_attempts_per_day_intersection,
        });
        let policy_hash = policy_snapshot_hash(&policy);

        let view = ViewSnapshot {
            snapshot_id: "view-1".to_string(),
            account_ids: vec![],
            balance_ok: true,
            shared_view_hash: "0".repeat(64),
            captured_at: seal_at,
        };
        let view_hash = view_snapshot_hash(&view);

        let action = wardrail_core::ActionSpec {
            amount_minor: 1_000,
            currency: Currency::parse("GBP").unwrap(),
            payee_id: wardrail_core::PayeeId::new("payee-sandbox-1"),
            provider_id: wardrail_core::ProviderId::new("mock"),
            description: None,
            kind: ActionKind::Payment,
        };

        let seal_clock = FixedClock::new(seal_at);
        let envelope = EnvelopeBuilder::new(
            EnvelopeId::new("env-1"),
            action,
            wardrail_core::CircleId::new("circle-1"),
            wardrail_core::PersonId::new("person-1"),
            policy_hash,
            view_hash,
        )
        .seal(&seal_clock);

        let content_hash = BundleContentHash::from_bytes([5u8; 32]);
        let presentations = Arc::new(PresentationLog::new());
        presentations.record_presentation(
            PresentationId::new("pres-1"),
            envelope.envelope_id.clone(),
            wardrail_core::CircleId::new("circle-1"),
            content_hash.clone(),
            seal_at,
        );

        let bundle = ApprovalBundle {
            envelope_id: envelope.envelope_id.clone(),
            action_hash: envelope.action_hash.clone(),
            content_hash: content_hash.clone(),
            artifacts: vec![ApprovalArtifact {
                circle_id: wardrail_core::CircleId::new("circle-1"),
                person_id: wardrail_core::PersonId::new("person-1"),
                bundle_content_hash: content_hash,
                signature: vec![],
                presented_at: seal_at,
                used: false,
            }],
        };

        let mut provider_adapters: HashMap<String, Arc<dyn ProviderAdapter>> = HashMap::new();
        provider_adapters.insert("mock".to_string(), Arc::new(MockProvider::new()));

        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(exec_now));
        let executor = Executor {
            clock,
            config,
            ledger: Arc::new(AttemptLedger::new()),
            caps: Arc::new(CapsGate::new()),
            providers,
            payees,
            revocations: Arc::new(RevocationRegistry::new()),
            presentations,
            used_artifacts: Arc::new(UsedArtifacts::new()),
            approvers: ApproverSet::new([wardrail_core::CircleId::new("circle-1")], 1),
            provider_adapters,
            views: Arc::new(TestView { snapshot: view }),
            audit: Arc::new(crate::audit::CollectingAuditSink::default()),
        };

        (executor, envelope, bundle)
    }

    #[tokio::test]
    async fn happy_path_settles_through_mock_provider() {
        let now = Utc::now();
        let (executor, envelope, bundle) = build_executor(now, now);
        let result = executor
            .execute(ExecRequest {
                envelope,
                attempt_id: AttemptId::new("attempt-1"),
                trace_id: TraceId::new("trace-1"),
                bundle,
            })
            .await
            .expect("execute should not error");
        assert!(matches!(result, ExecResult::Simulated { .. }));
    }

    #[tokio::test]
    async fn replaying_the_same_attempt_is_blocked() {
        let now = Utc::now();
        let (executor, envelope, bundle) = build_executor(now, now);
        let req = ExecRequest {
            envelope,
            attempt_id: AttemptId::new("attempt-1"),
            trace_id: TraceId::new("trace-1"),
            bundle,
        };
        // Re-derive a second request with the same envelope/attempt/bundle —
        // execute() takes req by value, so clone the pieces it needs.
        let req2 = ExecRequest {
            envelope: req.envelope.clone(),
            attempt_id: req.attempt_id.clone(),
            trace_id: req.trace_id.clone(),
            bundle: req.bundle.clone(),
        };
        let first = executor.execute(req).await.expect("first execute should not error");
        assert!(matches!(first, ExecResult::Simulated { .. }));

        let second = executor.execute(req2).await;
        assert!(matches!(second, Err(WardrailError::ReplayBlocked)));
    }

    #[tokio::test]
    async fn expired_envelope_is_reported_expired() {
        let exec_now = Utc::now();
        let seal_at = exec_now - Duration::minutes(10);
        let (executor, envelope, bundle) = build_executor(seal_at, exec_now);
        let result = executor
            .execute(ExecRequest {
                envelope,
                attempt_id: AttemptId::new("attempt-1"),
                trace_id: TraceId::new("trace-1"),
                bundle,
            })
            .await
            .expect("execute should not error");
        assert_eq!(result, ExecResult::Expired);
    }

    #[tokio::test]
    async fn insufficient_approvals_blocks_with_a_finalized_ledger_record() {
        let now = Utc::now();
        let (executor, envelope, mut bundle) = build_executor(now, now);
        bundle.artifacts.clear();
        let attempt_id = AttemptId::new("attempt-1");
        let result = executor
            .execute(ExecRequest {
                envelope,
                attempt_id: attempt_id.clone(),
                trace_id: TraceId::new("trace-1"),
                bundle,
            })
            .await
            .expect("execute should not error");
        assert!(matches!(result, ExecResult::Blocked { .. }));
        let record = executor.ledger.get(&attempt_id).expect("gate-blocked attempt still leaves a ledger record");
        assert_eq!(record.status, AttemptStatus::Blocked);
    }

    #[tokio::test]
    async fn wrong_policy_hash_is_blocked() {
        let now = Utc::now();
        let (executor, mut envelope, bundle) = build_executor(now, now);
        envelope.bound_policy_hash = wardrail_core::PolicyHash::from_bytes([0u8; 32]);
        let result = executor
            .execute(ExecRequest {
                envelope,
                attempt_id: AttemptId::new("attempt-1"),
                trace_id: TraceId::new("trace-1"),
                bundle,
            })
            .await
            .expect("execute should not error");
        assert!(matches!(result, ExecResult::Blocked { .. }));
    }
}
