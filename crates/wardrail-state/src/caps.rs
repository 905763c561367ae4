use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tracing::info;
use wardrail_core::{AmountMinor, AttemptId, CapsCounters, CapsPolicy, Currency};

#[derive(Clone, PartialEq, Eq, Hash)]
pub enum ScopeType {
    Circle,
    Intersection,
    Payee,
}

impl ScopeType {
    fn label(&self) -> &'static str {
        match self {
            ScopeType::Circle => "circle",
            ScopeType::Intersection => "intersection",
            ScopeType::Payee => "payee",
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct CounterKey {
    day_key: u32,
    scope: ScopeType,
    scope_id: String,
    currency: Currency,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScopeCheckResult {
    pub scope: String,
    pub scope_id: String,
    pub current: AmountMinor,
    pub limit: AmountMinor,
    pub requested: AmountMinor,
    pub allowed: bool,
    pub reason: Option<String>,
}

pub struct CapsCheckResult {
    pub scopes: Vec<ScopeCheckResult>,
}

impl CapsCheckResult {
    pub fn allowed(&self) -> bool {
        self.scopes.iter().all(|s| s.allowed)
    }

    pub fn first_failure(&self) -> Option<&ScopeCheckResult> {
        self.scopes.iter().find(|s| !s.allowed)
    }
}

pub struct CapsCheckRequest<'a> {
    pub day_key: u32,
    pub circle_id: &'a str,
    pub intersection_id: Option<&'a str>,
    pub payee_id: &'a str,
    pub currency: Currency,
    pub amount_minor: AmountMinor,
}

struct CapsInner {
    counters: HashMap<CounterKey, CapsCounters>,
    attempt_dedupe: HashSet<(u32, String, AttemptId)>,
}

/// Per-scope, per-currency, per-day spend and attempt counters. One
/// mutex guards the whole table; evaluation always checks every
/// configured scope (circle, then intersection if present, then payee)
/// before returning, so a caller can see every reason a request would be
/// blocked rather than only the first.
pub struct CapsGate {
    inner: Mutex<CapsInner>,
}

impl Default for CapsGate {
    fn default() -> Self {
        Self::new()
    }
}

impl CapsGate {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(CapsInner {
                counters: HashMap::new(),
                attempt_dedupe: HashSet::new(),
            }),
        }
    }

    fn counter_for(
        inner: &CapsInner,
        day_key: u32,
        scope: ScopeType,
        scope_id: &str,
        currency: &Currency,
    ) -> CapsCounters {
        inner
            .counters
            .get(&CounterKey {
                day_key,
                scope,
                scope_id: scope_id.to_string(),
                currency: currency.clone(),
            })
            .cloned()
            .unwrap_or_default()
    }

    fn evaluate_scope(
        inner: &CapsInner,
        day_key: u32,
        scope: ScopeType,
        scope_id: &str,
        currency: &Currency,
        limit: Option<AmountMinor>,
        requested: AmountMinor,
    ) -> Option<ScopeCheckResult> {
        let limit = limit?;
        let counters = Self::counter_for(inner, day_key, scope.clone(), scope_id, currency);
        let allowed = counters.spend_minor.saturating_add(requested) <= limit;
        Some(ScopeCheckResult {
            scope: scope.label().to_string(),
            scope_id: scope_id.to_string(),
            current: counters.spend_minor,
            limit,
            requested,
            allowed,
            reason: if allowed {
                None
            } else {
                Some(format!(
                    "{} cap exceeded: {} + {} > {}",
                    scope.label(),
                    counters.spend_minor,
                    requested,
                    limit
                ))
            },
        })
    }

    /// The rate-limit half of the gate: compares the scope's already
    /// counted attempts today against its configured daily ceiling.
    /// `None` limits mean the scope has no rate limit configured.
    fn evaluate_rate_limit(
        inner: &CapsInner,
        day_key: u32,
        scope: ScopeType,
        scope_id: &str,
        currency: &Currency,
        limit: Option<u32>,
    ) -> Option<ScopeCheckResult> {
        let limit = limit?;
        let counters = Self::counter_for(inner, day_key, scope.clone(), scope_id, currency);
        let requested = 1u64;
        let current = counters.attempt_count as u64;
        let allowed = current + requested <= limit as u64;
        Some(ScopeCheckResult {
            scope: format!("{}_rate_limit", scope.label()),
            scope_id: scope_id.to_string(),
            current,
            limit: limit as u64,
            requested,
            allowed,
            reason: if allowed {
                None
            } else {
                Some(format!(
                    "{} attempt rate limit exceeded: {} + {} > {}",
                    scope.label(),
                    current,
                    requested,
                    limit
                ))
            },
        })
    }

    pub fn check(&self, req: &CapsCheckRequest<'_>, policy: &CapsPolicy) -> CapsCheckResult {
        let inner = self.inner.lock().expect("caps mutex poisoned");
        let mut scopes = Vec::new();

        if let Some(r) = Self::evaluate_scope(
            &inner,
            req.day_key,
            ScopeType::Circle,
            req.circle_id,
            &req.currency,
            Some(policy.circle_daily_cap_minor),
            req.amount_minor,
        ) {
            scopes.push(r);
        }
        if let Some(r) = Self::evaluate_rate_limit(
            &inner,
            req.day_key,
            ScopeType::Circle,
            req.circle_id,
            &req.currency,
            policy.max_attempts_per_day_circle,
        ) {
            scopes.push(r);
        }

        if let Some(intersection_id) = req.intersection_id {
            if let Some(r) = Self::evaluate_scope(
                &inner,
                req.day_key,
                ScopeType::Intersection,
                intersection_id,
                &req.currency,
                policy.intersection_daily_cap_minor,
                req.amount_minor,
            ) {
                scopes.push(r);
            }
            if let Some(r) = Self::evaluate_rate_limit(
                &inner,
                req.day_key,
                ScopeType::Intersection,
                intersection_id,
                &req.currency,
                policy.max_attempts_per_day_intersection,
            ) {
                scopes.push(r);
            }
        }

        if let Some(r) = Self::evaluate_scope(
            &inner,
            req.day_key,
            ScopeType::Payee,
            req.payee_id,
            &req.currency,
            policy.payee_daily_cap_minor,
            req.amount_minor,
        ) {
            scopes.push(r);
        }

        CapsCheckResult { scopes }
    }

    /// Increments the attempt counter for a scope exactly once per
    /// `attempt_id`, regardless of how many times the executor calls
    /// this (e.g. on a retried start within the same process).
    pub fn on_attempt_started(
        &self,
        day_key: u32,
        scope: ScopeType,
        scope_id: &str,
        currency: &Currency,
        attempt_id: &AttemptId,
    ) {
        let mut inner = self.inner.lock().expect("caps mutex poisoned");
        let dedupe_key = (day_key, format!("{}:{}", scope.label(), scope_id), attempt_id.clone());
        if !inner.attempt_dedupe.insert(dedupe_key) {
            return;
        }
        let key = CounterKey {
            day_key,
            scope,
            scope_id: scope_id.to_string(),
            currency: currency.clone(),
        };
        inner.counters.entry(key).or_default().attempt_count += 1;
    }

    /// Increments the spend counter only when the attempt actually moved
    /// real money. Simulated attempts never reach this path with
    /// `money_moved = true`.
    pub fn on_attempt_finalized(
        &self,
        day_key: u32,
        scope: ScopeType,
        scope_id: &str,
        currency: &Currency,
        amount_minor: AmountMinor,
        money_moved: bool,
    ) {
        if !money_moved {
            return;
        }
        let mut inner = self.inner.lock().expect("caps mutex poisoned");
        let key = CounterKey {
            day_key,
            scope,
            scope_id: scope_id.to_string(),
            currency: currency.clone(),
        };
        inner.counters.entry(key).or_default().spend_minor += amount_minor;
        info!(day_key, scope_id, amount_minor, "caps spend counter incremented");
    }

    pub fn purge_before(&self, day_key: u32) {
        let mut inner = self.inner.lock().expect("caps mutex poisoned");
        inner.counters.retain(|k, _| k.day_key >= day_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CapsPolicy {
        CapsPolicy {
            circle_daily_cap_minor: 10_000,
            intersection_daily_cap_minor: None,
            payee_daily_cap_minor: None,
            max_attempts_per_day_circle: Some(5),
            max_attempts_per_day_intersection: None,
        }
    }

    #[test]
    fn second_payment_blocked_once_cap_reached() {
        let gate = CapsGate::new();
        let currency = Currency::parse("GBP").unwrap();
        gate.on_attempt_finalized(1, ScopeType::Circle, "c1", &currency, 9_000, true);
        let req = CapsCheckRequest {
            day_key: 1,
            circle_id: "c1",
            intersection_id: None,
            payee_id: "p1",
            currency: currency.clone(),
            amount_minor: 2_000,
        };
        let result = gate.check(&req, &policy());
        assert!(!result.allowed());
    }

    #[test]
    fn simulated_attempts_do_not_count_as_spend() {
        let gate = CapsGate::new();
        let currency = Currency::parse("GBP").unwrap();
        gate.on_attempt_finalized(1, ScopeType::Circle, "c1", &currency, 9_000, false);
        let req = CapsCheckRequest {
            day_key: 1,
            circle_id: "c1",
            intersection_id: None,
            payee_id: "p1",
            currency,
            amount_minor: 2_000,
        };
        assert!(gate.check(&req, &policy()).allowed());
    }

    #[test]
    fn fourth_attempt_blocked_by_circle_rate_limit() {
        let gate = CapsGate::new();
        let currency = Currency::parse("GBP").unwrap();
        let mut policy = policy();
        policy.max_attempts_per_day_circle = Some(3);
        let req = CapsCheckRequest {
            day_key: 1,
            circle_id: "c1",
            intersection_id: None,
            payee_id: "p1",
            currency,
            amount_minor: 100,
        };
        for n in 1..=3 {
            assert!(gate.check(&req, &policy).allowed(), "attempt {n} should pass");
            gate.on_attempt_started(1, ScopeType::Circle, "c1", &req.currency, &AttemptId::new(format!("a{n}")));
        }
        let result = gate.check(&req, &policy);
        assert!(!result.allowed());
        let failure = result.first_failure().expect("a failure is present");
        assert_eq!(failure.scope, "circle_rate_limit");
    }

    #[test]
    fn rate_limit_unset_never_blocks() {
        let gate = CapsGate::new();
        let currency = Currency::parse("GBP").unwrap();
        let mut policy = policy();
        policy.max_attempts_per_day_circle = None;
        let req = CapsCheckRequest {
            day_key: 1,
            circle_id: "c1",
            intersection_id: None,
            payee_id: "p1",
            currency,
            amount_minor: 100,
        };
        for n in 1..=10 {
            gate.on_attempt_started(1, ScopeType::Circle, "c1", &req.currency, &AttemptId::new(format!("a{n}")));
        }
        assert!(gate.check(&req, &policy).allowed());
    }
}
