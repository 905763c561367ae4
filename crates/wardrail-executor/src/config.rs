use wardrail_core::{
    DEFAULT_CAP_CENTS, DEFAULT_FORCED_PAUSE_SECS, DEFAULT_MAX_ATTEMPTS_PER_ENVELOPE,
    DEFAULT_PRESENTATION_EXPIRY_SECS, DEFAULT_REVOCATION_POLL_MS, DEFAULT_VIEW_MAX_STALENESS_SECS,
};

/// Runtime configuration for one executor instance. The defaults here
/// mirror the protocol's documented defaults; a caller building a
/// library instance is expected to construct this directly, and
/// `wardrail-node` is the only place that parses it from CLI flags.
#[derive(Debug, Clone)]
pub struct Config {
    pub circle_daily_cap_minor: u64,
    pub intersection_daily_cap_minor: Option<u64>,
    pub payee_daily_cap_minor: Option<u64>,
    pub max_attempts_per_envelope: u32,
    /// Caps & rate-limit gate (C7) knob, distinct from
    /// `max_attempts_per_envelope` above: the daily attempt ceiling for
    /// the circle scope. `None` means unlimited.
    pub max_attempts_per_day_circle: Option<u32>,
    /// Same as `max_attempts_per_day_circle`, for the intersection scope.
    pub max_attempts_per_day_intersection: Option<u32>,
    pub forced_pause_secs: u64,
    pub revocation_poll_ms: u64,
    pub presentation_expiry_secs: u64,
    pub view_max_staleness_secs: u64,
    pub approval_threshold: u32,
    /// Off by default; the only way a caller can reach the live provider
    /// even after setting this is if the live entry in the provider
    /// registry was also constructed with `live_enabled = true`.
    pub enable_live_provider: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            circle_daily_cap_minor: DEFAULT_CAP_CENTS,
            intersection_daily_cap_minor: None,
            payee_daily_cap_minor: None,
            max_attempts_per_envelope: DEFAULT_MAX_ATTEMPTS_PER_ENVELOPE,
            max_attempts_per_day_circle: None,
            max_attempts_per_day_intersection: None,
            forced_pause_secs: DEFAULT_FORCED_PAUSE_SECS,
            revocation_poll_ms: DEFAULT_REVOCATION_POLL_MS,
            presentation_expiry_secs: DEFAULT_PRESENTATION_EXPIRY_SECS,
            view_max_staleness_secs: DEFAULT_VIEW_MAX_STALENESS_SECS,
            approval_threshold: 1,
            enable_live_provider: false,
        }
    }
}
