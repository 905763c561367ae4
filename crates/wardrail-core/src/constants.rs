//! ─── Wardrail Engine Defaults ───────────────────────────────────────────────
//!
//! Every number here is a default that a `Config` can override; nothing in
//! this module is read directly by a gate at decision time — gates take
//! their limits from a `Config`/`PolicySnapshot` that is itself initialized
//! from these constants.

// ── Caps & rate-limit gate ───────────────────────────────────────────────────

/// Default per-circle daily spend cap, in minor units.
pub const DEFAULT_CAP_CENTS: u64 = 100_00;

/// Default maximum attempts per envelope before the ledger refuses a new one.
pub const DEFAULT_MAX_ATTEMPTS_PER_ENVELOPE: u32 = 1;

// ── Forced pause ─────────────────────────────────────────────────────────────

/// Default forced-pause duration before an execution may proceed to the
/// provider, in seconds.
pub const DEFAULT_FORCED_PAUSE_SECS: u64 = 2;

/// Default interval between revocation polls during the forced pause, in
/// milliseconds.
pub const DEFAULT_REVOCATION_POLL_MS: u64 = 100;

// ── Presentation & multi-party gate ──────────────────────────────────────────

/// Default window during which a recorded presentation remains valid.
pub const DEFAULT_PRESENTATION_EXPIRY_SECS: u64 = 5 * 60;

// ── View snapshot ────────────────────────────────────────────────────────────

/// Default maximum age of a bound view snapshot before it is considered
/// stale and the execution is blocked.
pub const DEFAULT_VIEW_MAX_STALENESS_SECS: u64 = 5 * 60;

// ── Neutral-language scan ────────────────────────────────────────────────────

/// Fixed, code-defined markers the presentation gate flags as urgency
/// language. Not user-configurable: widening or narrowing this list is a
/// code change, not a policy change.
pub const URGENCY_MARKERS: &[&str] = &["urgent", "immediately", "right now", "asap", "act now"];

pub const FEAR_MARKERS: &[&str] = &[
    "frozen",
    "arrested",
    "warrant",
    "lawsuit",
    "suspended",
    "penalty",
];

pub const AUTHORITY_MARKERS: &[&str] =
    &["irs", "police", "government", "court order", "federal agent"];

pub const OPTIMISATION_MARKERS: &[&str] =
    &["guaranteed return", "double your money", "risk free", "limited time offer"];

// ── Idempotency key derivation ───────────────────────────────────────────────

/// Fixed domain-separation constant for the HMAC-SHA-256 idempotency key.
/// Not a secret: it only prevents this derivation from colliding with an
/// unrelated HMAC use of the same inputs elsewhere in the system.
pub const IDEMPOTENCY_HMAC_DOMAIN: &[u8] = b"wardrail.idempotency.v1";
