use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `nebulafarm`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum FarmError {
    // ── Config / on-disk stores ──────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Auth / session ──────────────────────────────────────────────────
    #[error("auth: {0}")]
    Auth(#[from] AuthError),

    // ── Purchase jobs ───────────────────────────────────────────────────
    #[error("purchase: {0}")]
    Purchase(#[from] PurchaseError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

/// Missing or malformed on-disk collaborators. Always fatal to the requested
/// operation, never to the process; nothing is partially written.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("request template store is missing '{0}'")]
    MissingTemplate(&'static str),

    #[error("catalog: {0}")]
    Catalog(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Auth errors ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AuthError {
    /// Non-2xx from the token endpoint. The session manager never retries;
    /// recovery policy belongs to the caller.
    #[error("auth endpoint rejected the login (HTTP {status})")]
    Rejected { status: u16 },

    #[error("token request failed: {0}")]
    Request(String),

    #[error("token response missing {0}")]
    MalformedResponse(&'static str),

    #[error("failed to persist request templates: {0}")]
    Persist(String),
}

// ─── Purchase errors ────────────────────────────────────────────────────────

/// Fatal purchase-path failures. Per-attempt HTTP/network failures are *not*
/// errors; they are [`AttemptOutcome`](crate::purchase::AttemptOutcome)
/// values reported through the progress sink and never abort a batch.
#[derive(Debug, Error)]
pub enum PurchaseError {
    #[error("no item named '{0}' in category '{1}'")]
    UnknownItem(String, String),

    #[error("weapon level {requested} would exceed the cap of {max}")]
    LevelCap { requested: u32, max: u32 },

    #[error("stat endpoint returned HTTP {status}: {body}")]
    StatRejected { status: u16, body: String },
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, FarmError>;
