//! # peerberry
//!
//! Async client for the undocumented Peerberry investor web API.
//!
//! The remote API is owned by a third party, is not a published contract,
//! and sits behind an anti-automation shield; this crate wraps it with a
//! browser-profiled request layer, handles login (including two-factor) and
//! session-token renewal, and exposes the data-retrieval and purchase
//! endpoints with typed filters.
//!
//! ## Features
//!
//! - Login with email/password, optional TOTP two-factor step
//! - Bearer-token session with one automatic re-login on expiry
//! - Bot-mitigation pass-through: browser header profiles, cookie
//!   persistence, challenge detection with jittered backoff
//! - Loan, investment, and transaction listings with typed filters
//! - Paginated bulk loan retrieval and spreadsheet exports
//!
//! ## Example
//!
//! ```no_run
//! use peerberry::{Credentials, Peerberry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let credentials = Credentials::new("user@example.com", "password")
//!         .with_tfa_secret("BASE32SECRET");
//!     let client = Peerberry::connect(credentials).await?;
//!
//!     let overview = client.get_overview().await?;
//!     println!("overview: {overview}");
//!     client.logout().await?;
//!     Ok(())
//! }
//! ```

mod api;
mod client;
mod endpoints;

pub mod auth;
pub mod filters;
pub mod models;
pub mod registry;
pub mod shield;

pub use crate::client::{
    ClientConfig,
    Peerberry,
    PeerberryBuilder,
    PeerberryError,
    PeerberryResult,
};

pub use crate::auth::{
    AuthError,
    Credentials,
    SessionToken,
};

pub use crate::filters::{
    FilterError,
    InvestmentFilter,
    InvestmentSort,
    InvestmentStatus,
    LoanFilter,
    LoanSort,
    LoanType,
    MAX_PAGE_SIZE,
    Periodicity,
    TransactionFilter,
    TransactionPeriodicity,
    TransactionType,
};

pub use crate::models::{
    AccountSummary,
    BalanceSummary,
    CashFlowSummary,
    LoanDetails,
    LoanPage,
    LoyaltyTier,
};

pub use crate::registry::{
    CountryEntry,
    GlobalRegistry,
    OriginatorEntry,
    OriginatorIds,
};

pub use crate::shield::{
    BrowserProfile,
    ChallengeKind,
    ReqwestShieldClient,
    RequestBody,
    Shield,
    ShieldConfig,
    ShieldError,
    ShieldHttpClient,
    ShieldRequest,
    ShieldResponse,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
