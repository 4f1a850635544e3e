//! API endpoint paths, relative to the configured base URL.

pub const BASE_URI: &str = "https://api.peerberry.com";

pub const LOGIN: &str = "/v1/investor/login";
pub const TFA: &str = "/v1/investor/login/2fa";
pub const LOGOUT: &str = "/v1/investor/logout";

pub const PROFILE: &str = "/v1/investor/profile";
pub const OVERVIEW: &str = "/v1/investor/overview";
pub const PROFIT_OVERVIEW: &str = "/v1/investor/overview/profit";
pub const LOYALTY: &str = "/v1/investor/loyalty";
pub const INVESTMENT_STATUS: &str = "/v2/investor/overview/investment_statuses/current";

pub const LOANS: &str = "/v1/loans";
pub const INVESTMENTS: &str = "/v1/investor/investments";
pub const INVESTMENTS_EXPORT: &str = "/v1/investor/investments/export";
pub const AGREEMENTS: &str = "/v1/investments";

pub const TRANSACTIONS: &str = "/v2/investor/transactions";
pub const TRANSACTIONS_EXPORT: &str = "/v2/investor/transactions/import";
pub const ACCOUNT_SUMMARY: &str = "/v2/investor/account-summary";

pub const GLOBALS: &str = "/v1/globals";
