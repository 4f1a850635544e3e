//! Typed slices of the API payloads.
//!
//! The remote schema is undocumented and shifts without notice, so only the
//! stable, money-bearing shapes get structs (amounts as `Decimal`, never
//! floats). Listing rows stay `serde_json::Value` and are handed to the
//! caller as-is.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use rust_decimal::Decimal;

/// One page of the loan listing.
#[derive(Debug, Clone, Deserialize)]
pub struct LoanPage {
    #[serde(default)]
    pub data: Vec<Value>,
    /// Pagination metadata and whatever else the listing sends along.
    #[serde(flatten)]
    pub meta: Map<String, Value>,
}

/// Borrower, loan, originator, pledge, and repayment schedule of one loan.
#[derive(Debug, Clone)]
pub struct LoanDetails {
    pub borrower: Option<Value>,
    pub loan: Option<Value>,
    pub originator: Option<Value>,
    pub pledge: Option<Value>,
    pub schedule: Vec<Value>,
}

impl<'de> Deserialize<'de> for LoanDetails {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            borrower: Option<Value>,
            loan: Option<Value>,
            originator: Option<Value>,
            pledge: Option<Value>,
            schedule: Option<RawSchedule>,
        }

        #[derive(Deserialize)]
        struct RawSchedule {
            #[serde(default)]
            data: Vec<Value>,
        }

        let raw = Raw::deserialize(deserializer)?;
        Ok(LoanDetails {
            borrower: raw.borrower,
            loan: raw.loan,
            originator: raw.originator,
            pledge: raw.pledge,
            schedule: raw.schedule.map(|schedule| schedule.data).unwrap_or_default(),
        })
    }
}

/// `/v1/investor/loyalty` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct LoyaltyTiers {
    #[serde(default)]
    pub items: Vec<LoyaltyItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoyaltyItem {
    pub title: String,
    #[serde(default)]
    pub locked: bool,
    pub percent: Option<Decimal>,
    #[serde(rename = "maxAmount")]
    pub max_amount: Option<Decimal>,
    #[serde(rename = "minAmount")]
    pub min_amount: Option<Decimal>,
}

/// Highest loyalty tier the account has unlocked.
#[derive(Debug, Clone, PartialEq)]
pub struct LoyaltyTier {
    pub tier: String,
    /// Extra annual return granted by the tier, in percent.
    pub extra_return_percent: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub min_amount: Option<Decimal>,
}

impl LoyaltyTiers {
    /// Tiers are ordered lowest to highest; the answer is the last unlocked
    /// one. An account below the first threshold has no tier.
    pub fn top_unlocked(&self) -> Option<LoyaltyTier> {
        self.items
            .iter()
            .filter(|item| !item.locked)
            .next_back()
            .map(|item| LoyaltyTier {
                tier: item.title.trim().to_string(),
                extra_return_percent: item.percent,
                max_amount: item.max_amount,
                min_amount: item.min_amount,
            })
    }
}

/// Transaction summary over a date window, `/v2/investor/account-summary`.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSummary {
    pub balance: BalanceSummary,
    pub cash_flow: CashFlowSummary,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BalanceSummary {
    pub opening_balance: Decimal,
    pub opening_date: Option<String>,
    pub closing_balance: Decimal,
    pub closing_date: Option<String>,
}

/// Aggregated operation totals. Absent operations read as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct CashFlowSummary {
    pub principal_payments: Decimal,
    pub interest_payments: Decimal,
    pub investment_payments: Decimal,
    pub deposits: Decimal,
    pub withdrawals: Decimal,
}

impl<'de> Deserialize<'de> for AccountSummary {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Raw {
            #[serde(default)]
            opening_balance: Option<Decimal>,
            #[serde(default)]
            opening_date: Option<String>,
            #[serde(default)]
            closing_balance: Option<Decimal>,
            #[serde(default)]
            closing_date: Option<String>,
            #[serde(default)]
            currency: Option<String>,
            #[serde(default)]
            operations: std::collections::HashMap<String, Option<Decimal>>,
        }

        let raw = Raw::deserialize(deserializer)?;
        let operation = |key: &str| {
            raw.operations
                .get(key)
                .and_then(|value| *value)
                .unwrap_or_default()
        };

        Ok(AccountSummary {
            balance: BalanceSummary {
                opening_balance: raw.opening_balance.unwrap_or_default(),
                opening_date: raw.opening_date,
                closing_balance: raw.closing_balance.unwrap_or_default(),
                closing_date: raw.closing_date,
            },
            cash_flow: CashFlowSummary {
                principal_payments: operation("PRINCIPAL"),
                interest_payments: operation("INTEREST"),
                investment_payments: operation("INVESTMENT"),
                deposits: operation("DEPOSIT"),
                withdrawals: operation("WITHDRAWAL"),
            },
            currency: raw.currency,
        })
    }
}
