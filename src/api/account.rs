//! Profile, overview, and account-level reporting endpoints.

use chrono::NaiveDate;
use serde_json::Value;

use crate::client::{Peerberry, PeerberryResult, rows_from};
use crate::endpoints;
use crate::filters::Periodicity;
use crate::models::{AccountSummary, LoyaltyTier, LoyaltyTiers};
use crate::registry::{CountryEntry, OriginatorEntry};

impl Peerberry {
    /// Basic account information: accounts, balances, investor details.
    pub async fn get_profile(&self) -> PeerberryResult<Value> {
        self.get_value(endpoints::PROFILE, &[]).await
    }

    /// Portfolio overview: available balance, total invested, total profit,
    /// net annual return, and friends.
    pub async fn get_overview(&self) -> PeerberryResult<Value> {
        self.get_value(endpoints::OVERVIEW, &[]).await
    }

    /// Highest unlocked loyalty tier, or `None` when the account is below
    /// the first threshold.
    pub async fn get_loyalty_tier(&self) -> PeerberryResult<Option<LoyaltyTier>> {
        let tiers: LoyaltyTiers = self.get_typed(endpoints::LOYALTY, &[]).await?;
        Ok(tiers.top_unlocked())
    }

    /// Profit rows over a date window, on a daily, monthly, or yearly basis.
    pub async fn get_profit_overview(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        periodicity: Periodicity,
    ) -> PeerberryResult<Vec<Value>> {
        let path = format!(
            "{}/{}/{}/{}",
            endpoints::PROFIT_OVERVIEW,
            start_date,
            end_date,
            periodicity.as_str()
        );
        let value = self.get_value(&path, &[]).await?;
        rows_from(value)
    }

    /// Share of funds in current loans versus late buckets (1-15, 16-30,
    /// 31-60 days).
    pub async fn get_investment_status(&self) -> PeerberryResult<Value> {
        self.get_value(endpoints::INVESTMENT_STATUS, &[]).await
    }

    /// Balance and cash-flow totals over a date window.
    pub async fn get_account_summary(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> PeerberryResult<AccountSummary> {
        let query = [
            ("startDate".to_string(), start_date.to_string()),
            ("endDate".to_string(), end_date.to_string()),
        ];
        self.get_typed(endpoints::ACCOUNT_SUMMARY, &query).await
    }

    /// Countries the platform currently lists, with their filter ids.
    pub async fn get_countries(&self) -> PeerberryResult<Vec<CountryEntry>> {
        let registry = self.registry().await?;
        Ok(registry.countries().into_values().cloned().collect())
    }

    /// Loan originators the platform currently lists, with their filter ids.
    pub async fn get_originators(&self) -> PeerberryResult<Vec<OriginatorEntry>> {
        let registry = self.registry().await?;
        Ok(registry.originators().into_values().cloned().collect())
    }
}
