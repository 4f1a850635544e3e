//! Filter parameters and their query-string mapping.
//!
//! Sorts, loan types, transaction types, and periodicities are closed sets on
//! the remote side, so they are enums here; the query grammar
//! (`countryIds[0]`, `-` prefixed descending sorts, 0/1 booleans) is encoded
//! in one place. Country and originator names still need the remote registry
//! to resolve into ids.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::registry::GlobalRegistry;

/// Hard page cap the loan and investment listings enforce server-side.
pub const MAX_PAGE_SIZE: usize = 40;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("quantity must be at least 1")]
    EmptyQuantity,
    #[error("page size must be between 1 and {MAX_PAGE_SIZE}")]
    PageSizeOutOfRange,
    #[error("unknown country: {0}")]
    UnknownCountry(String),
    #[error("unknown originator: {0}")]
    UnknownOriginator(String),
    #[error("sort {0:?} only applies to finished investments")]
    SortRequiresFinished(InvestmentSort),
}

/// Profit overview granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Periodicity {
    Day,
    Month,
    Year,
}

impl Periodicity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Periodicity::Day => "day",
            Periodicity::Month => "month",
            Periodicity::Year => "year",
        }
    }
}

/// Relative date windows the transaction listing understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionPeriodicity {
    Today,
    ThisWeek,
    ThisMonth,
}

impl TransactionPeriodicity {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionPeriodicity::Today => "today",
            TransactionPeriodicity::ThisWeek => "thisWeek",
            TransactionPeriodicity::ThisMonth => "thisMonth",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanType {
    ShortTerm,
    LongTerm,
    RealEstate,
    Leasing,
    Business,
}

impl LoanType {
    pub fn id(&self) -> u8 {
        match self {
            LoanType::ShortTerm => 1,
            LoanType::LongTerm => 2,
            LoanType::RealEstate => 3,
            LoanType::Leasing => 4,
            LoanType::Business => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    PrincipalRepayment,
    InterestPayment,
    Investment,
    FeesAndBonuses,
}

impl TransactionType {
    pub fn id(&self) -> u8 {
        match self {
            TransactionType::Deposit => 1,
            TransactionType::Withdrawal => 2,
            TransactionType::PrincipalRepayment => 3,
            TransactionType::InterestPayment => 4,
            TransactionType::Investment => 11,
            TransactionType::FeesAndBonuses => 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanSort {
    LoanId,
    Term,
    IssuedDate,
    InterestRate,
    LoanAmount,
}

impl LoanSort {
    pub fn field(&self) -> &'static str {
        match self {
            LoanSort::LoanId => "loanId",
            LoanSort::Term => "term",
            LoanSort::IssuedDate => "issuedDate",
            LoanSort::InterestRate => "interestRate",
            LoanSort::LoanAmount => "availableToInvest",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvestmentSort {
    PurchaseDate,
    InterestRate,
    LoanAmount,
    EstimatedFinalPaymentDate,
    /// Only meaningful for finished investments.
    FinalPaymentDate,
}

impl InvestmentSort {
    pub fn field(&self) -> &'static str {
        match self {
            InvestmentSort::PurchaseDate => "dateOfPurchase",
            InvestmentSort::InterestRate => "interestRate",
            InvestmentSort::LoanAmount => "amount",
            InvestmentSort::EstimatedFinalPaymentDate => "estimatedFinalPaymentDate",
            InvestmentSort::FinalPaymentDate => "finishedAt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvestmentStatus {
    Current,
    Finished,
}

impl InvestmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvestmentStatus::Current => "CURRENT",
            InvestmentStatus::Finished => "FINISHED",
        }
    }
}

/// Descending is the listing default; ascending drops the `-` prefix.
fn sort_param(field: &str, ascending: bool) -> String {
    if ascending {
        field.to_string()
    } else {
        format!("-{field}")
    }
}

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

fn push_country_ids(
    query: &mut Vec<(String, String)>,
    countries: &[String],
    registry: &GlobalRegistry,
) -> Result<(), FilterError> {
    for (idx, country) in countries.iter().enumerate() {
        let id = registry
            .country_id(country)
            .ok_or_else(|| FilterError::UnknownCountry(country.clone()))?;
        query.push((format!("countryIds[{idx}]"), id.to_string()));
    }
    Ok(())
}

/// Filters for the primary-market loan listing.
#[derive(Debug, Clone, Default)]
pub struct LoanFilter {
    pub min_remaining_term: Option<u32>,
    pub max_remaining_term: Option<u32>,
    pub min_interest_rate: Option<Decimal>,
    pub max_interest_rate: Option<Decimal>,
    pub min_available_amount: Option<Decimal>,
    pub max_available_amount: Option<Decimal>,
    pub countries: Vec<String>,
    pub originators: Vec<String>,
    pub loan_types: Vec<LoanType>,
    pub sort: Option<LoanSort>,
    pub ascending: bool,
    pub group_guarantee: Option<bool>,
    pub exclude_invested: Option<bool>,
}

impl LoanFilter {
    /// Builds the query for one listing page. `page_size` is capped by the
    /// server at [`MAX_PAGE_SIZE`]; `offset` is in rows, not pages.
    pub fn query_pairs(
        &self,
        page_size: usize,
        offset: usize,
        registry: &GlobalRegistry,
    ) -> Result<Vec<(String, String)>, FilterError> {
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(FilterError::PageSizeOutOfRange);
        }

        let sort = self.sort.unwrap_or(LoanSort::LoanAmount);
        let mut query = vec![
            ("sort".to_string(), sort_param(sort.field(), self.ascending)),
            ("pageSize".to_string(), page_size.to_string()),
            ("offset".to_string(), offset.to_string()),
        ];

        if let Some(term) = self.max_remaining_term {
            query.push(("maxRemainingTerm".to_string(), term.to_string()));
        }
        if let Some(term) = self.min_remaining_term {
            query.push(("minRemainingTerm".to_string(), term.to_string()));
        }
        if let Some(rate) = self.max_interest_rate {
            query.push(("maxInterestRate".to_string(), rate.to_string()));
        }
        if let Some(rate) = self.min_interest_rate {
            query.push(("minInterestRate".to_string(), rate.to_string()));
        }
        if let Some(amount) = self.max_available_amount {
            query.push(("maxRemainingAmount".to_string(), amount.to_string()));
        }
        if let Some(amount) = self.min_available_amount {
            query.push(("minRemainingAmount".to_string(), amount.to_string()));
        }
        if let Some(guarantee) = self.group_guarantee {
            query.push(("groupGuarantee".to_string(), flag(guarantee).to_string()));
        }
        if let Some(hide) = self.exclude_invested {
            query.push(("hideInvested".to_string(), flag(hide).to_string()));
        }

        push_country_ids(&mut query, &self.countries, registry)?;

        // Grouped originators expand into several ids, so the index runs
        // over the expansion, not the input list.
        let mut originator_idx = 0usize;
        for originator in &self.originators {
            let ids = registry
                .originator_ids(originator)
                .ok_or_else(|| FilterError::UnknownOriginator(originator.clone()))?;
            for id in ids {
                query.push((format!("loanOriginators[{originator_idx}]"), id.to_string()));
                originator_idx += 1;
            }
        }

        for (idx, loan_type) in self.loan_types.iter().enumerate() {
            query.push((format!("loanTermId[{idx}]"), loan_type.id().to_string()));
        }

        Ok(query)
    }
}

/// Filters for the investment listing.
#[derive(Debug, Clone)]
pub struct InvestmentFilter {
    pub status: InvestmentStatus,
    pub min_date_of_purchase: Option<NaiveDate>,
    pub max_date_of_purchase: Option<NaiveDate>,
    pub min_interest_rate: Option<Decimal>,
    pub max_interest_rate: Option<Decimal>,
    pub min_invested_amount: Option<Decimal>,
    pub max_invested_amount: Option<Decimal>,
    pub countries: Vec<String>,
    pub loan_types: Vec<LoanType>,
    pub sort: Option<InvestmentSort>,
    pub ascending: bool,
}

impl Default for InvestmentFilter {
    fn default() -> Self {
        Self {
            status: InvestmentStatus::Current,
            min_date_of_purchase: None,
            max_date_of_purchase: None,
            min_interest_rate: None,
            max_interest_rate: None,
            min_invested_amount: None,
            max_invested_amount: None,
            countries: Vec::new(),
            loan_types: Vec::new(),
            sort: None,
            ascending: false,
        }
    }
}

impl InvestmentFilter {
    pub fn query_pairs(
        &self,
        page_size: usize,
        offset: usize,
        registry: &GlobalRegistry,
    ) -> Result<Vec<(String, String)>, FilterError> {
        if page_size == 0 {
            return Err(FilterError::EmptyQuantity);
        }

        let sort = self.sort.unwrap_or(InvestmentSort::LoanAmount);
        if sort == InvestmentSort::FinalPaymentDate && self.status != InvestmentStatus::Finished {
            return Err(FilterError::SortRequiresFinished(sort));
        }

        let mut query = vec![
            ("sort".to_string(), sort_param(sort.field(), self.ascending)),
            ("pageSize".to_string(), page_size.to_string()),
            ("type".to_string(), self.status.as_str().to_string()),
            ("offset".to_string(), offset.to_string()),
        ];

        if let Some(date) = self.max_date_of_purchase {
            query.push(("maxDateOfPurchase".to_string(), date.to_string()));
        }
        if let Some(date) = self.min_date_of_purchase {
            query.push(("minDateOfPurchase".to_string(), date.to_string()));
        }
        if let Some(rate) = self.max_interest_rate {
            query.push(("maxInterestRate".to_string(), rate.to_string()));
        }
        if let Some(rate) = self.min_interest_rate {
            query.push(("minInterestRate".to_string(), rate.to_string()));
        }
        if let Some(amount) = self.max_invested_amount {
            query.push(("maxAmount".to_string(), amount.to_string()));
        }
        if let Some(amount) = self.min_invested_amount {
            query.push(("minAmount".to_string(), amount.to_string()));
        }

        push_country_ids(&mut query, &self.countries, registry)?;

        for (idx, loan_type) in self.loan_types.iter().enumerate() {
            query.push((format!("loanTermId[{idx}]"), loan_type.id().to_string()));
        }

        Ok(query)
    }
}

/// Filters for the cash-flow (transaction) listing.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub page_size: Option<usize>,
    pub start_page: usize,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub periodicity: Option<TransactionPeriodicity>,
    pub transaction_types: Vec<TransactionType>,
}

impl TransactionFilter {
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();

        if let Some(page_size) = self.page_size {
            query.push(("pageSize".to_string(), page_size.to_string()));
            query.push(("offset".to_string(), (page_size * self.start_page).to_string()));
        }
        if let Some(date) = self.start_date {
            query.push(("startDate".to_string(), date.to_string()));
        }
        if let Some(date) = self.end_date {
            query.push(("endDate".to_string(), date.to_string()));
        }
        for (idx, transaction_type) in self.transaction_types.iter().enumerate() {
            query.push((
                format!("transactionType[{idx}]"),
                transaction_type.id().to_string(),
            ));
        }
        if let Some(periodicity) = self.periodicity {
            query.push(("periodicity".to_string(), periodicity.as_str().to_string()));
        }

        query
    }
}
