//! Primary-market loan endpoints: listing, details, agreements, purchase.

use bytes::Bytes;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::client::{Peerberry, PeerberryError, PeerberryResult};
use crate::endpoints;
use crate::filters::{FilterError, LoanFilter, MAX_PAGE_SIZE};
use crate::models::LoanDetails;

impl Peerberry {
    /// One page of the loan listing. `page_size` is capped server-side at
    /// [`MAX_PAGE_SIZE`]; the row offset is `page * page_size`.
    pub async fn get_loans_page(
        &self,
        page: usize,
        page_size: usize,
        filter: &LoanFilter,
    ) -> PeerberryResult<crate::models::LoanPage> {
        let registry = self.registry().await?;
        let query = filter.query_pairs(page_size, page * page_size, registry)?;
        self.get_typed(endpoints::LOANS, &query).await
    }

    /// Up to `quantity` loans matching the filter, accumulated across
    /// full-size pages starting at `start_page`. The loop stops as soon as
    /// the server reports an empty page.
    pub async fn get_loans(
        &self,
        quantity: usize,
        start_page: usize,
        filter: &LoanFilter,
    ) -> PeerberryResult<Vec<Value>> {
        if quantity == 0 {
            return Err(FilterError::EmptyQuantity.into());
        }

        let mut loans = Vec::with_capacity(quantity.min(MAX_PAGE_SIZE * 8));
        let mut page = start_page;

        while loans.len() < quantity {
            let mut batch = self.get_loans_page(page, MAX_PAGE_SIZE, filter).await?;
            if batch.data.is_empty() {
                break;
            }
            loans.append(&mut batch.data);
            page += 1;
        }

        loans.truncate(quantity);
        Ok(loans)
    }

    /// Borrower data, loan data, and the repayment schedule of one loan.
    pub async fn get_loan_details(&self, loan_id: u64) -> PeerberryResult<LoanDetails> {
        let path = format!("{}/{loan_id}", endpoints::LOANS);
        self.get_typed(&path, &[]).await
    }

    /// Loan agreement document, raw bytes. Only available for loans the
    /// account has invested in.
    pub async fn get_agreement(&self, loan_id: u64, lang: &str) -> PeerberryResult<Bytes> {
        let path = format!("{}/{loan_id}/agreement", endpoints::AGREEMENTS);
        let query = [("lang".to_string(), lang.to_string())];
        self.get_bytes(&path, &query).await
    }

    /// Invests `amount` (EUR) into a loan. The response carries an order id,
    /// not a transaction id. Rejections surface as
    /// [`PeerberryError::InsufficientFunds`].
    pub async fn purchase_loan(&self, loan_id: u64, amount: Decimal) -> PeerberryResult<Value> {
        let path = format!("{}/{loan_id}", endpoints::LOANS);
        let form = vec![("amount".to_string(), amount.to_string())];

        self.post_form(&path, form).await.map_err(|err| match err {
            PeerberryError::Api { message, .. } => PeerberryError::InsufficientFunds(message),
            other => other,
        })
    }
}
