//! Cash-flow (transaction) endpoints.

use bytes::Bytes;
use serde_json::Value;

use crate::client::{Peerberry, PeerberryResult, rows_from};
use crate::endpoints;
use crate::filters::TransactionFilter;

impl Peerberry {
    /// Transactions matching the filter. Without a `page_size` the server
    /// returns everything in the date window.
    pub async fn get_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> PeerberryResult<Vec<Value>> {
        let query = filter.query_pairs();
        let value = self.get_value(endpoints::TRANSACTIONS, &query).await?;
        rows_from(value)
    }

    /// Transaction export as spreadsheet bytes. Paging fields on the filter
    /// are ignored; the export always covers the whole date window.
    pub async fn get_mass_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> PeerberryResult<Bytes> {
        let mut query = Vec::new();
        if let Some(date) = filter.start_date {
            query.push(("startDate".to_string(), date.to_string()));
        }
        if let Some(date) = filter.end_date {
            query.push(("endDate".to_string(), date.to_string()));
        }
        for (idx, transaction_type) in filter.transaction_types.iter().enumerate() {
            query.push((
                format!("transactionType[{idx}]"),
                transaction_type.id().to_string(),
            ));
        }
        if let Some(periodicity) = filter.periodicity {
            query.push(("periodicity".to_string(), periodicity.as_str().to_string()));
        }
        query.push(("lang".to_string(), "en".to_string()));

        self.get_bytes(endpoints::TRANSACTIONS_EXPORT, &query).await
    }
}
