//! Investment portfolio endpoints.

use bytes::Bytes;
use serde_json::Value;

use crate::client::{Peerberry, PeerberryResult, rows_from};
use crate::endpoints;
use crate::filters::{FilterError, InvestmentFilter, InvestmentStatus};

impl Peerberry {
    /// Up to `quantity` current or finished investments matching the filter.
    /// One request; the server accepts page sizes well beyond the loan
    /// listing cap here. For whole-portfolio pulls prefer
    /// [`Peerberry::get_mass_investments`].
    pub async fn get_investments(
        &self,
        quantity: usize,
        start_page: usize,
        filter: &InvestmentFilter,
    ) -> PeerberryResult<Vec<Value>> {
        if quantity == 0 {
            return Err(FilterError::EmptyQuantity.into());
        }

        let registry = self.registry().await?;
        let query = filter.query_pairs(quantity, quantity * start_page, registry)?;
        let value = self.get_value(endpoints::INVESTMENTS, &query).await?;
        rows_from(value)
    }

    /// Whole-portfolio export as spreadsheet bytes, optionally restricted by
    /// country. The workbook is returned unparsed.
    pub async fn get_mass_investments(
        &self,
        status: InvestmentStatus,
        countries: &[String],
    ) -> PeerberryResult<Bytes> {
        let registry = self.registry().await?;

        let mut query = vec![
            ("type".to_string(), status.as_str().to_string()),
            ("lang".to_string(), "en".to_string()),
        ];
        for (idx, country) in countries.iter().enumerate() {
            let id = registry
                .country_id(country)
                .ok_or_else(|| FilterError::UnknownCountry(country.clone()))?;
            query.push((format!("countryIds[{idx}]"), id.to_string()));
        }

        self.get_bytes(endpoints::INVESTMENTS_EXPORT, &query).await
    }
}
