use std::collections::HashMap;

use log::*;
use mesa_common::helpers::round1;

use crate::{
    db_types::RatingSummary,
    traits::{OrderApiError, OrderManagement},
};

/// `RatingApi` derives the public reputation scores shown on establishment listings. The aggregate is recomputed
/// on every call rather than maintained incrementally, trading recompute cost for always-fresh values.
#[derive(Debug, Clone)]
pub struct RatingApi<B> {
    db: B,
}

impl<B> RatingApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> RatingApi<B>
where B: OrderManagement
{
    /// Per-establishment `{average, count}` over served, rated orders. Every requested establishment appears in
    /// the result; those with no qualifying orders report `{average: 0, count: 0}`. Averages are rounded to one
    /// decimal place.
    pub async fn public_ratings(
        &self,
        establishment_ids: &[String],
    ) -> Result<HashMap<String, RatingSummary>, OrderApiError> {
        let mut ratings = self.db.aggregate_ratings(establishment_ids).await?;
        for (_, summary) in ratings.iter_mut() {
            summary.average = round1(summary.average);
        }
        for id in establishment_ids {
            ratings.entry(id.clone()).or_default();
        }
        trace!("⭐️ Computed ratings for {} establishment(s)", establishment_ids.len());
        Ok(ratings)
    }
}
