//! Purchase-execution engine: finite and bulk executors, the continuous
//! top-up loop, and the progress-reporting contract.

pub mod continuous;
pub mod executor;
pub mod progress;

pub use continuous::{ContinuousLoop, FarmTarget};
pub use executor::{JobSummary, PurchaseExecutor};
pub use progress::{ConsoleSink, ProgressSink};

use crate::catalog::PurchasableItem;
use serde::Serialize;

/// Wire body of a single purchase request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchasePayload {
    pub item_id: String,
    pub price: u64,
    pub discounted_price: u64,
    pub currency_code: String,
}

impl From<&PurchasableItem> for PurchasePayload {
    fn from(item: &PurchasableItem) -> Self {
        Self {
            item_id: item.item_id.clone(),
            price: item.price,
            discounted_price: item.price,
            currency_code: item.currency.clone(),
        }
    }
}

/// Classification of one purchase attempt. Produced once per attempt and
/// consumed by the progress sink; per-attempt failures never abort a batch.
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    Success,
    Http { status: u16, body: String },
    Network(String),
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success)
    }
}
