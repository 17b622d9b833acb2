//! Manual refresher, the default when no automated login flow exists.
//!
//! Every attempt logs that the account needs a manual refresh through the
//! admin panel and reports `ManualRequired`.

use std::future::Future;
use std::pin::Pin;

use account_store::Account;
use tracing::warn;

use crate::{RefreshOutcome, Refresher};

/// Refresher that always defers to an operator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualRefresher;

impl ManualRefresher {
    pub fn new() -> Self {
        Self
    }
}

impl Refresher for ManualRefresher {
    fn id(&self) -> &str {
        "manual"
    }

    fn refresh<'a>(
        &'a self,
        index: usize,
        _account: &'a Account,
    ) -> Pin<Box<dyn Future<Output = crate::Result<RefreshOutcome>> + Send + 'a>> {
        Box::pin(async move {
            warn!(
                account_index = index,
                "manual refresh required via the admin panel"
            );
            Ok(RefreshOutcome::ManualRequired)
        })
    }
}
