//! Common interface over the lookup engines

use crate::cancel::CancelToken;
use crate::error::{LoadError, LookupError};
use crate::exact_db::ExactDatabase;
use crate::range_db::RangeDatabase;
use crate::stats::Stats;
use std::sync::Arc;

/// IP → country code lookup service
///
/// Implemented by [`RangeDatabase`] and [`ExactDatabase`]. The trait is
/// object safe, so integrators (request middleware, log enrichers) can
/// hold either engine as `Arc<dyn CountryLookup + Send + Sync>`.
///
/// ```rust,no_run
/// use ip2country::{CountryLookup, ExactDatabase, RangeDatabase};
/// use std::sync::Arc;
///
/// fn pick(exact: bool) -> Arc<dyn CountryLookup + Send + Sync> {
///     if exact {
///         Arc::new(ExactDatabase::with_defaults("hosts.csv"))
///     } else {
///         Arc::new(RangeDatabase::with_defaults("ranges.csv"))
///     }
/// }
///
/// let db = pick(false);
/// let code = db.lookup("8.8.8.8").ok();
/// ```
pub trait CountryLookup {
    /// Country code for an address string
    fn lookup(&self, ip: &str) -> Result<Arc<str>, LookupError>;

    /// Like [`lookup`](Self::lookup); a first-use load observes `cancel`
    fn lookup_with_cancel(&self, ip: &str, cancel: &CancelToken)
        -> Result<Arc<str>, LookupError>;

    /// Discard the dataset and cache and load the source again
    fn reload(&self) -> Result<(), LoadError>;

    /// Like [`reload`](Self::reload), aborting when `cancel` fires
    fn reload_with_cancel(&self, cancel: &CancelToken) -> Result<(), LoadError>;

    /// Statistics snapshot
    fn stats(&self) -> Stats;
}

macro_rules! impl_country_lookup {
    ($engine:ty) => {
        impl CountryLookup for $engine {
            fn lookup(&self, ip: &str) -> Result<Arc<str>, LookupError> {
                <$engine>::lookup(self, ip)
            }

            fn lookup_with_cancel(
                &self,
                ip: &str,
                cancel: &CancelToken,
            ) -> Result<Arc<str>, LookupError> {
                <$engine>::lookup_with_cancel(self, ip, cancel)
            }

            fn reload(&self) -> Result<(), LoadError> {
                <$engine>::reload(self)
            }

            fn reload_with_cancel(&self, cancel: &CancelToken) -> Result<(), LoadError> {
                <$engine>::reload_with_cancel(self, cancel)
            }

            fn stats(&self) -> Stats {
                <$engine>::stats(self)
            }
        }
    };
}

impl_country_lookup!(RangeDatabase);
impl_country_lookup!(ExactDatabase);
