//! # Application State
//!
//! Everything a handler needs, cloned into each request by axum.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          AppState                                       │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────────┐  ┌──────────────────────────┐  │
//! │  │  Database    │  │  Gateways        │  │  SessionStore            │  │
//! │  │  (SqlitePool)│  │  Arc<dyn Trait>  │  │  Arc<Mutex<HashMap<      │  │
//! │  │              │  │  address lookup  │  │    Uuid, CheckoutSession │  │
//! │  │  orders      │  │  shipping quoter │  │  >>>                     │  │
//! │  │  wallets     │  │  payments        │  │  removed on Success or   │  │
//! │  │  invoices    │  │                  │  │  after sitting idle      │  │
//! │  └──────────────┘  └──────────────────┘  └──────────────────────────┘  │
//! │                                                                         │
//! │  offer + coupon book (read-only)   clock (fixed in tests)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The session mutex is never held across an `.await`: handlers take what
//! they need, release the lock, call out, then lock again to record the
//! result.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use prolipsi_core::checkout::{CheckoutOffer, CheckoutSession, CouponBook};
use prolipsi_core::late_fee::today_in_brasilia;
use prolipsi_db::Database;
use prolipsi_gateway::{AddressLookup, PaymentGateway, ShippingQuoter};

/// Source of "now". Production uses `Utc::now`.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub address_lookup: Arc<dyn AddressLookup>,
    /// `None` when no live quote service is configured.
    pub shipping: Option<Arc<dyn ShippingQuoter>>,
    pub shipping_timeout: Duration,
    pub payments: Arc<dyn PaymentGateway>,
    pub offer: Arc<CheckoutOffer>,
    pub coupons: Arc<CouponBook>,
    pub sessions: SessionStore,
    pub clock: Clock,
}

impl AppState {
    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Civil date in Brasília; due dates and late fees are counted in it.
    pub fn today(&self) -> NaiveDate {
        today_in_brasilia(self.now())
    }

    pub fn shipping_quoter(&self) -> Option<&dyn ShippingQuoter> {
        self.shipping.as_deref()
    }
}

#[derive(Debug)]
struct StoredSession {
    session: CheckoutSession,
    touched_at: Instant,
}

/// Open checkout sessions.
///
/// A session leaves the store when its checkout succeeds, or when
/// [`SessionStore::purge_idle`] finds it untouched for too long.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<Uuid, StoredSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> ApiResult<std::sync::MutexGuard<'_, HashMap<Uuid, StoredSession>>> {
        self.sessions
            .lock()
            .map_err(|_| ApiError::internal("Session store unavailable"))
    }

    pub fn insert(&self, session: CheckoutSession) -> ApiResult<()> {
        let stored = StoredSession {
            touched_at: Instant::now(),
            session,
        };
        self.lock()?.insert(stored.session.id, stored);
        Ok(())
    }

    /// Runs `f` on the session while holding the lock. Counts as activity
    /// for [`SessionStore::purge_idle`].
    pub fn with_session<F, R>(&self, id: Uuid, f: F) -> ApiResult<R>
    where
        F: FnOnce(&mut CheckoutSession) -> ApiResult<R>,
    {
        let mut sessions = self.lock()?;
        let stored = sessions
            .get_mut(&id)
            .ok_or_else(|| ApiError::not_found("Checkout session", &id.to_string()))?;
        stored.touched_at = Instant::now();
        f(&mut stored.session)
    }

    pub fn remove(&self, id: Uuid) -> ApiResult<Option<CheckoutSession>> {
        Ok(self.lock()?.remove(&id).map(|stored| stored.session))
    }

    /// Drops sessions untouched for at least `max_idle`. Returns how many
    /// were dropped.
    pub fn purge_idle(&self, max_idle: Duration) -> usize {
        let Ok(mut sessions) = self.sessions.lock() else {
            return 0;
        };
        let before = sessions.len();
        sessions.retain(|_, stored| stored.touched_at.elapsed() < max_idle);
        let purged = before - sessions.len();
        if purged > 0 {
            debug!(purged, remaining = sessions.len(), "Idle checkout sessions dropped");
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prolipsi_core::Money;

    #[test]
    fn test_session_store() {
        let store = SessionStore::new();
        let session = CheckoutSession::new(crate::config::LoadedOffer::default().offer, Money::zero());
        let id = session.id;
        store.insert(session).unwrap();
        assert_eq!(store.len(), 1);

        let quantity = store
            .with_session(id, |session| {
                session.set_quantity(3)?;
                Ok(session.quantity)
            })
            .unwrap();
        assert_eq!(quantity, 3);

        let missing = store.with_session(Uuid::new_v4(), |_| Ok(()));
        assert!(missing.is_err());

        assert_eq!(store.remove(id).unwrap().map(|s| s.quantity), Some(3));
        assert!(store.is_empty());
        assert!(store.remove(id).unwrap().is_none());
    }

    #[test]
    fn test_purge_idle_sessions() {
        let store = SessionStore::new();
        let offer = crate::config::LoadedOffer::default().offer;
        store.insert(CheckoutSession::new(offer.clone(), Money::zero())).unwrap();
        store.insert(CheckoutSession::new(offer, Money::zero())).unwrap();

        assert_eq!(store.purge_idle(Duration::from_secs(3600)), 0);
        assert_eq!(store.len(), 2);

        assert_eq!(store.purge_idle(Duration::ZERO), 2);
        assert!(store.is_empty());
    }
}
