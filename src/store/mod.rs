//! Record stores consumed by the lifecycle coordinator.
//!
//! Every store is keyed by record id. `claim_by_id` is the only conditional
//! mutation: it removes and returns a record in one step, so two callers
//! racing for the same record can never both observe it.

mod memory;

pub use memory::MemoryStore;

use thiserror::Error;
use uuid::Uuid;

use crate::models::delivery::{AcceptedDelivery, AcceptedStatus, PendingDelivery, PendingStatus};
use crate::models::donation::{DeliveryStatus, Donation};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{collection} already holds record {id}")]
    Duplicate { collection: &'static str, id: Uuid },

    #[error("{collection} store unavailable: {reason}")]
    Unavailable {
        collection: &'static str,
        reason: String,
    },
}

pub trait Record: Clone + Send + Sync + 'static {
    type Status: PartialEq + Send + Sync;

    const COLLECTION: &'static str;

    fn id(&self) -> Uuid;
    fn status(&self) -> Self::Status;
}

impl Record for Donation {
    type Status = DeliveryStatus;

    const COLLECTION: &'static str = "donations";

    fn id(&self) -> Uuid {
        self.id
    }

    fn status(&self) -> DeliveryStatus {
        self.delivery_status
    }
}

impl Record for PendingDelivery {
    type Status = PendingStatus;

    const COLLECTION: &'static str = "pending_deliveries";

    fn id(&self) -> Uuid {
        self.id
    }

    fn status(&self) -> PendingStatus {
        self.status
    }
}

impl Record for AcceptedDelivery {
    type Status = AcceptedStatus;

    const COLLECTION: &'static str = "accepted_deliveries";

    fn id(&self) -> Uuid {
        self.id
    }

    fn status(&self) -> AcceptedStatus {
        self.status
    }
}

pub trait Store<T: Record>: Send + Sync {
    fn create(&self, record: T) -> Result<T, StoreError>;

    fn find_by_id(&self, id: &Uuid) -> Result<Option<T>, StoreError>;

    fn find_many(&self, filter: &dyn Fn(&T) -> bool) -> Result<Vec<T>, StoreError>;

    /// Applies `patch` while holding the record exclusively and returns the
    /// patched copy, or `None` when the id is unknown.
    fn update_by_id(
        &self,
        id: &Uuid,
        patch: &mut dyn FnMut(&mut T),
    ) -> Result<Option<T>, StoreError>;

    fn delete_by_id(&self, id: &Uuid) -> Result<Option<T>, StoreError>;

    /// Removes the record only if its status still equals `expected`.
    fn claim_by_id(&self, id: &Uuid, expected: &T::Status) -> Result<Option<T>, StoreError>;

    fn count(&self) -> Result<usize, StoreError>;
}
