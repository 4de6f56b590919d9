use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::models::delivery::{AcceptedDelivery, PendingDelivery, PendingStatus};
use crate::models::donation::DeliveryRoute;
use crate::store::{Store, StoreError};

/// Pending-delivery queue plus the ledger of deliveries agents have claimed.
pub struct DeliveryQueue {
    pending: Arc<dyn Store<PendingDelivery>>,
    accepted: Arc<dyn Store<AcceptedDelivery>>,
}

impl DeliveryQueue {
    pub fn new(
        pending: Arc<dyn Store<PendingDelivery>>,
        accepted: Arc<dyn Store<AcceptedDelivery>>,
    ) -> Self {
        Self { pending, accepted }
    }

    pub fn enqueue(
        &self,
        donation_id: Uuid,
        route: &DeliveryRoute,
    ) -> Result<PendingDelivery, StoreError> {
        self.pending.create(PendingDelivery {
            id: Uuid::new_v4(),
            donation_id,
            delivery_charge: route.charge,
            pickup_location: route.pickup_location.clone(),
            drop_location: route.drop_location.clone(),
            status: PendingStatus::Pending,
            created_at: Utc::now(),
        })
    }

    /// Drops every live ticket for the donation except `keep`. Returns how many were removed.
    pub fn withdraw(&self, donation_id: Uuid, keep: Option<Uuid>) -> Result<usize, StoreError> {
        let stale = self.pending.find_many(&|pending| {
            pending.donation_id == donation_id && Some(pending.id) != keep
        })?;

        let mut removed = 0;
        for ticket in stale {
            if self.pending.delete_by_id(&ticket.id)?.is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn ticket(&self, id: &Uuid) -> Result<Option<PendingDelivery>, StoreError> {
        self.pending.find_by_id(id)
    }

    pub fn tickets_for(&self, donation_id: Uuid) -> Result<Vec<PendingDelivery>, StoreError> {
        self.pending
            .find_many(&|pending| pending.donation_id == donation_id)
    }

    /// Consumes the ticket. At most one caller gets `Some` for a given id.
    pub fn claim(&self, id: &Uuid) -> Result<Option<PendingDelivery>, StoreError> {
        self.pending.claim_by_id(id, &PendingStatus::Pending)
    }

    /// Puts a claimed ticket back after the acceptance could not be recorded.
    pub fn restore(&self, ticket: PendingDelivery) -> Result<(), StoreError> {
        self.pending.create(ticket).map(|_| ())
    }

    pub fn record_acceptance(
        &self,
        accepted: AcceptedDelivery,
    ) -> Result<AcceptedDelivery, StoreError> {
        self.accepted.create(accepted)
    }

    pub fn pending(
        &self,
        filter: &dyn Fn(&PendingDelivery) -> bool,
    ) -> Result<Vec<PendingDelivery>, StoreError> {
        let mut tickets = self.pending.find_many(filter)?;
        tickets.sort_by_key(|ticket| ticket.created_at);
        Ok(tickets)
    }

    pub fn accepted(&self, agent_id: Option<&str>) -> Result<Vec<AcceptedDelivery>, StoreError> {
        let mut deliveries = self
            .accepted
            .find_many(&|delivery| agent_id.is_none_or(|agent| delivery.agent_id == agent))?;
        deliveries.sort_by(|a, b| b.accepted_at.cmp(&a.accepted_at));
        Ok(deliveries)
    }

    pub fn pending_count(&self) -> Result<usize, StoreError> {
        self.pending.count()
    }

    pub fn accepted_count(&self) -> Result<usize, StoreError> {
        self.accepted.count()
    }
}
