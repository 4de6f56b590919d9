//! Donation lifecycle coordinator.
//!
//! The only component that mutates donation routing fields and the delivery
//! queue. Every mutation touching both happens while the donation record is
//! held exclusively by the store, so routing changes and agent claims on the
//! same donation are serialized. Lock order is always donation first, then
//! the pending queue, then the accepted ledger.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::messages;
use crate::engine::queue::DeliveryQueue;
use crate::error::AppError;
use crate::models::actor::{Actor, Role};
use crate::models::delivery::{
    AcceptedDelivery, PendingDelivery, PendingDeliveryView, PendingFilter,
};
use crate::models::donation::{
    DeliveryMethod, DeliveryMethodRequest, DeliveryRoute, DeliveryStatus, Donation,
    DonationFilter, DonationStatus, NewDonation,
};
use crate::models::notification::Notification;
use crate::notify::{Mail, Mailer, NotificationSink};
use crate::observability::metrics::Metrics;
use crate::store::{MemoryStore, Store};

pub struct Collaborators {
    pub donations: Arc<dyn Store<Donation>>,
    pub pending: Arc<dyn Store<PendingDelivery>>,
    pub accepted: Arc<dyn Store<AcceptedDelivery>>,
    pub notifier: Arc<dyn NotificationSink>,
    pub mailer: Arc<dyn Mailer>,
}

impl Collaborators {
    pub fn in_memory(notifier: Arc<dyn NotificationSink>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            donations: Arc::new(MemoryStore::<Donation>::new()),
            pending: Arc::new(MemoryStore::<PendingDelivery>::new()),
            accepted: Arc::new(MemoryStore::<AcceptedDelivery>::new()),
            notifier,
            mailer,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LifecycleStats {
    pub donations: usize,
    pub pending_deliveries: usize,
    pub accepted_deliveries: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub actor: Actor,
    pub donations: Vec<Donation>,
    pub deliveries: Vec<AcceptedDelivery>,
    pub notifications: Vec<Notification>,
}

pub struct Coordinator {
    donations: Arc<dyn Store<Donation>>,
    queue: DeliveryQueue,
    notifier: Arc<dyn NotificationSink>,
    mailer: Arc<dyn Mailer>,
    metrics: Arc<Metrics>,
    ngo_contact_email: String,
}

impl Coordinator {
    pub fn new(
        collaborators: Collaborators,
        metrics: Arc<Metrics>,
        ngo_contact_email: impl Into<String>,
    ) -> Self {
        Self {
            donations: collaborators.donations,
            queue: DeliveryQueue::new(collaborators.pending, collaborators.accepted),
            notifier: collaborators.notifier,
            mailer: collaborators.mailer,
            metrics,
            ngo_contact_email: ngo_contact_email.into(),
        }
    }

    pub fn record_donation(&self, actor: &Actor, fields: NewDonation) -> Result<Donation, AppError> {
        self.timed("record_donation", || {
            require_role(actor, Role::Donor, "record a donation")?;
            validate_new_donation(&fields)?;

            let now = Utc::now();
            let donation = self.donations.create(Donation {
                id: Uuid::new_v4(),
                food_name: fields.food_name.trim().to_string(),
                meal: non_blank(fields.meal),
                category: fields.category.trim().to_string(),
                quantity: fields.quantity.trim().to_string(),
                contact_name: non_blank(fields.contact_name),
                phone: non_blank(fields.phone),
                district: fields.district.trim().to_string(),
                address: fields.address.trim().to_string(),
                donor_id: actor.id.clone(),
                donor_email: non_blank(fields.donor_email),
                status: DonationStatus::Pending,
                accepted_by: None,
                delivery_method: DeliveryMethod::SelfPickup,
                delivery_charge: None,
                delivery_status: DeliveryStatus::NotAssigned,
                pickup_location: None,
                drop_location: None,
                created_at: now,
                updated_at: now,
            })?;

            self.metrics.donations_recorded_total.inc();
            info!(donation_id = %donation.id, donor_id = %actor.id, "donation recorded");
            Ok(donation)
        })
    }

    pub fn accept_donation(&self, actor: &Actor, donation_id: Uuid) -> Result<Donation, AppError> {
        let (donation, changed) = self.timed("accept_donation", || {
            require_role(actor, Role::Ngo, "accept a donation")?;

            let mut outcome = Err(AppError::Internal("donation review did not run".to_string()));
            let updated = self.donations.update_by_id(&donation_id, &mut |donation| {
                outcome = review(donation, &actor.id);
            })?;
            let donation = updated.ok_or_else(|| donation_not_found(donation_id))?;
            let changed = outcome?;
            Ok((donation, changed))
        })?;

        if changed {
            info!(donation_id = %donation.id, ngo_id = %actor.id, "donation accepted");
            self.notify_best_effort(&donation.donor_id, &messages::donation_accepted(&donation));
        }

        Ok(donation)
    }

    pub fn set_delivery_method(
        &self,
        actor: &Actor,
        donation_id: Uuid,
        request: DeliveryMethodRequest,
    ) -> Result<Donation, AppError> {
        let (donation, rerouted) = self.timed("set_delivery_method", || {
            require_role(actor, Role::Ngo, "set a delivery method")?;
            let route = validate_route(&request)?;

            let mut outcome = Err(AppError::Internal(
                "delivery method update did not run".to_string(),
            ));
            let updated = self.donations.update_by_id(&donation_id, &mut |donation| {
                outcome = self.reroute(donation, &actor.id, route.as_ref());
            })?;
            let donation = updated.ok_or_else(|| donation_not_found(donation_id))?;
            let rerouted = outcome?;
            Ok((donation, rerouted))
        })?;

        self.refresh_pending_gauge();

        if rerouted.accepted {
            info!(donation_id = %donation.id, ngo_id = %actor.id, "donation accepted while routing");
            self.notify_best_effort(&donation.donor_id, &messages::donation_accepted(&donation));
        }
        if rerouted.changed {
            info!(
                donation_id = %donation.id,
                ngo_id = %actor.id,
                method = ?donation.delivery_method,
                "delivery method updated"
            );
            self.notify_best_effort(
                &donation.donor_id,
                &messages::delivery_method_set(donation.delivery_method),
            );
        }

        Ok(donation)
    }

    pub fn accept_delivery(
        &self,
        actor: &Actor,
        pending_id: Uuid,
    ) -> Result<AcceptedDelivery, AppError> {
        let (accepted, donation) = self.timed("accept_delivery", || {
            require_role(actor, Role::Delivery, "accept a delivery")?;

            let ticket = self
                .queue
                .ticket(&pending_id)?
                .ok_or_else(|| delivery_gone(pending_id))?;

            let mut outcome = Err(AppError::Internal("delivery claim did not run".to_string()));
            let updated = self
                .donations
                .update_by_id(&ticket.donation_id, &mut |donation| {
                    outcome = self.claim_ticket(donation, pending_id, &actor.id);
                })?;
            let donation = updated.ok_or_else(|| donation_not_found(ticket.donation_id))?;
            let accepted = outcome?;
            Ok((accepted, donation))
        })?;

        self.refresh_pending_gauge();
        info!(
            pending_id = %pending_id,
            donation_id = %donation.id,
            agent_id = %actor.id,
            "delivery accepted"
        );
        self.announce_delivery(&accepted, &donation);

        Ok(accepted)
    }

    pub fn list_pending(
        &self,
        actor: &Actor,
        filter: &PendingFilter,
    ) -> Result<Vec<PendingDeliveryView>, AppError> {
        require_any(actor, &[Role::Delivery, Role::Ngo], "view pending deliveries")?;

        let tickets = self.queue.pending(&|ticket| {
            filter
                .donation_id
                .is_none_or(|donation_id| ticket.donation_id == donation_id)
        })?;

        let mut views = Vec::with_capacity(tickets.len());
        for pending in tickets {
            let Some(donation) = self.donations.find_by_id(&pending.donation_id)? else {
                warn!(pending_id = %pending.id, "pending delivery refers to a missing donation");
                continue;
            };
            let outside_district = filter
                .district
                .as_ref()
                .is_some_and(|district| !donation.district.eq_ignore_ascii_case(district));
            if !outside_district {
                views.push(PendingDeliveryView { pending, donation });
            }
        }

        Ok(views)
    }

    pub fn list_accepted(
        &self,
        actor: &Actor,
        agent_id: Option<&str>,
    ) -> Result<Vec<AcceptedDelivery>, AppError> {
        match actor.role {
            Role::Delivery => {
                if agent_id.is_some_and(|agent| agent != actor.id) {
                    return Err(forbidden(actor, "view another agent's deliveries"));
                }
                Ok(self.queue.accepted(Some(actor.id.as_str()))?)
            }
            Role::Ngo => Ok(self.queue.accepted(agent_id)?),
            Role::Donor => Err(forbidden(actor, "view accepted deliveries")),
        }
    }

    pub fn list_donations(
        &self,
        actor: &Actor,
        filter: DonationFilter,
    ) -> Result<Vec<Donation>, AppError> {
        let filter = match actor.role {
            Role::Donor => DonationFilter {
                donor_id: Some(actor.id.clone()),
                ..filter
            },
            Role::Ngo => filter,
            Role::Delivery => return Err(forbidden(actor, "list donations")),
        };

        let mut donations = self.donations.find_many(&|donation| filter.matches(donation))?;
        newest_first(&mut donations);
        Ok(donations)
    }

    /// Accepted donations still waiting for an agent, or routed to self pickup.
    pub fn ngo_dashboard(&self, actor: &Actor) -> Result<Vec<Donation>, AppError> {
        require_role(actor, Role::Ngo, "view the NGO dashboard")?;

        let mut donations = self.donations.find_many(&|donation| {
            donation.status == DonationStatus::Accepted
                && donation.delivery_status != DeliveryStatus::AcceptedDelivery
        })?;
        newest_first(&mut donations);
        Ok(donations)
    }

    pub fn donation(&self, actor: &Actor, donation_id: Uuid) -> Result<Donation, AppError> {
        let donation = self
            .donations
            .find_by_id(&donation_id)?
            .ok_or_else(|| donation_not_found(donation_id))?;

        if actor.role == Role::Donor && donation.donor_id != actor.id {
            return Err(forbidden(actor, "view another donor's donation"));
        }

        Ok(donation)
    }

    pub fn notifications_for(&self, actor: &Actor) -> Vec<Notification> {
        self.notifier.for_user(&actor.id)
    }

    pub fn profile(&self, actor: &Actor) -> Result<Profile, AppError> {
        let (donations, deliveries) = match actor.role {
            Role::Donor | Role::Ngo => {
                (self.list_donations(actor, DonationFilter::default())?, Vec::new())
            }
            Role::Delivery => (Vec::new(), self.list_accepted(actor, None)?),
        };

        Ok(Profile {
            actor: actor.clone(),
            donations,
            deliveries,
            notifications: self.notifications_for(actor),
        })
    }

    pub fn pending_count(&self) -> Result<usize, AppError> {
        Ok(self.queue.pending_count()?)
    }

    pub fn stats(&self) -> Result<LifecycleStats, AppError> {
        Ok(LifecycleStats {
            donations: self.donations.count()?,
            pending_deliveries: self.queue.pending_count()?,
            accepted_deliveries: self.queue.accepted_count()?,
        })
    }

    /// Distinct districts with at least one donation, sorted.
    pub fn districts(&self) -> Result<Vec<String>, AppError> {
        let mut districts: Vec<String> = self
            .donations
            .find_many(&|_| true)?
            .into_iter()
            .map(|donation| donation.district)
            .collect();
        districts.sort();
        districts.dedup();
        Ok(districts)
    }

    fn reroute(
        &self,
        donation: &mut Donation,
        ngo_id: &str,
        route: Option<&DeliveryRoute>,
    ) -> Result<Reroute, AppError> {
        if donation.status.is_settled() {
            return Err(AppError::Validation(format!(
                "donation {} is {:?}; its delivery method can no longer change",
                donation.id, donation.status
            )));
        }
        if donation.delivery_status == DeliveryStatus::AcceptedDelivery {
            return Err(AppError::Validation(format!(
                "delivery for donation {} was already accepted by an agent",
                donation.id
            )));
        }
        if let Some(owner) = donation
            .accepted_by
            .as_deref()
            .filter(|owner| *owner != ngo_id)
        {
            return Err(AppError::Validation(format!(
                "donation {} is managed by NGO {owner}",
                donation.id
            )));
        }

        let mut next = donation.clone();
        // Choosing a delivery method implies the NGO accepted the donation.
        let accepted = next.status == DonationStatus::Pending;
        if accepted {
            next.status = DonationStatus::Accepted;
        }
        if next.accepted_by.is_none() {
            next.accepted_by = Some(ngo_id.to_string());
        }

        let changed = match route {
            None => {
                let withdrawn = self.queue.withdraw(donation.id, None)?;
                next.route_self_pickup();
                withdrawn > 0 || routing_state(&next) != routing_state(donation)
            }
            Some(route) => {
                let live = self.queue.tickets_for(donation.id)?;
                let already_queued = matches!(live.as_slice(), [ticket] if ticket_matches(ticket, route));
                next.route_assigned(route);

                if already_queued && routing_state(&next) == routing_state(donation) {
                    false
                } else {
                    let ticket = self.queue.enqueue(donation.id, route)?;
                    self.queue.withdraw(donation.id, Some(ticket.id))?;
                    true
                }
            }
        };

        if changed {
            *donation = next;
        }
        Ok(Reroute {
            changed,
            accepted: accepted && changed,
        })
    }

    fn claim_ticket(
        &self,
        donation: &mut Donation,
        pending_id: Uuid,
        agent_id: &str,
    ) -> Result<AcceptedDelivery, AppError> {
        let Some(ticket) = self.queue.claim(&pending_id)? else {
            self.metrics.delivery_claim_conflicts_total.inc();
            return Err(delivery_gone(pending_id));
        };

        let accepted = AcceptedDelivery::from_claim(&ticket, donation, agent_id);
        match self.queue.record_acceptance(accepted) {
            Ok(accepted) => {
                donation.delivery_status = DeliveryStatus::AcceptedDelivery;
                donation.updated_at = Utc::now();
                Ok(accepted)
            }
            Err(err) => {
                if let Err(restore_err) = self.queue.restore(ticket) {
                    error!(
                        pending_id = %pending_id,
                        error = %restore_err,
                        "failed to return claimed delivery to the queue"
                    );
                }
                Err(err.into())
            }
        }
    }

    fn announce_delivery(&self, accepted: &AcceptedDelivery, donation: &Donation) {
        match donation.accepted_by.as_deref() {
            Some(ngo_id) => {
                self.notify_best_effort(ngo_id, &messages::delivery_accepted_for_ngo(accepted))
            }
            None => warn!(donation_id = %donation.id, "no accepting NGO to notify"),
        }
        self.notify_best_effort(
            &donation.donor_id,
            &messages::delivery_accepted_for_donor(accepted),
        );

        self.dispatch_mail(messages::ngo_delivery_mail(accepted, &self.ngo_contact_email));
        if let Some(donor_email) = accepted.donor_email.as_deref() {
            self.dispatch_mail(messages::donor_delivery_mail(
                accepted,
                donor_email,
                &self.ngo_contact_email,
            ));
        }
    }

    fn notify_best_effort(&self, user_id: &str, message: &str) {
        if let Err(err) = self.notifier.notify(user_id, message) {
            self.metrics
                .side_effect_failures_total
                .with_label_values(&["notification"])
                .inc();
            error!(user_id = %user_id, error = %err, "failed to record notification");
        }
    }

    fn dispatch_mail(&self, mail: Mail) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            self.metrics
                .side_effect_failures_total
                .with_label_values(&["mail"])
                .inc();
            error!(to = %mail.to, "no async runtime available; mail dropped");
            return;
        };

        let mailer = self.mailer.clone();
        let metrics = self.metrics.clone();
        runtime.spawn(async move {
            let to = mail.to.clone();
            if let Err(err) = mailer.send(mail).await {
                metrics
                    .side_effect_failures_total
                    .with_label_values(&["mail"])
                    .inc();
                error!(to = %to, error = %err, "failed to send lifecycle mail");
            }
        });
    }

    fn refresh_pending_gauge(&self) {
        if let Ok(count) = self.queue.pending_count() {
            self.metrics.pending_deliveries.set(count as i64);
        }
    }

    fn timed<T>(
        &self,
        transition: &str,
        run: impl FnOnce() -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let start = Instant::now();
        let result = run();
        self.metrics
            .record_transition(transition, result.is_ok(), start.elapsed().as_secs_f64());

        match &result {
            Err(err @ AppError::Dependency(_)) | Err(err @ AppError::Internal(_)) => {
                error!(transition, error = %err, "lifecycle transition failed")
            }
            Err(err) => warn!(transition, error = %err, "lifecycle transition rejected"),
            Ok(_) => {}
        }
        result
    }
}

fn review(donation: &mut Donation, ngo_id: &str) -> Result<bool, AppError> {
    match donation.status {
        DonationStatus::Pending => {
            donation.status = DonationStatus::Accepted;
            donation.accepted_by = Some(ngo_id.to_string());
            donation.updated_at = Utc::now();
            Ok(true)
        }
        DonationStatus::Accepted if donation.accepted_by.as_deref() == Some(ngo_id) => Ok(false),
        DonationStatus::Accepted => Err(AppError::Validation(format!(
            "donation {} was already accepted by another NGO",
            donation.id
        ))),
        other => Err(AppError::Validation(format!(
            "donation {} is {other:?} and cannot be accepted",
            donation.id
        ))),
    }
}

/// Outcome of a routing request applied under the donation lock.
struct Reroute {
    changed: bool,
    /// The request also moved the donation out of `Pending`.
    accepted: bool,
}

type RoutingState = (
    DonationStatus,
    Option<String>,
    DeliveryMethod,
    DeliveryStatus,
    Option<DeliveryRoute>,
);

fn routing_state(donation: &Donation) -> RoutingState {
    (
        donation.status,
        donation.accepted_by.clone(),
        donation.delivery_method,
        donation.delivery_status,
        donation.route(),
    )
}

fn ticket_matches(ticket: &PendingDelivery, route: &DeliveryRoute) -> bool {
    ticket.delivery_charge == route.charge
        && ticket.pickup_location == route.pickup_location
        && ticket.drop_location == route.drop_location
}

fn validate_new_donation(fields: &NewDonation) -> Result<(), AppError> {
    let required = [
        ("food_name", &fields.food_name),
        ("quantity", &fields.quantity),
        ("category", &fields.category),
        ("district", &fields.district),
        ("address", &fields.address),
    ];
    let missing: Vec<&str> = required
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }

    let email = fields.donor_email.as_deref().map(str::trim).unwrap_or("");
    if !email.is_empty() && !email.contains('@') {
        return Err(AppError::Validation(format!("invalid donor email: {email}")));
    }

    Ok(())
}

fn validate_route(request: &DeliveryMethodRequest) -> Result<Option<DeliveryRoute>, AppError> {
    if request.method == DeliveryMethod::SelfPickup {
        return Ok(None);
    }

    let pickup = request.pickup_location.as_deref().map(str::trim).unwrap_or("");
    let drop = request.drop_location.as_deref().map(str::trim).unwrap_or("");

    let mut missing = Vec::new();
    if request.charge.is_none() {
        missing.push("charge");
    }
    if pickup.is_empty() {
        missing.push("pickup_location");
    }
    if drop.is_empty() {
        missing.push("drop_location");
    }

    match request.charge {
        Some(charge) if missing.is_empty() => Ok(Some(DeliveryRoute {
            charge,
            pickup_location: pickup.to_string(),
            drop_location: drop.to_string(),
        })),
        _ => Err(AppError::Validation(format!(
            "assigned delivery requires: {}",
            missing.join(", ")
        ))),
    }
}

fn require_role(actor: &Actor, role: Role, action: &str) -> Result<(), AppError> {
    require_any(actor, &[role], action)
}

fn require_any(actor: &Actor, roles: &[Role], action: &str) -> Result<(), AppError> {
    if roles.contains(&actor.role) {
        Ok(())
    } else {
        Err(forbidden(actor, action))
    }
}

fn forbidden(actor: &Actor, action: &str) -> AppError {
    AppError::Forbidden(format!("role {} may not {action}", actor.role))
}

fn donation_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("donation {id} not found"))
}

fn delivery_gone(id: Uuid) -> AppError {
    AppError::NotFound(format!("pending delivery {id} not found or already accepted"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

fn newest_first(donations: &mut [Donation]) {
    donations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
