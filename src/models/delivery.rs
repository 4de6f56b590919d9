use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::donation::Donation;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PendingStatus {
    Pending,
}

/// Queue ticket for one donation awaiting a delivery agent. Consumed exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingDelivery {
    pub id: Uuid,
    pub donation_id: Uuid,
    pub delivery_charge: u32,
    pub pickup_location: String,
    pub drop_location: String,
    pub status: PendingStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AcceptedStatus {
    AcceptedDelivery,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptedDelivery {
    pub id: Uuid,
    pub donation_id: Uuid,
    pub agent_id: String,
    pub delivery_charge: u32,
    pub pickup_location: String,
    pub drop_location: String,
    pub food_name: String,
    pub quantity: String,
    pub donor_email: Option<String>,
    pub status: AcceptedStatus,
    pub accepted_at: DateTime<Utc>,
}

impl AcceptedDelivery {
    pub fn from_claim(pending: &PendingDelivery, donation: &Donation, agent_id: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            donation_id: donation.id,
            agent_id: agent_id.to_string(),
            delivery_charge: pending.delivery_charge,
            pickup_location: pending.pickup_location.clone(),
            drop_location: pending.drop_location.clone(),
            food_name: donation.food_name.clone(),
            quantity: donation.quantity.clone(),
            donor_email: donation.donor_email.clone(),
            status: AcceptedStatus::AcceptedDelivery,
            accepted_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PendingFilter {
    pub district: Option<String>,
    pub donation_id: Option<Uuid>,
}

/// Pending ticket joined with the donation it refers to.
#[derive(Debug, Clone, Serialize)]
pub struct PendingDeliveryView {
    #[serde(flatten)]
    pub pending: PendingDelivery,
    pub donation: Donation,
}
