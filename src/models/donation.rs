use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DonationStatus {
    Pending,
    Accepted,
    Collected,
    #[serde(rename = "pending_delivery")]
    PendingDelivery,
    #[serde(rename = "in_transit")]
    InTransit,
    Delivered,
}

impl DonationStatus {
    /// Statuses past the NGO review where delivery routing can no longer change.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            DonationStatus::Collected | DonationStatus::InTransit | DonationStatus::Delivered
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    SelfPickup,
    AssignedDelivery,
}

impl DeliveryMethod {
    pub fn label(&self) -> &'static str {
        match self {
            DeliveryMethod::SelfPickup => "self pickup",
            DeliveryMethod::AssignedDelivery => "assigned delivery",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    NotAssigned,
    PendingDelivery,
    AcceptedDelivery,
}

/// Charge and route, present only for assigned delivery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryRoute {
    pub charge: u32,
    pub pickup_location: String,
    pub drop_location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donation {
    pub id: Uuid,
    pub food_name: String,
    pub meal: Option<String>,
    pub category: String,
    pub quantity: String,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub district: String,
    pub address: String,
    pub donor_id: String,
    pub donor_email: Option<String>,
    pub status: DonationStatus,
    pub accepted_by: Option<String>,
    pub delivery_method: DeliveryMethod,
    pub delivery_charge: Option<u32>,
    pub delivery_status: DeliveryStatus,
    pub pickup_location: Option<String>,
    pub drop_location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Donation {
    /// Switches to self pickup, clearing every assigned-delivery field.
    pub fn route_self_pickup(&mut self) {
        self.delivery_method = DeliveryMethod::SelfPickup;
        self.delivery_charge = None;
        self.pickup_location = None;
        self.drop_location = None;
        self.delivery_status = DeliveryStatus::NotAssigned;
        self.updated_at = Utc::now();
    }

    pub fn route_assigned(&mut self, route: &DeliveryRoute) {
        self.delivery_method = DeliveryMethod::AssignedDelivery;
        self.delivery_charge = Some(route.charge);
        self.pickup_location = Some(route.pickup_location.clone());
        self.drop_location = Some(route.drop_location.clone());
        self.delivery_status = DeliveryStatus::PendingDelivery;
        self.updated_at = Utc::now();
    }

    pub fn route(&self) -> Option<DeliveryRoute> {
        match (
            self.delivery_charge,
            self.pickup_location.as_ref(),
            self.drop_location.as_ref(),
        ) {
            (Some(charge), Some(pickup), Some(drop)) => Some(DeliveryRoute {
                charge,
                pickup_location: pickup.clone(),
                drop_location: drop.clone(),
            }),
            _ => None,
        }
    }

    /// Delivery fields are populated exactly when the method is assigned delivery.
    pub fn delivery_fields_consistent(&self) -> bool {
        let populated = [
            self.delivery_charge.is_some(),
            self.pickup_location.is_some(),
            self.drop_location.is_some(),
        ];
        match self.delivery_method {
            DeliveryMethod::AssignedDelivery => populated.iter().all(|set| *set),
            DeliveryMethod::SelfPickup => populated.iter().all(|set| !*set),
        }
    }
}

/// Descriptive fields submitted by a donor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDonation {
    #[serde(default, alias = "foodname")]
    pub food_name: String,
    #[serde(default)]
    pub meal: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default, alias = "name")]
    pub contact_name: Option<String>,
    #[serde(default, alias = "phoneno")]
    pub phone: Option<String>,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, alias = "email")]
    pub donor_email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DonationFilter {
    pub status: Option<DonationStatus>,
    pub donor_id: Option<String>,
    pub district: Option<String>,
}

impl DonationFilter {
    pub fn matches(&self, donation: &Donation) -> bool {
        self.status.is_none_or(|status| donation.status == status)
            && self
                .donor_id
                .as_ref()
                .is_none_or(|donor| &donation.donor_id == donor)
            && self
                .district
                .as_ref()
                .is_none_or(|district| donation.district.eq_ignore_ascii_case(district))
    }
}

/// NGO routing decision for an accepted donation.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryMethodRequest {
    #[serde(alias = "deliveryMethod")]
    pub method: DeliveryMethod,
    #[serde(default, alias = "deliveryCharge")]
    pub charge: Option<u32>,
    #[serde(default, alias = "pickupLocation")]
    pub pickup_location: Option<String>,
    #[serde(default, alias = "dropLocation")]
    pub drop_location: Option<String>,
}

impl DeliveryMethodRequest {
    pub fn self_pickup() -> Self {
        Self {
            method: DeliveryMethod::SelfPickup,
            charge: None,
            pickup_location: None,
            drop_location: None,
        }
    }

    pub fn assigned(charge: u32, pickup: impl Into<String>, drop: impl Into<String>) -> Self {
        Self {
            method: DeliveryMethod::AssignedDelivery,
            charge: Some(charge),
            pickup_location: Some(pickup.into()),
            drop_location: Some(drop.into()),
        }
    }
}
