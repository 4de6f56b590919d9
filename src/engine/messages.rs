use crate::models::delivery::AcceptedDelivery;
use crate::models::donation::{DeliveryMethod, Donation};
use crate::notify::Mail;

pub fn donation_accepted(donation: &Donation) -> String {
    format!(
        "Your donation of {} ({}) has been accepted by an NGO.",
        donation.food_name, donation.quantity
    )
}

pub fn delivery_method_set(method: DeliveryMethod) -> String {
    format!("Delivery method set to: {}", method.label())
}

pub fn delivery_accepted_for_ngo(delivery: &AcceptedDelivery) -> String {
    format!(
        "A delivery agent accepted the delivery of {} ({}) from {} to {}.",
        delivery.food_name, delivery.quantity, delivery.pickup_location, delivery.drop_location
    )
}

pub fn delivery_accepted_for_donor(delivery: &AcceptedDelivery) -> String {
    format!(
        "Your donation of {} is on the way: a delivery agent has accepted it.",
        delivery.food_name
    )
}

fn delivery_summary(delivery: &AcceptedDelivery, ngo_email: &str) -> String {
    format!(
        "NGO email: {ngo_email}\n\
         Food name: {}\n\
         Quantity: {}\n\
         Pickup location: {}\n\
         Drop location: {}\n\
         Delivery charge: {}\n",
        or_na(&delivery.food_name),
        or_na(&delivery.quantity),
        delivery.pickup_location,
        delivery.drop_location,
        delivery.delivery_charge
    )
}

fn or_na(value: &str) -> &str {
    if value.trim().is_empty() { "N/A" } else { value }
}

pub fn ngo_delivery_mail(delivery: &AcceptedDelivery, ngo_email: &str) -> Mail {
    Mail {
        to: ngo_email.to_string(),
        subject: "Delivery Accepted - Action Required".to_string(),
        body: format!(
            "Hello,\n\nA delivery has been accepted. Details:\n\n{}\n\
             Please review it on your NGO dashboard.\n",
            delivery_summary(delivery, ngo_email)
        ),
    }
}

pub fn donor_delivery_mail(delivery: &AcceptedDelivery, donor_email: &str, ngo_email: &str) -> Mail {
    Mail {
        to: donor_email.to_string(),
        subject: "Your Donation is On the Way!".to_string(),
        body: format!(
            "Dear Donor,\n\nA delivery partner has accepted your donation and will \
             transport it safely.\n\n{}\nThank you for your generosity!\n",
            delivery_summary(delivery, ngo_email)
        ),
    }
}

pub fn contact_mail(support_email: &str, name: &str, email: &str, message: &str) -> Mail {
    Mail {
        to: support_email.to_string(),
        subject: "New Contact Form Submission".to_string(),
        body: format!("Name: {name}\nEmail: {email}\nMessage:\n{message}\n"),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{delivery_method_set, ngo_delivery_mail};
    use crate::models::delivery::{AcceptedDelivery, AcceptedStatus};
    use crate::models::donation::DeliveryMethod;

    #[test]
    fn method_label_is_human_readable() {
        assert_eq!(
            delivery_method_set(DeliveryMethod::AssignedDelivery),
            "Delivery method set to: assigned delivery"
        );
    }

    #[test]
    fn ngo_mail_lists_route_and_marks_missing_fields() {
        let delivery = AcceptedDelivery {
            id: Uuid::new_v4(),
            donation_id: Uuid::new_v4(),
            agent_id: "agent-1".to_string(),
            delivery_charge: 50,
            pickup_location: "Market Road".to_string(),
            drop_location: "Shelter".to_string(),
            food_name: "Rice".to_string(),
            quantity: " ".to_string(),
            donor_email: None,
            status: AcceptedStatus::AcceptedDelivery,
            accepted_at: Utc::now(),
        };

        let mail = ngo_delivery_mail(&delivery, "ngo@example.org");

        assert_eq!(mail.to, "ngo@example.org");
        assert!(mail.body.contains("Pickup location: Market Road"));
        assert!(mail.body.contains("Quantity: N/A"));
        assert!(mail.body.contains("Delivery charge: 50"));
    }
}
