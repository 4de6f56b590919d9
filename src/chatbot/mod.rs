//! Keyword chatbot: an ordered rule list, first match wins.

use tracing::{debug, error};

use crate::engine::coordinator::{Coordinator, LifecycleStats};
use crate::error::AppError;

const FALLBACK: &str =
    "I'm sorry, I don't understand. Can you ask about donations or deliveries?";
const LOOKUP_FAILED: &str = "Sorry, I couldn't fetch the data right now.";

/// Live figures a rule may quote.
pub trait FactSource {
    fn stats(&self) -> Result<LifecycleStats, AppError>;
    fn districts(&self) -> Result<Vec<String>, AppError>;
}

impl FactSource for Coordinator {
    fn stats(&self) -> Result<LifecycleStats, AppError> {
        Coordinator::stats(self)
    }

    fn districts(&self) -> Result<Vec<String>, AppError> {
        Coordinator::districts(self)
    }
}

enum Reply {
    Fixed(&'static str),
    Computed(fn(&dyn FactSource) -> Result<String, AppError>),
}

struct Rule {
    keywords: &'static [&'static str],
    reply: Reply,
}

impl Rule {
    fn matches(&self, question: &str) -> bool {
        self.keywords.iter().any(|keyword| question.contains(keyword))
    }
}

pub struct Chatbot {
    rules: Vec<Rule>,
}

impl Default for Chatbot {
    fn default() -> Self {
        Self::new()
    }
}

impl Chatbot {
    pub fn new() -> Self {
        Self { rules: rules() }
    }

    pub fn answer(&self, question: &str, facts: &dyn FactSource) -> String {
        let lower = question.to_lowercase();

        let Some(rule) = self.rules.iter().find(|rule| rule.matches(&lower)) else {
            return FALLBACK.to_string();
        };

        match &rule.reply {
            Reply::Fixed(text) => text.to_string(),
            Reply::Computed(compute) => match compute(facts) {
                Ok(text) => {
                    debug!(answer = %text, "chatbot computed answer");
                    text
                }
                Err(err) => {
                    error!(error = %err, "chatbot lookup failed");
                    LOOKUP_FAILED.to_string()
                }
            },
        }
    }
}

fn donation_count(facts: &dyn FactSource) -> Result<String, AppError> {
    let stats = facts.stats()?;
    Ok(format!(
        "There are currently {} donations in the system.",
        stats.donations
    ))
}

fn pending_count(facts: &dyn FactSource) -> Result<String, AppError> {
    let stats = facts.stats()?;
    Ok(format!(
        "There are currently {} pending deliveries.",
        stats.pending_deliveries
    ))
}

fn accepted_count(facts: &dyn FactSource) -> Result<String, AppError> {
    let stats = facts.stats()?;
    Ok(format!(
        "There are currently {} accepted deliveries.",
        stats.accepted_deliveries
    ))
}

fn donation_districts(facts: &dyn FactSource) -> Result<String, AppError> {
    let districts = facts.districts()?;
    if districts.is_empty() {
        Ok("There are no food requests at the moment.".to_string())
    } else {
        Ok(format!(
            "Food requests are available in the following locations: {}.",
            districts.join(", ")
        ))
    }
}

fn rules() -> Vec<Rule> {
    vec![
        Rule {
            keywords: &[
                "how many donations",
                "number of donations",
                "total donations",
                "food donations",
                "donations count",
                "count of donations",
            ],
            reply: Reply::Computed(donation_count),
        },
        Rule {
            keywords: &[
                "pending deliveries",
                "unaccepted deliveries",
                "pending count",
                "how many pending",
                "number of pending",
                "total pending",
                "pending requests",
            ],
            reply: Reply::Computed(pending_count),
        },
        Rule {
            keywords: &[
                "accepted deliveries",
                "completed deliveries",
                "accepted count",
                "how many accepted",
                "number of accepted",
                "total accepted",
                "accepted request",
            ],
            reply: Reply::Computed(accepted_count),
        },
        Rule {
            keywords: &[
                "user name",
                "names",
                "list user",
                "user list",
                "user details",
                "personal information",
                "user info",
            ],
            reply: Reply::Fixed(
                "I'm sorry, I can't provide personal user information for privacy reasons.",
            ),
        },
        Rule {
            keywords: &[
                "location",
                "where",
                "districts",
                "areas",
                "places",
                "where to donate",
            ],
            reply: Reply::Computed(donation_districts),
        },
        Rule {
            keywords: &["hello", "hi", "hey", "greetings", "good morning", "good evening"],
            reply: Reply::Fixed("Hello! How can I help you with your food donation today?"),
        },
        Rule {
            keywords: &["donate", "donation", "give food", "food contribution"],
            reply: Reply::Fixed(
                "To donate food, please visit our donate page and fill in the details. We accept various types of food items.",
            ),
        },
        Rule {
            keywords: &["contact", "email", "phone", "call", "reach", "get in touch"],
            reply: Reply::Fixed(
                "You can contact us through the contact page or by email; our team replies on working days.",
            ),
        },
        Rule {
            keywords: &["address", "office address", "company address"],
            reply: Reply::Fixed("Our office address is listed on the contact page."),
        },
        Rule {
            keywords: &["hours", "time", "working hours", "business hours"],
            reply: Reply::Fixed("Our office hours are Monday to Friday, 9 AM to 5 PM."),
        },
        Rule {
            keywords: &["expiration", "expiry", "expired"],
            reply: Reply::Fixed(
                "We can't accept food near or past its expiration date for safety reasons.",
            ),
        },
        Rule {
            keywords: &["help", "assist", "support"],
            reply: Reply::Fixed(
                "I'm here to help! Ask me about donating, contacting us, or anything related to food donations.",
            ),
        },
        Rule {
            keywords: &["bye", "thanks", "thank you", "see you", "farewell"],
            reply: Reply::Fixed("Goodbye! Thank you for your interest in food donation."),
        },
        Rule {
            keywords: &["what is food donation", "food waste", "surplus food"],
            reply: Reply::Fixed(
                "Food donation means giving surplus food to NGOs who distribute it to people in need instead of letting it go to waste.",
            ),
        },
        Rule {
            keywords: &["mission", "goal", "purpose"],
            reply: Reply::Fixed(
                "Our mission is to reduce food waste and ensure no one goes hungry by facilitating food donations.",
            ),
        },
        Rule {
            keywords: &["about", "who are you", "what is this platform"],
            reply: Reply::Fixed(
                "We are a food donation platform connecting donors with NGOs to reduce food waste and help those in need.",
            ),
        },
        Rule {
            keywords: &["home page", "homepage", "landing page"],
            reply: Reply::Fixed(
                "The home page introduces the platform and links to donating, the dashboards and your profile.",
            ),
        },
        Rule {
            keywords: &["profile", "my account"],
            reply: Reply::Fixed(
                "The profile page displays your donation history and notifications.",
            ),
        },
        Rule {
            keywords: &["dashboard"],
            reply: Reply::Fixed(
                "For NGOs, the dashboard shows accepted donations for management. For delivery personnel, it shows pending and accepted deliveries.",
            ),
        },
        Rule {
            keywords: &["ngo"],
            reply: Reply::Fixed(
                "NGOs use the platform to view and manage food donations, accepting and assigning deliveries.",
            ),
        },
        Rule {
            keywords: &["delivery"],
            reply: Reply::Fixed(
                "Delivery personnel handle the logistics of picking up and delivering food donations to recipients.",
            ),
        },
        Rule {
            keywords: &["logout", "sign out", "log out"],
            reply: Reply::Fixed("Click logout to securely end your session."),
        },
        Rule {
            keywords: &["login", "sign in", "log in"],
            reply: Reply::Fixed(
                "Use the login page to sign in with your email and password based on your role.",
            ),
        },
        Rule {
            keywords: &["signup", "register", "sign up", "create account"],
            reply: Reply::Fixed(
                "The signup page allows new users to register as donors, NGOs, or delivery personnel.",
            ),
        },
        Rule {
            keywords: &["notification", "updates"],
            reply: Reply::Fixed(
                "The notifications feature keeps you updated on donation status, delivery updates, and more.",
            ),
        },
    ]
}
