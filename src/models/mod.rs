pub mod billing;
pub mod chatbot;
pub mod contact;
pub mod lead;
pub mod timestamp;
pub mod user;

pub use billing::{Payment, SubscriptionPlan, PAYMENT_SUCCEEDED};
pub use chatbot::{ChatSession, ChatbotClient, ChatbotUsage, Message};
pub use contact::{ContactSubmission, ContactSubmissionDisplay};
pub use lead::{Lead, LeadConfirmation};
pub use user::{CrawlRecord, Session, User, UserSubscription, SUBSCRIPTION_ACTIVE, SUBSCRIPTION_INACTIVE};
