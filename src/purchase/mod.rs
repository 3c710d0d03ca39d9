/// Purchase flow: reserve, charge, record, deliver

pub mod delivery;
pub mod orchestrator;

pub use delivery::{format_receipt, Delivery, DeliveryChannel, WebhookChannel};
pub use orchestrator::PurchaseOrchestrator;
