pub mod dispatcher;
pub mod gateway;
pub mod templates;

pub use dispatcher::{DispatchStats, NotificationDispatcher};
pub use gateway::{LogGateway, MemoryGateway, NotificationGateway, WebhookGateway};
