// Messaging - Control/audio thread communication

pub mod channels;
pub mod command;
pub mod notification;

pub use channels::{
    MessageConsumer, MessageProducer, NotificationConsumer, NotificationProducer,
    create_message_channel, create_notification_channel, drain_notifications, post_notification,
    report,
};
pub use command::ProcessorMessage;
pub use notification::{Notification, NotificationCategory, NotificationLevel};
