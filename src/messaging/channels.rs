// Lock-free channels between the control thread and the audio thread

use crate::messaging::command::ProcessorMessage;
use crate::messaging::notification::{Notification, NotificationLevel};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::HeapRb;

pub type MessageProducer = ringbuf::HeapProd<ProcessorMessage>;
pub type MessageConsumer = ringbuf::HeapCons<ProcessorMessage>;

pub fn create_message_channel(capacity: usize) -> (MessageProducer, MessageConsumer) {
    let rb = HeapRb::<ProcessorMessage>::new(capacity);
    rb.split()
}

pub type NotificationProducer = ringbuf::HeapProd<Notification>;
pub type NotificationConsumer = ringbuf::HeapCons<Notification>;

pub fn create_notification_channel(
    capacity: usize,
) -> (NotificationProducer, NotificationConsumer) {
    let rb = HeapRb::<Notification>::new(capacity);
    rb.split()
}

/// Pushes without blocking; a full queue drops the notification
///
/// Safe on the audio thread: nothing is logged here, the control thread
/// logs what it drains.
pub fn post_notification(tx: &mut NotificationProducer, notification: Notification) -> bool {
    tx.try_push(notification).is_ok()
}

/// Posts to `tx` when a queue is attached, logs in place otherwise
pub fn report(tx: Option<&mut NotificationProducer>, notification: Notification) -> bool {
    match tx {
        Some(tx) => post_notification(tx, notification),
        None => {
            log_notification(&notification);
            false
        }
    }
}

/// Control-thread side: pops everything queued and logs each entry
pub fn drain_notifications(rx: &mut NotificationConsumer) -> Vec<Notification> {
    let drained: Vec<Notification> = std::iter::from_fn(|| rx.try_pop()).collect();
    for notification in &drained {
        log_notification(notification);
    }
    drained
}

fn log_notification(notification: &Notification) {
    match notification.level {
        NotificationLevel::Info => log::info!("{}", notification),
        NotificationLevel::Warning => log::warn!("{}", notification),
        NotificationLevel::Error => log::error!("{}", notification),
    }
}
