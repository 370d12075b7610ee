use rtrb::{Consumer, Producer, PushError, RingBuffer};

/// Hands results from the scan thread to the context that owns editor state.
/// `post` runs on the scan thread and must not block.
pub trait OwnerDispatch<T>: Send {
    fn post(&mut self, item: T);
}

impl<T, F> OwnerDispatch<T> for F
where
    F: FnMut(T) + Send,
{
    fn post(&mut self, item: T) {
        self(item)
    }
}

pub struct RingDispatch<T> {
    producer: Producer<T>,
}

impl<T: Send> OwnerDispatch<T> for RingDispatch<T> {
    fn post(&mut self, item: T) {
        if let Err(PushError::Full(_)) = self.producer.push(item) {
            tracing::warn!("owner inbox full, dropping report");
        }
    }
}

/// Owner side of [`owner_channel`]; drained from the owner's own loop.
pub struct OwnerInbox<T> {
    consumer: Consumer<T>,
}

impl<T> OwnerInbox<T> {
    pub fn drain(&mut self) -> Vec<T> {
        let mut items = Vec::new();
        self.drain_into(|item| items.push(item));
        items
    }

    pub fn drain_into(&mut self, mut f: impl FnMut(T)) {
        while let Ok(item) = self.consumer.pop() {
            f(item);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.consumer.is_empty()
    }
}

pub fn owner_channel<T>(capacity: usize) -> (RingDispatch<T>, OwnerInbox<T>) {
    let (producer, consumer) = RingBuffer::new(capacity);
    (RingDispatch { producer }, OwnerInbox { consumer })
}
