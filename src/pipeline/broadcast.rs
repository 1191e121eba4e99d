use tokio::sync::{mpsc, oneshot};

use super::error::PipelineError;

/// An item handed to one consumer, together with its acknowledgement.
pub struct Envelope<T> {
    item: T,
    ack: oneshot::Sender<()>,
}

impl<T> Envelope<T> {
    pub fn into_parts(self) -> (T, Ack) {
        (self.item, Ack(self.ack))
    }
}

pub struct Ack(oneshot::Sender<()>);

impl Ack {
    pub fn done(self) {
        let _ = self.0.send(());
    }
}

/// Fan-out where the producer only advances once every consumer has
/// acknowledged the current item. The slowest consumer sets the pace.
pub struct SyncBroadcast<T> {
    consumers: Vec<(&'static str, mpsc::Sender<Envelope<T>>)>,
}

impl<T: Clone> SyncBroadcast<T> {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            consumers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, name: &'static str, capacity: usize) -> mpsc::Receiver<Envelope<T>> {
        let (tx, rx) = mpsc::channel(capacity);
        self.consumers.push((name, tx));
        rx
    }

    pub async fn send(&self, item: T) -> Result<(), PipelineError> {
        let mut pending = Vec::with_capacity(self.consumers.len());

        for (name, tx) in &self.consumers {
            let (ack_tx, ack_rx) = oneshot::channel();
            let envelope = Envelope {
                item: item.clone(),
                ack: ack_tx,
            };
            tx.send(envelope)
                .await
                .map_err(|_| PipelineError::ConsumerClosed(*name))?;
            pending.push((*name, ack_rx));
        }

        for (name, ack_rx) in pending {
            ack_rx
                .await
                .map_err(|_| PipelineError::ConsumerClosed(name))?;
        }

        Ok(())
    }
}
