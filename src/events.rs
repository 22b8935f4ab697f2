use std::sync::mpsc;

use tracing::trace;

/// Subscribers of the `data_ready` event, fired once per complete message
/// received in asynchronous mode
#[derive(Debug, Default)]
pub struct DataReady {
    subscribers: Vec<mpsc::Sender<String>>,
}

impl DataReady {
    pub fn subscribe(&mut self) -> mpsc::Receiver<String> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers.push(sender);
        receiver
    }

    /// Deliver `message` to every live subscriber. Subscribers whose
    /// receiver has been dropped are forgotten.
    pub fn emit(&mut self, message: &str) -> usize {
        self.subscribers
            .retain(|subscriber| subscriber.send(message.to_owned()).is_ok());
        trace!("data_ready delivered to {} subscribers", self.subscribers.len());
        self.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_gets_the_message() {
        let mut data_ready = DataReady::default();
        let first = data_ready.subscribe();
        let second = data_ready.subscribe();

        assert_eq!(data_ready.emit("READY"), 2);
        assert_eq!(first.try_recv().unwrap(), "READY");
        assert_eq!(second.try_recv().unwrap(), "READY");
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut data_ready = DataReady::default();
        let kept = data_ready.subscribe();
        drop(data_ready.subscribe());

        assert_eq!(data_ready.emit("X"), 1);
        assert_eq!(data_ready.subscriber_count(), 1);
        assert_eq!(kept.try_recv().unwrap(), "X");
    }
}
