use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, RecvTimeoutError, TryRecvError};

pub trait ChannelExt<T> {
    // Blocks the channel for at least one item and then keeps receiving until the limit is reached or
    // the timeout, measured from the first item, elapses. Empty only once the channel is disconnected.
    fn recv_up_to(&self, limit: usize, timeout: Duration) -> Vec<T>;
}

impl<T> ChannelExt<T> for Receiver<T> {
    fn recv_up_to(&self, limit: usize, timeout: Duration) -> Vec<T> {
        let mut items = Vec::with_capacity(limit);

        match self.recv() {
            Ok(item) => items.push(item),
            Err(_) => return items,
        }

        let deadline = Instant::now() + timeout;

        while items.len() < limit {
            match self.try_recv() {
                Ok(item) => {
                    items.push(item);
                    continue;
                }
                Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }

            match self.recv_deadline(deadline) {
                Ok(item) => items.push(item),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        items
    }
}
