//! Per-channel work driver.
//!
//! Every work future of a channel is handed to one driver task that polls
//! them from a single `FuturesUnordered`. Hand-over happens under the channel
//! lock in dispatch order and the set polls newly pushed futures in push
//! order, so task bodies start in dispatch order even on a multi-threaded
//! runtime.

use std::task::Poll;

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::future::{poll_fn, BoxFuture};
use futures::stream::{FuturesUnordered, StreamExt};

use crate::runtime::spawn::Spawn;

type Work = BoxFuture<'static, ()>;

/// Sending side of a channel's driver. The driver task is started lazily on
/// the first hand-over and restarted if its spawner dropped it.
pub(crate) struct Driver {
    sender: Option<UnboundedSender<Work>>,
}

impl Driver {
    pub(crate) const fn new() -> Self {
        Self { sender: None }
    }

    /// Hand `work` to the driver task. Returns `false` if the driver is gone,
    /// in which case `work` is dropped unpolled.
    pub(crate) fn hand_over(&mut self, spawner: &dyn Spawn, work: Work) -> bool {
        if self.sender.as_ref().is_none_or(UnboundedSender::is_closed) {
            let (tx, rx) = mpsc::unbounded();
            spawner.spawn(Box::pin(drive(rx)));
            self.sender = Some(tx);
        }
        match &self.sender {
            Some(sender) => sender.unbounded_send(work).is_ok(),
            None => false,
        }
    }
}

/// Poll incoming work until the sender is dropped and all work has finished.
async fn drive(mut incoming: UnboundedReceiver<Work>) {
    let mut running: FuturesUnordered<Work> = FuturesUnordered::new();
    let mut open = true;

    poll_fn(move |cx| {
        while open {
            match incoming.poll_next_unpin(cx) {
                Poll::Ready(Some(work)) => running.push(work),
                Poll::Ready(None) => open = false,
                Poll::Pending => break,
            }
        }
        while let Poll::Ready(Some(())) = running.poll_next_unpin(cx) {}

        if !open && running.is_empty() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    })
    .await;
}
