use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Sending half of a single-threaded message channel.
///
/// Cloning a sender shares the same queue; the channel never blocks and never
/// drops messages while either half is alive.
#[derive(Debug)]
pub struct Sender<T> {
    queue: Rc<RefCell<VecDeque<T>>>,
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Rc::clone(&self.queue),
        }
    }
}

impl<T> Sender<T> {
    pub fn send(&self, message: T) {
        self.queue.borrow_mut().push_back(message);
    }
}

/// Receiving half of a single-threaded message channel.
#[derive(Debug)]
pub struct Receiver<T> {
    queue: Rc<RefCell<VecDeque<T>>>,
}

impl<T> Receiver<T> {
    pub fn try_recv(&self) -> Option<T> {
        self.queue.borrow_mut().pop_front()
    }

    /// Take every queued message in FIFO order.
    pub fn drain(&self) -> Vec<T> {
        self.queue.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

/// Create a typed FIFO channel for event-loop style message passing.
pub fn channel<T>() -> (Sender<T>, Receiver<T>) {
    let queue = Rc::new(RefCell::new(VecDeque::new()));
    (
        Sender {
            queue: Rc::clone(&queue),
        },
        Receiver { queue },
    )
}

#[cfg(test)]
mod tests {
    use super::channel;

    #[test]
    fn delivers_in_fifo_order() {
        let (tx, rx) = channel();
        tx.send("a");
        tx.clone().send("b");
        assert_eq!(rx.len(), 2);
        assert_eq!(rx.try_recv(), Some("a"));
        assert_eq!(rx.try_recv(), Some("b"));
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn drain_clears_queue() {
        let (tx, rx) = channel();
        tx.send(1);
        tx.send(2);
        assert_eq!(rx.drain(), vec![1, 2]);
        assert!(rx.is_empty());
    }
}
