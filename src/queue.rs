use std::collections::VecDeque;

use crate::bits::Word;

/// Default number of words held by each of the VM's I/O queues.
pub const IO_QUEUE_CAPACITY: usize = 64;

/// Bounded FIFO of words shared between the VM and its host.
///
/// Neither side ever waits on the queue: a push onto a full queue hands the word back, and a
/// pop from an empty one returns `None`.
#[derive(Clone, Debug)]
pub struct IoQueue {
    buf: VecDeque<Word>,
    capacity: usize,
}

impl IoQueue {
    pub fn new(capacity: usize) -> Self {
        IoQueue {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a word, or return it if the queue is full.
    pub fn push(&mut self, word: Word) -> Result<(), Word> {
        if self.is_full() {
            return Err(word);
        }
        self.buf.push_back(word);
        Ok(())
    }

    /// Append every byte of `text`. Stops at the first byte that does not fit and returns how
    /// many were queued.
    pub fn push_str(&mut self, text: &str) -> usize {
        text.bytes()
            .take_while(|&byte| self.push(byte as Word).is_ok())
            .count()
    }

    pub fn pop(&mut self) -> Option<Word> {
        self.buf.pop_front()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Word> + '_ {
        self.buf.drain(..)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of words that can be pushed before the queue is full.
    pub fn free(&self) -> usize {
        self.capacity - self.buf.len()
    }
}

impl Default for IoQueue {
    fn default() -> Self {
        IoQueue::new(IO_QUEUE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_fifo() {
        let mut queue = IoQueue::new(2);
        assert_eq!(queue.push(1), Ok(()));
        assert_eq!(queue.push(2), Ok(()));
        assert_eq!(queue.push(3), Err(3));
        assert!(queue.is_full());
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.free(), 1);
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn push_str_stops_when_full() {
        let mut queue = IoQueue::new(3);
        assert_eq!(queue.push_str("hello"), 3);
        assert_eq!(
            queue.drain().collect::<Vec<_>>(),
            vec!['h' as Word, 'e' as Word, 'l' as Word]
        );
        assert!(queue.is_empty());
    }
}
