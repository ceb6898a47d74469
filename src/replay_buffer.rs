use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::thread_rng;
use std::collections::VecDeque;

/// One recorded environment step. Immutable once stored.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub state: Array1<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_state: Array1<f32>,
    pub done: bool,
}

/// Bounded, insertion-ordered experience store. Once capacity is reached the
/// oldest transition is evicted first.
#[derive(Clone)]
pub struct ReplayBuffer {
    buffer: VecDeque<Transition>,
    capacity: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        ReplayBuffer {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, transition: Transition) {
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(transition);
    }

    /// Sample up to `batch_size` transitions without replacement. If the
    /// buffer holds fewer, the whole buffer is returned.
    pub fn sample(&self, batch_size: usize) -> Vec<&Transition> {
        let mut rng = thread_rng();
        let mut indices = (0..self.buffer.len()).collect::<Vec<usize>>();
        indices.shuffle(&mut rng);
        indices.truncate(batch_size);
        indices.into_iter().map(|i| &self.buffer[i]).collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate in insertion order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.buffer.iter()
    }
}
