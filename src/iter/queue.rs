// Copyright 2021 Datafuse Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::VecDeque;

/// An iterator that removes every item it yields from the queue it owns.
///
/// Used as a store-independent snapshot: once the queue is drained, nothing will be added to it.
#[derive(Debug, Clone)]
pub struct RecordQueueIterator<T> {
    queue: VecDeque<T>,
}

impl<T> Default for RecordQueueIterator<T> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }
}

impl<T> RecordQueueIterator<T> {
    pub fn new(queue: VecDeque<T>) -> Self {
        Self { queue }
    }

    pub fn has_next(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Number of items not yet consumed.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

impl<T> Iterator for RecordQueueIterator<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.queue.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.queue.len(), Some(self.queue.len()))
    }
}

impl<T> ExactSizeIterator for RecordQueueIterator<T> {}

impl<T> FromIterator<T> for RecordQueueIterator<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erasing() {
        let mut it = RecordQueueIterator::from_iter([1, 2, 3]);

        assert!(it.has_next());
        assert_eq!(3, it.len());
        assert_eq!(Some(1), it.next());
        assert_eq!(2, it.remaining());
        assert_eq!(vec![2, 3], it.by_ref().collect::<Vec<_>>());

        assert!(!it.has_next());
        assert_eq!(None, it.next());
    }

    #[test]
    fn test_clear() {
        let mut it = RecordQueueIterator::from_iter(["a", "b"]);
        it.clear();
        assert!(!it.has_next());
        assert_eq!(None, it.next());
    }

    #[test]
    fn test_default_is_empty() {
        let mut it = RecordQueueIterator::<u8>::default();
        assert_eq!(0, it.remaining());
        assert_eq!(None, it.next());
    }
}
