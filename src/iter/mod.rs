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

//! Iterators over a store that is modified while they are open.
//!
//! - [`InnerIterator`] wraps a lazily created store iterator and can drain it into a buffer.
//! - [`RecordQueueIterator`] is a detached snapshot.
//! - [`OuterIterator`] is what callers hold; it switches from the former to the latter
//!   when a modification resolves it.

pub(crate) mod handle;
pub mod inner;
pub mod outer;
pub mod queue;

pub use inner::InnerIterator;
pub use outer::OuterIterator;
pub use queue::RecordQueueIterator;

use crate::RecordResult;

/// The two operations an outer iterator performs on whatever it currently delegates to.
pub(crate) trait Cursor<R> {
    fn has_next(&mut self) -> bool;

    fn next_record(&mut self) -> Option<RecordResult<R>>;
}

impl<R> Cursor<R> for RecordQueueIterator<RecordResult<R>> {
    fn has_next(&mut self) -> bool {
        RecordQueueIterator::has_next(self)
    }

    fn next_record(&mut self) -> Option<RecordResult<R>> {
        self.next()
    }
}
