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

use std::io;

/// Errors surfaced by a store or by the concurrent wrappers around it.
#[derive(Clone, PartialEq, Eq, thiserror::Error, Debug)]
pub enum StoreError {
    /// The store refused to add a record, e.g. it is read-only.
    #[error("InsertionRejected: {0}")]
    InsertionRejected(String),

    /// The store refused to remove a record.
    #[error("DeletionRejected: {0}")]
    DeletionRejected(String),

    /// The underlying store iterator failed while it was being consumed.
    ///
    /// The iterator is released from the open-iterator registry before this is returned.
    #[error("IteratorFault: {0}")]
    IteratorFault(String),

    /// An open iterator handle was found in a state it can not be in.
    #[error("IllegalConcurrentState: {0}")]
    IllegalConcurrentState(String),

    /// The store has been closed.
    #[error("Closed: store is closed")]
    Closed,

    /// The prefix table was locked with `PrefixMapping::lock()` and can not be changed.
    #[error("PrefixMappingLocked: can not {0}")]
    PrefixMappingLocked(String),

    /// A namespace prefix that is not a valid name.
    #[error("InvalidPrefix: {0:?}")]
    InvalidPrefix(String),
}

impl StoreError {
    pub fn iterator_fault(msg: impl ToString) -> Self {
        StoreError::IteratorFault(msg.to_string())
    }

    pub fn illegal_state(msg: impl ToString) -> Self {
        StoreError::IllegalConcurrentState(msg.to_string())
    }
}

impl From<StoreError> for io::Error {
    fn from(e: StoreError) -> Self {
        let kind = match &e {
            StoreError::InsertionRejected(_)
            | StoreError::DeletionRejected(_)
            | StoreError::PrefixMappingLocked(_) => io::ErrorKind::PermissionDenied,
            StoreError::InvalidPrefix(_) => io::ErrorKind::InvalidInput,
            StoreError::Closed => io::ErrorKind::NotConnected,
            StoreError::IteratorFault(_) | StoreError::IllegalConcurrentState(_) => {
                io::ErrorKind::Other
            }
        };
        io::Error::new(kind, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            "InsertionRejected: read-only",
            StoreError::InsertionRejected("read-only".to_string()).to_string()
        );
        assert_eq!(
            "IteratorFault: boom",
            StoreError::iterator_fault("boom").to_string()
        );
        assert_eq!("Closed: store is closed", StoreError::Closed.to_string());
        assert_eq!(
            "PrefixMappingLocked: can not set prefix ex",
            StoreError::PrefixMappingLocked("set prefix ex".to_string()).to_string()
        );
    }

    #[test]
    fn test_into_io_error() {
        let e: io::Error = StoreError::DeletionRejected("no".to_string()).into();
        assert_eq!(io::ErrorKind::PermissionDenied, e.kind());

        let e: io::Error = StoreError::Closed.into();
        assert_eq!(io::ErrorKind::NotConnected, e.kind());

        let e: io::Error = StoreError::illegal_state("x").into();
        assert_eq!(io::ErrorKind::Other, e.kind());
        assert_eq!("IllegalConcurrentState: x", e.to_string());
    }
}
