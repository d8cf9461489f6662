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

//! Subject/predicate/object records and the patterns used to look them up.
//!
//! The concurrent wrappers never look inside a record;
//! these types are what the bundled [`MemStore`](crate::impls::mem_store::MemStore) stores.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// A term in a triple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Node {
    Iri(String),
    Blank(String),
    Literal(String),
}

impl Node {
    pub fn iri(iri: impl ToString) -> Self {
        Node::Iri(iri.to_string())
    }

    pub fn blank(label: impl ToString) -> Self {
        Node::Blank(label.to_string())
    }

    pub fn literal(lexical: impl ToString) -> Self {
        Node::Literal(lexical.to_string())
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Node::Blank(_))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Iri(iri) => write!(f, "<{}>", iri),
            Node::Blank(label) => write!(f, "_:{}", label),
            Node::Literal(lexical) => write!(f, "{:?}", lexical),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Node,
    pub predicate: Node,
    pub object: Node,
}

impl Triple {
    pub fn new(subject: Node, predicate: Node, object: Node) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

/// Matches triples slot by slot; a `None` slot matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriplePattern {
    pub subject: Option<Node>,
    pub predicate: Option<Node>,
    pub object: Option<Node>,
}

impl TriplePattern {
    /// Matches every triple.
    pub const ANY: TriplePattern = TriplePattern {
        subject: None,
        predicate: None,
        object: None,
    };

    pub fn new(subject: Option<Node>, predicate: Option<Node>, object: Option<Node>) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    pub fn is_concrete(&self) -> bool {
        self.subject.is_some() && self.predicate.is_some() && self.object.is_some()
    }

    pub fn matches(&self, t: &Triple) -> bool {
        fn slot(p: &Option<Node>, n: &Node) -> bool {
            p.as_ref().map_or(true, |p| p == n)
        }

        slot(&self.subject, &t.subject)
            && slot(&self.predicate, &t.predicate)
            && slot(&self.object, &t.object)
    }
}

impl From<&Triple> for TriplePattern {
    fn from(t: &Triple) -> Self {
        Self::new(
            Some(t.subject.clone()),
            Some(t.predicate.clone()),
            Some(t.object.clone()),
        )
    }
}
