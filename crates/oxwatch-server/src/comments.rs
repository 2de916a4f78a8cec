use chrono::{DateTime, Utc};
use oxwatch_common::traits::{CommentKind, CommentStore, NewComment};
use oxwatch_common::types::ObjectKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub target: ObjectKey,
    pub kind: CommentKind,
    pub entry_time: DateTime<Utc>,
    pub author: String,
    pub text: String,
    pub persistent: bool,
}

/// Comments attached to monitored objects, keyed by id.
#[derive(Debug)]
pub struct CommentBook {
    comments: BTreeMap<u64, Comment>,
    next_id: u64,
}

impl Default for CommentBook {
    fn default() -> Self {
        Self {
            comments: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl CommentBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: u64) -> Option<&Comment> {
        self.comments.get(&id)
    }

    /// Comments on `target`, oldest first.
    pub fn for_object<'a>(&'a self, target: &'a ObjectKey) -> impl Iterator<Item = &'a Comment> {
        self.comments.values().filter(move |c| &c.target == target)
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }
}

impl CommentStore for CommentBook {
    fn add(&mut self, comment: NewComment) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.comments.insert(
            id,
            Comment {
                id,
                target: comment.target,
                kind: comment.kind,
                entry_time: comment.entry_time,
                author: comment.author,
                text: comment.text,
                persistent: comment.persistent,
            },
        );
        id
    }

    fn delete(&mut self, comment_id: u64) {
        self.comments.remove(&comment_id);
    }

    fn delete_acknowledgement_comments(&mut self, target: &ObjectKey) {
        self.comments.retain(|_, c| {
            !(c.kind == CommentKind::Acknowledgement && !c.persistent && &c.target == target)
        });
    }
}
