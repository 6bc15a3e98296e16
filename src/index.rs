//! In-memory duplicate index: a crit-bit trie over content fingerprints.
//!
//! # Overview
//!
//! The index maps each distinct [`Fingerprint`] seen during a run to the
//! path of the first file observed with it (the *representative*). It is
//! insert-only: nodes are never removed or rewritten after creation, which
//! matches a single forward scan of the tree.
//!
//! Internally this is a binary crit-bit trie. Each branch holds the bit
//! index at which its two subtrees diverge; along any root-to-leaf walk
//! those positions strictly increase, so a lookup inspects each bit at most
//! once and terminates within 128 steps.
//!
//! # Lookup contract
//!
//! [`DuplicateIndex::find_nearest`] walks the trie by the query's bits and
//! returns the leaf it lands on. That leaf is the best candidate, *not* a
//! confirmed match: the caller must compare the full keys with
//! [`Fingerprint::divergence`] to decide between "duplicate" and "insert at
//! this bit". The returned view exposes the leaf's key precisely so the
//! caller can do that without re-reading the representative file.
//!
//! # Example
//!
//! ```
//! use dupelink::fingerprint::Fingerprint;
//! use dupelink::index::DuplicateIndex;
//! use std::path::PathBuf;
//!
//! let mut index = DuplicateIndex::new();
//! let key = Fingerprint::from_bytes([7u8; 16]);
//! index.insert(key, PathBuf::from("/tree/first.bin"), None).unwrap();
//!
//! let nearest = index.find_nearest(&key).unwrap();
//! assert_eq!(nearest.key.divergence(&key), None); // exact match
//! ```

use std::path::{Path, PathBuf};

use crate::fingerprint::{Fingerprint, FINGERPRINT_BITS};

/// Errors from the duplicate index.
///
/// Both variants indicate a defect in the calling code, not a user
/// condition; a run cannot meaningfully continue after either.
#[derive(thiserror::Error, Debug)]
pub enum IndexError {
    /// `find_nearest` was called on an index with no entries.
    #[error("lookup on an empty duplicate index")]
    Empty,

    /// An insert violated the index contract (bad divergence bit,
    /// duplicate key, or a branch already claiming the divergence bit).
    #[error("duplicate index invariant violated: {0}")]
    InvariantViolation(String),
}

/// A trie node: either a key/path leaf or a one-bit decision branch.
#[derive(Debug)]
enum Node {
    Leaf {
        key: Fingerprint,
        path: PathBuf,
    },
    Branch {
        /// Bit index deciding between the subtrees. Strictly greater than
        /// every branch position above it.
        position: u8,
        /// Subtree for keys with bit `position` clear.
        left: Box<Node>,
        /// Subtree for keys with bit `position` set.
        right: Box<Node>,
    },
}

/// Leaf view returned by [`DuplicateIndex::find_nearest`].
#[derive(Debug, Clone, Copy)]
pub struct Nearest<'a> {
    /// The stored fingerprint of the candidate.
    pub key: &'a Fingerprint,
    /// Representative path: the first file observed with `key`.
    pub path: &'a Path,
}

/// Content-addressed duplicate index for one scan run.
#[derive(Debug, Default)]
pub struct DuplicateIndex {
    root: Option<Box<Node>>,
    len: usize,
}

impl DuplicateIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct fingerprints stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the index holds no entries yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Walk the trie by the query's bits and return the leaf reached.
    ///
    /// Single downward pass, no backtracking, no full-key comparison:
    /// the caller decides equality via [`Fingerprint::divergence`] on the
    /// returned key.
    ///
    /// # Errors
    ///
    /// [`IndexError::Empty`] when the index has no entries.
    pub fn find_nearest(&self, key: &Fingerprint) -> Result<Nearest<'_>, IndexError> {
        let mut node = self.root.as_deref().ok_or(IndexError::Empty)?;
        loop {
            match node {
                Node::Leaf { key: stored, path } => {
                    return Ok(Nearest {
                        key: stored,
                        path,
                    })
                }
                Node::Branch {
                    position,
                    left,
                    right,
                } => {
                    node = if key.bit(*position) { right } else { left };
                }
            }
        }
    }

    /// Insert a new key with its representative path.
    ///
    /// `at` is the divergence bit against the nearest existing leaf, as
    /// computed by the caller from `find_nearest` + `divergence`. It must
    /// be `None` exactly when the index is empty (the first entry becomes
    /// the root leaf) and `Some(bit)` with `bit < 128` otherwise.
    ///
    /// The insert walks past every branch whose position precedes `at`
    /// and splices a new branch there: one side is the displaced subtree,
    /// the other the new leaf, sides chosen by the new key's bit value.
    ///
    /// # Errors
    ///
    /// [`IndexError::InvariantViolation`] when `at` disagrees with the
    /// index state: missing or superfluous, out of range, colliding with
    /// an existing branch position, or derived from a key equal to one
    /// already stored. These abort the run; the index may be left
    /// unusable.
    pub fn insert(
        &mut self,
        key: Fingerprint,
        path: PathBuf,
        at: Option<u8>,
    ) -> Result<(), IndexError> {
        match (self.root.take(), at) {
            (None, None) => {
                self.root = Some(Box::new(Node::Leaf { key, path }));
            }
            (None, Some(bit)) => {
                return Err(IndexError::InvariantViolation(format!(
                    "divergence bit {bit} supplied for the first entry"
                )));
            }
            (Some(root), None) => {
                // Put the tree back before failing so the state is inspectable.
                self.root = Some(root);
                return Err(IndexError::InvariantViolation(
                    "no divergence bit supplied for a non-empty index".into(),
                ));
            }
            (Some(root), Some(bit)) => {
                if bit >= FINGERPRINT_BITS {
                    self.root = Some(root);
                    return Err(IndexError::InvariantViolation(format!(
                        "divergence bit {bit} out of range"
                    )));
                }
                self.root = Some(Self::splice(root, key, path, bit)?);
            }
        }
        self.len += 1;
        Ok(())
    }

    /// Descend past branches the new key does not affect, then rebuild the
    /// slot as a branch at the divergence bit.
    fn splice(
        node: Box<Node>,
        key: Fingerprint,
        path: PathBuf,
        at: u8,
    ) -> Result<Box<Node>, IndexError> {
        match *node {
            Node::Branch {
                position,
                left,
                right,
            } if position <= at => {
                if position == at {
                    return Err(IndexError::InvariantViolation(format!(
                        "branch already decides bit {at}"
                    )));
                }
                // Recurse on the side the new key will end up on.
                Ok(if key.bit(position) {
                    Box::new(Node::Branch {
                        position,
                        left,
                        right: Self::splice(right, key, path, at)?,
                    })
                } else {
                    Box::new(Node::Branch {
                        position,
                        left: Self::splice(left, key, path, at)?,
                        right,
                    })
                })
            }
            displaced => {
                if let Node::Leaf { key: stored, .. } = &displaced {
                    if *stored == key {
                        return Err(IndexError::InvariantViolation(format!(
                            "insert of an already stored key {}",
                            key.to_hex()
                        )));
                    }
                }
                let leaf = Box::new(Node::Leaf { key, path });
                let displaced = Box::new(displaced);
                // The displaced subtree takes the side the new key's bit
                // does not select.
                let (left, right) = if key.bit(at) {
                    (displaced, leaf)
                } else {
                    (leaf, displaced)
                };
                Ok(Box::new(Node::Branch {
                    position: at,
                    left,
                    right,
                }))
            }
        }
    }

    /// Check that branch positions strictly increase on every root-to-leaf
    /// path. Test support.
    #[cfg(test)]
    fn positions_strictly_increase(&self) -> bool {
        fn check(node: &Node, floor: Option<u8>) -> bool {
            match node {
                Node::Leaf { .. } => true,
                Node::Branch {
                    position,
                    left,
                    right,
                } => {
                    if floor.is_some_and(|f| *position <= f) {
                        return false;
                    }
                    check(left, Some(*position)) && check(right, Some(*position))
                }
            }
        }
        self.root.as_deref().is_none_or(|root| check(root, None))
    }
}
