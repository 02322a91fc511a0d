use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use derive_more::Debug;

use crate::{Ty, TyRef};

/// A flattened, deduplicated set of member types.
///
/// Members remember the order they were first added in, which is the order
/// they display in. Comparison and hashing only look at the set, so
/// `int | str` and `str | int` are the same type.
#[derive(Debug, Default, Clone)]
#[debug("{members:?}")]
pub struct Union {
    members: Vec<TyRef>,
    set: BTreeSet<TyRef>,
}

impl Union {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member, splicing in the members of a nested union.
    pub fn insert(&mut self, ty: TyRef) {
        if let Ty::Union(nested) = &*ty {
            for member in nested.iter() {
                self.insert(member.clone());
            }
            return;
        }
        if self.set.insert(ty.clone()) {
            self.members.push(ty);
        }
    }

    /// Members in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, TyRef> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl FromIterator<TyRef> for Union {
    fn from_iter<T: IntoIterator<Item = TyRef>>(iter: T) -> Self {
        let mut union = Union::new();
        for ty in iter {
            union.insert(ty);
        }
        union
    }
}

impl FromIterator<Ty> for Union {
    fn from_iter<T: IntoIterator<Item = Ty>>(iter: T) -> Self {
        iter.into_iter().map(TyRef::from).collect()
    }
}

impl PartialEq for Union {
    fn eq(&self, other: &Self) -> bool {
        self.set == other.set
    }
}

impl Eq for Union {}

impl Hash for Union {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.set.hash(state);
    }
}

impl PartialOrd for Union {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Union {
    fn cmp(&self, other: &Self) -> Ordering {
        self.set.cmp(&other.set)
    }
}
