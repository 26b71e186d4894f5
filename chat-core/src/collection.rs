//! Ordered collection reconciler.
//!
//! An [`OrderedCollection`] is a sorted, identity-deduplicated sequence. Each
//! incoming [`Change`] is applied incrementally:
//!
//! 1. Linear scan for an element with the same identity.
//! 2. Upsert of a present element replaces it **in place** (no re-sort, even
//!    if the sort key changed).
//! 3. Upsert of an absent element is inserted at the index equal to the
//!    number of elements that sort strictly before it, so equal keys keep
//!    arrival order. After a replace in place has left the sequence out of
//!    order, that count is still what decides the index.
//! 4. Delete of a present element removes it.
//! 5. Delete of an absent element does nothing.
//!
//! Every step is O(n); room and message counts per session are small.

use chat_types::{Message, MessageId, Room, RoomId};
use std::fmt;

/// An entity that can live in an [`OrderedCollection`].
pub trait Reconcile {
    /// Identity type. Two elements with equal identities are the same entity.
    type Id: PartialEq + Clone + fmt::Debug;

    /// The element's identity.
    fn identity(&self) -> &Self::Id;

    /// Strict ordering: `true` iff `self` sorts before `other`.
    fn sorts_before(&self, other: &Self) -> bool;
}

impl Reconcile for Room {
    type Id = RoomId;

    fn identity(&self) -> &RoomId {
        &self.room_id
    }

    fn sorts_before(&self, other: &Self) -> bool {
        self.room_name < other.room_name
    }
}

impl Reconcile for Message {
    type Id = MessageId;

    fn identity(&self) -> &MessageId {
        &self.message_id
    }

    fn sorts_before(&self, other: &Self) -> bool {
        self.timestamp < other.timestamp
    }
}

/// One add/update/remove event against a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Change<T: Reconcile> {
    /// Insert the entity, or replace the element with the same identity.
    Upsert(T),
    /// Remove the element with this identity.
    Delete(T::Id),
}

/// What applying a [`Change`] did, by index. Lets observers update a list
/// widget row by row instead of reloading it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionChange {
    /// A new element now sits at this index.
    Inserted(usize),
    /// The element at this index was replaced.
    Replaced(usize),
    /// The element at this index was removed.
    Removed(usize),
    /// Nothing changed.
    Unchanged,
}

/// A sorted, deduplicated sequence of entities.
#[derive(Debug, Clone)]
pub struct OrderedCollection<T> {
    items: Vec<T>,
}

impl<T> Default for OrderedCollection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Reconcile> OrderedCollection<T> {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one change and report what moved.
    pub fn apply(&mut self, change: Change<T>) -> CollectionChange {
        match change {
            Change::Upsert(item) => self.upsert(item),
            Change::Delete(id) => self.remove(&id),
        }
    }

    /// Insert `item`, or replace the element with the same identity in place.
    pub fn upsert(&mut self, item: T) -> CollectionChange {
        if let Some(index) = self.position(item.identity()) {
            self.items[index] = item;
            return CollectionChange::Replaced(index);
        }
        let index = self
            .items
            .iter()
            .filter(|existing| existing.sorts_before(&item))
            .count();
        self.items.insert(index, item);
        CollectionChange::Inserted(index)
    }

    /// Remove the element with identity `id`, if present.
    pub fn remove(&mut self, id: &T::Id) -> CollectionChange {
        match self.position(id) {
            Some(index) => {
                self.items.remove(index);
                CollectionChange::Removed(index)
            }
            None => CollectionChange::Unchanged,
        }
    }

    /// Index of the element with identity `id`.
    pub fn position(&self, id: &T::Id) -> Option<usize> {
        self.items.iter().position(|item| item.identity() == id)
    }

    /// Whether an element with identity `id` is present.
    pub fn contains(&self, id: &T::Id) -> bool {
        self.position(id).is_some()
    }

    /// Element at `index`.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate in order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// All elements in order.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Drop every element.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_types::UserIdentity;

    fn room(id: &str, name: &str) -> Room {
        Room::with_id(RoomId::new(id).unwrap(), name, false, false)
    }

    fn message(id: &str, timestamp: i64) -> Message {
        let mut msg = Message::compose(id, &UserIdentity::new("u", "U"), timestamp);
        msg.message_id = MessageId::new(id).unwrap();
        msg
    }

    fn names(rooms: &OrderedCollection<Room>) -> Vec<&str> {
        rooms.iter().map(|r| r.room_name.as_str()).collect()
    }

    fn ids(messages: &OrderedCollection<Message>) -> Vec<&str> {
        messages.iter().map(|m| m.message_id.as_str()).collect()
    }

    fn is_sorted_by_name(rooms: &OrderedCollection<Room>) -> bool {
        rooms
            .as_slice()
            .windows(2)
            .all(|w| w[0].room_name <= w[1].room_name)
    }

    // ===========================================
    // Insertion Order Tests
    // ===========================================

    #[test]
    fn rooms_insert_in_name_order() {
        let mut rooms = OrderedCollection::new();
        assert_eq!(rooms.upsert(room("b", "Beta")), CollectionChange::Inserted(0));
        assert_eq!(rooms.upsert(room("a", "Alpha")), CollectionChange::Inserted(0));
        assert_eq!(names(&rooms), vec!["Alpha", "Beta"]);
    }

    #[test]
    fn messages_insert_in_timestamp_order() {
        let mut messages = OrderedCollection::new();
        messages.upsert(message("m1", 100));
        messages.upsert(message("m2", 50));
        assert_eq!(ids(&messages), vec!["m2", "m1"]);
    }

    #[test]
    fn equal_keys_keep_arrival_order() {
        let mut messages = OrderedCollection::new();
        messages.upsert(message("first", 10));
        messages.upsert(message("second", 10));
        messages.upsert(message("early", 5));
        messages.upsert(message("third", 10));
        assert_eq!(ids(&messages), vec!["early", "first", "second", "third"]);
    }

    #[test]
    fn equal_room_names_keep_arrival_order() {
        let mut rooms = OrderedCollection::new();
        rooms.upsert(room("r1", "Same"));
        assert_eq!(rooms.upsert(room("r2", "Same")), CollectionChange::Inserted(1));
        assert_eq!(rooms.get(0).unwrap().room_id.as_str(), "r1");
    }

    // ===========================================
    // Replace-in-place Tests
    // ===========================================

    #[test]
    fn rename_replaces_in_place_without_resort() {
        let mut rooms = OrderedCollection::new();
        rooms.upsert(room("r1", "X"));
        rooms.upsert(room("r2", "Z"));

        let change = rooms.upsert(room("r1", "Y"));

        assert_eq!(change, CollectionChange::Replaced(0));
        assert_eq!(rooms.len(), 2);
        assert_eq!(names(&rooms), vec!["Y", "Z"]);

        // A rename past its neighbour keeps its slot too.
        rooms.upsert(room("r1", "ZZ"));
        assert_eq!(names(&rooms), vec!["ZZ", "Z"]);
    }

    #[test]
    fn insert_after_rename_counts_preceding_elements() {
        let mut rooms = OrderedCollection::new();
        rooms.upsert(room("r1", "B"));
        rooms.upsert(room("r2", "D"));
        rooms.upsert(room("r1", "E"));
        assert_eq!(names(&rooms), vec!["E", "D"]);

        // Neither "E" nor "D" sorts before "C".
        assert_eq!(rooms.upsert(room("r3", "C")), CollectionChange::Inserted(0));
        assert_eq!(names(&rooms), vec!["C", "E", "D"]);

        // "C" and "D" sort before "DD", though "D" sits last.
        assert_eq!(rooms.upsert(room("r4", "DD")), CollectionChange::Inserted(2));
        assert_eq!(names(&rooms), vec!["C", "E", "DD", "D"]);
    }

    #[test]
    fn repeated_upsert_is_idempotent() {
        let mut rooms = OrderedCollection::new();
        rooms.upsert(room("a", "Alpha"));
        rooms.upsert(room("c", "Gamma"));
        rooms.upsert(room("b", "Beta"));
        let before: Vec<String> = names(&rooms).iter().map(|s| s.to_string()).collect();

        assert_eq!(rooms.upsert(room("b", "Beta")), CollectionChange::Replaced(1));

        assert_eq!(names(&rooms), before);
        assert_eq!(rooms.len(), 3);
    }

    // ===========================================
    // Deletion Tests
    // ===========================================

    #[test]
    fn delete_removes_exactly_that_element() {
        let mut rooms = OrderedCollection::new();
        rooms.upsert(room("a", "Alpha"));
        rooms.upsert(room("b", "Beta"));
        rooms.upsert(room("c", "Gamma"));

        let change = rooms.apply(Change::Delete(RoomId::new("b").unwrap()));

        assert_eq!(change, CollectionChange::Removed(1));
        assert_eq!(names(&rooms), vec!["Alpha", "Gamma"]);
    }

    #[test]
    fn delete_of_absent_identity_is_noop() {
        let mut rooms = OrderedCollection::new();
        rooms.upsert(room("a", "Alpha"));

        let change = rooms.apply(Change::Delete(RoomId::new("zzz").unwrap()));

        assert_eq!(change, CollectionChange::Unchanged);
        assert_eq!(rooms.len(), 1);
    }

    #[test]
    fn double_delete_is_noop() {
        let mut rooms = OrderedCollection::new();
        rooms.upsert(room("r1", "R1"));
        let id = RoomId::new("r1").unwrap();

        assert_eq!(rooms.remove(&id), CollectionChange::Removed(0));
        assert!(rooms.is_empty());
        assert_eq!(rooms.remove(&id), CollectionChange::Unchanged);
    }

    // ===========================================
    // Order Invariant Tests
    // ===========================================

    #[test]
    fn mixed_sequence_stays_sorted_without_renames() {
        let mut rooms = OrderedCollection::new();
        let names_in = ["kiwi", "apple", "fig", "banana", "apple", "zucchini", "cherry"];
        for (i, name) in names_in.iter().enumerate() {
            rooms.upsert(room(&format!("r{}", i), name));
            assert!(is_sorted_by_name(&rooms));
        }
        for i in [2, 0, 5] {
            rooms.remove(&RoomId::new(format!("r{}", i)).unwrap());
            assert!(is_sorted_by_name(&rooms));
        }
        assert_eq!(rooms.len(), 4);
    }

    #[test]
    fn clear_empties_collection() {
        let mut messages = OrderedCollection::new();
        messages.upsert(message("m1", 1));
        messages.clear();
        assert!(messages.is_empty());
        assert!(!messages.contains(&MessageId::new("m1").unwrap()));
    }
}
