//! The room collection view.
//!
//! Keeps every room the store knows about in two name-ordered buckets,
//! private and public. A room lives in exactly one bucket at a time.

use std::sync::{Arc, Mutex, MutexGuard};

use chat_core::{Change, CollectionChange, Generation, OrderedCollection, Scope};
use chat_types::Room;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::session::{SessionError, SyncSession};
use crate::store::Store;

/// Which bucket a room belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomBucket {
    /// Rooms stored with the private access class.
    Private,
    /// Everything else.
    Public,
}

impl RoomBucket {
    /// The bucket for `room`.
    pub fn of(room: &Room) -> Self {
        Self::from_private(room.is_private)
    }

    /// The bucket for a privacy flag.
    pub fn from_private(is_private: bool) -> Self {
        if is_private {
            Self::Private
        } else {
            Self::Public
        }
    }

    /// Check if rooms in this bucket are private.
    pub fn is_private(self) -> bool {
        self == Self::Private
    }

    fn other(self) -> Self {
        match self {
            Self::Private => Self::Public,
            Self::Public => Self::Private,
        }
    }
}

/// Observer told about every index-level change to a bucket.
pub type RoomListObserver = Arc<dyn Fn(RoomBucket, CollectionChange) + Send + Sync>;

#[derive(Default)]
struct RoomListState {
    private: OrderedCollection<Room>,
    public: OrderedCollection<Room>,
    listening: bool,
    generation: Option<Generation>,
}

impl RoomListState {
    fn bucket(&self, bucket: RoomBucket) -> &OrderedCollection<Room> {
        match bucket {
            RoomBucket::Private => &self.private,
            RoomBucket::Public => &self.public,
        }
    }

    fn bucket_mut(&mut self, bucket: RoomBucket) -> &mut OrderedCollection<Room> {
        match bucket {
            RoomBucket::Private => &mut self.private,
            RoomBucket::Public => &mut self.public,
        }
    }

    /// Apply one room-list change, returning what moved where.
    fn apply(&mut self, change: Change<Room>) -> Vec<(RoomBucket, CollectionChange)> {
        let mut changes = Vec::with_capacity(2);
        match change {
            Change::Upsert(room) => {
                let bucket = RoomBucket::of(&room);
                // A privacy flip moves the room between buckets.
                let stale = self.bucket_mut(bucket.other()).remove(&room.room_id);
                changes.push((bucket.other(), stale));
                changes.push((bucket, self.bucket_mut(bucket).upsert(room)));
            }
            Change::Delete(room_id) => {
                for bucket in [RoomBucket::Private, RoomBucket::Public] {
                    changes.push((bucket, self.bucket_mut(bucket).remove(&room_id)));
                }
            }
        }
        changes.retain(|(_, change)| *change != CollectionChange::Unchanged);
        changes
    }

    fn clear(&mut self) {
        self.private.clear();
        self.public.clear();
    }
}

fn lock(state: &Mutex<RoomListState>) -> MutexGuard<'_, RoomListState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Both room buckets, kept in sync with the store's room list.
///
/// Stops listening when dropped.
pub struct RoomListView<S: Store> {
    session: SyncSession<S>,
    state: Arc<Mutex<RoomListState>>,
    observer: Option<RoomListObserver>,
}

impl<S: Store> RoomListView<S> {
    /// Create a view without an observer.
    pub fn new(session: SyncSession<S>) -> Self {
        Self {
            session,
            state: Arc::new(Mutex::new(RoomListState::default())),
            observer: None,
        }
    }

    /// Create a view that reports every bucket change to `observer`.
    pub fn with_observer<F>(session: SyncSession<S>, observer: F) -> Self
    where
        F: Fn(RoomBucket, CollectionChange) + Send + Sync + 'static,
    {
        Self {
            session,
            state: Arc::new(Mutex::new(RoomListState::default())),
            observer: Some(Arc::new(observer)),
        }
    }

    /// Start following the room list.
    ///
    /// If some other owner already holds the room-list subscription this is
    /// a no-op and the view stays idle.
    pub fn start_listening(&self) -> Result<(), SessionError> {
        if self.is_listening() {
            return Ok(());
        }
        if self.session.is_watching(Scope::RoomList) {
            debug!("room list watched by another owner, not listening");
            return Ok(());
        }

        lock(&self.state).listening = true;

        let state = Arc::clone(&self.state);
        let observer = self.observer.clone();
        let result = self.session.watch_room_list(move |change| {
            let changes = {
                let mut state = lock(&state);
                if !state.listening {
                    debug!("room list change after stop, ignored");
                    return;
                }
                state.apply(change)
            };
            if let Some(observer) = &observer {
                for (bucket, change) in changes {
                    observer(bucket, change);
                }
            }
        });

        let mut state = lock(&self.state);
        match result {
            Ok(generation) => {
                state.generation = Some(generation);
                Ok(())
            }
            Err(e) => {
                state.listening = false;
                Err(e)
            }
        }
    }

    /// Stop following the room list and empty both buckets.
    pub fn stop_listening(&self) {
        let generation = {
            let mut state = lock(&self.state);
            state.listening = false;
            state.clear();
            state.generation.take()
        };
        if let Some(generation) = generation {
            self.session.release(Scope::RoomList, generation);
        }
    }

    /// Check if the view is following the room list.
    pub fn is_listening(&self) -> bool {
        lock(&self.state).listening
    }

    /// Number of rooms in `bucket`.
    pub fn count(&self, bucket: RoomBucket) -> usize {
        lock(&self.state).bucket(bucket).len()
    }

    /// The room at `index` in `bucket`.
    pub fn room(&self, bucket: RoomBucket, index: usize) -> Option<Room> {
        lock(&self.state).bucket(bucket).get(index).cloned()
    }

    /// Snapshot of `bucket`, in display order.
    pub fn rooms(&self, bucket: RoomBucket) -> Vec<Room> {
        lock(&self.state).bucket(bucket).as_slice().to_vec()
    }

    /// Create a room in `bucket`.
    ///
    /// The local insert is queued on the coordinator ahead of the write, so
    /// it lands before the store's echo, which then replaces it in place.
    /// The observer hears about it from the coordinator like any other change.
    pub fn create(&self, name: &str, bucket: RoomBucket) -> JoinHandle<()> {
        let mut room = Room::new(name);
        room.is_private = bucket.is_private();

        let state = Arc::clone(&self.state);
        let observer = self.observer.clone();
        let local = room.clone();
        self.session.enqueue(move || {
            let change = lock(&state).bucket_mut(bucket).upsert(local);
            if let Some(observer) = &observer {
                observer(bucket, change);
            }
        });

        self.session.create_room(&room)
    }

    /// The session this view talks to.
    pub fn session(&self) -> &SyncSession<S> {
        &self.session
    }
}

impl<S: Store> Drop for RoomListView<S> {
    fn drop(&mut self) {
        if self.is_listening() {
            self.stop_listening();
        }
    }
}
