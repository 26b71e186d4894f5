//! The room detail and message stream view.

use std::sync::{Arc, Mutex, MutexGuard};

use chat_core::{Change, CollectionChange, Generation, OrderedCollection, Scope};
use chat_types::{Message, Room};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::session::{SessionError, SyncSession};
use crate::store::Store;

/// Observer told about every index-level change to the message stream.
pub type MessageObserver = Arc<dyn Fn(CollectionChange) + Send + Sync>;

/// Observer told about every change to the room itself, after the snapshot
/// has been updated.
pub type RoomObserver = Arc<dyn Fn(&Change<Room>) + Send + Sync>;

struct RoomState {
    room: Room,
    messages: OrderedCollection<Message>,
    listening: bool,
    room_generation: Option<Generation>,
    messages_generation: Option<Generation>,
}

fn lock(state: &Mutex<RoomState>) -> MutexGuard<'_, RoomState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// One room plus its time-ordered messages.
///
/// Only the scopes with an observer are subscribed: a view without
/// `on_messages` never follows the message stream. Stops listening when
/// dropped.
pub struct RoomView<S: Store> {
    session: SyncSession<S>,
    state: Arc<Mutex<RoomState>>,
    on_messages: Option<MessageObserver>,
    on_room: Option<RoomObserver>,
}

impl<S: Store> RoomView<S> {
    /// Create a view of `room`.
    pub fn new(session: SyncSession<S>, room: Room) -> Self {
        Self {
            session,
            state: Arc::new(Mutex::new(RoomState {
                room,
                messages: OrderedCollection::new(),
                listening: false,
                room_generation: None,
                messages_generation: None,
            })),
            on_messages: None,
            on_room: None,
        }
    }

    /// Follow the message stream, reporting each change to `observer`.
    pub fn on_messages<F>(mut self, observer: F) -> Self
    where
        F: Fn(CollectionChange) + Send + Sync + 'static,
    {
        self.on_messages = Some(Arc::new(observer));
        self
    }

    /// Follow the room's own key, reporting each change to `observer`.
    pub fn on_room<F>(mut self, observer: F) -> Self
    where
        F: Fn(&Change<Room>) + Send + Sync + 'static,
    {
        self.on_room = Some(Arc::new(observer));
        self
    }

    /// Subscribe to the room and/or its messages.
    ///
    /// On error nothing stays subscribed.
    pub fn start_listening(&self) -> Result<(), SessionError> {
        let room_id = {
            let mut state = lock(&self.state);
            if state.listening {
                return Ok(());
            }
            state.listening = true;
            state.room.room_id.clone()
        };

        if let Some(observer) = self.on_room.clone() {
            let state = Arc::clone(&self.state);
            let result = self.session.watch_room(&room_id, move |change| {
                {
                    let mut state = lock(&state);
                    if !state.listening {
                        return;
                    }
                    if let Change::Upsert(room) = &change {
                        if room.room_id == state.room.room_id {
                            state.room = room.clone();
                        }
                    }
                }
                observer(&change);
            });
            match result {
                Ok(generation) => lock(&self.state).room_generation = Some(generation),
                Err(e) => {
                    self.stop_listening();
                    return Err(e);
                }
            }
        }

        if let Some(observer) = self.on_messages.clone() {
            let state = Arc::clone(&self.state);
            let result = self.session.watch_messages(&room_id, move |change| {
                let applied = {
                    let mut state = lock(&state);
                    if !state.listening {
                        return;
                    }
                    match change {
                        Change::Upsert(message) => state.messages.upsert(message),
                        Change::Delete(message_id) => {
                            debug!(%message_id, "message deletion ignored");
                            return;
                        }
                    }
                };
                observer(applied);
            });
            match result {
                Ok(generation) => lock(&self.state).messages_generation = Some(generation),
                Err(e) => {
                    self.stop_listening();
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    /// Release both subscriptions and drop the cached messages.
    pub fn stop_listening(&self) {
        let (room_generation, messages_generation) = {
            let mut state = lock(&self.state);
            state.listening = false;
            state.messages.clear();
            (state.room_generation.take(), state.messages_generation.take())
        };
        if let Some(generation) = room_generation {
            self.session.release(Scope::RoomDetail, generation);
        }
        if let Some(generation) = messages_generation {
            self.session.release(Scope::Messages, generation);
        }
    }

    /// Check if the view is listening.
    pub fn is_listening(&self) -> bool {
        lock(&self.state).listening
    }

    /// Current snapshot of the room.
    pub fn room(&self) -> Room {
        lock(&self.state).room.clone()
    }

    /// Number of cached messages.
    pub fn message_count(&self) -> usize {
        lock(&self.state).messages.len()
    }

    /// The message at `index`, oldest first.
    pub fn message(&self, index: usize) -> Option<Message> {
        lock(&self.state).messages.get(index).cloned()
    }

    /// Snapshot of the cached messages, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        lock(&self.state).messages.as_slice().to_vec()
    }

    /// Post `text` as the signed-in user.
    ///
    /// Nothing is inserted locally; the message shows up when the store
    /// echoes it. Returns `None` when no one is signed in.
    pub fn send(&self, text: &str) -> Option<JoinHandle<()>> {
        let Some(author) = self.session.current_user() else {
            debug!("send without identity ignored");
            return None;
        };
        let message = Message::compose_now(text, &author);
        let room_id = lock(&self.state).room.room_id.clone();
        Some(self.session.post_message(&room_id, &message))
    }

    /// Rename the room. `None` if the name is unchanged.
    ///
    /// The snapshot takes the new name right away, so a following edit
    /// writes both changes.
    pub fn rename(&self, name: &str) -> Option<JoinHandle<()>> {
        let room = {
            let mut state = lock(&self.state);
            if state.room.room_name == name {
                return None;
            }
            state.room.room_name = name.to_string();
            state.room.clone()
        };
        Some(self.session.edit_room(&room))
    }

    /// Change the room's privacy. `None` if it is unchanged.
    pub fn set_private(&self, is_private: bool) -> Option<JoinHandle<()>> {
        let room = {
            let mut state = lock(&self.state);
            if state.room.is_private == is_private {
                return None;
            }
            state.room.is_private = is_private;
            state.room.clone()
        };
        Some(self.session.edit_room(&room))
    }

    /// Stop listening and delete the room.
    pub fn delete(&self) -> JoinHandle<()> {
        self.stop_listening();
        let room_id = lock(&self.state).room.room_id.clone();
        self.session.delete_room(&room_id)
    }

    /// The session this view talks to.
    pub fn session(&self) -> &SyncSession<S> {
        &self.session
    }
}

impl<S: Store> Drop for RoomView<S> {
    fn drop(&mut self) {
        if self.is_listening() {
            self.stop_listening();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChatConfig;
    use crate::session::Coordinator;
    use crate::store::MockStore;
    use chat_types::{AccessClass, KeyPath, Notification, RoomId, UserIdentity};

    async fn session() -> (SyncSession<MockStore>, Coordinator<MockStore>, MockStore) {
        let store = MockStore::new();
        let (session, coordinator) = SyncSession::connect(store.clone(), ChatConfig::default())
            .await
            .unwrap();
        (session, coordinator, store)
    }

    fn lobby() -> Room {
        Room::with_id(RoomId::new("lobby").unwrap(), "Lobby", false, true)
    }

    fn remote_message(room: &Room, text: &str, timestamp: i64) -> (Message, Notification) {
        let author = UserIdentity::new("remote", "Remote");
        let message = Message::compose(text, &author, timestamp);
        let notification = Notification::upsert(
            KeyPath::message(&room.room_id, &message.message_id),
            message.to_wire().unwrap(),
            Some("remote".into()),
            AccessClass::PublicRead,
        );
        (message, notification)
    }

    // ===== Subscription Tests =====

    #[tokio::test]
    async fn only_observed_scopes_are_watched() {
        let (session, _coordinator, _store) = session().await;
        let view = RoomView::new(session.clone(), lobby()).on_room(|_| {});

        view.start_listening().unwrap();

        assert!(session.is_watching(Scope::RoomDetail));
        assert!(!session.is_watching(Scope::Messages));
    }

    #[tokio::test]
    async fn messages_are_ordered_by_timestamp() {
        let (session, mut coordinator, store) = session().await;
        let view = RoomView::new(session, lobby()).on_messages(|_| {});
        view.start_listening().unwrap();

        let (late, n1) = remote_message(&lobby(), "late", 100);
        let (early, n2) = remote_message(&lobby(), "early", 50);
        store.emit(n1);
        store.emit(n2);
        coordinator.drain();

        assert_eq!(view.messages(), vec![early, late]);
        assert_eq!(view.message(0).unwrap().message, "early");
    }

    #[tokio::test]
    async fn message_observer_sees_index_changes() {
        let (session, mut coordinator, store) = session().await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let view = RoomView::new(session, lobby())
            .on_messages(move |change| sink.lock().unwrap().push(change));
        view.start_listening().unwrap();

        let (_, n1) = remote_message(&lobby(), "b", 100);
        let (_, n2) = remote_message(&lobby(), "a", 50);
        store.emit(n1);
        store.emit(n2);
        coordinator.drain();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![CollectionChange::Inserted(0), CollectionChange::Inserted(0)]
        );
    }

    #[tokio::test]
    async fn message_deletion_is_ignored() {
        let (session, mut coordinator, store) = session().await;
        let view = RoomView::new(session, lobby()).on_messages(|_| {});
        view.start_listening().unwrap();
        let (message, n) = remote_message(&lobby(), "stay", 1);
        store.emit(n);

        store.emit(Notification::deletion(
            KeyPath::message(&lobby().room_id, &message.message_id),
            AccessClass::PublicRead,
        ));
        coordinator.drain();

        assert_eq!(view.message_count(), 1);
    }

    #[tokio::test]
    async fn room_updates_refresh_snapshot() {
        let (session, mut coordinator, store) = session().await;
        let view = RoomView::new(session, lobby()).on_room(|_| {});
        view.start_listening().unwrap();

        store.emit(Notification::upsert(
            KeyPath::room(&lobby().room_id),
            "Main Hall",
            None,
            AccessClass::Private,
        ));
        coordinator.drain();

        let room = view.room();
        assert_eq!(room.room_name, "Main Hall");
        assert!(room.is_private);
        assert!(!room.allow_update);
    }

    #[tokio::test]
    async fn stop_clears_messages_and_releases() {
        let (session, mut coordinator, store) = session().await;
        let view = RoomView::new(session.clone(), lobby())
            .on_room(|_| {})
            .on_messages(|_| {});
        view.start_listening().unwrap();
        let (_, n) = remote_message(&lobby(), "hi", 1);
        store.emit(n);
        coordinator.drain();
        assert_eq!(view.message_count(), 1);

        view.stop_listening();

        assert_eq!(view.message_count(), 0);
        assert!(!session.is_watching(Scope::RoomDetail));
        assert!(!session.is_watching(Scope::Messages));
        assert_eq!(store.listener_count(), 0);
    }

    #[tokio::test]
    async fn old_view_stop_keeps_new_view_subscription() {
        let (session, _coordinator, _store) = session().await;
        let first = RoomView::new(session.clone(), lobby()).on_messages(|_| {});
        let other = Room::with_id(RoomId::new("other").unwrap(), "Other", false, true);
        let second = RoomView::new(session.clone(), other).on_messages(|_| {});

        first.start_listening().unwrap();
        second.start_listening().unwrap();
        first.stop_listening();

        assert!(session.is_watching(Scope::Messages));
        assert_eq!(
            session.watched_key(Scope::Messages),
            Some(KeyPath::room_messages(&RoomId::new("other").unwrap()))
        );
    }

    // ===== Intent Tests =====

    #[tokio::test]
    async fn send_requires_identity() {
        let (session, _coordinator, store) = session().await;
        let view = RoomView::new(session, lobby());

        assert!(view.send("hello").is_none());
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn send_waits_for_echo() {
        let (session, mut coordinator, store) = session().await;
        session.authenticate(Some("ada")).await.unwrap();
        let view = RoomView::new(session, lobby()).on_messages(|_| {});
        view.start_listening().unwrap();

        let handle = view.send("hello").unwrap();
        assert_eq!(view.message_count(), 0);

        handle.await.unwrap();
        coordinator.drain();

        let message = view.message(0).unwrap();
        assert_eq!(message.message, "hello");
        assert_eq!(message.creator_name, "ada");
        assert_eq!(store.writes().len(), 1);
    }

    #[tokio::test]
    async fn unchanged_edits_are_skipped() {
        let (session, _coordinator, store) = session().await;
        let view = RoomView::new(session, lobby());

        assert!(view.rename("Lobby").is_none());
        assert!(view.set_private(false).is_none());

        view.rename("Foyer").unwrap().await.unwrap();
        view.set_private(true).unwrap().await.unwrap();

        let writes = store.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].data, "Foyer");
        assert_eq!(writes[1].data, "Foyer");
        assert_eq!(writes[1].acl, AccessClass::Private);
    }

    #[tokio::test]
    async fn set_private_then_rename_keeps_both_edits() {
        let (session, mut coordinator, store) = session().await;
        let view = RoomView::new(session, lobby()).on_room(|_| {});
        view.start_listening().unwrap();

        view.set_private(true).unwrap().await.unwrap();
        view.rename("Foyer").unwrap().await.unwrap();
        coordinator.drain();

        let writes = store.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].data, "Lobby");
        assert_eq!(writes[0].acl, AccessClass::Private);
        assert_eq!(writes[1].data, "Foyer");
        assert_eq!(writes[1].acl, AccessClass::Private);

        let room = view.room();
        assert_eq!(room.room_name, "Foyer");
        assert!(room.is_private);
    }

    #[tokio::test]
    async fn repeated_edit_is_skipped_before_echo() {
        let (session, _coordinator, store) = session().await;
        let view = RoomView::new(session, lobby());

        view.rename("Foyer").unwrap().await.unwrap();

        assert!(view.rename("Foyer").is_none());
        assert_eq!(store.writes().len(), 1);
    }

    #[tokio::test]
    async fn delete_stops_and_deletes() {
        let (session, _coordinator, store) = session().await;
        let view = RoomView::new(session.clone(), lobby()).on_room(|_| {});
        view.start_listening().unwrap();

        view.delete().await.unwrap();

        assert!(!view.is_listening());
        assert!(!session.is_watching(Scope::RoomDetail));
        assert_eq!(store.deletes(), vec![KeyPath::room(&lobby().room_id)]);
    }
}
