//! SyncSession - the subscription manager.
//!
//! [`SyncSession`] owns the store connection, the signed-in identity and the
//! three exclusive subscription slots. Views hold a clone of the session and
//! change subscriptions only through it.
//!
//! # Architecture
//!
//! ```text
//! Store callback ──enqueue──▶ channel ──▶ Coordinator ──decode──▶ view callback
//!   (any thread)        (scope, generation)   (one task)
//! ```
//!
//! Store callbacks never touch view state. They tag each notification with
//! the scope and generation of the registration that produced it and push it
//! onto an unbounded channel. The [`Coordinator`] is the single consumer: it
//! drops notifications whose generation is no longer active, decodes the
//! rest and invokes the registered callback, one notification at a time.
//! Local state changes that must interleave with store events (optimistic
//! inserts) go through the same queue via [`SyncSession::enqueue`].
//!
//! # Example
//!
//! ```ignore
//! let (session, coordinator) = SyncSession::connect(MockStore::new(), config).await?;
//! tokio::spawn(coordinator.run());
//!
//! session.authenticate(Some("ada")).await?;
//! session.watch_room_list(|change| println!("{:?}", change))?;
//! ```

use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};

use chat_core::{decode_message, decode_room, Change, Generation, Scope, SubscriptionSlot};
use chat_types::{AccessClass, KeyPath, Message, Notification, Room, RoomId, UserIdentity};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::{ChatConfig, ConfigError};
use crate::store::{ListenerId, NotificationCallback, Store, StoreError};

/// Session start-up and subscription errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration rejected.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The session has no live store connection.
    #[error("not connected")]
    NotConnected,

    /// The provider rejected the token.
    #[error("authentication with provider {provider} failed: {source}")]
    Failed {
        /// Provider id from the configuration.
        provider: String,
        /// Store error.
        #[source]
        source: StoreError,
    },
}

/// Callback for room-list and room-detail changes.
pub type RoomCallback = Arc<dyn Fn(Change<Room>) + Send + Sync>;

/// Callback for message-stream changes.
pub type MessageCallback = Arc<dyn Fn(Change<Message>) + Send + Sync>;

#[derive(Clone)]
enum Route {
    Rooms(RoomCallback),
    Messages(MessageCallback),
}

struct Watch {
    key: KeyPath,
    route: Route,
}

type Slot = SubscriptionSlot<ListenerId, Watch>;

#[derive(Default)]
struct Slots {
    next_generation: Generation,
    room_list: Slot,
    room_detail: Slot,
    messages: Slot,
}

impl Slots {
    fn slot(&self, scope: Scope) -> &Slot {
        match scope {
            Scope::RoomList => &self.room_list,
            Scope::RoomDetail => &self.room_detail,
            Scope::Messages => &self.messages,
        }
    }

    fn slot_mut(&mut self, scope: Scope) -> &mut Slot {
        match scope {
            Scope::RoomList => &mut self.room_list,
            Scope::RoomDetail => &mut self.room_detail,
            Scope::Messages => &mut self.messages,
        }
    }

    fn bump(&mut self) -> Generation {
        self.next_generation += 1;
        self.next_generation
    }
}

type Job = Box<dyn FnOnce() + Send>;

enum Dispatch {
    /// A store notification from the registration `generation` of `scope`.
    Notification {
        scope: Scope,
        generation: Generation,
        notification: Notification,
    },
    /// Local work run in queue order.
    Local(Job),
}

struct Shared<S: Store> {
    store: S,
    config: ChatConfig,
    identity: RwLock<Option<UserIdentity>>,
    slots: Mutex<Slots>,
    dispatch: mpsc::UnboundedSender<Dispatch>,
}

impl<S: Store> Shared<S> {
    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn current_user(&self) -> Option<UserIdentity> {
        self.identity
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set_identity(&self, identity: Option<UserIdentity>) {
        *self.identity.write().unwrap_or_else(|e| e.into_inner()) = identity;
    }
}

impl<S: Store> Drop for Shared<S> {
    fn drop(&mut self) {
        let slots = self.slots.get_mut().unwrap_or_else(|e| e.into_inner());
        for scope in [Scope::RoomList, Scope::RoomDetail, Scope::Messages] {
            if let Some(handle) = slots.slot_mut(scope).release() {
                self.store.unlisten(handle);
            }
        }
    }
}

/// The subscription manager.
///
/// Cheap to clone; clones share the connection, identity and slots.
pub struct SyncSession<S: Store> {
    shared: Arc<Shared<S>>,
}

impl<S: Store> Clone for SyncSession<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: Store> SyncSession<S> {
    /// Validate `config`, connect `store` and return the session together
    /// with the coordinator that must be run (or drained) to deliver events.
    pub async fn connect(store: S, config: ChatConfig) -> Result<(Self, Coordinator<S>), SessionError> {
        config.validate()?;
        let options = config.connect_options();
        store.connect(&options).await?;
        info!(host = %options.host, port = options.port, ssl = options.use_ssl, "connected to store");

        let (sender, receiver) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            store,
            config,
            identity: RwLock::new(None),
            slots: Mutex::new(Slots::default()),
            dispatch: sender,
        });
        let coordinator = Coordinator {
            shared: Arc::downgrade(&shared),
            receiver,
        };
        Ok((Self { shared }, coordinator))
    }

    /// Get the store (for testing).
    pub fn store(&self) -> &S {
        &self.shared.store
    }

    /// Get the configuration the session was started with.
    pub fn config(&self) -> &ChatConfig {
        &self.shared.config
    }

    // ===== Identity =====

    /// Authenticate with the configured provider.
    ///
    /// A non-empty `name` is appended verbatim to the token as `token(name)` and
    /// becomes the display name; otherwise the bare token is sent and the
    /// provider id is used as display name. On failure the previous identity
    /// is left in place.
    pub async fn authenticate(&self, name: Option<&str>) -> Result<UserIdentity, AuthError> {
        if !self.shared.store.is_connected() {
            return Err(AuthError::NotConnected);
        }

        let settings = &self.shared.config.store;
        let (token, display_name) = match name.filter(|n| !n.is_empty()) {
            Some(name) => (format!("{}({})", settings.token, name), name.to_string()),
            None => (settings.token.clone(), settings.provider.clone()),
        };

        let auth = self
            .shared
            .store
            .authenticate(&settings.provider, &token)
            .await
            .map_err(|source| {
                warn!(provider = %settings.provider, error = %source, "authentication failed");
                AuthError::Failed {
                    provider: settings.provider.clone(),
                    source,
                }
            })?;

        let identity = UserIdentity::new(auth.uid, display_name);
        info!(user = %identity.user_id, name = %identity.name, "signed in");
        self.shared.set_identity(Some(identity.clone()));
        Ok(identity)
    }

    /// The signed-in identity, if any.
    pub fn current_user(&self) -> Option<UserIdentity> {
        self.shared.current_user()
    }

    /// Forget the signed-in identity.
    ///
    /// Already decoded entities keep the attribution they were decoded with.
    pub fn sign_out(&self) {
        self.shared.set_identity(None);
        info!("signed out");
    }

    // ===== Subscriptions =====

    /// Follow every room (`rooms.*`).
    ///
    /// Only one room-list subscription exists at a time. Calling this while
    /// one is active changes nothing and returns the active generation; the
    /// first callback stays registered.
    pub fn watch_room_list<F>(&self, on_event: F) -> Result<Generation, SessionError>
    where
        F: Fn(Change<Room>) + Send + Sync + 'static,
    {
        let mut slots = self.shared.slots();
        if let Some(generation) = slots.room_list.generation() {
            debug!(generation, "room list already watched");
            return Ok(generation);
        }
        self.activate(
            &mut slots,
            Scope::RoomList,
            KeyPath::room_list(),
            Route::Rooms(Arc::new(on_event)),
        )
    }

    /// Follow one room's own key, replacing any previous room-detail watch.
    pub fn watch_room<F>(&self, room_id: &RoomId, on_event: F) -> Result<Generation, SessionError>
    where
        F: Fn(Change<Room>) + Send + Sync + 'static,
    {
        let mut slots = self.shared.slots();
        self.activate(
            &mut slots,
            Scope::RoomDetail,
            KeyPath::room(room_id),
            Route::Rooms(Arc::new(on_event)),
        )
    }

    /// Follow one room's messages, replacing any previous message watch.
    pub fn watch_messages<F>(&self, room_id: &RoomId, on_event: F) -> Result<Generation, SessionError>
    where
        F: Fn(Change<Message>) + Send + Sync + 'static,
    {
        let mut slots = self.shared.slots();
        self.activate(
            &mut slots,
            Scope::Messages,
            KeyPath::room_messages(room_id),
            Route::Messages(Arc::new(on_event)),
        )
    }

    /// Stop following the room list. Safe when not watching.
    pub fn unwatch_room_list(&self) {
        self.unwatch(Scope::RoomList);
    }

    /// Stop following the watched room. Safe when not watching.
    pub fn unwatch_room(&self) {
        self.unwatch(Scope::RoomDetail);
    }

    /// Stop following the watched message stream. Safe when not watching.
    pub fn unwatch_messages(&self) {
        self.unwatch(Scope::Messages);
    }

    /// Release `scope` only if `generation` is still the active one.
    ///
    /// Views use this so that tearing down an old registration can never
    /// release one that replaced it.
    pub fn release(&self, scope: Scope, generation: Generation) -> bool {
        let mut slots = self.shared.slots();
        if slots.slot(scope).generation() != Some(generation) {
            return false;
        }
        self.release_slot(&mut slots, scope);
        true
    }

    /// Check if `scope` has an active registration.
    pub fn is_watching(&self, scope: Scope) -> bool {
        self.shared.slots().slot(scope).is_listening()
    }

    /// Key path followed by `scope`, if any.
    pub fn watched_key(&self, scope: Scope) -> Option<KeyPath> {
        self.shared
            .slots()
            .slot(scope)
            .listener()
            .map(|watch| watch.key.clone())
    }

    fn unwatch(&self, scope: Scope) {
        let mut slots = self.shared.slots();
        self.release_slot(&mut slots, scope);
    }

    fn release_slot(&self, slots: &mut Slots, scope: Scope) {
        let generation = slots.slot(scope).generation();
        if let Some(handle) = slots.slot_mut(scope).release() {
            self.shared.store.unlisten(handle);
            debug!(%scope, ?generation, %handle, "unwatched");
        }
    }

    /// Release-then-listen. The old handle is gone before the new one can
    /// deliver anything.
    fn activate(
        &self,
        slots: &mut Slots,
        scope: Scope,
        key: KeyPath,
        route: Route,
    ) -> Result<Generation, SessionError> {
        self.release_slot(slots, scope);

        let generation = slots.bump();
        let handle = self
            .shared
            .store
            .listen(&key, self.forwarder(scope, generation))?;

        // Idle since release_slot above, so this is a plain Idle → Listening.
        let slot = slots.slot_mut(scope);
        debug_assert!(!slot.is_listening());
        *slot = SubscriptionSlot::Listening {
            handle,
            generation,
            listener: Watch {
                key: key.clone(),
                route,
            },
        };

        debug!(%scope, generation, %key, %handle, "watching");
        Ok(generation)
    }

    fn forwarder(&self, scope: Scope, generation: Generation) -> NotificationCallback {
        let sender = self.shared.dispatch.clone();
        Arc::new(move |notification| {
            let key = notification.key.clone();
            if sender
                .send(Dispatch::Notification {
                    scope,
                    generation,
                    notification,
                })
                .is_err()
            {
                trace!(%scope, %key, "coordinator gone, notification dropped");
            }
        })
    }

    /// Run `job` on the coordinator, after everything already queued.
    ///
    /// Anything that changes view state outside a store callback goes
    /// through here so observers are only ever called from the coordinator.
    pub fn enqueue<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.shared.dispatch.send(Dispatch::Local(Box::new(job))).is_err() {
            trace!("coordinator gone, local job dropped");
        }
    }

    // ===== Writes =====
    //
    // Writes never touch local state; views learn about the result from the
    // store's echo. Failures are logged inside the task.

    /// Write a new room.
    pub fn create_room(&self, room: &Room) -> JoinHandle<()> {
        self.write_room("create room", room)
    }

    /// Write a room's current name and privacy.
    pub fn edit_room(&self, room: &Room) -> JoinHandle<()> {
        self.write_room("edit room", room)
    }

    /// Delete a room, releasing the room-detail watch if it follows that room.
    pub fn delete_room(&self, room_id: &RoomId) -> JoinHandle<()> {
        let key = KeyPath::room(room_id);
        {
            let mut slots = self.shared.slots();
            let watched = slots
                .room_detail
                .listener()
                .map_or(false, |watch| watch.key == key);
            if watched {
                self.release_slot(&mut slots, Scope::RoomDetail);
            }
        }

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            if let Err(e) = shared.store.delete(&key).await {
                warn!(%key, error = %e, "delete room failed");
            }
        })
    }

    /// Write a message under its room.
    pub fn post_message(&self, room_id: &RoomId, message: &Message) -> JoinHandle<()> {
        let key = KeyPath::message(room_id, &message.message_id);
        let message = message.clone();
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let payload = match message.to_wire() {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(%key, error = %e, "message not serializable");
                    return;
                }
            };
            if let Err(e) = shared
                .store
                .write(&key, &payload, AccessClass::PublicRead)
                .await
            {
                warn!(%key, error = %e, "post message failed");
            }
        })
    }

    fn write_room(&self, action: &'static str, room: &Room) -> JoinHandle<()> {
        let key = KeyPath::room(&room.room_id);
        let name = room.room_name.clone();
        let acl = AccessClass::for_room(room.is_private);
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            if let Err(e) = shared.store.write(&key, &name, acl).await {
                warn!(%key, error = %e, "{} failed", action);
            }
        })
    }
}

/// Single consumer of store notifications.
///
/// Holds only a weak reference to the session: once every session clone is
/// gone, the channel closes and [`Coordinator::run`] returns.
pub struct Coordinator<S: Store> {
    shared: Weak<Shared<S>>,
    receiver: mpsc::UnboundedReceiver<Dispatch>,
}

impl<S: Store> Coordinator<S> {
    /// Deliver notifications until the session is dropped.
    pub async fn run(mut self) {
        while let Some(dispatch) = self.receiver.recv().await {
            self.deliver(dispatch);
        }
        debug!("coordinator stopped");
    }

    /// Deliver everything queued so far, returning how many notifications
    /// were taken off the queue (delivered or dropped).
    pub fn drain(&mut self) -> usize {
        let mut count = 0;
        while let Ok(dispatch) = self.receiver.try_recv() {
            self.deliver(dispatch);
            count += 1;
        }
        count
    }

    fn deliver(&self, dispatch: Dispatch) {
        let (scope, generation, notification) = match dispatch {
            Dispatch::Notification {
                scope,
                generation,
                notification,
            } => (scope, generation, notification),
            Dispatch::Local(job) => {
                job();
                return;
            }
        };
        let Some(shared) = self.shared.upgrade() else {
            return;
        };

        // Clone the route out so no lock is held while user code runs.
        let route = shared
            .slots()
            .slot(scope)
            .listener_for(generation)
            .map(|watch| watch.route.clone());

        let Some(route) = route else {
            debug!(%scope, generation, key = %notification.key, "stale notification dropped");
            return;
        };

        match route {
            Route::Rooms(callback) => {
                let user = shared.current_user();
                match decode_room(&notification, user.as_ref().map(|u| u.user_id.as_str())) {
                    Ok(change) => callback(change),
                    Err(e) => warn!(%scope, error = %e, "room notification dropped"),
                }
            }
            Route::Messages(callback) => match decode_message(&notification) {
                Ok(change) => callback(change),
                Err(e) => warn!(%scope, error = %e, "message notification dropped"),
            },
        }
    }
}
