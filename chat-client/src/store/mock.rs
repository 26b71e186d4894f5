//! Mock store for testing.
//!
//! Keeps key values in memory, echoes every write and delete back to the
//! matching listeners (as the real store does), and lets tests inject remote
//! notifications or force failures.

use super::{AuthData, ConnectOptions, ListenerId, NotificationCallback, Store, StoreError};
use async_trait::async_trait;
use chat_types::{AccessClass, KeyPath, Notification};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// A write observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    /// Key written.
    pub key: KeyPath,
    /// Data written.
    pub data: String,
    /// Access-control class requested.
    pub acl: AccessClass,
}

#[derive(Debug, Clone)]
struct StoredValue {
    key: KeyPath,
    data: String,
    acl: AccessClass,
    creator: Option<String>,
}

impl StoredValue {
    fn notification(&self) -> Notification {
        Notification::upsert(
            self.key.clone(),
            self.data.clone(),
            self.creator.clone(),
            self.acl,
        )
    }
}

#[derive(Default)]
struct MockStoreInner {
    connected: bool,
    connect_options: Option<ConnectOptions>,
    auth: Option<AuthData>,
    next_listener: u64,
    listeners: Vec<(ListenerId, KeyPath, NotificationCallback)>,
    values: BTreeMap<String, StoredValue>,
    writes: Vec<WriteRecord>,
    deletes: Vec<KeyPath>,
    fail_next_connect: Option<String>,
    fail_next_authenticate: Option<String>,
    fail_next_write: Option<String>,
    fail_next_delete: Option<String>,
}

/// Mock store for testing.
///
/// Clones share state, so a test can keep one handle while the session owns
/// another.
#[derive(Default, Clone)]
pub struct MockStore {
    inner: Arc<Mutex<MockStoreInner>>,
}

impl MockStore {
    /// Create a new mock store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockStoreInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Deliver `notification` to every listener whose key matches.
    fn deliver(&self, notification: &Notification) {
        let targets: Vec<NotificationCallback> = {
            let inner = self.lock();
            inner
                .listeners
                .iter()
                .filter(|(_, pattern, _)| pattern.matches(&notification.key))
                .map(|(_, _, callback)| Arc::clone(callback))
                .collect()
        };
        for callback in targets {
            callback(notification.clone());
        }
    }

    /// Inject a change made by another client.
    ///
    /// The stored value is updated so later listeners see it too.
    pub fn emit(&self, notification: Notification) {
        {
            let mut inner = self.lock();
            let path = notification.key.to_string();
            match (&notification.data, notification.exists) {
                (Some(data), true) => {
                    let acl = AccessClass::from_id(&notification.acl)
                        .unwrap_or(AccessClass::PublicRead);
                    inner.values.insert(
                        path,
                        StoredValue {
                            key: notification.key.clone(),
                            data: data.clone(),
                            acl,
                            creator: notification.creator.clone(),
                        },
                    );
                }
                (_, false) => {
                    inner.values.remove(&path);
                }
                (None, true) => {}
            }
        }
        self.deliver(&notification);
    }

    /// Get all writes that were accepted.
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.lock().writes.clone()
    }

    /// Get the last accepted write.
    pub fn last_write(&self) -> Option<WriteRecord> {
        self.lock().writes.last().cloned()
    }

    /// Get all keys that were deleted.
    pub fn deletes(&self) -> Vec<KeyPath> {
        self.lock().deletes.clone()
    }

    /// Current value stored at `key`.
    pub fn value(&self, key: &KeyPath) -> Option<String> {
        self.lock()
            .values
            .get(&key.to_string())
            .map(|v| v.data.clone())
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Keys with a registered listener, in registration order.
    pub fn listening_keys(&self) -> Vec<KeyPath> {
        self.lock()
            .listeners
            .iter()
            .map(|(_, key, _)| key.clone())
            .collect()
    }

    /// Get the options passed to `connect()`.
    pub fn connect_options(&self) -> Option<ConnectOptions> {
        self.lock().connect_options.clone()
    }

    /// Get the session data of the last successful authentication.
    pub fn auth(&self) -> Option<AuthData> {
        self.lock().auth.clone()
    }

    /// Cause the next connect() to fail with the given error.
    pub fn fail_next_connect(&self, error: &str) {
        self.lock().fail_next_connect = Some(error.to_string());
    }

    /// Cause the next authenticate() to be rejected with the given error.
    pub fn fail_next_authenticate(&self, error: &str) {
        self.lock().fail_next_authenticate = Some(error.to_string());
    }

    /// Cause the next write() to fail with the given error.
    pub fn fail_next_write(&self, error: &str) {
        self.lock().fail_next_write = Some(error.to_string());
    }

    /// Cause the next delete() to fail with the given error.
    pub fn fail_next_delete(&self, error: &str) {
        self.lock().fail_next_delete = Some(error.to_string());
    }

    /// Clear all state (values, listeners, records, connection).
    pub fn reset(&self) {
        *self.lock() = MockStoreInner::default();
    }
}

impl fmt::Debug for MockStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("MockStore")
            .field("connected", &inner.connected)
            .field("listeners", &inner.listeners.len())
            .field("values", &inner.values.len())
            .finish()
    }
}

#[async_trait]
impl Store for MockStore {
    async fn connect(&self, options: &ConnectOptions) -> Result<(), StoreError> {
        let mut inner = self.lock();

        // Check for forced failure
        if let Some(error) = inner.fail_next_connect.take() {
            return Err(StoreError::ConnectionFailed(error));
        }

        inner.connected = true;
        inner.connect_options = Some(options.clone());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    async fn authenticate(&self, provider: &str, token: &str) -> Result<AuthData, StoreError> {
        let mut inner = self.lock();

        if !inner.connected {
            return Err(StoreError::NotConnected);
        }

        // Check for forced failure
        if let Some(error) = inner.fail_next_authenticate.take() {
            return Err(StoreError::AuthenticationFailed(error));
        }

        let auth = AuthData {
            uid: format!("{}:{}", provider, token),
            provider: provider.to_string(),
        };
        inner.auth = Some(auth.clone());
        Ok(auth)
    }

    fn listen(
        &self,
        key: &KeyPath,
        callback: NotificationCallback,
    ) -> Result<ListenerId, StoreError> {
        let (id, existing) = {
            let mut inner = self.lock();

            if !inner.connected {
                return Err(StoreError::NotConnected);
            }

            inner.next_listener += 1;
            let id = ListenerId::new(inner.next_listener);
            inner.listeners.push((id, key.clone(), Arc::clone(&callback)));

            let existing: Vec<Notification> = inner
                .values
                .values()
                .filter(|value| key.matches(&value.key))
                .map(StoredValue::notification)
                .collect();
            (id, existing)
        };

        // Replay current values, as the real store does on listen.
        for notification in existing {
            callback(notification);
        }
        Ok(id)
    }

    fn unlisten(&self, listener: ListenerId) {
        self.lock().listeners.retain(|(id, _, _)| *id != listener);
    }

    async fn write(&self, key: &KeyPath, data: &str, acl: AccessClass) -> Result<(), StoreError> {
        let notification = {
            let mut inner = self.lock();

            if !inner.connected {
                return Err(StoreError::NotConnected);
            }

            // Check for forced failure
            if let Some(error) = inner.fail_next_write.take() {
                return Err(StoreError::WriteFailed(error));
            }

            if key.is_wildcard() {
                return Err(StoreError::WriteFailed(format!(
                    "cannot write wildcard key {}",
                    key
                )));
            }

            let uid = inner.auth.as_ref().map(|a| a.uid.clone());
            let path = key.to_string();
            let creator = match inner.values.get(&path) {
                Some(existing) if existing.creator != uid => {
                    return Err(StoreError::PermissionDenied(path));
                }
                Some(existing) => existing.creator.clone(),
                None => uid,
            };

            let value = StoredValue {
                key: key.clone(),
                data: data.to_string(),
                acl,
                creator,
            };
            let notification = value.notification();
            inner.values.insert(path, value);
            inner.writes.push(WriteRecord {
                key: key.clone(),
                data: data.to_string(),
                acl,
            });
            notification
        };

        self.deliver(&notification);
        Ok(())
    }

    async fn delete(&self, key: &KeyPath) -> Result<(), StoreError> {
        let notification = {
            let mut inner = self.lock();

            if !inner.connected {
                return Err(StoreError::NotConnected);
            }

            // Check for forced failure
            if let Some(error) = inner.fail_next_delete.take() {
                return Err(StoreError::WriteFailed(error));
            }

            let uid = inner.auth.as_ref().map(|a| a.uid.clone());
            let path = key.to_string();
            let acl = match inner.values.get(&path) {
                Some(existing) if existing.creator != uid => {
                    return Err(StoreError::PermissionDenied(path));
                }
                Some(existing) => Some(existing.acl),
                None => None,
            };

            inner.deletes.push(key.clone());
            match acl {
                Some(acl) => {
                    inner.values.remove(&path);
                    Some(Notification::deletion(key.clone(), acl))
                }
                None => None,
            }
        };

        if let Some(notification) = notification {
            self.deliver(&notification);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_types::RoomId;

    fn options() -> ConnectOptions {
        ConnectOptions {
            host: "localhost".into(),
            port: 6005,
            use_ssl: false,
            db_in_memory: true,
        }
    }

    fn recorder() -> (NotificationCallback, Arc<Mutex<Vec<Notification>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: NotificationCallback = Arc::new(move |n| sink.lock().unwrap().push(n));
        (callback, seen)
    }

    async fn connected() -> MockStore {
        let store = MockStore::new();
        store.connect(&options()).await.unwrap();
        store
    }

    fn room_key(id: &str) -> KeyPath {
        KeyPath::room(&RoomId::new(id).unwrap())
    }

    // ===========================================
    // MockStore Basic Tests
    // ===========================================

    #[tokio::test]
    async fn mock_store_connects() {
        let store = MockStore::new();
        assert!(!store.is_connected());

        store.connect(&options()).await.unwrap();

        assert!(store.is_connected());
        assert_eq!(store.connect_options(), Some(options()));
    }

    #[tokio::test]
    async fn mock_store_authenticates() {
        let store = connected().await;

        let auth = store.authenticate("demo", "token").await.unwrap();

        assert_eq!(auth.uid, "demo:token");
        assert_eq!(store.auth(), Some(auth));
    }

    #[tokio::test]
    async fn write_echoes_to_matching_listener() {
        let store = connected().await;
        store.authenticate("demo", "t").await.unwrap();
        let (callback, seen) = recorder();
        store.listen(&KeyPath::room_list(), callback).unwrap();

        store
            .write(&room_key("r1"), "Lobby", AccessClass::PublicReadCreate)
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].key.to_string(), "rooms.r1");
        assert_eq!(seen[0].data.as_deref(), Some("Lobby"));
        assert_eq!(seen[0].creator.as_deref(), Some("demo:t"));
        assert!(seen[0].exists);
    }

    #[tokio::test]
    async fn wildcard_listener_ignores_grandchildren() {
        let store = connected().await;
        let (callback, seen) = recorder();
        store.listen(&KeyPath::room_list(), callback).unwrap();

        let key = KeyPath::parse("rooms.r1.m1").unwrap();
        store.write(&key, "{}", AccessClass::PublicRead).await.unwrap();

        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn listen_replays_existing_values() {
        let store = connected().await;
        store
            .write(&room_key("a"), "A", AccessClass::Private)
            .await
            .unwrap();
        store
            .write(&room_key("b"), "B", AccessClass::PublicReadCreate)
            .await
            .unwrap();

        let (callback, seen) = recorder();
        store.listen(&KeyPath::room_list(), callback).unwrap();

        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unlisten_stops_delivery() {
        let store = connected().await;
        let (callback, seen) = recorder();
        let id = store.listen(&KeyPath::room_list(), callback).unwrap();

        store.unlisten(id);
        store
            .write(&room_key("r1"), "x", AccessClass::PublicReadCreate)
            .await
            .unwrap();

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(store.listener_count(), 0);
    }

    #[tokio::test]
    async fn delete_echoes_deletion() {
        let store = connected().await;
        store
            .write(&room_key("r1"), "x", AccessClass::Private)
            .await
            .unwrap();
        let (callback, seen) = recorder();
        store.listen(&room_key("r1"), callback).unwrap();

        store.delete(&room_key("r1")).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(!seen[1].exists);
        assert!(seen[1].is_private());
        assert_eq!(store.value(&room_key("r1")), None);
    }

    // ===========================================
    // Error Condition Tests
    // ===========================================

    #[tokio::test]
    async fn operations_without_connect_fail() {
        let store = MockStore::new();
        let (callback, _) = recorder();

        assert!(matches!(
            store.listen(&KeyPath::room_list(), callback),
            Err(StoreError::NotConnected)
        ));
        assert!(matches!(
            store.write(&room_key("r"), "x", AccessClass::Private).await,
            Err(StoreError::NotConnected)
        ));
        assert!(matches!(
            store.authenticate("demo", "t").await,
            Err(StoreError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn forced_write_failure() {
        let store = connected().await;
        store.fail_next_write("disk full");

        let result = store.write(&room_key("r"), "x", AccessClass::Private).await;
        assert!(matches!(result, Err(StoreError::WriteFailed(_))));

        // Next write should work
        store
            .write(&room_key("r"), "x", AccessClass::Private)
            .await
            .unwrap();
        assert_eq!(store.writes().len(), 1);
    }

    #[tokio::test]
    async fn foreign_key_write_is_denied() {
        let store = connected().await;
        store.emit(Notification::upsert(
            room_key("theirs"),
            "Theirs",
            Some("someone-else".into()),
            AccessClass::PublicReadCreate,
        ));
        store.authenticate("demo", "me").await.unwrap();

        let result = store
            .write(&room_key("theirs"), "Mine now", AccessClass::PublicReadCreate)
            .await;

        assert!(matches!(result, Err(StoreError::PermissionDenied(_))));
        assert_eq!(store.value(&room_key("theirs")).as_deref(), Some("Theirs"));
    }

    #[tokio::test]
    async fn forced_connect_failure() {
        let store = MockStore::new();
        store.fail_next_connect("unreachable");

        let result = store.connect(&options()).await;
        assert!(matches!(result, Err(StoreError::ConnectionFailed(_))));
        assert!(!store.is_connected());
    }

    // ===========================================
    // Clone and Shared State Tests
    // ===========================================

    #[tokio::test]
    async fn mock_store_clone_shares_state() {
        let store1 = MockStore::new();
        let store2 = store1.clone();

        store1.connect(&options()).await.unwrap();
        assert!(store2.is_connected());

        store2
            .write(&room_key("r"), "x", AccessClass::Private)
            .await
            .unwrap();
        assert_eq!(store1.last_write().unwrap().data, "x");
    }

    #[tokio::test]
    async fn mock_store_reset_clears_all() {
        let store = connected().await;
        store
            .write(&room_key("r"), "x", AccessClass::Private)
            .await
            .unwrap();

        store.reset();

        assert!(!store.is_connected());
        assert!(store.writes().is_empty());
        assert!(store.connect_options().is_none());
    }
}
