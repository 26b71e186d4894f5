//! The signed-in user.

/// Identity of the signed-in user.
///
/// Set once authentication succeeds and cleared on sign-out. Entities decoded
/// while an identity is set keep the attribution computed at decode time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    /// Identity assigned by the store's authentication provider.
    pub user_id: String,
    /// Display name.
    pub name: String,
    /// Email address (may be empty).
    pub email: String,
    /// Small avatar, attached to composed messages.
    pub small_image_url: Option<String>,
    /// Large avatar.
    pub large_image_url: Option<String>,
}

impl UserIdentity {
    /// Create an identity without email or avatars.
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            email: String::new(),
            small_image_url: None,
            large_image_url: None,
        }
    }

    /// Set the avatar URLs.
    pub fn with_avatars(mut self, small: Option<String>, large: Option<String>) -> Self {
        self.small_image_url = small;
        self.large_image_url = large;
        self
    }
}
