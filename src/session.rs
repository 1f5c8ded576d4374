//! Current-profile session state.

use crate::types::Profile;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

/// Callback invoked when the current profile changes (`None` on sign-out).
pub type ProfileCallback = Box<dyn Fn(Option<&Profile>) + Send + Sync>;

/// Process-wide authentication session state.
///
/// Holds the single current [`Profile`] and the ordered profile-change
/// callbacks. An explicit object (with [`reset`] for test isolation) rather
/// than module-level state; only the subscription manager mutates it.
///
/// [`reset`]: Session::reset
pub struct Session {
    profile: RwLock<Option<Profile>>,
    callbacks: Mutex<Vec<ProfileCallback>>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            profile: RwLock::new(None),
            callbacks: Mutex::new(Vec::new()),
        }
    }

    /// The currently cached profile, if a subject is signed in.
    pub fn current_profile(&self) -> Option<Profile> {
        self.profile.read().clone()
    }

    /// Replace the cached profile and notify callbacks in registration order.
    pub fn set_profile(&self, profile: Option<Profile>) {
        debug!(subject = ?profile.as_ref().map(|p| &p.id), "profile changed");
        *self.profile.write() = profile;
        let current = self.profile.read().clone();
        for callback in self.callbacks.lock().iter() {
            callback(current.as_ref());
        }
    }

    /// Clear the cached profile (sign-out) and notify callbacks with `None`.
    pub fn clear(&self) {
        self.set_profile(None);
    }

    /// Register a profile-change callback.
    ///
    /// If a profile is already cached the callback fires immediately and
    /// synchronously with the cached value and is not registered for later
    /// transitions; otherwise it is queued and fires on the next transition.
    pub fn on_profile_state_changed(&self, callback: impl Fn(Option<&Profile>) + Send + Sync + 'static) {
        let cached = self.current_profile();
        if let Some(profile) = cached.as_ref().filter(|p| !p.id.is_empty()) {
            callback(Some(profile));
            return;
        }
        self.callbacks.lock().push(Box::new(callback));
    }

    /// Drop the cached profile and every callback. Test isolation only.
    pub fn reset(&self) {
        *self.profile.write() = None;
        self.callbacks.lock().clear();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
