use std::sync::RwLock;

/// The credential set attached to every outbound request. The cookie list
/// keeps insertion order, which is the order cookies are serialized in.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub cookies: Vec<(String, String)>,
}

/// Process-wide credential store, constructed once at startup and shared by
/// handle. Replaces implicit global lookup with an explicit object; the
/// "set once, read everywhere" semantics stay the same.
#[derive(Debug, Default)]
pub struct CredentialStore {
    inner: RwLock<Credentials>,
}

impl CredentialStore {
    pub fn new(username: String, password: String, cookies: Vec<(String, String)>) -> Self {
        Self {
            inner: RwLock::new(Credentials {
                username,
                password,
                cookies,
            }),
        }
    }

    /// Update individual fields; `None` leaves the current value untouched.
    pub fn update(
        &self,
        username: Option<String>,
        password: Option<String>,
        cookies: Option<Vec<(String, String)>>,
    ) {
        let mut creds = self.write();
        if let Some(username) = username {
            creds.username = username;
        }
        if let Some(password) = password {
            creds.password = password;
        }
        if let Some(cookies) = cookies {
            creds.cookies = cookies;
        }
    }

    /// Insert or replace a single cookie without disturbing the order of
    /// the others.
    pub fn set_cookie(&self, name: &str, value: &str) {
        let mut creds = self.write();
        if let Some(entry) = creds.cookies.iter_mut().find(|(n, _)| n == name) {
            entry.1 = value.to_string();
        } else {
            creds.cookies.push((name.to_string(), value.to_string()));
        }
    }

    pub fn snapshot(&self) -> Credentials {
        self.read().clone()
    }

    pub fn cookies(&self) -> Vec<(String, String)> {
        self.read().cookies.clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Credentials> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Credentials> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}
