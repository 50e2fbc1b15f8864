use crate::api::types::{Id, LoginReply, Role};
use serde::Serialize;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: Id,
    pub display_name: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub principal: Principal,
}

impl AuthSession {
    /// Builds a session from a login reply. Staff replies carry `user`,
    /// student replies carry `student`.
    pub fn from_login(reply: LoginReply) -> Option<AuthSession> {
        let token = reply.token.trim().to_string();
        if token.is_empty() {
            return None;
        }
        let principal = if let Some(user) = reply.user {
            let display_name = user
                .name
                .or(user.username)
                .or(user.email)
                .unwrap_or_else(|| "User".to_string());
            Principal {
                id: user.id,
                display_name,
                role: reply.role.unwrap_or(user.role),
            }
        } else if let Some(student) = reply.student {
            let display_name = match student.display_name() {
                n if n.is_empty() => "Student".to_string(),
                n => n,
            };
            Principal {
                id: student.id,
                display_name,
                role: Role::Student,
            }
        } else {
            return None;
        };
        Some(AuthSession { token, principal })
    }
}

/// Shared handle to the current login. Cloned into the client and the
/// router; there is no global session.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Option<AuthSession>>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, session: AuthSession) {
        let mut guard = self.inner.write().unwrap_or_else(|p| p.into_inner());
        *guard = Some(session);
    }

    pub fn clear(&self) {
        let mut guard = self.inner.write().unwrap_or_else(|p| p.into_inner());
        *guard = None;
    }

    pub fn token(&self) -> Option<String> {
        self.read(|s| s.token.clone())
    }

    pub fn role(&self) -> Option<Role> {
        self.read(|s| s.principal.role)
    }

    pub fn principal(&self) -> Option<Principal> {
        self.read(|s| s.principal.clone())
    }

    fn read<T>(&self, f: impl FnOnce(&AuthSession) -> T) -> Option<T> {
        let guard = self.inner.read().unwrap_or_else(|p| p.into_inner());
        guard.as_ref().map(f)
    }
}

/// Who may call an IPC method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Only when logged out.
    Guest,
    /// Anyone, logged in or not.
    Any,
    /// Any logged-in role.
    Authenticated,
    Roles(&'static [Role]),
}

const ADMIN: &[Role] = &[Role::Admin];
const TEACHER: &[Role] = &[Role::Teacher];
const STAFF: &[Role] = &[Role::Admin, Role::Teacher];
const STUDENT: &[Role] = &[Role::Student];

pub fn access_for(method: &str) -> Access {
    match method {
        "session.login" | "session.studentLogin" | "password.verify" | "password.reset" => {
            Access::Guest
        }
        "health" | "session.current" | "session.restore" | "session.logout" => Access::Any,
        "academic.current" => Access::Authenticated,
        m if m.starts_with("admin.") => Access::Roles(ADMIN),
        m if m.starts_with("teacher.") || m.starts_with("attendance.") => Access::Roles(TEACHER),
        m if m.starts_with("scores.") || m.starts_with("profile.") => Access::Roles(STAFF),
        m if m.starts_with("student.") => Access::Roles(STUDENT),
        _ => Access::Any,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denied {
    NotAuthenticated,
    AlreadyAuthenticated(Role),
    Forbidden(Role),
}

impl Denied {
    pub fn code(self) -> &'static str {
        match self {
            Denied::NotAuthenticated => "unauthorized",
            Denied::AlreadyAuthenticated(_) => "already_authenticated",
            Denied::Forbidden(_) => "forbidden",
        }
    }

    pub fn message(self) -> String {
        match self {
            Denied::NotAuthenticated => "login required".to_string(),
            Denied::AlreadyAuthenticated(role) => {
                format!("already logged in as {}", role.as_str())
            }
            Denied::Forbidden(role) => format!("not available to role {}", role.as_str()),
        }
    }
}

pub fn check_access(method: &str, role: Option<Role>) -> Result<(), Denied> {
    match (access_for(method), role) {
        (Access::Any, _) => Ok(()),
        (Access::Guest, None) => Ok(()),
        (Access::Guest, Some(r)) => Err(Denied::AlreadyAuthenticated(r)),
        (_, None) => Err(Denied::NotAuthenticated),
        (Access::Authenticated, Some(_)) => Ok(()),
        (Access::Roles(allowed), Some(r)) if allowed.contains(&r) => Ok(()),
        (Access::Roles(_), Some(r)) => Err(Denied::Forbidden(r)),
    }
}
