use models::user::{self, Role};

/// Authenticated caller as seen by the service layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: i32,
    pub role: Role,
}

impl Actor {
    pub fn is_admin(&self) -> bool { self.role == Role::Admin }
}

impl From<&user::Model> for Actor {
    fn from(u: &user::Model) -> Self { Self { id: u.id, role: u.role } }
}
