use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered person: driver, passenger or administrator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub role: Role,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Driver,
    Passenger,
    Admin,
}

impl Role {
    pub fn name(&self) -> String {
        match self {
            Self::Driver => "driver".into(),
            Self::Passenger => "passenger".into(),
            Self::Admin => "admin".into(),
        }
    }
}

impl Member {
    pub fn new(id: Uuid, name: impl Into<String>, phone: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            name: name.into(),
            phone: phone.into(),
            role,
        }
    }
}
