use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A persisted school row. Serialized with the column names as keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct School {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub contact: String,
    pub image: String,
    pub email_id: String,
}

/// Validated text fields of a submission, ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSchool {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub contact: String,
    pub email_id: String,
}

impl NewSchool {
    pub fn into_school(self, id: i64, image: String) -> School {
        School {
            id,
            name: self.name,
            address: self.address,
            city: self.city,
            state: self.state,
            contact: self.contact,
            image,
            email_id: self.email_id,
        }
    }
}
