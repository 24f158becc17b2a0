use serde::Serialize;
use uuid::Uuid;

use crate::store::UserPurge;

/// Response for account deletion.
#[derive(Debug, Serialize)]
pub struct DeletedAccount {
    pub id: Uuid,
    pub deleted_blogs: usize,
}

impl From<&UserPurge> for DeletedAccount {
    fn from(purge: &UserPurge) -> Self {
        Self { id: purge.user.id, deleted_blogs: purge.deleted_blogs }
    }
}
