/// Local profile storage: persists the active user in sled
///
/// Presence of a stored profile is the session-start gate; absence means
/// onboarding is required.
use crate::error::{DuetError, Result};
use crate::types::User;
use std::path::Path;

const PROFILE_KEY: &[u8] = b"profile";

pub struct ProfileStore {
    db: sled::Db,
}

impl ProfileStore {
    pub fn new(data_dir: &Path) -> Result<Self> {
        let db = sled::open(data_dir.join("profile.db"))
            .map_err(|e| DuetError::Storage(format!("profile DB: {}", e)))?;
        Ok(Self { db })
    }

    pub fn load(&self) -> Result<Option<User>> {
        match self
            .db
            .get(PROFILE_KEY)
            .map_err(|e| DuetError::Storage(format!("load profile: {}", e)))?
        {
            Some(val) => {
                let user = serde_json::from_slice::<User>(&val)?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    pub fn save(&self, user: &User) -> Result<()> {
        let val = serde_json::to_vec(user)?;
        self.db
            .insert(PROFILE_KEY, val)
            .map_err(|e| DuetError::Storage(format!("save profile: {}", e)))?;
        self.db
            .flush()
            .map_err(|e| DuetError::Storage(format!("flush profile: {}", e)))?;
        Ok(())
    }

    pub fn clear(&self) -> Result<bool> {
        let removed = self
            .db
            .remove(PROFILE_KEY)
            .map_err(|e| DuetError::Storage(format!("clear profile: {}", e)))?;
        Ok(removed.is_some())
    }
}

impl Clone for ProfileStore {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}
