#![forbid(unsafe_code)]

//! Session lifecycle for the optional auth gate.
//!
//! Credentials live in `users.json`, the active session in `session.json`,
//! both under the data directory. Board logic only ever consumes "is a user
//! present" and the user id; everything else stays in here.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::KanriError;
use crate::task::model::now_rfc3339;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub signed_in_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserRecord {
    id: String,
    email: String,
    salt: String,
    pass_hash: String,
    created_at: String,
}

#[derive(Debug)]
pub struct AuthGate {
    users_path: PathBuf,
    session_path: PathBuf,
    tx: watch::Sender<Option<Session>>,
}

impl AuthGate {
    /// Opens the gate over the given data directory and seeds the session
    /// watch channel from whatever session file is already present.
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let gate = Self {
            users_path: data_dir.join("users.json"),
            session_path: data_dir.join("session.json"),
            tx: watch::Sender::new(None),
        };
        let current = gate.read_session()?;
        let _ = gate.tx.send(current);
        Ok(gate)
    }

    /// Current session, straight from disk so external sign-outs are seen.
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        match self.read_session() {
            Ok(session) => session,
            Err(e) => {
                eprintln!("session read failed: {e:#}");
                None
            }
        }
    }

    /// Notifies on every session change (sign-in, sign-out).
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }

    /// Registers a new account and signs it in.
    pub fn sign_up(&self, email: &str, password: &str) -> anyhow::Result<Session> {
        let email = normalize_email(email)?;
        validate_password(password)?;

        let mut users = self.read_users()?;
        if users.iter().any(|u| u.email == email) {
            return Err(KanriError::EmailTaken(email).into());
        }

        let salt = Uuid::new_v4().simple().to_string();
        let record = UserRecord {
            id: Uuid::new_v4().simple().to_string(),
            email: email.clone(),
            pass_hash: hash_password(&salt, password),
            salt,
            created_at: now_rfc3339(),
        };
        users.push(record.clone());
        self.write_users(&users)?;

        self.start_session(&record)
    }

    pub fn sign_in(&self, email: &str, password: &str) -> anyhow::Result<Session> {
        let email = normalize_email(email)?;
        let users = self.read_users()?;
        let Some(record) = users.iter().find(|u| u.email == email) else {
            return Err(KanriError::InvalidCredentials.into());
        };
        if hash_password(&record.salt, password) != record.pass_hash {
            return Err(KanriError::InvalidCredentials.into());
        }
        self.start_session(record)
    }

    pub fn sign_out(&self) -> anyhow::Result<()> {
        if self.session_path.exists() {
            std::fs::remove_file(&self.session_path).with_context(|| {
                format!("failed to remove {}", self.session_path.display())
            })?;
        }
        let _ = self.tx.send(None);
        Ok(())
    }

    fn start_session(&self, record: &UserRecord) -> anyhow::Result<Session> {
        let session = Session {
            user_id: record.id.clone(),
            email: record.email.clone(),
            signed_in_at: now_rfc3339(),
        };
        self.write_json(&self.session_path, &session)?;
        let _ = self.tx.send(Some(session.clone()));
        Ok(session)
    }

    fn read_session(&self) -> anyhow::Result<Option<Session>> {
        if !self.session_path.exists() {
            return Ok(None);
        }
        let data = std::fs::read(&self.session_path)
            .with_context(|| format!("failed to read {}", self.session_path.display()))?;
        let session = serde_json::from_slice(&data)
            .with_context(|| format!("failed to parse {}", self.session_path.display()))?;
        Ok(Some(session))
    }

    fn read_users(&self) -> anyhow::Result<Vec<UserRecord>> {
        if !self.users_path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read(&self.users_path)
            .with_context(|| format!("failed to read {}", self.users_path.display()))?;
        let users = serde_json::from_slice(&data)
            .with_context(|| format!("failed to parse {}", self.users_path.display()))?;
        Ok(users)
    }

    fn write_users(&self, users: &[UserRecord]) -> anyhow::Result<()> {
        self.write_json(&self.users_path, &users)
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(value)?;
        std::fs::write(&tmp, &data).with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("failed to rename {} -> {}", tmp.display(), path.display()))?;
        Ok(())
    }
}

fn normalize_email(email: &str) -> anyhow::Result<String> {
    let email = email.trim().to_lowercase();
    // Just enough shape checking to catch swapped arguments; the store is
    // local, there is nothing to verify against.
    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
    });
    if !valid {
        return Err(KanriError::InvalidCredentials.into());
    }
    Ok(email)
}

fn validate_password(password: &str) -> anyhow::Result<()> {
    if password.len() < 6 {
        return Err(KanriError::Other("password must be at least 6 characters".to_owned()).into());
    }
    Ok(())
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    let digest = hasher.finalize();
    let mut s = String::with_capacity(64);
    for b in digest {
        let _ = write!(&mut s, "{b:02x}");
    }
    s
}
