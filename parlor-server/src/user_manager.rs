//! User accounts and per-connection login state (C5, user half).

use {
    crate::{db::users_db::UsersDb, error::ServerError},
    difflib::sequencematcher::SequenceMatcher,
    parlor_sdk::{events::UserSummary, model::User, transport::ConnectionId},
    std::{collections::HashMap, path::PathBuf},
    uuid::Uuid,
};

const SEARCH_CUTOFF: f32 = 0.05;

/// A live connection's login state. Starts unregistered; promoted to a
/// real uuid on successful login or signup; dropped on disconnect.
#[derive(Debug, Clone, Default)]
pub struct ConnectedUser {
    pub uuid: Option<Uuid>,
    pub logged_in: bool,
}

impl ConnectedUser {
    pub fn is_authenticated(&self) -> bool {
        self.logged_in
    }
}

pub struct UserManager {
    db: UsersDb,
    db_path: PathBuf,
    connected: HashMap<ConnectionId, ConnectedUser>,
}

impl UserManager {
    pub fn load(db_path: PathBuf) -> Result<Self, ServerError> {
        let db = UsersDb::load(&db_path)?;
        Ok(Self { db, db_path, connected: HashMap::new() })
    }

    pub fn register_connection(&mut self, conn: ConnectionId) {
        self.connected.insert(conn, ConnectedUser::default());
    }

    pub fn drop_connection(&mut self, conn: ConnectionId) {
        self.connected.remove(&conn);
    }

    pub fn connected_user(&self, conn: ConnectionId) -> Option<&ConnectedUser> {
        self.connected.get(&conn)
    }

    pub fn is_online(&self, uuid: Uuid) -> bool {
        self.connected.values().any(|c| c.uuid == Some(uuid))
    }

    /// Any connection currently authenticated as `uuid`, if online.
    pub fn connection_for(&self, uuid: Uuid) -> Option<ConnectionId> {
        self.connected.iter().find(|(_, c)| c.uuid == Some(uuid)).map(|(conn, _)| *conn)
    }

    pub fn attempt_login(
        &mut self,
        conn: ConnectionId,
        username: &str,
        password_hash: &str,
    ) -> (bool, Option<Uuid>) {
        let Some(user) = self.db.find_by_username(username) else {
            return (false, None);
        };
        if user.password_hash != password_hash {
            return (false, None);
        }
        let uuid = user.uuid;
        if let Some(connected) = self.connected.get_mut(&conn) {
            connected.uuid = Some(uuid);
            connected.logged_in = true;
        }
        (true, Some(uuid))
    }

    pub fn attempt_sign_up(
        &mut self,
        conn: ConnectionId,
        username: &str,
        password_hash: &str,
    ) -> Result<(bool, Option<Uuid>), ServerError> {
        if self.connected.get(&conn).is_some_and(|c| c.logged_in) {
            return Ok((false, None));
        }
        if self.db.username_taken(username) {
            return Ok((false, None));
        }
        let user = User::new(username.to_string(), password_hash.to_string());
        let uuid = user.uuid;
        self.db.push(user);
        self.db.save(&self.db_path)?;

        if let Some(connected) = self.connected.get_mut(&conn) {
            connected.uuid = Some(uuid);
            connected.logged_in = true;
        }
        Ok((true, Some(uuid)))
    }

    pub fn find_by_uuid(&self, uuid: Uuid) -> Option<&User> {
        self.db.find_by_uuid(uuid)
    }

    /// Test seam: puts `conn` straight into the logged-in state without
    /// going through `attempt_login`/`attempt_sign_up`.
    #[cfg(test)]
    pub fn force_authenticate(&mut self, conn: ConnectionId, uuid: Uuid) {
        self.connected.insert(conn, ConnectedUser { uuid: Some(uuid), logged_in: true });
    }

    /// Up to `max` users ranked by username similarity to `query`
    /// (case-insensitive), similarity cutoff 0.05, ties broken by
    /// ascending username.
    pub fn search_by_username(&self, query: &str, max: usize) -> Vec<UserSummary> {
        let needle = query.to_lowercase();
        let mut scored: Vec<(f32, UserSummary)> = self
            .db
            .all()
            .iter()
            .map(|u| {
                let username_lower = u.username.to_lowercase();
                let mut matcher = SequenceMatcher::new(&needle, &username_lower);
                (matcher.ratio(), UserSummary { uuid: u.uuid, username: u.username.clone() })
            })
            .filter(|(score, _)| *score >= SEARCH_CUTOFF)
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap().then_with(|| a.1.username.cmp(&b.1.username)));
        scored.into_iter().take(max).map(|(_, summary)| summary).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn manager() -> (UserManager, TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.db");
        let mgr = UserManager::load(path).unwrap();
        (mgr, dir)
    }

    #[test]
    fn signup_then_case_insensitive_login() {
        let (mut mgr, _dir) = manager();
        let conn = ConnectionId(1);
        mgr.register_connection(conn);
        let (ok, uuid) = mgr.attempt_sign_up(conn, "alice", "H1").unwrap();
        assert!(ok);
        let uuid = uuid.unwrap();

        mgr.drop_connection(conn);
        mgr.register_connection(conn);
        let (ok, login_uuid) = mgr.attempt_login(conn, "ALICE", "H1");
        assert!(ok);
        assert_eq!(login_uuid, Some(uuid));
    }

    #[test]
    fn signup_rejects_duplicate_username_case_insensitively() {
        let (mut mgr, _dir) = manager();
        let conn_a = ConnectionId(1);
        mgr.register_connection(conn_a);
        mgr.attempt_sign_up(conn_a, "alice", "H1").unwrap();

        let conn_b = ConnectionId(2);
        mgr.register_connection(conn_b);
        let (ok, _) = mgr.attempt_sign_up(conn_b, "ALICE", "H2").unwrap();
        assert!(!ok);
    }

    #[test]
    fn signup_rejects_already_logged_in_connection() {
        let (mut mgr, _dir) = manager();
        let conn = ConnectionId(1);
        mgr.register_connection(conn);
        mgr.attempt_sign_up(conn, "alice", "H1").unwrap();
        let (ok, _) = mgr.attempt_sign_up(conn, "bob", "H2").unwrap();
        assert!(!ok);
    }

    #[test]
    fn search_ranks_by_similarity_then_username() {
        let (mut mgr, _dir) = manager();
        for (i, name) in ["alice", "alicia", "bob"].iter().enumerate() {
            let conn = ConnectionId(i as u64);
            mgr.register_connection(conn);
            mgr.attempt_sign_up(conn, name, "H").unwrap();
        }
        let results = mgr.search_by_username("alice", 5);
        assert_eq!(results[0].username, "alice");
        assert!(results.iter().any(|r| r.username == "alicia"));
    }
}
