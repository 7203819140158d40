use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use cliprelay_types::events::ServerEvent;

use tracing::debug;

use crate::error::GatewayError;

/// Opaque handle for one live connection.
pub type ConnId = Uuid;

/// A registered connection other than the caller, as returned by sibling lookup.
#[derive(Debug, Clone)]
pub struct Sibling {
    pub conn_id: ConnId,
    pub device_id: String,
    pub tx: mpsc::Sender<ServerEvent>,
}

/// What a connection was bound to, returned when it is removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub user_id: String,
    pub device_id: String,
}

struct Member {
    device_id: String,
    tx: mpsc::Sender<ServerEvent>,
}

#[derive(Default)]
struct RegistryState {
    /// conn_id -> user_id, for removal by connection
    by_conn: HashMap<ConnId, String>,

    /// user_id -> (conn_id -> member)
    by_user: HashMap<String, HashMap<ConnId, Member>>,
}

/// Live connections grouped by user. Every read and write goes through one lock,
/// so lookups always see a consistent snapshot.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<RegistryState>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a connection to a user. Returns the effective device id.
    ///
    /// A missing or empty `device_id`, or one already held by another live
    /// connection of the same user, is replaced with a fresh random token, so
    /// device ids stay unique within a user.
    pub async fn register(
        &self,
        conn_id: ConnId,
        user_id: &str,
        device_id: Option<String>,
        tx: mpsc::Sender<ServerEvent>,
    ) -> Result<String, GatewayError> {
        let mut state = self.inner.write().await;

        if let Some(existing_user) = state.by_conn.get(&conn_id) {
            let device_id = state
                .by_user
                .get(existing_user)
                .and_then(|members| members.get(&conn_id))
                .map(|m| m.device_id.clone())
                .unwrap_or_default();
            return Err(GatewayError::RegistrationConflict {
                conn_id,
                user_id: existing_user.clone(),
                device_id,
            });
        }

        let taken = |candidate: &str| {
            state
                .by_user
                .get(user_id)
                .is_some_and(|members| members.values().any(|m| m.device_id == candidate))
        };
        let device_id = match device_id.filter(|d| !d.is_empty()) {
            Some(requested) if taken(&requested) => {
                let assigned = Uuid::new_v4().to_string();
                debug!(
                    "Device id {} already live for {}, connection {} gets {}",
                    requested, user_id, conn_id, assigned
                );
                assigned
            }
            Some(requested) => requested,
            None => Uuid::new_v4().to_string(),
        };

        state.by_conn.insert(conn_id, user_id.to_string());
        state.by_user.entry(user_id.to_string()).or_default().insert(
            conn_id,
            Member {
                device_id: device_id.clone(),
                tx,
            },
        );

        Ok(device_id)
    }

    /// Every live connection of `user_id` whose device differs from `exclude_device_id`.
    pub async fn lookup_siblings(&self, user_id: &str, exclude_device_id: &str) -> Vec<Sibling> {
        let state = self.inner.read().await;

        state
            .by_user
            .get(user_id)
            .map(|members| {
                members
                    .iter()
                    .filter(|(_, m)| m.device_id != exclude_device_id)
                    .map(|(&conn_id, m)| Sibling {
                        conn_id,
                        device_id: m.device_id.clone(),
                        tx: m.tx.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Remove a connection. No-op (returns `None`) if it never registered or was
    /// already removed.
    pub async fn unregister(&self, conn_id: ConnId) -> Option<Registration> {
        let mut state = self.inner.write().await;

        let user_id = state.by_conn.remove(&conn_id)?;
        let members = state.by_user.get_mut(&user_id)?;
        let member = members.remove(&conn_id)?;
        if members.is_empty() {
            state.by_user.remove(&user_id);
        }

        Some(Registration {
            user_id,
            device_id: member.device_id,
        })
    }

    /// Number of registered connections.
    pub async fn len(&self) -> usize {
        self.inner.read().await.by_conn.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}


#[cfg(test)]
mod churn {
    use proptest::prelude::*;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    use super::*;

    const USERS: [&str; 3] = ["u1", "u2", "u3"];
    const DEVICES: [&str; 4] = ["d1", "d2", "d3", "d4"];

    #[derive(Debug, Clone)]
    enum Op {
        Register { user: usize, device: usize },
        Unregister { pick: usize },
        Lookup { user: usize, device: usize },
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            2 => (0..USERS.len(), 0..DEVICES.len())
                .prop_map(|(user, device)| Op::Register { user, device }),
            1 => any::<usize>().prop_map(|pick| Op::Unregister { pick }),
            2 => (0..USERS.len(), 0..DEVICES.len())
                .prop_map(|(user, device)| Op::Lookup { user, device }),
        ]
    }

    async fn check(ops: Vec<Op>) -> Result<(), TestCaseError> {
        let registry = ConnectionRegistry::new();
        let mut live: Vec<(ConnId, &str, String)> = Vec::new();
        let mut removed: Vec<ConnId> = Vec::new();

        for op in ops {
            match op {
                Op::Register { user, device } => {
                    let conn = Uuid::new_v4();
                    let user = USERS[user];
                    let device = registry
                        .register(conn, user, Some(DEVICES[device].into()), mpsc::channel(1).0)
                        .await
                        .map_err(|e| TestCaseError::fail(e.to_string()))?;
                    prop_assert!(!live.iter().any(|(_, u, d)| *u == user && *d == device));
                    live.push((conn, user, device));
                }
                Op::Unregister { pick } => {
                    if live.is_empty() {
                        continue;
                    }
                    let (conn, user, device) = live.swap_remove(pick % live.len());
                    let reg = registry.unregister(conn).await;
                    prop_assert_eq!(
                        reg,
                        Some(Registration {
                            user_id: user.to_string(),
                            device_id: device,
                        })
                    );
                    removed.push(conn);
                }
                Op::Lookup { user, device } => {
                    let user = USERS[user];
                    let exclude = DEVICES[device];
                    let siblings = registry.lookup_siblings(user, exclude).await;

                    for s in &siblings {
                        prop_assert_ne!(s.device_id.as_str(), exclude);
                        prop_assert!(!removed.contains(&s.conn_id));
                        let owner = live.iter().find(|(c, _, _)| *c == s.conn_id).map(|(_, u, _)| *u);
                        prop_assert_eq!(owner, Some(user));
                    }
                    let expected = live
                        .iter()
                        .filter(|(_, u, d)| *u == user && d != exclude)
                        .count();
                    prop_assert_eq!(siblings.len(), expected);
                }
            }
            prop_assert_eq!(registry.len().await, live.len());
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn lookup_invariants_hold_across_churn(ops in prop::collection::vec(arb_op(), 1..200)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(check(ops))?;
        }
    }
}
