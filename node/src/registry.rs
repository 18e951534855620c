use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use lazy_static::lazy_static;

use crate::handle::NodeHandle;
use crate::logic::LogicHandle;
use crate::p2p::supervisor::ChildSupervisor;

// The `role` half of a `(host, port, role)` "via" name (spec §3/§4.10).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Node,
    Logic,
    Listener,
    Clients,
    Connectors,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Node => "node",
            Role::Logic => "logic",
            Role::Listener => "listener",
            Role::Clients => "clients",
            Role::Connectors => "connectors",
        };
        write!(f, "{}", s)
    }
}

type Via = (String, u16, Role);

#[derive(Clone)]
pub enum Entry {
    Node(NodeHandle),
    Logic(LogicHandle),
    Supervisor(Arc<ChildSupervisor>),
}

lazy_static! {
    static ref REGISTRY: DashMap<Via, Entry> = DashMap::new();
}

// Records `entry` under the `(host, port, role)` triple, replacing whatever
// was there before. Writes happen only at actor spawn/exit (spec §5); reads
// may come from any actor.
pub fn register(host: impl Into<String>, port: u16, role: Role, entry: Entry) {
    REGISTRY.insert((host.into(), port, role), entry);
}

pub fn lookup(host: &str, port: u16, role: Role) -> Option<Entry> {
    REGISTRY.get(&(host.to_string(), port, role)).map(|e| e.clone())
}

pub fn unregister(host: &str, port: u16, role: Role) {
    REGISTRY.remove(&(host.to_string(), port, role));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_lookup_and_unregister_round_trip() {
        let supervisor = Arc::new(ChildSupervisor::new());
        register(
            "127.0.0.1",
            40001,
            Role::Clients,
            Entry::Supervisor(supervisor.clone()),
        );
        assert!(matches!(
            lookup("127.0.0.1", 40001, Role::Clients),
            Some(Entry::Supervisor(_))
        ));
        unregister("127.0.0.1", 40001, Role::Clients);
        assert!(lookup("127.0.0.1", 40001, Role::Clients).is_none());
    }

    #[test]
    fn distinct_roles_on_the_same_via_do_not_collide() {
        let supervisor = Arc::new(ChildSupervisor::new());
        register(
            "127.0.0.1",
            40002,
            Role::Clients,
            Entry::Supervisor(supervisor.clone()),
        );
        register(
            "127.0.0.1",
            40002,
            Role::Connectors,
            Entry::Supervisor(supervisor),
        );
        assert!(lookup("127.0.0.1", 40002, Role::Clients).is_some());
        assert!(lookup("127.0.0.1", 40002, Role::Connectors).is_some());
        unregister("127.0.0.1", 40002, Role::Clients);
        unregister("127.0.0.1", 40002, Role::Connectors);
    }
}
