/// Whole-snapshot reconciliation
///
/// The device-side policy: compare the two embedded timestamps and take the
/// newer snapshot wholesale. The loser's edits since its last sync are
/// discarded, settings and display name included. There is no field-level
/// merge; the single-session conflict guard is what makes this acceptable,
/// and this is not a CRDT.
use super::snapshot::Snapshot;

/// Which side wins a reconciliation
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// Server state replaces local state entirely
    UseServer(Snapshot),
    /// Local state should be pushed, overwriting the server
    PushLocal(Snapshot),
}

impl Reconciliation {
    /// The winning snapshot, whichever direction it flows
    pub fn winner(&self) -> &Snapshot {
        match self {
            Reconciliation::UseServer(s) | Reconciliation::PushLocal(s) => s,
        }
    }
}

/// Choose between a local and a server snapshot by timestamp
///
/// Server wins only when strictly newer; ties and a missing server copy both
/// push local, so a device that has never synced seeds the server.
pub fn reconcile(local: Snapshot, server: Option<Snapshot>) -> Reconciliation {
    match server {
        Some(server) if server.modified > local.modified => Reconciliation::UseServer(server),
        _ => Reconciliation::PushLocal(local),
    }
}
