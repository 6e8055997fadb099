//! Lifecycle tests for the process-wide session store.

use serial_test::serial;

use flytta::syntax::tree::{SourceUnit, TypeDecl};
use flytta::workspace::session;
use flytta::workspace::snapshot::Workspace;

fn workspace() -> Workspace {
    let mut ws = Workspace::new();
    ws.add_unit(SourceUnit::new("Inventory.cs").with_type(TypeDecl::new("Inventory")));
    ws
}

#[test]
#[serial]
fn global_store_load_get_unload() {
    let store = session::global();
    let baseline = store.len();

    let id = store.load(workspace());
    assert_eq!(store.len(), baseline + 1);

    {
        let handle = store.get(id).unwrap();
        let session = handle.lock();
        assert_eq!(session.id, id);
        assert_eq!(session.workspace.unit_count(), 1);
        assert!(session.wrappers.is_empty());
    }

    store.unload(id).unwrap();
    assert_eq!(store.len(), baseline);
    assert!(store.get(id).is_err());
}

#[test]
#[serial]
fn unloading_twice_reports_not_found() {
    let store = session::global();
    let id = store.load(workspace());
    store.unload(id).unwrap();
    assert!(store.unload(id).is_err());
}

#[test]
#[serial]
fn sessions_are_isolated() {
    let store = session::global();
    let a = store.load(workspace());
    let b = store.load(workspace());
    assert_ne!(a, b);

    {
        let handle = store.get(a).unwrap();
        let mut session = handle.lock();
        let path = std::path::PathBuf::from("Inventory.cs");
        session.workspace.mark_dirty(&path);
    }
    {
        let handle = store.get(b).unwrap();
        let session = handle.lock();
        assert!(!session.workspace.has_dirty());
    }

    store.unload(a).unwrap();
    store.unload(b).unwrap();
}
