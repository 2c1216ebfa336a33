//! End-to-end facade tests against the in-process backend.

use std::time::Duration;

use grove_client::{Client, ConnectOptions, EnsembleConfig, MemoryBackend, Node, Transaction};
use grove_model::{Acl, Disposition, GroveError, NodePath, OpResult, SessionState};

fn connect() -> Client {
    let config = EnsembleConfig::parse(&["node1".to_string(), "node2:2182".to_string()]).unwrap();
    Client::new(MemoryBackend::connect(&config, &ConnectOptions::default()))
}

fn path(s: &str) -> NodePath {
    NodePath::new(s)
}

#[tokio::test]
async fn test_crud_round_trip() {
    let client = connect();
    client
        .create(&path("/app"), b"v1".to_vec(), vec![Acl::open()], Disposition::Persistent, None)
        .await
        .unwrap();

    let (data, status) = client.get(&path("/app")).await.unwrap();
    assert_eq!(data, b"v1");
    assert_eq!(status.version, 0);

    let status = client.set(&path("/app"), b"v2".to_vec(), Some(0)).await.unwrap();
    assert_eq!(status.version, 1);

    client.delete(&path("/app"), Some(1)).await.unwrap();
    match client.get(&path("/app")).await {
        Err(GroveError::NoNode { path }) => assert_eq!(path, "/app"),
        other => panic!("expected no-such-node, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_recursive_builds_ancestors() {
    let client = connect();
    let created = client
        .create_recursive(
            &path("/a/b/c"),
            b"leaf".to_vec(),
            vec![Acl::open()],
            Disposition::Persistent,
            None,
        )
        .await
        .unwrap();
    assert_eq!(created.as_str(), "/a/b/c");
    assert!(client.exists(&path("/a")).await.unwrap().is_some());
    assert!(client.exists(&path("/a/b")).await.unwrap().is_some());

    // Existing ancestors are fine on a second call.
    client
        .create_recursive(
            &path("/a/b/d"),
            Vec::new(),
            vec![Acl::open()],
            Disposition::Persistent,
            None,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_recursive_tolerates_missing() {
    let client = connect();
    client
        .create_recursive(
            &path("/tree/x/y"),
            Vec::new(),
            vec![Acl::open()],
            Disposition::Persistent,
            None,
        )
        .await
        .unwrap();
    client.delete_recursive(&path("/tree")).await.unwrap();
    assert!(client.exists(&path("/tree")).await.unwrap().is_none());

    // Deleting an already-absent subtree is not an error.
    client.delete_recursive(&path("/tree")).await.unwrap();
}

#[tokio::test]
async fn test_empty_acl_rejected_before_any_call() {
    let client = connect();
    match client
        .create(&path("/x"), Vec::new(), Vec::new(), Disposition::Persistent, None)
        .await
    {
        Err(GroveError::InvalidAcl { path }) => assert_eq!(path, "/x"),
        other => panic!("expected invalid-acl, got {other:?}"),
    }
    match client.set_acl(&path("/"), Vec::new(), None).await {
        Err(GroveError::InvalidAcl { .. }) => {}
        other => panic!("expected invalid-acl, got {other:?}"),
    }
}

#[tokio::test]
async fn test_node_abstraction() {
    let client = connect();
    let root = Node::new(client.clone(), path("/"));
    let jobs = root.child("jobs");
    jobs.create(Vec::new(), vec![Acl::open()], Disposition::Persistent, None)
        .await
        .unwrap();
    jobs.child("j1")
        .create(b"payload".to_vec(), vec![Acl::open()], Disposition::Persistent, None)
        .await
        .unwrap();

    let children = jobs.children().await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].name(), "j1");
    assert_eq!(children[0].path().as_str(), "/jobs/j1");
    assert_eq!(children[0].parent().unwrap().path().as_str(), "/jobs");

    let (data, _) = children[0].data().await.unwrap();
    assert_eq!(data, b"payload");

    let status = jobs.stat().await.unwrap();
    assert_eq!(status.num_children, 1);
}

#[tokio::test]
async fn test_transaction_commit_and_abort() {
    let client = connect();
    client
        .create(&path("/cfg"), b"old".to_vec(), vec![Acl::open()], Disposition::Persistent, None)
        .await
        .unwrap();

    let results = Transaction::new()
        .check("/cfg", 0)
        .set_data("/cfg", b"new".to_vec(), Some(0))
        .create("/cfg/history-", b"old".to_vec(), vec![Acl::open()], Disposition::PersistentSequential)
        .commit(&client)
        .await
        .unwrap();
    assert_eq!(results.len(), 3);
    match &results[2] {
        OpResult::Created { path } => assert_eq!(path.as_str(), "/cfg/history-0000000000"),
        other => panic!("expected created, got {other:?}"),
    }

    // Stale check aborts the whole transaction.
    let err = Transaction::new()
        .check("/cfg", 0)
        .set_data("/cfg", b"lost".to_vec(), None)
        .commit(&client)
        .await
        .unwrap_err();
    match err {
        GroveError::Multi(multi) => {
            assert_eq!(multi.problems.len(), 1);
            assert_eq!(multi.problems[0].index, 0);
        }
        other => panic!("expected multi abort, got {other:?}"),
    }
    let (data, _) = client.get(&path("/cfg")).await.unwrap();
    assert_eq!(data, b"new");
}

#[tokio::test]
async fn test_watch_channels_deliver_off_thread_mutations() {
    let client = connect();
    client
        .create(&path("/feed"), Vec::new(), vec![Acl::open()], Disposition::Persistent, None)
        .await
        .unwrap();

    let (names, mut watch_rx) = client.children_watch(&path("/feed")).await.unwrap();
    assert!(names.is_empty());

    let writer = client.clone();
    let handle = tokio::spawn(async move {
        writer
            .create(&path("/feed/item"), Vec::new(), vec![Acl::open()], Disposition::Persistent, None)
            .await
            .unwrap();
    });
    let event = watch_rx.recv().await.unwrap();
    assert_eq!(event, grove_model::Event::ChildrenChanged(path("/feed")));
    handle.await.unwrap();
}

#[tokio::test]
async fn test_one_shot_and_persistent_watch_variants() {
    let client = connect();
    client
        .create(&path("/w"), b"0".to_vec(), vec![Acl::open()], Disposition::Persistent, None)
        .await
        .unwrap();

    let (data, _, mut data_rx) = client.get_watch(&path("/w")).await.unwrap();
    assert_eq!(data, b"0");
    let (missing, mut exists_rx) = client.exists_watch(&path("/w/child")).await.unwrap();
    assert!(missing.is_none());
    let mut subtree_rx = client.subscribe(&path("/w"), true).await.unwrap();

    client.set(&path("/w"), b"1".to_vec(), None).await.unwrap();
    client
        .create(&path("/w/child"), Vec::new(), vec![Acl::open()], Disposition::Persistent, None)
        .await
        .unwrap();

    use grove_model::Event;
    assert_eq!(data_rx.recv().await, Some(Event::DataChanged(path("/w"))));
    // One-shot: nothing further arrives on the data watch.
    assert_eq!(data_rx.recv().await, None);
    assert_eq!(exists_rx.recv().await, Some(Event::Created(path("/w/child"))));
    // The persistent subscription saw both mutations and stays armed.
    assert_eq!(subtree_rx.recv().await, Some(Event::DataChanged(path("/w"))));
    assert_eq!(subtree_rx.recv().await, Some(Event::Created(path("/w/child"))));
}

#[tokio::test]
async fn test_session_lifecycle() {
    let config = EnsembleConfig::parse(&["node1".to_string()]).unwrap();
    let options = ConnectOptions {
        timeout: Duration::from_secs(10),
        read_only: true,
        ..Default::default()
    };
    let backend = MemoryBackend::connect(&config, &options);
    let client = Client::new(backend.clone());

    let session = client.session();
    assert!(session.read_only);
    assert_eq!(session.timeout, Duration::from_secs(10));
    assert_eq!(client.current_state(), SessionState::ConnectedReadOnly);

    backend.expire();
    assert_eq!(client.current_state(), SessionState::Expired);
    match client.children(&path("/")).await {
        Err(GroveError::SessionExpired) => {}
        other => panic!("expected session-expired, got {other:?}"),
    }
}
