use serde_json::json;

use tether_client::{ClientConfig, RemoteSession};
use tether_server::{HostConfig, HostSession};
use tether_shared::{
    AgentRegistry, DuplicateCreatePolicy, Instance, ObjectId, PeerDescriptor, SyncError,
    SyncMessage, TypeTag, Value,
};
use tether_test::{connect, creates_of, deletes, exchange, init_logger, kinds};

fn host() -> HostSession {
    HostSession::new(HostConfig::default())
}

#[tokio::test]
async fn dropping_the_last_handle_deletes_on_every_peer() {
    init_logger();
    let mut host = host();
    let (alice, mut alice_client) =
        connect(&mut host, PeerDescriptor::new("alice"), AgentRegistry::new());
    let (bob, mut bob_client) =
        connect(&mut host, PeerDescriptor::new("bob"), AgentRegistry::new());
    let root = Instance::object();
    let child = Instance::object_from([("n", 1)]);
    root.set("child", &child).unwrap();
    host.track(&root).unwrap();
    exchange(&mut host, &alice, &mut alice_client).await;
    exchange(&mut host, &bob, &mut bob_client).await;
    let child_id = host.object_id(&child).unwrap();

    root.set("child", Value::Null).unwrap();
    drop(child);
    let alice_round = exchange(&mut host, &alice, &mut alice_client).await;
    let bob_round = exchange(&mut host, &bob, &mut bob_client).await;

    assert_eq!(kinds(&alice_round.sent), vec!["delete", "change"]);
    assert_eq!(deletes(&alice_round.sent), vec![child_id.clone()]);
    assert_eq!(deletes(&bob_round.sent), vec![child_id.clone()]);
    assert!(alice_client.get(&child_id).is_none());
    assert!(bob_client.get(&child_id).is_none());
    assert!(host.get(&child_id).is_none());
}

#[tokio::test]
async fn dropped_roots_are_deleted_only_where_created() {
    init_logger();
    let mut host = host();
    let (alice, mut alice_client) =
        connect(&mut host, PeerDescriptor::new("alice"), AgentRegistry::new());
    let (bob, mut bob_client) =
        connect(&mut host, PeerDescriptor::new("bob"), AgentRegistry::new());
    let root = Instance::object();
    let root_id = host.track(&root).unwrap();
    exchange(&mut host, &alice, &mut alice_client).await;

    drop(root);
    let alice_round = exchange(&mut host, &alice, &mut alice_client).await;
    let bob_round = exchange(&mut host, &bob, &mut bob_client).await;

    assert_eq!(deletes(&alice_round.sent), vec![root_id.clone()]);
    assert!(bob_round.sent.is_empty());
    assert!(!host.is_root(&root_id));
    assert_eq!(host.tracked_count(), 0);
}

#[tokio::test]
async fn strong_tracking_keeps_objects_until_untracked() {
    init_logger();
    let config = HostConfig {
        weak_tracking: false,
        ..HostConfig::default()
    };
    let mut host = HostSession::new(config);
    let (peer, mut client) =
        connect(&mut host, PeerDescriptor::new("alice"), AgentRegistry::new());
    let root = Instance::object();
    let root_id = host.track(&root).unwrap();
    exchange(&mut host, &peer, &mut client).await;

    drop(root);
    let round = exchange(&mut host, &peer, &mut client).await;
    assert!(round.sent.is_empty());

    let root = host.get(&root_id).unwrap();
    host.untrack(&root).unwrap();
    let round = exchange(&mut host, &peer, &mut client).await;
    assert_eq!(deletes(&round.sent), vec![root_id.clone()]);
    assert!(client.is_empty());
}

#[tokio::test]
async fn untracking_deletes_once() {
    init_logger();
    let mut host = host();
    let (peer, mut client) =
        connect(&mut host, PeerDescriptor::new("alice"), AgentRegistry::new());
    let root = Instance::object();
    let root_id = host.track(&root).unwrap();
    exchange(&mut host, &peer, &mut client).await;

    assert_eq!(host.untrack(&root).unwrap(), root_id);
    let first = exchange(&mut host, &peer, &mut client).await;
    let second = exchange(&mut host, &peer, &mut client).await;

    assert_eq!(first.sent, vec![SyncMessage::Delete { object_id: root_id }]);
    assert!(second.sent.is_empty());
    assert!(matches!(
        host.untrack(&root),
        Err(SyncError::UnknownObject { .. })
    ));
}

#[tokio::test]
async fn explicit_ids_are_used_on_the_wire() {
    init_logger();
    let mut host = host();
    let (peer, mut client) =
        connect(&mut host, PeerDescriptor::new("alice"), AgentRegistry::new());
    let root = Instance::object();

    let root_id = host.track_with_id(&root, "world").unwrap();
    let round = exchange(&mut host, &peer, &mut client).await;

    assert_eq!(root_id, ObjectId::new("world"));
    assert_eq!(creates_of(&round.sent), vec![root_id]);
    assert!(matches!(
        host.track_with_id(&Instance::object(), "world"),
        Err(SyncError::DuplicateObjectId { .. })
    ));
}

#[tokio::test]
async fn scope_controls_which_roots_a_peer_sees() {
    init_logger();
    let config = HostConfig {
        auto_scope_roots: false,
        ..HostConfig::default()
    };
    let mut host = HostSession::new(config);
    let (peer, mut client) =
        connect(&mut host, PeerDescriptor::new("alice"), AgentRegistry::new());
    let lobby = Instance::object_from([("name", "lobby")]);
    let arena = Instance::object_from([("name", "arena")]);
    let lobby_id = host.track(&lobby).unwrap();
    let arena_id = host.track(&arena).unwrap();

    let round = exchange(&mut host, &peer, &mut client).await;
    assert!(round.sent.is_empty());

    host.peer_scope_mut(&peer)
        .unwrap()
        .include(&lobby)
        .include(&arena);
    assert!(host.peer_scope(&peer).unwrap().has(&lobby));
    let round = exchange(&mut host, &peer, &mut client).await;
    assert_eq!(creates_of(&round.sent), vec![lobby_id.clone(), arena_id.clone()]);

    host.peer_scope_mut(&peer).unwrap().exclude(&lobby);
    let round = exchange(&mut host, &peer, &mut client).await;
    assert_eq!(round.sent, vec![SyncMessage::Delete { object_id: lobby_id }]);

    // changes to excluded roots are no longer sent
    lobby.set("name", "closed").unwrap();
    let round = exchange(&mut host, &peer, &mut client).await;
    assert!(round.sent.is_empty());

    host.peer_scope_mut(&peer).unwrap().clear();
    let round = exchange(&mut host, &peer, &mut client).await;
    assert_eq!(deletes(&round.sent), vec![arena_id]);
    assert!(client.is_empty());
}

#[tokio::test]
async fn cleared_references_are_described_again_in_place() {
    init_logger();
    let mut host = host();
    let (peer, mut client) =
        connect(&mut host, PeerDescriptor::new("alice"), AgentRegistry::new());
    let root = Instance::object_from([("n", 1)]);
    let root_id = host.track(&root).unwrap();
    exchange(&mut host, &peer, &mut client).await;
    let replica = client.get(&root_id).unwrap();

    assert_eq!(host.clear_stored_references(&peer, None).unwrap(), 1);
    root.set("n", 2).unwrap();
    let round = exchange(&mut host, &peer, &mut client).await;

    assert_eq!(
        round.sent,
        vec![SyncMessage::Create {
            object_id: root_id.clone(),
            type_tag: TypeTag::object(),
            data: json!({"n": 2}),
        }]
    );
    assert!(client.get(&root_id).unwrap().ptr_eq(&replica));
    assert_eq!(replica.get("n"), Some(Value::Int(2)));
}

#[tokio::test]
async fn duplicate_create_is_ignored_when_configured() {
    init_logger();
    let mut config = ClientConfig::default();
    config.apply.duplicate_create = DuplicateCreatePolicy::Ignore;
    let mut host = host();
    let peer = host.register_peer(PeerDescriptor::new("alice"));
    let mut client = RemoteSession::new(config, AgentRegistry::new());
    let root = Instance::object_from([("n", 1)]);
    let root_id = host.track(&root).unwrap();
    exchange(&mut host, &peer, &mut client).await;

    host.clear_stored_references(&peer, None).unwrap();
    root.set("n", 2).unwrap();
    let round = exchange(&mut host, &peer, &mut client).await;

    assert_eq!(kinds(&round.sent), vec!["create"]);
    assert!(round.client_report.is_ok());
    assert_eq!(client.get(&root_id).unwrap().get("n"), Some(Value::Int(1)));
}

#[tokio::test]
async fn peers_may_not_describe_objects() {
    init_logger();
    let mut host = host();
    let peer = host.register_peer(PeerDescriptor::new("alice"));
    let root = Instance::object();
    let root_id = host.track(&root).unwrap();

    let report = host
        .apply_messages(
            &peer,
            vec![
                SyncMessage::Change {
                    object_id: root_id.clone(),
                    data: json!({"n": 1}),
                },
                SyncMessage::Delete { object_id: root_id },
            ],
        )
        .await
        .unwrap();

    assert!(matches!(
        report.errors.as_slice(),
        [
            (0, SyncError::ProtocolViolation { .. }),
            (1, SyncError::ProtocolViolation { .. })
        ]
    ));
    assert_eq!(root.get("n"), None);
    assert_eq!(host.tracked_count(), 1);
}

#[tokio::test]
async fn unknown_peers_are_rejected() {
    init_logger();
    let mut host = host();
    let stranger = tether_shared::ClientToken::new("stranger");

    assert!(matches!(
        host.get_messages(&stranger),
        Err(SyncError::UnknownPeer { .. })
    ));
    assert!(matches!(
        host.apply_messages(&stranger, Vec::new()).await,
        Err(SyncError::UnknownPeer { .. })
    ));
    assert!(host.peer_scope_mut(&stranger).is_err());
}

#[tokio::test]
async fn registering_again_starts_over() {
    init_logger();
    let mut host = host();
    let (peer, mut client) =
        connect(&mut host, PeerDescriptor::new("alice"), AgentRegistry::new());
    let root = Instance::object();
    let root_id = host.track(&root).unwrap();
    exchange(&mut host, &peer, &mut client).await;
    assert!(host.is_known_by(&root_id, &peer));

    let again = host.register_peer(PeerDescriptor::new("alice"));
    let mut fresh_client = RemoteSession::new(ClientConfig::default(), AgentRegistry::new());
    let round = exchange(&mut host, &again, &mut fresh_client).await;

    assert_eq!(again, peer);
    assert_eq!(creates_of(&round.sent), vec![root_id.clone()]);
    assert!(fresh_client.get(&root_id).is_some());
}

#[tokio::test]
async fn retracking_within_a_round_keeps_the_replica() {
    init_logger();
    let mut host = host();
    let (peer, mut client) =
        connect(&mut host, PeerDescriptor::new("alice"), AgentRegistry::new());
    let root = Instance::object_from([("n", 1)]);
    let root_id = host.track(&root).unwrap();
    exchange(&mut host, &peer, &mut client).await;
    let replica = client.get(&root_id).unwrap();

    host.untrack(&root).unwrap();
    root.set("n", 2).unwrap();
    assert_eq!(host.track(&root).unwrap(), root_id);
    let round = exchange(&mut host, &peer, &mut client).await;

    assert_eq!(kinds(&round.sent), vec!["create"]);
    assert!(round.client_report.is_ok());
    assert!(client.get(&root_id).unwrap().ptr_eq(&replica));
    assert_eq!(replica.get("n"), Some(Value::Int(2)));
    assert!(host.is_known_by(&root_id, &peer));

    let quiet = exchange(&mut host, &peer, &mut client).await;
    assert!(quiet.sent.is_empty());
}

#[tokio::test]
async fn excluding_and_including_within_a_round_keeps_the_replica() {
    init_logger();
    let config = HostConfig {
        auto_scope_roots: false,
        ..HostConfig::default()
    };
    let mut host = HostSession::new(config);
    let (peer, mut client) =
        connect(&mut host, PeerDescriptor::new("alice"), AgentRegistry::new());
    let lobby = Instance::object_from([("name", "lobby")]);
    let lobby_id = host.track(&lobby).unwrap();
    host.peer_scope_mut(&peer).unwrap().include(&lobby);
    exchange(&mut host, &peer, &mut client).await;
    let replica = client.get(&lobby_id).unwrap();

    host.peer_scope_mut(&peer)
        .unwrap()
        .exclude(&lobby)
        .include(&lobby);
    lobby.set("name", "reopened").unwrap();
    let round = exchange(&mut host, &peer, &mut client).await;

    assert_eq!(creates_of(&round.sent), vec![lobby_id.clone()]);
    assert!(deletes(&round.sent).is_empty());
    assert!(round.client_report.is_ok());
    assert!(client.get(&lobby_id).unwrap().ptr_eq(&replica));
    assert_eq!(replica.get("name"), Some(Value::from("reopened")));
}

#[tokio::test]
async fn deletes_still_go_out_when_the_object_stays_gone() {
    init_logger();
    let mut host = host();
    let (peer, mut client) =
        connect(&mut host, PeerDescriptor::new("alice"), AgentRegistry::new());
    let kept = Instance::object();
    let dropped = Instance::object();
    let kept_id = host.track(&kept).unwrap();
    let dropped_id = host.track(&dropped).unwrap();
    exchange(&mut host, &peer, &mut client).await;

    host.untrack(&kept).unwrap();
    host.untrack(&dropped).unwrap();
    host.track(&kept).unwrap();
    let round = exchange(&mut host, &peer, &mut client).await;

    assert_eq!(deletes(&round.sent), vec![dropped_id.clone()]);
    assert_eq!(creates_of(&round.sent), vec![kept_id.clone()]);
    assert!(client.get(&kept_id).is_some());
    assert!(client.get(&dropped_id).is_none());
}
