use serde_json::json;

use tether_server::{HostConfig, HostSession};
use tether_shared::{AgentRegistry, Instance, Key, PeerDescriptor, SyncMessage, Value};
use tether_test::{changes_of, connect, creates_of, exchange, init_logger, kinds, TestTypes};

fn host(types: &TestTypes) -> HostSession {
    HostSession::with_registry(HostConfig::default(), types.registry())
}

#[tokio::test]
async fn unchanged_objects_are_not_sent_again() {
    init_logger();
    let types = TestTypes::new();
    let mut host = host(&types);
    let (peer, mut client) = connect(&mut host, PeerDescriptor::new("alice"), types.registry());
    let player = types.player("Ann");
    let player_id = host.track(&player).unwrap();

    let first = exchange(&mut host, &peer, &mut client).await;
    assert_eq!(creates_of(&first.sent), vec![player_id.clone()]);
    assert!(first.client_report.is_ok());

    let second = exchange(&mut host, &peer, &mut client).await;
    assert!(second.sent.is_empty());

    let replica = client.get(&player_id).unwrap();
    assert_eq!(replica.get("name"), Some(Value::from("Ann")));
    assert_eq!(replica.get("score"), Some(Value::Int(0)));
}

#[tokio::test]
async fn change_carries_only_mutated_properties() {
    init_logger();
    let types = TestTypes::new();
    let mut host = host(&types);
    let (peer, mut client) = connect(&mut host, PeerDescriptor::new("alice"), types.registry());
    let player = types.player("Ann");
    let player_id = host.track(&player).unwrap();
    exchange(&mut host, &peer, &mut client).await;
    let hook_calls = types.score_hook_calls();

    player.set("score", 10).unwrap();
    let round = exchange(&mut host, &peer, &mut client).await;

    assert_eq!(
        round.sent,
        vec![SyncMessage::Change {
            object_id: player_id.clone(),
            data: json!({"score": 10}),
        }]
    );
    let replica = client.get(&player_id).unwrap();
    assert_eq!(replica.get("score"), Some(Value::Int(10)));
    assert_eq!(replica.get("name"), Some(Value::from("Ann")));
    assert_eq!(types.score_hook_calls(), hook_calls + 1);
}

#[tokio::test]
async fn every_peer_gets_its_own_changes() {
    init_logger();
    let types = TestTypes::new();
    let mut host = host(&types);
    let (alice, mut alice_client) =
        connect(&mut host, PeerDescriptor::new("alice"), types.registry());
    let player = types.player("Ann");
    let player_id = host.track(&player).unwrap();
    exchange(&mut host, &alice, &mut alice_client).await;

    player.set("score", 3).unwrap();
    let (bob, mut bob_client) = connect(&mut host, PeerDescriptor::new("bob"), types.registry());
    let bob_round = exchange(&mut host, &bob, &mut bob_client).await;
    let alice_round = exchange(&mut host, &alice, &mut alice_client).await;

    // bob joined late and gets the full description, alice only the change
    assert_eq!(kinds(&bob_round.sent), vec!["create"]);
    assert_eq!(changes_of(&alice_round.sent, &player_id), vec![json!({"score": 3})]);
    assert_eq!(
        bob_client.get(&player_id).unwrap().get("score"),
        Some(Value::Int(3))
    );
}

#[tokio::test]
async fn cycles_are_reconstructed() {
    init_logger();
    let types = TestTypes::new();
    let mut host = host(&types);
    let (peer, mut client) = connect(&mut host, PeerDescriptor::new("alice"), types.registry());
    let ann = types.player("Ann");
    let bo = types.player("Bo");
    ann.set("friend", &bo).unwrap();
    bo.set("friend", &ann).unwrap();
    let ann_id = host.track(&ann).unwrap();

    let round = exchange(&mut host, &peer, &mut client).await;

    let bo_id = host.object_id(&bo).unwrap();
    assert_eq!(creates_of(&round.sent), vec![ann_id.clone(), bo_id.clone()]);
    assert!(round.client_report.is_ok());
    let ann_replica = client.get(&ann_id).unwrap();
    let bo_replica = client.get(&bo_id).unwrap();
    let ann_friend = ann_replica.get("friend").unwrap();
    let bo_friend = bo_replica.get("friend").unwrap();
    assert!(ann_friend.as_object().unwrap().ptr_eq(&bo_replica));
    assert!(bo_friend.as_object().unwrap().ptr_eq(&ann_replica));

    // break the cycle so both sides can be dropped
    ann.set("friend", Value::Null).unwrap();
    ann_replica.set("friend", Value::Null).unwrap();
}

#[tokio::test]
async fn objects_referenced_later_are_created_in_that_round() {
    init_logger();
    let mut host = HostSession::new(HostConfig::default());
    let (peer, mut client) =
        connect(&mut host, PeerDescriptor::new("alice"), AgentRegistry::new());
    let root = Instance::object_from([("label", "root")]);
    let root_id = host.track(&root).unwrap();
    exchange(&mut host, &peer, &mut client).await;

    let child = Instance::object_from([("label", "child")]);
    root.set("child", &child).unwrap();
    let round = exchange(&mut host, &peer, &mut client).await;

    let child_id = host.object_id(&child).unwrap();
    assert_eq!(kinds(&round.sent), vec!["change", "create"]);
    assert_eq!(creates_of(&round.sent), vec![child_id.clone()]);
    let replica_child = client.get(&child_id).unwrap();
    let linked = client.get(&root_id).unwrap().get("child").unwrap();
    assert!(linked.as_object().unwrap().ptr_eq(&replica_child));
    assert_eq!(replica_child.get("label"), Some(Value::from("child")));
}

#[tokio::test]
async fn containers_replicate_their_edits() {
    init_logger();
    let mut host = HostSession::new(HostConfig::default());
    let (peer, mut client) =
        connect(&mut host, PeerDescriptor::new("alice"), AgentRegistry::new());
    let items = Instance::sequence(["a", "b", "c"]);
    let tags = Instance::set_from(["red", "blue"]);
    let scores = Instance::map_from([("ann", 1), ("bo", 2)]);
    let root = Instance::object_from([
        ("items", Value::from(&items)),
        ("tags", Value::from(&tags)),
        ("scores", Value::from(&scores)),
    ]);
    host.track(&root).unwrap();
    let first = exchange(&mut host, &peer, &mut client).await;
    assert_eq!(kinds(&first.sent), vec!["create"; 4]);

    items.splice(1, 1, vec!["x".into(), "y".into()]).unwrap();
    tags.delete(&Value::from("red")).unwrap();
    tags.add("green").unwrap();
    scores.remove(&Key::from("ann")).unwrap();
    scores.insert("cy", 3).unwrap();
    let second = exchange(&mut host, &peer, &mut client).await;

    let items_id = host.object_id(&items).unwrap();
    let tags_id = host.object_id(&tags).unwrap();
    let scores_id = host.object_id(&scores).unwrap();
    assert_eq!(
        changes_of(&second.sent, &items_id),
        vec![json!([{"start": 1, "deleteCount": 1, "items": ["x", "y"]}])]
    );
    assert_eq!(
        changes_of(&second.sent, &scores_id),
        vec![json!([{"op": "delete", "key": "ann"}, {"op": "set", "key": "cy", "value": 3}])]
    );
    assert!(second.client_report.is_ok());

    let replica_items = client.get(&items_id).unwrap();
    let replica_tags = client.get(&tags_id).unwrap();
    let replica_scores = client.get(&scores_id).unwrap();
    assert_eq!(replica_items.items().unwrap(), items.items().unwrap());
    assert_eq!(replica_tags.elements().unwrap(), tags.elements().unwrap());
    assert_eq!(replica_scores.entries().unwrap(), scores.entries().unwrap());
}

#[tokio::test]
async fn sequence_edits_keep_untouched_objects() {
    init_logger();
    let mut host = HostSession::new(HostConfig::default());
    let (peer, mut client) =
        connect(&mut host, PeerDescriptor::new("alice"), AgentRegistry::new());
    let first = Instance::object_from([("n", 1)]);
    let second = Instance::object_from([("n", 2)]);
    let list = Instance::sequence(vec![Value::from(&first), Value::from(&second)]);
    let list_id = host.track(&list).unwrap();
    exchange(&mut host, &peer, &mut client).await;
    let replica_list = client.get(&list_id).unwrap();
    let before = replica_list.items().unwrap();

    list.insert_at(0, "head").unwrap();
    list.remove_at(2).unwrap();
    exchange(&mut host, &peer, &mut client).await;

    let after = replica_list.items().unwrap();
    assert_eq!(after.len(), 2);
    assert_eq!(after[0], Value::from("head"));
    assert!(after[1]
        .as_object()
        .unwrap()
        .ptr_eq(before[0].as_object().unwrap()));
}

#[tokio::test]
async fn map_clear_is_replayed_before_new_entries() {
    init_logger();
    let mut host = HostSession::new(HostConfig::default());
    let (peer, mut client) =
        connect(&mut host, PeerDescriptor::new("alice"), AgentRegistry::new());
    let scores = Instance::map_from([("ann", 1), ("bo", 2)]);
    let scores_id = host.track(&scores).unwrap();
    exchange(&mut host, &peer, &mut client).await;

    scores.clear().unwrap();
    scores.insert("cy", 3).unwrap();
    let round = exchange(&mut host, &peer, &mut client).await;

    assert_eq!(
        changes_of(&round.sent, &scores_id),
        vec![json!([{"op": "clear"}, {"op": "set", "key": "cy", "value": 3}])]
    );
    assert_eq!(
        client.get(&scores_id).unwrap().entries().unwrap(),
        vec![(Key::from("cy"), Value::Int(3))]
    );
}
