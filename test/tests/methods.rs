use tether_client::{ClientConfig, RemoteSession};
use tether_server::{HostConfig, HostSession};
use tether_shared::{
    ClientToken, CorrelationId, PeerDescriptor, SyncError, SyncMessage, TransportError, Value,
};
use tether_test::{connect, creates_of, exchange, init_logger, LoopbackTransport, TestTypes};

struct Fixture {
    types: TestTypes,
    host: HostSession,
    peer: ClientToken,
    client: RemoteSession,
}

async fn fixture(descriptor: PeerDescriptor) -> (Fixture, tether_shared::Instance) {
    init_logger();
    let types = TestTypes::new();
    let mut host = HostSession::with_registry(HostConfig::default(), types.registry());
    let (peer, mut client) = connect(&mut host, descriptor, types.registry());
    let player = types.player("Ann");
    host.track(&player).unwrap();
    exchange(&mut host, &peer, &mut client).await;
    (
        Fixture {
            types,
            host,
            peer,
            client,
        },
        player,
    )
}

#[tokio::test]
async fn peer_calls_host_method() {
    let (mut fx, player) = fixture(PeerDescriptor::new("alice")).await;
    let player_id = fx.host.object_id(&player).unwrap();
    let replica = fx.client.get(&player_id).unwrap();

    let pending = fx
        .client
        .invoke(&replica, "greet", vec![Value::from("Bo")])
        .unwrap()
        .unwrap();
    let call_round = exchange(&mut fx.host, &fx.peer, &mut fx.client).await;
    assert_eq!(call_round.host_report.results.len(), 1);
    let answer_round = exchange(&mut fx.host, &fx.peer, &mut fx.client).await;

    assert!(answer_round.client_report.is_ok());
    assert_eq!(pending.await, Ok(Value::from("Ann greets Bo")));
}

#[tokio::test]
async fn host_calls_peer_method() {
    let (mut fx, player) = fixture(PeerDescriptor::new("alice")).await;

    let pending = fx
        .host
        .invoke(&fx.peer, &player, "greet", vec![Value::from("Cy")])
        .unwrap()
        .unwrap();
    let round = exchange(&mut fx.host, &fx.peer, &mut fx.client).await;

    assert!(matches!(round.sent.as_slice(), [SyncMessage::Invoke { .. }]));
    assert!(round.host_report.is_ok());
    assert_eq!(pending.await, Ok(Value::from("Ann greets Cy")));
}

#[tokio::test]
async fn fire_and_forget_calls_get_no_result() {
    let (mut fx, player) = fixture(PeerDescriptor::new("alice")).await;
    let player_id = fx.host.object_id(&player).unwrap();
    let replica = fx.client.get(&player_id).unwrap();

    let pending = fx
        .client
        .invoke(&replica, "add_score", vec![Value::from(5)])
        .unwrap();
    assert!(pending.is_none());
    let call_round = exchange(&mut fx.host, &fx.peer, &mut fx.client).await;
    assert!(call_round.host_report.results.is_empty());
    assert_eq!(player.get("score"), Some(Value::Int(5)));

    // the handler's mutation flows back like any other change
    exchange(&mut fx.host, &fx.peer, &mut fx.client).await;
    assert_eq!(replica.get("score"), Some(Value::Int(5)));
}

#[tokio::test]
async fn failing_handlers_resolve_to_errors() {
    let (mut fx, player) = fixture(PeerDescriptor::new("alice")).await;
    let player_id = fx.host.object_id(&player).unwrap();
    let replica = fx.client.get(&player_id).unwrap();

    let pending = fx.client.invoke(&replica, "fail", Vec::new()).unwrap().unwrap();
    exchange(&mut fx.host, &fx.peer, &mut fx.client).await;
    exchange(&mut fx.host, &fx.peer, &mut fx.client).await;

    assert_eq!(
        pending.await,
        Err(SyncError::MethodInvocation {
            method: "fail".to_string(),
            message: "refused".to_string(),
        })
    );
}

#[tokio::test]
async fn results_may_introduce_objects() {
    let (mut fx, player) = fixture(PeerDescriptor::new("alice")).await;
    let player_id = fx.host.object_id(&player).unwrap();
    let replica = fx.client.get(&player_id).unwrap();

    let pending = fx
        .client
        .invoke(&replica, "befriend", vec![Value::from("Dee")])
        .unwrap()
        .unwrap();
    exchange(&mut fx.host, &fx.peer, &mut fx.client).await;
    let answer_round = exchange(&mut fx.host, &fx.peer, &mut fx.client).await;

    let friend = player.get("friend").unwrap();
    let friend_id = fx.host.object_id(friend.as_object().unwrap()).unwrap();
    assert_eq!(creates_of(&answer_round.sent), vec![friend_id.clone()]);
    assert!(answer_round.client_report.is_ok());

    let answer = pending.await.unwrap();
    let replica_friend = fx.client.get(&friend_id).unwrap();
    assert!(answer.as_object().unwrap().ptr_eq(&replica_friend));
    assert_eq!(replica_friend.get("name"), Some(Value::from("Dee")));
    let linked = replica.get("friend").unwrap();
    assert!(linked.as_object().unwrap().ptr_eq(&replica_friend));
}

#[tokio::test]
async fn hidden_methods_cannot_be_called() {
    let (mut fx, player) = fixture(PeerDescriptor::new("guest")).await;
    let player_id = fx.host.object_id(&player).unwrap();
    let replica = fx.client.get(&player_id).unwrap();

    let pending = fx.client.invoke(&replica, "promote", Vec::new()).unwrap().unwrap();
    let call_round = exchange(&mut fx.host, &fx.peer, &mut fx.client).await;
    exchange(&mut fx.host, &fx.peer, &mut fx.client).await;

    assert!(matches!(
        call_round.host_report.errors.as_slice(),
        [(0, SyncError::UnknownMethod { .. })]
    ));
    assert!(matches!(
        pending.await,
        Err(SyncError::MethodInvocation { .. })
    ));
}

#[tokio::test]
async fn undeclared_methods_are_refused_locally() {
    let (mut fx, player) = fixture(PeerDescriptor::new("alice")).await;

    assert!(matches!(
        fx.host.invoke(&fx.peer, &player, "dance", Vec::new()),
        Err(SyncError::UnknownMethod { .. })
    ));
    assert!(fx.host.get_messages(&fx.peer).unwrap().is_empty());
}

#[tokio::test]
async fn invoking_unknown_objects_fails_without_side_effects() {
    let (mut fx, player) = fixture(PeerDescriptor::new("alice")).await;

    let report = fx
        .host
        .apply_messages(
            &fx.peer,
            vec![SyncMessage::Invoke {
                object_id: "missing".into(),
                method: "greet".to_string(),
                args: Vec::new(),
                correlation_id: CorrelationId::new("7"),
            }],
        )
        .await
        .unwrap();

    assert!(matches!(
        report.errors.as_slice(),
        [(0, SyncError::UnknownObject { .. })]
    ));
    assert_eq!(report.results.len(), 1);
    assert!(report.results[0].is_error());
    assert_eq!(player.get("score"), Some(Value::Int(0)));
    assert_eq!(fx.host.tracked_count(), 1);
}

#[tokio::test]
async fn disconnect_cancels_pending_calls() {
    let (mut fx, player) = fixture(PeerDescriptor::new("alice")).await;
    let player_id = fx.host.object_id(&player).unwrap();
    let replica = fx.client.get(&player_id).unwrap();

    let from_client = fx.client.invoke(&replica, "greet", Vec::new()).unwrap().unwrap();
    let from_host = fx
        .host
        .invoke(&fx.peer, &player, "greet", Vec::new())
        .unwrap()
        .unwrap();
    fx.client.disconnect();
    fx.host.remove_peer(&fx.peer).unwrap();

    assert!(matches!(
        from_client.await,
        Err(SyncError::PeerUnavailable { .. })
    ));
    assert!(matches!(
        from_host.await,
        Err(SyncError::PeerUnavailable { .. })
    ));
    assert!(fx.client.is_empty());
    assert!(!fx.host.has_peer(&fx.peer));
    assert_eq!(fx.types.score_hook_calls(), 1);
}

#[tokio::test]
async fn synchronize_runs_full_rounds_over_a_transport() {
    init_logger();
    let types = TestTypes::new();
    let mut host = HostSession::with_registry(HostConfig::default(), types.registry());
    let peer = host.register_peer(PeerDescriptor::new("alice"));
    let mut transport = LoopbackTransport::new();
    let player = types.player("Ann");
    let player_id = host.track(&player).unwrap();

    // nobody on the other end yet: the round fails and is retried in full
    assert!(matches!(
        host.synchronize(&peer, &transport).await,
        Err(SyncError::Transport(TransportError::NotConnected { .. }))
    ));
    let client = transport.connect(
        &peer,
        RemoteSession::new(ClientConfig::default(), types.registry()),
    );
    let report = host.synchronize(&peer, &transport).await.unwrap();
    assert!(report.is_ok());
    assert!(client.lock().await.get(&player_id).is_some());

    let pending = host
        .invoke(&peer, &player, "greet", vec![Value::from("Eve")])
        .unwrap()
        .unwrap();
    host.synchronize(&peer, &transport).await.unwrap();
    assert_eq!(pending.await, Ok(Value::from("Ann greets Eve")));
}
