use serde_json::json;

use tether_server::{HostConfig, HostSession};
use tether_shared::{Instance, PeerDescriptor, SyncMessage, Value};
use tether_test::{changes_of, connect, creates_of, exchange, init_logger, TestTypes};

fn admin() -> PeerDescriptor {
    PeerDescriptor::new("root").with_designation("admin")
}

fn guest() -> PeerDescriptor {
    PeerDescriptor::new("guest")
}

#[tokio::test]
async fn hidden_properties_are_left_out_of_creates() {
    init_logger();
    let types = TestTypes::new();
    let mut host = HostSession::with_registry(HostConfig::default(), types.registry());
    let (admin, mut admin_client) = connect(&mut host, admin(), types.registry());
    let (guest, mut guest_client) = connect(&mut host, guest(), types.registry());
    let player = types.player("Ann");
    player.set("secret", "hunter2").unwrap();
    let player_id = host.track(&player).unwrap();

    let admin_round = exchange(&mut host, &admin, &mut admin_client).await;
    let guest_round = exchange(&mut host, &guest, &mut guest_client).await;

    match (&admin_round.sent[..], &guest_round.sent[..]) {
        ([SyncMessage::Create { data: shown, .. }], [SyncMessage::Create { data: hidden, .. }]) => {
            assert_eq!(shown.get("secret"), Some(&json!("hunter2")));
            assert!(hidden.get("secret").is_none());
            assert_eq!(hidden.get("name"), Some(&json!("Ann")));
        }
        other => panic!("expected one create each, got {:?}", other),
    }
    assert_eq!(
        admin_client.get(&player_id).unwrap().get("secret"),
        Some(Value::from("hunter2"))
    );
    assert_eq!(
        guest_client.get(&player_id).unwrap().get("secret"),
        Some(Value::Null)
    );
}

#[tokio::test]
async fn hidden_property_changes_are_not_sent() {
    init_logger();
    let types = TestTypes::new();
    let mut host = HostSession::with_registry(HostConfig::default(), types.registry());
    let (admin, mut admin_client) = connect(&mut host, admin(), types.registry());
    let (guest, mut guest_client) = connect(&mut host, guest(), types.registry());
    let player = types.player("Ann");
    let player_id = host.track(&player).unwrap();
    exchange(&mut host, &admin, &mut admin_client).await;
    exchange(&mut host, &guest, &mut guest_client).await;

    player.set("secret", "swordfish").unwrap();
    let admin_round = exchange(&mut host, &admin, &mut admin_client).await;
    let guest_round = exchange(&mut host, &guest, &mut guest_client).await;

    assert_eq!(
        changes_of(&admin_round.sent, &player_id),
        vec![json!({"secret": "swordfish"})]
    );
    assert!(guest_round.sent.is_empty());
}

#[tokio::test]
async fn hidden_types_are_never_described() {
    init_logger();
    let types = TestTypes::new();
    let mut host = HostSession::with_registry(HostConfig::default(), types.registry());
    let (admin, mut admin_client) = connect(&mut host, admin(), types.registry());
    let (guest, mut guest_client) = connect(&mut host, guest(), types.registry());
    let vault = Instance::record(&types.vault);
    vault.set("gold", 100).unwrap();
    let vault_id = host.track(&vault).unwrap();

    let admin_round = exchange(&mut host, &admin, &mut admin_client).await;
    let guest_round = exchange(&mut host, &guest, &mut guest_client).await;

    assert_eq!(creates_of(&admin_round.sent), vec![vault_id.clone()]);
    assert!(guest_round.sent.is_empty());
    assert!(guest_client.get(&vault_id).is_none());
    assert!(!host.is_known_by(&vault_id, &guest));
}

#[tokio::test]
async fn objects_referencing_hidden_types_are_withheld() {
    init_logger();
    let types = TestTypes::new();
    let mut host = HostSession::with_registry(HostConfig::default(), types.registry());
    let (admin, mut admin_client) = connect(&mut host, admin(), types.registry());
    let (guest, mut guest_client) = connect(&mut host, guest(), types.registry());
    let vault = Instance::record(&types.vault);
    let player = types.player("Ann");
    player.set("friend", &vault).unwrap();
    let player_id = host.track(&player).unwrap();

    let admin_round = exchange(&mut host, &admin, &mut admin_client).await;
    let guest_round = exchange(&mut host, &guest, &mut guest_client).await;

    let vault_id = host.object_id(&vault).unwrap();
    assert_eq!(
        creates_of(&admin_round.sent),
        vec![player_id.clone(), vault_id]
    );
    assert!(guest_round.sent.is_empty());
    assert!(!host.is_known_by(&player_id, &guest));

    // once the reference is gone the player can be described
    player.set("friend", Value::Null).unwrap();
    let guest_round = exchange(&mut host, &guest, &mut guest_client).await;
    assert_eq!(creates_of(&guest_round.sent), vec![player_id.clone()]);
    assert!(guest_client.get(&player_id).is_some());
}
