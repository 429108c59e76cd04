use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use tether_shared::{
    AgentRegistry, Instance, InvokeMode, MethodDescriptor, PropertyDescriptor, TypeDescriptor,
    Value, Visibility,
};

/// Record types used across the integration tests
pub struct TestTypes {
    /// `player`: name, score, friend, plus `secret` for admins only.
    /// Methods: `greet` (answers), `add_score` (fire and forget),
    /// `fail` (always errors), `befriend` (returns a new object) and
    /// `promote` (admins only).
    pub player: Arc<TypeDescriptor>,
    /// `vault`: only visible to admins
    pub vault: Arc<TypeDescriptor>,
    /// Counts applied `score` changes on the receiving side
    pub score_hook_calls: Arc<AtomicUsize>,
}

impl TestTypes {
    pub fn new() -> Self {
        let score_hook_calls = Arc::new(AtomicUsize::new(0));
        let calls = score_hook_calls.clone();

        let player = TypeDescriptor::builder("player")
            .property(PropertyDescriptor::new("name"))
            .property(PropertyDescriptor::new("score").on_change(move |_, _| {
                calls.fetch_add(1, Ordering::SeqCst);
            }))
            .property(PropertyDescriptor::new("friend"))
            .property(
                PropertyDescriptor::new("secret").visible_to(Visibility::designated(["admin"])),
            )
            .method(MethodDescriptor::new("greet").handler(|this, args| async move {
                let name = this.get("name").unwrap_or_default();
                let other = args.first().cloned().unwrap_or_default();
                Ok(Value::from(format!(
                    "{} greets {}",
                    name.as_str().unwrap_or("nobody"),
                    other.as_str().unwrap_or("nobody")
                )))
            }))
            .method(
                MethodDescriptor::new("add_score")
                    .mode(InvokeMode::FireAndForget)
                    .handler(|this, args| async move {
                        let amount = args.first().and_then(Value::as_int).unwrap_or(0);
                        let score = this.get("score").and_then(|v| v.as_int()).unwrap_or(0);
                        this.set("score", score + amount)
                            .map_err(|error| error.to_string())?;
                        Ok::<_, String>(Value::Null)
                    }),
            )
            .method(
                MethodDescriptor::new("fail")
                    .handler(|_, _| async { Err("refused".to_string()) }),
            )
            .method(MethodDescriptor::new("befriend").handler(|this, args| async move {
                let name = args.first().cloned().unwrap_or_default();
                let friend = Instance::object_from([("name", name)]);
                this.set("friend", &friend).map_err(|error| error.to_string())?;
                Ok::<_, String>(Value::from(friend))
            }))
            .method(
                MethodDescriptor::new("promote")
                    .visible_to(Visibility::designated(["admin"]))
                    .handler(|_, _| async { Ok(Value::from(true)) }),
            )
            .build();

        let vault = TypeDescriptor::builder("vault")
            .visible_to(Visibility::designated(["admin"]))
            .property(PropertyDescriptor::new("gold"))
            .build();

        Self {
            player,
            vault,
            score_hook_calls,
        }
    }

    pub fn registry(&self) -> AgentRegistry {
        let mut registry = AgentRegistry::new();
        registry
            .register_type(self.player.clone())
            .register_type(self.vault.clone());
        registry
    }

    pub fn player(&self, name: &str) -> Instance {
        let player = Instance::record(&self.player);
        player.set("name", name).expect("player declares name");
        player.set("score", 0).expect("player declares score");
        player
    }

    pub fn score_hook_calls(&self) -> usize {
        self.score_hook_calls.load(Ordering::SeqCst)
    }
}

impl Default for TestTypes {
    fn default() -> Self {
        Self::new()
    }
}
