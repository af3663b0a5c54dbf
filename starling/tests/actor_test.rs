// Integration tests for actors scheduled on an ActorSystem

use starling::logging;
use starling::thread::{
    Actor, ActorPromise, ActorState, ActorSystem, ActorSystemConfig, Message, Promise, Value,
};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Record,
    Boom,
    Quit,
}

fn system(name: &str, workers: usize) -> Arc<ActorSystem<Kind>> {
    logging::init_test();
    ActorSystem::with_config(ActorSystemConfig::new(name).with_pool_size(workers)).unwrap()
}

#[test]
fn test_messages_handled_in_order_exactly_once() {
    let system = system("ordered", 4);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let record = seen.clone();
    let actor = system
        .create_actor(
            move |_: &Actor<Kind>, message: &Message<Kind>| -> Option<ActorPromise> {
                if let Some(n) = message.data_as::<u32>() {
                    record.lock().unwrap().push(*n);
                }
                None
            },
            "recorder",
        )
        .unwrap();
    system.run();

    let mut promises = Vec::new();
    for n in 0..500u32 {
        promises.push(actor.send(actor.message(Some(Box::new(n)), Kind::Record)));
    }
    for promise in promises {
        assert!(promise.get_timeout(Duration::from_secs(10)).unwrap().is_none());
    }

    assert_eq!(*seen.lock().unwrap(), (0..500).collect::<Vec<u32>>());

    actor.kill();
    system.join();
}

#[test]
fn test_kill_recycles_queued_messages() {
    let system = system("recycle", 1);
    let actor = system
        .create_actor(
            |_: &Actor<Kind>, _: &Message<Kind>| -> Option<ActorPromise> { None },
            "idle",
        )
        .unwrap();

    // Never spawned, so the messages stay queued.
    let promises: Vec<ActorPromise> = (0..10)
        .map(|_| actor.send(system.get_message(None, Kind::Record, None)))
        .collect();
    assert_eq!(actor.mailbox_len(), 10);
    assert_eq!(system.pooled_messages(), 0);

    let mut cleaned = 0;
    assert!(actor.kill_with(|_| cleaned += 1));
    assert_eq!(cleaned, 10);
    assert_eq!(actor.state(), ActorState::Dead);
    assert_eq!(actor.mailbox_len(), 0);
    assert_eq!(system.pooled_messages(), 10);
    assert_eq!(system.actor_count(), 0);

    for promise in promises {
        assert!(promise.get().unwrap().is_none());
    }
    system.join();
}

#[test]
fn test_kill_cleanup_can_send_to_same_actor() {
    let system = system("resend", 1);
    let actor = system
        .create_actor(
            |_: &Actor<Kind>, _: &Message<Kind>| -> Option<ActorPromise> { None },
            "resender",
        )
        .unwrap();
    for _ in 0..3 {
        actor.send(actor.message(None, Kind::Record));
    }

    let again = actor.clone();
    let mut resent = Vec::new();
    assert!(actor.kill_with(|_| resent.push(again.send(again.message(None, Kind::Record)))));
    assert_eq!(resent.len(), 3);
    assert_eq!(system.pooled_messages(), 3);

    // The resent messages were queued after the drain and are dropped here.
    assert_eq!(actor.mailbox_len(), 3);
    actor.destroy();
    for promise in resent {
        assert!(promise.get().unwrap().is_none());
    }
    system.join();
}

#[test]
fn test_handler_panic_resolves_none_and_actor_continues() {
    let system = system("panics", 2);
    let actor = system
        .create_actor(
            |_: &Actor<Kind>, message: &Message<Kind>| -> Option<ActorPromise> {
                match message.kind() {
                    Some(Kind::Boom) => panic!("handler failure"),
                    _ => Some(Promise::resolved(Some(Box::new("ok") as Value))),
                }
            },
            "fragile",
        )
        .unwrap();
    system.run();

    let boom = actor.send(actor.message(None, Kind::Boom));
    let fine = actor.send(actor.message(None, Kind::Record));

    assert!(boom.get().unwrap().is_none());
    let value = fine.get().unwrap().unwrap();
    assert_eq!(*value.downcast::<&str>().unwrap(), "ok");
    assert!(actor.is_alive());

    actor.kill();
    system.join();
}

#[test]
fn test_reply_before_self_kill_reaches_sender() {
    let system = system("reply", 2);
    let actor = system
        .create_actor(
            |actor: &Actor<Kind>, message: &Message<Kind>| -> Option<ActorPromise> {
                if message.kind() == Some(&Kind::Quit) {
                    message.reply(Some(Box::new(7u8))).unwrap();
                    actor.kill();
                }
                None
            },
            "quitter",
        )
        .unwrap();
    system.run();

    let reply = actor.send(actor.message(None, Kind::Quit));
    let value = reply.get().unwrap().unwrap();
    assert_eq!(*value.downcast::<u8>().unwrap(), 7);

    system.join();
    assert_eq!(actor.state(), ActorState::Dead);
    assert!(system.is_stopped());
}

#[test]
fn test_sender_killed_mid_turn_still_gets_chained_reply() {
    let system = system("killed-mid-turn", 2);
    let closer = system
        .create_actor(
            |actor: &Actor<Kind>, message: &Message<Kind>| -> Option<ActorPromise> {
                message.reply(Some(Box::new("DONE"))).ok()?;
                actor.kill();
                if let Some(sender) = message.sender() {
                    sender.kill();
                }
                None
            },
            "closer",
        )
        .unwrap();
    let target = closer.clone();
    let caller = system
        .create_actor(
            move |actor: &Actor<Kind>, _: &Message<Kind>| -> Option<ActorPromise> {
                let promise = target.send(actor.message(None, Kind::Quit));
                // The closer kills this actor before the turn returns.
                thread::sleep(Duration::from_millis(200));
                Some(promise)
            },
            "caller",
        )
        .unwrap();
    system.run();

    let reply = caller.send(caller.message(None, Kind::Record));
    let value = reply
        .get_timeout(Duration::from_secs(5))
        .unwrap()
        .expect("reply lost when the sender was killed");
    assert_eq!(*value.downcast::<&str>().unwrap(), "DONE");

    system.join();
    assert_eq!(caller.state(), ActorState::Dead);
    assert_eq!(closer.state(), ActorState::Dead);
}

#[test]
fn test_chained_reply_follows_other_actor() {
    let system = system("chain", 2);
    let echo = system
        .create_actor(
            |_: &Actor<Kind>, message: &Message<Kind>| -> Option<ActorPromise> {
                let n = message.data_as::<u32>().copied().unwrap_or(0);
                Some(Promise::resolved(Some(Box::new(n + 1) as Value)))
            },
            "echo",
        )
        .unwrap();
    let relay_target = echo.clone();
    let relay = system
        .create_actor(
            move |actor: &Actor<Kind>, message: &Message<Kind>| -> Option<ActorPromise> {
                let n = message.data_as::<u32>().copied().unwrap_or(0);
                Some(relay_target.send(actor.message(Some(Box::new(n * 10)), Kind::Record)))
            },
            "relay",
        )
        .unwrap();
    system.run();

    let reply = relay.send(relay.message(Some(Box::new(4u32)), Kind::Record));
    let value = reply.get_timeout(Duration::from_secs(10)).unwrap().unwrap();
    assert_eq!(*value.downcast::<u32>().unwrap(), 41);

    system.destroy();
    assert_eq!(system.actor_count(), 0);
    assert_eq!(relay.state(), ActorState::Dead);
}

#[test]
fn test_add_to_second_system_rejected() {
    let first = system("first", 1);
    let second = system("second", 1);
    let actor = first
        .create_actor(
            |_: &Actor<Kind>, _: &Message<Kind>| -> Option<ActorPromise> { None },
            "loyal",
        )
        .unwrap();

    let err = second.add(&actor).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Actor is already registered with a running system: loyal"
    );
}
