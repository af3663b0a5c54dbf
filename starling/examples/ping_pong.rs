//! Two actors trade PING and PONG until the hop count runs out. The promise
//! returned by the very first send follows every hop and finally resolves to
//! the DONE message.
//!
//! Run with `cargo run --example ping_pong -- 100000`.

use starling::logging::{self, info};
use starling::{Actor, ActorPromise, ActorSystem, ActorSystemConfig, Message, Promise, Value};
use std::env;
use std::sync::OnceLock;
use std::time::Instant;

static HOPS: OnceLock<u64> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Ping,
    Pong,
    Done,
}

fn hops() -> u64 {
    *HOPS.get_or_init(|| 1000)
}

fn respond(actor: &Actor<Kind>, message: &Message<Kind>, kind: Kind) -> Option<ActorPromise> {
    let target = message.sender()?;
    let kind = if message.id() < hops() { kind } else { Kind::Done };
    if message.id() % 100_000 == 0 {
        info!("{} -> {:?} -> {} {}", actor.name(), kind, target.name(), message.id());
    }
    let mut response = actor.message(None, kind);
    response.set_id(message.id() + 1);
    Some(target.send(response))
}

fn play(actor: &Actor<Kind>, message: &Message<Kind>) -> Option<ActorPromise> {
    match message.kind()? {
        Kind::Ping => respond(actor, message, Kind::Pong),
        Kind::Pong => respond(actor, message, Kind::Ping),
        Kind::Done => {
            info!("{} received DONE at hop {}", actor.name(), message.id());
            let mut response = actor.message(None, Kind::Done);
            response.set_id(message.id() + 1);
            Some(Promise::resolved(Some(Box::new(response) as Value)))
        }
    }
}

fn main() -> anyhow::Result<()> {
    logging::init_default();
    if let Some(arg) = env::args().nth(1) {
        let _ = HOPS.set(arg.parse()?);
    }

    let system = ActorSystem::with_config(
        ActorSystemConfig::new("ping-pong").with_preallocated_messages(16),
    )?;
    let ping = system.create_actor(play, "ping")?;
    let pong = system.create_actor(play, "pong")?;

    let mut first = pong.message(None, Kind::Ping);
    first.set_id(1);
    let promise = ping.send(first);

    let started = Instant::now();
    system.run();

    let done = promise
        .get()?
        .and_then(|value| value.downcast::<Message<Kind>>().ok());
    match done {
        Some(message) if message.kind() == Some(&Kind::Done) => {
            info!(hops = hops(), elapsed = ?started.elapsed(), "resolved promise: PASSED");
        }
        _ => info!("resolved promise: FAILED"),
    }

    ping.kill();
    pong.kill();
    system.join();
    system.destroy();
    Ok(())
}
