//! Engine tests over the sqlite store
//!
//! Two engines sharing one database file stand in for two bot instances
//! serving the same chats.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use hare_core::{Clock, GameConfig, ParticipantId, SystemClock};
use hare_harness::{ManualClock, RecordingTransport};
use hare_runtime::{
    open_store, GameEngine, Interaction, Outcome, StoreBackend, StoreConfig,
};
use tempfile::TempDir;

struct Instances {
    first: GameEngine,
    second: GameEngine,
    transport: Arc<RecordingTransport>,
    _dir: TempDir,
}

async fn two_instances(latency: Duration) -> Instances {
    two_instances_with(latency, 30, Arc::new(ManualClock::at_epoch())).await
}

async fn two_instances_with(
    latency: Duration,
    lease_ttl_secs: u64,
    clock: Arc<dyn Clock>,
) -> Instances {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig {
        backend: StoreBackend::Sqlite,
        path: Some(dir.path().join("sessions.db")),
        lease_ttl_secs,
        ..StoreConfig::default()
    };
    let transport = Arc::new(RecordingTransport::new(clock.clone()).with_send_latency(latency));

    let mut engines = Vec::new();
    for _ in 0..2 {
        let store = open_store(&config, clock.clone()).await.unwrap();
        let engine = GameEngine::builder(store, transport.clone())
            .with_config(GameConfig::default())
            .with_decks(apple_decks())
            .with_clock(clock.clone())
            .build()
            .unwrap();
        engines.push(engine);
    }
    let second = engines.pop().unwrap();
    let first = engines.pop().unwrap();
    Instances {
        first,
        second,
        transport,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_round_spans_instances() {
    let instances = two_instances(Duration::ZERO).await;

    let opened = instances
        .first
        .dispatch(Interaction::NewRound {
            chat: CHAT,
            initiator: player(1, "ann"),
            trigger: String::new(),
        })
        .await
        .unwrap();
    let message = match opened {
        Outcome::RoundOpened {
            message: Some(message),
        } => message,
        other => panic!("expected an opened round, got {:?}", other),
    };

    let joined = instances
        .second
        .dispatch(Interaction::Join {
            source: message.clone(),
            actor: player(2, "bo"),
        })
        .await
        .unwrap();
    assert_eq!(joined, Outcome::RosterChanged);

    let dealt = instances
        .first
        .dispatch(Interaction::Begin {
            source: message.clone(),
            actor: player(1, "ann"),
        })
        .await
        .unwrap();
    match dealt {
        Outcome::Resolved(report) => {
            let mut ids = report.delivered.clone();
            ids.sort();
            assert_eq!(ids, vec![ParticipantId::new(1), ParticipantId::new(2)]);
        }
        other => panic!("expected a dealt round, got {:?}", other),
    }

    // the debounce window is shared too
    let again = instances
        .second
        .dispatch(Interaction::Begin {
            source: message,
            actor: player(2, "bo"),
        })
        .await
        .unwrap();
    assert_eq!(again, Outcome::Debounced);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_simultaneous_begins_across_instances_deal_once() {
    let instances = two_instances(Duration::from_millis(50)).await;
    let opened = instances
        .first
        .dispatch(Interaction::NewRound {
            chat: CHAT,
            initiator: player(1, "ann"),
            trigger: String::new(),
        })
        .await
        .unwrap();
    let message = match opened {
        Outcome::RoundOpened {
            message: Some(message),
        } => message,
        other => panic!("expected an opened round, got {:?}", other),
    };

    let presses = [instances.first.clone(), instances.second.clone()]
        .into_iter()
        .map(|engine| {
            let source = message.clone();
            tokio::spawn(async move {
                engine
                    .dispatch(Interaction::Begin {
                        source,
                        actor: player(1, "ann"),
                    })
                    .await
            })
        })
        .collect::<Vec<_>>();

    let mut resolved = 0;
    for press in presses {
        match press.await.unwrap().unwrap() {
            Outcome::Resolved(_) => resolved += 1,
            Outcome::Debounced => {}
            other => panic!("unexpected outcome {:?}", other),
        }
    }
    assert_eq!(resolved, 1);
    assert_eq!(instances.transport.private_sends().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_lease_outlives_its_ttl_while_dealing() {
    // deliveries take longer than the lease ttl of one second
    let instances =
        two_instances_with(Duration::from_millis(1_500), 1, Arc::new(SystemClock)).await;
    let opened = instances
        .first
        .dispatch(Interaction::NewRound {
            chat: CHAT,
            initiator: player(1, "ann"),
            trigger: String::new(),
        })
        .await
        .unwrap();
    let message = match opened {
        Outcome::RoundOpened {
            message: Some(message),
        } => message,
        other => panic!("expected an opened round, got {:?}", other),
    };

    let first = {
        let engine = instances.first.clone();
        let source = message.clone();
        tokio::spawn(async move {
            engine
                .dispatch(Interaction::Begin {
                    source,
                    actor: player(1, "ann"),
                })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(1_200)).await;

    let second = instances
        .second
        .dispatch(Interaction::Begin {
            source: message,
            actor: player(1, "ann"),
        })
        .await
        .unwrap();

    assert!(matches!(first.await.unwrap().unwrap(), Outcome::Resolved(_)));
    assert_eq!(second, Outcome::Debounced);
    assert_eq!(instances.transport.private_sends().len(), 1);
}
