//! Dealing a round
//!
//! Resolution shuffles the roster, picks the odd-one-out and the secret word,
//! then sends every participant their private message concurrently. The
//! report is only produced once every delivery attempt has finished.

use std::sync::Arc;

use hare_core::{
    DeliveryFailure, GameConfig, Participant, ParticipantId, Renderer, Session, Transport,
};
use rand::seq::SliceRandom;
use rand::Rng;
use tokio::sync::mpsc;
use tracing::{debug, error};

// ----------------------------------------------------------------------------
// Assignment
// ----------------------------------------------------------------------------

/// Who bluffs and what everyone else is told
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub odd_one_out: Participant,
    pub secret: String,
}

impl Assignment {
    /// Private payload for `participant`
    pub fn payload_for<'a>(&'a self, participant: ParticipantId, odd_one_out_notice: &'a str) -> &'a str {
        if participant == self.odd_one_out.id {
            odd_one_out_notice
        } else {
            &self.secret
        }
    }
}

/// Shuffle the roster and draw the odd-one-out and the secret.
///
/// Returns `None` when the session has no participants or no deck.
pub fn assign<R: Rng + ?Sized>(session: &mut Session, rng: &mut R) -> Option<Assignment> {
    if !session.is_resolvable() {
        return None;
    }
    session.shuffle_roster(rng);
    let odd_one_out = session.roster().choose(rng)?.clone();
    let secret = session.deck()?.pick(rng).to_string();
    Some(Assignment {
        odd_one_out,
        secret,
    })
}

// ----------------------------------------------------------------------------
// Delivery Report
// ----------------------------------------------------------------------------

/// Outcome of every private delivery of a round, in roster order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: Vec<Participant>,
    pub failed: Vec<(Participant, DeliveryFailure)>,
}

impl DeliveryReport {
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn attempts(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }

    pub fn failed_participants(&self) -> Vec<Participant> {
        self.failed.iter().map(|(p, _)| p.clone()).collect()
    }
}

/// Send every participant their private payload and wait for all of them.
///
/// One task per participant reports into a channel sized to the roster.
/// Benign failures are recorded silently; anything else is logged as an
/// operational error. Neither stops the remaining deliveries.
pub async fn deliver(
    transport: Arc<dyn Transport>,
    roster: &[Participant],
    assignment: &Assignment,
    odd_one_out_notice: &str,
) -> DeliveryReport {
    let (tx, mut rx) = mpsc::channel(roster.len().max(1));

    for participant in roster.iter().cloned() {
        let payload = assignment
            .payload_for(participant.id, odd_one_out_notice)
            .to_string();
        let transport = Arc::clone(&transport);
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = transport.send_private(&participant, &payload).await;
            // the receiver outlives every sender
            let _ = tx.send((participant.id, result)).await;
        });
    }
    drop(tx);

    let mut outcomes: Vec<(ParticipantId, Result<(), DeliveryFailure>)> =
        Vec::with_capacity(roster.len());
    while let Some(outcome) = rx.recv().await {
        outcomes.push(outcome);
    }

    let mut report = DeliveryReport::default();
    for participant in roster {
        let result = outcomes
            .iter()
            .position(|(id, _)| *id == participant.id)
            .map(|index| outcomes.swap_remove(index).1)
            .unwrap_or_else(|| Err(DeliveryFailure::Other("delivery task aborted".to_string())));
        match result {
            Ok(()) => report.delivered.push(participant.clone()),
            Err(failure) => {
                if failure.is_benign() {
                    debug!(participant = %participant.id, %failure, "private message not delivered");
                } else {
                    error!(participant = %participant.id, %failure, "private delivery failed");
                }
                report.failed.push((participant.clone(), failure));
            }
        }
    }
    report
}

/// Public message closing the round.
///
/// Names exactly the unreachable participants when any delivery failed,
/// otherwise acknowledges the whole roster without revealing the
/// odd-one-out or the secret.
pub fn announcement(
    renderer: &dyn Renderer,
    config: &GameConfig,
    roster: &[Participant],
    report: &DeliveryReport,
) -> String {
    if report.all_delivered() {
        renderer.dealt(roster, config)
    } else {
        renderer.undelivered(&report.failed_participants(), config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hare_core::{Deck, TextRenderer};
    use hare_harness::{ManualClock, RecordingTransport};
    use rand::rngs::OsRng;
    use std::collections::HashSet;
    use std::time::Duration;

    fn player(id: i64, name: &str) -> Participant {
        Participant::new(ParticipantId::new(id), name)
    }

    fn session_with(players: &[Participant], words: &[&str]) -> Session {
        let mut session = Session::new();
        session.reset(Deck::new("test", words.iter()).unwrap());
        for p in players {
            session.add_participant(p.clone());
        }
        session
    }

    fn transport() -> Arc<RecordingTransport> {
        Arc::new(RecordingTransport::new(Arc::new(ManualClock::at_epoch())))
    }

    #[test]
    fn test_assign_empty_roster() {
        let mut session = session_with(&[], &["apple"]);
        assert!(assign(&mut session, &mut OsRng).is_none());
    }

    #[test]
    fn test_assign_keeps_roster_as_permutation() {
        let players: Vec<Participant> = (1..=6).map(|i| player(i, "p")).collect();
        let mut session = session_with(&players, &["apple", "pear"]);
        let assignment = assign(&mut session, &mut OsRng).unwrap();

        let before: HashSet<ParticipantId> = players.iter().map(|p| p.id).collect();
        let after: HashSet<ParticipantId> = session.roster().iter().map(|p| p.id).collect();
        assert_eq!(before, after);
        assert_eq!(session.roster().len(), players.len());
        assert!(before.contains(&assignment.odd_one_out.id));
        assert!(["apple", "pear"].contains(&assignment.secret.as_str()));
    }

    #[test]
    fn test_every_participant_can_be_odd_one_out() {
        let players = [player(1, "a"), player(2, "b"), player(3, "c")];
        let mut seen = HashSet::new();
        for _ in 0..300 {
            let mut session = session_with(&players, &["apple"]);
            seen.insert(assign(&mut session, &mut OsRng).unwrap().odd_one_out.id);
        }
        assert_eq!(seen.len(), 3);
    }

    #[tokio::test]
    async fn test_three_players_one_word() {
        let players = [player(1, "A"), player(2, "B"), player(3, "C")];
        let mut session = session_with(&players, &["apple"]);
        let assignment = assign(&mut session, &mut OsRng).unwrap();
        assert_eq!(assignment.secret, "apple");

        let transport = transport();
        let notice = TextRenderer.odd_one_out();
        let report = deliver(transport.clone(), session.roster(), &assignment, &notice).await;
        assert!(report.all_delivered());
        assert_eq!(report.attempts(), 3);

        let sends = transport.private_sends();
        assert_eq!(sends.len(), 3);
        let apples = sends.iter().filter(|(_, payload, _)| payload == "apple").count();
        assert_eq!(apples, 2);
        let hare: Vec<_> = sends.iter().filter(|(_, payload, _)| *payload == notice).collect();
        assert_eq!(hare.len(), 1);
        assert_eq!(hare[0].0, assignment.odd_one_out.id);

        let text = announcement(&TextRenderer, &GameConfig::default(), session.roster(), &report);
        for name in ["A", "B", "C"] {
            assert!(text.contains(name));
        }
        assert!(!text.contains("apple"));
        assert!(!text.contains("hare!"));
    }

    #[tokio::test]
    async fn test_single_player_round_is_dealt() {
        let mut session = session_with(&[player(9, "solo")], &["apple"]);
        let assignment = assign(&mut session, &mut OsRng).unwrap();
        assert_eq!(assignment.odd_one_out.id, ParticipantId::new(9));

        let transport = transport();
        let notice = TextRenderer.odd_one_out();
        let report = deliver(transport.clone(), session.roster(), &assignment, &notice).await;
        assert!(report.all_delivered());
        assert_eq!(transport.private_sends()[0].1, notice);
    }

    #[tokio::test]
    async fn test_benign_failures_are_named() {
        let players = [player(1, "ann"), player(2, "bo"), player(3, "cy"), player(4, "di")];
        let mut session = session_with(&players, &["apple"]);
        let assignment = assign(&mut session, &mut OsRng).unwrap();

        let transport = transport();
        transport.fail_delivery(ParticipantId::new(2), DeliveryFailure::RecipientNeverInitiated);
        transport.fail_delivery(ParticipantId::new(4), DeliveryFailure::RecipientBlocked);

        let report = deliver(transport.clone(), session.roster(), &assignment, "hare").await;
        assert_eq!(report.attempts(), 4);
        let failed: HashSet<ParticipantId> =
            report.failed_participants().iter().map(|p| p.id).collect();
        assert_eq!(
            failed,
            HashSet::from([ParticipantId::new(2), ParticipantId::new(4)])
        );

        let text = announcement(&TextRenderer, &GameConfig::default(), session.roster(), &report);
        assert!(text.contains("bo") && text.contains("di"));
        assert!(!text.contains("ann") && !text.contains("cy"));
    }

    #[tokio::test]
    async fn test_operational_failure_does_not_stop_others() {
        let players = [player(1, "ann"), player(2, "bo"), player(3, "cy")];
        let mut session = session_with(&players, &["apple"]);
        let assignment = assign(&mut session, &mut OsRng).unwrap();

        let transport = transport();
        transport.fail_delivery(
            ParticipantId::new(1),
            DeliveryFailure::Other("server error".to_string()),
        );
        let report = deliver(transport.clone(), session.roster(), &assignment, "hare").await;
        assert_eq!(report.delivered.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0.id, ParticipantId::new(1));
    }

    #[tokio::test]
    async fn test_deliveries_run_concurrently() {
        let players: Vec<Participant> = (1..=5).map(|i| player(i, "p")).collect();
        let mut session = session_with(&players, &["apple"]);
        let assignment = assign(&mut session, &mut OsRng).unwrap();

        let transport = Arc::new(
            RecordingTransport::new(Arc::new(ManualClock::at_epoch()))
                .with_send_latency(Duration::from_millis(100)),
        );
        let report = deliver(transport.clone(), session.roster(), &assignment, "hare").await;
        assert_eq!(report.attempts(), 5);
        assert_eq!(transport.private_sends().len(), 5);
        assert_eq!(transport.max_in_flight(), 5);
    }

    #[tokio::test]
    async fn test_report_follows_roster_order() {
        let players = [player(3, "c"), player(1, "a"), player(2, "b")];
        let session = session_with(&players, &["apple"]);
        let assignment = Assignment {
            odd_one_out: players[0].clone(),
            secret: "apple".to_string(),
        };
        let report = deliver(transport(), session.roster(), &assignment, "hare").await;
        let ids: Vec<i64> = report.delivered.iter().map(|p| p.id.get()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }
}
