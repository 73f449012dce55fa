//! Property-based and exhaustive tests for the transition guard.
//!
//! The guard is a pure function over a small space (12 states, 11 actions,
//! a handful of actor relationships), so the edge table is swept in full
//! against an independently written allow-list, and proptest covers the
//! properties that hold across arbitrary action sequences.

use booking_lifecycle::{
    audit::{AuditEntry, replay_chain},
    booking::{Booking, BookingDraft, BookingStatus, Money, TimeStamp},
    guard::{self, Action, Actor, Rejection, Role},
    quote::QuoteInput,
};
use proptest::prelude::*;

const CLIENT: &str = "client_a";
const PROVIDER: &str = "provider_b";

fn fixture(status: BookingStatus) -> Booking {
    let mut booking = BookingDraft::new()
        .client(CLIENT)
        .provider(PROVIDER)
        .title("Service the heat pump")
        .into_booking("bkg_prop".into())
        .unwrap();
    booking.status = status;
    booking
}

fn client() -> Actor {
    Actor::new(CLIENT, Role::Client)
}

fn provider() -> Actor {
    Actor::new(PROVIDER, Role::Provider)
}

fn admin() -> Actor {
    Actor::new("ops_admin", Role::Admin)
}

fn all_actions() -> Vec<Action> {
    vec![
        Action::Accept,
        Action::Cancel { note: None },
        Action::ScheduleVisit {
            visit_date: TimeStamp::new_with(2026, 9, 1, 9, 0, 0),
        },
        Action::SubmitQuote(QuoteInput {
            price: Money::from_cents(100_000),
            ..Default::default()
        }),
        Action::ApproveQuote,
        Action::DeclineQuote,
        Action::StartWork,
        Action::CompleteWork,
        Action::ConfirmCompletion,
        Action::Dispute { note: None },
        Action::AdminOverride {
            target: BookingStatus::QuotePending,
            reason: "manual".into(),
        },
    ]
}

/// The edge table written out independently of the implementation: which
/// (source, action, party) triples are allowed, and where they land.
fn reference_table(
    from: BookingStatus,
    action: &Action,
    party: Role,
) -> Option<BookingStatus> {
    use BookingStatus::*;

    if let Action::AdminOverride { target, .. } = action {
        return (party == Role::Admin).then_some(*target);
    }
    if party == Role::Admin {
        return None;
    }

    let provider = party == Role::Provider;
    let client = party == Role::Client;
    match action {
        Action::Accept if provider && from == Pending => Some(Accepted),
        Action::Cancel { .. } if !from.is_terminal() => Some(Cancelled),
        Action::ScheduleVisit { .. } if provider && matches!(from, Accepted | QuotePending) => {
            Some(VisitScheduled)
        }
        Action::SubmitQuote(_) if provider && !from.is_terminal() => Some(QuoteSent),
        Action::ApproveQuote if client && from == QuoteSent => Some(QuoteApproved),
        Action::DeclineQuote if client && from == QuoteSent => Some(QuoteDeclined),
        Action::StartWork if provider && from == QuoteApproved => Some(InProgress),
        Action::CompleteWork if provider && !from.is_terminal() => Some(WorkCompleted),
        Action::ConfirmCompletion if client && from == WorkCompleted => Some(Completed),
        Action::Dispute { .. } if matches!(from, InProgress | WorkCompleted) => Some(Disputed),
        _ => None,
    }
}

/// Guard completeness: every triple in the table is allowed with the table's
/// destination, and every triple outside it is rejected.
#[test]
fn guard_matches_the_reference_table_exhaustively() {
    for from in BookingStatus::ALL {
        let booking = fixture(from);
        for action in all_actions() {
            for actor in [client(), provider(), admin()] {
                let expected = reference_table(from, &action, actor.role);
                let got = guard::evaluate(&booking, &actor, &action).ok();
                assert_eq!(
                    got, expected,
                    "mismatch for from={from:?} action={} actor={:?}",
                    action.name(),
                    actor.role
                );
            }
        }
    }
}

/// A non-party actor is rejected for every non-override triple.
#[test]
fn strangers_are_rejected_everywhere() {
    for from in BookingStatus::ALL {
        let booking = fixture(from);
        for action in all_actions() {
            if matches!(action, Action::AdminOverride { .. }) {
                continue;
            }
            for role in [Role::Client, Role::Provider] {
                let stranger = Actor::new("user_stranger", role);
                assert_eq!(
                    guard::evaluate(&booking, &stranger, &action),
                    Err(Rejection::NotAParty)
                );
            }
        }
    }
}

fn status_strategy() -> impl Strategy<Value = BookingStatus> {
    prop::sample::select(BookingStatus::ALL.to_vec())
}

fn party_action_strategy() -> impl Strategy<Value = (Actor, Action)> {
    prop_oneof![
        Just((provider(), Action::Accept)),
        prop::bool::ANY.prop_map(|c| {
            let actor = if c { client() } else { provider() };
            (actor, Action::Cancel { note: None })
        }),
        Just((
            provider(),
            Action::ScheduleVisit {
                visit_date: TimeStamp::new_with(2026, 9, 1, 9, 0, 0),
            }
        )),
        (1u64..10_000_000).prop_map(|price| (
            provider(),
            Action::SubmitQuote(QuoteInput {
                price: Money::from_cents(price),
                ..Default::default()
            })
        )),
        Just((client(), Action::ApproveQuote)),
        Just((client(), Action::DeclineQuote)),
        Just((provider(), Action::StartWork)),
        Just((provider(), Action::CompleteWork)),
        Just((client(), Action::ConfirmCompletion)),
        prop::bool::ANY.prop_map(|c| {
            let actor = if c { client() } else { provider() };
            (actor, Action::Dispute { note: None })
        }),
    ]
}

proptest! {
    /// The guard is a pure function: same inputs, same answer.
    #[test]
    fn prop_guard_is_deterministic(
        from in status_strategy(),
        (actor, action) in party_action_strategy(),
    ) {
        let booking = fixture(from);
        let first = guard::evaluate(&booking, &actor, &action);
        let second = guard::evaluate(&booking, &actor, &action);
        prop_assert_eq!(first, second);
    }

    /// Terminal states admit nothing short of an admin override.
    #[test]
    fn prop_terminal_states_are_final(
        from in prop::sample::select(vec![
            BookingStatus::Completed,
            BookingStatus::Cancelled,
            BookingStatus::Disputed,
        ]),
        (actor, action) in party_action_strategy(),
    ) {
        let booking = fixture(from);
        prop_assert!(guard::evaluate(&booking, &actor, &action).is_err());
    }

    /// The guard never fabricates a destination: an approved transition
    /// always lands on the state the reference table names.
    #[test]
    fn prop_approved_destinations_come_from_the_table(
        from in status_strategy(),
        (actor, action) in party_action_strategy(),
    ) {
        let booking = fixture(from);
        if let Ok(dest) = guard::evaluate(&booking, &actor, &action) {
            prop_assert_eq!(Some(dest), reference_table(from, &action, actor.role));
        }
    }

    /// Driving a booking through any sequence of attempted actions yields an
    /// audit chain that replays to the final status. Rejected attempts leave
    /// no entry and do not move the state.
    #[test]
    fn prop_audit_chain_replays_under_random_sequences(
        attempts in prop::collection::vec(party_action_strategy(), 1..25),
    ) {
        let mut booking = fixture(BookingStatus::Pending);
        let mut entries = vec![AuditEntry {
            booking_id: booking.id.clone(),
            from: BookingStatus::Pending,
            to: BookingStatus::Pending,
            changed_by: CLIENT.into(),
            reason: Some("created".into()),
            at: TimeStamp::new(),
        }];

        for (actor, action) in attempts {
            if let Ok(to) = guard::evaluate(&booking, &actor, &action) {
                entries.push(AuditEntry {
                    booking_id: booking.id.clone(),
                    from: booking.status,
                    to,
                    changed_by: actor.id.clone(),
                    reason: None,
                    at: TimeStamp::new(),
                });
                booking.status = to;
            }
        }

        prop_assert_eq!(replay_chain(&entries), Some(booking.status));
    }
}
