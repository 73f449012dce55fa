//! Pure transition guard: (booking, actor, action) -> destination status.
//!
//! Every valid edge of the lifecycle is declared here once, so the table can
//! be swept exhaustively by the property tests. The guard performs no I/O and
//! never mutates the booking; the service layer applies the result.
use super::booking::{Booking, BookingStatus, TimeStamp};
use super::error::EngineError;
use super::quote::QuoteInput;
use chrono::Utc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Provider,
    Admin,
}

/// Authenticated principal handed in by the auth layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: &str, role: Role) -> Self {
        Self {
            id: id.to_owned(),
            role,
        }
    }
}

/// Closed set of lifecycle actions. Resolved once at the boundary; there is
/// no string-dispatch fallback and no unguarded status write.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Accept,
    /// Covers both the client cancelling and the provider rejecting.
    Cancel {
        note: Option<String>,
    },
    ScheduleVisit {
        visit_date: TimeStamp<Utc>,
    },
    SubmitQuote(QuoteInput),
    ApproveQuote,
    DeclineQuote,
    StartWork,
    CompleteWork,
    ConfirmCompletion,
    Dispute {
        note: Option<String>,
    },
    /// Administrative escape hatch for states without a dedicated action.
    /// Requires the ADMIN role and records its own audit reason.
    AdminOverride {
        target: BookingStatus,
        reason: String,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Accept => "accept",
            Action::Cancel { .. } => "cancel",
            Action::ScheduleVisit { .. } => "schedule_visit",
            Action::SubmitQuote(_) => "submit_quote",
            Action::ApproveQuote => "approve_quote",
            Action::DeclineQuote => "decline_quote",
            Action::StartWork => "start_work",
            Action::CompleteWork => "complete_work",
            Action::ConfirmCompletion => "confirm_completion",
            Action::Dispute { .. } => "dispute",
            Action::AdminOverride { .. } => "admin_override",
        }
    }
}

/// Why the guard said no. Authorization failures and invalid-source failures
/// surface as different error variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NotAParty,
    WrongRole { required: Role },
    InvalidSource { from: BookingStatus },
}

impl Rejection {
    pub fn into_error(self, action: &'static str) -> EngineError {
        match self {
            Rejection::NotAParty => {
                EngineError::Forbidden("actor is not a party to this booking".into())
            }
            Rejection::WrongRole { required } => {
                EngineError::Forbidden(format!("action '{action}' requires the {required:?} role"))
            }
            Rejection::InvalidSource { from } => EngineError::InvalidTransition { from, action },
        }
    }
}

// The actor's side of the booking, established by id and claimed role
// together. A matching id with a mismatched role is treated as a stranger.
fn party_of(booking: &Booking, actor: &Actor) -> Option<Role> {
    match actor.role {
        Role::Provider if actor.id == booking.provider_id => Some(Role::Provider),
        Role::Client if actor.id == booking.client_id => Some(Role::Client),
        _ => None,
    }
}

/// Evaluate one requested transition against the edge table. Returns the
/// destination status on approval.
pub fn evaluate(booking: &Booking, actor: &Actor, action: &Action) -> Result<BookingStatus, Rejection> {
    use BookingStatus::*;

    let from = booking.status;

    // Party resolution is deferred into the arms: the admin override is the
    // only action that skips it, and the only one an admin may take.
    let party = || party_of(booking, actor).ok_or(Rejection::NotAParty);
    let require = |role: Role| -> Result<(), Rejection> {
        if party()? == role {
            Ok(())
        } else {
            Err(Rejection::WrongRole { required: role })
        }
    };
    let non_terminal = || -> Result<(), Rejection> {
        if from.is_terminal() {
            Err(Rejection::InvalidSource { from })
        } else {
            Ok(())
        }
    };

    match action {
        Action::Accept => {
            require(Role::Provider)?;
            match from {
                Pending => Ok(Accepted),
                _ => Err(Rejection::InvalidSource { from }),
            }
        }
        Action::Cancel { .. } => {
            party()?;
            non_terminal()?;
            Ok(Cancelled)
        }
        Action::ScheduleVisit { .. } => {
            require(Role::Provider)?;
            match from {
                Accepted | QuotePending => Ok(VisitScheduled),
                _ => Err(Rejection::InvalidSource { from }),
            }
        }
        Action::SubmitQuote(_) => {
            require(Role::Provider)?;
            non_terminal()?;
            Ok(QuoteSent)
        }
        Action::ApproveQuote => {
            require(Role::Client)?;
            match from {
                QuoteSent => Ok(QuoteApproved),
                _ => Err(Rejection::InvalidSource { from }),
            }
        }
        Action::DeclineQuote => {
            require(Role::Client)?;
            match from {
                QuoteSent => Ok(QuoteDeclined),
                _ => Err(Rejection::InvalidSource { from }),
            }
        }
        Action::StartWork => {
            require(Role::Provider)?;
            match from {
                QuoteApproved => Ok(InProgress),
                _ => Err(Rejection::InvalidSource { from }),
            }
        }
        Action::CompleteWork => {
            require(Role::Provider)?;
            non_terminal()?;
            Ok(WorkCompleted)
        }
        Action::ConfirmCompletion => {
            require(Role::Client)?;
            match from {
                WorkCompleted => Ok(Completed),
                _ => Err(Rejection::InvalidSource { from }),
            }
        }
        Action::Dispute { .. } => {
            party()?;
            match from {
                InProgress | WorkCompleted => Ok(Disputed),
                _ => Err(Rejection::InvalidSource { from }),
            }
        }
        Action::AdminOverride { target, .. } => match actor.role {
            Role::Admin => Ok(*target),
            _ => Err(Rejection::WrongRole {
                required: Role::Admin,
            }),
        },
    }
}
