//! Service layer API for booking lifecycle operations.
//!
//! `BookingService` owns the three sled trees (bookings, audit, quotes) and
//! is the only mutation path for a booking. Every accepted transition writes
//! the updated aggregate and its audit entry in one storage transaction, with
//! the version stamp re-checked inside the transaction so a concurrent writer
//! surfaces as a retryable `Conflict` instead of a silent overwrite.
use super::audit::{AuditEntry, QuoteRecord, record_key};
use super::booking::{Booking, BookingDraft, BookingStatus, TimeStamp};
use super::error::EngineError;
use super::guard::{self, Action, Actor};
use super::quote::{self, QuoteInput};
use super::utils;
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
};
use sled::{Db, Transactional, Tree};
use std::sync::Arc;
use tracing::{info, warn};

const BOOKINGS_TREE: &str = "bookings";
const AUDIT_TREE: &str = "audit";
const QUOTES_TREE: &str = "quotes";
const BOOKING_HRP: &str = "bkg";

pub struct BookingService {
    pub(crate) bookings: Tree,
    pub(crate) audit: Tree,
    pub(crate) quotes: Tree,
}

impl BookingService {
    pub fn open(db: Arc<Db>) -> Result<Self, EngineError> {
        Ok(Self {
            bookings: db.open_tree(BOOKINGS_TREE)?,
            audit: db.open_tree(AUDIT_TREE)?,
            quotes: db.open_tree(QUOTES_TREE)?,
        })
    }

    pub(crate) fn load(&self, booking_id: &str) -> Result<Booking, EngineError> {
        let bytes = self
            .bookings
            .get(booking_id.as_bytes())?
            .ok_or(EngineError::NotFound)?;
        Ok(minicbor::decode(&bytes)?)
    }

    /// Open a new PENDING booking between a client and a chosen provider.
    ///
    /// The audit chain starts with a creation entry whose `from` equals `to`,
    /// so replaying the chain needs no special case for the initial state.
    pub fn create(&self, draft: BookingDraft) -> Result<Booking, EngineError> {
        let id = utils::new_uuid_to_bech32(BOOKING_HRP)
            .map_err(|e| EngineError::Codec(e.to_string()))?;
        let mut booking = draft.into_booking(id)?;

        let seq = booking.audit_seq;
        booking.audit_seq += 1;
        let entry = AuditEntry {
            booking_id: booking.id.clone(),
            from: BookingStatus::Pending,
            to: BookingStatus::Pending,
            changed_by: booking.client_id.clone(),
            reason: Some("created".into()),
            at: TimeStamp::new(),
        };

        let booking_bytes = encode(&booking)?;
        let entry_bytes = encode(&entry)?;
        let audit_key = record_key(&booking.id, seq);

        (&self.bookings, &self.audit)
            .transaction(
                |(bookings, audit)| -> ConflictableTransactionResult<(), EngineError> {
                    bookings.insert(booking.id.as_bytes(), booking_bytes.clone())?;
                    audit.insert(audit_key.clone(), entry_bytes.clone())?;
                    Ok(())
                },
            )
            .map_err(flatten_tx)?;

        info!(booking = %booking.id, client = %booking.client_id, provider = %booking.provider_id, "booking created");
        Ok(booking)
    }

    /// Apply one guarded transition and return the updated booking.
    ///
    /// Load, resolve the actor, consult the guard, compute derived fields,
    /// then commit booking + audit entry (+ quote record) atomically. After
    /// the guard approves, only data validation or storage can still fail,
    /// and any failure rolls the whole operation back.
    pub fn apply_transition(
        &self,
        booking_id: &str,
        actor: &Actor,
        action: Action,
    ) -> Result<Booking, EngineError> {
        let booking = self.load(booking_id)?;
        let from = booking.status;

        let to = guard::evaluate(&booking, actor, &action).map_err(|rejection| {
            warn!(booking = %booking_id, action = action.name(), actor = %actor.id, ?rejection, "transition rejected");
            rejection.into_error(action.name())
        })?;

        let now = TimeStamp::new();
        let expected_version = booking.version;
        let mut updated = booking;
        let mut reason: Option<String> = None;
        let mut quote_record: Option<(u64, QuoteRecord)> = None;

        match &action {
            Action::Accept | Action::DeclineQuote | Action::StartWork | Action::CompleteWork => {}
            Action::ApproveQuote => {
                updated.quote_approved_at = Some(now.clone());
            }
            Action::Cancel { note } => {
                reason = Some(with_note(ended_by(&updated, actor), note));
            }
            Action::ScheduleVisit { visit_date } => {
                updated.visit_date = Some(visit_date.clone());
            }
            Action::SubmitQuote(input) => {
                quote::validate_quote(input)?;
                let seq = updated.quote_seq;
                updated.quote_seq += 1;
                quote_record = Some((seq, quote_record_from(&updated.id, input, actor, &now)));
                apply_quote(&mut updated, input, &now);
            }
            Action::Dispute { note } => {
                reason = Some(with_note(disputed_by(&updated, actor), note));
            }
            Action::ConfirmCompletion => {
                let settlement = quote::settle(updated.quoted_price, &now)?;
                updated.platform_fee = Some(settlement.platform_fee);
                updated.provider_earnings = Some(settlement.provider_earnings);
                updated.commission_due_date = Some(settlement.commission_due);
                updated.completed_date = Some(now.clone());
            }
            Action::AdminOverride {
                reason: override_reason,
                ..
            } => {
                reason = Some(format!("admin_override: {override_reason}"));
            }
        }

        updated.status = to;
        updated.version = expected_version + 1;
        let audit_seq = updated.audit_seq;
        updated.audit_seq += 1;

        let entry = AuditEntry {
            booking_id: updated.id.clone(),
            from,
            to,
            changed_by: actor.id.clone(),
            reason,
            at: now,
        };

        let booking_bytes = encode(&updated)?;
        let entry_bytes = encode(&entry)?;
        let audit_key = record_key(&updated.id, audit_seq);
        let quote_kv = match &quote_record {
            Some((seq, record)) => Some((record_key(&updated.id, *seq), encode(record)?)),
            None => None,
        };

        (&self.bookings, &self.audit, &self.quotes)
            .transaction(
                |(bookings, audit, quotes)| -> ConflictableTransactionResult<(), EngineError> {
                    let current = bookings
                        .get(updated.id.as_bytes())?
                        .ok_or(ConflictableTransactionError::Abort(EngineError::NotFound))?;
                    let current: Booking = minicbor::decode(&current).map_err(|e| {
                        ConflictableTransactionError::Abort(EngineError::Codec(e.to_string()))
                    })?;
                    if current.version != expected_version {
                        return Err(ConflictableTransactionError::Abort(EngineError::Conflict));
                    }

                    bookings.insert(updated.id.as_bytes(), booking_bytes.clone())?;
                    audit.insert(audit_key.clone(), entry_bytes.clone())?;
                    if let Some((key, value)) = &quote_kv {
                        quotes.insert(key.clone(), value.clone())?;
                    }
                    Ok(())
                },
            )
            .map_err(flatten_tx)?;

        info!(booking = %updated.id, action = action.name(), actor = %actor.id, ?from, ?to, "transition applied");
        Ok(updated)
    }
}

// Copy the submitted quote onto the aggregate's latest-quote fields. A fresh
// quote always resets any earlier approval.
fn apply_quote(booking: &mut Booking, input: &QuoteInput, now: &TimeStamp<chrono::Utc>) {
    booking.quoted_price = Some(input.price);
    booking.labor_cost = input.labor;
    booking.material_cost = input.material;
    booking.estimated_days = input.estimated_days;
    booking.quote_notes = input.notes.clone();
    booking.quote_submitted_at = Some(now.clone());
    booking.quote_approved_at = None;
}

fn quote_record_from(
    booking_id: &str,
    input: &QuoteInput,
    actor: &Actor,
    now: &TimeStamp<chrono::Utc>,
) -> QuoteRecord {
    QuoteRecord {
        booking_id: booking_id.to_owned(),
        quoted_price: input.price,
        labor_cost: input.labor,
        material_cost: input.material,
        estimated_days: input.estimated_days,
        notes: input.notes.clone(),
        submitted_by: actor.id.clone(),
        at: now.clone(),
    }
}

// The guard only lets one of the booking's own parties cancel or dispute,
// so the actor's side is read straight off the aggregate. Admins route
// through AdminOverride and never reach these.
fn ended_by(booking: &Booking, actor: &Actor) -> &'static str {
    if actor.id == booking.provider_id {
        "rejected by provider"
    } else {
        "cancelled by client"
    }
}

fn disputed_by(booking: &Booking, actor: &Actor) -> &'static str {
    if actor.id == booking.provider_id {
        "disputed by provider"
    } else {
        "disputed by client"
    }
}

fn with_note(base: &str, note: &Option<String>) -> String {
    match note {
        Some(note) => format!("{base}: {note}"),
        None => base.to_owned(),
    }
}

fn encode<T: minicbor::Encode<()>>(value: &T) -> Result<Vec<u8>, EngineError> {
    minicbor::to_vec(value).map_err(|e| EngineError::Codec(e.to_string()))
}

fn flatten_tx(err: TransactionError<EngineError>) -> EngineError {
    match err {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => EngineError::Storage(e),
    }
}
