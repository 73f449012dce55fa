//! Read-side projections over the same trees the service writes. Nothing
//! here mutates; external UI consumes these directly.
use super::audit::{AuditEntry, QuoteRecord, record_prefix};
use super::booking::{Booking, BookingStatus};
use super::error::EngineError;
use super::guard::Role;
use super::service::BookingService;

impl BookingService {
    pub fn get_booking(&self, booking_id: &str) -> Result<Booking, EngineError> {
        self.load(booking_id)
    }

    /// Bookings where the given party sits on the side its role names. An
    /// admin sees the booking if the id matches either side.
    pub fn list_for_party(
        &self,
        party_id: &str,
        role: Role,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>, EngineError> {
        let mut out = Vec::new();
        for item in self.bookings.iter() {
            let (_, bytes) = item?;
            let booking: Booking = minicbor::decode(&bytes)?;
            let is_party = match role {
                Role::Client => booking.client_id == party_id,
                Role::Provider => booking.provider_id == party_id,
                Role::Admin => booking.client_id == party_id || booking.provider_id == party_id,
            };
            if is_party && status.is_none_or(|s| booking.status == s) {
                out.push(booking);
            }
        }
        Ok(out)
    }

    /// Full transition history for one booking, in insertion order.
    pub fn audit_trail(&self, booking_id: &str) -> Result<Vec<AuditEntry>, EngineError> {
        let mut entries = Vec::new();
        for item in self.audit.scan_prefix(record_prefix(booking_id)) {
            let (_, bytes) = item?;
            entries.push(minicbor::decode(&bytes)?);
        }
        Ok(entries)
    }

    /// Every quote ever submitted for one booking, oldest first. The booking
    /// itself only carries the latest.
    pub fn quote_history(&self, booking_id: &str) -> Result<Vec<QuoteRecord>, EngineError> {
        let mut records = Vec::new();
        for item in self.quotes.scan_prefix(record_prefix(booking_id)) {
            let (_, bytes) = item?;
            records.push(minicbor::decode(&bytes)?);
        }
        Ok(records)
    }
}
