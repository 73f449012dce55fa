//! Core booking aggregate, lifecycle states and the creation draft
use super::error::EngineError;
use chrono::{DateTime, TimeZone, Utc};

/// Every state a booking can occupy over its life. Terminal states admit no
/// further guarded action.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Accepted,
    #[n(2)]
    VisitScheduled,
    #[n(3)]
    QuotePending,
    #[n(4)]
    QuoteSent,
    #[n(5)]
    QuoteApproved,
    #[n(6)]
    QuoteDeclined,
    #[n(7)]
    InProgress,
    #[n(8)]
    WorkCompleted,
    #[n(9)]
    Completed,
    #[n(10)]
    Cancelled,
    #[n(11)]
    Disputed,
}

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::Disputed
        )
    }
    pub const ALL: [BookingStatus; 12] = [
        BookingStatus::Pending,
        BookingStatus::Accepted,
        BookingStatus::VisitScheduled,
        BookingStatus::QuotePending,
        BookingStatus::QuoteSent,
        BookingStatus::QuoteApproved,
        BookingStatus::QuoteDeclined,
        BookingStatus::InProgress,
        BookingStatus::WorkCompleted,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
        BookingStatus::Disputed,
    ];
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    #[n(0)]
    Low,
    #[n(1)]
    Normal,
    #[n(2)]
    High,
    #[n(3)]
    Emergency,
}

/// Money in minor units (cents). Use integers for currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: u64) -> Self {
        Self(cents)
    }
    pub fn cents(&self) -> u64 {
        self.0
    }
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
    pub fn saturating_add(self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }
}

impl<C> minicbor::Encode<C> for Money {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.u64(self.0)?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for Money {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        Ok(Money(d.u64()?))
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .unwrap()
            .into()
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
    pub fn plus_days(&self, days: i64) -> Self {
        Self(self.0 + chrono::Duration::days(days))
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// The aggregate root. Mutated only through the service layer; `version` is
/// the optimistic-lock stamp checked on every write.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct Booking {
    #[n(0)]
    pub id: String, // bech32-encoded uuid7
    #[n(1)]
    pub client_id: String,
    #[n(2)]
    pub provider_id: String,
    #[n(3)]
    pub title: String,
    #[n(4)]
    pub description: String,
    #[n(5)]
    pub location: String,
    #[n(6)]
    pub urgency: Urgency,
    #[n(7)]
    pub client_notes: Option<String>,
    #[n(8)]
    pub status: BookingStatus,
    #[n(9)]
    pub visit_date: Option<TimeStamp<Utc>>,
    // Latest-quote fields. History lives in the quotes tree.
    #[n(10)]
    pub quoted_price: Option<Money>,
    #[n(11)]
    pub labor_cost: Option<Money>,
    #[n(12)]
    pub material_cost: Option<Money>,
    #[n(13)]
    pub estimated_days: Option<u32>,
    #[n(14)]
    pub quote_notes: Option<String>,
    #[n(15)]
    pub quote_submitted_at: Option<TimeStamp<Utc>>,
    #[n(16)]
    pub quote_approved_at: Option<TimeStamp<Utc>>,
    // Settlement fields, written once on completion.
    #[n(17)]
    pub platform_fee: Option<Money>,
    #[n(18)]
    pub provider_earnings: Option<Money>,
    #[n(19)]
    pub commission_due_date: Option<TimeStamp<Utc>>,
    #[n(20)]
    pub completed_date: Option<TimeStamp<Utc>>,
    #[n(21)]
    pub version: u64,
    #[n(22)]
    pub audit_seq: u64,
    #[n(23)]
    pub quote_seq: u64,
}

/// Used for constructing a new booking before it is persisted
#[derive(Default)]
pub struct BookingDraft {
    client_id: Option<String>,
    provider_id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    location: Option<String>,
    urgency: Option<Urgency>,
    client_notes: Option<String>,
    visit_date: Option<TimeStamp<Utc>>,
}

impl BookingDraft {
    /// Construct a new builder object, this becomes the basis for a booking
    pub fn new() -> Self {
        Self::default()
    }
    pub fn client(mut self, id: &str) -> Self {
        self.client_id = Some(id.to_owned());
        self
    }
    pub fn provider(mut self, id: &str) -> Self {
        self.provider_id = Some(id.to_owned());
        self
    }
    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_owned());
        self
    }
    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_owned());
        self
    }
    pub fn location(mut self, location: &str) -> Self {
        self.location = Some(location.to_owned());
        self
    }
    pub fn urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = Some(urgency);
        self
    }
    pub fn client_notes(mut self, notes: &str) -> Self {
        self.client_notes = Some(notes.to_owned());
        self
    }
    pub fn visit_date(mut self, date: TimeStamp<Utc>) -> Self {
        self.visit_date = Some(date);
        self
    }

    /// Checks fields, then seeds the aggregate at PENDING with all counters
    /// zeroed. The service assigns the id and writes the first audit entry.
    pub fn into_booking(self, id: String) -> Result<Booking, EngineError> {
        let client_id = self
            .client_id
            .ok_or_else(|| EngineError::InvalidDraft("client is not set".into()))?;
        let provider_id = self
            .provider_id
            .ok_or_else(|| EngineError::InvalidDraft("provider is not set".into()))?;
        if client_id == provider_id {
            return Err(EngineError::InvalidDraft(
                "client and provider must be different parties".into(),
            ));
        }
        let title = self
            .title
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| EngineError::InvalidDraft("title is not set".into()))?;

        Ok(Booking {
            id,
            client_id,
            provider_id,
            title,
            description: self.description.unwrap_or_default(),
            location: self.location.unwrap_or_default(),
            urgency: self.urgency.unwrap_or(Urgency::Normal),
            client_notes: self.client_notes,
            status: BookingStatus::Pending,
            visit_date: self.visit_date,
            quoted_price: None,
            labor_cost: None,
            material_cost: None,
            estimated_days: None,
            quote_notes: None,
            quote_submitted_at: None,
            quote_approved_at: None,
            platform_fee: None,
            provider_earnings: None,
            commission_due_date: None,
            completed_date: None,
            version: 0,
            audit_seq: 0,
            quote_seq: 0,
        })
    }
}
