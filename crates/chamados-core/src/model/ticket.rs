use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::money;
use super::party::Client;
use super::status::TicketStatus;
use super::{ClientId, LineItemId, TechnicianId, TicketId};
use crate::error::{EngineError, Result};

pub const MIN_DESCRIPTION_LEN: usize = 5;
pub const MIN_DEVICE_LEN: usize = 2;
pub const MAX_DEVICE_LEN: usize = 100;
pub const MIN_ITEM_DESCRIPTION_LEN: usize = 2;

/// A service request tracked from open to a terminal status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub client_id: ClientId,
    pub technician_id: Option<TechnicianId>,
    pub description: String,
    pub device: String,
    pub status: TicketStatus,
    /// Sum of `quantity × unit_price` over the current line items. Written
    /// only by the valuation path.
    pub value: Decimal,
    pub note: Option<String>,
    pub opened_at: DateTime<Utc>,
    pub expected_on: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Ticket fields whose changes are recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketField {
    TechnicianId,
    Description,
    Device,
    Status,
    Note,
    ExpectedOn,
    CompletedAt,
    Value,
}

impl TicketField {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TechnicianId => "technician_id",
            Self::Description => "description",
            Self::Device => "device",
            Self::Status => "status",
            Self::Note => "note",
            Self::ExpectedOn => "expected_on",
            Self::CompletedAt => "completed_at",
            Self::Value => "value",
        }
    }
}

impl fmt::Display for TicketField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Ticket {
    /// The audit-trail rendering of one field (`None` for SQL NULL).
    #[must_use]
    pub fn field_text(&self, field: TicketField) -> Option<String> {
        match field {
            TicketField::TechnicianId => self.technician_id.map(|id| id.to_string()),
            TicketField::Description => Some(self.description.clone()),
            TicketField::Device => Some(self.device.clone()),
            TicketField::Status => Some(self.status.to_string()),
            TicketField::Note => self.note.clone(),
            TicketField::ExpectedOn => self.expected_on.map(|d| d.format("%Y-%m-%d").to_string()),
            TicketField::CompletedAt => self
                .completed_at
                .map(|at| at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            TicketField::Value => Some(money::display(self.value)),
        }
    }

    /// Whether `self` and `other` hold the same typed value for `field`.
    #[must_use]
    pub fn same_field(&self, other: &Self, field: TicketField) -> bool {
        match field {
            TicketField::TechnicianId => self.technician_id == other.technician_id,
            TicketField::Description => self.description == other.description,
            TicketField::Device => self.device == other.device,
            TicketField::Status => self.status == other.status,
            TicketField::Note => self.note == other.note,
            TicketField::ExpectedOn => self.expected_on == other.expected_on,
            TicketField::CompletedAt => self.completed_at == other.completed_at,
            TicketField::Value => self.value == other.value,
        }
    }
}

/// Timestamps are kept to the microsecond at rest.
fn store_precision(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(6)
}

/// Input for opening a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewTicket {
    pub client_id: ClientId,
    pub technician_id: Option<TechnicianId>,
    pub description: String,
    pub device: String,
    pub status: TicketStatus,
    pub note: Option<String>,
    pub expected_on: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl NewTicket {
    /// # Errors
    ///
    /// Returns [`EngineError::Invalid`] for a short description or device.
    pub fn validate(&self) -> Result<()> {
        validate_description(&self.description)?;
        validate_device(&self.device)
    }
}

/// A partial ticket update. Absent fields are left alone; for nullable
/// fields `Some(None)` clears the value.
///
/// `value` is not patchable; only line item mutations move it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TicketPatch {
    pub technician_id: Option<Option<TechnicianId>>,
    pub description: Option<String>,
    pub device: Option<String>,
    pub status: Option<TicketStatus>,
    pub note: Option<Option<String>>,
    pub expected_on: Option<Option<NaiveDate>>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
}

impl TicketPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Fields present in the payload, in canonical order.
    #[must_use]
    pub fn fields(&self) -> Vec<TicketField> {
        let mut fields = Vec::new();
        if self.technician_id.is_some() {
            fields.push(TicketField::TechnicianId);
        }
        if self.description.is_some() {
            fields.push(TicketField::Description);
        }
        if self.device.is_some() {
            fields.push(TicketField::Device);
        }
        if self.status.is_some() {
            fields.push(TicketField::Status);
        }
        if self.note.is_some() {
            fields.push(TicketField::Note);
        }
        if self.expected_on.is_some() {
            fields.push(TicketField::ExpectedOn);
        }
        if self.completed_at.is_some() {
            fields.push(TicketField::CompletedAt);
        }
        fields
    }

    /// # Errors
    ///
    /// Returns [`EngineError::Invalid`] for a short description or device.
    pub fn validate(&self) -> Result<()> {
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        if let Some(device) = &self.device {
            validate_device(device)?;
        }
        Ok(())
    }

    /// Produce the post-update ticket without touching storage.
    #[must_use]
    pub fn apply_to(&self, ticket: &Ticket) -> Ticket {
        let mut next = ticket.clone();
        if let Some(technician_id) = self.technician_id {
            next.technician_id = technician_id;
        }
        if let Some(description) = &self.description {
            next.description.clone_from(description);
        }
        if let Some(device) = &self.device {
            next.device.clone_from(device);
        }
        if let Some(status) = &self.status {
            next.status = status.clone();
        }
        if let Some(note) = &self.note {
            next.note.clone_from(note);
        }
        if let Some(expected_on) = self.expected_on {
            next.expected_on = expected_on;
        }
        if let Some(completed_at) = self.completed_at {
            next.completed_at = completed_at.map(store_precision);
        }
        next
    }
}

/// A billable component of a ticket (parts or labour).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub ticket_id: TicketId,
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl LineItem {
    #[must_use]
    pub fn total(&self) -> Decimal {
        money::line_total(self.quantity, self.unit_price)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLineItem {
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl NewLineItem {
    /// # Errors
    ///
    /// Returns [`EngineError::Invalid`] for a short description, a zero
    /// quantity or a negative price.
    pub fn validate(&self) -> Result<()> {
        validate_item_description(&self.description)?;
        validate_quantity(self.quantity)?;
        validate_unit_price(self.unit_price)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineItemPatch {
    pub description: Option<String>,
    pub quantity: Option<u32>,
    pub unit_price: Option<Decimal>,
}

impl LineItemPatch {
    /// # Errors
    ///
    /// Same rules as [`NewLineItem::validate`], applied to present fields.
    pub fn validate(&self) -> Result<()> {
        if let Some(description) = &self.description {
            validate_item_description(description)?;
        }
        if let Some(quantity) = self.quantity {
            validate_quantity(quantity)?;
        }
        if let Some(unit_price) = self.unit_price {
            validate_unit_price(unit_price)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn apply_to(&self, item: &LineItem) -> LineItem {
        let mut next = item.clone();
        if let Some(description) = &self.description {
            next.description.clone_from(description);
        }
        if let Some(quantity) = self.quantity {
            next.quantity = quantity;
        }
        if let Some(unit_price) = self.unit_price {
            next.unit_price = money::normalize(unit_price);
        }
        next
    }
}

/// A ticket together with its owning client and current line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketDetail {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub client: Client,
    pub items: Vec<LineItem>,
}

fn validate_description(description: &str) -> Result<()> {
    if description.trim().chars().count() < MIN_DESCRIPTION_LEN {
        return Err(EngineError::invalid(
            "description",
            format!("must be at least {MIN_DESCRIPTION_LEN} characters"),
        ));
    }
    Ok(())
}

fn validate_device(device: &str) -> Result<()> {
    let len = device.trim().chars().count();
    if !(MIN_DEVICE_LEN..=MAX_DEVICE_LEN).contains(&len) {
        return Err(EngineError::invalid(
            "device",
            format!("must be {MIN_DEVICE_LEN}-{MAX_DEVICE_LEN} characters"),
        ));
    }
    Ok(())
}

fn validate_item_description(description: &str) -> Result<()> {
    if description.trim().chars().count() < MIN_ITEM_DESCRIPTION_LEN {
        return Err(EngineError::invalid(
            "description",
            format!("must be at least {MIN_ITEM_DESCRIPTION_LEN} characters"),
        ));
    }
    Ok(())
}

fn validate_quantity(quantity: u32) -> Result<()> {
    if quantity == 0 {
        return Err(EngineError::invalid("quantity", "must be at least 1"));
    }
    Ok(())
}

fn validate_unit_price(unit_price: Decimal) -> Result<()> {
    if unit_price.is_sign_negative() && !unit_price.is_zero() {
        return Err(EngineError::invalid("unit_price", "must not be negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ticket() -> Ticket {
        Ticket {
            id: 1,
            client_id: 1,
            technician_id: Some(7),
            description: "Fridge not cooling".into(),
            device: "Brastemp fridge".into(),
            status: TicketStatus::open(),
            value: Decimal::ZERO,
            note: None,
            opened_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).single().expect("valid"),
            expected_on: None,
            completed_at: None,
        }
    }

    #[test]
    fn empty_patch_has_no_fields() {
        assert!(TicketPatch::default().is_empty());
    }

    #[test]
    fn patch_clears_nullable_fields() {
        let patch = TicketPatch {
            technician_id: Some(None),
            ..TicketPatch::default()
        };
        let next = patch.apply_to(&ticket());
        assert_eq!(next.technician_id, None);
        assert_eq!(patch.fields(), vec![TicketField::TechnicianId]);
    }

    #[test]
    fn field_text_formats_dates_and_money() {
        let mut t = ticket();
        t.expected_on = NaiveDate::from_ymd_opt(2024, 3, 15);
        t.completed_at = Utc.with_ymd_and_hms(2024, 3, 14, 17, 30, 0).single();
        assert_eq!(t.field_text(TicketField::ExpectedOn).as_deref(), Some("2024-03-15"));
        assert_eq!(
            t.field_text(TicketField::CompletedAt).as_deref(),
            Some("2024-03-14T17:30:00Z")
        );
        assert_eq!(t.field_text(TicketField::Value).as_deref(), Some("0.00"));
        assert_eq!(t.field_text(TicketField::Note), None);
    }

    #[test]
    fn line_item_validation() {
        let mut item = NewLineItem {
            description: "Water inlet hose".into(),
            quantity: 0,
            unit_price: Decimal::new(4500, 2),
        };
        assert!(item.validate().is_err());
        item.quantity = 1;
        assert!(item.validate().is_ok());
        item.unit_price = Decimal::new(-1, 2);
        assert!(item.validate().is_err());
    }

    #[test]
    fn new_ticket_requires_description_and_device() {
        let mut new = NewTicket {
            client_id: 1,
            description: "Noise".into(),
            device: "W".into(),
            ..NewTicket::default()
        };
        assert!(new.validate().is_err());
        new.device = "Washer".into();
        assert!(new.validate().is_ok());
        assert_eq!(new.status, TicketStatus::open());
    }
}
