use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{Aggregate, AggregateRoot, DomainError, ProductId, Sku};

/// Full ledger contents, keyed by product. Ordered so serialization is stable.
pub type StockLevels = BTreeMap<ProductId, StockRecord>;

/// Aggregate root: per-product stock counter.
///
/// `reserved` never exceeds `quantity`; both are unsigned so neither can go
/// negative. Records read back from storage are re-validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StockRecordData", into = "StockRecordData")]
pub struct StockRecord {
    product_id: ProductId,
    product_name: String,
    quantity: u64,
    reserved: u64,
    min_stock: u64,
    sku: Sku,
    updated_at: DateTime<Utc>,
    version: u64,
}

/// Wire shape of a stock record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StockRecordData {
    product_id: ProductId,
    product_name: String,
    quantity: u64,
    reserved: u64,
    min_stock: u64,
    sku: Sku,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    version: u64,
}

impl TryFrom<StockRecordData> for StockRecord {
    type Error = DomainError;

    fn try_from(data: StockRecordData) -> Result<Self, Self::Error> {
        if data.reserved > data.quantity {
            return Err(DomainError::invariant(format!(
                "{}: reserved ({}) exceeds quantity ({})",
                data.product_id, data.reserved, data.quantity
            )));
        }
        Ok(Self {
            product_id: data.product_id,
            product_name: data.product_name,
            quantity: data.quantity,
            reserved: data.reserved,
            min_stock: data.min_stock,
            sku: data.sku,
            updated_at: data.updated_at,
            version: data.version,
        })
    }
}

impl From<StockRecord> for StockRecordData {
    fn from(r: StockRecord) -> Self {
        Self {
            product_id: r.product_id,
            product_name: r.product_name,
            quantity: r.quantity,
            reserved: r.reserved,
            min_stock: r.min_stock,
            sku: r.sku,
            updated_at: r.updated_at,
            version: r.version,
        }
    }
}

impl StockRecord {
    /// Create a fresh record with nothing reserved.
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: u64,
        min_stock: u64,
        sku: Sku,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            product_id,
            product_name: product_name.into(),
            quantity,
            reserved: 0,
            min_stock,
            sku,
            updated_at: created_at,
            version: 0,
        }
    }

    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn reserved(&self) -> u64 {
        self.reserved
    }

    pub fn min_stock(&self) -> u64 {
        self.min_stock
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Available-to-sell: on-hand minus reserved.
    pub fn available(&self) -> u64 {
        self.quantity - self.reserved
    }

    pub fn can_fulfil(&self, requested: u64) -> bool {
        self.available() >= requested
    }

    /// Low stock by available-to-sell.
    pub fn is_low_stock(&self) -> bool {
        self.available() <= self.min_stock
    }

    /// Low stock by raw on-hand quantity (used by the aggregate report).
    pub fn is_at_or_below_minimum(&self) -> bool {
        self.quantity <= self.min_stock
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.quantity == 0
    }
}

impl AggregateRoot for StockRecord {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.product_id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: set units aside for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserve {
    pub product_id: ProductId,
    pub quantity: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ship previously reserved units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirm {
    pub product_id: ProductId,
    pub quantity: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: release held units back to availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelReservation {
    pub product_id: ProductId,
    pub quantity: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: administrative overwrite of on-hand quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetQuantity {
    pub product_id: ProductId,
    pub quantity: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: relative restock (positive) or shrinkage (negative).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustQuantity {
    pub product_id: ProductId,
    pub delta: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockCommand {
    Reserve(Reserve),
    Confirm(Confirm),
    CancelReservation(CancelReservation),
    SetQuantity(SetQuantity),
    AdjustQuantity(AdjustQuantity),
}

impl StockCommand {
    pub fn product_id(&self) -> &ProductId {
        match self {
            StockCommand::Reserve(c) => &c.product_id,
            StockCommand::Confirm(c) => &c.product_id,
            StockCommand::CancelReservation(c) => &c.product_id,
            StockCommand::SetQuantity(c) => &c.product_id,
            StockCommand::AdjustQuantity(c) => &c.product_id,
        }
    }
}

/// Event: StockReserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReserved {
    pub product_id: ProductId,
    pub quantity: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReservationConfirmed.
///
/// `released` is how much of `reserved` the shipment consumed; it is smaller
/// than `quantity` when more was shipped than had been held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationConfirmed {
    pub product_id: ProductId,
    pub quantity: u64,
    pub released: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReservationCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationCancelled {
    pub product_id: ProductId,
    pub released: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuantitySet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantitySet {
    pub product_id: ProductId,
    pub quantity: u64,
    /// Reservations dropped because the new quantity could not cover them.
    pub released: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuantityAdjusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityAdjusted {
    pub product_id: ProductId,
    pub delta: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockEvent {
    StockReserved(StockReserved),
    ReservationConfirmed(ReservationConfirmed),
    ReservationCancelled(ReservationCancelled),
    QuantitySet(QuantitySet),
    QuantityAdjusted(QuantityAdjusted),
}

impl StockEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            StockEvent::StockReserved(_) => "inventory.stock.reserved",
            StockEvent::ReservationConfirmed(_) => "inventory.stock.reservation_confirmed",
            StockEvent::ReservationCancelled(_) => "inventory.stock.reservation_cancelled",
            StockEvent::QuantitySet(_) => "inventory.stock.quantity_set",
            StockEvent::QuantityAdjusted(_) => "inventory.stock.quantity_adjusted",
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StockEvent::StockReserved(e) => e.occurred_at,
            StockEvent::ReservationConfirmed(e) => e.occurred_at,
            StockEvent::ReservationCancelled(e) => e.occurred_at,
            StockEvent::QuantitySet(e) => e.occurred_at,
            StockEvent::QuantityAdjusted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for StockRecord {
    type Command = StockCommand;
    type Event = StockEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            StockEvent::StockReserved(e) => {
                self.reserved += e.quantity;
            }
            StockEvent::ReservationConfirmed(e) => {
                self.quantity -= e.quantity;
                self.reserved -= e.released;
            }
            StockEvent::ReservationCancelled(e) => {
                self.reserved -= e.released;
            }
            StockEvent::QuantitySet(e) => {
                self.quantity = e.quantity;
                self.reserved -= e.released;
            }
            StockEvent::QuantityAdjusted(e) => {
                if e.delta >= 0 {
                    self.quantity += e.delta.unsigned_abs();
                } else {
                    self.quantity -= e.delta.unsigned_abs();
                }
            }
        }

        self.updated_at = event.occurred_at();
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        self.ensure_product_id(command.product_id())?;
        match command {
            StockCommand::Reserve(cmd) => self.handle_reserve(cmd),
            StockCommand::Confirm(cmd) => self.handle_confirm(cmd),
            StockCommand::CancelReservation(cmd) => self.handle_cancel(cmd),
            StockCommand::SetQuantity(cmd) => self.handle_set_quantity(cmd),
            StockCommand::AdjustQuantity(cmd) => self.handle_adjust(cmd),
        }
    }
}

impl StockRecord {
    fn ensure_product_id(&self, product_id: &ProductId) -> Result<(), DomainError> {
        if &self.product_id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn handle_reserve(&self, cmd: &Reserve) -> Result<Vec<StockEvent>, DomainError> {
        if !self.can_fulfil(cmd.quantity) {
            return Err(DomainError::insufficient(cmd.quantity, self.available()));
        }
        if cmd.quantity == 0 {
            return Ok(vec![]);
        }
        Ok(vec![StockEvent::StockReserved(StockReserved {
            product_id: cmd.product_id.clone(),
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_confirm(&self, cmd: &Confirm) -> Result<Vec<StockEvent>, DomainError> {
        if cmd.quantity > self.quantity {
            return Err(DomainError::insufficient(cmd.quantity, self.quantity));
        }
        if cmd.quantity == 0 {
            return Ok(vec![]);
        }
        Ok(vec![StockEvent::ReservationConfirmed(ReservationConfirmed {
            product_id: cmd.product_id.clone(),
            quantity: cmd.quantity,
            released: cmd.quantity.min(self.reserved),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelReservation) -> Result<Vec<StockEvent>, DomainError> {
        let released = cmd.quantity.min(self.reserved);
        if released == 0 {
            return Ok(vec![]);
        }
        Ok(vec![StockEvent::ReservationCancelled(ReservationCancelled {
            product_id: cmd.product_id.clone(),
            released,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_quantity(&self, cmd: &SetQuantity) -> Result<Vec<StockEvent>, DomainError> {
        if cmd.quantity == self.quantity {
            return Ok(vec![]);
        }
        Ok(vec![StockEvent::QuantitySet(QuantitySet {
            product_id: cmd.product_id.clone(),
            quantity: cmd.quantity,
            released: self.reserved.saturating_sub(cmd.quantity),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_adjust(&self, cmd: &AdjustQuantity) -> Result<Vec<StockEvent>, DomainError> {
        if cmd.delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }

        if cmd.delta > 0 {
            if self.quantity.checked_add(cmd.delta.unsigned_abs()).is_none() {
                return Err(DomainError::validation("quantity overflow"));
            }
        } else {
            let removed = cmd.delta.unsigned_abs();
            if removed > self.available() {
                return Err(DomainError::insufficient(removed, self.available()));
            }
        }

        Ok(vec![StockEvent::QuantityAdjusted(QuantityAdjusted {
            product_id: cmd.product_id.clone(),
            delta: cmd.delta,
            occurred_at: cmd.occurred_at,
        })])
    }
}
