use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Location;

/// Item numbers are assigned once at pool initialization and never change.
pub type ItemNumber = u32;

/// Lifecycle state of a single loanable item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Available,
    Borrowed,
}

/// One loanable item in the pool.
///
/// Invariant: the borrow fields (`borrower`, `borrower_contact`,
/// `borrow_location`, `borrowed_at`) are all set exactly when the status is
/// [`ItemStatus::Borrowed`], and all absent when it is
/// [`ItemStatus::Available`]. Returning an item physically clears them; the
/// most recent return is remembered in `return_location` / `returned_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub item_number: ItemNumber,
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borrower: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borrower_contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borrow_location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borrowed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// A fresh, never-borrowed item, as created by pool initialization.
    pub fn available(number: ItemNumber, now: DateTime<Utc>) -> Self {
        Self {
            item_number: number,
            status: ItemStatus::Available,
            borrower: None,
            borrower_contact: None,
            borrow_location: None,
            borrowed_at: None,
            return_location: None,
            returned_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == ItemStatus::Available
    }

    pub fn is_borrowed(&self) -> bool {
        self.status == ItemStatus::Borrowed
    }

    /// Whether the record satisfies the status/borrow-field invariant.
    pub fn is_consistent(&self) -> bool {
        let borrow_fields_set = self.borrower.is_some()
            && self.borrower_contact.is_some()
            && self.borrow_location.is_some()
            && self.borrowed_at.is_some();
        let borrow_fields_clear = self.borrower.is_none()
            && self.borrower_contact.is_none()
            && self.borrow_location.is_none()
            && self.borrowed_at.is_none();
        match self.status {
            ItemStatus::Available => borrow_fields_clear,
            ItemStatus::Borrowed => borrow_fields_set,
        }
    }
}

/// Three-way field update used by [`ItemPatch`].
///
/// Distinguishes "leave the stored value alone" from "remove the stored
/// value" so that a return actually erases borrower data instead of leaving
/// it stale.
#[derive(Debug, Clone)]
pub enum Patch<T> {
    Keep,
    Clear,
    Set(T),
}

// Manual impl: the derive would demand `T: Default`, which timestamps and
// locations do not provide.
impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Keep
    }
}

impl<T: Clone> Patch<T> {
    fn apply(&self, slot: &mut Option<T>) {
        match self {
            Patch::Keep => {}
            Patch::Clear => *slot = None,
            Patch::Set(value) => *slot = Some(value.clone()),
        }
    }
}

/// Partial update merged onto an existing item record.
///
/// Backends apply the patch to the current record and write the full merged
/// record back as one operation, stamping `updated_at` in the process.
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub status: Option<ItemStatus>,
    pub borrower: Patch<String>,
    pub borrower_contact: Patch<String>,
    pub borrow_location: Patch<Location>,
    pub borrowed_at: Patch<DateTime<Utc>>,
    pub return_location: Patch<Location>,
    pub returned_at: Patch<DateTime<Utc>>,
}

impl ItemPatch {
    /// The available → borrowed transition. Sets every borrow field and
    /// erases the previous return record.
    pub fn borrowed(
        borrower: String,
        contact: String,
        location: Location,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            status: Some(ItemStatus::Borrowed),
            borrower: Patch::Set(borrower),
            borrower_contact: Patch::Set(contact),
            borrow_location: Patch::Set(location),
            borrowed_at: Patch::Set(at),
            return_location: Patch::Clear,
            returned_at: Patch::Clear,
        }
    }

    /// The borrowed → available transition. Clears every borrow field and
    /// records where and when the item came back.
    pub fn returned(location: Location, at: DateTime<Utc>) -> Self {
        Self {
            status: Some(ItemStatus::Available),
            borrower: Patch::Clear,
            borrower_contact: Patch::Clear,
            borrow_location: Patch::Clear,
            borrowed_at: Patch::Clear,
            return_location: Patch::Set(location),
            returned_at: Patch::Set(at),
        }
    }

    /// Merge this patch onto `item`. Does not stamp `updated_at`; the store
    /// does that when it persists the merged record.
    pub fn apply(&self, item: &mut Item) {
        if let Some(status) = self.status {
            item.status = status;
        }
        self.borrower.apply(&mut item.borrower);
        self.borrower_contact.apply(&mut item.borrower_contact);
        self.borrow_location.apply(&mut item.borrow_location);
        self.borrowed_at.apply(&mut item.borrowed_at);
        self.return_location.apply(&mut item.return_location);
        self.returned_at.apply(&mut item.returned_at);
    }
}

/// Aggregated availability numbers for the whole pool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    pub available: usize,
    pub borrowed: usize,
    pub total: usize,
    /// Share of the pool currently out, in percent (0.0 for an empty pool).
    pub utilization: f64,
}

impl PoolStats {
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a Item>) -> Self {
        let mut available = 0;
        let mut borrowed = 0;
        for item in items {
            match item.status {
                ItemStatus::Available => available += 1,
                ItemStatus::Borrowed => borrowed += 1,
            }
        }
        let total = available + borrowed;
        let utilization = if total > 0 {
            borrowed as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        Self {
            available,
            borrowed,
            total,
            utilization,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2024-05-01T09:30:00Z".parse().unwrap()
    }

    #[test]
    fn fresh_item_is_available_and_consistent() {
        let item = Item::available(7, now());
        assert!(item.is_available());
        assert!(item.is_consistent());
        assert_eq!(item.created_at, item.updated_at);
    }

    #[test]
    fn borrow_patch_sets_all_borrow_fields() {
        let mut item = Item::available(3, now());
        item.return_location = Some(Location::Gym);
        item.returned_at = Some(now());

        let patch = ItemPatch::borrowed(
            "Nan".into(),
            "0812345678".into(),
            Location::Cafeteria,
            now(),
        );
        patch.apply(&mut item);

        assert!(item.is_borrowed());
        assert!(item.is_consistent());
        assert_eq!(item.borrower.as_deref(), Some("Nan"));
        assert_eq!(item.borrow_location, Some(Location::Cafeteria));
        // The previous return record is erased, not merely shadowed.
        assert_eq!(item.return_location, None);
        assert_eq!(item.returned_at, None);
    }

    #[test]
    fn return_patch_clears_borrow_fields() {
        let mut item = Item::available(3, now());
        ItemPatch::borrowed("Nan".into(), "0812345678".into(), Location::Cafeteria, now())
            .apply(&mut item);
        ItemPatch::returned(Location::Gym, now()).apply(&mut item);

        assert!(item.is_available());
        assert!(item.is_consistent());
        assert_eq!(item.borrower, None);
        assert_eq!(item.borrower_contact, None);
        assert_eq!(item.borrow_location, None);
        assert_eq!(item.borrowed_at, None);
        assert_eq!(item.return_location, Some(Location::Gym));
        assert!(item.returned_at.is_some());
    }

    #[test]
    fn wire_shape_uses_camel_case_and_omits_cleared_fields() {
        let item = Item::available(1, now());
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["itemNumber"], 1);
        assert_eq!(json["status"], "available");
        assert_eq!(json["createdAt"], "2024-05-01T09:30:00Z");
        assert!(json.get("borrower").is_none());
        assert!(json.get("borrowedAt").is_none());
    }

    #[test]
    fn stats_count_by_status() {
        let mut items = vec![
            Item::available(1, now()),
            Item::available(2, now()),
            Item::available(3, now()),
            Item::available(4, now()),
        ];
        ItemPatch::borrowed("A".into(), "0812345678".into(), Location::Dome, now())
            .apply(&mut items[0]);

        let stats = PoolStats::from_items(&items);
        assert_eq!(stats.available, 3);
        assert_eq!(stats.borrowed, 1);
        assert_eq!(stats.total, 4);
        assert!((stats.utilization - 25.0).abs() < f64::EPSILON);
    }
}
