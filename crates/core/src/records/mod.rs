//! Records module - collections, change events, record sets and the store trait.

mod entities_model;
mod records_filter;
mod records_model;
mod records_traits;

pub use entities_model::*;
pub use records_filter::{matches_all, FieldCondition};
pub use records_model::{
    to_record, ChangeEvent, ChangeKind, RawRecordSet, Record, WatchedCollection,
};
pub use records_traits::{ChangeStream, RecordStoreTrait};
