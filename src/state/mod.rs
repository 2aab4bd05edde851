mod changes;
mod snapshot;

pub use changes::{diff, ChangeSet, Field};
pub use snapshot::{
    build_snapshot, derive_price, needs_resale_lookup, ItemSnapshot, Price, PriceInputs,
};
