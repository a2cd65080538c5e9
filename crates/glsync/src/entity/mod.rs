//! SeaORM entity definitions for the glsync database schema.

pub mod activity_kind;
pub mod activity_metadata;
pub mod activity_record;
pub mod integration;
pub mod prelude;
