pub mod record_fields;
pub mod sites;
pub mod staff;
