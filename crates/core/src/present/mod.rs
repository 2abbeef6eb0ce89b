//! Display-side helpers. Nothing here is authoritative: cards are derived from documents
//! that already passed validation.

pub mod card;
pub mod chart;
pub mod markdown;
