// Core data model shared by every pipeline stage.
// Entities are created once per run and never mutated after their owning stage writes them.

pub mod candidate;
pub mod rating;
pub mod record;

pub use candidate::{CandidateId, ParsedDocument, RawDocument, StructuredProfile};
pub use rating::{JudgedRating, Rating, MAX_SCORE, MIN_SCORE};
pub use record::{CandidateRecord, FinalRating};
