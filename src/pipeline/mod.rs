//! Email-to-brief processing pipeline.
//!
//! Every batch flows through:
//! 1. `preprocess`: clean text, extract money, status flags, entities and
//!    the project key for each message (invalid messages are dropped)
//! 2. `cluster`: group by project key
//! 3. `constraints`: financial totals must be backed by member mentions
//! 4. `ranking`: urgency score and deterministic order
//! 5. `synthesis` (crate root): narratives, LLM or rule-based
//! 6. `brief` (crate root): structured output and markdown
//!
//! Stages 1–4 are synchronous and never call out. `runner` wires them
//! together.

pub mod cleaner;
pub mod cluster;
pub mod constraints;
pub mod entities;
pub mod financial;
pub mod preprocess;
pub mod project_key;
pub mod ranking;
pub mod runner;
pub mod status;
pub mod types;
