//! smartspend-intake: state store, expense intake pipeline, and the
//! collaborator traits they are built against.

pub mod collaborators;
pub mod error;
pub mod memory;
pub mod parsed;
pub mod pipeline;
pub mod rule_parser;
pub mod store;

pub use collaborators::{AuthSession, ExpenseParser, Persistence, StaticSession, StoredState};
pub use error::{is_session_expired, SessionExpired, StoreError};
pub use memory::MemoryPersistence;
pub use parsed::{parser_prompt, ParsedExpense, PARSER_INSTRUCTIONS};
pub use pipeline::{IntakeOutcome, IntakePipeline};
pub use rule_parser::RuleParser;
pub use store::{SessionState, StateStore, WIPE_CONFIRMATION};
