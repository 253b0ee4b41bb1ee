pub mod controller;
pub mod outcome;
pub mod store;

pub use controller::{CurrentMovie, SessionController, SessionPhase};
pub use outcome::{EndOfVotes, OutcomeKind};
pub use store::{JsonFileStore, MemoryStore, SessionStore};
