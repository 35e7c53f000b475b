pub mod enroll;
pub mod filter;
pub mod listing;
pub mod rounds;

pub use enroll::{submit_registration, EnrollOutcome};
pub use filter::{filter_viable, is_viable};
pub use listing::{fetch_catalog, Catalog, Course};
pub use rounds::{enter_selection, fetch_rounds, RegistrationRound, RoundEntryHook};
