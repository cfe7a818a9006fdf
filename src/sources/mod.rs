//! Concrete collaborators: the TripSit catalog, the PsychonautWiki API and the
//! filesystem sink.

pub mod http;
pub mod output;
pub mod psychonautwiki;
pub mod tripsit;

pub use http::JsonClient;
pub use output::FileSink;
pub use psychonautwiki::PsychonautWikiClient;
pub use tripsit::TripsitCatalog;
