pub mod db;
pub mod decks;
pub mod users;

pub use db::DB;
pub use decks::DeckStore;
pub use users::User;
