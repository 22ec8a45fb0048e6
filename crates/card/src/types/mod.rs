mod card_status;
mod pin;
mod version;

pub use card_status::CardStatus;
pub use pin::Pin;
pub use version::Version;
