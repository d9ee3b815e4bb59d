pub mod firebase;
pub mod hub;
pub mod webdriver;

pub use firebase::FirebaseClient;
pub use hub::HubClient;
pub use webdriver::{FetchOptions, WebDriverFetcher};
