pub mod health;
pub mod languages;
pub mod recognize;
pub mod settings;

pub use health::health_check;
pub use languages::supported_languages;
pub use recognize::recognize;
pub use settings::update_settings;
