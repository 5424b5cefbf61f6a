pub mod chat;
pub mod email;
pub mod feedback;
pub mod health;
pub mod ui;

pub use ui::UiAssets;
