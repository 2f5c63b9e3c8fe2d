mod backdrop;
mod bubbles;
mod core;
mod input;
mod network;

pub use backdrop::BackdropPlugin;
pub use bubbles::BubblesPlugin;
pub use core::CorePlugin;
pub(crate) use core::UpdateSet;
pub use input::InputPlugin;
pub use network::NetworkPlugin;
