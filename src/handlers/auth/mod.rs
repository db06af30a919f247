pub mod login;
pub mod refresh;
pub mod session;

pub use login::login;
pub use refresh::refresh;
pub use session::{logout, me};
