pub mod assignment;
pub mod enums;
pub mod mood;
pub mod session;
pub mod user;

pub use assignment::*;
pub use enums::*;
pub use mood::*;
pub use session::*;
pub use user::*;
