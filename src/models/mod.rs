pub mod comment;
pub mod diagnostics;
pub mod diff;
pub mod error;
pub mod health;
pub mod messages;
pub mod session;
pub mod version;

pub use comment::*;
pub use diagnostics::*;
pub use diff::*;
pub use error::*;
pub use health::*;
pub use session::*;
pub use version::*;
