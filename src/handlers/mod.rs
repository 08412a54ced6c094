pub mod comments;
pub mod diagnostics;
pub mod health;
pub mod versions;

pub use comments::*;
pub use diagnostics::*;
pub use health::*;
pub use versions::*;
