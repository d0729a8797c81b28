mod strings;
mod urls;

pub use strings::*;
pub use urls::*;
