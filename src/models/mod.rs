pub mod requests;
pub mod responses;
pub mod wire_finder;

pub use requests::*;
pub use responses::*;
pub use wire_finder::*;
