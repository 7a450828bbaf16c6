pub mod contracts;
pub mod driver;
pub mod store;
pub mod transport;

pub use contracts::*;
pub use driver::*;
pub use store::*;
pub use transport::*;
