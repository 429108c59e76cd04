pub mod assertions;

pub use assertions::{changes_of, creates_of, deletes, kinds};
pub use exchange::{connect, exchange, init_logger, Exchange};
