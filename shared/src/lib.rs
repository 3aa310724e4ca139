pub mod page;
pub mod query;
pub mod record;

pub use page::*;
pub use query::*;
pub use record::*;
