// Query module exports

pub mod executor;
pub mod expression;
pub mod plan;
pub mod result;

pub use expression::{ComparisonOp, Expression};
pub use result::{QueryError, QueryResult};
