pub mod diff;
pub mod etl;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod reshape;
pub mod split;

pub use crate::domain::model::{LongTable, QueryBlock, QueryExport, QueryTable, TransformResult};
pub use crate::domain::ports::{Pipeline, Storage};
pub use crate::utils::error::Result;
