pub mod etl;
pub mod grid;
pub mod labeler;
pub mod nearest;
pub mod projection;

pub use crate::domain::model::{Station, StationLocation, Zip};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
