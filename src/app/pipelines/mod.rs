pub mod grid_pipeline;
pub mod zips_pipeline;

pub use grid_pipeline::GridPipeline;
pub use zips_pipeline::ZipsPipeline;
