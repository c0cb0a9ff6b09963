//! Application use cases / business logic

pub mod pipeline;
pub mod render;

pub use pipeline::{PipelineConfig, PipelineError, PublishPipeline, group_by_result};
pub use render::{RenderConfig, VoteRenderer, render_vote_detail};
