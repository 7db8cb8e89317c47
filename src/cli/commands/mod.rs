pub mod describe;
pub mod pipeline;
