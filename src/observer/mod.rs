// Observer system: records flow through rings 0-9 with persistence at ring 5

pub mod context;
pub mod error;
pub mod implementations;
pub mod model_record;
pub mod pipeline;
pub mod preloader;
pub mod registry;
pub mod runner;
pub mod traits;

// Re-export core types
pub use context::*;
pub use error::*;
pub use model_record::*;
pub use pipeline::ObserverPipeline;
pub use preloader::Preloader;
pub use registry::*;
pub use runner::ObserverRunner;
pub use traits::*;
pub use implementations::register_builtin_observers;
