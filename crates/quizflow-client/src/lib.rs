//! quizflow-client — Quiz backend integrations.
//!
//! Implements the `QuizService` trait for a remote HTTP quiz API and for a
//! built-in offline catalog, allowing quizflow to run sessions against
//! multiple backends.

pub mod catalog;
pub mod config;
pub mod http;
pub mod local;
pub mod mock;

pub use config::{create_service, load_config, load_config_from, BackendConfig, QuizflowConfig};
pub use http::HttpQuizService;
pub use local::LocalQuizService;
pub use mock::{MockQuizService, RecordedCall};
