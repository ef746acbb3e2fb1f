//! Request and response types for the Vertex AI generative API.

pub mod content;
pub mod generation;
pub mod response;

// Re-export commonly used types
pub use content::*;
pub use generation::*;
pub use response::*;
