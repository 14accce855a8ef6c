// Application layer - Use case interactors

pub mod container;
pub mod render_interactor;
pub mod verify_interactor;

// Re-export interactors
pub use container::{AppContainer, DefaultAppContainer};
pub use render_interactor::{LessonRequest, RenderHandle, RenderInteractor, RenderSettings};
pub use verify_interactor::{VerifyInteractor, VerifyRequest, VerifyResponse};
