//! # rt-app
//!
//! The screen view-models of rusty-threads. Each one holds observable state
//! (loading flag, error string, result list) and forwards user actions to
//! the ports assembled in an `AppContext`.

pub mod auth;
pub mod context;
pub mod home;
pub mod notifications;
pub mod posting;
pub mod profile;
pub mod search;
pub mod session;
pub mod state;

pub use auth::{AuthViewModel, RegistrationForm};
pub use context::AppContext;
pub use home::HomeViewModel;
pub use notifications::{NotificationViewModel, SampleNotifications};
pub use posting::AddThreadViewModel;
pub use profile::{OtherUserViewModel, ProfileViewModel};
pub use search::SearchViewModel;
pub use session::SessionStore;
pub use state::{Observable, ScreenStatus};
