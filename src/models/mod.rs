pub mod project;
pub mod social_link;
pub mod user;
pub mod verification;

pub use project::{LinkTriple, NewProject, Project, ProjectUpdate, MAX_DESCRIPTION_CHARS};
pub use social_link::{DEFAULT_PLATFORM, SocialLink, SocialSlot};
pub use user::{NewUser, Profile, ProfileUpdate, User};
pub use verification::VerificationToken;
