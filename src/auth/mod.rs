mod guard;
mod middleware;
mod password;
mod token;

pub use guard::{GuardError, require_authenticated, require_teacher_or_admin};
pub use middleware::{AuthError, RequireAuth, RequireTeacherOrAdmin};
pub use password::{PasswordHasher, UNKNOWN_USER_DIGEST};
pub use token::{Claims, DEFAULT_TOKEN_TTL_MINUTES, MAX_TOKEN_TTL_MINUTES, TokenRejection, TokenService};
