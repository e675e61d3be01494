/// Authentication utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing
/// - [`jwt`]: Access token generation and validation
/// - [`session`]: Session and sign-in request types
///
/// # Example
///
/// ```
/// use lifeos_shared::auth::password::{hash_password, verify_password};
/// use lifeos_shared::auth::jwt::{create_token, Claims};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), "me@example.com", Uuid::new_v4());
/// let token = create_token(&claims, "secret-key-at-least-32-bytes-long")?;
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod password;
pub mod session;

pub use session::{CurrentUser, Session, SignInRequest};
