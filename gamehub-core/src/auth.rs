use argon2::{
    password_hash::{Encoding, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::{Database, DatabaseError, NewPlayer, PlayerData, PrimaryKey, UserRole};

pub struct Auth<Db> {
    db: Arc<Db>,
    argon: Argon2<'static>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Utilisateur déjà existant")]
    AlreadyExists,
    #[error("Utilisateur non trouvé")]
    UserNotFound,
    #[error("Mot de passe incorrect")]
    WrongPassword,
    #[error("Token invalide")]
    InvalidToken,
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
    #[error("HashError: {0}")]
    HashError(String),
    #[error("TokenError: {0}")]
    TokenError(String),
}

/// Claims carried by an issued token
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub id: PrimaryKey,
    pub email: String,
    pub role: UserRole,
    pub exp: usize,
}

#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug)]
pub struct NewRegistration {
    pub email: String,
    pub username: String,
    pub password: String,
    pub role: Option<UserRole>,
}

/// A successful login: the signed token and the account it belongs to
#[derive(Debug)]
pub struct LoginData {
    pub token: String,
    pub player: PlayerData,
}

impl<Db> Auth<Db>
where
    Db: Database,
{
    const TOKEN_DURATION_IN_HOURS: i64 = 1;

    pub fn new(db: &Arc<Db>, secret: &str) -> Self {
        Self {
            db: db.clone(),
            argon: Argon2::default(),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Creates a player account with a hashed password
    pub async fn register(&self, new_player: NewRegistration) -> Result<PlayerData, AuthError> {
        match self.db.player_by_email(&new_player.email).await {
            Ok(_) => return Err(AuthError::AlreadyExists),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(AuthError::Db(e)),
        }

        let salt = SaltString::generate(&mut OsRng);
        let hashed_password = self
            .argon
            .hash_password(new_player.password.as_bytes(), &salt)
            .map_err(|e| AuthError::HashError(e.to_string()))?
            .to_string();

        self.db
            .create_player(NewPlayer {
                email: new_player.email,
                username: new_player.username,
                password: hashed_password,
                role: new_player.role.unwrap_or(UserRole::Player),
            })
            .await
            .map_err(AuthError::Db)
    }

    /// Logs a player in, returning a signed token
    pub async fn login(&self, credentials: Credentials) -> Result<LoginData, AuthError> {
        let player = self
            .db
            .player_by_email(&credentials.email)
            .await
            .map_err(|e| match e {
                e if e.is_not_found() => AuthError::UserNotFound,
                e => AuthError::Db(e),
            })?;

        let stored_password = PasswordHash::parse(&player.password, Encoding::default())
            .map_err(|e| AuthError::HashError(e.to_string()))?;

        self.argon
            .verify_password(credentials.password.as_bytes(), &stored_password)
            .map_err(|_| AuthError::WrongPassword)?;

        let expires_at = Utc::now() + Duration::hours(Self::TOKEN_DURATION_IN_HOURS);

        let claims = Claims {
            id: player.id,
            email: player.email.clone(),
            role: player.role,
            exp: expires_at.timestamp() as usize,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenError(e.to_string()))?;

        Ok(LoginData { token, player })
    }

    /// Verifies a token and returns the claims it carries
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryDatabase;

    fn auth() -> (Arc<MemoryDatabase>, Auth<MemoryDatabase>) {
        let db = Arc::new(MemoryDatabase::new());
        let auth = Auth::new(&db, "test-secret");

        (db, auth)
    }

    fn registration(email: &str) -> NewRegistration {
        NewRegistration {
            email: email.to_string(),
            username: email.split('@').next().unwrap().to_string(),
            password: "hunter22".to_string(),
            role: None,
        }
    }

    #[tokio::test]
    async fn register_then_login_round_trips() {
        let (_, auth) = auth();

        let player = auth
            .register(registration("coyote@test.com"))
            .await
            .expect("registration succeeds");

        assert_eq!(player.role, UserRole::Player);
        assert_ne!(player.password, "hunter22");

        let login = auth
            .login(Credentials {
                email: "coyote@test.com".to_string(),
                password: "hunter22".to_string(),
            })
            .await
            .expect("login succeeds");

        let claims = auth.verify(&login.token).expect("token is valid");

        assert_eq!(claims.id, player.id);
        assert_eq!(claims.email, "coyote@test.com");
        assert_eq!(claims.role, UserRole::Player);
    }

    #[tokio::test]
    async fn register_rejects_existing_email() {
        let (_, auth) = auth();

        auth.register(registration("dupe@test.com"))
            .await
            .expect("first registration succeeds");

        let mut second = registration("dupe@test.com");
        second.username = "someone-else".to_string();

        let result = auth.register(second).await;

        assert!(matches!(result, Err(AuthError::AlreadyExists)));
    }

    #[tokio::test]
    async fn login_rejects_unknown_user() {
        let (_, auth) = auth();

        let result = auth
            .login(Credentials {
                email: "ghost@test.com".to_string(),
                password: "whatever".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AuthError::UserNotFound)));
    }

    #[tokio::test]
    async fn login_rejects_wrong_password() {
        let (_, auth) = auth();

        auth.register(registration("strict@test.com"))
            .await
            .expect("registration succeeds");

        let result = auth
            .login(Credentials {
                email: "strict@test.com".to_string(),
                password: "not-the-password".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AuthError::WrongPassword)));
    }

    #[tokio::test]
    async fn verify_rejects_garbage_token() {
        let (_, auth) = auth();

        let result = auth.verify("not.a.token");

        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }
}
