use secrecy::Secret;

use sqlx::PgExecutor;

use uuid::Uuid;

use crate::domain::{EmailAddress, Role};
use crate::model::{NewUser, User, UserCredentials};

pub struct UsersRepo;

impl UsersRepo {
    #[tracing::instrument("Insert a new user record", skip(executor, new_user), fields(email = %new_user.email))]
    pub async fn insert<'con>(
        executor: impl PgExecutor<'con>,
        new_user: &NewUser,
    ) -> sqlx::Result<Uuid> {
        sqlx::query_scalar(
            "insert into users(email, password_hash, role) values ($1, $2, $3) returning id",
        )
        .bind(new_user.email.as_ref())
        .bind(&new_user.password_hash)
        .bind(new_user.role.as_ref())
        .fetch_one(executor)
        .await
    }

    #[tracing::instrument("Fetch user credentials", skip(executor))]
    pub async fn fetch_credentials_by_email<'con>(
        executor: impl PgExecutor<'con>,
        email: &EmailAddress,
    ) -> sqlx::Result<Option<UserCredentials>> {
        let row: Option<(Uuid, String, String, String)> = sqlx::query_as(
            "select id, email, role, password_hash from users where email=$1",
        )
        .bind(email.as_ref())
        .fetch_optional(executor)
        .await?;

        row.map(|(id, email, role, password_hash)| {
            let role: Role = role
                .parse()
                .map_err(|e: String| sqlx::Error::Decode(e.into()))?;
            Ok(UserCredentials {
                id,
                email,
                role,
                password_hash: Secret::new(password_hash),
            })
        })
        .transpose()
    }

    #[tracing::instrument("Fetch user by id", skip(executor))]
    pub async fn fetch_by_id<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
    ) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>("select id, email, role, created_at from users where id=$1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn count<'con>(executor: impl PgExecutor<'con>) -> sqlx::Result<i64> {
        sqlx::query_scalar("select count(*) from users")
            .fetch_one(executor)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use sqlx::PgPool;

    fn new_user() -> NewUser {
        NewUser {
            email: "test@test.com".parse().unwrap(),
            password_hash: "test_password_hash".into(),
            role: Role::Editor,
        }
    }

    #[sqlx::test]
    async fn can_fetch_user_credentials_by_email(pool: PgPool) {
        let new_user = new_user();

        let user_id = UsersRepo::insert(&pool, &new_user)
            .await
            .expect("Failed to insert new user");

        let creds = UsersRepo::fetch_credentials_by_email(&pool, &new_user.email)
            .await
            .expect("Failed to fetch user credentials by email")
            .expect("Fetched credentials are empty");

        assert_eq!(user_id, creds.id);
        assert_eq!(Role::Editor, creds.role);
        assert_eq!(&new_user.password_hash, creds.password_hash.expose_secret());
    }

    #[sqlx::test]
    async fn unknown_email_has_no_credentials(pool: PgPool) {
        let email: EmailAddress = "nobody@test.com".parse().unwrap();

        let creds = UsersRepo::fetch_credentials_by_email(&pool, &email)
            .await
            .expect("Failed to query credentials");

        assert!(creds.is_none());
    }
}
