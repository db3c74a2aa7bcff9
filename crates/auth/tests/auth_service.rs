use auth::{
    AuthService, InMemoryUserStore, NewUser, RegistrationError, SqlUserStore, UserStore,
    hash_password,
};
use configuration::{DatabaseSettings, SeedUser};
use database::{UserRepository, connect, run_migrations};
use std::sync::Arc;

async fn sql_store() -> Arc<SqlUserStore> {
    let settings = DatabaseSettings {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    };
    let pool = connect(&settings).await.unwrap();
    run_migrations(&pool).await.unwrap();
    Arc::new(SqlUserStore::new(UserRepository::new(pool)))
}

/// Every behavioural test runs against both store implementations.
async fn stores() -> Vec<(&'static str, Arc<dyn UserStore>)> {
    let memory: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
    let sql: Arc<dyn UserStore> = sql_store().await;
    vec![("memory", memory), ("sql", sql)]
}

#[tokio::test]
async fn registered_user_authenticates_and_wrong_password_fails() {
    for (name, store) in stores().await {
        let service = AuthService::new(store);
        let created = service
            .create_user("trader", "hunter2", Some("trader@example.com"), Some("Tess Trader"))
            .await
            .unwrap();
        assert_eq!(created.message, "User 'trader' created successfully.", "{name}");

        let user = service.authenticate("trader", "hunter2").await.unwrap();
        let user = user.unwrap_or_else(|| panic!("{name}: valid credentials rejected"));
        assert_eq!(user.email.as_deref(), Some("trader@example.com"));
        assert_eq!(user.full_name.as_deref(), Some("Tess Trader"));

        assert!(service.authenticate("trader", "hunter3").await.unwrap().is_none(), "{name}");
        assert!(service.authenticate("nobody", "hunter2").await.unwrap().is_none(), "{name}");
    }
}

#[tokio::test]
async fn duplicate_username_conflicts_and_keeps_the_first_password() {
    for (name, store) in stores().await {
        let service = AuthService::new(store.clone());
        service.create_user("alice", "pw1", None, None).await.unwrap();

        let err = service.create_user("alice", "pw2", None, None).await.unwrap_err();
        assert_eq!(
            err,
            RegistrationError::Conflict("Username 'alice' already exists.".to_string()),
            "{name}"
        );
        assert_eq!(store.count_users().await.unwrap(), 1, "{name}");

        assert!(service.authenticate("alice", "pw1").await.unwrap().is_some(), "{name}");
        assert!(service.authenticate("alice", "pw2").await.unwrap().is_none(), "{name}");
    }
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    for (name, store) in stores().await {
        let service = AuthService::new(store);
        service
            .create_user("alice", "pw1", Some("a@example.com"), None)
            .await
            .unwrap();
        let err = service
            .create_user("bob", "pw2", Some("a@example.com"), None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RegistrationError::Conflict(
                "Could not create user 'bob'. Username or email might already exist.".to_string()
            ),
            "{name}"
        );
    }
}

#[tokio::test]
async fn blank_email_is_not_stored() {
    for (name, store) in stores().await {
        let service = AuthService::new(store.clone());
        service.create_user("alice", "pw1", Some(""), None).await.unwrap();
        service.create_user("bob", "pw2", Some("  "), None).await.unwrap();
        assert_eq!(store.count_users().await.unwrap(), 2, "{name}");
        assert_eq!(store.lookup_user("bob").await.unwrap().unwrap().email, None, "{name}");
    }
}

#[tokio::test]
async fn empty_username_or_password_is_rejected() {
    for (name, store) in stores().await {
        let service = AuthService::new(store.clone());
        let expected = RegistrationError::Validation("Username and password are required.".to_string());

        assert_eq!(service.create_user("   ", "pw", None, None).await.unwrap_err(), expected, "{name}");
        assert_eq!(service.create_user("carol", "", None, None).await.unwrap_err(), expected, "{name}");
        assert_eq!(store.count_users().await.unwrap(), 0, "{name}");
    }
}

#[tokio::test]
async fn disabled_user_never_authenticates() {
    for (name, store) in stores().await {
        store
            .insert_user(NewUser {
                username: "dormant".to_string(),
                email: None,
                full_name: None,
                hashed_password: hash_password("correct").unwrap(),
                disabled: true,
            })
            .await
            .unwrap();

        let service = AuthService::new(store);
        assert!(service.authenticate("dormant", "correct").await.unwrap().is_none(), "{name}");
    }
}

#[tokio::test]
async fn stored_password_is_a_salted_hash() {
    for (name, store) in stores().await {
        let service = AuthService::new(store.clone());
        service.create_user("alice", "pw1", None, None).await.unwrap();
        service.create_user("bob", "pw1", None, None).await.unwrap();

        let alice = store.lookup_user("alice").await.unwrap().unwrap();
        let bob = store.lookup_user("bob").await.unwrap().unwrap();
        assert!(alice.hashed_password.starts_with("$argon2"), "{name}");
        assert_ne!(alice.hashed_password, "pw1", "{name}");
        assert_ne!(alice.hashed_password, bob.hashed_password, "{name}");
    }
}

#[tokio::test]
async fn seeding_only_fills_an_empty_store() {
    let seeds = vec![
        SeedUser {
            username: "demo".to_string(),
            password: "demo-password".to_string(),
            email: Some("demo@example.com".to_string()),
            full_name: None,
        },
        SeedUser {
            username: "".to_string(),
            password: "ignored".to_string(),
            email: None,
            full_name: None,
        },
    ];

    for (name, store) in stores().await {
        let service = AuthService::new(store.clone());
        assert_eq!(service.seed_defaults(&seeds).await.unwrap(), 1, "{name}");
        assert!(service.authenticate("demo", "demo-password").await.unwrap().is_some(), "{name}");

        assert_eq!(service.seed_defaults(&seeds).await.unwrap(), 0, "{name}");
        assert_eq!(service.user_count().await.unwrap(), 1, "{name}");
    }
}
