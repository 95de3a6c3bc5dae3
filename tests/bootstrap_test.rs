mod common;

use sea_orm::EntityTrait;

use logistics_api::bootstrap::{ensure_admin_user, verify_password, AdminSeed, BootstrapOutcome};
use logistics_api::entities::user::Entity as UserEntity;

use common::TestApp;

fn admin_seed() -> AdminSeed {
    AdminSeed {
        username: "admin".to_string(),
        email: "admin@logistics.com".to_string(),
        password: "Admin@12345".to_string(),
    }
}

#[tokio::test]
async fn bootstrap_is_idempotent() {
    let app = TestApp::new().await;
    let seed = admin_seed();

    let first = ensure_admin_user(&app.state.db, &seed).await.unwrap();
    assert_eq!(first, BootstrapOutcome::Created);

    let second = ensure_admin_user(&app.state.db, &seed).await.unwrap();
    assert_eq!(second, BootstrapOutcome::AlreadyExists);

    let users = UserEntity::find().all(&*app.state.db).await.unwrap();
    assert_eq!(users.len(), 1);
}

#[tokio::test]
async fn bootstrap_stores_verifiable_hash_not_plaintext() {
    let app = TestApp::new().await;
    let seed = admin_seed();
    ensure_admin_user(&app.state.db, &seed).await.unwrap();

    let admin = UserEntity::find()
        .one(&*app.state.db)
        .await
        .unwrap()
        .expect("admin should exist");

    assert!(admin.is_superuser);
    assert_eq!(admin.email, "admin@logistics.com");
    assert_ne!(admin.password_hash, seed.password);
    assert!(verify_password(&seed.password, &admin.password_hash));
    assert!(!verify_password("wrong", &admin.password_hash));
}
