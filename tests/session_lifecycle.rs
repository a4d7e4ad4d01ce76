//! End-to-end exercises of the session core against the in-memory stores:
//! login, rotation chains, replay revocation, and the timing property of
//! invalid logins.

use std::sync::Arc;
use std::time::{Duration, Instant};

use authgate::auth::{PasswordHasher, SessionIssuer, SessionRotator, TokenCodec};
use authgate::configuration::SecuritySettings;
use authgate::store::{InMemoryStore, RefreshTokenStore, User, UserStore};
use uuid::Uuid;

fn test_settings() -> SecuritySettings {
    SecuritySettings {
        jwt_secret: "test-secret-key-at-least-32-characters-long".to_string(),
        jwt_issuer: "authgate_test".to_string(),
        access_token_expiry_secs: 900,
        refresh_token_expiry_secs: 604800,
        password_bcrypt_cost: 4,
    }
}

struct TestCore {
    store: Arc<InMemoryStore>,
    issuer: SessionIssuer,
    rotator: SessionRotator,
    codec: Arc<TokenCodec>,
    hasher: Arc<PasswordHasher>,
}

fn spawn_core() -> TestCore {
    let settings = test_settings();
    let store = Arc::new(InMemoryStore::new());
    let codec = Arc::new(TokenCodec::new(&settings));
    let hasher = Arc::new(PasswordHasher::new(settings.password_bcrypt_cost).unwrap());

    let issuer = SessionIssuer::new(
        store.clone() as Arc<dyn UserStore>,
        store.clone() as Arc<dyn RefreshTokenStore>,
        codec.clone(),
        hasher.clone(),
        settings.refresh_token_expiry_secs,
    );
    let rotator = SessionRotator::new(
        store.clone() as Arc<dyn RefreshTokenStore>,
        codec.clone(),
        settings.refresh_token_expiry_secs,
    );

    TestCore {
        store,
        issuer,
        rotator,
        codec,
        hasher,
    }
}

async fn register(core: &TestCore, email: &str, password: &str) -> Uuid {
    let user = User::new(email.to_string(), core.hasher.hash(password).unwrap());
    UserStore::insert(core.store.as_ref(), &user).await.unwrap();
    user.user_id
}

#[tokio::test]
async fn login_then_verify_yields_the_user_as_subject() {
    let core = spawn_core();
    let user_id = register(&core, "alice@example.com", "correcthorse").await;

    let pair = core
        .issuer
        .login("alice@example.com", "correcthorse")
        .await
        .unwrap();

    assert!(!pair.access_token.is_empty());
    assert!(!pair.refresh_token.is_empty());

    let claims = core.codec.verify(&pair.access_token).unwrap();
    assert_eq!(claims.sub, user_id.to_string());
}

#[tokio::test]
async fn a_rotation_chain_stays_at_one_live_token() {
    let core = spawn_core();
    let user_id = register(&core, "alice@example.com", "correcthorse").await;

    let mut pair = core
        .issuer
        .login("alice@example.com", "correcthorse")
        .await
        .unwrap();

    for hop in 1..=3u64 {
        pair = core.rotator.rotate(&pair.refresh_token).await.unwrap();
        let claims = core.codec.verify(&pair.access_token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        // One consumed row per hop plus the single live one.
        assert_eq!(core.store.count_for_user(user_id).await.unwrap(), hop + 1);
    }
}

#[tokio::test]
async fn replay_anywhere_in_the_chain_revokes_the_whole_chain() {
    let core = spawn_core();
    let user_id = register(&core, "alice@example.com", "correcthorse").await;

    let first = core
        .issuer
        .login("alice@example.com", "correcthorse")
        .await
        .unwrap();
    let second = core.rotator.rotate(&first.refresh_token).await.unwrap();
    let _third = core.rotator.rotate(&second.refresh_token).await.unwrap();

    // Replaying the first hop kills everything, including the live third
    // token.
    assert!(core.rotator.rotate(&first.refresh_token).await.is_err());
    assert_eq!(core.store.count_for_user(user_id).await.unwrap(), 0);

    // The user can still log in again from scratch.
    assert!(core
        .issuer
        .login("alice@example.com", "correcthorse")
        .await
        .is_ok());
}

#[tokio::test]
async fn sessions_of_different_users_are_independent() {
    let core = spawn_core();
    let alice = register(&core, "alice@example.com", "correcthorse").await;
    let bob = register(&core, "bob@example.com", "batterystaple").await;

    let alice_pair = core
        .issuer
        .login("alice@example.com", "correcthorse")
        .await
        .unwrap();
    let bob_pair = core
        .issuer
        .login("bob@example.com", "batterystaple")
        .await
        .unwrap();

    // Alice replays her token; bob's session must survive the sweep.
    core.rotator.rotate(&alice_pair.refresh_token).await.unwrap();
    core.rotator
        .rotate(&alice_pair.refresh_token)
        .await
        .unwrap_err();

    assert_eq!(core.store.count_for_user(alice).await.unwrap(), 0);
    assert_eq!(core.store.count_for_user(bob).await.unwrap(), 1);
    assert!(core.rotator.rotate(&bob_pair.refresh_token).await.is_ok());
}

async fn median_login_time(core: &TestCore, email: &str, rounds: u32) -> Duration {
    let mut samples = Vec::new();
    for _ in 0..rounds {
        let start = Instant::now();
        let _ = core.issuer.login(email, "definitely-wrong-password").await;
        samples.push(start.elapsed());
    }
    samples.sort();
    samples[samples.len() / 2]
}

#[tokio::test]
async fn unknown_email_takes_comparable_time_to_wrong_password() {
    let core = spawn_core();
    register(&core, "alice@example.com", "correcthorse").await;

    // Warm both paths once before measuring.
    let _ = core.issuer.login("alice@example.com", "x-wrong-x").await;
    let _ = core.issuer.login("ghost@example.com", "x-wrong-x").await;

    let known = median_login_time(&core, "alice@example.com", 15).await;
    let unknown = median_login_time(&core, "ghost@example.com", 15).await;

    // Both paths run exactly one bcrypt verification; medians should agree
    // within a loose scheduling margin.
    let (fast, slow) = if known < unknown {
        (known, unknown)
    } else {
        (unknown, known)
    };
    assert!(
        slow < fast * 5 + Duration::from_millis(5),
        "timing gap leaks account existence: known={known:?} unknown={unknown:?}"
    );
}
