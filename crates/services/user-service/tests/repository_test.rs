//! User repository integration tests against an in-memory SQLite store.

use std::time::Duration;

use tokio_test::assert_ok;

use common::{AppError, DatabaseConfig, FailureKind, Outcome};
use domain::{CityCount, CountryCount, NameEmail, NewUser, Password, User};
use user_service_lib::infra::{Database, Persistence};
use user_service_lib::repository::{UserRepository, UserStore};
use user_service_lib::with_transaction;

async fn setup() -> (UserStore, Persistence) {
    let db = Database::connect(&DatabaseConfig::in_memory())
        .await
        .expect("in-memory database");
    let persistence = Persistence::new(db.get_connection(), None);
    (UserStore::new(persistence.clone()), persistence)
}

fn new_user(username: &str, email: &str) -> NewUser {
    NewUser::new("Test", "User", username, email)
}

async fn create(store: &UserStore, user: NewUser) -> User {
    let outcome = store.create(user).await;
    assert!(outcome.is_success(), "create failed: {}", outcome.message);
    outcome.data.expect("created user")
}

fn ids(users: &[User]) -> Vec<i32> {
    users.iter().map(|u| u.id).collect()
}

#[tokio::test]
async fn test_create_assigns_id_and_timestamps() {
    let (store, _) = setup().await;

    let user = create(&store, new_user("alice", "a@x.com")).await;

    assert!(user.id > 0);
    assert_eq!(user.created_at, user.updated_at);
    assert_eq!(assert_ok!(store.get_by_id(user.id).await), Some(user));
}

#[tokio::test]
async fn test_created_user_exists_and_duplicates_conflict() {
    let (store, _) = setup().await;
    create(&store, new_user("alice", "a@x.com")).await;

    assert!(assert_ok!(store.exists_by_username("alice", None).await));
    assert!(assert_ok!(store.exists_by_email("a@x.com", None).await));

    let outcome = store.create(new_user("alice", "other@x.com")).await;
    assert!(outcome.failed_with(FailureKind::Conflict));
    assert_eq!(outcome.message, "username already exists");
    assert_eq!(assert_ok!(store.count_all().await), 1);

    let outcome = store.create(new_user("alice2", "a@x.com")).await;
    assert!(outcome.failed_with(FailureKind::Conflict));
    assert_eq!(outcome.message, "email already exists");
    assert_eq!(assert_ok!(store.count_all().await), 1);
}

#[tokio::test]
async fn test_exists_ignores_excluded_id() {
    let (store, _) = setup().await;
    let alice = create(&store, new_user("alice", "a@x.com")).await;

    assert!(!assert_ok!(store.exists_by_username("alice", Some(alice.id)).await));
    assert!(!assert_ok!(store.exists_by_email("a@x.com", Some(alice.id)).await));
    assert!(!assert_ok!(store.exists_by_username("bob", None).await));
}

#[tokio::test]
async fn test_count_all_matches_get_all() {
    let (store, _) = setup().await;
    assert_eq!(assert_ok!(store.count_all().await), 0);
    assert!(assert_ok!(store.get_all().await).is_empty());

    for i in 0..4 {
        create(&store, new_user(&format!("user{}", i), &format!("u{}@x.com", i))).await;
    }

    let all = assert_ok!(store.get_all().await);
    assert_eq!(assert_ok!(store.count_all().await), all.len() as u64);
}

#[tokio::test]
async fn test_pages_reproduce_get_all() {
    let (store, _) = setup().await;
    for i in 0..7 {
        create(&store, new_user(&format!("user{}", i), &format!("u{}@x.com", i))).await;
    }

    let all = assert_ok!(store.get_all().await);
    let page_size = 3;
    let total = assert_ok!(store.count_all().await);
    let pages = total.div_ceil(page_size);

    let mut paged = Vec::new();
    for page in 1..=pages {
        paged.extend(assert_ok!(store.get_paged(page, page_size).await));
    }

    assert_eq!(pages, 3);
    assert_eq!(ids(&paged), ids(&all));
    assert!(assert_ok!(store.get_paged(pages + 1, page_size).await).is_empty());
}

#[tokio::test]
async fn test_update_without_unique_change_never_conflicts() {
    let (store, _) = setup().await;
    let mut alice = create(&store, new_user("alice", "a@x.com")).await;

    alice.city = Some("Lisbon".to_string());
    alice.email = "A@X.com".to_string();
    let outcome = store.update(alice.clone()).await;

    assert!(outcome.is_success(), "{}", outcome.message);
    let updated = outcome.data.expect("updated user");
    assert_eq!(updated.city.as_deref(), Some("Lisbon"));
    assert_eq!(updated.created_at, alice.created_at);
}

#[tokio::test]
async fn test_update_rejects_taken_username_and_email() {
    let (store, _) = setup().await;
    create(&store, new_user("alice", "a@x.com")).await;
    let bob = create(&store, new_user("bob", "b@x.com")).await;

    let mut renamed = bob.clone();
    renamed.username = "alice".to_string();
    let outcome = store.update(renamed).await;
    assert!(outcome.failed_with(FailureKind::Conflict));
    assert_eq!(outcome.message, "username already exists");

    let mut moved = bob.clone();
    moved.email = "a@x.com".to_string();
    let outcome = store.update(moved).await;
    assert!(outcome.failed_with(FailureKind::Conflict));
    assert_eq!(outcome.message, "email already exists");

    assert_eq!(assert_ok!(store.get_by_id(bob.id).await), Some(bob));
}

#[tokio::test]
async fn test_update_missing_user() {
    let (store, _) = setup().await;
    let mut ghost = create(&store, new_user("ghost", "g@x.com")).await;
    assert!(store.delete_by_id(ghost.id).await.is_success());

    ghost.first_name = "Casper".to_string();
    let outcome = store.update(ghost).await;

    assert!(outcome.failed_with(FailureKind::NotFound));
    assert_eq!(outcome.message, "user not found");
    assert_eq!(assert_ok!(store.count_all().await), 0);
}

#[tokio::test]
async fn test_update_overwrites_fields_but_keeps_password() {
    let (store, _) = setup().await;
    let user = NewUser {
        phone: Some("5551234".to_string()),
        password: Some("secret1".to_string()),
        ..new_user("alice", "a@x.com")
    };
    let created = create(&store, user).await;

    let mut replacement = created.clone();
    replacement.phone = None;
    replacement.age = Some(30);
    replacement.password = Some("ignored".to_string());
    let updated = store.update(replacement).await.data.expect("updated user");

    assert_eq!(updated.phone, None);
    assert_eq!(updated.age, Some(30));
    assert_eq!(updated.password, created.password);
    assert!(updated.updated_at >= created.updated_at);
}

#[tokio::test]
async fn test_email_change_scenario() {
    let (store, _) = setup().await;
    let alice = create(&store, new_user("alice", "a@x.com")).await;

    let outcome = store.create(new_user("alice", "b@x.com")).await;
    assert!(outcome.failed_with(FailureKind::Conflict));
    assert_eq!(assert_ok!(store.count_all().await), 1);

    let mut changed = alice.clone();
    changed.email = "a2@x.com".to_string();
    assert!(store.update(changed).await.is_success());

    assert_eq!(assert_ok!(store.get_by_email("a@x.com").await), None);
    let found = assert_ok!(store.get_by_email("a2@x.com").await).expect("user by new email");
    assert_eq!(found.id, alice.id);
}

#[tokio::test]
async fn test_delete_by_id() {
    let (store, _) = setup().await;
    let alice = create(&store, new_user("alice", "a@x.com")).await;

    let outcome = store.delete_by_id(alice.id).await;
    assert!(outcome.is_success());
    assert_eq!(outcome.message, "user deleted");
    assert_eq!(assert_ok!(store.get_by_id(alice.id).await), None);

    let outcome = store.delete_by_id(alice.id).await;
    assert!(outcome.failed_with(FailureKind::NotFound));
    assert_eq!(outcome.message, "user not found");
}

#[tokio::test]
async fn test_delete_by_email() {
    let (store, _) = setup().await;
    create(&store, new_user("alice", "a@x.com")).await;
    let bob = create(&store, new_user("bob", "b@x.com")).await;

    assert!(store.delete_by_email("a@x.com").await.is_success());
    assert!(store
        .delete_by_email("a@x.com")
        .await
        .failed_with(FailureKind::NotFound));
    assert_eq!(ids(&assert_ok!(store.get_all().await)), vec![bob.id]);
}

#[tokio::test]
async fn test_without_phone_treats_empty_as_unset() {
    let (store, _) = setup().await;
    let empty = create(
        &store,
        NewUser {
            phone: Some(String::new()),
            ..new_user("empty", "e@x.com")
        },
    )
    .await;
    let unset = create(&store, new_user("unset", "u@x.com")).await;
    create(
        &store,
        NewUser {
            phone: Some("5551234".to_string()),
            ..new_user("phone", "p@x.com")
        },
    )
    .await;

    let result = assert_ok!(store.without_phone().await);

    assert_eq!(ids(&result), vec![empty.id, unset.id]);
}

#[tokio::test]
async fn test_without_address() {
    let (store, _) = setup().await;
    let unset = create(&store, new_user("unset", "u@x.com")).await;
    create(
        &store,
        NewUser {
            address: Some("1 Main St".to_string()),
            ..new_user("housed", "h@x.com")
        },
    )
    .await;
    let empty = create(
        &store,
        NewUser {
            address: Some(String::new()),
            ..new_user("empty", "e@x.com")
        },
    )
    .await;

    assert_eq!(ids(&assert_ok!(store.without_address().await)), vec![unset.id, empty.id]);
}

#[tokio::test]
async fn test_latest_registered_newest_first() {
    let (store, _) = setup().await;
    let mut created = Vec::new();
    for name in ["first", "second", "third"] {
        created.push(create(&store, new_user(name, &format!("{}@x.com", name))).await);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let latest = assert_ok!(store.latest_registered(2).await);

    assert_eq!(ids(&latest), vec![created[2].id, created[1].id]);
    assert_eq!(assert_ok!(store.latest_registered(10).await).len(), 3);
}

#[tokio::test]
async fn test_ordered_by_last_name_then_first_name() {
    let (store, _) = setup().await;
    let zed = create(&store, NewUser::new("Zed", "Adams", "zed", "z@x.com")).await;
    let carl = create(&store, NewUser::new("Carl", "Young", "carl", "c@x.com")).await;
    let amy = create(&store, NewUser::new("Amy", "Adams", "amy", "a@x.com")).await;

    let ordered = assert_ok!(store.ordered_by_last_name().await);

    assert_eq!(ids(&ordered), vec![amy.id, zed.id, carl.id]);
}

#[tokio::test]
async fn test_minimum_age_excludes_unknown_age() {
    let (store, _) = setup().await;
    let adult = create(
        &store,
        NewUser {
            age: Some(40),
            ..new_user("adult", "ad@x.com")
        },
    )
    .await;
    create(
        &store,
        NewUser {
            age: Some(17),
            ..new_user("minor", "mi@x.com")
        },
    )
    .await;
    create(&store, new_user("unknown", "un@x.com")).await;

    assert_eq!(ids(&assert_ok!(store.get_by_minimum_age(18).await)), vec![adult.id]);
    assert_eq!(assert_ok!(store.get_by_minimum_age(0).await).len(), 2);
}

#[tokio::test]
async fn test_exact_match_filters() {
    let (store, _) = setup().await;
    let paris = create(
        &store,
        NewUser {
            city: Some("Paris".to_string()),
            country: Some("France".to_string()),
            gender: Some("f".to_string()),
            ..new_user("paris", "p@x.com")
        },
    )
    .await;
    create(
        &store,
        NewUser {
            city: Some("Lyon".to_string()),
            country: Some("France".to_string()),
            gender: Some("m".to_string()),
            ..new_user("lyon", "l@x.com")
        },
    )
    .await;

    assert_eq!(ids(&assert_ok!(store.get_by_city("Paris").await)), vec![paris.id]);
    assert!(assert_ok!(store.get_by_city("Berlin").await).is_empty());
    assert_eq!(assert_ok!(store.get_by_country("France").await).len(), 2);
    assert_eq!(ids(&assert_ok!(store.get_by_gender("f").await)), vec![paris.id]);
}

#[tokio::test]
async fn test_count_by_city_and_country_group_unset_values() {
    let (store, _) = setup().await;
    let places = [
        ("a", Some("Paris"), Some("France")),
        ("b", Some("Paris"), Some("France")),
        ("c", Some(""), None),
        ("d", None, Some("")),
        ("e", Some("Lyon"), Some("France")),
    ];
    for (name, city, country) in places {
        let user = NewUser {
            city: city.map(str::to_string),
            country: country.map(str::to_string),
            ..new_user(&format!("user_{}", name), &format!("{}@x.com", name))
        };
        create(&store, user).await;
    }

    let by_city = assert_ok!(store.count_by_city().await);
    assert_eq!(
        by_city,
        vec![
            CityCount { city: String::new(), count: 2 },
            CityCount { city: "Lyon".to_string(), count: 1 },
            CityCount { city: "Paris".to_string(), count: 2 },
        ]
    );

    let by_country = assert_ok!(store.count_by_country().await);
    assert_eq!(
        by_country,
        vec![
            CountryCount { country: String::new(), count: 2 },
            CountryCount { country: "France".to_string(), count: 3 },
        ]
    );
}

#[tokio::test]
async fn test_names_and_emails() {
    let (store, _) = setup().await;
    create(&store, NewUser::new("Ada", "Lovelace", "ada", "ada@x.com")).await;
    create(&store, NewUser::new("Grace", "Hopper", "grace", "grace@x.com")).await;

    let projection = assert_ok!(store.get_names_and_emails().await);

    assert_eq!(
        projection,
        vec![
            NameEmail::new("Ada", "Lovelace", "ada@x.com"),
            NameEmail::new("Grace", "Hopper", "grace@x.com"),
        ]
    );
    assert_eq!(projection[0].display_name, "Ada Lovelace");
}

#[tokio::test]
async fn test_passwords_are_stored_hashed() {
    let (store, _) = setup().await;
    let user = NewUser {
        password: Some("secret1".to_string()),
        ..new_user("alice", "a@x.com")
    };
    let created = create(&store, user).await;

    let stored = created.password.expect("stored hash");
    assert_ne!(stored, "secret1");
    assert!(Password::from_hash(stored).verify("secret1"));
}

#[tokio::test]
async fn test_update_password() {
    let (store, _) = setup().await;
    let alice = create(&store, new_user("alice", "a@x.com")).await;
    assert_eq!(alice.password, None);

    let outcome = store.update_password(alice.id, "newsecret").await;
    assert!(outcome.is_success());
    assert_eq!(outcome.message, "password updated");

    let reloaded = assert_ok!(store.get_by_id(alice.id).await).expect("user");
    let hash = reloaded.password.clone().expect("stored hash");
    assert!(Password::from_hash(hash).verify("newsecret"));
    assert!(reloaded.updated_at >= alice.updated_at);

    let outcome = store.update_password(alice.id, "abc").await;
    assert!(outcome.failed_with(FailureKind::Validation));

    let outcome = store.update_password(alice.id + 100, "newsecret").await;
    assert!(outcome.failed_with(FailureKind::NotFound));
    assert_eq!(outcome.message, "user not found");
}

#[tokio::test]
async fn test_unique_index_backstops_the_pre_check() {
    let (store, persistence) = setup().await;
    create(&store, new_user("alice", "a@x.com")).await;

    // Skip the pre-check and insert straight through the transaction.
    let duplicate = new_user("alice", "fresh@x.com");
    let result = with_transaction!(persistence, |ctx| {
        ctx.users().insert(duplicate, None).await
    });

    assert!(matches!(&result, Err(AppError::Conflict(field)) if field == "username"));
    let outcome = Outcome::from_result(result, "user created", "create user");
    assert_eq!(outcome.message, "username already exists");
    assert_eq!(assert_ok!(store.count_all().await), 1);

    let duplicate = new_user("bob", "a@x.com");
    let result = with_transaction!(persistence, |ctx| {
        ctx.users().insert(duplicate, None).await
    });
    assert!(matches!(result, Err(AppError::Conflict(field)) if field == "email"));
}

#[tokio::test]
async fn test_failed_transaction_leaves_no_trace() {
    let (store, persistence) = setup().await;

    let result: Result<(), AppError> = with_transaction!(persistence, |ctx| {
        let users = ctx.users();
        users.insert(new_user("alice", "a@x.com"), None).await?;
        assert!(users.exists_by_username("alice", None).await?);
        Err(AppError::internal("abort"))
    });

    assert!(result.is_err());
    assert_eq!(assert_ok!(store.count_all().await), 0);
    assert!(!assert_ok!(store.exists_by_username("alice", None).await));
}
