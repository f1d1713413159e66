use super::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

async fn memory_storage() -> Storage {
    Storage::new("sqlite::memory:").await.expect("db")
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = memory_storage().await;
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("comments.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );
}

#[test]
fn store_dir_is_only_made_for_nested_files() {
    create_store_dir(DEFAULT_DATABASE_URL).expect("relative file");
    create_store_dir("sqlite::memory:").expect("memory");

    let temp_root = tempfile::tempdir().expect("tempdir");
    let dir = temp_root.path().join("a").join("b");
    let database_url = format!(
        "sqlite://{}?mode=rwc",
        dir.join("comments.db").to_string_lossy().replace('\\', "/")
    );
    create_store_dir(&database_url).expect("nested");
    assert!(dir.is_dir());
}

#[tokio::test]
async fn profile_ids_are_assigned_monotonically() {
    let storage = memory_storage().await;
    let first = storage
        .create_profile("Ada", "MIT", "CS", Some(&b"png"[..]), "Math")
        .await
        .expect("first");
    let second = storage
        .create_profile("Grace", "Yale", "Math", None, "Compilers")
        .await
        .expect("second");
    assert!(second.0 > first.0);
}

#[tokio::test]
async fn lists_profiles_in_insertion_order_with_optional_picture() {
    let storage = memory_storage().await;
    storage
        .create_profile("Ada", "MIT", "CS", Some(&b"\x89PNG"[..]), "Math, Coding")
        .await
        .expect("ada");
    storage
        .create_profile("Grace", "Yale", "Math", None, "Compilers")
        .await
        .expect("grace");

    let profiles = storage.list_profiles().await.expect("profiles");
    assert_eq!(profiles.len(), 2);
    assert_eq!(profiles[0].name, "Ada");
    assert_eq!(profiles[0].picture.as_deref(), Some(&b"\x89PNG"[..]));
    assert_eq!(profiles[0].capabilities, "Math, Coding");
    assert_eq!(profiles[1].name, "Grace");
    assert!(profiles[1].picture.is_none());
}

#[tokio::test]
async fn stores_empty_strings_without_validation() {
    let storage = memory_storage().await;
    let id = storage
        .create_profile("", "", "", None, "")
        .await
        .expect("profile");
    let stored = storage
        .find_profile(id)
        .await
        .expect("lookup")
        .expect("present");
    assert_eq!(stored.name, "");
    assert_eq!(stored.capabilities, "");
}

#[tokio::test]
async fn find_profile_returns_none_for_unknown_id() {
    let storage = memory_storage().await;
    let missing = storage.find_profile(ProfileId(42)).await.expect("lookup");
    assert!(missing.is_none());
}

#[tokio::test]
async fn events_are_scoped_to_their_profile() {
    let storage = memory_storage().await;
    let ada = storage
        .create_profile("Ada", "MIT", "CS", None, "Math")
        .await
        .expect("ada");
    let grace = storage
        .create_profile("Grace", "Yale", "Math", None, "Compilers")
        .await
        .expect("grace");

    storage
        .create_event(ada, "Intern", date(2023, 1, 1), date(2023, 6, 1), "Did X\nDid Y")
        .await
        .expect("event");
    storage
        .create_event(grace, "Navy", date(1944, 1, 1), date(1946, 1, 1), "COBOL")
        .await
        .expect("event");

    let events = storage.list_events(ada).await.expect("events");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].profile_id, ada);
    assert_eq!(events[0].event_name, "Intern");
    assert_eq!(events[0].start_date, date(2023, 1, 1));
    assert_eq!(events[0].end_date, date(2023, 6, 1));
    assert_eq!(events[0].points, "Did X\nDid Y");
}

#[tokio::test]
async fn events_accept_end_before_start_and_unknown_profiles() {
    let storage = memory_storage().await;
    storage
        .create_event(ProfileId(99), "Backwards", date(2024, 5, 1), date(2024, 1, 1), "x")
        .await
        .expect("event");
    let events = storage.list_events(ProfileId(99)).await.expect("events");
    assert_eq!(events.len(), 1);
    assert!(events[0].end_date < events[0].start_date);
}

#[tokio::test]
async fn average_rating_is_zero_without_comments() {
    let storage = memory_storage().await;
    let ada = storage
        .create_profile("Ada", "MIT", "CS", None, "Math")
        .await
        .expect("ada");
    assert_eq!(storage.average_rating(ada).await.expect("avg"), 0.0);
}

#[tokio::test]
async fn average_rating_is_arithmetic_mean() {
    let storage = memory_storage().await;
    let ada = storage
        .create_profile("Ada", "MIT", "CS", None, "Math")
        .await
        .expect("ada");
    for rating in [5, 3, 4] {
        storage
            .create_comment(ada, "ok", rating)
            .await
            .expect("comment");
    }
    assert_eq!(storage.average_rating(ada).await.expect("avg"), 4.0);

    storage.create_comment(ada, "meh", 3).await.expect("comment");
    assert_eq!(storage.average_rating(ada).await.expect("avg"), 3.75);
}

#[tokio::test]
async fn comments_carry_a_server_timestamp() {
    let storage = memory_storage().await;
    let ada = storage
        .create_profile("Ada", "MIT", "CS", None, "Math")
        .await
        .expect("ada");
    let before = Utc::now() - chrono::Duration::seconds(1);
    storage
        .create_comment(ada, "Great!", 5)
        .await
        .expect("comment");

    let comments = storage.list_comments(ada).await.expect("comments");
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].comment, "Great!");
    assert_eq!(comments[0].rating, 5);
    assert!(comments[0].created_at >= before);
}

#[tokio::test]
async fn store_accepts_out_of_range_ratings() {
    let storage = memory_storage().await;
    storage
        .create_comment(ProfileId(1), "zero", 0)
        .await
        .expect("zero rating is stored");
    let comments = storage.list_comments(ProfileId(1)).await.expect("comments");
    assert_eq!(comments[0].rating, 0);
}

#[tokio::test]
async fn closed_pool_surfaces_persistence_errors() {
    let storage = memory_storage().await;
    storage.pool().close().await;
    assert!(storage
        .create_profile("Ada", "MIT", "CS", None, "Math")
        .await
        .is_err());
    assert!(storage.health_check().await.is_err());
}
