use std::sync::Arc;

use tempfile::TempDir;

use school_directory::config::AdminCodes;
use school_directory::directory::{Directory, NotificationFanout, SequenceAllocator};
use school_directory::models::{EventKind, FanoutEvent, SchoolProfile, User};
use school_directory::store::DirectoryStore;
use school_directory::viewer::ViewerContext;
use school_directory::AppError;

async fn setup() -> (Directory, Arc<DirectoryStore>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("directory.db").display());
    let store = DirectoryStore::new(&url, 64).await.unwrap();
    store.init().await.unwrap();
    let store = Arc::new(store);

    let codes = AdminCodes {
        school_code: "spower".to_string(),
        class_code: "cpower".to_string(),
    };
    (Directory::new(store.clone(), codes), store, dir)
}

async fn register(directory: &Directory, email: &str, name: &str) -> User {
    directory
        .users
        .register(email.to_string(), name.to_string(), None)
        .await
        .unwrap()
}

fn viewer_for(user: &User) -> ViewerContext {
    ViewerContext::new(user.id, user.email.clone(), user.name.clone())
}

fn profile(name: &str) -> SchoolProfile {
    SchoolProfile {
        name: name.to_string(),
        address_1: None,
        address_2: None,
        city: Some("Kottayam".to_string()),
        state: None,
        zip: None,
        phone_number: None,
        description: Some("A fine institution".to_string()),
        image: None,
    }
}

#[tokio::test]
async fn second_review_by_same_user_is_rejected() {
    let (directory, store, _dir) = setup().await;
    let user = register(&directory, "u1@example.com", "U One").await;
    let viewer = viewer_for(&user);
    let school = directory
        .schools
        .create(&viewer, profile("Abcdef College"))
        .await
        .unwrap()
        .school;

    directory
        .reviews
        .create(&viewer, school.id, 4.0, "Solid".to_string())
        .await
        .unwrap();

    let err = directory
        .reviews
        .create(&viewer, school.id, 5.0, "Again".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateReview(_)));

    let reviews = store.reviews_for_school(school.id).await.unwrap();
    assert_eq!(reviews.len(), 1);
}

#[tokio::test]
async fn rating_tracks_the_review_set() {
    let (directory, _store, _dir) = setup().await;
    let a = register(&directory, "a@example.com", "A").await;
    let b = register(&directory, "b@example.com", "B").await;
    let viewer_a = viewer_for(&a);
    let viewer_b = viewer_for(&b);
    let school = directory
        .schools
        .create(&viewer_a, profile("Abcdef College"))
        .await
        .unwrap()
        .school;
    assert_eq!(school.rating, 0.0);

    directory
        .reviews
        .create(&viewer_a, school.id, 5.0, "Great".to_string())
        .await
        .unwrap();
    let review_b = directory
        .reviews
        .create(&viewer_b, school.id, 2.0, "Meh".to_string())
        .await
        .unwrap();

    let details = directory.schools.get(school.id).await.unwrap();
    assert_eq!(details.school.rating, 3.5);

    // Delete one review; the cached rating is recomputed from what remains.
    directory
        .reviews
        .delete(&viewer_b, school.id, review_b.id)
        .await
        .unwrap();
    let details = directory.schools.get(school.id).await.unwrap();
    assert_eq!(details.school.rating, 5.0);
}

#[tokio::test]
async fn review_update_recomputes_rating() {
    let (directory, _store, _dir) = setup().await;
    let user = register(&directory, "u@example.com", "U").await;
    let viewer = viewer_for(&user);
    let school = directory
        .schools
        .create(&viewer, profile("Abcdef College"))
        .await
        .unwrap()
        .school;

    let review = directory
        .reviews
        .create(&viewer, school.id, 2.0, "Early days".to_string())
        .await
        .unwrap();
    directory
        .reviews
        .update(&viewer, school.id, review.id, 4.0, "Improved".to_string())
        .await
        .unwrap();

    let details = directory.schools.get(school.id).await.unwrap();
    assert_eq!(details.school.rating, 4.0);
}

#[tokio::test]
async fn ownership_guard_distinguishes_not_found_from_forbidden() {
    let (directory, _store, _dir) = setup().await;
    let author = register(&directory, "author@example.com", "Author").await;
    let other = register(&directory, "other@example.com", "Other").await;
    let viewer = viewer_for(&author);
    let school = directory
        .schools
        .create(&viewer, profile("Abcdef College"))
        .await
        .unwrap()
        .school;
    let review = directory
        .reviews
        .create(&viewer, school.id, 3.0, "Fine".to_string())
        .await
        .unwrap();

    let err = directory
        .reviews
        .ensure_owner(author.id, 99_999)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = directory
        .reviews
        .ensure_owner(other.id, review.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    assert!(directory.reviews.ensure_owner(author.id, review.id).await.is_ok());
}

#[tokio::test]
async fn school_admin_may_delete_another_users_review() {
    let (directory, _store, _dir) = setup().await;
    let author = register(&directory, "author@example.com", "Author").await;
    let admin = directory
        .users
        .register(
            "admin@example.com".to_string(),
            "Admin".to_string(),
            Some("spower".to_string()),
        )
        .await
        .unwrap();
    assert!(admin.is_school_admin);

    let author_viewer = viewer_for(&author);
    let admin_viewer = viewer_for(&admin).with_school_admin();
    let school = directory
        .schools
        .create(&author_viewer, profile("Abcdef College"))
        .await
        .unwrap()
        .school;
    let review = directory
        .reviews
        .create(&author_viewer, school.id, 1.0, "Bad".to_string())
        .await
        .unwrap();

    directory
        .reviews
        .delete(&admin_viewer, school.id, review.id)
        .await
        .unwrap();
    let details = directory.schools.get(school.id).await.unwrap();
    assert!(details.reviews.is_empty());
    assert_eq!(details.school.rating, 0.0);
}

#[tokio::test]
async fn concurrent_sequence_allocations_never_repeat() {
    let (_directory, store, _dir) = setup().await;
    let allocator = SequenceAllocator::new(store.clone());

    let calls: Vec<_> = (0..16).map(|_| allocator.next()).collect();
    let mut values: Vec<i64> = futures::future::join_all(calls)
        .await
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();

    values.sort_unstable();
    values.dedup();
    assert_eq!(values.len(), 16);
}

#[tokio::test]
async fn sequence_continues_across_store_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("directory.db").display());

    let store = DirectoryStore::new(&url, 8).await.unwrap();
    store.init().await.unwrap();
    assert_eq!(store.next_sequence().await.unwrap(), 1);
    assert_eq!(store.next_sequence().await.unwrap(), 2);
    drop(store);

    let reopened = DirectoryStore::new(&url, 8).await.unwrap();
    reopened.init().await.unwrap();
    assert_eq!(reopened.next_sequence().await.unwrap(), 3);
}

#[tokio::test]
async fn following_twice_reports_already_following() {
    let (directory, store, _dir) = setup().await;
    let a = register(&directory, "a@example.com", "A").await;
    let b = register(&directory, "b@example.com", "B").await;

    directory.follows.follow(a.id, b.id).await.unwrap();
    let err = directory.follows.follow(a.id, b.id).await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyFollowing(_)));

    let followers = store.followers_of(b.id).await.unwrap();
    assert_eq!(followers, vec![a.id]);
}

#[tokio::test]
async fn following_a_missing_user_is_not_found() {
    let (directory, _store, _dir) = setup().await;
    let a = register(&directory, "a@example.com", "A").await;

    let err = directory.follows.follow(a.id, 99_999).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn fanout_skips_failed_recipient_and_delivers_the_rest() {
    let (directory, store, _dir) = setup().await;
    let mut users = Vec::new();
    for i in 1..=4 {
        users.push(register(&directory, &format!("u{}@example.com", i), "U").await);
    }
    let bogus = 99_999;
    let recipients = vec![users[0].id, users[1].id, bogus, users[2].id, users[3].id];

    let event = FanoutEvent {
        kind: EventKind::Announcement,
        id: 7,
        name: "Results".to_string(),
        actor_email: "dean@ice.edu".to_string(),
    };
    let report = NotificationFanout::new(store.clone())
        .fan_out(&event, &recipients)
        .await;

    assert_eq!(report.delivered, 4);
    assert_eq!(report.failed, vec![bogus]);

    for user in &users {
        let inbox = store.notifications_for_user(user.id).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].event, event);
        assert!(!inbox[0].is_read);
    }
}

#[tokio::test]
async fn school_creation_mints_identity_and_notifies_followers() {
    let (directory, _store, _dir) = setup().await;
    let creator = register(&directory, "creator@example.com", "Creator").await;
    let f1 = register(&directory, "f1@example.com", "F One").await;
    let f2 = register(&directory, "f2@example.com", "F Two").await;
    directory.follows.follow(f1.id, creator.id).await.unwrap();
    directory.follows.follow(f2.id, creator.id).await.unwrap();

    let created = directory
        .schools
        .create(&viewer_for(&creator), profile("Abcdef College"))
        .await
        .unwrap();

    assert_eq!(created.school.username, "AbcICE1");
    assert_eq!(created.school.email, "AbcICE1@ice.edu");
    assert_eq!(created.fanout.delivered, 2);
    assert!(created.fanout.is_complete());

    for follower in [&f1, &f2] {
        let inbox = directory.inbox.list(&viewer_for(follower)).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].event.kind, EventKind::NewSchool);
        assert_eq!(inbox[0].event.id, created.school.id);
        assert_eq!(inbox[0].event.name, "Abcdef College");
    }
}

#[tokio::test]
async fn announcement_fanout_reaches_author_followers_only() {
    let (directory, _store, _dir) = setup().await;
    let author = register(&directory, "author@example.com", "Author").await;
    let follower = register(&directory, "f@example.com", "F").await;
    let bystander = register(&directory, "b@example.com", "B").await;
    directory.follows.follow(follower.id, author.id).await.unwrap();

    let created = directory
        .announcements
        .create(
            &viewer_for(&author),
            "Exam schedule".to_string(),
            Some("Posted on the board".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(created.fanout.delivered, 1);

    let inbox = directory.inbox.list(&viewer_for(&follower)).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].event.kind, EventKind::Announcement);
    assert_eq!(inbox[0].event.id, created.announcement.id);

    let inbox = directory.inbox.list(&viewer_for(&bystander)).await.unwrap();
    assert!(inbox.is_empty());
}

#[tokio::test]
async fn inbox_is_newest_first_and_owner_gated() {
    let (directory, store, _dir) = setup().await;
    let author = register(&directory, "author@example.com", "Author").await;
    let follower = register(&directory, "f@example.com", "F").await;
    let other = register(&directory, "o@example.com", "O").await;
    directory.follows.follow(follower.id, author.id).await.unwrap();

    let viewer = viewer_for(&author);
    directory
        .announcements
        .create(&viewer, "First".to_string(), None)
        .await
        .unwrap();
    directory
        .announcements
        .create(&viewer, "Second".to_string(), None)
        .await
        .unwrap();

    let inbox = directory.inbox.list(&viewer_for(&follower)).await.unwrap();
    assert_eq!(inbox.len(), 2);
    assert_eq!(inbox[0].event.name, "Second");
    assert_eq!(inbox[1].event.name, "First");

    // Only the inbox owner may mark a notification read.
    let err = directory
        .inbox
        .mark_read(&viewer_for(&other), inbox[0].id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let marked = directory
        .inbox
        .mark_read(&viewer_for(&follower), inbox[0].id)
        .await
        .unwrap();
    assert!(marked.is_read);
    let inbox = store.notifications_for_user(follower.id).await.unwrap();
    assert!(inbox[0].is_read);
}

#[tokio::test]
async fn school_delete_cascades_and_requires_admin() {
    let (directory, store, _dir) = setup().await;
    let user = register(&directory, "u@example.com", "U").await;
    let viewer = viewer_for(&user);
    let school = directory
        .schools
        .create(&viewer, profile("Abcdef College"))
        .await
        .unwrap()
        .school;
    directory
        .reviews
        .create(&viewer, school.id, 4.0, "Good".to_string())
        .await
        .unwrap();
    let program = directory
        .programs
        .create(school.id, "Physics".to_string(), None)
        .await
        .unwrap();
    directory
        .semesters
        .create(program.id, "Fall 2026".to_string(), None, None, None)
        .await
        .unwrap();

    let err = directory.schools.delete(&viewer, school.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let admin_viewer = viewer.clone().with_school_admin();
    directory.schools.delete(&admin_viewer, school.id).await.unwrap();

    assert!(store.get_school(school.id).await.unwrap().is_none());
    assert!(store.reviews_for_school(school.id).await.unwrap().is_empty());
    assert!(store.programs_for_school(school.id).await.unwrap().is_empty());
    assert!(store
        .semesters_for_program(program.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn registration_grants_capabilities_from_admin_codes() {
    let (directory, _store, _dir) = setup().await;

    let plain = register(&directory, "plain@example.com", "Plain").await;
    assert!(!plain.is_school_admin && !plain.is_class_admin);

    let school_admin = directory
        .users
        .register(
            "sa@example.com".to_string(),
            "SA".to_string(),
            Some("spower".to_string()),
        )
        .await
        .unwrap();
    assert!(school_admin.is_school_admin);

    let class_admin = directory
        .users
        .register(
            "ca@example.com".to_string(),
            "CA".to_string(),
            Some("cpower".to_string()),
        )
        .await
        .unwrap();
    assert!(class_admin.is_class_admin);

    let err = directory
        .users
        .register(
            "plain@example.com".to_string(),
            "Dup".to_string(),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}
