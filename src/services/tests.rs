use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, SystemTime};
use crate::errors::StatusError;
use crate::models::{CreatorEntry, Roster};
use crate::services::user_list::UserListStore;
use crate::services::{adhoc_entries, get_status, merge_statuses, parse_login_list};
use crate::testing::{sample_stream, sample_user, state_with, FakeTwitchApi};

fn roster() -> Roster {
    Roster::new(
        "moikapy",
        vec![
            CreatorEntry {
                login: "artcade".to_string(),
                affiliate: true,
                affiliate_code: Some("ARTCADE10".to_string()),
            },
            CreatorEntry::plain("QuietOne"),
        ],
    )
}

fn fake_api() -> FakeTwitchApi {
    FakeTwitchApi::new(
        vec![
            sample_user("Moikapy", "MoikaPy"),
            sample_user("artcade", "Artcade"),
            sample_user("quietone", "QuietOne"),
            sample_user("foo", "Foo"),
        ],
        vec![sample_stream("moikapy", 120), sample_stream("ArtCade", 40)],
    )
}

fn unused_store() -> UserListStore {
    UserListStore::new("user_added_streamers.json")
}

#[test]
fn test_merge_marks_live_and_missing_entries() {
    let entries = vec![
        CreatorEntry::plain("moikapy"),
        CreatorEntry::plain("ghost"),
    ];
    let statuses = merge_statuses(
        &entries,
        vec![sample_user("MOIKAPY", "MoikaPy")],
        vec![sample_stream("MoikaPy", 12)],
        false,
    );

    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[0].login, "moikapy");
    assert!(statuses[0].live);
    assert_eq!(statuses[0].stream.as_ref().unwrap().viewer_count, 12);
    assert_eq!(statuses[0].user.as_ref().unwrap().display_name, "MoikaPy");

    assert_eq!(statuses[1].login, "ghost");
    assert!(!statuses[1].live);
    assert!(statuses[1].stream.is_none());
    assert!(statuses[1].user.is_none());
}

#[test]
fn test_merge_attaches_affiliate_details() {
    let roster = roster();
    let statuses = merge_statuses(roster.entries(), Vec::new(), Vec::new(), false);

    let artcade = statuses.iter().find(|s| s.login == "artcade").unwrap();
    assert!(artcade.affiliate);
    assert_eq!(artcade.affiliate_code.as_deref(), Some("ARTCADE10"));
    assert!(!artcade.user_added);

    let quiet = statuses.iter().find(|s| s.login == "quietone").unwrap();
    assert!(!quiet.affiliate);
    assert!(quiet.affiliate_code.is_none());
}

#[test]
fn test_adhoc_entries_are_canonical_and_unique() {
    let logins = parse_login_list("Foo, bar,,FOO , ").unwrap();
    let entries = adhoc_entries(&logins);
    let logins: Vec<&str> = entries.iter().map(|e| e.login.as_str()).collect();
    assert_eq!(logins, vec!["foo", "bar"]);
    assert!(entries.iter().all(|e| !e.affiliate && e.affiliate_code.is_none()));
}

#[test]
fn test_login_list_rejects_invalid_items() {
    assert!(matches!(parse_login_list("foo,bad!name"), Err(StatusError::InvalidLogin(_))));
    assert!(matches!(parse_login_list("foo,../etc"), Err(StatusError::InvalidLogin(_))));
    assert_eq!(parse_login_list(" , ,").unwrap(), Vec::<String>::new());
}

#[test]
fn test_login_list_is_capped() {
    let at_cap: Vec<String> = (0..100).map(|i| format!("creator_{}", i)).collect();
    assert_eq!(parse_login_list(&at_cap.join(",")).unwrap().len(), 100);

    let over_cap: Vec<String> = (0..101).map(|i| format!("creator_{}", i)).collect();
    assert_eq!(
        parse_login_list(&over_cap.join(",")),
        Err(StatusError::TooManyLogins(101))
    );
}

#[tokio::test]
async fn test_case_folded_login_yields_same_status() {
    let state = state_with(Arc::new(fake_api()), roster(), Duration::from_secs(60), unused_store());

    let upper = get_status(&state, Some(vec!["ArtCade".to_string()])).await.unwrap();
    let lower = get_status(&state, Some(vec!["artcade".to_string()])).await.unwrap();

    assert_eq!(upper, lower);
    assert!(upper[0].live);
}

#[tokio::test]
async fn test_cached_aggregate_is_reused_within_ttl() {
    let api = Arc::new(fake_api());
    let state = state_with(api.clone(), roster(), Duration::from_secs(60), unused_store());

    let first = get_status(&state, None).await.unwrap();
    let second = get_status(&state, None).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(api.calls(), (1, 1));
    assert_eq!(first.len(), 3);
    assert_eq!(first[0].login, "moikapy");
    assert!(first.iter().all(|s| !s.user_added));
}

#[tokio::test]
async fn test_expired_aggregate_triggers_one_refresh() {
    let api = Arc::new(fake_api());
    let state = state_with(api.clone(), roster(), Duration::from_secs(60), unused_store());

    let first = get_status(&state, None).await.unwrap();
    {
        let mut entry = state.status_cache.entry.lock().await;
        entry.as_mut().unwrap().expires_at = SystemTime::now() - Duration::from_secs(1);
    }

    let refreshed = get_status(&state, None).await.unwrap();
    let again = get_status(&state, None).await.unwrap();

    assert!(!Arc::ptr_eq(&first, &refreshed));
    assert!(Arc::ptr_eq(&refreshed, &again));
    assert_eq!(api.calls(), (2, 2));
}

#[tokio::test]
async fn test_concurrent_requests_share_one_refresh() {
    let api = Arc::new(FakeTwitchApi {
        delay: Some(Duration::from_millis(50)),
        ..fake_api()
    });
    let state = state_with(api.clone(), roster(), Duration::from_secs(60), unused_store());

    let results = futures::future::join_all((0..8).map(|_| get_status(&state, None))).await;

    assert_eq!(api.calls(), (1, 1));
    let first = results[0].as_ref().unwrap();
    for result in &results {
        assert!(Arc::ptr_eq(first, result.as_ref().unwrap()));
    }
}

#[tokio::test]
async fn test_adhoc_lookup_bypasses_and_preserves_cache() {
    let api = Arc::new(fake_api());
    let state = state_with(api.clone(), roster(), Duration::from_secs(60), unused_store());

    let adhoc = get_status(&state, Some(vec!["foo".to_string()])).await.unwrap();
    assert!(state.status_cache.entry.lock().await.is_none());
    assert_eq!(api.calls(), (1, 1));

    let shared = get_status(&state, None).await.unwrap();
    let adhoc_again = get_status(&state, Some(vec!["foo".to_string(), "bar".to_string()])).await.unwrap();
    let shared_again = get_status(&state, None).await.unwrap();

    assert_eq!(api.calls(), (3, 3));
    assert!(Arc::ptr_eq(&shared, &shared_again));
    assert_eq!(adhoc.len(), 1);
    assert_eq!(adhoc_again.len(), 2);
}

#[tokio::test]
async fn test_adhoc_offline_creator() {
    let state = state_with(Arc::new(fake_api()), roster(), Duration::from_secs(60), unused_store());

    let statuses = get_status(&state, Some(vec!["foo".to_string()])).await.unwrap();

    assert_eq!(statuses.len(), 1);
    let foo = &statuses[0];
    assert_eq!(foo.login, "foo");
    assert!(!foo.live);
    assert!(foo.stream.is_none());
    assert_eq!(foo.user.as_ref().unwrap().login, "foo");
    assert!(!foo.affiliate);
    assert!(foo.affiliate_code.is_none());
    assert!(foo.user_added);
}

#[tokio::test]
async fn test_empty_adhoc_list_skips_upstream() {
    let api = Arc::new(fake_api());
    let state = state_with(api.clone(), roster(), Duration::from_secs(60), unused_store());

    let statuses = get_status(&state, Some(parse_login_list("").unwrap())).await.unwrap();

    assert!(statuses.is_empty());
    assert_eq!(api.calls(), (0, 0));
}

#[tokio::test]
async fn test_upstream_failure_fails_whole_aggregation() {
    let api = Arc::new(fake_api());
    api.fail.store(true, Ordering::SeqCst);
    let state = state_with(api.clone(), roster(), Duration::from_secs(60), unused_store());

    let result = get_status(&state, None).await;

    assert!(matches!(result, Err(StatusError::Upstream(_))));
    assert!(state.status_cache.entry.lock().await.is_none());

    api.fail.store(false, Ordering::SeqCst);
    let recovered = get_status(&state, None).await.unwrap();
    assert_eq!(recovered.len(), 3);
}
