use std::path::Path;

use chrono::NaiveDate;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::test_support::{test_client, test_config};

const LISTING_PATH: &str = "/ads/3";

fn run_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 14)
        .unwrap()
        .and_hms_opt(6, 0, 0)
        .unwrap()
}

fn profile_url(server: &MockServer, id: &str) -> String {
    format!("{}/ads/details/{id}", server.uri())
}

fn listing_html(ids: &[&str]) -> String {
    let anchors: String = ids
        .iter()
        .map(|id| format!(r#"<a href="/ads/details/{id}">Ad {id}</a>"#))
        .collect();
    format!(r#"<html><body><a href="/ads/1">Other section</a>{anchors}</body></html>"#)
}

fn profile_html(id: &str) -> String {
    format!(
        r##"<html><body><div class="webpanelcontent3">
            <a href="#">Title {id}</a>
            <div class="row">Posted by: <a href="/users/{id}">user{id}</a></div>
            <div class="ad-thumbnail-image"><img src="/uploads/{id}/a.jpg"></div>
        </div></body></html>"##
    )
}

const EXHAUSTED_HTML: &str =
    r#"<html><body><div id="info_message">No ads were found in this category.</div></body></html>"#;

async fn mount_listing(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_profile(server: &MockServer, id: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/ads/details/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(profile_html(id)))
        .mount(server)
        .await;
}

fn listing(server: &MockServer) -> String {
    format!("{}{LISTING_PATH}", server.uri())
}

fn database_urls(config: &AppConfig) -> Vec<String> {
    ProfileDatabase::new(config.database_path())
        .read_all()
        .unwrap()
        .into_iter()
        .map(|record| record.url)
        .collect()
}

fn snapshot_urls(path: &Path) -> Vec<String> {
    ProfileDatabase::new(path)
        .read_all()
        .unwrap()
        .into_iter()
        .map(|record| record.url)
        .collect()
}

fn seed_database(config: &AppConfig, urls: &[String]) -> KnownProfiles {
    let day = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();
    let records: Vec<ProfileRecord> = urls
        .iter()
        .map(|url| ProfileRecord::empty(url.clone(), day))
        .collect();
    let database = ProfileDatabase::new(config.database_path());
    let mut known = KnownProfiles::new();
    database.append(&mut known, &records).unwrap();
    database.load_known().unwrap()
}

#[tokio::test]
async fn known_profiles_are_excluded_from_snapshot() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&listing(&server), dir.path());

    let (a, b, c, d) = (
        profile_url(&server, "A"),
        profile_url(&server, "B"),
        profile_url(&server, "C"),
        profile_url(&server, "D"),
    );
    let mut known = seed_database(&config, &[a.clone(), b.clone()]);

    mount_listing(&server, LISTING_PATH, listing_html(&["A", "B", "C", "D"])).await;
    mount_profile(&server, "C").await;
    mount_profile(&server, "D").await;
    Mock::given(method("GET"))
        .and(path("/ads/details/A"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let report = run_once(&config, &test_client(), &mut known, run_time())
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Done);
    assert_eq!(report.links_found, 4);
    assert_eq!(report.candidates, 2);
    assert_eq!(report.new_profiles, 2);
    assert_eq!(report.summary(), "found 2 new profiles");

    let snapshot = report.snapshot.expect("snapshot should be written");
    assert_eq!(
        snapshot,
        dir.path().join("new_profiles_2026_10_14.csv")
    );
    assert_eq!(snapshot_urls(&snapshot), vec![c.clone(), d.clone()]);
    assert_eq!(database_urls(&config), vec![a.clone(), b.clone(), c.clone(), d.clone()]);

    assert_eq!(known.len(), 4);
    for url in [&a, &b, &c, &d] {
        assert!(known.contains(url), "{url} should be known");
    }
}

#[tokio::test]
async fn recorded_profiles_carry_extracted_fields() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&listing(&server), dir.path());
    mount_listing(&server, LISTING_PATH, listing_html(&["7"])).await;
    mount_profile(&server, "7").await;

    let mut known = KnownProfiles::new();
    run_once(&config, &test_client(), &mut known, run_time())
        .await
        .unwrap();

    let records = ProfileDatabase::new(config.database_path()).read_all().unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.title, "Title 7");
    assert_eq!(record.username, "user7");
    assert_eq!(
        record.image_urls,
        vec![format!("{}/uploads/7/a.jpg", server.uri())]
    );
    assert_eq!(record.scrape_date, run_time().date());
}

#[tokio::test]
async fn second_run_without_new_links_changes_nothing() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&listing(&server), dir.path());
    mount_listing(&server, LISTING_PATH, listing_html(&["1", "2"])).await;
    Mock::given(method("GET"))
        .and(path("/ads/details/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(profile_html("1")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ads/details/2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(profile_html("2")))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client();
    let database = ProfileDatabase::new(config.database_path());
    let mut known = database.load_known().unwrap();
    let first = run_once(&config, &client, &mut known, run_time())
        .await
        .unwrap();
    assert_eq!(first.new_profiles, 2);

    let database_before = std::fs::read(config.database_path()).unwrap();
    let snapshot_path = first.snapshot.unwrap();
    let snapshot_before = std::fs::read(&snapshot_path).unwrap();
    let index_before = std::fs::read(config.link_index_path()).unwrap();

    let mut known = database.load_known().unwrap();
    let second = run_once(&config, &client, &mut known, run_time())
        .await
        .unwrap();

    assert_eq!(second.new_profiles, 0);
    assert_eq!(second.candidates, 0);
    assert!(second.snapshot.is_none());
    assert_eq!(second.link_index, Some(LinkIndexUpdate::Appended(0)));
    assert_eq!(second.summary(), "found 0 new profiles");
    assert_eq!(std::fs::read(config.database_path()).unwrap(), database_before);
    assert_eq!(std::fs::read(&snapshot_path).unwrap(), snapshot_before);
    assert_eq!(std::fs::read(config.link_index_path()).unwrap(), index_before);
}

#[tokio::test]
async fn failed_profile_does_not_block_others() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&listing(&server), dir.path());
    mount_listing(&server, LISTING_PATH, listing_html(&["1", "2", "3"])).await;
    mount_profile(&server, "1").await;
    Mock::given(method("GET"))
        .and(path("/ads/details/2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_profile(&server, "3").await;

    let mut known = KnownProfiles::new();
    let report = run_once(&config, &test_client(), &mut known, run_time())
        .await
        .unwrap();

    let failed = profile_url(&server, "2");
    assert_eq!(report.new_profiles, 2);
    assert_eq!(report.failed, vec![failed.clone()]);
    assert_eq!(report.summary(), "found 2 new profiles (1 failed)");
    assert_eq!(
        database_urls(&config),
        vec![profile_url(&server, "1"), profile_url(&server, "3")]
    );
    // The failed profile is retried next run.
    assert!(!known.contains(&failed));
}

#[tokio::test]
async fn listing_failure_aborts_without_writing() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&listing(&server), dir.path());
    let mut known = seed_database(&config, &[profile_url(&server, "1")]);
    let before = std::fs::read(config.database_path()).unwrap();

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = run_once(&config, &test_client(), &mut known, run_time()).await;

    let err = result.expect_err("listing failure should abort the run");
    assert!(
        format!("{err:#}").contains("failed to fetch listing page"),
        "unexpected error: {err:#}"
    );
    assert_eq!(std::fs::read(config.database_path()).unwrap(), before);
    assert!(!config.link_index_path().exists());
    assert!(!dir.path().join("new_profiles_2026_10_14.csv").exists());
    assert_eq!(known.len(), 1);
}

#[tokio::test]
async fn empty_listing_reports_zero_and_writes_nothing() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&listing(&server), dir.path());
    mount_listing(&server, LISTING_PATH, listing_html(&[])).await;

    let mut known = KnownProfiles::new();
    let report = run_once(&config, &test_client(), &mut known, run_time())
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Done);
    assert_eq!(report.new_profiles, 0);
    assert!(report.snapshot.is_none());
    assert!(!config.database_path().exists());
    assert!(!config.link_index_path().exists());
}

#[tokio::test]
async fn repeated_listing_link_is_fetched_once() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&listing(&server), dir.path());
    let body = format!(
        r#"<html><body>
            <a href="/ads/details/1">Ad</a>
            <a href="/ads/details/1#photos">Photos</a>
            <a href="{}/ads/details/1">Again</a>
        </body></html>"#,
        server.uri()
    );
    mount_listing(&server, LISTING_PATH, body).await;
    Mock::given(method("GET"))
        .and(path("/ads/details/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(profile_html("1")))
        .expect(1)
        .mount(&server)
        .await;

    let mut known = KnownProfiles::new();
    let report = run_once(&config, &test_client(), &mut known, run_time())
        .await
        .unwrap();

    assert_eq!(report.links_found, 1);
    assert_eq!(report.new_profiles, 1);
    assert_eq!(database_urls(&config).len(), 1);
}

#[tokio::test]
async fn pagination_stops_at_exhausted_page() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&listing(&server), dir.path());
    config.listing_max_pages = 5;

    mount_listing(&server, LISTING_PATH, listing_html(&["1", "2"])).await;
    mount_listing(&server, "/ads/3/2", listing_html(&["2", "3"])).await;
    mount_listing(&server, "/ads/3/3", EXHAUSTED_HTML.to_string()).await;
    Mock::given(method("GET"))
        .and(path("/ads/3/4"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    for id in ["1", "2", "3"] {
        mount_profile(&server, id).await;
    }

    let mut known = KnownProfiles::new();
    let report = run_once(&config, &test_client(), &mut known, run_time())
        .await
        .unwrap();

    assert_eq!(report.links_found, 3);
    assert_eq!(report.new_profiles, 3);

    let rows = LinkIndex::new(config.link_index_path()).rows().unwrap();
    let pages: Vec<(&str, &str)> = rows
        .iter()
        .map(|row| (row[0].as_str(), row[2].as_str()))
        .collect();
    let (one, two, three) = (
        profile_url(&server, "1"),
        profile_url(&server, "2"),
        profile_url(&server, "3"),
    );
    assert_eq!(
        pages,
        vec![(one.as_str(), "1"), (two.as_str(), "1"), (three.as_str(), "2")]
    );
}

#[tokio::test]
async fn pagination_stops_after_consecutive_empty_pages() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&listing(&server), dir.path());
    config.listing_max_pages = 10;

    mount_listing(&server, LISTING_PATH, listing_html(&["1"])).await;
    for page in 2..=4 {
        mount_listing(&server, &format!("/ads/3/{page}"), listing_html(&[])).await;
    }
    Mock::given(method("GET"))
        .and(path("/ads/3/5"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    mount_profile(&server, "1").await;

    let mut known = KnownProfiles::new();
    let report = run_once(&config, &test_client(), &mut known, run_time())
        .await
        .unwrap();

    assert_eq!(report.links_found, 1);
    assert_eq!(report.new_profiles, 1);
}

#[tokio::test]
async fn later_listing_page_failure_keeps_earlier_links() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&listing(&server), dir.path());
    config.listing_max_pages = 3;

    mount_listing(&server, LISTING_PATH, listing_html(&["1"])).await;
    Mock::given(method("GET"))
        .and(path("/ads/3/2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ads/3/3"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    mount_profile(&server, "1").await;

    let mut known = KnownProfiles::new();
    let report = run_once(&config, &test_client(), &mut known, run_time())
        .await
        .unwrap();

    assert_eq!(report.new_profiles, 1);
    assert_eq!(database_urls(&config), vec![profile_url(&server, "1")]);
}

#[tokio::test]
async fn unreadable_link_index_does_not_stop_run() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&listing(&server), dir.path());
    std::fs::write(config.link_index_path(), b"not a workbook").unwrap();
    mount_listing(&server, LISTING_PATH, listing_html(&["1"])).await;
    mount_profile(&server, "1").await;

    let mut known = KnownProfiles::new();
    let report = run_once(&config, &test_client(), &mut known, run_time())
        .await
        .unwrap();

    assert_eq!(report.link_index, Some(LinkIndexUpdate::Skipped));
    assert_eq!(report.new_profiles, 1);
    assert_eq!(
        std::fs::read(config.link_index_path()).unwrap(),
        b"not a workbook"
    );
}

#[tokio::test]
async fn database_write_failure_is_fatal() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&listing(&server), dir.path());
    // A directory in place of the database file makes the append fail.
    config.database_file = "db-dir".to_string();
    std::fs::create_dir(config.database_path()).unwrap();
    mount_listing(&server, LISTING_PATH, listing_html(&["1"])).await;
    mount_profile(&server, "1").await;

    let mut known = KnownProfiles::new();
    let result = run_once(&config, &test_client(), &mut known, run_time()).await;

    let err = result.expect_err("database write failure should abort the run");
    assert!(
        format!("{err:#}").contains("failed to append profiles"),
        "unexpected error: {err:#}"
    );
    assert!(known.is_empty());
    assert!(!dir.path().join("new_profiles_2026_10_14.csv").exists());
}

#[test]
fn first_listing_page_is_the_listing_itself() {
    let listing = Url::parse("https://a.example/ads/3?sort=new").unwrap();
    assert_eq!(listing_page_url(&listing, 1), listing);
}

#[test]
fn later_listing_pages_append_page_number() {
    let listing = Url::parse("https://a.example/ads/3?sort=new").unwrap();
    assert_eq!(
        listing_page_url(&listing, 2).as_str(),
        "https://a.example/ads/3/2?sort=new"
    );
    let trailing = Url::parse("https://a.example/ads/3/").unwrap();
    assert_eq!(
        listing_page_url(&trailing, 4).as_str(),
        "https://a.example/ads/3/4"
    );
}

#[test]
fn run_states_are_ordered() {
    let mut state = RunState::Start;
    for next in [
        RunState::ListingFetched,
        RunState::LinksFiltered,
        RunState::ProfilesProcessed,
        RunState::Written,
        RunState::Done,
    ] {
        state.advance(next);
    }
    assert_eq!(state, RunState::Done);
}
