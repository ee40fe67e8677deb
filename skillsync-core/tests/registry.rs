use skillsync_core::contract::MockRemoteTree;
use skillsync_core::registry::{
    fetch_metadata, parse_registry_locator, CategoryRelease, RegistryMetadata, RepoLocator,
    METADATA_PATH,
};

fn locator(owner: &str, repo: &str) -> Option<RepoLocator> {
    Some(RepoLocator {
        owner: owner.to_string(),
        repo: repo.to_string(),
    })
}

#[test]
fn github_urls_are_parsed() {
    assert_eq!(
        parse_registry_locator("https://github.com/HoangNguyen0403/agent-skills-standard"),
        locator("HoangNguyen0403", "agent-skills-standard")
    );
    assert_eq!(
        parse_registry_locator("https://github.com/acme/skills.git"),
        locator("acme", "skills")
    );
    assert_eq!(
        parse_registry_locator("git@github.com:acme/skills.git"),
        locator("acme", "skills")
    );
    assert_eq!(
        parse_registry_locator("https://GitHub.com/acme/skills/tree/main"),
        locator("acme", "skills")
    );
}

#[test]
fn other_hosts_are_unsupported() {
    assert_eq!(parse_registry_locator("https://gitlab.com/acme/skills"), None);
    assert_eq!(parse_registry_locator("https://github.com/acme"), None);
    assert_eq!(parse_registry_locator(""), None);
}

#[test]
fn pinned_ref_joins_prefix_and_version() {
    let mut metadata = RegistryMetadata::default();
    metadata.categories.insert(
        "flutter".to_string(),
        CategoryRelease {
            version: Some("1.2.0".to_string()),
            tag_prefix: Some("flutter-v".to_string()),
        },
    );
    metadata
        .categories
        .insert("draft".to_string(), CategoryRelease::default());

    assert_eq!(metadata.pinned_ref("flutter").as_deref(), Some("flutter-v1.2.0"));
    assert_eq!(metadata.pinned_ref("draft").as_deref(), Some("main"));
    assert_eq!(metadata.pinned_ref("unknown"), None);
}

#[tokio::test]
async fn metadata_is_read_from_the_registry() {
    let mut mock = MockRemoteTree::new();
    mock.expect_get_raw_file()
        .times(1)
        .returning(|owner, repo, reference, path| {
            let expected = owner == "acme" && repo == "skills" && reference == "main";
            (expected && path == METADATA_PATH).then(|| {
                r#"{
  "global_version": "1.0.0",
  "categories": {
    "flutter": { "version": "1.3.0", "tag_prefix": "flutter-v", "last_updated": "2025-01-01" },
    "golang": { "version": "0.9.0" }
  }
}"#
                .to_string()
            })
        });

    let locator = RepoLocator {
        owner: "acme".to_string(),
        repo: "skills".to_string(),
    };
    let metadata = fetch_metadata(&mock, &locator, "main").await;
    assert_eq!(metadata.pinned_ref("flutter").as_deref(), Some("flutter-v1.3.0"));
    assert_eq!(metadata.pinned_ref("golang").as_deref(), Some("0.9.0"));
}

#[tokio::test]
async fn missing_or_broken_metadata_is_empty() {
    let locator = RepoLocator {
        owner: "acme".to_string(),
        repo: "skills".to_string(),
    };

    let mut absent = MockRemoteTree::new();
    absent.expect_get_raw_file().returning(|_, _, _, _| None);
    assert_eq!(fetch_metadata(&absent, &locator, "main").await, RegistryMetadata::default());

    let mut broken = MockRemoteTree::new();
    broken
        .expect_get_raw_file()
        .returning(|_, _, _, _| Some("<html>".to_string()));
    assert_eq!(fetch_metadata(&broken, &locator, "main").await, RegistryMetadata::default());
}
