use super::*;
use crate::backend::tests::mock_backend;

const LANGUAGES: &str = r#"{"languages":[{"code":"en"},{"code":"es"},{"code":"ru"}]}"#;

struct Fixture {
    _dir: tempfile::TempDir,
    backend: Backend,
    settings: SettingsStore,
    pending: PendingActions,
}

impl Fixture {
    fn new(server: &mockito::Server) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let settings = SettingsStore::new(dir.path().join("user_settings.json"), "en");
        Self {
            _dir: dir,
            backend: mock_backend(server),
            settings,
            pending: PendingActions::new(None),
        }
    }

    async fn run(&self, text: &str) -> String {
        let cmd = Command::parse(text).expect("not a command");
        let ctx = CommandContext {
            backend: &self.backend,
            settings: &self.settings,
            pending: &self.pending,
            bot_name: "Tolmach",
            sender_id: 7,
            text,
        };
        handle(cmd, &ctx).await
    }
}

#[test]
fn test_parse_all_commands() {
    assert_eq!(Command::parse("/start"), Some(Command::Start));
    assert_eq!(Command::parse("/help"), Some(Command::Help));
    assert_eq!(Command::parse("/detect"), Some(Command::Detect));
    assert_eq!(Command::parse("/setlang es"), Some(Command::SetLang));
    assert_eq!(Command::parse("/lang"), Some(Command::SetLang));
    assert_eq!(Command::parse("/cancel"), Some(Command::Cancel));
}

#[test]
fn test_parse_strips_bot_suffix() {
    assert_eq!(
        Command::parse("/setlang@tolmach_bot de"),
        Some(Command::SetLang)
    );
    assert_eq!(Command::parse("/help@tolmach_bot"), Some(Command::Help));
}

#[test]
fn test_parse_non_commands() {
    assert_eq!(Command::parse("hello"), None);
    assert_eq!(Command::parse("/unknown"), None);
    assert_eq!(Command::parse(""), None);
    assert_eq!(Command::parse("   "), None);
}

#[tokio::test]
async fn test_help_lists_commands() {
    let server = mockito::Server::new_async().await;
    let f = Fixture::new(&server);
    let reply = f.run("/start").await;
    for cmd in ["/detect", "/setlang", "/cancel"] {
        assert!(reply.contains(cmd), "help is missing {cmd}");
    }
    assert_eq!(reply, f.run("/help").await);
}

#[tokio::test]
async fn test_detect_arms_and_cancel_disarms() {
    let server = mockito::Server::new_async().await;
    let f = Fixture::new(&server);

    assert_eq!(f.run("/cancel").await, replies::NOTHING_TO_CANCEL);
    assert_eq!(f.run("/detect").await, replies::DETECT_ARMED);
    assert!(f.pending.is_detect(7));
    assert_eq!(f.run("/cancel").await, replies::CANCELLED);
    assert!(!f.pending.is_detect(7));
}

#[tokio::test]
async fn test_setlang_without_argument_shows_current() {
    let server = mockito::Server::new_async().await;
    let f = Fixture::new(&server);
    assert!(f.run("/setlang").await.contains("<b>en</b>"));
}

#[tokio::test]
async fn test_setlang_supported_persists() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/languages")
        .with_status(200)
        .with_body(LANGUAGES)
        .create_async()
        .await;
    let f = Fixture::new(&server);

    let reply = f.run("/setlang ES").await;
    assert_eq!(reply, replies::target_set("es"));
    assert_eq!(f.settings.get(7).unwrap().target_language, "es");
    assert!(f.run("/lang").await.contains("<b>es</b>"));
}

#[tokio::test]
async fn test_setlang_unsupported_is_rejected_without_write() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/languages")
        .with_status(200)
        .with_body(LANGUAGES)
        .create_async()
        .await;
    let f = Fixture::new(&server);

    let reply = f.run("/setlang xx").await;
    assert_eq!(reply, replies::unsupported_language("xx"));
    assert_eq!(f.settings.get(7).unwrap().target_language, "en");
    assert!(!f.settings.path().exists());
}

#[tokio::test]
async fn test_setlang_catalog_down_uses_fallback_set() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/languages")
        .with_status(503)
        .create_async()
        .await;
    let f = Fixture::new(&server);

    assert_eq!(f.run("/setlang ru").await, replies::target_set("ru"));
    assert_eq!(f.run("/setlang es").await, replies::unsupported_language("es"));
}
