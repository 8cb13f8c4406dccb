use super::*;
use crate::backend::tests::mock_backend;
use crate::replies;
use async_trait::async_trait;
use mockito::Matcher;
use std::sync::Mutex;
use tolmach_core::{
    error::TolmachError,
    message::{CallbackQuery, ForwardOrigin, IncomingMessage, Media, MediaKind},
};

/// Channel that records everything sent through it.
#[derive(Default)]
struct RecordingChannel {
    sent: Mutex<Vec<OutgoingMessage>>,
    answered: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<mpsc::Receiver<Update>, TolmachError> {
        let (_tx, rx) = mpsc::channel(1);
        Ok(rx)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), TolmachError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: &str) -> Result<(), TolmachError> {
        self.answered
            .lock()
            .unwrap()
            .push((callback_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn stop(&self) -> Result<(), TolmachError> {
        Ok(())
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    channel: Arc<RecordingChannel>,
    gateway: Gateway,
}

impl Fixture {
    fn new(server: &mockito::Server) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let channel = Arc::new(RecordingChannel::default());
        let mut channels: HashMap<String, Arc<dyn Channel>> = HashMap::new();
        channels.insert("telegram".into(), channel.clone());
        let gateway = Gateway::new(
            channels,
            mock_backend(server),
            SettingsStore::new(dir.path().join("user_settings.json"), "en"),
            PendingActions::new(None),
            "Tolmach".into(),
        );
        Self {
            _dir: dir,
            channel,
            gateway,
        }
    }

    async fn message(&self, msg: IncomingMessage) {
        self.gateway.handle_update(Update::Message(msg)).await;
    }

    fn sent(&self) -> Vec<OutgoingMessage> {
        self.channel.sent.lock().unwrap().clone()
    }

    fn last(&self) -> OutgoingMessage {
        self.sent().pop().expect("nothing was sent")
    }
}

fn text_message(text: &str) -> IncomingMessage {
    IncomingMessage {
        id: uuid::Uuid::new_v4(),
        channel: "telegram".into(),
        sender_id: 7,
        sender_name: Some("@ada".into()),
        text: text.into(),
        timestamp: chrono::Utc::now(),
        message_id: Some(100),
        media: None,
        forward_origin: None,
        reply_target: Some("7".into()),
    }
}

fn photo_message(caption: &str) -> IncomingMessage {
    IncomingMessage {
        media: Some(Media {
            kind: MediaKind::Photo,
            file_id: "photo-1".into(),
        }),
        ..text_message(caption)
    }
}

fn translate_reply(text: &str, detected: &str) -> String {
    serde_json::json!({
        "translations": [{ "text": text, "detectedLanguageCode": detected }]
    })
    .to_string()
}

const LANGUAGES: &str = r#"{"languages":[{"code":"en"},{"code":"es"},{"code":"de"}]}"#;

#[tokio::test]
async fn test_text_is_translated_with_url_kept() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/translate")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "targetLanguageCode": "en",
            "texts": ["Mira esto @@URL0@@ sitio genial"]
        })))
        .with_status(200)
        .with_body(translate_reply("Check this out @@URL0@@ cool site", "es"))
        .create_async()
        .await;
    let f = Fixture::new(&server);

    f.message(text_message("Mira esto https://example.com sitio genial"))
        .await;

    let reply = f.last();
    assert_eq!(
        reply.text,
        "<b>Translated (es \u{2192} en):</b>\nCheck this out https://example.com cool site"
    );
    assert_eq!(reply.reply_target.as_deref(), Some("7"));
    assert_eq!(reply.reply_to, Some(100));
    assert!(reply.media.is_none());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_stored_target_language_is_used() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/translate")
        .match_body(Matcher::PartialJson(
            serde_json::json!({ "targetLanguageCode": "de" }),
        ))
        .with_status(200)
        .with_body(translate_reply("Hallo", "en"))
        .create_async()
        .await;
    let f = Fixture::new(&server);
    f.gateway.settings.set_target_language(7, "de").unwrap();

    f.message(text_message("Hello")).await;
    assert!(f.last().text.ends_with("\nHallo"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_forwarded_message_gets_header() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/translate")
        .with_status(200)
        .with_body(translate_reply("Hi", "ru"))
        .create_async()
        .await;
    let f = Fixture::new(&server);

    let msg = IncomingMessage {
        forward_origin: Some(ForwardOrigin::HiddenUser { name: None }),
        ..text_message("Привет")
    };
    f.message(msg).await;
    assert!(f
        .last()
        .text
        .starts_with("<i>\u{1f464} Anonymous</i>\n\n<b>Translated (ru \u{2192} en):</b>"));
}

#[tokio::test]
async fn test_empty_caption_resends_media_without_backend_call() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/translate")
        .expect(0)
        .create_async()
        .await;
    let f = Fixture::new(&server);

    f.message(photo_message("")).await;

    let reply = f.last();
    assert_eq!(reply.text, "");
    assert_eq!(reply.media.as_ref().map(|m| m.file_id.as_str()), Some("photo-1"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_caption_is_translated_and_media_resent() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/translate")
        .with_status(200)
        .with_body(translate_reply("Good morning", "fr"))
        .create_async()
        .await;
    let f = Fixture::new(&server);

    f.message(photo_message("Bonjour")).await;

    let reply = f.last();
    assert!(reply.text.ends_with("\nGood morning"));
    assert_eq!(reply.media.unwrap().kind, MediaKind::Photo);
}

#[tokio::test]
async fn test_empty_text_gets_notice() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/translate")
        .expect(0)
        .create_async()
        .await;
    let f = Fixture::new(&server);

    f.message(text_message("   ")).await;
    assert_eq!(f.last().text, replies::SEND_TEXT);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_backend_failure_gets_notice() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/translate")
        .with_status(500)
        .create_async()
        .await;
    let f = Fixture::new(&server);

    f.message(text_message("Hola")).await;
    assert_eq!(f.last().text, replies::TRANSLATE_FAILED);
}

#[tokio::test]
async fn test_detect_flow_offers_button() {
    let mut server = mockito::Server::new_async().await;
    let detect = server
        .mock("POST", "/detect")
        .match_body(Matcher::PartialJson(serde_json::json!({ "text": "Hola amigos" })))
        .with_status(200)
        .with_body(r#"{"languageCode":"es"}"#)
        .create_async()
        .await;
    let translate = server
        .mock("POST", "/translate")
        .expect(0)
        .create_async()
        .await;
    let f = Fixture::new(&server);

    f.message(text_message("/detect")).await;
    assert_eq!(f.last().text, replies::DETECT_ARMED);

    f.message(text_message("Hola amigos")).await;
    let reply = f.last();
    assert_eq!(reply.text, replies::detected("es"));
    assert_eq!(reply.buttons.len(), 1);
    assert_eq!(reply.buttons[0].label, replies::SET_AS_TARGET);
    assert_eq!(reply.buttons[0].data, "setlang:es");
    assert!(!f.gateway.pending.is_detect(7));

    detect.assert_async().await;
    translate.assert_async().await;
}

#[tokio::test]
async fn test_detect_consumes_media_without_text() {
    let mut server = mockito::Server::new_async().await;
    let detect = server
        .mock("POST", "/detect")
        .expect(0)
        .create_async()
        .await;
    let f = Fixture::new(&server);

    f.message(text_message("/detect")).await;
    f.message(photo_message("")).await;
    assert_eq!(f.last().text, replies::DETECT_NOTHING);
    assert!(!f.gateway.pending.is_detect(7));
    detect.assert_async().await;
}

#[tokio::test]
async fn test_detect_undetermined() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/detect")
        .with_status(200)
        .with_body(r#"{"languageCode":""}"#)
        .create_async()
        .await;
    let f = Fixture::new(&server);

    f.message(text_message("/detect")).await;
    f.message(text_message("???")).await;
    let reply = f.last();
    assert_eq!(reply.text, replies::DETECT_FAILED);
    assert!(reply.buttons.is_empty());
}

#[tokio::test]
async fn test_setlang_callback_persists_and_answers() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/languages")
        .with_status(200)
        .with_body(LANGUAGES)
        .create_async()
        .await;
    let f = Fixture::new(&server);

    let callback = CallbackQuery {
        id: "cb-1".into(),
        channel: "telegram".into(),
        sender_id: 7,
        reply_target: Some("7".into()),
        message_id: Some(101),
        data: "setlang:es".into(),
    };
    f.gateway.handle_update(Update::Callback(callback)).await;

    assert_eq!(f.gateway.settings.get(7).unwrap().target_language, "es");
    let answered = f.channel.answered.lock().unwrap().clone();
    assert_eq!(answered.len(), 1);
    assert_eq!(answered[0].0, "cb-1");
    let reply = f.last();
    assert_eq!(reply.text, replies::target_set("es"));
    assert_eq!(reply.reply_to, Some(101));
}

#[tokio::test]
async fn test_setlang_rejects_unsupported_code() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/languages")
        .with_status(200)
        .with_body(LANGUAGES)
        .create_async()
        .await;
    let f = Fixture::new(&server);

    f.message(text_message("/setlang xx")).await;
    assert_eq!(f.last().text, replies::unsupported_language("xx"));
    assert_eq!(f.gateway.settings.get(7).unwrap().target_language, "en");
}

#[tokio::test]
async fn test_unknown_callback_is_acknowledged() {
    let server = mockito::Server::new_async().await;
    let f = Fixture::new(&server);

    let callback = CallbackQuery {
        id: "cb-2".into(),
        channel: "telegram".into(),
        sender_id: 7,
        reply_target: Some("7".into()),
        message_id: None,
        data: "bogus".into(),
    };
    f.gateway.handle_update(Update::Callback(callback)).await;
    assert_eq!(f.channel.answered.lock().unwrap().len(), 1);
    assert!(f.sent().is_empty());
}
