use ratatui::layout::Rect;
use salesbot_core::webhook::connection_error_text;
use salesbot_core::{ChatSession, WebhookClient};
use tokio::task::JoinHandle;

pub struct App {
    pub should_quit: bool,
    pub title: String,

    // Conversation state (draft, transcript, loading flag)
    pub session: ChatSession,
    pub client: WebhookClient,
    pub reply_task: Option<JoinHandle<String>>,

    // Draft cursor, in characters
    pub cursor: usize,

    // Transcript viewport
    pub scroll: u16,
    pub follow_latest: bool,
    pub seen_revision: u64,
    pub chat_area: Option<Rect>, // updated during render, used for mouse hit-testing

    // Typing indicator frame, 0-2
    pub animation_frame: u8,
}

impl App {
    pub fn new(client: WebhookClient, title: impl Into<String>) -> Self {
        Self {
            should_quit: false,
            title: title.into(),
            session: ChatSession::new(),
            client,
            reply_task: None,
            cursor: 0,
            scroll: 0,
            follow_latest: true,
            seen_revision: 0,
            chat_area: None,
            animation_frame: 0,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.session.is_loading()
    }

    /// Submit the draft and fetch the reply in the background.
    /// Does nothing when the session rejects the submission.
    pub fn submit(&mut self) {
        let Some(query) = self.session.submit() else {
            return;
        };

        self.cursor = 0;
        let client = self.client.clone();
        self.reply_task = Some(tokio::spawn(async move { client.reply(&query).await }));
    }

    /// Hand a finished reply task's result to the session.
    pub async fn poll_reply(&mut self) {
        let finished = self
            .reply_task
            .as_ref()
            .is_some_and(|task| task.is_finished());
        if !finished {
            return;
        }

        if let Some(task) = self.reply_task.take() {
            let text = match task.await {
                Ok(text) => text,
                Err(err) => {
                    tracing::error!(error = %err, "reply task failed");
                    connection_error_text(&err)
                }
            };
            self.session.receive_reply(text);
        }
    }

    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Re-pin the viewport to the newest content once the transcript or
    /// loading flag has changed since the last frame.
    pub fn sync_revision(&mut self) {
        let revision = self.session.revision();
        if revision != self.seen_revision {
            self.seen_revision = revision;
            self.follow_latest = true;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
        self.follow_latest = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines);
    }

    /// Clamp the manual scroll offset and resume following once the
    /// bottom is reached.
    pub fn settle_scroll(&mut self, max_scroll: u16) {
        if self.follow_latest || self.scroll >= max_scroll {
            self.scroll = max_scroll;
            self.follow_latest = true;
        }
    }

    pub fn half_page(&self) -> u16 {
        self.chat_area
            .map(|area| area.height.saturating_sub(2) / 2)
            .unwrap_or(5)
            .max(1)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use salesbot_core::webhook::CONFIGURATION_ERROR_TEXT;
    use salesbot_core::{Message, TurnState};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) async fn wait_for_reply(app: &mut App) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while app.is_loading() {
                tokio::time::sleep(Duration::from_millis(10)).await;
                app.poll_reply().await;
            }
        })
        .await
        .expect("reply did not arrive");
    }

    #[tokio::test]
    async fn test_submit_spawns_single_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"response": "$10"}))
                    .set_delay(Duration::from_millis(50)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut app = App::new(WebhookClient::new(Some(server.uri())), "Sales Bot");
        app.session.set_draft("price?");
        app.submit();

        assert_eq!(app.session.state(), TurnState::Awaiting);
        assert_eq!(app.session.transcript().as_slice(), &[Message::user("price?")]);

        // A second submission while awaiting is dropped
        app.session.set_draft("again");
        app.submit();
        assert_eq!(app.session.transcript().len(), 1);

        wait_for_reply(&mut app).await;
        assert_eq!(
            app.session.transcript().as_slice(),
            &[Message::user("price?"), Message::bot("$10")]
        );
        assert!(app.reply_task.is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_client_still_clears_loading() {
        let mut app = App::new(WebhookClient::new(None), "Sales Bot");
        app.session.set_draft("hello");
        app.submit();
        wait_for_reply(&mut app).await;

        assert_eq!(app.session.transcript().last(), Some(&Message::bot(CONFIGURATION_ERROR_TEXT)));
        assert_eq!(app.session.state(), TurnState::Idle);
    }

    #[test]
    fn test_revision_change_repins_viewport() {
        let mut app = App::new(WebhookClient::new(None), "Sales Bot");
        app.scroll_up(3);
        assert!(!app.follow_latest);

        app.sync_revision();
        assert!(!app.follow_latest);

        app.session.set_draft("hi");
        app.session.submit();
        app.sync_revision();
        assert!(app.follow_latest);
    }

    #[test]
    fn test_settle_scroll_resumes_following_at_bottom() {
        let mut app = App::new(WebhookClient::new(None), "Sales Bot");
        app.follow_latest = false;
        app.scroll = 2;
        app.settle_scroll(10);
        assert_eq!(app.scroll, 2);
        assert!(!app.follow_latest);

        app.scroll_down(20);
        app.settle_scroll(10);
        assert_eq!(app.scroll, 10);
        assert!(app.follow_latest);
    }
}
