//! Notifications screen.

use crate::context::AppContext;
use crate::state::{Observable, ScreenStatus};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use rt_core::error::Result;
use rt_core::models::{Notification, NotificationKind};
use rt_core::traits::NotificationSource;

/// A canned like/follow/comment set, timestamped relative to "now".
/// There is no notification backend; this is what the client ships with.
#[derive(Debug, Clone, Default)]
pub struct SampleNotifications {
    now: Option<i64>,
}

impl SampleNotifications {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins "now" to `now_millis` so timestamps are reproducible.
    pub fn fixed_at(now_millis: i64) -> Self {
        Self { now: Some(now_millis) }
    }

    fn samples(now: i64) -> Vec<Notification> {
        let ago = |d: Duration| now - d.num_milliseconds();
        vec![
            Notification {
                id: "notif1".into(),
                kind: NotificationKind::Like,
                from_user_id: "user2".into(),
                from_username: "jane_smith".into(),
                from_profile_image_url: Some("https://example.com/jane.jpg".into()),
                thread_id: Some("thread1".into()),
                message: None,
                timestamp: ago(Duration::hours(2)),
            },
            Notification {
                id: "notif2".into(),
                kind: NotificationKind::Follow,
                from_user_id: "user3".into(),
                from_username: "alice_wonder".into(),
                from_profile_image_url: None,
                thread_id: None,
                message: None,
                timestamp: ago(Duration::minutes(30)),
            },
            Notification {
                id: "notif3".into(),
                kind: NotificationKind::Comment,
                from_user_id: "user1".into(),
                from_username: "john_doe".into(),
                from_profile_image_url: Some("https://example.com/john.jpg".into()),
                thread_id: Some("thread2".into()),
                message: Some("Great post!".into()),
                timestamp: ago(Duration::minutes(10)),
            },
        ]
    }
}

#[async_trait]
impl NotificationSource for SampleNotifications {
    async fn fetch(&self) -> Result<Vec<Notification>> {
        let now = self.now.unwrap_or_else(|| Utc::now().timestamp_millis());
        Ok(Self::samples(now))
    }
}

pub struct NotificationViewModel {
    ctx: AppContext,
    pub status: Observable<ScreenStatus>,
    pub notifications: Observable<Vec<Notification>>,
}

impl NotificationViewModel {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            status: Observable::default(),
            notifications: Observable::default(),
        }
    }

    /// Fetches and publishes the notifications, newest first.
    pub async fn load(&self) -> Result<()> {
        self.status.begin();
        let result = self.ctx.notifications.fetch().await.map(|mut list| {
            list.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            tracing::debug!(count = list.len(), "notifications loaded");
            self.notifications.set(list);
        });
        self.status.settle(result)
    }
}
