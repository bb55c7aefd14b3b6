//! Compose screen: posting a new thread.

use crate::context::AppContext;
use crate::state::{Observable, ScreenStatus};
use chrono::Utc;
use rt_core::error::{AppError, Result};
use rt_core::models::{new_document_id, Collection, Thread};
use std::path::Path;

pub struct AddThreadViewModel {
    ctx: AppContext,
    pub status: Observable<ScreenStatus>,
    pub is_posted: Observable<bool>,
}

impl AddThreadViewModel {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            status: Observable::default(),
            is_posted: Observable::new(false),
        }
    }

    /// Posts a thread as the signed-in user. An attached image is uploaded
    /// first; the thread is only written once the upload has succeeded.
    pub async fn post_thread(&self, text: &str, image: Option<&Path>) -> Result<Thread> {
        let result = self.try_post(text, image).await;
        if result.is_ok() {
            self.is_posted.set(true);
        }
        self.status.settle(result)
    }

    /// Clears `is_posted` once the front end has reacted to it.
    pub fn reset_posted(&self) {
        self.is_posted.set(false);
    }

    async fn try_post(&self, text: &str, image: Option<&Path>) -> Result<Thread> {
        let session = self.ctx.session.require()?;
        if text.trim().is_empty() && image.is_none() {
            return Err(AppError::Validation("write something or attach an image".into()));
        }
        self.status.begin();

        let thread_id = new_document_id();
        let image_url = match image {
            Some(path) => {
                let public_id = format!("threads/{}/{}", session.user_id, thread_id);
                Some(self.ctx.media.upload(path, &public_id).await?)
            }
            None => None,
        };

        let thread = Thread {
            id: thread_id,
            author_id: session.user_id,
            text: text.to_string(),
            image_url,
            created_at: Utc::now().timestamp_millis(),
        };
        self.ctx
            .store
            .set_doc(Collection::Threads, &thread.id, &thread)
            .await?;

        tracing::info!(thread_id = %thread.id, has_image = thread.image_url.is_some(), "thread posted");
        Ok(thread)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{harness, sign_in_as, thread_count};
    use rt_core::traits::{MockMediaUploader, RemoteStore};
    use std::path::PathBuf;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn text_only_post_has_no_image() {
        let h = harness(MockMediaUploader::new()).await;
        let session = sign_in_as(&h, "alice").await;
        let vm = AddThreadViewModel::new(h.ctx.clone());

        let thread = assert_ok!(vm.post_thread("hello", None).await);

        assert_eq!(thread.author_id, session.user_id);
        let stored = h.ctx.store.get(Collection::Threads, &thread.id).await.unwrap().unwrap();
        assert!(stored["image_url"].is_null());
        assert!(vm.is_posted.get());
        vm.reset_posted();
        assert!(!vm.is_posted.get());
    }

    #[tokio::test]
    async fn image_is_uploaded_before_the_write() {
        let mut media = MockMediaUploader::new();
        media
            .expect_upload()
            .withf(|path, public_id| path.ends_with("cat.png") && public_id.starts_with("threads/"))
            .times(1)
            .returning(|_, public_id| Ok(format!("https://cdn.example/{public_id}.png")));
        let h = harness(media).await;
        let session = sign_in_as(&h, "alice").await;
        let vm = AddThreadViewModel::new(h.ctx.clone());

        let image = PathBuf::from("/tmp/cat.png");
        let thread = vm.post_thread("look", Some(image.as_path())).await.unwrap();

        let expected = format!("https://cdn.example/threads/{}/{}.png", session.user_id, thread.id);
        assert_eq!(thread.image_url.as_deref(), Some(expected.as_str()));
        assert_eq!(thread_count(h.ctx.store.as_ref()).await, 1);
    }

    #[tokio::test]
    async fn failed_upload_writes_nothing() {
        let mut media = MockMediaUploader::new();
        media
            .expect_upload()
            .times(1)
            .returning(|_, _| Err(AppError::UploadFailed("network timeout".into())));
        let h = harness(media).await;
        sign_in_as(&h, "alice").await;
        let vm = AddThreadViewModel::new(h.ctx.clone());

        let err = assert_err!(vm.post_thread("look", Some(Path::new("/tmp/cat.png"))).await);

        assert_eq!(err, AppError::UploadFailed("network timeout".into()));
        assert_eq!(thread_count(h.ctx.store.as_ref()).await, 0);
        assert_eq!(
            vm.status.get().error.as_deref(),
            Some("image upload failed: network timeout")
        );
        assert!(!vm.is_posted.get());
    }

    #[tokio::test]
    async fn signed_out_user_cannot_post() {
        let mut media = MockMediaUploader::new();
        media.expect_upload().never();
        let h = harness(media).await;
        let vm = AddThreadViewModel::new(h.ctx.clone());

        let err = vm.post_thread("hello", Some(Path::new("/tmp/x.png"))).await.unwrap_err();

        assert_eq!(err, AppError::NotAuthenticated);
        assert_eq!(thread_count(h.ctx.store.as_ref()).await, 0);
    }

    #[tokio::test]
    async fn empty_post_is_rejected_locally() {
        let h = harness(MockMediaUploader::new()).await;
        sign_in_as(&h, "alice").await;
        let vm = AddThreadViewModel::new(h.ctx.clone());

        let err = vm.post_thread("   ", None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
