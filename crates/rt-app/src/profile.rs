//! Profile screens: the signed-in user's own, and anyone else's.

use crate::context::AppContext;
use crate::home::HomeViewModel;
use crate::state::{Observable, ScreenStatus};
use rt_core::edit::ArrayEdit;
use rt_core::error::{AppError, Result};
use rt_core::models::{Collection, FeedItem, Followers, User};
use rt_core::traits::RemoteStore;

/// Field of a `followers` document holding the follower ids.
const FOLLOWER_IDS: &str = "follower_ids";

async fn read_user(ctx: &AppContext, user_id: &str) -> Result<User> {
    ctx.store
        .get_doc::<User>(Collection::Users, user_id)
        .await?
        .map(|user| user.with_id(user_id))
        .ok_or_else(|| AppError::NotFound("user".into(), user_id.to_string()))
}

pub struct ProfileViewModel {
    ctx: AppContext,
    pub status: Observable<ScreenStatus>,
    pub user: Observable<Option<User>>,
}

impl ProfileViewModel {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            status: Observable::default(),
            user: Observable::default(),
        }
    }

    /// Reads the signed-in user's document.
    pub async fn load(&self) -> Result<User> {
        let result = async {
            let session = self.ctx.session.require()?;
            self.status.begin();
            let user = read_user(&self.ctx, &session.user_id).await?;
            self.user.set(Some(user.clone()));
            Ok(user)
        }
        .await;
        self.status.settle(result)
    }

    /// The feed's threads written by the signed-in user.
    pub fn own_threads(&self, feed: &HomeViewModel) -> Result<Vec<FeedItem>> {
        let session = self.ctx.session.require()?;
        Ok(feed.threads_by(&session.user_id))
    }
}

/// Someone else's profile, with follow/unfollow.
pub struct OtherUserViewModel {
    ctx: AppContext,
    user_id: String,
    pub status: Observable<ScreenStatus>,
    pub user: Observable<Option<User>>,
    pub followers: Observable<Followers>,
}

impl OtherUserViewModel {
    pub fn new(ctx: AppContext, user_id: impl Into<String>) -> Self {
        Self {
            ctx,
            user_id: user_id.into(),
            status: Observable::default(),
            user: Observable::default(),
            followers: Observable::default(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Reads the target user and their follower list.
    pub async fn load(&self) -> Result<User> {
        self.status.begin();
        let result = async {
            let user = read_user(&self.ctx, &self.user_id).await?;
            let followers = self.read_followers().await?;
            self.user.set(Some(user.clone()));
            self.followers.set(followers);
            Ok(user)
        }
        .await;
        self.status.settle(result)
    }

    pub async fn follow(&self) -> Result<()> {
        self.change_follow(true).await
    }

    pub async fn unfollow(&self) -> Result<()> {
        self.change_follow(false).await
    }

    /// Whether the signed-in user is among the loaded followers.
    pub fn is_following(&self) -> bool {
        match self.ctx.session.current() {
            Some(session) => self.followers.with(|f| f.contains(&session.user_id)),
            None => false,
        }
    }

    /// The target's threads from the feed; empty unless following.
    pub fn visible_threads(&self, feed: &HomeViewModel) -> Vec<FeedItem> {
        if !self.is_following() {
            return Vec::new();
        }
        feed.threads_by(&self.user_id)
    }

    async fn read_followers(&self) -> Result<Followers> {
        Ok(self
            .ctx
            .store
            .get_doc::<Followers>(Collection::Followers, &self.user_id)
            .await?
            .unwrap_or_default())
    }

    async fn change_follow(&self, follow: bool) -> Result<()> {
        let result = async {
            let session = self.ctx.session.require()?;
            if session.user_id == self.user_id {
                return Err(AppError::Validation("you cannot follow yourself".into()));
            }
            self.status.begin();

            let me = serde_json::Value::from(session.user_id.as_str());
            let edit = if follow { ArrayEdit::Add(me) } else { ArrayEdit::Remove(me) };
            let changed = self
                .ctx
                .store
                .edit_array(Collection::Followers, &self.user_id, FOLLOWER_IDS, edit)
                .await?;
            if changed {
                tracing::info!(target_user = %self.user_id, follow, "follow state changed");
            }
            let followers = self.read_followers().await?;
            self.followers.set(followers);
            Ok(())
        }
        .await;
        self.status.settle(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStore;
    use crate::testing::{harness, sign_in_as, thread_doc, user_doc};
    use rt_core::traits::{MockMediaUploader, RemoteStore};
    use std::time::Duration;

    async fn live_feed(vm: &HomeViewModel, n: usize) {
        let mut rx = vm.state().items.subscribe();
        tokio::time::timeout(Duration::from_secs(5), async {
            while rx.borrow_and_update().len() != n {
                rx.changed().await.unwrap();
            }
        })
        .await
        .expect("feed never loaded");
    }

    #[tokio::test]
    async fn own_profile_needs_a_session() {
        let h = harness(MockMediaUploader::new()).await;
        let vm = ProfileViewModel::new(h.ctx.clone());

        assert_eq!(vm.load().await, Err(AppError::NotAuthenticated));

        let session = sign_in_as(&h, "alice").await;
        let user = vm.load().await.unwrap();
        assert_eq!(user.id, session.user_id);
        assert_eq!(vm.user.get().map(|u| u.username), Some("alice".to_string()));
    }

    #[tokio::test]
    async fn own_threads_come_from_the_feed() {
        let h = harness(MockMediaUploader::new()).await;
        let me = sign_in_as(&h, "alice").await;
        h.ctx.store.set(Collection::Users, "u2", user_doc("bob")).await.unwrap();
        h.ctx.store.set(Collection::Threads, "t1", thread_doc(&me.user_id, 1)).await.unwrap();
        h.ctx.store.set(Collection::Threads, "t2", thread_doc("u2", 2)).await.unwrap();
        let feed = HomeViewModel::new(h.ctx.clone());
        feed.start().await.unwrap();
        live_feed(&feed, 2).await;

        let vm = ProfileViewModel::new(h.ctx.clone());
        let mine = vm.own_threads(&feed).unwrap();

        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].thread.id, "t1");
    }

    #[tokio::test]
    async fn missing_user_is_not_found() {
        let h = harness(MockMediaUploader::new()).await;
        let vm = OtherUserViewModel::new(h.ctx.clone(), "nobody");

        let err = vm.load().await.unwrap_err();
        assert_eq!(err, AppError::NotFound("user".into(), "nobody".into()));
    }

    #[tokio::test]
    async fn follow_and_unfollow_update_the_followers_document() {
        let h = harness(MockMediaUploader::new()).await;
        h.ctx.store.set(Collection::Users, "u2", user_doc("bob")).await.unwrap();
        h.ctx.store.set(Collection::Threads, "t2", thread_doc("u2", 2)).await.unwrap();
        let me = sign_in_as(&h, "alice").await;
        let feed = HomeViewModel::new(h.ctx.clone());
        feed.start().await.unwrap();
        live_feed(&feed, 1).await;

        let vm = OtherUserViewModel::new(h.ctx.clone(), "u2");
        vm.load().await.unwrap();
        assert!(!vm.is_following());
        assert!(vm.visible_threads(&feed).is_empty());

        vm.follow().await.unwrap();
        vm.follow().await.unwrap();
        let stored: Followers = h
            .ctx
            .store
            .get_doc(Collection::Followers, "u2")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.follower_ids, vec![me.user_id.clone()]);
        assert!(vm.is_following());
        assert_eq!(vm.visible_threads(&feed).len(), 1);

        vm.unfollow().await.unwrap();
        let stored: Followers = h
            .ctx
            .store
            .get_doc(Collection::Followers, "u2")
            .await
            .unwrap()
            .unwrap();
        assert!(stored.follower_ids.is_empty());
        assert!(!vm.is_following());
    }

    #[tokio::test]
    async fn cannot_follow_yourself_or_while_signed_out() {
        let h = harness(MockMediaUploader::new()).await;
        let anonymous = OtherUserViewModel::new(h.ctx.clone(), "u2");
        assert_eq!(anonymous.follow().await, Err(AppError::NotAuthenticated));

        let me = sign_in_as(&h, "alice").await;
        let mirror = OtherUserViewModel::new(h.ctx.clone(), me.user_id);
        assert!(matches!(mirror.follow().await, Err(AppError::Validation(_))));
        assert!(h.ctx.store.get(Collection::Followers, mirror.user_id()).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn simultaneous_follows_are_all_kept() {
        let h = harness(MockMediaUploader::new()).await;
        let alice = sign_in_as(&h, "alice").await;
        let carol = sign_in_as(&h, "carol").await;
        let as_user = |session| {
            let mut ctx = h.ctx.clone();
            ctx.session = SessionStore::new(h.ctx.cache.clone(), Some(session));
            ctx
        };

        for round in 0..20 {
            let target = format!("target-{round}");
            let a = OtherUserViewModel::new(as_user(alice.clone()), target.clone());
            let c = OtherUserViewModel::new(as_user(carol.clone()), target.clone());

            let (ra, rc) = tokio::join!(a.follow(), c.follow());
            ra.unwrap();
            rc.unwrap();

            let stored: Followers = h
                .ctx
                .store
                .get_doc(Collection::Followers, &target)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(stored.follower_ids.len(), 2, "round {round} lost a follower");
            assert!(stored.contains(&alice.user_id) && stored.contains(&carol.user_id));
        }
    }
}
