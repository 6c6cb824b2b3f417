//! In-memory dashboard state shared by request handlers and scheduled jobs.

use std::collections::HashSet;
use std::sync::Arc;

use covidash_core::{CovidSnapshot, NewsArticle, StoredArticle, UpdateDescriptor};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct StoreState {
    covid: Option<CovidSnapshot>,
    articles: Vec<StoredArticle>,
    updates: Vec<UpdateDescriptor>,
}

/// Cheaply cloneable handle to the dashboard state.
#[derive(Debug, Clone, Default)]
pub struct Store {
    inner: Arc<RwLock<StoreState>>,
}

impl Store {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn covid(&self) -> Option<CovidSnapshot> {
        self.inner.read().await.covid.clone()
    }

    pub async fn set_covid(&self, snapshot: CovidSnapshot) {
        self.inner.write().await.covid = Some(snapshot);
    }

    /// Appends articles whose url is not already stored and returns how many
    /// were added. Existing entries keep their dismissed flag.
    pub async fn merge_articles(&self, batch: Vec<NewsArticle>) -> usize {
        let mut state = self.inner.write().await;
        let mut seen: HashSet<String> = state
            .articles
            .iter()
            .map(|stored| stored.article.url.clone())
            .collect();

        let before = state.articles.len();
        for article in batch {
            if seen.insert(article.url.clone()) {
                state.articles.push(StoredArticle::new(article));
            }
        }
        state.articles.len() - before
    }

    pub async fn article_known(&self, url: &str) -> bool {
        self.inner
            .read()
            .await
            .articles
            .iter()
            .any(|stored| stored.article.url == url)
    }

    /// Marks every article titled `title` as dismissed and returns how many
    /// changed.
    pub async fn dismiss_article(&self, title: &str) -> usize {
        let mut state = self.inner.write().await;
        let mut changed = 0;
        for stored in state
            .articles
            .iter_mut()
            .filter(|s| !s.dismissed && s.article.title == title)
        {
            stored.dismissed = true;
            changed += 1;
        }
        changed
    }

    /// The first `limit` articles that have not been dismissed, oldest first.
    pub async fn visible_articles(&self, limit: usize) -> Vec<NewsArticle> {
        self.inner
            .read()
            .await
            .articles
            .iter()
            .filter(|stored| !stored.dismissed)
            .take(limit)
            .map(|stored| stored.article.clone())
            .collect()
    }

    /// Scheduled updates in the order they were created.
    pub async fn updates(&self) -> Vec<UpdateDescriptor> {
        self.inner.read().await.updates.clone()
    }

    pub async fn push_update(&self, descriptor: UpdateDescriptor) {
        self.inner.write().await.updates.push(descriptor);
    }

    pub async fn remove_update(&self, name: &str) -> Option<UpdateDescriptor> {
        let mut state = self.inner.write().await;
        let index = state.updates.iter().position(|u| u.name == name)?;
        Some(state.updates.remove(index))
    }

    pub async fn update_name_in_use(&self, name: &str) -> bool {
        self.inner
            .read()
            .await
            .updates
            .iter()
            .any(|u| u.name == name)
    }

    pub async fn reset(&self) {
        *self.inner.write().await = StoreState::default();
    }
}
