use anyhow::Context;
use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::db::{queries, DbPool};
use crate::models::{BlogPost, MonthCount, NewPost, PostFilter, PostStatus, PostUpdate};

pub const DEFAULT_AUTHOR: &str = "Anonymous";
pub const DEFAULT_RECENT_LIMIT: usize = 5;

/// Storage for blog posts. Lookups of unknown ids return `None`, never an
/// error.
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, post: NewPost) -> anyhow::Result<BlogPost>;
    async fn list(&self, filter: PostFilter) -> anyhow::Result<Vec<BlogPost>>;
    async fn get(&self, id: &str) -> anyhow::Result<Option<BlogPost>>;
    async fn update(&self, id: &str, update: PostUpdate) -> anyhow::Result<Option<BlogPost>>;
    async fn delete(&self, id: &str) -> anyhow::Result<Option<BlogPost>>;
    async fn publish(&self, id: &str) -> anyhow::Result<Option<BlogPost>>;
    async fn unpublish(&self, id: &str) -> anyhow::Result<Option<BlogPost>>;
    async fn keywords(&self) -> anyhow::Result<Vec<String>>;
    async fn by_keyword(&self, keyword: &str) -> anyhow::Result<Vec<BlogPost>>;
    async fn by_category(&self, category: &str) -> anyhow::Result<Vec<BlogPost>>;
    async fn years(&self) -> anyhow::Result<Vec<i32>>;
    async fn months(&self, year: i32) -> anyhow::Result<Vec<MonthCount>>;
    async fn by_month(&self, year: i32, month: u32) -> anyhow::Result<Vec<BlogPost>>;
    async fn recent(&self, limit: usize) -> anyhow::Result<Vec<BlogPost>>;
}

/// Rejects posts without a title or body.
pub fn check_post_fields(title: &str, content: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("Post title is required".to_string());
    }
    if content.trim().is_empty() {
        return Err("Post content is required".to_string());
    }
    Ok(())
}

fn clean_keywords(keywords: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(keywords.len());
    for k in keywords {
        let k = k.trim();
        if !k.is_empty() && !cleaned.iter().any(|c| c == k) {
            cleaned.push(k.to_string());
        }
    }
    cleaned
}

/// Distinct keywords across posts in first-seen order.
fn distinct_keywords(lists: Vec<Vec<String>>) -> Vec<String> {
    let mut seen: Vec<String> = vec![];
    for keyword in lists.into_iter().flatten() {
        if !seen.contains(&keyword) {
            seen.push(keyword);
        }
    }
    seen
}

pub struct SqlitePostRepository {
    pool: DbPool,
}

impl SqlitePostRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn run<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool
                .get()
                .context("failed to check out a database connection")?;
            f(&*conn).context("blog query failed")
        })
        .await
        .context("blog storage task panicked")?
    }

    /// Runs `f` in a transaction that takes the write lock up front, so a
    /// concurrent writer waits on the busy timeout instead of failing.
    async fn write<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&Transaction) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .context("failed to check out a database connection")?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .context("failed to begin blog transaction")?;
            let value = f(&tx).context("blog query failed")?;
            tx.commit().context("failed to commit blog transaction")?;
            Ok(value)
        })
        .await
        .context("blog storage task panicked")?
    }

    /// Loads a post, applies `change` and writes it back in one transaction.
    async fn modify<F>(&self, id: &str, change: F) -> anyhow::Result<Option<BlogPost>>
    where
        F: FnOnce(&mut BlogPost) + Send + 'static,
    {
        let id = id.to_string();
        self.write(move |tx| {
            let Some(mut post) = queries::get_post(tx, &id)? else {
                return Ok(None);
            };
            change(&mut post);
            post.updated_at = Utc::now().trunc_subsecs(3);
            queries::save_post(tx, &post)?;
            Ok(Some(post))
        })
        .await
    }
}

#[async_trait]
impl PostRepository for SqlitePostRepository {
    async fn create(&self, new: NewPost) -> anyhow::Result<BlogPost> {
        let now = Utc::now().trunc_subsecs(3);
        let post = BlogPost {
            id: uuid::Uuid::new_v4().to_string(),
            title: new.title.trim().to_string(),
            content: new.content,
            category: new.category.unwrap_or_default().trim().to_string(),
            keywords: clean_keywords(new.keywords.unwrap_or_default()),
            author: new
                .author
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
            status: PostStatus::Draft,
            created_at: now,
            updated_at: now,
            published_at: None,
        };

        let stored = post.clone();
        self.run(move |conn| queries::insert_post(conn, &stored)).await?;
        tracing::info!(post_id = %post.id, "blog post created");
        Ok(post)
    }

    async fn list(&self, filter: PostFilter) -> anyhow::Result<Vec<BlogPost>> {
        self.run(move |conn| queries::list_posts(conn, filter)).await
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<BlogPost>> {
        let id = id.to_string();
        self.run(move |conn| queries::get_post(conn, &id)).await
    }

    async fn update(&self, id: &str, update: PostUpdate) -> anyhow::Result<Option<BlogPost>> {
        self.modify(id, move |post| {
            post.title = update.title.trim().to_string();
            post.content = update.content;
            if let Some(category) = update.category {
                post.category = category.trim().to_string();
            }
            if let Some(keywords) = update.keywords {
                post.keywords = clean_keywords(keywords);
            }
        })
        .await
    }

    async fn delete(&self, id: &str) -> anyhow::Result<Option<BlogPost>> {
        let id = id.to_string();
        let removed = self
            .write(move |tx| {
                let post = queries::get_post(tx, &id)?;
                if post.is_some() {
                    queries::delete_post(tx, &id)?;
                }
                Ok(post)
            })
            .await?;
        if let Some(post) = &removed {
            tracing::info!(post_id = %post.id, "blog post deleted");
        }
        Ok(removed)
    }

    async fn publish(&self, id: &str) -> anyhow::Result<Option<BlogPost>> {
        self.modify(id, |post| {
            post.status = PostStatus::Published;
            post.published_at = Some(Utc::now().trunc_subsecs(3));
        })
        .await
    }

    async fn unpublish(&self, id: &str) -> anyhow::Result<Option<BlogPost>> {
        self.modify(id, |post| post.status = PostStatus::Draft).await
    }

    async fn keywords(&self) -> anyhow::Result<Vec<String>> {
        let lists = self.run(queries::all_keyword_lists).await?;
        Ok(distinct_keywords(lists))
    }

    async fn by_keyword(&self, keyword: &str) -> anyhow::Result<Vec<BlogPost>> {
        let keyword = keyword.to_string();
        self.run(move |conn| queries::published_posts_by_keyword(conn, &keyword))
            .await
    }

    async fn by_category(&self, category: &str) -> anyhow::Result<Vec<BlogPost>> {
        let category = category.to_string();
        self.run(move |conn| queries::published_posts_by_category(conn, &category))
            .await
    }

    async fn years(&self) -> anyhow::Result<Vec<i32>> {
        self.run(queries::post_years).await
    }

    async fn months(&self, year: i32) -> anyhow::Result<Vec<MonthCount>> {
        self.run(move |conn| queries::post_months_for_year(conn, year))
            .await
    }

    async fn by_month(&self, year: i32, month: u32) -> anyhow::Result<Vec<BlogPost>> {
        self.run(move |conn| queries::posts_for_month(conn, year, month))
            .await
    }

    async fn recent(&self, limit: usize) -> anyhow::Result<Vec<BlogPost>> {
        let limit = limit as i64;
        self.run(move |conn| queries::recent_published_posts(conn, limit))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::time::Duration;

    use crate::db;

    struct TestStore {
        _dir: tempfile::TempDir,
        pool: DbPool,
        repo: SqlitePostRepository,
    }

    fn store() -> TestStore {
        store_with_pool(2)
    }

    fn store_with_pool(size: u32) -> TestStore {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blog.db");
        let pool = db::init_pool(path.to_str().unwrap(), size, Duration::from_secs(2)).unwrap();
        let repo = SqlitePostRepository::new(pool.clone());
        TestStore {
            _dir: dir,
            pool,
            repo,
        }
    }

    fn new_post(title: &str, category: &str, keywords: &[&str]) -> NewPost {
        NewPost {
            title: title.to_string(),
            content: format!("Body of {title}"),
            category: Some(category.to_string()),
            keywords: Some(keywords.iter().map(|k| k.to_string()).collect()),
            author: None,
        }
    }

    /// Inserts a post with a fixed creation time for archive tests.
    fn insert_at(pool: &DbPool, title: &str, created_at: &str) {
        let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(created_at)
            .unwrap()
            .with_timezone(&Utc);
        let post = BlogPost {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            content: "body".to_string(),
            category: String::new(),
            keywords: vec![],
            author: DEFAULT_AUTHOR.to_string(),
            status: PostStatus::Draft,
            created_at,
            updated_at: created_at,
            published_at: None,
        };
        queries::insert_post(&pool.get().unwrap(), &post).unwrap();
    }

    #[test]
    fn test_check_post_fields() {
        assert!(check_post_fields("Title", "Body").is_ok());
        assert_eq!(
            check_post_fields("  ", "Body").unwrap_err(),
            "Post title is required"
        );
        assert_eq!(
            check_post_fields("Title", "").unwrap_err(),
            "Post content is required"
        );
    }

    #[test]
    fn test_clean_keywords_trims_and_dedupes() {
        let cleaned = clean_keywords(vec![
            " rust ".to_string(),
            "".to_string(),
            "axum".to_string(),
            "rust".to_string(),
        ]);
        assert_eq!(cleaned, vec!["rust", "axum"]);
    }

    #[tokio::test]
    async fn test_create_defaults_to_draft() {
        let s = store();
        let post = s.repo.create(new_post("Hello", "", &[])).await.unwrap();
        assert_eq!(post.author, DEFAULT_AUTHOR);
        assert_eq!(post.status, PostStatus::Draft);
        assert!(post.published_at.is_none());

        let loaded = s.repo.get(&post.id).await.unwrap().unwrap();
        assert_eq!(loaded, post);
        assert!(s.repo.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_publish_controls_tag_and_category_views() {
        let s = store();
        let post = s
            .repo
            .create(new_post("Ownership", "rust", &["memory", "borrowck"]))
            .await
            .unwrap();

        assert!(s.repo.by_keyword("memory").await.unwrap().is_empty());
        assert!(s.repo.by_category("rust").await.unwrap().is_empty());

        let published = s.repo.publish(&post.id).await.unwrap().unwrap();
        assert!(published.is_published());
        assert!(published.published_at.is_some());
        assert_eq!(s.repo.by_keyword("memory").await.unwrap().len(), 1);
        assert_eq!(s.repo.by_category("rust").await.unwrap().len(), 1);
        assert_eq!(s.repo.list(PostFilter::Published).await.unwrap().len(), 1);

        let draft = s.repo.unpublish(&post.id).await.unwrap().unwrap();
        assert_eq!(draft.status, PostStatus::Draft);
        assert_eq!(draft.published_at, published.published_at);
        assert!(s.repo.by_keyword("memory").await.unwrap().is_empty());
        assert_eq!(s.repo.list(PostFilter::All).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_keeps_unspecified_fields() {
        let s = store();
        let post = s
            .repo
            .create(new_post("Draft", "notes", &["a"]))
            .await
            .unwrap();

        let updated = s
            .repo
            .update(
                &post.id,
                PostUpdate {
                    title: "Final".to_string(),
                    content: "New body".to_string(),
                    category: None,
                    keywords: Some(vec!["b".to_string()]),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "Final");
        assert_eq!(updated.category, "notes");
        assert_eq!(updated.keywords, vec!["b"]);
        assert!(updated.updated_at >= post.updated_at);

        let missing = s
            .repo
            .update(
                "missing",
                PostUpdate {
                    title: "x".to_string(),
                    content: "y".to_string(),
                    category: None,
                    keywords: None,
                },
            )
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_delete_returns_removed_post() {
        let s = store();
        let post = s.repo.create(new_post("Gone", "", &[])).await.unwrap();
        let removed = s.repo.delete(&post.id).await.unwrap().unwrap();
        assert_eq!(removed.id, post.id);
        assert!(s.repo.get(&post.id).await.unwrap().is_none());
        assert!(s.repo.delete(&post.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keywords_are_distinct_in_first_seen_order() {
        let s = store();
        s.repo.create(new_post("One", "", &["rust", "web"])).await.unwrap();
        s.repo.create(new_post("Two", "", &["sql", "rust"])).await.unwrap();
        assert_eq!(s.repo.keywords().await.unwrap(), vec!["rust", "web", "sql"]);
    }

    #[tokio::test]
    async fn test_archive_views() {
        let s = store();
        insert_at(&s.pool, "old", "2023-11-05T10:00:00.000Z");
        insert_at(&s.pool, "jan-a", "2024-01-10T10:00:00.000Z");
        insert_at(&s.pool, "jan-b", "2024-01-20T10:00:00.000Z");
        insert_at(&s.pool, "mar", "2024-03-01T10:00:00.000Z");

        assert_eq!(s.repo.years().await.unwrap(), vec![2024, 2023]);
        assert_eq!(
            s.repo.months(2024).await.unwrap(),
            vec![
                MonthCount { month: 1, count: 2 },
                MonthCount { month: 3, count: 1 },
            ]
        );

        let january = s.repo.by_month(2024, 1).await.unwrap();
        let titles: Vec<&str> = january.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["jan-b", "jan-a"]);
        assert!(s.repo.by_month(2024, 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recent_respects_limit() {
        let s = store();
        for i in 0..3 {
            let post = s
                .repo
                .create(new_post(&format!("post {i}"), "", &[]))
                .await
                .unwrap();
            s.repo.publish(&post.id).await.unwrap();
        }
        s.repo.create(new_post("draft", "", &[])).await.unwrap();

        let recent = s.repo.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent.iter().all(|p| p.is_published()));
        assert_eq!(s.repo.recent(DEFAULT_RECENT_LIMIT).await.unwrap().len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_all_succeed() {
        let s = store_with_pool(8);
        let post = s.repo.create(new_post("shared", "", &[])).await.unwrap();
        let repo = std::sync::Arc::new(s.repo);

        for round in 0..5 {
            let mut handles = vec![];
            for i in 0..8 {
                let repo = repo.clone();
                let id = post.id.clone();
                handles.push(tokio::spawn(async move {
                    let update = PostUpdate {
                        title: format!("round {round} writer {i}"),
                        content: "Body".to_string(),
                        category: None,
                        keywords: Some(vec![format!("w{i}")]),
                    };
                    if i % 2 == 0 {
                        repo.update(&id, update).await
                    } else {
                        repo.publish(&id).await
                    }
                }));
            }
            for handle in handles {
                let updated = handle.await.unwrap().unwrap();
                assert!(updated.is_some());
            }
        }

        let deletes: Vec<_> = (0..4)
            .map(|_| {
                let repo = repo.clone();
                let id = post.id.clone();
                tokio::spawn(async move { repo.delete(&id).await })
            })
            .collect();
        let mut removed = 0;
        for handle in deletes {
            if handle.await.unwrap().unwrap().is_some() {
                removed += 1;
            }
        }
        assert_eq!(removed, 1);
        assert!(repo.get(&post.id).await.unwrap().is_none());
    }
}
