use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use cn_core::{
    Article, ArticleAnalysis, ArticleStorage, DatabaseStats, Error, Result, StoredArticle,
    DATETIME_FORMAT,
};
use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::debug;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS news_articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        url TEXT UNIQUE NOT NULL,
        content TEXT,
        summary TEXT,
        sentiment TEXT,
        impact TEXT,
        key_topics TEXT,
        related_coins TEXT,
        category TEXT,
        source TEXT,
        published_date DATETIME,
        fetched_date DATETIME DEFAULT CURRENT_TIMESTAMP,
        analysis_raw TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS query_cache (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        query_hash TEXT UNIQUE,
        query TEXT,
        response TEXT,
        created_date DATETIME DEFAULT CURRENT_TIMESTAMP
    )
    "#,
];

const ARTICLE_COLUMNS: &str = "id, title, url, content, summary, sentiment, impact, key_topics, \
     related_coins, category, source, published_date, fetched_date, analysis_raw";

/// Columns every search term is matched against.
const SEARCH_COLUMNS: &[&str] = &["title", "content", "analysis_raw"];

pub struct SQLiteStorage {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| Error::Database(format!("Failed to connect to database: {}", e)))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Database(format!("Failed to run migration {}: {}", i, e)))?;
        }

        debug!("💾 Database ready at {}", db_path.display());

        Ok(Self {
            pool,
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }

    async fn count(&self, sql: &str) -> Result<i64> {
        let row = sqlx::query(sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to count articles: {}", e)))?;
        row.try_get::<i64, _>(0)
            .map_err(|e| Error::Database(format!("Failed to read count: {}", e)))
    }
}

/// Hex SHA-256 of the exact query text.
pub fn query_hash(query: &str) -> String {
    hex::encode(Sha256::digest(query.as_bytes()))
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Build the article search statement and its bound patterns.
///
/// Each term must appear in at least one of [`SEARCH_COLUMNS`]; terms are ANDed.
fn build_search_query(terms: &[String]) -> (String, Vec<String>) {
    let mut conditions = Vec::with_capacity(terms.len());
    let mut params = Vec::with_capacity(terms.len() * SEARCH_COLUMNS.len());

    for term in terms {
        let column_matches = SEARCH_COLUMNS
            .iter()
            .map(|column| format!("LOWER({}) LIKE ? ESCAPE '\\'", column))
            .collect::<Vec<_>>()
            .join(" OR ");
        conditions.push(format!("({})", column_matches));

        let pattern = format!("%{}%", escape_like(term));
        params.extend(std::iter::repeat(pattern).take(SEARCH_COLUMNS.len()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {} ", conditions.join(" AND "))
    };

    let sql = format!(
        "SELECT {} FROM news_articles {}ORDER BY published_date DESC, id DESC LIMIT ?",
        ARTICLE_COLUMNS, where_clause
    );
    (sql, params)
}

fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    let value = value?;
    NaiveDateTime::parse_from_str(&value, DATETIME_FORMAT)
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(&value)
                .map(|d| d.with_timezone(&Utc))
                .ok()
        })
}

fn row_to_article(row: &SqliteRow) -> Result<StoredArticle> {
    let text = |column: &str| -> Result<Option<String>> {
        row.try_get::<Option<String>, _>(column)
            .map_err(|e| Error::Database(format!("Failed to read column {}: {}", column, e)))
    };

    let key_topics = text("key_topics")?
        .and_then(|topics| serde_json::from_str::<Vec<String>>(&topics).ok())
        .unwrap_or_default();

    Ok(StoredArticle {
        id: row
            .try_get("id")
            .map_err(|e| Error::Database(format!("Failed to read column id: {}", e)))?,
        title: text("title")?.unwrap_or_default(),
        url: text("url")?.unwrap_or_default(),
        content: text("content")?.unwrap_or_default(),
        summary: text("summary")?.unwrap_or_default(),
        sentiment: text("sentiment")?.unwrap_or_default(),
        impact: text("impact")?.unwrap_or_default(),
        key_topics,
        related_coins: text("related_coins")?,
        category: text("category")?,
        source: text("source")?.unwrap_or_default(),
        published_at: parse_timestamp(text("published_date")?),
        fetched_at: parse_timestamp(text("fetched_date")?),
        analysis_raw: text("analysis_raw")?,
    })
}

#[async_trait]
impl ArticleStorage for SQLiteStorage {
    async fn upsert_article(&self, article: &Article, analysis: &ArticleAnalysis) -> Result<()> {
        let key_topics = serde_json::to_string(analysis.key_topics())?;
        let analysis_raw = serde_json::to_string(analysis)?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO news_articles
            (title, url, content, summary, sentiment, impact, key_topics, source, published_date, analysis_raw)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&article.title)
        .bind(&article.url)
        .bind(&article.content)
        .bind(analysis.summary())
        .bind(analysis.sentiment())
        .bind(analysis.market_implications())
        .bind(key_topics)
        .bind(&article.source)
        .bind(article.published_at.as_ref().map(format_timestamp))
        .bind(analysis_raw)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to store article: {}", e)))?;

        Ok(())
    }

    async fn search_articles(&self, terms: &[String], limit: usize) -> Result<Vec<StoredArticle>> {
        let (sql, params) = build_search_query(terms);

        let mut query = sqlx::query(&sql);
        for param in params {
            query = query.bind(param);
        }

        let rows = query
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to search articles: {}", e)))?;

        rows.iter().map(row_to_article).collect()
    }

    async fn recent_articles(&self, limit: usize) -> Result<Vec<StoredArticle>> {
        self.search_articles(&[], limit).await
    }

    async fn get_by_url(&self, url: &str) -> Result<Option<StoredArticle>> {
        let sql = format!("SELECT {} FROM news_articles WHERE url = ?", ARTICLE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to get article: {}", e)))?;

        row.as_ref().map(row_to_article).transpose()
    }

    async fn stats(&self) -> Result<DatabaseStats> {
        let total_articles = self.count("SELECT COUNT(*) FROM news_articles").await?;
        let articles_today = self
            .count(
                "SELECT COUNT(*) FROM news_articles \
                 WHERE DATE(fetched_date, 'localtime') = DATE('now', 'localtime')",
            )
            .await?;

        let rows = sqlx::query("SELECT source, COUNT(*) AS count FROM news_articles GROUP BY source")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to count articles by source: {}", e)))?;

        let mut articles_by_source = std::collections::BTreeMap::new();
        for row in rows {
            let source: Option<String> = row
                .try_get("source")
                .map_err(|e| Error::Database(format!("Failed to read source: {}", e)))?;
            let count: i64 = row
                .try_get("count")
                .map_err(|e| Error::Database(format!("Failed to read count: {}", e)))?;
            articles_by_source.insert(source.unwrap_or_default(), count);
        }

        Ok(DatabaseStats {
            total_articles,
            articles_today,
            articles_by_source,
        })
    }

    async fn cached_response(&self, query: &str, max_age: Duration) -> Result<Option<String>> {
        // An age too large to represent means no cutoff
        let cutoff = chrono::Duration::from_std(max_age)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .map(|t| format_timestamp(&t))
            .unwrap_or_default();

        let row = sqlx::query(
            "SELECT response FROM query_cache WHERE query_hash = ? AND created_date >= ?",
        )
        .bind(query_hash(query))
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to read query cache: {}", e)))?;

        match row {
            Some(row) => row
                .try_get::<Option<String>, _>("response")
                .map_err(|e| Error::Database(format!("Failed to read cached response: {}", e))),
            None => Ok(None),
        }
    }

    async fn cache_response(&self, query: &str, response: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO query_cache (query_hash, query, response, created_date)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(query_hash(query))
        .bind(query)
        .bind(response)
        .bind(format_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to write query cache: {}", e)))?;

        Ok(())
    }
}
