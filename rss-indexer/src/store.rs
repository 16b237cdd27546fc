use crate::text::normalize_text;
use crate::types::{
    Article, ArticleHit, FeedSourceConfig, IndexerError, PersistReport, QueryOp, Result, Tag,
    TagSetRow, TaxonomyReport, TaxonomyRow,
};
use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Acquire, QueryBuilder, Row, Sqlite, SqliteConnection};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

const ARTICLE_COLUMNS: &str =
    "a.article_id, a.feed_title, a.article_title, a.article_link, a.pub_date, a.article_desc, a.article_content";

/// Content-addressed id: SHA-256 over the parts joined by NUL, hex encoded.
pub fn content_id(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update([0u8]);
        }
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

pub fn association_id(feed_title: &str, article_title: &str, tag_name: &str) -> String {
    content_id(&[feed_title, article_title, tag_name])
}

/// Owns every persisted row: sources, articles, tag associations and the inverted index.
#[derive(Clone)]
pub struct ArticleStore {
    db: SqlitePool,
}

impl ArticleStore {
    /// Opens (creating if needed) the database and applies pending migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(10))
            .foreign_keys(true);

        let db = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&db).await?;
        info!("Connected to article store: {}", database_url);

        Ok(Self { db })
    }

    pub async fn close(&self) {
        self.db.close().await;
    }

    /// Insert-if-absent. Returns true when the source was not known before.
    pub async fn register_source(&self, config: &FeedSourceConfig) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO RSS_FEED (feed_title, feed_link, feed_desc)
            VALUES (?, ?, ?)
            ON CONFLICT (feed_title) DO NOTHING
            "#,
        )
        .bind(&config.title)
        .bind(config.feed_link())
        .bind(&config.description)
        .execute(&self.db)
        .await?;

        let created = result.rows_affected() > 0;
        if created {
            info!("Registered feed source: {}", config.title);
        }
        Ok(created)
    }

    pub async fn seen_titles(&self, source: &str) -> Result<HashSet<String>> {
        let rows = sqlx::query("SELECT article_title FROM ARTICLE WHERE feed_title = ?")
            .bind(source)
            .fetch_all(&self.db)
            .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("article_title").map_err(IndexerError::from))
            .collect()
    }

    /// Writes a source's batch in one transaction with a savepoint per article.
    ///
    /// Existing (source, title) keys are reported as duplicates. An article that fails is rolled
    /// back alone and reported; the rest of the batch still commits.
    pub async fn persist_articles(&self, source: &str, articles: &[Article]) -> Result<PersistReport> {
        let mut report = PersistReport::default();
        if articles.is_empty() {
            return Ok(report);
        }

        let mut tx = self.db.begin().await?;
        for article in articles {
            let mut savepoint = tx.begin().await?;
            match insert_article(&mut savepoint, source, article).await {
                Ok(Some(_)) => {
                    savepoint.commit().await?;
                    report.inserted.push(article.title.clone());
                }
                Ok(None) => {
                    savepoint.commit().await?;
                    report.duplicates.push(article.title.clone());
                }
                Err(e) => {
                    savepoint.rollback().await?;
                    warn!(source, title = %article.title, error = %e, "Skipping article");
                    report.failed.push((article.title.clone(), e.to_string()));
                }
            }
        }
        tx.commit().await?;

        info!(
            source,
            inserted = report.inserted.len(),
            duplicates = report.duplicates.len(),
            failed = report.failed.len(),
            "Persisted batch"
        );
        Ok(report)
    }

    /// Idempotent; returns the number of new associations.
    pub async fn persist_tag_associations(&self, article: &Article, tags: &BTreeSet<String>) -> Result<usize> {
        if tags.is_empty() {
            return Ok(0);
        }
        let mut tx = self.db.begin().await?;
        let added = write_tags(&mut tx, &article.source, &article.title, tags).await?;
        tx.commit().await?;
        Ok(added)
    }

    /// Writes the article's term frequencies to the inverted index. Idempotent.
    pub async fn index_article(&self, article: &Article) -> Result<usize> {
        let article_id = self
            .article_id(&article.source, &article.title)
            .await?
            .ok_or_else(|| {
                IndexerError::General(format!(
                    "article not stored: {} / {}",
                    article.source, article.title
                ))
            })?;

        let mut tx = self.db.begin().await?;
        let added = write_terms(&mut tx, article_id, &article.term_frequencies).await?;
        tx.commit().await?;
        Ok(added)
    }

    /// Indexes every stored article that has no inverted index rows yet, one transaction per
    /// article. Returns how many articles were indexed.
    pub async fn rebuild_index(&self) -> Result<usize> {
        let rows = sqlx::query(
            r#"
            SELECT a.article_id, a.article_content FROM ARTICLE a
            WHERE NOT EXISTS (SELECT 1 FROM INVERTED_INDEX i WHERE i.article_id = a.article_id)
            ORDER BY a.article_id
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let mut indexed = 0;
        for row in rows {
            let article_id: i64 = row.try_get("article_id")?;
            let content: String = row.try_get("article_content")?;
            let normalized = normalize_text(&content);
            if normalized.is_empty() {
                continue;
            }

            let mut tx = self.db.begin().await?;
            match write_terms(&mut tx, article_id, &normalized.term_frequencies).await {
                Ok(_) => {
                    tx.commit().await?;
                    indexed += 1;
                }
                Err(e) => {
                    tx.rollback().await?;
                    warn!(article_id, error = %e, "Failed to index article");
                }
            }
        }

        info!("Rebuilt index for {} articles", indexed);
        Ok(indexed)
    }

    pub async fn article_id(&self, source: &str, title: &str) -> Result<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT article_id FROM ARTICLE WHERE feed_title = ? AND article_title = ?",
        )
        .bind(source)
        .bind(title)
        .fetch_optional(&self.db)
        .await?;
        Ok(id)
    }

    pub async fn term_frequencies(&self, article_id: i64) -> Result<BTreeMap<String, u32>> {
        let rows = sqlx::query("SELECT term, freq FROM INVERTED_INDEX WHERE article_id = ?")
            .bind(article_id)
            .fetch_all(&self.db)
            .await?;

        let mut terms = BTreeMap::new();
        for row in rows {
            let freq: i64 = row.try_get("freq")?;
            terms.insert(row.try_get("term")?, freq as u32);
        }
        Ok(terms)
    }

    /// Articles carrying any of `tags`, each with the matching tags accumulated.
    pub async fn query_by_tags(&self, tags: &[String]) -> Result<Vec<Article>> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {}, t.tag_name FROM ARTICLE a \
             JOIN TAG_FOR_ARTICLE t ON t.feed_title = a.feed_title AND t.article_title = a.article_title \
             WHERE t.tag_name IN (",
            ARTICLE_COLUMNS
        ));
        let mut names = qb.separated(", ");
        for tag in tags {
            names.push_bind(tag);
        }
        names.push_unseparated(") ORDER BY a.article_id, t.tag_name");

        let rows = qb.build().fetch_all(&self.db).await?;
        collect_articles(&rows)
    }

    /// Boolean search over already-normalized, distinct terms.
    pub async fn query_terms(&self, terms: &[String], op: QueryOp) -> Result<Vec<ArticleHit>> {
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT a.article_id, a.article_title, a.article_link, a.article_desc FROM ARTICLE a \
             LEFT JOIN INVERTED_INDEX i ON i.article_id = a.article_id AND i.term IN (",
        );
        let mut bound = qb.separated(", ");
        for term in terms {
            bound.push_bind(term);
        }
        bound.push_unseparated(") GROUP BY a.article_id HAVING COUNT(DISTINCT i.term) ");

        let wanted = terms.len() as i64;
        match op {
            QueryOp::And => qb.push("= ").push_bind(wanted),
            QueryOp::Or => qb.push(">= 1"),
            QueryOp::Xor => qb.push("= 1"),
            QueryOp::Nand => qb.push("< ").push_bind(wanted),
        };
        qb.push(" ORDER BY a.article_id");

        let rows = qb.build().fetch_all(&self.db).await?;
        debug!("{} query over {} terms matched {} articles", op, terms.len(), rows.len());

        rows.iter()
            .map(|row| -> Result<ArticleHit> {
                Ok(ArticleHit {
                    article_id: row.try_get("article_id")?,
                    title: row.try_get("article_title")?,
                    link: row.try_get("article_link")?,
                    description: row.try_get("article_desc")?,
                })
            })
            .collect()
    }

    pub async fn source_titles(&self) -> Result<Vec<String>> {
        let titles = sqlx::query_scalar::<_, String>("SELECT feed_title FROM RSS_FEED ORDER BY feed_title")
            .fetch_all(&self.db)
            .await?;
        Ok(titles)
    }

    pub async fn tags(&self) -> Result<Vec<Tag>> {
        let rows = sqlx::query("SELECT tag_name, tag_desc, case_sensitive FROM TAG ORDER BY tag_name")
            .fetch_all(&self.db)
            .await?;

        rows.iter()
            .map(|row| -> Result<Tag> {
                Ok(Tag {
                    name: row.try_get("tag_name")?,
                    description: row.try_get("tag_desc")?,
                    case_sensitive: row.try_get("case_sensitive")?,
                })
            })
            .collect()
    }

    /// Every stored article, optionally limited to one source, with all of its tags.
    pub async fn articles(&self, source: Option<&str>) -> Result<Vec<Article>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {}, t.tag_name FROM ARTICLE a \
             LEFT JOIN TAG_FOR_ARTICLE t ON t.feed_title = a.feed_title AND t.article_title = a.article_title",
            ARTICLE_COLUMNS
        ));
        if let Some(source) = source {
            qb.push(" WHERE a.feed_title = ").push_bind(source);
        }
        qb.push(" ORDER BY a.article_id, t.tag_name");

        let rows = qb.build().fetch_all(&self.db).await?;
        collect_articles(&rows)
    }

    pub async fn article_count(&self, source: Option<&str>) -> Result<i64> {
        let count = match source {
            Some(source) => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM ARTICLE WHERE feed_title = ?")
                    .bind(source)
                    .fetch_one(&self.db)
                    .await?
            }
            None => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM ARTICLE")
                    .fetch_one(&self.db)
                    .await?
            }
        };
        Ok(count)
    }

    pub async fn import_tag_sets(&self, rows: &[TagSetRow]) -> Result<usize> {
        let mut tx = self.db.begin().await?;
        let mut inserted = 0;

        for row in rows {
            let name = row.set_name.trim();
            if name.is_empty() {
                warn!("Skipping tag set row without a name");
                continue;
            }
            inserted += insert_tag_set(&mut tx, name, &row.set_desc).await?;
        }

        tx.commit().await?;
        info!("Imported {} new tag sets", inserted);
        Ok(inserted)
    }

    /// Loads tag definitions and their set memberships. Unknown sets are created on the fly.
    pub async fn import_tags(&self, rows: &[TaxonomyRow]) -> Result<TaxonomyReport> {
        let mut tx = self.db.begin().await?;
        let mut report = TaxonomyReport::default();

        for row in rows {
            let name = row.tag_name.trim();
            if name.is_empty() {
                warn!("Skipping taxonomy row without a tag name");
                continue;
            }

            let result = sqlx::query(
                r#"
                INSERT INTO TAG (tag_name, tag_desc, case_sensitive)
                VALUES (?, ?, ?)
                ON CONFLICT (tag_name) DO NOTHING
                "#,
            )
            .bind(name)
            .bind(&row.tag_desc)
            .bind(row.case_sensitive)
            .execute(&mut *tx)
            .await?;
            report.tags += result.rows_affected() as usize;

            let Some(set_name) = row.set_name.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
                continue;
            };
            report.sets += insert_tag_set(&mut tx, set_name, "").await?;

            let result = sqlx::query(
                r#"
                INSERT INTO TAG_IN_SET (id, set_name, tag_name)
                VALUES (?, ?, ?)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(content_id(&[set_name, name]))
            .bind(set_name)
            .bind(name)
            .execute(&mut *tx)
            .await?;
            report.memberships += result.rows_affected() as usize;
        }

        tx.commit().await?;
        info!(
            tags = report.tags,
            sets = report.sets,
            memberships = report.memberships,
            "Imported taxonomy"
        );
        Ok(report)
    }
}

/// Returns the new article id, or `None` when the (source, title) key already exists.
/// The article row goes in before its tag and index rows.
async fn insert_article(conn: &mut SqliteConnection, source: &str, article: &Article) -> Result<Option<i64>> {
    let result = sqlx::query(
        r#"
        INSERT INTO ARTICLE (feed_title, article_title, article_link, pub_date, article_desc, article_content)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT (feed_title, article_title) DO NOTHING
        "#,
    )
    .bind(source)
    .bind(&article.title)
    .bind(&article.link)
    .bind(&article.pub_date)
    .bind(&article.description)
    .bind(&article.raw_content)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        debug!(source, title = %article.title, "Article already stored");
        return Ok(None);
    }

    let article_id = result.last_insert_rowid();
    write_tags(conn, source, &article.title, &article.tags).await?;
    write_terms(conn, article_id, &article.term_frequencies).await?;
    Ok(Some(article_id))
}

async fn write_tags(conn: &mut SqliteConnection, source: &str, title: &str, tags: &BTreeSet<String>) -> Result<usize> {
    let mut added = 0;
    for tag in tags {
        let result = sqlx::query(
            r#"
            INSERT INTO TAG_FOR_ARTICLE (id, feed_title, article_title, tag_name)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(association_id(source, title, tag))
        .bind(source)
        .bind(title)
        .bind(tag)
        .execute(&mut *conn)
        .await?;
        added += result.rows_affected() as usize;
    }
    Ok(added)
}

async fn write_terms(conn: &mut SqliteConnection, article_id: i64, terms: &BTreeMap<String, u32>) -> Result<usize> {
    let mut added = 0;
    for (term, freq) in terms {
        let result = sqlx::query(
            r#"
            INSERT INTO INVERTED_INDEX (term, article_id, freq)
            VALUES (?, ?, ?)
            ON CONFLICT (term, article_id) DO NOTHING
            "#,
        )
        .bind(term)
        .bind(article_id)
        .bind(*freq as i64)
        .execute(&mut *conn)
        .await?;
        added += result.rows_affected() as usize;
    }
    Ok(added)
}

async fn insert_tag_set(conn: &mut SqliteConnection, name: &str, description: &str) -> Result<usize> {
    let result = sqlx::query(
        r#"
        INSERT INTO TAG_SET (set_name, set_desc)
        VALUES (?, ?)
        ON CONFLICT (set_name) DO NOTHING
        "#,
    )
    .bind(name)
    .bind(description)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() as usize)
}

/// Folds article rows joined with an optional `tag_name` column, ordered by article id, into
/// one `Article` per id.
fn collect_articles(rows: &[SqliteRow]) -> Result<Vec<Article>> {
    let mut articles: Vec<(i64, Article)> = Vec::new();

    for row in rows {
        let article_id: i64 = row.try_get("article_id")?;
        let tag: Option<String> = row.try_get("tag_name")?;

        if articles.last().map(|(id, _)| *id) != Some(article_id) {
            articles.push((
                article_id,
                Article {
                    source: row.try_get("feed_title")?,
                    title: row.try_get("article_title")?,
                    link: row.try_get("article_link")?,
                    pub_date: row.try_get("pub_date")?,
                    description: row.try_get("article_desc")?,
                    raw_content: row.try_get("article_content")?,
                    tags: BTreeSet::new(),
                    term_frequencies: BTreeMap::new(),
                },
            ));
        }

        if let (Some(tag), Some((_, article))) = (tag, articles.last_mut()) {
            article.tags.insert(tag);
        }
    }

    Ok(articles.into_iter().map(|(_, article)| article).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_association_id_is_stable_and_scoped() {
        let a = association_id("Feed A", "Title", "AI");
        assert_eq!(a, association_id("Feed A", "Title", "AI"));
        assert_eq!(a.len(), 64);
        assert_ne!(a, association_id("Feed B", "Title", "AI"));
        // Separator keeps shifted boundaries apart.
        assert_ne!(content_id(&["ab", "c"]), content_id(&["a", "bc"]));
    }
}
