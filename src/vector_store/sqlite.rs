//! SQLite-based store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! Uniqueness of external video ids and of chunks is enforced by the schema.

use super::{
    check_dimensions, rank_by_similarity, NewChunk, NewQuestionAnswer, NewVideo, QuestionAnswer,
    ScoredChunk, ScoredQuestionAnswer, TranscriptChunk, Video, VectorStore,
};
use crate::error::{Result, TubeqaError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS videos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        external_id TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        thumbnail_url TEXT NOT NULL,
        source_url TEXT NOT NULL,
        embed_url TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS transcript_chunks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        video_id INTEGER NOT NULL REFERENCES videos(id),
        text TEXT NOT NULL,
        start_time REAL NOT NULL,
        end_time REAL NOT NULL,
        embedding BLOB NOT NULL,
        UNIQUE (video_id, start_time, end_time, text)
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_video_id ON transcript_chunks(video_id);

    CREATE TABLE IF NOT EXISTS question_answers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        video_id INTEGER NOT NULL REFERENCES videos(id),
        question TEXT NOT NULL,
        answer TEXT NOT NULL,
        answer_embedding BLOB,
        most_relevant_timestamp REAL NOT NULL,
        asked_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_question_answers_video_id ON question_answers(video_id);
"#;

const VIDEO_COLUMNS: &str =
    "id, external_id, title, description, thumbnail_url, source_url, embed_url, created_at";
const CHUNK_COLUMNS: &str = "id, video_id, text, start_time, end_time, embedding";
const QA_COLUMNS: &str =
    "id, video_id, question, answer, answer_embedding, most_relevant_timestamp, asked_at";

/// SQLite-based store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
    dimensions: usize,
}

impl SqliteVectorStore {
    /// Open (or create) a store at `path` for vectors of length `dimensions`.
    #[instrument(skip_all)]
    pub fn new(path: &Path, dimensions: usize) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let store = Self::init(conn, dimensions)?;
        info!("Initialized SQLite store at {:?}", path);
        Ok(store)
    }

    /// Create an in-memory SQLite store (useful for testing).
    pub fn in_memory(dimensions: usize) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, dimensions)
    }

    fn init(conn: Connection, dimensions: usize) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            dimensions,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| TubeqaError::Persistence(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn parse_timestamp(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_video(row: &Row<'_>) -> rusqlite::Result<Video> {
        let created_at: String = row.get(7)?;
        Ok(Video {
            id: row.get(0)?,
            external_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            thumbnail_url: row.get(4)?,
            source_url: row.get(5)?,
            embed_url: row.get(6)?,
            created_at: Self::parse_timestamp(&created_at),
        })
    }

    fn row_to_chunk(row: &Row<'_>) -> rusqlite::Result<TranscriptChunk> {
        let embedding_bytes: Vec<u8> = row.get(5)?;
        Ok(TranscriptChunk {
            id: row.get(0)?,
            video_id: row.get(1)?,
            text: row.get(2)?,
            start_time: row.get(3)?,
            end_time: row.get(4)?,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
        })
    }

    fn row_to_question_answer(row: &Row<'_>) -> rusqlite::Result<QuestionAnswer> {
        let embedding_bytes: Option<Vec<u8>> = row.get(4)?;
        let asked_at: String = row.get(6)?;
        Ok(QuestionAnswer {
            id: row.get(0)?,
            video_id: row.get(1)?,
            question: row.get(2)?,
            answer: row.get(3)?,
            answer_embedding: embedding_bytes.map(|b| Self::bytes_to_embedding(&b)),
            most_relevant_timestamp: row.get(5)?,
            asked_at: Self::parse_timestamp(&asked_at),
        })
    }

    fn is_constraint_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, video, chunks), fields(external_id = %video.external_id, chunks = chunks.len()))]
    async fn insert_video_with_chunks(&self, video: &NewVideo, chunks: &[NewChunk]) -> Result<Video> {
        for chunk in chunks {
            check_dimensions(self.dimensions, &chunk.embedding)?;
        }

        let conn = self.lock()?;
        // Dropping the transaction without commit rolls everything back.
        let tx = conn.unchecked_transaction()?;
        let created_at = Utc::now();

        tx.execute(
            r#"
            INSERT INTO videos
            (external_id, title, description, thumbnail_url, source_url, embed_url, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                video.external_id,
                video.title,
                video.description,
                video.thumbnail_url,
                video.source_url,
                video.embed_url,
                created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| {
            if Self::is_constraint_violation(&e) {
                TubeqaError::DuplicateVideo(video.external_id.clone())
            } else {
                e.into()
            }
        })?;
        let video_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO transcript_chunks (video_id, text, start_time, end_time, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for chunk in chunks {
                stmt.execute(params![
                    video_id,
                    chunk.text,
                    chunk.start_time,
                    chunk.end_time,
                    Self::embedding_to_bytes(&chunk.embedding),
                ])
                .map_err(|e| {
                    TubeqaError::Persistence(format!(
                        "Failed to write chunk at {}s for video {}: {}",
                        chunk.start_time, video.external_id, e
                    ))
                })?;
            }
        }

        tx.commit()?;
        info!("Stored video {} with {} chunks", video_id, chunks.len());

        Ok(Video {
            id: video_id,
            external_id: video.external_id.clone(),
            title: video.title.clone(),
            description: video.description.clone(),
            thumbnail_url: video.thumbnail_url.clone(),
            source_url: video.source_url.clone(),
            embed_url: video.embed_url.clone(),
            created_at,
        })
    }

    #[instrument(skip(self))]
    async fn find_video_by_external_id(&self, external_id: &str) -> Result<Option<Video>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM videos WHERE external_id = ?1", VIDEO_COLUMNS);
        let video = conn
            .query_row(&sql, params![external_id], Self::row_to_video)
            .optional()?;
        Ok(video)
    }

    #[instrument(skip(self))]
    async fn get_video(&self, video_id: i64) -> Result<Option<Video>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM videos WHERE id = ?1", VIDEO_COLUMNS);
        let video = conn
            .query_row(&sql, params![video_id], Self::row_to_video)
            .optional()?;
        Ok(video)
    }

    #[instrument(skip(self))]
    async fn list_videos(&self) -> Result<Vec<Video>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM videos ORDER BY id DESC", VIDEO_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let videos = stmt
            .query_map([], Self::row_to_video)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(videos)
    }

    #[instrument(skip(self))]
    async fn chunks_for_video(&self, video_id: i64) -> Result<Vec<TranscriptChunk>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM transcript_chunks WHERE video_id = ?1 ORDER BY start_time, id",
            CHUNK_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let chunks = stmt
            .query_map(params![video_id], Self::row_to_chunk)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(chunks)
    }

    async fn chunk_count(&self, video_id: i64) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transcript_chunks WHERE video_id = ?1",
            params![video_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    #[instrument(skip(self, query_embedding))]
    async fn search_chunks(
        &self,
        video_id: i64,
        query_embedding: &[f32],
        min_similarity: f32,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        check_dimensions(self.dimensions, query_embedding)?;

        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM transcript_chunks WHERE video_id = ?1 ORDER BY id",
            CHUNK_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let chunks = stmt
            .query_map(params![video_id], Self::row_to_chunk)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let candidates = chunks.into_iter().map(|c| {
            let embedding = c.embedding.clone();
            (c, embedding)
        });
        let results: Vec<ScoredChunk> =
            rank_by_similarity(candidates, query_embedding, min_similarity, limit)
                .into_iter()
                .map(|(chunk, similarity)| ScoredChunk { chunk, similarity })
                .collect();

        debug!("Found {} matching chunks", results.len());
        Ok(results)
    }

    #[instrument(skip(self, qa), fields(video_id = qa.video_id))]
    async fn insert_question_answer(&self, qa: &NewQuestionAnswer) -> Result<QuestionAnswer> {
        if let Some(embedding) = &qa.answer_embedding {
            check_dimensions(self.dimensions, embedding)?;
        }

        let conn = self.lock()?;
        let asked_at = Utc::now();
        conn.execute(
            r#"
            INSERT INTO question_answers
            (video_id, question, answer, answer_embedding, most_relevant_timestamp, asked_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                qa.video_id,
                qa.question,
                qa.answer,
                qa.answer_embedding.as_deref().map(Self::embedding_to_bytes),
                qa.most_relevant_timestamp,
                asked_at.to_rfc3339(),
            ],
        )
        .map_err(|e| TubeqaError::Persistence(format!("Failed to write answer: {}", e)))?;

        let id = conn.last_insert_rowid();
        debug!("Stored question/answer {}", id);

        Ok(QuestionAnswer {
            id,
            video_id: qa.video_id,
            question: qa.question.clone(),
            answer: qa.answer.clone(),
            answer_embedding: qa.answer_embedding.clone(),
            most_relevant_timestamp: qa.most_relevant_timestamp,
            asked_at,
        })
    }

    #[instrument(skip(self, query_embedding))]
    async fn search_question_answers(
        &self,
        video_id: i64,
        query_embedding: &[f32],
        min_similarity: f32,
        limit: usize,
    ) -> Result<Vec<ScoredQuestionAnswer>> {
        check_dimensions(self.dimensions, query_embedding)?;

        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM question_answers \
             WHERE video_id = ?1 AND answer_embedding IS NOT NULL ORDER BY id",
            QA_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![video_id], Self::row_to_question_answer)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let candidates = rows.into_iter().filter_map(|qa| {
            let embedding = qa.answer_embedding.clone()?;
            Some((qa, embedding))
        });
        let results: Vec<ScoredQuestionAnswer> =
            rank_by_similarity(candidates, query_embedding, min_similarity, limit)
                .into_iter()
                .map(|(question_answer, similarity)| ScoredQuestionAnswer {
                    question_answer,
                    similarity,
                })
                .collect();

        debug!("Found {} matching prior answers", results.len());
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn list_question_answers(&self, video_id: i64) -> Result<Vec<QuestionAnswer>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM question_answers WHERE video_id = ?1 ORDER BY id DESC",
            QA_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![video_id], Self::row_to_question_answer)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
