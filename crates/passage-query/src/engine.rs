//! Retrieval engine: the orchestrator behind ingest and query.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use passage_core::{
    Embedder, Generator, MemoryConfig, MetadataStore, NewPassage, Normalizer, Passage,
    PassageError, QueryExpander, QueryResponse, Result, ScoredPassage, SearchConfig, Stats,
};
use passage_index::{LexicalIndex, VectorIndex};

use crate::fusion::fuse_results;
use crate::memory::ConversationMemory;

/// Memory key for single-tenant callers that pass no session.
const DEFAULT_SESSION: &str = "default";

/// Hybrid retrieval engine.
///
/// Owns the metadata store, both indices, and the conversation memory as
/// explicit instances - nothing is reachable through ambient state, so
/// tests can run isolated engines side by side.
///
/// Ingestion flows one way (metadata rows, then index entries); queries
/// fan out to both rankers and merge through fusion. Ingestion is not
/// atomic across stores: a failure after the metadata insert leaves rows
/// without index coverage, recovered by [`Self::rebuild_lexical_index`]
/// plus an operator-driven re-embed pass.
pub struct RetrievalEngine<S, E, G> {
    /// Metadata store: source of truth for content and session scoping.
    store: Arc<S>,

    /// Embedding collaborator.
    embedder: Arc<E>,

    /// Generation collaborator.
    generator: Arc<G>,

    /// Optional query-expansion collaborator.
    expander: Option<Arc<dyn QueryExpander>>,

    /// Dense index. Single writer, many readers.
    vector: RwLock<VectorIndex>,

    /// Sparse index. Single writer, many readers.
    lexical: RwLock<LexicalIndex>,

    /// Per-session interaction history.
    memory: ConversationMemory,

    /// Where the vector index blob is persisted.
    index_path: PathBuf,

    search: SearchConfig,
}

impl<S, E, G> RetrievalEngine<S, E, G>
where
    S: MetadataStore,
    E: Embedder,
    G: Generator,
{
    /// Open an engine: load the persisted vector index (degrading to
    /// empty on a corrupt blob) and rebuild the lexical index from the
    /// metadata store.
    pub async fn open(
        store: Arc<S>,
        embedder: Arc<E>,
        generator: Arc<G>,
        normalizer: Arc<dyn Normalizer>,
        index_path: impl Into<PathBuf>,
        search: SearchConfig,
        memory: MemoryConfig,
    ) -> Result<Self> {
        let index_path = index_path.into();

        let vector = match VectorIndex::load(&index_path) {
            Ok(index) => index,
            Err(PassageError::IndexLoad { message }) => {
                warn!("Vector index unreadable ({}), continuing with empty index", message);
                VectorIndex::new()
            }
            Err(e) => return Err(e),
        };

        // The lexical index is a derived cache; rebuilding it from the
        // store is the explicit initialization step, not a side effect
        let mut lexical = LexicalIndex::new(normalizer);
        let rows = store.fetch_all().await?;
        lexical.rebuild_from(&rows);
        info!(
            "Engine opened: {} vectors, {} lexical passages",
            vector.len(),
            lexical.len()
        );

        Ok(Self {
            store,
            embedder,
            generator,
            expander: None,
            vector: RwLock::new(vector),
            lexical: RwLock::new(lexical),
            memory: ConversationMemory::new(memory.capacity),
            index_path,
            search,
        })
    }

    /// Attach a query-expansion collaborator.
    pub fn with_expander(mut self, expander: Arc<dyn QueryExpander>) -> Self {
        self.expander = Some(expander);
        self
    }

    /// Ingest a document's passages under a session.
    ///
    /// Inserts metadata rows (capturing ids), embeds the batch, adds to
    /// the vector index, persists the index snapshot, then adds to the
    /// lexical index. Returns the assigned ids in passage order.
    pub async fn ingest(
        &self,
        session_id: Option<&str>,
        doc_id: &str,
        source_filename: &str,
        passages: &[String],
    ) -> Result<Vec<i64>> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::with_capacity(passages.len());
        for (index, content) in passages.iter().enumerate() {
            let id = self
                .store
                .insert_passage(NewPassage {
                    doc_id: doc_id.to_string(),
                    content: content.clone(),
                    chunk_index: index as u32,
                    source_filename: source_filename.to_string(),
                    session_id: session_id.map(String::from),
                })
                .await?;
            ids.push(id);
        }

        // From here on the rows exist as metadata; an error below leaves
        // them without index coverage (the accepted consistency gap)
        let texts: Vec<&str> = passages.iter().map(String::as_str).collect();
        let vectors = self.embedder.embed_documents(&texts).await?;

        {
            let mut vector = self.write_vector()?;
            vector.add(&ids, vectors)?;
            // Persist under the same write lock so the snapshot cannot
            // interleave with a concurrent add
            vector.persist(&self.index_path)?;
        }

        {
            let mut lexical = self.write_lexical()?;
            lexical.add(&ids, &texts);
        }

        info!(
            "Ingested {} passages from {} (session {:?})",
            ids.len(),
            doc_id,
            session_id
        );
        Ok(ids)
    }

    /// Answer a query against the session's corpus.
    ///
    /// Runs both rankers over an over-provisioned candidate pool, filters
    /// candidates to the session, fuses the lists, generates an answer
    /// from the fused contexts and the session's conversation memory, and
    /// records the new exchange. Pass `k = 0` for the configured default.
    pub async fn query(
        &self,
        session_id: Option<&str>,
        query_text: &str,
        k: usize,
    ) -> Result<QueryResponse> {
        let k = if k == 0 { self.search.default_top_k } else { k };

        let expanded = self.expand_query(query_text).await;
        let query_vector = self.embedder.embed_query(&expanded).await?;

        // Over-provision before the session filter: filtering can
        // eliminate candidates, and a sparse session may still come up
        // short of k (a known limit of the heuristic)
        let fetch_k = (k * self.search.candidate_factor).max(k);

        let vector_hits = self.read_vector()?.search(&query_vector, fetch_k)?;
        let lexical_hits = self.read_lexical()?.search(&expanded, fetch_k);

        let mut candidate_ids: Vec<i64> = vector_hits.iter().map(|(id, _)| *id).collect();
        candidate_ids.extend(lexical_hits.iter().map(|(id, _)| *id));
        candidate_ids.sort_unstable();
        candidate_ids.dedup();

        let rows = self.store.fetch_by_ids(&candidate_ids).await?;

        let semantic = hydrate_hits(vector_hits, &rows, session_id, k);
        let lexical = hydrate_hits(lexical_hits, &rows, session_id, k);

        debug!(
            "Query returned {} semantic and {} lexical candidates after session filter",
            semantic.len(),
            lexical.len()
        );

        let results = fuse_results(semantic, lexical, k);
        let contexts: Vec<String> = results.iter().map(|r| r.content.clone()).collect();

        let session_key = session_id.unwrap_or(DEFAULT_SESSION);
        let history = self.memory.get(session_key);

        let answer = self
            .generator
            .generate(&expanded, &contexts, &history)
            .await?;

        // Memory records what the user actually asked, not the expansion
        self.memory.append(session_key, query_text, &answer);

        Ok(QueryResponse { answer, results })
    }

    /// Conversation history for a session, oldest first.
    pub fn history(&self, session_id: Option<&str>) -> Vec<passage_core::Exchange> {
        self.memory.get(session_id.unwrap_or(DEFAULT_SESSION))
    }

    /// Drop a session's conversation history.
    pub fn clear_memory(&self, session_id: Option<&str>) {
        self.memory.clear(session_id.unwrap_or(DEFAULT_SESSION));
    }

    /// Rebuild the lexical index from the metadata store.
    ///
    /// The recovery path for rows ingested without index coverage;
    /// also runs implicitly at every [`Self::open`].
    pub async fn rebuild_lexical_index(&self) -> Result<usize> {
        let rows = self.store.fetch_all().await?;
        let mut lexical = self.write_lexical()?;
        lexical.rebuild_from(&rows);
        info!("Rebuilt lexical index over {} passages", lexical.len());
        Ok(lexical.len())
    }

    /// Store statistics.
    pub async fn stats(&self) -> Result<Stats> {
        self.store.stats().await
    }

    /// Query expansion with graceful degradation: an absent expander is
    /// a pass-through, and a failing one falls back to the raw query.
    async fn expand_query(&self, query_text: &str) -> String {
        if !self.search.expand_queries {
            return query_text.to_string();
        }
        let Some(expander) = &self.expander else {
            return query_text.to_string();
        };

        match expander.expand(query_text).await {
            Ok(expanded) => expanded,
            Err(e) => {
                warn!("Query expansion failed ({}), using raw query", e);
                query_text.to_string()
            }
        }
    }

    fn read_vector(&self) -> Result<RwLockReadGuard<'_, VectorIndex>> {
        self.vector
            .read()
            .map_err(|e| PassageError::internal(format!("vector index lock poisoned: {}", e)))
    }

    fn write_vector(&self) -> Result<RwLockWriteGuard<'_, VectorIndex>> {
        self.vector
            .write()
            .map_err(|e| PassageError::internal(format!("vector index lock poisoned: {}", e)))
    }

    fn read_lexical(&self) -> Result<RwLockReadGuard<'_, LexicalIndex>> {
        self.lexical
            .read()
            .map_err(|e| PassageError::internal(format!("lexical index lock poisoned: {}", e)))
    }

    fn write_lexical(&self) -> Result<RwLockWriteGuard<'_, LexicalIndex>> {
        self.lexical
            .write()
            .map_err(|e| PassageError::internal(format!("lexical index lock poisoned: {}", e)))
    }
}

/// Attach metadata to raw index hits, dropping ids without a stored row
/// and, when a session is given, rows outside it. Order is preserved and
/// the survivors are truncated to `k`.
fn hydrate_hits(
    hits: Vec<(i64, f32)>,
    rows: &HashMap<i64, Passage>,
    session_id: Option<&str>,
    k: usize,
) -> Vec<ScoredPassage> {
    hits.into_iter()
        .filter_map(|(id, score)| {
            let row = rows.get(&id)?;
            if let Some(session) = session_id {
                if row.session_id.as_deref() != Some(session) {
                    return None;
                }
            }
            Some(ScoredPassage::from_passage(row, score))
        })
        .take(k)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(id: i64, session: Option<&str>) -> Passage {
        Passage {
            id,
            doc_id: "doc.txt".to_string(),
            content: format!("content {}", id),
            chunk_index: 0,
            source_filename: "doc.txt".to_string(),
            created_at: 0,
            session_id: session.map(String::from),
        }
    }

    #[test]
    fn test_hydrate_drops_missing_rows() {
        let mut rows = HashMap::new();
        rows.insert(1, passage(1, None));

        let hits = vec![(1, 0.9), (2, 0.8)];
        let hydrated = hydrate_hits(hits, &rows, None, 5);

        assert_eq!(hydrated.len(), 1);
        assert_eq!(hydrated[0].id, 1);
    }

    #[test]
    fn test_hydrate_filters_by_session() {
        let mut rows = HashMap::new();
        rows.insert(1, passage(1, Some("s1")));
        rows.insert(2, passage(2, Some("s2")));
        rows.insert(3, passage(3, None));

        let hits = vec![(1, 0.9), (2, 0.8), (3, 0.7)];
        let hydrated = hydrate_hits(hits, &rows, Some("s1"), 5);

        assert_eq!(hydrated.len(), 1);
        assert_eq!(hydrated[0].id, 1);
    }

    #[test]
    fn test_hydrate_without_session_keeps_all() {
        let mut rows = HashMap::new();
        rows.insert(1, passage(1, Some("s1")));
        rows.insert(2, passage(2, None));

        let hits = vec![(1, 0.9), (2, 0.8)];
        let hydrated = hydrate_hits(hits, &rows, None, 5);

        assert_eq!(hydrated.len(), 2);
    }

    #[test]
    fn test_hydrate_truncates_to_k() {
        let mut rows = HashMap::new();
        for id in 1..=4 {
            rows.insert(id, passage(id, None));
        }

        let hits = (1..=4).map(|id| (id, 1.0 / id as f32)).collect();
        let hydrated = hydrate_hits(hits, &rows, None, 2);

        assert_eq!(hydrated.len(), 2);
        assert_eq!(hydrated[0].id, 1);
        assert_eq!(hydrated[1].id, 2);
    }
}
