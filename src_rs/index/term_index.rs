// 목적:
// - 세그먼트로 분할된 term 가중치 인덱스를 제공한다.
//
// 설명:
// - 문서는 전역 ID로 세그먼트에 배치되고, 세그먼트마다 term -> 로컬 postings를 가진다.
// - TermsQuery를 bind하면 세그먼트별 DisjunctionIterator를 내는 점수 소스가 된다.
// - 저장 필드(외부 ID, 그룹 키, 정렬 값)는 DocumentStore로 노출한다.
//
// 디자인 패턴:
// - 역색인(Inverted Index) + 어댑터(Adapter).
//
// 참조:
// - src_rs/index/postings.rs
// - src_rs/index/segment_source.rs

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::core::errors::{CoreError, CoreResult};
use crate::core::types::DocId;
use crate::index::postings::{DisjunctionIterator, Posting, PostingsIterator};
use crate::index::segment_source::{
    locate_segment, validate_segments, DocumentStore, SegmentDescriptor, SegmentScoreIterator,
    SegmentScoreSource,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedDocumentPayload {
    pub doc_id: DocId,
    pub external_id: String,
    #[serde(default)]
    pub group_key: Option<String>,
    #[serde(default)]
    pub terms: BTreeMap<String, f32>,
    #[serde(default)]
    pub sort_values: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermClausePayload {
    pub term: String,
    #[serde(default = "default_boost")]
    pub boost: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TermsQuery {
    pub clauses: Vec<TermClausePayload>,
}

fn default_boost() -> f32 {
    1.0
}

impl TermsQuery {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<String>,
    {
        Self {
            clauses: terms
                .into_iter()
                .map(|(term, boost)| TermClausePayload {
                    term: term.into(),
                    boost,
                })
                .collect(),
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.clauses.is_empty() {
            return Err(CoreError::InvalidConfig(
                "쿼리는 최소 1개 이상의 clause가 필요합니다".to_string(),
            ));
        }
        for clause in &self.clauses {
            if clause.term.trim().is_empty() {
                return Err(CoreError::InvalidConfig(
                    "쿼리 term은 비어 있을 수 없습니다".to_string(),
                ));
            }
            if !clause.boost.is_finite() {
                return Err(CoreError::InvalidConfig(format!(
                    "쿼리 term '{}'의 boost가 유한한 값이 아닙니다",
                    clause.term
                )));
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        let rendered = self
            .clauses
            .iter()
            .map(|clause| format!("{}^{}", clause.term, clause.boost))
            .collect::<Vec<_>>();
        format!("terms({})", rendered.join(" "))
    }
}

#[derive(Debug, Clone)]
struct StoredFields {
    external_id: String,
    group_key: Option<String>,
    sort_values: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default)]
struct LeafIndex {
    postings: HashMap<String, Vec<Posting>>,
}

#[derive(Debug, Clone)]
pub struct SegmentedTermIndex {
    segments: Vec<SegmentDescriptor>,
    leaves: Vec<LeafIndex>,
    stored: HashMap<DocId, StoredFields>,
}

impl SegmentedTermIndex {
    pub fn build(
        segments: Vec<SegmentDescriptor>,
        documents: &[IndexedDocumentPayload],
    ) -> CoreResult<Self> {
        validate_segments(&segments)?;

        let mut leaves = vec![LeafIndex::default(); segments.len()];
        let mut stored = HashMap::<DocId, StoredFields>::with_capacity(documents.len());

        for document in documents {
            if document.external_id.trim().is_empty() {
                return Err(CoreError::InvalidInput(format!(
                    "doc_id={}의 external_id가 비어 있습니다",
                    document.doc_id
                )));
            }
            if stored.contains_key(&document.doc_id) {
                return Err(CoreError::InvalidInput(format!(
                    "doc_id={}가 중복되었습니다",
                    document.doc_id
                )));
            }

            let ordinal = locate_segment(&segments, document.doc_id)?;
            let local_id = segments[ordinal].to_local(document.doc_id);
            for (term, weight) in &document.terms {
                if !weight.is_finite() {
                    return Err(CoreError::InvalidInput(format!(
                        "doc_id={} term '{}'의 가중치가 유한한 값이 아닙니다",
                        document.doc_id, term
                    )));
                }
                leaves[ordinal]
                    .postings
                    .entry(term.clone())
                    .or_default()
                    .push((local_id, *weight));
            }

            stored.insert(
                document.doc_id,
                StoredFields {
                    external_id: document.external_id.clone(),
                    group_key: document.group_key.clone(),
                    sort_values: document.sort_values.clone(),
                },
            );
        }

        for leaf in &mut leaves {
            for postings in leaf.postings.values_mut() {
                postings.sort_by_key(|(local_id, _)| *local_id);
            }
        }

        Ok(Self {
            segments,
            leaves,
            stored,
        })
    }

    pub fn segments(&self) -> &[SegmentDescriptor] {
        &self.segments
    }

    pub fn doc_count(&self) -> usize {
        self.stored.len()
    }

    /// 쿼리를 인덱스에 묶어 세그먼트 점수 소스를 만든다.
    pub fn bind<'a>(&'a self, query: &'a TermsQuery) -> CoreResult<BoundTermsQuery<'a>> {
        query.validate()?;
        Ok(BoundTermsQuery { index: self, query })
    }
}

impl DocumentStore for SegmentedTermIndex {
    fn external_id(&self, doc_id: DocId) -> Option<&str> {
        self.stored
            .get(&doc_id)
            .map(|fields| fields.external_id.as_str())
    }

    fn group_key(&self, doc_id: DocId) -> Option<&str> {
        self.stored
            .get(&doc_id)
            .and_then(|fields| fields.group_key.as_deref())
    }

    fn sort_value(&self, doc_id: DocId, field: &str) -> Option<f64> {
        self.stored
            .get(&doc_id)
            .and_then(|fields| fields.sort_values.get(field).copied())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BoundTermsQuery<'a> {
    index: &'a SegmentedTermIndex,
    query: &'a TermsQuery,
}

impl SegmentScoreSource for BoundTermsQuery<'_> {
    fn segments(&self) -> &[SegmentDescriptor] {
        &self.index.segments
    }

    fn scorer(&self, ordinal: usize) -> CoreResult<Option<Box<dyn SegmentScoreIterator + '_>>> {
        let leaf = self.index.leaves.get(ordinal).ok_or_else(|| {
            CoreError::InvariantViolation(format!("존재하지 않는 세그먼트 순번입니다: {}", ordinal))
        })?;

        let clauses = self
            .query
            .clauses
            .iter()
            .filter_map(|clause| {
                leaf.postings
                    .get(&clause.term)
                    .filter(|postings| !postings.is_empty())
                    .map(|postings| (PostingsIterator::new(postings), clause.boost))
            })
            .collect::<Vec<_>>();

        if clauses.is_empty() {
            return Ok(None);
        }
        Ok(Some(Box::new(DisjunctionIterator::new(clauses))))
    }

    fn describe(&self) -> String {
        self.query.describe()
    }
}
