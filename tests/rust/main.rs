use std::collections::{BTreeMap, HashMap};

use rstest::rstest;
use vtree_rerank::index::memory::InMemoryScoreSource;
use vtree_rerank::index::term_index::{IndexedDocumentPayload, SegmentedTermIndex, TermsQuery};
use vtree_rerank::{
    execute_rerank, rerank_with_index, BoostContext, BoostMap, CoreError, DiversityConfigPayload,
    DiversityShuffler, DocId, DocumentStore, LinearCombine, RerankCollector, RerankConfigPayload,
    RerankRequestPayload, ResultSet, ScoredDoc, SegmentDescriptor, SegmentMergeRescorer,
    SortFieldPayload, TopDocsCollector,
};

struct ExternalIds(HashMap<DocId, String>);

impl DocumentStore for ExternalIds {
    fn external_id(&self, doc_id: DocId) -> Option<&str> {
        self.0.get(&doc_id).map(String::as_str)
    }

    fn group_key(&self, _doc_id: DocId) -> Option<&str> {
        None
    }

    fn sort_value(&self, _doc_id: DocId, _field: &str) -> Option<f64> {
        None
    }
}

fn external_ids(count: DocId) -> ExternalIds {
    ExternalIds((0..count).map(|id| (id, format!("sku-{id}"))).collect())
}

/// doc i의 1차 점수는 count - i, 2차 점수는 10 * i다.
fn descending_sources(count: DocId) -> (InMemoryScoreSource, InMemoryScoreSource) {
    let segments = vec![SegmentDescriptor::new(0, 4), SegmentDescriptor::new(4, 16)];
    let first = InMemoryScoreSource::new(
        segments.clone(),
        (0..count).map(|id| (id, (count - id) as f32)),
    )
    .expect("valid first pass");
    let second = InMemoryScoreSource::new(segments, (0..count).map(|id| (id, 10.0 * id as f32)))
        .expect("valid second pass");
    (first, second)
}

fn assert_segments_within_quota(docs: &[ScoredDoc], quota: usize, size: usize, segments: usize) {
    for (index, window) in docs.chunks(size).take(segments).enumerate() {
        let mut counts = HashMap::<&str, usize>::new();
        for doc in window {
            if let Some(key) = doc.group_key.as_deref() {
                *counts.entry(key).or_insert(0) += 1;
            }
        }
        for (group, count) in counts {
            assert!(
                count <= quota,
                "segment {index} holds {count} docs of group {group}"
            );
        }
    }
}

fn document(doc_id: DocId, group: &str, terms: &[(&str, f32)]) -> IndexedDocumentPayload {
    IndexedDocumentPayload {
        doc_id,
        external_id: format!("sku-{doc_id}"),
        group_key: Some(group.to_string()),
        terms: terms
            .iter()
            .map(|(term, weight)| (term.to_string(), *weight))
            .collect(),
        sort_values: BTreeMap::from([("price".to_string(), f64::from(doc_id))]),
    }
}

#[test]
fn rescoring_example_promotes_second_pass_match() {
    let source = InMemoryScoreSource::new(vec![SegmentDescriptor::new(0, 10)], vec![(2, 3.0)])
        .expect("valid source");
    let rescorer = SegmentMergeRescorer::new(&source, LinearCombine::new(1.0));
    let first_pass = ResultSet::from_ranked(
        3,
        vec![
            ScoredDoc::new(5, 1.0),
            ScoredDoc::new(2, 0.9),
            ScoredDoc::new(9, 0.8),
        ],
    );

    let rescored = rescorer.rescore(&first_pass, 3).expect("rescore succeeds");
    assert_eq!(rescored.doc_ids(), vec![2, 5, 9]);
    assert!((rescored.docs[0].score - 3.9).abs() < 1e-6);
    assert_eq!(rescored.docs[1].score, 1.0);
    assert_eq!(rescored.docs[2].score, 0.8);
}

#[rstest]
#[case(0, 0)]
#[case(1, 1)]
#[case(3, 3)]
#[case(6, 6)]
#[case(20, 6)]
fn rescore_truncates_to_top_n(#[case] top_n: usize, #[case] expected: usize) {
    let (first, second) = descending_sources(6);
    let mut collector = RerankCollector::new(6, 6, None);
    collector
        .collect_from(&first, &external_ids(6))
        .expect("collect succeeds");
    let first_pass = collector.top_docs(0, 6);

    let rescorer = SegmentMergeRescorer::new(&second, LinearCombine::new(1.0));
    let rescored = rescorer.rescore(&first_pass, top_n).expect("rescore succeeds");

    assert_eq!(rescored.docs.len(), expected);
    assert_eq!(rescored.total_hits, 6);
    for pair in rescored.docs.windows(2) {
        assert!(
            pair[0].score > pair[1].score
                || (pair[0].score == pair[1].score && pair[0].doc_id < pair[1].doc_id)
        );
    }
}

#[test]
fn rescore_is_reproducible() {
    let (first, second) = descending_sources(8);
    let mut collector = RerankCollector::new(8, 8, None);
    collector
        .collect_from(&first, &external_ids(8))
        .expect("collect succeeds");
    let first_pass = collector.top_docs(0, 8);
    let rescorer = SegmentMergeRescorer::new(&second, LinearCombine::new(0.5));

    let once = rescorer.rescore(&first_pass, 8).expect("rescore succeeds");
    let twice = rescorer.rescore(&first_pass, 8).expect("rescore succeeds");
    assert_eq!(once, twice);
}

#[rstest]
#[case(3, 0)]
#[case(3, 2)]
#[case(3, 4)]
#[case(4, 6)]
fn page_overlays_rescored_slice_on_first_pass_order(#[case] slice: usize, #[case] extra: usize) {
    let (first, second) = descending_sources(10);
    let mut collector = RerankCollector::new(slice, slice + extra, None);
    collector
        .collect_from(&first, &external_ids(10))
        .expect("collect succeeds");

    let rescorer = SegmentMergeRescorer::new(&second, LinearCombine::new(1.0));
    let page = collector.rerank(&rescorer, None).expect("rerank succeeds");

    let first_pass = collector.top_docs(0, slice + extra);
    let expected_head = rescorer
        .rescore(&collector.top_docs(0, slice), slice)
        .expect("rescore succeeds");

    assert_eq!(page.docs.len(), slice + extra);
    assert_eq!(&page.docs[..slice], expected_head.docs.as_slice());
    assert_eq!(&page.docs[slice..], &first_pass.docs[slice..]);
    assert_eq!(page.max_score, Some(page.docs[0].score));
    assert_eq!(page.total_hits, 10);
}

#[test]
fn page_shorter_than_slice_truncates_rescored_docs() {
    let (first, second) = descending_sources(10);
    let mut collector = RerankCollector::new(5, 2, None);
    collector
        .collect_from(&first, &external_ids(10))
        .expect("collect succeeds");
    let rescorer = SegmentMergeRescorer::new(&second, LinearCombine::new(1.0));
    let page = collector.rerank(&rescorer, None).expect("rerank succeeds");
    assert_eq!(page.doc_ids(), vec![4, 3]);
}

#[test]
fn page_is_capped_by_first_pass_hit_count() {
    let (first, second) = descending_sources(3);
    let mut collector = RerankCollector::new(2, 10, None);
    collector
        .collect_from(&first, &external_ids(3))
        .expect("collect succeeds");
    let rescorer = SegmentMergeRescorer::new(&second, LinearCombine::new(1.0));
    let page = collector.rerank(&rescorer, None).expect("rerank succeeds");
    assert_eq!(page.doc_ids(), vec![1, 0, 2]);
}

#[test]
fn boosted_documents_lead_the_page() {
    let (first, second) = descending_sources(6);
    let store = external_ids(6);
    let mut collector = RerankCollector::new(4, 6, None);
    collector.collect_from(&first, &store).expect("collect succeeds");

    let rescorer = SegmentMergeRescorer::new(&second, LinearCombine::new(1.0));
    let boosts = BoostMap::new()
        .with_priority("sku-0", 0)
        .with_priority("sku-2", 1);
    let page = collector
        .rerank(
            &rescorer,
            Some(BoostContext {
                boosts: &boosts,
                store: &store,
            }),
        )
        .expect("rerank succeeds");

    // 재채점 순서는 3, 2, 1, 0이고 boost가 0과 2를 맨 앞으로 올린다.
    assert_eq!(page.doc_ids(), vec![0, 2, 3, 1, 4, 5]);
    let rescored_max = 3.0 + 30.0;
    assert_eq!(page.docs[0].score, rescored_max + 2.0);
    assert_eq!(page.docs[1].score, rescored_max + 1.0);
    assert_eq!(page.max_score, Some(rescored_max + 2.0));
}

#[test]
fn invalid_boost_map_is_client_fault() {
    let (first, second) = descending_sources(4);
    let store = external_ids(4);
    let mut collector = RerankCollector::new(4, 4, None);
    collector.collect_from(&first, &store).expect("collect succeeds");
    let rescorer = SegmentMergeRescorer::new(&second, LinearCombine::new(1.0));
    let boosts = BoostMap::new().with_priority("", 0);

    let err = collector
        .rerank(
            &rescorer,
            Some(BoostContext {
                boosts: &boosts,
                store: &store,
            }),
        )
        .expect_err("blank boost key");
    assert!(err.is_client_fault());
}

#[test]
fn diversity_example_swaps_across_boundary() {
    let mut docs = vec![
        ScoredDoc::with_group(0, 10.0, "A"),
        ScoredDoc::with_group(1, 9.0, "A"),
        ScoredDoc::with_group(2, 8.0, "B"),
        ScoredDoc::with_group(3, 7.0, "C"),
        ScoredDoc::with_group(4, 6.0, "D"),
    ];
    DiversityShuffler::new(1, 4, 1)
        .diversify(&mut docs)
        .expect("diversify succeeds");

    let ids = docs.iter().map(|doc| doc.doc_id).collect::<Vec<_>>();
    assert_eq!(ids, vec![0, 2, 3, 4, 1]);
    assert!(docs[3].score > 6.5 && docs[3].score - 6.5 < 1e-4);
    assert!(docs[4].score < 6.5 && 6.5 - docs[4].score < 1e-4);
}

#[rstest]
#[case(1, 3, 3, &["A", "A", "A", "B", "B", "B", "C", "C", "C", "D"])]
#[case(1, 2, 3, &["A", "A", "B", "B", "C", "C", "D", "E"])]
#[case(2, 4, 2, &["A", "A", "A", "A", "B", "B", "B", "C", "C", "D", "E"])]
fn diversity_enforces_quota_per_segment(
    #[case] quota: usize,
    #[case] size: usize,
    #[case] segments: usize,
    #[case] groups: &[&str],
) {
    let count = groups.len();
    let mut docs = groups
        .iter()
        .enumerate()
        .map(|(index, group)| ScoredDoc::with_group(index as DocId, (count - index) as f32, *group))
        .collect::<Vec<_>>();

    DiversityShuffler::new(quota, size, segments)
        .diversify(&mut docs)
        .expect("enough distinct groups");

    assert_eq!(docs.len(), count);
    assert_segments_within_quota(&docs, quota, size, segments);
    for pair in docs.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[rstest]
#[case(1, 3, 2, &["A", "B", "X", "D", "D", "X", "Y", "Z", "W"])]
#[case(1, 3, 3, &["A", "A", "A", "B", "B", "B", "C", "C", "C", "D"])]
#[case(1, 2, 3, &["A", "A", "B", "B", "C", "C", "D", "E"])]
fn diversity_with_tied_scores_enforces_quota(
    #[case] quota: usize,
    #[case] size: usize,
    #[case] segments: usize,
    #[case] groups: &[&str],
) {
    let mut docs = groups
        .iter()
        .enumerate()
        .map(|(index, group)| ScoredDoc::with_group(index as DocId, 1.0, *group))
        .collect::<Vec<_>>();

    DiversityShuffler::new(quota, size, segments)
        .diversify(&mut docs)
        .expect("enough distinct groups");

    assert_eq!(docs.len(), groups.len());
    assert_segments_within_quota(&docs, quota, size, segments);
    assert!(docs.iter().all(|doc| doc.score == 1.0));
}

#[test]
fn diversity_is_deterministic() {
    let build = || {
        ["A", "A", "B", "A", "C", "B", "D"]
            .iter()
            .enumerate()
            .map(|(index, group)| ScoredDoc::with_group(index as DocId, 1.0, *group))
            .collect::<Vec<_>>()
    };
    let mut left = build();
    let mut right = build();
    let shuffler = DiversityShuffler::new(1, 3, 2);
    shuffler.diversify(&mut left).expect("diversify succeeds");
    shuffler.diversify(&mut right).expect("diversify succeeds");
    assert_eq!(left, right);
    assert_segments_within_quota(&left, 1, 3, 2);
}

fn catalog() -> (Vec<SegmentDescriptor>, Vec<IndexedDocumentPayload>) {
    let segments = vec![SegmentDescriptor::new(0, 4), SegmentDescriptor::new(4, 6)];
    let groups = ["A", "A", "A", "B", "B", "B", "C", "C", "C", "D"];
    let documents = groups
        .iter()
        .enumerate()
        .map(|(index, group)| {
            let weight = (10 - index) as f32;
            document(index as DocId, group, &[("shoe", weight)])
        })
        .collect();
    (segments, documents)
}

#[test]
fn pipeline_applies_diversity_after_reranking() {
    let (segments, documents) = catalog();
    let payload = RerankRequestPayload {
        job_id: "job-diversity".to_string(),
        segments,
        documents,
        first_pass_query: TermsQuery::new([("shoe", 1.0)]),
        second_pass_query: TermsQuery::new([("unused", 1.0)]),
        config: RerankConfigPayload {
            rerank_docs: 10,
            page_length: 10,
            rerank_weight: 1.0,
            sort: None,
            diversity: Some(DiversityConfigPayload {
                group_quota: 1,
                segment_size: 3,
                segment_count: 3,
                epsilon: 1e-8,
            }),
        },
        boosts: None,
    };

    let outcome = execute_rerank(&payload).expect("pipeline succeeds");
    let groups = outcome
        .result
        .docs
        .iter()
        .map(|doc| doc.group_key.as_deref().unwrap_or("-"))
        .collect::<Vec<_>>();
    assert_eq!(groups, vec!["A", "B", "C", "A", "B", "C", "A", "B", "C", "D"]);
    assert_eq!(outcome.metrics.demoted_count, 3);
    assert_eq!(outcome.metrics.page_count, 10);
    assert_eq!(outcome.result.max_score, Some(10.0));
}

#[test]
fn pipeline_clamps_diversity_segments_to_page() {
    let (segments, documents) = catalog();
    let index = SegmentedTermIndex::build(segments, &documents).expect("valid index");
    let config = RerankConfigPayload {
        rerank_docs: 5,
        page_length: 5,
        rerank_weight: 1.0,
        sort: None,
        diversity: Some(DiversityConfigPayload {
            group_quota: 1,
            segment_size: 2,
            segment_count: 5,
            epsilon: 1e-8,
        }),
    };
    let (result, metrics) = rerank_with_index(
        &index,
        &TermsQuery::new([("shoe", 1.0)]),
        &TermsQuery::new([("unused", 1.0)]),
        &config,
        None,
    )
    .expect("pipeline succeeds");

    // 5개 문서로는 경계 비교를 포함해 2개 구간까지만 처리할 수 있다.
    assert_eq!(result.doc_ids(), vec![0, 3, 1, 4, 2]);
    assert_segments_within_quota(&result.docs, 1, 2, 2);
    assert_eq!(metrics.demoted_count, 2);
}

#[test]
fn pipeline_sorted_first_pass_with_boost() {
    let (segments, documents) = catalog();
    let index = SegmentedTermIndex::build(segments, &documents).expect("valid index");
    let config = RerankConfigPayload {
        rerank_docs: 3,
        page_length: 5,
        rerank_weight: 1.0,
        sort: Some(SortFieldPayload {
            field: "price".to_string(),
            descending: true,
        }),
        diversity: None,
    };
    let boosts = BoostMap::new().with_priority("sku-0", 0);

    let (result, metrics) = rerank_with_index(
        &index,
        &TermsQuery::new([("shoe", 1.0)]),
        &TermsQuery::new([("shoe", 1.0)]),
        &config,
        Some(&boosts),
    )
    .expect("pipeline succeeds");

    // 가격 내림차순 상위 9, 8, 7을 재채점하고, 나머지는 1차 순서(6, 5)로 채운다.
    // doc 0은 1차 상위 구간에 없으므로 boost 대상이 아니다.
    assert_eq!(result.doc_ids(), vec![7, 8, 9, 6, 5]);
    assert_eq!(result.docs[0].score, 6.0);
    assert_eq!(metrics.collected_count, 5);
    assert_eq!(metrics.rescored_count, 3);
    assert_eq!(metrics.first_pass_hits, 10);
}

#[test]
fn pipeline_rejects_malformed_second_pass_query() {
    let (segments, documents) = catalog();
    let payload = RerankRequestPayload {
        job_id: "job-bad".to_string(),
        segments,
        documents,
        first_pass_query: TermsQuery::new([("shoe", 1.0)]),
        second_pass_query: TermsQuery::default(),
        config: RerankConfigPayload::default(),
        boosts: None,
    };
    let err = execute_rerank(&payload).expect_err("empty second pass query");
    assert!(err.is_client_fault());
    assert!(matches!(err, CoreError::BadRequest(_)));
}

#[test]
fn pipeline_with_no_first_pass_hits_returns_empty_page() {
    let (segments, documents) = catalog();
    let index = SegmentedTermIndex::build(segments, &documents).expect("valid index");
    let (result, metrics) = rerank_with_index(
        &index,
        &TermsQuery::new([("boot", 1.0)]),
        &TermsQuery::new([("shoe", 1.0)]),
        &RerankConfigPayload::default(),
        None,
    )
    .expect("empty first pass is not an error");
    assert!(result.is_empty());
    assert_eq!(result.total_hits, 0);
    assert_eq!(metrics.page_count, 0);
}
