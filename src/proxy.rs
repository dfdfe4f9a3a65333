//! C11 — the load-balancing proxy: routes a `Search` request to one of
//! several backends serving the requested corpus (spec.md §4.6).
//! Grounded byte-for-byte on `service/LoadBalanceProxy.{hpp,cpp}`'s
//! `bit_mix` consistent-hash routing.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::{NetspeakError, Result};
use crate::service::{Corpus, NetspeakService, SearchRequest, SearchResponse};

/// 16 rounds of xorshift* followed by a fixed odd multiplier — the exact
/// algorithm `LoadBalanceProxy.cpp`'s `bit_mix` uses to turn a query hash
/// into a backend index resistant to adversarial hash collisions.
fn bit_mix(mut x: u64) -> u64 {
    for _ in 0..16 {
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
    }
    x.wrapping_mul(0x2545_F491_4F6C_DD1D)
}

fn hash_query(query: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    query.hash(&mut hasher);
    hasher.finish()
}

fn are_compatible(a: &Corpus, b: &Corpus) -> bool {
    a.key != b.key || (a.language == b.language && a.name == b.name)
}

/// Unifies and load-balances any number of compatible Netspeak backends,
/// grouped by the corpus key they serve.
pub struct LoadBalanceProxy {
    services: HashMap<String, Vec<Arc<dyn NetspeakService>>>,
    corpora: Vec<Corpus>,
}

impl LoadBalanceProxy {
    /// Builds a proxy from `(corpus, backend)` pairs, one per corpus a
    /// backend serves. Fails with `IncompatibleCorpora` if two entries
    /// share a key but disagree on `name`/`language`.
    pub fn new(stubs: Vec<(Corpus, Arc<dyn NetspeakService>)>) -> Result<Self> {
        let mut services: HashMap<String, Vec<Arc<dyn NetspeakService>>> = HashMap::new();
        let mut corpora_by_key: HashMap<String, Corpus> = HashMap::new();
        let mut corpora = Vec::new();

        for (corpus, stub) in stubs {
            match corpora_by_key.get(&corpus.key) {
                Some(existing) if !are_compatible(existing, &corpus) => {
                    return Err(NetspeakError::IncompatibleCorpora {
                        key: corpus.key.clone(),
                        a: format!("{}/{}", existing.name, existing.language),
                        b: format!("{}/{}", corpus.name, corpus.language),
                    });
                }
                Some(_) => {}
                None => {
                    corpora_by_key.insert(corpus.key.clone(), corpus.clone());
                    corpora.push(corpus.clone());
                }
            }
            services.entry(corpus.key).or_insert_with(Vec::new).push(stub);
        }

        Ok(LoadBalanceProxy { services, corpora })
    }

    /// Routes to the single backend serving `request.corpus`, or, when
    /// several do, to `bit_mix(hash(query)) mod |backends|` for
    /// query-consistent, collision-resistant dispatch.
    pub fn search(&self, request: &SearchRequest) -> SearchResponse {
        let backends = self
            .services
            .get(&request.corpus)
            .ok_or_else(|| crate::service::SearchError::InvalidCorpus(format!("unknown corpus '{}'", request.corpus)))?;

        let backend = if backends.len() == 1 {
            &backends[0]
        } else {
            let index = (bit_mix(hash_query(&request.query)) % backends.len() as u64) as usize;
            &backends[index]
        };
        backend.search(request)
    }

    pub fn get_corpora(&self) -> Vec<Corpus> {
        self.corpora.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{SearchResult, NetspeakService};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubBackend {
        calls: AtomicUsize,
    }

    impl NetspeakService for StubBackend {
        fn search(&self, _request: &SearchRequest) -> SearchResponse {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(SearchResult::default())
        }
        fn get_corpora(&self) -> Vec<Corpus> {
            Vec::new()
        }
    }

    fn corpus(key: &str) -> Corpus {
        Corpus { key: key.to_string(), name: "English".to_string(), language: "en".to_string() }
    }

    #[test]
    fn unknown_corpus_is_rejected() {
        let proxy = LoadBalanceProxy::new(vec![]).unwrap();
        let request = SearchRequest { corpus: "en".to_string(), query: "hello".to_string(), max_phrases: 10 };
        assert_eq!(proxy.search(&request), Err(crate::service::SearchError::InvalidCorpus("unknown corpus 'en'".to_string())));
    }

    #[test]
    fn single_backend_is_forwarded_to_directly() {
        let backend: Arc<dyn NetspeakService> = Arc::new(StubBackend { calls: AtomicUsize::new(0) });
        let proxy = LoadBalanceProxy::new(vec![(corpus("en"), backend.clone())]).unwrap();
        let request = SearchRequest { corpus: "en".to_string(), query: "hello".to_string(), max_phrases: 10 };
        assert!(proxy.search(&request).is_ok());
    }

    #[test]
    fn incompatible_corpora_at_init_is_rejected() {
        let backend: Arc<dyn NetspeakService> = Arc::new(StubBackend { calls: AtomicUsize::new(0) });
        let mut b = corpus("en");
        b.language = "de".to_string();
        let result = LoadBalanceProxy::new(vec![(corpus("en"), backend.clone()), (b, backend)]);
        assert!(matches!(result, Err(NetspeakError::IncompatibleCorpora { .. })));
    }

    #[test]
    fn routing_is_consistent_for_the_same_query() {
        let a: Arc<dyn NetspeakService> = Arc::new(StubBackend { calls: AtomicUsize::new(0) });
        let b: Arc<dyn NetspeakService> = Arc::new(StubBackend { calls: AtomicUsize::new(0) });
        let proxy = LoadBalanceProxy::new(vec![(corpus("en"), a), (corpus("en"), b)]).unwrap();
        let request = SearchRequest { corpus: "en".to_string(), query: "hello world".to_string(), max_phrases: 10 };

        let backends = proxy.services.get("en").unwrap();
        let index_a = (bit_mix(hash_query(&request.query)) % backends.len() as u64) as usize;
        proxy.search(&request).unwrap();
        let index_b = (bit_mix(hash_query(&request.query)) % backends.len() as u64) as usize;
        assert_eq!(index_a, index_b);
    }
}
