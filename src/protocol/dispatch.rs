use std::sync::Arc;
use std::time::Instant;
use log::debug;
use crate::Store;
use super::{Method, Query, QueryResult, Status};

/// Validates a [`Query`], runs it against the store and builds the [`QueryResult`].
///
/// Every transport goes through the same dispatcher; transports only differ
/// in how they decode queries and encode results. Dispatch never fails: every
/// outcome is a status.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn Store>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn dispatch(&self, query: Query) -> QueryResult {
        let begin = Instant::now();

        if query.key.is_empty() {
            debug!("rejecting {:?} without a key", query.method);
            return QueryResult::new(Status::BadRequest, Vec::new(), begin.elapsed());
        }

        let (status, value) = match query.method {
            Method::Select => match self.store.get(&query.key) {
                Some(value) => (Status::Ok, value),
                None => (Status::NotFound, Vec::new()),
            },
            // Created means an existing value was overwritten.
            Method::Insert => {
                if self.store.set(&query.key, query.value) {
                    (Status::Created, Vec::new())
                } else {
                    (Status::Ok, Vec::new())
                }
            }
            Method::Delete => {
                if self.store.delete(&query.key) {
                    (Status::Ok, Vec::new())
                } else {
                    (Status::NotFound, Vec::new())
                }
            }
            Method::Unknown(code) => {
                debug!("unknown method {} for key {}", code, query.key);
                (Status::NotFound, Vec::new())
            }
        };

        QueryResult::new(status, value, begin.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Bucket, PartitionedStore};

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Arc::new(PartitionedStore::new(4)))
    }

    #[test]
    fn test_insert_select_delete_sequence() {
        let d = dispatcher();

        let res = d.dispatch(Query::insert("abc", b"hello".to_vec()));
        assert_eq!(res.status, Status::Ok);
        assert!(res.value.is_empty());
        assert!(!res.duration.is_empty());

        let res = d.dispatch(Query::insert("abc", b"world".to_vec()));
        assert_eq!(res.status, Status::Created);

        let res = d.dispatch(Query::select("abc"));
        assert_eq!(res.status, Status::Ok);
        assert_eq!(res.value, b"world");

        let res = d.dispatch(Query::delete("abc"));
        assert_eq!(res.status, Status::Ok);
        assert!(res.value.is_empty());

        assert_eq!(d.dispatch(Query::select("abc")).status, Status::NotFound);
        assert_eq!(d.dispatch(Query::delete("abc")).status, Status::NotFound);
    }

    #[test]
    fn test_empty_key_is_bad_request_without_touching_store() {
        let d = dispatcher();
        for query in [Query::select(""), Query::insert("", b"v".to_vec()), Query::delete("")] {
            assert_eq!(d.dispatch(query).status, Status::BadRequest);
        }
        assert_eq!(d.store().get(""), None);
    }

    #[test]
    fn test_unknown_method_is_not_found() {
        let d = dispatcher();
        d.dispatch(Query::insert("abc", b"v".to_vec()));
        let query = Query { method: Method::Unknown(12), key: "abc".into(), value: Vec::new() };
        let res = d.dispatch(query);
        assert_eq!(res.status, Status::NotFound);
        assert_eq!(d.store().get("abc"), Some(b"v".to_vec()));
    }

    #[test]
    fn test_empty_value_round_trips() {
        let d = Dispatcher::new(Arc::new(Bucket::new()));
        assert_eq!(d.dispatch(Query::insert("k", Vec::new())).status, Status::Ok);
        let res = d.dispatch(Query::select("k"));
        assert_eq!(res.status, Status::Ok);
        assert!(res.value.is_empty());
    }
}
