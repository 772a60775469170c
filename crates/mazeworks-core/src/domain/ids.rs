//! Domain identifiers (strongly-typed IDs).
//!
//! すべての ID は ULID ベースの `Id<T>` で表現します。
//! `T` は PhantomData のマーカー型なので実行時コストはなく、
//! `JobId` と `FormulaId` のような異なる ID をコンパイル時に区別できます。
//!
//! ULID は時刻でソート可能なので、ログやダッシュボード上で
//! 生成順に並べることができます。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"job-", "formula-" など）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent, bound = "")]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

macro_rules! id_marker {
    ($(#[$doc:meta])* $marker:ident, $alias:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $marker {}

        impl IdMarker for $marker {
            fn prefix() -> &'static str {
                $prefix
            }
        }

        $(#[$doc])*
        pub type $alias = Id<$marker>;
    };
}

// ========================================
// マーカー型と Type Alias
// ========================================

id_marker!(
    /// Identifier of a background job.
    Job, JobId, "job-"
);
id_marker!(
    /// Identifier of a persisted maze formula.
    Formula, FormulaId, "formula-"
);
id_marker!(
    /// Identifier of a persisted permutation (one placement of a formula).
    Permutation, PermutationId, "perm-"
);
id_marker!(
    /// Identifier of a solved, playable candidate.
    Candidate, CandidateId, "candidate-"
);
id_marker!(
    /// Identifier of a worker (pool instance).
    Worker, WorkerId, "worker-"
);
id_marker!(
    /// Identifier of one worker thread.
    WorkerThread, WorkerThreadId, "thread-"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let ulid = Ulid::new();

        let job = JobId::from_ulid(ulid);
        let formula = FormulaId::from_ulid(ulid);
        let thread = WorkerThreadId::from_ulid(ulid);

        assert_eq!(job.as_ulid(), formula.as_ulid());

        // 同じ ULID でも Display のプレフィックスで区別される
        assert!(job.to_string().starts_with("job-"));
        assert!(formula.to_string().starts_with("formula-"));
        assert!(thread.to_string().starts_with("thread-"));

        // let _: JobId = formula; // <- does not compile
    }

    #[test]
    fn ulid_ids_are_sortable() {
        let id1 = JobId::from_ulid(Ulid::new());
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = JobId::from_ulid(Ulid::new());

        assert!(id1 < id2);
    }

    #[test]
    fn ids_serialize_as_bare_ulids() {
        let formula_id = FormulaId::from_ulid(Ulid::new());

        let serialized = serde_json::to_string(&formula_id).unwrap();
        assert_eq!(serialized, format!("\"{}\"", formula_id.as_ulid()));

        let deserialized: FormulaId = serde_json::from_str(&serialized).unwrap();
        assert_eq!(formula_id, deserialized);
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        use std::mem::size_of;

        assert_eq!(size_of::<JobId>(), size_of::<Ulid>());
        assert_eq!(size_of::<WorkerThreadId>(), 16);
    }
}
