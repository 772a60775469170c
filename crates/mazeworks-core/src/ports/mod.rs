//! Ports - 抽象化レイヤー
//!
//! 外部システム（永続化・時刻・ID 生成）へのインターフェースを定義し、
//! 実装の詳細を隠蔽します。開発用の実装は `impls` にあります。

pub mod clock;
pub mod id_generator;
pub mod store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::store::Store;
