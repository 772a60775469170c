//! Impls - ports の実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **MemoryStore**: process 内で完結する `Store`
//!
//! 永続化エンジンを使う実装は別クレートに置く想定です。

pub mod memory_store;

pub use self::memory_store::MemoryStore;
