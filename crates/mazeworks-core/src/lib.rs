//! mazeworks-core
//!
//! Maze formula generation, placement enumeration with symmetry reduction,
//! a maze solver, and the worker pool that runs those as background jobs.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, maze type, square, formula, permutation, job, worker, errors）
//! - **ports**: 抽象化レイヤー（Store, Clock, IdGenerator）
//! - **grid**: SquareGrid と対称変換
//! - **solver**: MazeSolver と maze type ごとの traversal strategy
//! - **generator**: FormulaGenerator、設定範囲、validation
//! - **reducer**: SymmetryReducer（配置の列挙と対称による重複排除）
//! - **queue**: closeable な blocking FIFO queue
//! - **app**: worker pool、job 実行、control surface
//! - **impls**: 実装（MemoryStore）
//! - **config**: 設定ファイルの読み込み
//! - **observability**: tracing 初期化と status view

pub mod app;
pub mod config;
pub mod domain;
pub mod generator;
pub mod grid;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod queue;
pub mod reducer;
pub mod solver;
