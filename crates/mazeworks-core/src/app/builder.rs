//! RunnerBuilder - JobRunner の構築と起動時検証
//!
//! # Fail-fast 設計
//! - expect_kinds() で期待される job kind を登録
//! - build() 時に「期待集合 ⊆ 登録済み集合」をチェック
//! - 不足があれば BuildError を返す

use std::sync::Arc;

use super::runner::{HandlerRegistry, JobHandler, JobRunner, RegistryError};
use crate::domain::JobKind;

/// # 使用例
/// ```
/// use mazeworks_core::app::{RunnerBuilder, GenerateFormulasHandler};
/// use mazeworks_core::domain::JobKind;
/// use std::sync::Arc;
///
/// let runner = RunnerBuilder::new()
///     .register(JobKind::GenerateFormulas, Arc::new(GenerateFormulasHandler))
///     .unwrap()
///     .expect_kinds(&[JobKind::GenerateFormulas])
///     .build()
///     .unwrap();
/// assert_eq!(runner.registry().len(), 1);
/// ```
pub struct RunnerBuilder {
    registry: HandlerRegistry,
    expected: Option<Vec<JobKind>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing job kinds: {0:?}. These kinds were expected but not registered.")]
    MissingJobKinds(Vec<JobKind>),
}

impl RunnerBuilder {
    pub fn new() -> Self {
        Self {
            registry: HandlerRegistry::new(),
            expected: None,
        }
    }

    /// Starts from the built-in handlers.
    pub fn standard() -> Self {
        Self {
            registry: HandlerRegistry::standard(),
            expected: Some(JobKind::ALL.to_vec()),
        }
    }

    pub fn register(
        mut self,
        kind: JobKind,
        handler: Arc<dyn JobHandler>,
    ) -> Result<Self, RegistryError> {
        self.registry.register(kind, handler)?;
        Ok(self)
    }

    pub fn expect_kinds(mut self, kinds: &[JobKind]) -> Self {
        self.expected = Some(kinds.to_vec());
        self
    }

    pub fn build(self) -> Result<JobRunner, BuildError> {
        if let Some(expected) = &self.expected {
            let registered = self.registry.kinds();
            let missing: Vec<JobKind> = expected
                .iter()
                .filter(|kind| !registered.contains(kind))
                .copied()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingJobKinds(missing));
            }
        }
        Ok(JobRunner::new(self.registry))
    }
}

impl Default for RunnerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::runner::{GeneratePermutationsHandler, SolveCandidatesHandler};

    #[test]
    fn build_success() {
        let runner = RunnerBuilder::new()
            .register(JobKind::SolveCandidates, Arc::new(SolveCandidatesHandler))
            .unwrap()
            .expect_kinds(&[JobKind::SolveCandidates])
            .build();
        assert!(runner.is_ok());
    }

    #[test]
    fn build_missing_job_kinds() {
        let runner = RunnerBuilder::new()
            .register(JobKind::GeneratePermutations, Arc::new(GeneratePermutationsHandler))
            .unwrap()
            .expect_kinds(&[JobKind::GeneratePermutations, JobKind::SolveCandidates])
            .build();
        assert!(matches!(
            runner,
            Err(BuildError::MissingJobKinds(missing)) if missing == vec![JobKind::SolveCandidates]
        ));
    }

    #[test]
    fn build_without_expectations() {
        assert!(RunnerBuilder::new().build().is_ok());
    }

    #[test]
    fn standard_builder_covers_every_kind() {
        let runner = RunnerBuilder::standard().build().unwrap();
        assert_eq!(runner.registry().kinds(), JobKind::ALL.to_vec());
    }
}
