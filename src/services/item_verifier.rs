//! 候选题验证服务 - 业务能力层
//!
//! 只负责"逐题验证候选题"能力，不关心选题和渲染

use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use crate::clients::VariantBackend;
use crate::error::{AppError, AppResult};
use crate::infrastructure::CancelToken;
use crate::models::{Stage, VariantCandidate, Verification};
use crate::services::progress::ProgressReporter;

/// 验证结果汇总
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerificationReport {
    /// 通过验证的候选题，保持输入顺序
    pub verified: Vec<VariantCandidate>,
    /// 生成阶段已报错而跳过的数量
    pub skipped: usize,
    /// 服务端判定不通过的数量
    pub rejected: usize,
    /// 验证请求本身失败的数量
    pub failed: usize,
}

impl VerificationReport {
    pub fn processed(&self) -> usize {
        self.verified.len() + self.skipped + self.rejected + self.failed
    }
}

enum Outcome {
    Verified(VariantCandidate),
    Skipped(String),
    Rejected,
    Failed(AppError),
    Cancelled,
}

/// 候选题验证服务
///
/// 职责：
/// - 跳过生成阶段已带 `error` 的候选题
/// - 对其余候选题逐个调用快速验证
/// - 通过的候选题附加 `verification = {is_correct: true, method: "local"}`
/// - 单题失败只影响计数，不会中止整个流程
pub struct ItemVerifier<'a, B> {
    backend: &'a B,
    concurrency: usize,
}

impl<'a, B: VariantBackend> ItemVerifier<'a, B> {
    /// 创建验证服务
    ///
    /// # 参数
    /// - `concurrency`: 同时进行的验证请求数，0 按 1 处理
    pub fn new(backend: &'a B, concurrency: usize) -> Self {
        Self {
            backend,
            concurrency: concurrency.max(1),
        }
    }

    /// 验证整批候选题
    ///
    /// 结果按输入顺序回收，进度按已处理数量在验证区间内插值，并发时同样单调
    ///
    /// # 返回
    /// 取消时返回 `AppError::Cancelled`，其余情况总是 `Ok`
    pub async fn verify(
        &self,
        candidates: Vec<VariantCandidate>,
        reporter: &mut ProgressReporter,
        cancel: &CancelToken,
    ) -> AppResult<VerificationReport> {
        let total = candidates.len();
        let backend = self.backend;
        let mut report = VerificationReport::default();

        let mut outcomes = stream::iter(candidates)
            .map(|candidate| async move {
                if cancel.is_cancelled() {
                    return Outcome::Cancelled;
                }
                if candidate.has_error() {
                    return Outcome::Skipped(candidate.error.unwrap_or_default());
                }
                let verified = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Outcome::Cancelled,
                    verified = backend.quick_verify(&candidate) => verified,
                };
                match verified {
                    Ok(true) => {
                        let mut candidate = candidate;
                        candidate.verification = Some(Verification::local());
                        Outcome::Verified(candidate)
                    }
                    Ok(false) => Outcome::Rejected,
                    Err(e) => Outcome::Failed(e),
                }
            })
            .buffered(self.concurrency);

        let mut index = 0;
        while let Some(outcome) = outcomes.next().await {
            index += 1;
            match outcome {
                Outcome::Cancelled => {
                    return Err(AppError::Cancelled {
                        stage: Stage::Verifying,
                    })
                }
                Outcome::Verified(candidate) => report.verified.push(candidate),
                Outcome::Skipped(error) => {
                    debug!("跳过候选题 #{}: {}", index, error);
                    report.skipped += 1;
                }
                Outcome::Rejected => {
                    debug!("候选题 #{} 未通过验证", index);
                    report.rejected += 1;
                }
                Outcome::Failed(e) => {
                    debug!("候选题 #{} 验证请求失败: {}", index, e);
                    report.failed += 1;
                }
            }

            reporter.items(
                Stage::Verifying,
                report.processed(),
                total,
                format!("验证中 {}/{} (通过 {})", report.processed(), total, report.verified.len()),
            );
        }

        info!(
            "✓ 验证完成: 通过 {} / 跳过 {} / 未通过 {} / 失败 {}",
            report.verified.len(),
            report.skipped,
            report.rejected,
            report.failed
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Difficulty, DifficultySpec, GenerationBatch, OriginalSolution, Question,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 按题干决定验证结果："reject" 不通过，"boom" 请求失败
    struct ScriptedBackend {
        calls: AtomicUsize,
    }

    impl VariantBackend for ScriptedBackend {
        async fn generate_code(&self, _: &Question) -> AppResult<String> {
            unreachable!()
        }

        async fn execute_code(&self, _: &str, _: &DifficultySpec) -> AppResult<GenerationBatch> {
            unreachable!()
        }

        async fn solve_original(&self, _: &Question) -> AppResult<OriginalSolution> {
            unreachable!()
        }

        async fn quick_verify(&self, variant: &VariantCandidate) -> AppResult<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match variant.text.as_str() {
                "reject" => Ok(false),
                "boom" => Err(AppError::Other("connection reset".into())),
                _ => Ok(true),
            }
        }
    }

    fn backend() -> ScriptedBackend {
        ScriptedBackend {
            calls: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn drops_errored_rejected_and_failed_items() {
        let backend = backend();
        let candidates = vec![
            VariantCandidate::new(Difficulty::Easy, "ok-1"),
            VariantCandidate::new(Difficulty::Easy, "x").with_error("SyntaxError"),
            VariantCandidate::new(Difficulty::Medium, "reject"),
            VariantCandidate::new(Difficulty::Hard, "boom"),
            VariantCandidate::new(Difficulty::Hard, "ok-2"),
        ];

        let mut reporter = ProgressReporter::new("[test]");
        let report = ItemVerifier::new(&backend, 1)
            .verify(candidates, &mut reporter, &CancelToken::new())
            .await
            .unwrap();

        let texts: Vec<&str> = report.verified.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["ok-1", "ok-2"]);
        assert!(report.verified.iter().all(|c| c.verification == Some(Verification::local())));
        assert_eq!((report.skipped, report.rejected, report.failed), (1, 1, 1));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 4);
        assert_eq!(reporter.percent(), 90);
    }

    #[tokio::test]
    async fn concurrent_verification_keeps_input_order() {
        let backend = backend();
        let candidates: Vec<VariantCandidate> = (0..8)
            .map(|i| VariantCandidate::new(Difficulty::Medium, format!("q{}", i)))
            .collect();

        let (mut reporter, mut rx) = ProgressReporter::channel("[test]");
        let report = ItemVerifier::new(&backend, 4)
            .verify(candidates, &mut reporter, &CancelToken::new())
            .await
            .unwrap();

        let texts: Vec<String> = report.verified.iter().map(|c| c.text.clone()).collect();
        let expected: Vec<String> = (0..8).map(|i| format!("q{}", i)).collect();
        assert_eq!(texts, expected);

        let mut last = 0;
        while let Ok(event) = rx.try_recv() {
            assert!(event.percent >= last);
            last = event.percent;
        }
        assert_eq!(last, 90);
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_requests() {
        let backend = backend();
        let cancel = CancelToken::new();
        cancel.cancel();

        let mut reporter = ProgressReporter::new("[test]");
        let err = ItemVerifier::new(&backend, 1)
            .verify(
                vec![VariantCandidate::new(Difficulty::Easy, "q")],
                &mut reporter,
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_batch_is_not_an_error() {
        let backend = backend();
        let mut reporter = ProgressReporter::new("[test]");
        let report = ItemVerifier::new(&backend, 0)
            .verify(Vec::new(), &mut reporter, &CancelToken::new())
            .await
            .unwrap();
        assert!(report.verified.is_empty());
        assert_eq!(report.processed(), 0);
    }
}
