//! 选题服务 - 业务能力层
//!
//! 从已验证的题池中按试卷设置挑出最终题目

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::models::{ExamSettings, VariantCandidate};

/// 选题服务
///
/// 职责：
/// - `mixed` 时从全部已验证题目中随机抽取
/// - 指定难度时优先抽取同难度题目，不够再用其他难度补足
/// - 题目不足时返回全部，不报错
///
/// 随机源可注入，测试时使用固定种子
pub struct SelectionFilter<R> {
    rng: R,
}

impl SelectionFilter<StdRng> {
    /// 使用系统熵初始化的随机源
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> SelectionFilter<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// 挑选至多 `settings.question_count` 道题
    pub fn select(
        &mut self,
        pool: Vec<VariantCandidate>,
        settings: &ExamSettings,
    ) -> Vec<VariantCandidate> {
        let count = settings.question_count;

        let mut selection = match settings.difficulty.target() {
            None => {
                let mut pool = pool;
                pool.shuffle(&mut self.rng);
                pool
            }
            Some(target) => {
                let (mut matching, mut other): (Vec<_>, Vec<_>) =
                    pool.into_iter().partition(|c| c.difficulty == target);
                matching.shuffle(&mut self.rng);
                if matching.len() < count {
                    debug!(
                        "难度 {} 只有 {} 道，使用其他难度补足到 {}",
                        target,
                        matching.len(),
                        count
                    );
                    other.shuffle(&mut self.rng);
                    matching.extend(other);
                }
                matching
            }
        };

        selection.truncate(count);
        selection
    }
}
