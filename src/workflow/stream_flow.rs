//! 事件流消费流程 - 流程层
//!
//! 把服务端推送的字节流解码为进度事件，转发给运行上下文，
//! 并在第一个终止事件处得出结果。

use futures::{Stream, StreamExt};
use tracing::{info, warn};

use crate::error::AppResult;
use crate::infrastructure::decode_stream;
use crate::models::EventKind;
use crate::workflow::run_ctx::PipelineRun;

/// 事件流的最终结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// 收到 `complete` 事件
    Completed {
        message: String,
        html_url: Option<String>,
        json_url: Option<String>,
    },
    /// 收到 `error` 事件
    Failed { message: String },
    /// 流结束但没有终止事件，状态未知
    Incomplete { last_percent: u8, last_message: String },
    /// 本地取消
    Cancelled { last_percent: u8 },
}

impl StreamOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StreamOutcome::Completed { .. })
    }
}

/// 消费一条事件流
///
/// 自动修复相关事件只记录和转发，不改变控制流。
/// 底层读取错误作为 `Err` 返回。
pub async fn consume_stream<S>(chunks: S, run: &mut PipelineRun) -> AppResult<StreamOutcome>
where
    S: Stream<Item = AppResult<Vec<u8>>> + Unpin,
{
    let mut events = Box::pin(decode_stream(chunks));
    let cancel = run.cancel_token();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            item = events.next() => Some(item),
        };
        let item = match next {
            None => {
                warn!("{} 已取消，停止读取事件流", run);
                return Ok(StreamOutcome::Cancelled {
                    last_percent: run.reporter().percent(),
                });
            }
            Some(None) => break,
            Some(Some(item)) => item,
        };

        let event = match item {
            Ok(event) => event,
            Err(e) => {
                run.fail(e.to_string());
                return Err(e);
            }
        };
        run.observe(&event);

        match event.kind {
            EventKind::Complete => {
                info!("{} ✓ {}", run, event.message);
                return Ok(StreamOutcome::Completed {
                    message: event.message,
                    html_url: event.html_url,
                    json_url: event.json_url,
                });
            }
            EventKind::Error => {
                return Ok(StreamOutcome::Failed {
                    message: event.message,
                })
            }
            _ => {}
        }
    }

    let reporter = run.reporter();
    warn!(
        "⚠️ 事件流在 {}% 处结束，没有收到完成事件",
        reporter.percent()
    );
    Ok(StreamOutcome::Incomplete {
        last_percent: reporter.percent(),
        last_message: reporter.last_message().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::workflow::run_ctx::RunState;
    use futures::stream;

    fn chunks(parts: &[&str]) -> impl Stream<Item = AppResult<Vec<u8>>> + Unpin {
        let items: Vec<AppResult<Vec<u8>>> = parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
        stream::iter(items)
    }

    #[tokio::test]
    async fn stops_at_first_terminal_event() {
        let mut run = PipelineRun::new("1");
        let outcome = consume_stream(
            chunks(&[
                "data: {\"step\":\"auto_fix\",\"progress\":40,\"message\":\"fixing\"}\n",
                "data: {\"step\":\"complete\",\"progress\":100,\"message\":\"done\",\"json_url\":\"/r.json\"}\n",
                "data: {\"step\":\"error\",\"progress\":0,\"message\":\"late\"}\n",
            ]),
            &mut run,
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            StreamOutcome::Completed {
                message: "done".into(),
                html_url: None,
                json_url: Some("/r.json".into()),
            }
        );
        assert_eq!(run.state(), RunState::Complete);
    }

    #[tokio::test]
    async fn error_event_fails_with_server_message() {
        let mut run = PipelineRun::new("1");
        let outcome = consume_stream(
            chunks(&["data: {\"step\":\"error\",\"progress\":0,\"message\":\"문제 데이터가 없습니다.\"}\n"]),
            &mut run,
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            StreamOutcome::Failed {
                message: "문제 데이터가 없습니다.".into()
            }
        );
        assert_eq!(run.state(), RunState::Failed);
    }

    #[tokio::test]
    async fn missing_terminal_event_is_incomplete() {
        let mut run = PipelineRun::new("1");
        let outcome = consume_stream(
            chunks(&["data: {\"step\":\"verify\",\"progress\":70,\"message\":\"verifying\"}\n"]),
            &mut run,
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            StreamOutcome::Incomplete {
                last_percent: 70,
                last_message: "verifying".into()
            }
        );
        assert!(!outcome.is_success());
        assert!(!run.state().is_terminal());
    }

    #[tokio::test]
    async fn cancel_interrupts_stalled_stream() {
        let mut run = PipelineRun::new("1");
        let token = run.cancel_token();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            token.cancel();
        });

        let stalled = chunks(&["data: {\"step\":\"verify\",\"progress\":70,\"message\":\"verifying\"}\n"])
            .chain(stream::pending());
        let outcome = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            consume_stream(stalled, &mut run),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(outcome, StreamOutcome::Cancelled { last_percent: 70 });
    }

    #[tokio::test]
    async fn transport_error_is_returned() {
        let mut run = PipelineRun::new("1");
        let items: Vec<AppResult<Vec<u8>>> = vec![
            Ok(b"data: {\"progress\":10}\n".to_vec()),
            Err(AppError::Other("reset".into())),
        ];
        let err = consume_stream(stream::iter(items), &mut run).await.unwrap_err();
        assert!(err.to_string().contains("reset"));
        assert_eq!(run.state(), RunState::Failed);
    }
}
