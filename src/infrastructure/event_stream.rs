//! 事件流解码器 - 基础设施层
//!
//! 把按网络分块到达的字节流还原成 `ProgressEvent` 序列。
//!
//! - 分块边界与消息边界无关，一行可能跨越两个分块
//! - 按字节拼接行，多字节 UTF-8 字符被拆开也不会乱码
//! - 只处理 `data: ` 开头的行；JSON 解析失败的行直接丢弃
//! - 流结束时不补发终止事件，由调用方判断是否完整

use std::collections::VecDeque;

use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use tracing::debug;

use crate::models::{EventKind, ProgressEvent};

const DATA_PREFIX: &str = "data: ";

/// 服务端单行事件的原始格式
#[derive(Debug, Deserialize)]
struct WireEvent {
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    step: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    json_url: Option<String>,
}

impl From<WireEvent> for ProgressEvent {
    fn from(wire: WireEvent) -> Self {
        let step = wire.step.unwrap_or_else(|| "progress".to_string());
        let percent = wire
            .progress
            .filter(|p| p.is_finite())
            .map(|p| p.clamp(0.0, 100.0) as u8)
            .unwrap_or(0);
        ProgressEvent {
            percent,
            message: wire.message.unwrap_or_default(),
            kind: EventKind::from_step(&step),
            step,
            html_url: wire.html_url,
            json_url: wire.json_url,
        }
    }
}

/// 增量解码器
///
/// 每条流使用独立实例，不在流之间共享
#[derive(Debug, Default)]
pub struct EventStreamDecoder {
    buffer: Vec<u8>,
}

impl EventStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个分块，返回本次完成的所有事件（按行完成顺序）
    pub fn push(&mut self, chunk: &[u8]) -> Vec<ProgressEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = parse_line(&line[..line.len() - 1]) {
                events.push(event);
            }
        }
        events
    }

    /// 流结束：处理最后一行没有换行符的残余数据
    pub fn finish(&mut self) -> Vec<ProgressEvent> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(&rest).into_iter().collect()
    }
}

fn parse_line(raw: &[u8]) -> Option<ProgressEvent> {
    let decoded = String::from_utf8_lossy(raw);
    let line: &str = &decoded;
    let line = line.strip_suffix('\r').unwrap_or(line);
    let payload = line.strip_prefix(DATA_PREFIX)?;

    match serde_json::from_str::<WireEvent>(payload) {
        Ok(wire) => Some(wire.into()),
        Err(e) => {
            debug!("丢弃无法解析的事件行: {} ({})", payload, e);
            None
        }
    }
}

/// 把字节流包装成事件流
///
/// 底层读取错误原样透传为 `Err`，之后不再产出事件
pub fn decode_stream<S, B, E>(chunks: S) -> impl Stream<Item = Result<ProgressEvent, E>>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
{
    struct State<S> {
        chunks: S,
        decoder: EventStreamDecoder,
        pending: VecDeque<ProgressEvent>,
        done: bool,
    }

    let state = State {
        chunks,
        decoder: EventStreamDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((Ok(event), state));
            }
            if state.done {
                return None;
            }
            match state.chunks.next().await {
                Some(Ok(chunk)) => {
                    state.pending.extend(state.decoder.push(chunk.as_ref()));
                }
                Some(Err(e)) => {
                    state.done = true;
                    state.pending.clear();
                    return Some((Err(e), state));
                }
                None => {
                    state.done = true;
                    state.pending.extend(state.decoder.finish());
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &str = concat!(
        "data: {\"step\": \"start\", \"progress\": 0, \"message\": \"문항 분석 시작...\"}\n\n",
        "data: {\"step\": \"auto_fix\", \"progress\": 25, \"message\": \"AI 수정 중\"}\n\n",
        ": keep-alive\n",
        "data: {not json}\n\n",
        "data: {\"step\": \"auto_fixed\", \"progress\": 30, \"message\": \"수정 완료\"}\n\n",
        "data: {\"step\": \"save\", \"progress\": 95, \"message\": \"파일 저장 완료\"}\r\n\r\n",
        "data: {\"step\": \"complete\", \"progress\": 100, \"message\": \"문항 분석 완료!\", \"html_url\": \"http://x/a.html\"}\n\n",
    );

    fn decode_all(chunks: &[&[u8]]) -> Vec<ProgressEvent> {
        let mut decoder = EventStreamDecoder::new();
        let mut events = Vec::new();
        for chunk in chunks {
            events.extend(decoder.push(chunk));
        }
        events.extend(decoder.finish());
        events
    }

    #[test]
    fn decodes_whole_stream() {
        let events = decode_all(&[STREAM.as_bytes()]);
        let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::Progress,
                EventKind::AutoFixStart,
                EventKind::AutoFixDone,
                EventKind::Progress,
                EventKind::Complete,
            ]
        );
        assert_eq!(events[3].message, "파일 저장 완료");
        assert_eq!(events[4].html_url.as_deref(), Some("http://x/a.html"));
        assert_eq!(events[4].percent, 100);
    }

    #[test]
    fn every_two_way_split_gives_same_events() {
        let bytes = STREAM.as_bytes();
        let expected = decode_all(&[bytes]);
        for cut in 0..=bytes.len() {
            let (a, b) = bytes.split_at(cut);
            assert_eq!(decode_all(&[a, b]), expected, "split at byte {}", cut);
        }
    }

    #[test]
    fn byte_by_byte_gives_same_events() {
        let bytes = STREAM.as_bytes();
        let expected = decode_all(&[bytes]);
        let singles: Vec<&[u8]> = bytes.chunks(1).collect();
        assert_eq!(decode_all(&singles), expected);
        let triples: Vec<&[u8]> = bytes.chunks(3).collect();
        assert_eq!(decode_all(&triples), expected);
    }

    #[test]
    fn trailing_line_without_newline_is_flushed() {
        let events = decode_all(&[b"data: {\"step\":\"verify\",\"progress\":55}"]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].percent, 55);
    }

    #[test]
    fn out_of_range_progress_is_clamped() {
        let events = decode_all(&[b"data: {\"progress\": 250}\ndata: {\"progress\": -3}\n"]);
        assert_eq!(events[0].percent, 100);
        assert_eq!(events[1].percent, 0);
        assert_eq!(events[0].kind, EventKind::Progress);
    }

    #[test]
    fn never_synthesises_terminal_event() {
        let events = decode_all(&[b"data: {\"step\":\"verify\",\"progress\":80}\n"]);
        assert!(events.iter().all(|e| !e.kind.is_terminal()));
    }

    #[tokio::test]
    async fn stream_adapter_matches_push_api() {
        let bytes = STREAM.as_bytes();
        let chunks: Vec<Result<Vec<u8>, String>> =
            bytes.chunks(7).map(|c| Ok(c.to_vec())).collect();

        let events: Vec<ProgressEvent> = decode_stream(stream::iter(chunks))
            .map(|r| r.unwrap())
            .collect()
            .await;

        assert_eq!(events, decode_all(&[bytes]));
    }

    #[tokio::test]
    async fn stream_adapter_forwards_transport_error() {
        let chunks: Vec<Result<&[u8], &str>> = vec![
            Ok(b"data: {\"progress\": 10}\n".as_slice()),
            Err("connection reset"),
            Ok(b"data: {\"progress\": 20}\n".as_slice()),
        ];

        let items: Vec<Result<ProgressEvent, &str>> =
            decode_stream(stream::iter(chunks)).collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().percent, 10);
        assert_eq!(items[1].as_ref().unwrap_err(), &"connection reset");
    }
}
